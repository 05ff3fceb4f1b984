use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::db::Store;

/// State shared by the API layer and the services.
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    /// Advisory lock serializing master-draw generation and round runs.
    pub round_lock: Arc<Mutex<()>>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::new(&config.general.database_path).await?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            round_lock: Arc::new(Mutex::new(())),
        })
    }
}
