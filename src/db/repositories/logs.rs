use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{prelude::SecurityLogs, security_logs};

/// Audit trail for security-relevant events: failed logins, lockouts,
/// role-check failures, admin actions.
pub struct SecurityLogRepository {
    conn: DatabaseConnection,
}

impl SecurityLogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        event_type: &str,
        level: &str,
        message: &str,
        details: Option<String>,
    ) -> Result<()> {
        let active = security_logs::ActiveModel {
            event_type: Set(event_type.to_string()),
            level: Set(level.to_string()),
            message: Set(message.to_string()),
            details: Set(details),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };

        SecurityLogs::insert(active)
            .exec(&self.conn)
            .await
            .context("Failed to write security log entry")?;
        Ok(())
    }

    /// Most recent entries first.
    pub async fn recent(&self, limit: u64) -> Result<Vec<security_logs::Model>> {
        SecurityLogs::find()
            .order_by_desc(security_logs::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to read security log")
    }

    pub async fn by_event_type(&self, event_type: &str) -> Result<Vec<security_logs::Model>> {
        SecurityLogs::find()
            .filter(security_logs::Column::EventType.eq(event_type))
            .order_by_desc(security_logs::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to read security log")
    }
}
