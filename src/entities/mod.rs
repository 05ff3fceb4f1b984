pub mod prelude;

pub mod draws;
pub mod security_logs;
pub mod users;
