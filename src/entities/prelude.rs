pub use super::draws::Entity as Draws;
pub use super::security_logs::Entity as SecurityLogs;
pub use super::users::Entity as Users;
