pub mod credentials;
pub mod guard;

pub use guard::LoginAttemptGuard;
