pub mod draw;
pub mod user;

pub use draw::{DrawNumbers, DrawNumbersError};
pub use user::{Role, User};
