pub mod draw;
pub mod logs;
pub mod user;
