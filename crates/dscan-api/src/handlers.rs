//! Request handlers.

pub mod files;
pub mod health;

pub use files::*;
pub use health::{health, ready};
