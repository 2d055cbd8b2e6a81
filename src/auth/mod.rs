pub mod handlers;
pub mod ownership;
pub mod password;
pub mod tokens;

pub use ownership::{ensure_owner, is_owner, Owned};
