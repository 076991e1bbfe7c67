// Admin session gate - signed cookie login and route guards
pub mod auth;
pub mod error;
pub mod handlers;

pub use auth::*;
pub use error::*;
pub use handlers::*;
