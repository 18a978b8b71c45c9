pub mod auth;
pub mod error;
pub mod store;

pub use auth::*;
pub use error::*;
pub use store::*;
