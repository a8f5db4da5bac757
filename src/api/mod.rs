pub mod auth;
mod error;
pub mod idempotency;
pub mod models;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;

pub use auth::{Authenticator, BearerTokenAuthenticator};
pub use error::ApiError;
pub use server::{router, run};
pub use state::AppState;
