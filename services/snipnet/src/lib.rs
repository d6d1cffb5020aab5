//! snipnet: a multi-user snippet sharing service
//!
//! Users authenticate with local credentials or GitHub OAuth and receive an
//! opaque bearer token backed by a session record in Redis. The token gates
//! every ownership-sensitive mutation of the snippet catalog stored in
//! PostgreSQL.

pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod validation;

pub use error::{ApiError, SessionError, StoreError};
pub use state::AppState;
