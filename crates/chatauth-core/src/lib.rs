//! # chatauth-core
//!
//! Client-side authentication for the chat API - shared by every front-end.
//!
//! This crate provides:
//! - The authentication session (`session` module)
//! - A shared HTTP client with mutable default headers (`client` module)
//! - Persisted token storage (`storage` module)
//! - Data models (`models` module)
//! - Environment-driven configuration (`config` module)
//! - Unified error handling (`error` module)

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use client::ApiClient;
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use models::{LoginResult, RegisterResult, SessionState, User};
pub use session::{AuthSession, SessionOptions};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}

/// Open the session described by `config`, backed by its token file
pub fn open_session(config: &SessionConfig) -> Result<AuthSession<FileTokenStore>> {
    let client = ApiClient::new(&config.api_url, config.timeout)?;
    let store = FileTokenStore::new(&config.token_path);
    Ok(AuthSession::with_options(client, store, SessionOptions::from(config)))
}
