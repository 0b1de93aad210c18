//! Command implementations.
//!
//! Every command builds a [`Context`] first: configuration from the
//! environment, file-backed storage so the token and cart survive between
//! invocations, and a session store resolved against the server.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use loomline_client::storage::{FileStore, KeyValueStore};
use loomline_client::{
    ApiError, CartError, CartStore, ClientConfig, ConfigError, MarketplaceClient, SessionError,
    SessionStore,
};

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The API rejected or failed a request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Bad command argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Shared state every command runs against.
pub struct Context {
    pub api: MarketplaceClient,
    pub session: Arc<SessionStore>,
    pub cart: CartStore,
}

/// Build the command context and resolve the persisted session.
pub async fn context() -> Result<Context, CliError> {
    let config = ClientConfig::from_env()?;
    let storage: Arc<dyn KeyValueStore> =
        Arc::new(FileStore::new(state_dir(config.state_dir.clone())));

    let api = MarketplaceClient::new(&config)?;
    let session = SessionStore::new(api.clone(), storage.clone());
    session.initialize().await;

    let cart = CartStore::new(storage);

    Ok(Context { api, session, cart })
}

fn state_dir(configured: Option<PathBuf>) -> PathBuf {
    configured.unwrap_or_else(|| {
        std::env::var_os("HOME").map_or_else(
            || PathBuf::from(".loomline"),
            |home| PathBuf::from(home).join(".loomline"),
        )
    })
}
