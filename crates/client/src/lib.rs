//! Loomline client SDK.
//!
//! Talks to the Loomline B2B garment marketplace REST API and owns the two
//! client-side state containers every consumer builds on:
//!
//! - [`SessionStore`] - authenticated-identity lifecycle: token acquisition,
//!   persistence, attachment to outbound requests, invalidation.
//! - [`CartStore`] - shopping-cart lifecycle: line merge semantics,
//!   synchronous persistence, derived totals.
//!
//! Both persist through the [`storage::KeyValueStore`] abstraction and reach
//! the API through [`MarketplaceClient`], which attaches the auth token to
//! every request and maps server failures into [`ApiError`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use loomline_client::{CartStore, ClientConfig, MarketplaceClient, SessionStore};
//! use loomline_client::storage::MemoryStore;
//!
//! let config = ClientConfig::from_env()?;
//! let api = MarketplaceClient::new(&config)?;
//! let storage = Arc::new(MemoryStore::new());
//!
//! let session = SessionStore::new(api.clone(), storage.clone());
//! session.initialize().await;
//!
//! let cart = CartStore::new(storage);
//! let material = api.get_material("organic-cotton").await?;
//! cart.add_item(material.into_snapshot(), 2)?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod marketplace;
pub mod session;
pub mod storage;

pub use cart::{CartError, CartStore};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ValidationErrors};
pub use marketplace::{
    AuthResponse, DesignSummary, FilePart, MarketplaceClient, MaterialSummary, NewMaterial, Page,
    ProfileUpdate, snapshot_from_listing,
};
pub use session::{SessionError, SessionState, SessionStore};
