//! Loomline Core - Shared types library.
//!
//! This crate provides common types used across all Loomline client components:
//! - `client` - SDK talking to the marketplace REST API
//! - `cli` - Command-line consumer of the SDK
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and emails, plus
//!   the marketplace domain model (users, cart lines, orders, forums)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
