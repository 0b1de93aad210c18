//! Core types for the Loomline marketplace client.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod community;
pub mod email;
pub mod id;
pub mod item;
pub mod order;
pub mod price;
pub mod user;

pub use community::{ForumCategory, ForumPost, ForumThread, NewPost, NewThread};
pub use email::{Email, EmailError};
pub use id::*;
pub use item::{CartItem, ItemKind, LineKey, ProductSnapshot};
pub use order::{CreateOrderRequest, Order, OrderItem, OrderLineInput, OrderStatus};
pub use price::{Price, PriceError};
pub use user::{Profile, RegisterRequest, User, UserType};
