//! Cart line types.
//!
//! A cart line stores a *snapshot* of the listing at add-time (name, price,
//! unit, image), not a live reference to the catalog. Lines are keyed by the
//! `(id, kind)` pair; two entries are the same line iff both match.

use serde::{Deserialize, Serialize};

use crate::types::price::Price;

/// Discriminates the two purchasable listing kinds.
///
/// Materials are priced per unit of measurement (meters, kg); designs are
/// one-time license purchases with no unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Material,
    Design,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Material => write!(f, "material"),
            Self::Design => write!(f, "design"),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "material" => Ok(Self::Material),
            "design" => Ok(Self::Design),
            _ => Err(format!("invalid item kind: {s}")),
        }
    }
}

/// Identity of a cart line: listing ID plus kind.
///
/// The ID is the listing's numeric primary key rendered as a string, falling
/// back to the slug for listings that expose no numeric ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub id: String,
    pub kind: ItemKind,
}

impl LineKey {
    /// Create a line key.
    pub fn new(id: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

impl std::fmt::Display for LineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Display-relevant listing fields captured when an item is added to the
/// cart, independent of later catalog changes.
///
/// The `kind` discriminant is always explicit here; the adapter converting
/// API listings into snapshots applies the single documented inference rule
/// when the API response carries no discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Listing ID (numeric ID as string, slug fallback).
    pub id: String,
    /// Listing kind.
    pub kind: ItemKind,
    /// Display name (material name or design title).
    pub name: String,
    /// Unit price at snapshot time.
    pub price: Price,
    /// Unit of measurement; empty for licensed designs.
    #[serde(default)]
    pub unit: String,
    /// Primary image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// URL slug of the listing.
    pub slug: String,
}

impl ProductSnapshot {
    /// Identity key this snapshot would occupy in a cart.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.id.clone(), self.kind)
    }

    /// Turn the snapshot into a cart line with the given quantity.
    #[must_use]
    pub fn into_line(self, quantity: u32) -> CartItem {
        CartItem {
            id: self.id,
            kind: self.kind,
            name: self.name,
            price: self.price,
            unit: self.unit,
            image: self.image,
            slug: self.slug,
            quantity,
        }
    }
}

/// One entry in the cart.
///
/// Serialized field names match the persisted cart format of the deployed
/// client (the discriminant is stored as `type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Listing ID (numeric ID as string, slug fallback).
    pub id: String,
    /// Listing kind.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Display name captured at add-time.
    pub name: String,
    /// Unit price captured at add-time.
    pub price: Price,
    /// Unit of measurement; empty for licensed designs.
    #[serde(default)]
    pub unit: String,
    /// Primary image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// URL slug of the listing.
    pub slug: String,
    /// Line quantity, always >= 1.
    pub quantity: u32,
}

impl CartItem {
    /// Identity key of this line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.id.clone(), self.kind)
    }

    /// Line total (quantity x unit price).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}
