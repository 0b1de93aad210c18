//! Conversions from wire DTOs into domain types.
//!
//! This is the single place where a listing's material/design discriminant is
//! decided. The rule, applied top to bottom:
//!
//! 1. An explicit `type` field on the payload wins.
//! 2. Otherwise, a listing that carries `price_per_unit` is a material
//!    (materials are the only per-unit-priced kind).
//! 3. Everything else is a design.
//!
//! Snapshots capture display fields at add-time; later catalog edits never
//! reach an existing cart line.

use loomline_core::{CartItem, ItemKind, OrderLineInput, Price, ProductSnapshot};
use serde::Deserialize;

use super::{DesignSummary, MaterialSummary};

/// Loosely-typed listing payload, as returned by list/detail/search
/// endpoints. Field presence varies by kind; the converters below normalize
/// it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawListing {
    pub id: Option<i64>,
    pub slug: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ItemKind>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub price_per_unit: Option<String>,
    pub price: Option<String>,
    pub unit_of_measurement: Option<String>,
    pub fabric_type: Option<String>,
    pub licensing_options: Option<String>,
    pub main_image_url: Option<String>,
    pub thumbnail_image_url: Option<String>,
    pub image: Option<String>,
    pub design_image: Option<String>,
    pub seller_username: Option<String>,
    pub designer_username: Option<String>,
}

impl RawListing {
    fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_default()
    }

    fn display_image(&self) -> Option<String> {
        self.main_image_url
            .clone()
            .or_else(|| self.thumbnail_image_url.clone())
            .or_else(|| self.image.clone())
            .or_else(|| self.design_image.clone())
    }

    fn slug_or_id(&self) -> String {
        self.slug
            .clone()
            .or_else(|| self.id.map(|id| id.to_string()))
            .unwrap_or_default()
    }

    /// Line identity: numeric ID when present, slug fallback.
    fn line_id(&self) -> String {
        self.id
            .map_or_else(|| self.slug.clone().unwrap_or_default(), |id| id.to_string())
    }
}

fn price_or_zero(raw: Option<&str>) -> Price {
    match raw {
        None => Price::ZERO,
        Some(s) => Price::parse(s).unwrap_or_else(|error| {
            tracing::warn!(raw = s, %error, "unparsable listing price, using zero");
            Price::ZERO
        }),
    }
}

/// Decide the listing kind (see module docs for the rule).
pub(crate) fn infer_kind(raw: &RawListing) -> ItemKind {
    raw.kind.unwrap_or_else(|| {
        if raw.price_per_unit.is_some() {
            ItemKind::Material
        } else {
            ItemKind::Design
        }
    })
}

/// Convert a loosely-typed listing into an add-to-cart snapshot.
pub(crate) fn convert_snapshot(raw: &RawListing) -> ProductSnapshot {
    let kind = infer_kind(raw);
    let (price, unit) = match kind {
        ItemKind::Material => (
            price_or_zero(raw.price_per_unit.as_deref()),
            raw.unit_of_measurement.clone().unwrap_or_default(),
        ),
        // Licensed designs are one-time purchases: no unit.
        ItemKind::Design => (price_or_zero(raw.price.as_deref()), String::new()),
    };

    ProductSnapshot {
        id: raw.line_id(),
        kind,
        name: raw.display_name(),
        price,
        unit,
        image: raw.display_image(),
        slug: raw.slug_or_id(),
    }
}

/// Convert a raw listing into a material summary.
pub(crate) fn convert_material(raw: RawListing) -> MaterialSummary {
    MaterialSummary {
        id: raw.id,
        name: raw.display_name(),
        slug: raw.slug_or_id(),
        fabric_type: raw.fabric_type.clone().unwrap_or_default(),
        price_per_unit: price_or_zero(raw.price_per_unit.as_deref()),
        unit_of_measurement: raw.unit_of_measurement.clone().unwrap_or_default(),
        image: raw.display_image(),
        seller_username: raw.seller_username.clone(),
    }
}

/// Convert a raw listing into a design summary.
pub(crate) fn convert_design(raw: RawListing) -> DesignSummary {
    DesignSummary {
        id: raw.id,
        title: raw.display_name(),
        slug: raw.slug_or_id(),
        price: price_or_zero(raw.price.as_deref()),
        licensing_options: raw.licensing_options.clone().unwrap_or_default(),
        image: raw.display_image(),
        designer_username: raw.designer_username.clone(),
    }
}

/// Convert cart lines into the `POST /orders/` item payload.
///
/// The kind decides which discriminant field carries the listing ID;
/// `unit_price` is the add-time snapshot price.
pub(crate) fn convert_order_lines(items: &[CartItem]) -> Vec<OrderLineInput> {
    items
        .iter()
        .map(|item| {
            let (material_id, design_id) = match item.kind {
                ItemKind::Material => (Some(item.id.clone()), None),
                ItemKind::Design => (None, Some(item.id.clone())),
            };
            OrderLineInput {
                material_id,
                design_id,
                quantity: item.quantity,
                unit_price: item.price,
            }
        })
        .collect()
}
