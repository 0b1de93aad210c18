//! Cache types for catalog API responses.

use super::{DesignSummary, MaterialSummary, Page};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Material(Box<MaterialSummary>),
    Materials(Page<MaterialSummary>),
    Design(Box<DesignSummary>),
    Designs(Page<DesignSummary>),
}
