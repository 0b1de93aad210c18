//! Shopping-cart state.
//!
//! [`CartStore`] keeps an ordered list of [`CartItem`] lines, merged on the
//! `(id, kind)` line key: adding a listing already in the cart bumps that
//! line's quantity and leaves its add-time snapshot (price, name, image)
//! untouched. Totals are derived on demand, never stored.
//!
//! Every mutation persists the full line list through the storage backend
//! before observers are notified, so a process exit at any point between two
//! operations leaves a loadable cart behind. The cart works the same
//! anonymous or authenticated; checkout is where the session matters.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use loomline_core::{CartItem, LineKey, OrderLineInput, Price, ProductSnapshot};

use crate::marketplace::conversions::convert_order_lines;
use crate::storage::{self, KeyValueStore, keys};

/// Cart operation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// A line can only be created with at least one unit; use
    /// [`CartStore::remove_item`] to take a line out.
    #[error("Quantity must be at least 1")]
    ZeroQuantity,
}

/// Reactive, persistent shopping cart.
pub struct CartStore {
    storage: Arc<dyn KeyValueStore>,
    items: watch::Sender<Vec<CartItem>>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &self.items.borrow().len())
            .finish()
    }
}

impl CartStore {
    /// Load the cart persisted in `storage`, or start empty.
    ///
    /// A malformed persisted cart is discarded (with a log line), never
    /// surfaced as an error.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let items: Vec<CartItem> =
            storage::read_json(storage.as_ref(), keys::CART).unwrap_or_default();
        let (tx, _) = watch::channel(items);
        Self { storage, items: tx }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Subscribe to cart changes. The receiver sees the current lines
    /// immediately and every mutation after.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartItem>> {
        self.items.subscribe()
    }

    /// Snapshot of the current lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.items.borrow().clone()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Total units across all lines (a line of 5 meters counts 5).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .borrow()
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    /// Sum of every line's `price * quantity`, recomputed fresh.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.borrow().iter().map(CartItem::line_total).sum()
    }

    /// The current lines shaped for the order-creation payload.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLineInput> {
        convert_order_lines(&self.items.borrow())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Add `quantity` units of a listing.
    ///
    /// Merges into an existing line with the same `(id, kind)` key; the
    /// existing line's snapshot wins, only the quantity grows.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] for `quantity == 0`; the cart is
    /// left unchanged.
    #[instrument(skip(self, snapshot), fields(key = %snapshot.key()))]
    pub fn add_item(&self, snapshot: ProductSnapshot, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let key = snapshot.key();
        self.mutate(|items| {
            if let Some(line) = items.iter_mut().find(|line| line.key() == key) {
                line.quantity = line.quantity.saturating_add(quantity);
            } else {
                items.push(snapshot.into_line(quantity));
            }
        });
        Ok(())
    }

    /// Set a line's quantity, clamped to a minimum of 1.
    ///
    /// Stepping below one never deletes the line; removal is always the
    /// separate, explicit [`Self::remove_item`]. Unknown keys are a no-op.
    #[instrument(skip(self), fields(key = %key))]
    pub fn update_quantity(&self, key: &LineKey, quantity: i64) {
        let clamped = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        self.mutate(|items| {
            if let Some(line) = items.iter_mut().find(|line| line.key() == *key) {
                line.quantity = clamped;
            }
        });
    }

    /// Remove a line. Unknown keys are a no-op.
    #[instrument(skip(self), fields(key = %key))]
    pub fn remove_item(&self, key: &LineKey) {
        self.mutate(|items| {
            items.retain(|line| line.key() != *key);
        });
    }

    /// Empty the cart (after a successful checkout, or on demand).
    #[instrument(skip(self))]
    pub fn clear(&self) {
        self.mutate(Vec::clear);
    }

    /// Apply `f` to the lines, persist the result, then notify observers.
    fn mutate(&self, f: impl FnOnce(&mut Vec<CartItem>)) {
        self.items.send_modify(|items| {
            f(items);
            // Persist before the watch notification goes out, so observers
            // reacting to the change can rely on durable state.
            storage::write_json(self.storage.as_ref(), keys::CART, items);
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use loomline_core::ItemKind;

    fn snapshot(id: &str, kind: ItemKind, price: &str) -> ProductSnapshot {
        ProductSnapshot {
            id: id.to_owned(),
            kind,
            name: format!("listing {id}"),
            price: Price::parse(price).unwrap(),
            unit: match kind {
                ItemKind::Material => "meters".to_owned(),
                ItemKind::Design => String::new(),
            },
            image: None,
            slug: format!("listing-{id}"),
        }
    }

    fn store() -> (CartStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        (CartStore::new(storage.clone()), storage)
    }

    #[test]
    fn test_add_merges_on_line_key() {
        let (cart, _) = store();
        cart.add_item(snapshot("12", ItemKind::Material, "9.50"), 2)
            .unwrap();
        cart.add_item(snapshot("12", ItemKind::Material, "11.00"), 3)
            .unwrap();

        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        // Merging keeps the original add-time snapshot.
        assert_eq!(items[0].price.to_string(), "9.50");
    }

    #[test]
    fn test_same_id_different_kind_are_separate_lines() {
        let (cart, _) = store();
        cart.add_item(snapshot("12", ItemKind::Material, "9.50"), 1)
            .unwrap();
        cart.add_item(snapshot("12", ItemKind::Design, "75.00"), 1)
            .unwrap();
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_zero_quantity_add_is_rejected() {
        let (cart, _) = store();
        let result = cart.add_item(snapshot("12", ItemKind::Material, "9.50"), 0);
        assert_eq!(result, Err(CartError::ZeroQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let (cart, _) = store();
        let snap = snapshot("12", ItemKind::Material, "9.50");
        let key = snap.key();
        cart.add_item(snap, 4).unwrap();

        cart.update_quantity(&key, 0);
        assert_eq!(cart.items()[0].quantity, 1);

        cart.update_quantity(&key, -5);
        assert_eq!(cart.items()[0].quantity, 1);

        cart.update_quantity(&key, 7);
        assert_eq!(cart.items()[0].quantity, 7);
    }

    #[test]
    fn test_update_quantity_unknown_key_is_noop() {
        let (cart, _) = store();
        cart.add_item(snapshot("12", ItemKind::Material, "9.50"), 2)
            .unwrap();
        cart.update_quantity(&LineKey::new("99", ItemKind::Design), 10);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let (cart, _) = store();
        let snap = snapshot("12", ItemKind::Material, "9.50");
        let key = snap.key();
        cart.add_item(snap, 2).unwrap();
        cart.add_item(snapshot("8", ItemKind::Design, "75.00"), 1)
            .unwrap();

        cart.remove_item(&key);
        assert_eq!(cart.items().len(), 1);

        // Removing an absent line changes nothing.
        cart.remove_item(&key);
        assert_eq!(cart.items().len(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_derived_totals() {
        let (cart, _) = store();
        cart.add_item(snapshot("12", ItemKind::Material, "9.50"), 4)
            .unwrap();
        cart.add_item(snapshot("8", ItemKind::Design, "75.00"), 1)
            .unwrap();

        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal().to_string(), "113.00");
    }

    #[test]
    fn test_order_lines_carry_discriminants() {
        let (cart, _) = store();
        cart.add_item(snapshot("12", ItemKind::Material, "9.50"), 4)
            .unwrap();
        cart.add_item(snapshot("8", ItemKind::Design, "75.00"), 1)
            .unwrap();

        let lines = cart.order_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].material_id.as_deref(), Some("12"));
        assert_eq!(lines[0].quantity, 4);
        assert_eq!(lines[1].design_id.as_deref(), Some("8"));
    }

    #[test]
    fn test_cart_survives_reload() {
        let storage = Arc::new(MemoryStore::new());
        let original = {
            let cart = CartStore::new(storage.clone());
            cart.add_item(snapshot("12", ItemKind::Material, "9.50"), 2)
                .unwrap();
            cart.add_item(snapshot("13", ItemKind::Material, "12.00"), 7)
                .unwrap();
            cart.add_item(snapshot("8", ItemKind::Design, "75.00"), 1)
                .unwrap();
            cart.items()
        };

        let reloaded = CartStore::new(storage);
        // Every line comes back with its key, quantity, and snapshot intact.
        assert_eq!(reloaded.items(), original);
        assert_eq!(reloaded.item_count(), 10);
    }

    #[test]
    fn test_persisted_shape_is_stable() {
        let (cart, storage) = store();
        cart.add_item(snapshot("8", ItemKind::Design, "75.00"), 1)
            .unwrap();

        let raw = storage.get(keys::CART).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["type"], "design");
        assert_eq!(value[0]["price"], "75.00");
        assert_eq!(value[0]["quantity"], 1);
    }

    #[test]
    fn test_malformed_persisted_cart_starts_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::CART, "[{broken");
        let cart = CartStore::new(storage);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_mutations() {
        let (cart, _) = store();
        let mut rx = cart.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        cart.add_item(snapshot("12", ItemKind::Material, "9.50"), 1)
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
