//! Cart commands.
//!
//! The cart lives in the state directory, so it carries across invocations
//! and across login/logout.
//!
//! # Usage
//!
//! ```bash
//! loom cart add raw-denim --kind material --quantity 4
//! loom cart update 12 --kind material --quantity 2
//! loom cart show
//! loom cart clear
//! ```

use loomline_core::{ItemKind, LineKey};

use super::CliError;

/// Print the cart lines and derived totals.
pub async fn show() -> Result<(), CliError> {
    let ctx = super::context().await?;
    let items = ctx.cart.items();

    if items.is_empty() {
        tracing::info!("Cart is empty");
        return Ok(());
    }

    for item in &items {
        tracing::info!(
            "  [{}] {} x{} @ {} = {}",
            item.key(),
            item.name,
            item.quantity,
            item.price,
            item.line_total(),
        );
    }
    tracing::info!(
        "{} items, subtotal {}",
        ctx.cart.item_count(),
        ctx.cart.subtotal()
    );
    Ok(())
}

/// Fetch a listing by slug and add it to the cart.
pub async fn add(slug: &str, kind: ItemKind, quantity: u32) -> Result<(), CliError> {
    let ctx = super::context().await?;

    let snapshot = match kind {
        ItemKind::Material => ctx.api.get_material(slug).await?.into_snapshot(),
        ItemKind::Design => ctx.api.get_design(slug).await?.into_snapshot(),
    };

    let name = snapshot.name.clone();
    ctx.cart.add_item(snapshot, quantity)?;
    tracing::info!("Added {quantity} x {name}");
    tracing::info!(
        "{} items, subtotal {}",
        ctx.cart.item_count(),
        ctx.cart.subtotal()
    );
    Ok(())
}

/// Set a line's quantity (floors at 1).
pub async fn update(id: &str, kind: ItemKind, quantity: i64) -> Result<(), CliError> {
    let ctx = super::context().await?;
    ctx.cart.update_quantity(&LineKey::new(id, kind), quantity);
    tracing::info!(
        "{} items, subtotal {}",
        ctx.cart.item_count(),
        ctx.cart.subtotal()
    );
    Ok(())
}

/// Remove a line.
pub async fn remove(id: &str, kind: ItemKind) -> Result<(), CliError> {
    let ctx = super::context().await?;
    ctx.cart.remove_item(&LineKey::new(id, kind));
    tracing::info!(
        "{} items, subtotal {}",
        ctx.cart.item_count(),
        ctx.cart.subtotal()
    );
    Ok(())
}

/// Empty the cart.
pub async fn clear() -> Result<(), CliError> {
    let ctx = super::context().await?;
    ctx.cart.clear();
    tracing::info!("Cart cleared");
    Ok(())
}
