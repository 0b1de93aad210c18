//! Order commands.
//!
//! # Usage
//!
//! ```bash
//! loom orders checkout --shipping "12 Mill Road, Leeds"
//! loom orders list
//! loom orders show 7a1c9f6e-...
//! ```

use loomline_core::OrderId;

use super::CliError;

/// Place an order from the current cart, then empty it.
pub async fn checkout(
    shipping: Option<String>,
    billing: Option<String>,
) -> Result<(), CliError> {
    let ctx = super::context().await?;

    if !ctx.session.state().is_authenticated() {
        tracing::warn!("Log in before checking out");
        return Err(loomline_client::SessionError::NotAuthenticated.into());
    }

    let items = ctx.cart.items();
    if items.is_empty() {
        tracing::warn!("Cart is empty, nothing to order");
        return Ok(());
    }

    let order = ctx.api.create_order(&items, shipping, billing).await?;
    ctx.cart.clear();

    tracing::info!("Order placed: {}", order.id);
    tracing::info!("  Status: {}", order.status);
    tracing::info!("  Total: {}", order.order_total);
    Ok(())
}

/// List the authenticated user's orders.
pub async fn list() -> Result<(), CliError> {
    let ctx = super::context().await?;
    let orders = ctx.api.get_my_orders().await?;

    tracing::info!("{} orders", orders.count);
    for order in &orders.results {
        tracing::info!(
            "  {} [{}] {} ({})",
            order.id,
            order.status,
            order.order_total,
            order.created_at.format("%Y-%m-%d"),
        );
    }
    Ok(())
}

/// Show one order.
pub async fn show(id: &str) -> Result<(), CliError> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("invalid order ID: {id}")))?;

    let ctx = super::context().await?;
    let order = ctx.api.get_order(order_id).await?;

    tracing::info!("Order {}", order.id);
    tracing::info!("  Status: {}", order.status);
    tracing::info!("  Total: {}", order.order_total);
    if let Some(shipping) = &order.shipping_address {
        tracing::info!("  Ship to: {shipping}");
    }
    for item in &order.items {
        tracing::info!(
            "  {} x{} @ {}",
            item.item_name.as_deref().unwrap_or("(item)"),
            item.quantity,
            item.unit_price,
        );
    }
    Ok(())
}
