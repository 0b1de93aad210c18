//! Catalog-to-checkout flow against the stub marketplace API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use loomline_client::storage::MemoryStore;
use loomline_client::{ApiError, CartStore, MarketplaceClient, SessionStore};
use loomline_core::{ItemKind, OrderStatus};
use loomline_integration_tests::{PASSWORD, TestServer};

#[tokio::test]
async fn browse_add_and_total() {
    let server = TestServer::spawn().await;
    let api = MarketplaceClient::new(&server.config()).unwrap();
    let cart = CartStore::new(Arc::new(MemoryStore::new()));

    let material = api.get_material("raw-denim").await.unwrap();
    assert_eq!(material.name, "Raw Denim");
    cart.add_item(material.into_snapshot(), 4).unwrap();

    let design = api.get_design("paisley-block-print").await.unwrap();
    cart.add_item(design.into_snapshot(), 1).unwrap();

    assert_eq!(cart.item_count(), 5);
    assert_eq!(cart.subtotal().to_string(), "113.00"); // 4 * 9.50 + 75.00
}

#[tokio::test]
async fn missing_listing_is_not_found() {
    let server = TestServer::spawn().await;
    let api = MarketplaceClient::new(&server.config()).unwrap();

    let error = api.get_material("hemp-canvas").await.unwrap_err();
    assert!(matches!(error, ApiError::NotFound(_)));
}

#[tokio::test]
async fn search_bypasses_the_page_cache() {
    let server = TestServer::spawn().await;
    let api = MarketplaceClient::new(&server.config()).unwrap();

    let all = api.get_materials(None, None).await.unwrap();
    assert_eq!(all.count, 2);

    let filtered = api.get_materials(Some("denim"), None).await.unwrap();
    assert_eq!(filtered.count, 1);
    assert_eq!(filtered.results[0].slug, "raw-denim");

    // The unfiltered page is served from cache and still complete.
    let cached = api.get_materials(None, None).await.unwrap();
    assert_eq!(cached.count, 2);
}

#[tokio::test]
async fn checkout_sends_discriminated_lines_and_snapshot_prices() {
    let server = TestServer::spawn().await;
    let api = MarketplaceClient::new(&server.config()).unwrap();
    let storage = Arc::new(MemoryStore::new());
    let session = SessionStore::new(api.clone(), storage.clone());
    session.initialize().await;
    session.login("shopper", PASSWORD).await.unwrap();

    let cart = CartStore::new(storage);
    let material = api.get_material("raw-denim").await.unwrap();
    cart.add_item(material.into_snapshot(), 4).unwrap();
    let design = api.get_design("paisley-block-print").await.unwrap();
    cart.add_item(design.into_snapshot(), 1).unwrap();

    let order = api
        .create_order(&cart.items(), Some("12 Mill Road".to_owned()), None)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.order_total.to_string(), "113.00");

    // Checkout succeeded, cart resets.
    cart.clear();
    assert!(cart.is_empty());

    let recorded = server.state.recorded_orders();
    assert_eq!(recorded.len(), 1);
    let items = recorded[0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);

    assert_eq!(items[0]["material_id"], "12");
    assert!(items[0].get("design_id").is_none());
    assert_eq!(items[0]["quantity"], 4);
    assert_eq!(items[0]["unit_price"], "9.50");

    assert_eq!(items[1]["design_id"], "8");
    assert!(items[1].get("material_id").is_none());
    assert_eq!(items[1]["unit_price"], "75.00");

    assert_eq!(recorded[0]["shipping_address"], "12 Mill Road");
}

#[tokio::test]
async fn checkout_without_session_is_rejected_and_invalidates_nothing_durable() {
    let server = TestServer::spawn().await;
    let api = MarketplaceClient::new(&server.config()).unwrap();
    let cart = CartStore::new(Arc::new(MemoryStore::new()));

    let material = api.get_material("raw-denim").await.unwrap();
    cart.add_item(material.into_snapshot(), 2).unwrap();

    let error = api.create_order(&cart.items(), None, None).await.unwrap_err();
    assert!(error.is_unauthorized());

    // The cart is independent of the session; a failed checkout keeps it.
    assert_eq!(cart.item_count(), 2);
    assert!(server.state.recorded_orders().is_empty());
}

#[tokio::test]
async fn cart_lines_merge_across_repeated_catalog_adds() {
    let server = TestServer::spawn().await;
    let api = MarketplaceClient::new(&server.config()).unwrap();
    let cart = CartStore::new(Arc::new(MemoryStore::new()));

    let first = api.get_material("raw-denim").await.unwrap();
    cart.add_item(first.into_snapshot(), 2).unwrap();

    // Same listing fetched again (served from cache) merges, not duplicates.
    let second = api.get_material("raw-denim").await.unwrap();
    cart.add_item(second.into_snapshot(), 3).unwrap();

    let items = cart.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 5);
    assert_eq!(items[0].kind, ItemKind::Material);
}

#[tokio::test]
async fn order_history_requires_authentication() {
    let server = TestServer::spawn().await;
    let api = MarketplaceClient::new(&server.config()).unwrap();

    assert!(api.get_my_orders().await.unwrap_err().is_unauthorized());

    let storage = Arc::new(MemoryStore::new());
    let session = SessionStore::new(api.clone(), storage);
    session.initialize().await;
    session.login("shopper", PASSWORD).await.unwrap();

    let orders = api.get_my_orders().await.unwrap();
    assert_eq!(orders.count, 0);
}
