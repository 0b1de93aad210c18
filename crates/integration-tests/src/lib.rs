//! Integration test harness for the Loomline client.
//!
//! Spawns an in-process `axum` stub of the marketplace REST API on an
//! ephemeral port, then drives the real SDK against it over HTTP. The stub
//! speaks the same DRF-style dialect as the production backend: token auth
//! via `Authorization: Token ...`, paginated list bodies, `{"detail": ...}`
//! error envelopes, and field->messages validation maps.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p loomline-integration-tests
//! ```

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::unused_async,
    clippy::needless_pass_by_value,
    clippy::cast_precision_loss
)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use loomline_client::ClientConfig;

/// The password the stub accepts for every account.
pub const PASSWORD: &str = "weft-and-warp";

/// Shared mutable state behind the stub endpoints.
#[derive(Default)]
pub struct StubState {
    /// Currently valid tokens.
    tokens: Mutex<HashSet<String>>,
    /// Raw bodies of every accepted `POST /orders/` request, oldest first.
    orders: Mutex<Vec<Value>>,
    /// Extra latency applied to `users/me` responses.
    me_delay: Mutex<Option<Duration>>,
}

impl StubState {
    fn lock_tokens(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn token_username(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get("authorization")?.to_str().ok()?;
        let token = value.strip_prefix("Token ")?;
        if self.lock_tokens().contains(token) {
            token.strip_prefix("tok-").map(ToOwned::to_owned)
        } else {
            None
        }
    }

    /// Mint a valid token for `username` without going through login.
    pub fn seed_token(&self, username: &str) -> String {
        let token = format!("tok-{username}");
        self.lock_tokens().insert(token.clone());
        token
    }

    /// Invalidate every outstanding token (simulates server-side revocation).
    pub fn revoke_all_tokens(&self) {
        self.lock_tokens().clear();
    }

    /// Hold every `users/me` response for `delay`. The token is checked and
    /// the body built before the sleep, so a token revoked while the response
    /// is held still gets its pre-revocation answer.
    pub fn delay_me(&self, delay: Duration) {
        *self
            .me_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Bodies of the orders accepted so far.
    pub fn recorded_orders(&self) -> Vec<Value> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A running stub marketplace API.
pub struct TestServer {
    /// API root, e.g. `http://127.0.0.1:49152/api/v1`.
    pub base_url: String,
    /// Handle for inspecting and mutating server-side state mid-test.
    pub state: Arc<StubState>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    /// Bind an ephemeral port and serve the stub until dropped.
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::default());
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub");
        });

        Self {
            base_url: format!("http://{addr}/api/v1"),
            state,
            handle,
        }
    }

    /// Client configuration pointing at this stub.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_base_url(self.base_url.parse().expect("stub base url"))
    }
}

fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/api/v1/accounts/login/", post(login))
        .route("/api/v1/accounts/register/", post(register))
        .route("/api/v1/accounts/users/me/", get(me))
        .route("/api/v1/accounts/profiles/me/", patch(update_profile))
        .route("/api/v1/accounts/logout/", post(logout))
        .route("/api/v1/listings/materials/", get(materials))
        .route("/api/v1/listings/materials/{slug}/", get(material_detail))
        .route("/api/v1/listings/designs/", get(designs))
        .route("/api/v1/listings/designs/{slug}/", get(design_detail))
        .route("/api/v1/orders/", post(create_order).get(list_orders))
        .route("/api/v1/community/forum-categories/", get(forum_categories))
        .route(
            "/api/v1/community/forum-categories/{slug}/",
            get(forum_category),
        )
        .route(
            "/api/v1/community/forum-threads/",
            get(forum_threads).post(create_thread),
        )
        .route("/api/v1/community/forum-threads/{slug}/", get(forum_thread))
        .route(
            "/api/v1/community/forum-threads/{slug}/create-post/",
            post(create_post),
        )
        .with_state(state)
}

fn user_json(username: &str) -> Value {
    json!({
        "id": 7,
        "username": username,
        "email": format!("{username}@example.com"),
        "first_name": "",
        "last_name": "",
        "user_type": "buyer",
        "profile": {
            "user_type": "buyer",
            "company_name": "Looms & Co"
        }
    })
}

fn page(results: Vec<Value>) -> Value {
    json!({
        "count": results.len(),
        "next": null,
        "previous": null,
        "results": results
    })
}

fn detail(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": message })))
}

// ============================================================================
// Account endpoints
// ============================================================================

async fn login(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let username = body["username"].as_str().unwrap_or_default().to_owned();
    if body["password"].as_str() != Some(PASSWORD) {
        return detail(StatusCode::BAD_REQUEST, "Invalid credentials");
    }

    let token = state.seed_token(&username);
    (
        StatusCode::OK,
        Json(json!({ "token": token, "user": user_json(&username) })),
    )
}

async fn register(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let username = body["username"].as_str().unwrap_or_default().to_owned();
    if username == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "username": ["A user with that username already exists."]
            })),
        );
    }

    let token = state.seed_token(&username);
    (
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": user_json(&username) })),
    )
}

async fn me(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let response = match state.token_username(&headers) {
        Some(username) => (StatusCode::OK, Json(user_json(&username))),
        None => detail(StatusCode::UNAUTHORIZED, "Invalid token."),
    };

    let delay = *state
        .me_delay
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    response
}

async fn update_profile(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match state.token_username(&headers) {
        Some(_) => (
            StatusCode::OK,
            Json(json!({
                "user_type": "buyer",
                "company_name": body["company_name"].as_str().unwrap_or("Looms & Co")
            })),
        ),
        None => detail(StatusCode::UNAUTHORIZED, "Invalid token."),
    }
}

async fn logout(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    match state.token_username(&headers) {
        Some(username) => {
            state.lock_tokens().remove(&format!("tok-{username}"));
            (StatusCode::OK, Json(json!({})))
        }
        None => detail(StatusCode::UNAUTHORIZED, "Invalid token."),
    }
}

// ============================================================================
// Catalog endpoints
// ============================================================================

fn material_json(slug: &str, name: &str, price: &str) -> Value {
    json!({
        "id": material_id(slug),
        "name": name,
        "slug": slug,
        "fabric_type": "COTTON",
        "price_per_unit": price,
        "unit_of_measurement": "meters",
        "seller_username": "millco",
        "main_image_url": format!("https://cdn.example.com/{slug}.jpg")
    })
}

fn material_id(slug: &str) -> i64 {
    match slug {
        "raw-denim" => 12,
        _ => 13,
    }
}

fn design_json(slug: &str, title: &str, price: &str) -> Value {
    json!({
        "id": 8,
        "title": title,
        "slug": slug,
        "price": price,
        "licensing_options": "EXCLUSIVE",
        "designer_username": "atelier",
        "design_image": format!("https://cdn.example.com/{slug}.png")
    })
}

async fn materials(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let all = vec![
        material_json("raw-denim", "Raw Denim", "9.50"),
        material_json("organic-cotton", "Organic Cotton", "12.00"),
    ];
    let results = match query.get("search") {
        Some(term) => all
            .into_iter()
            .filter(|m| {
                m["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(&term.to_lowercase())
            })
            .collect(),
        None => all,
    };
    Json(page(results))
}

async fn material_detail(Path(slug): Path<String>) -> (StatusCode, Json<Value>) {
    match slug.as_str() {
        "raw-denim" => (
            StatusCode::OK,
            Json(material_json("raw-denim", "Raw Denim", "9.50")),
        ),
        "organic-cotton" => (
            StatusCode::OK,
            Json(material_json("organic-cotton", "Organic Cotton", "12.00")),
        ),
        _ => detail(StatusCode::NOT_FOUND, "Not found."),
    }
}

async fn designs(Query(_query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(page(vec![design_json(
        "paisley-block-print",
        "Paisley Block Print",
        "75.00",
    )]))
}

async fn design_detail(Path(slug): Path<String>) -> (StatusCode, Json<Value>) {
    if slug == "paisley-block-print" {
        (
            StatusCode::OK,
            Json(design_json("paisley-block-print", "Paisley Block Print", "75.00")),
        )
    } else {
        detail(StatusCode::NOT_FOUND, "Not found.")
    }
}

// ============================================================================
// Order endpoints
// ============================================================================

fn order_total(items: &Value) -> f64 {
    items
        .as_array()
        .map(|lines| {
            lines
                .iter()
                .map(|line| {
                    let unit: f64 = line["unit_price"]
                        .as_str()
                        .and_then(|p| p.parse().ok())
                        .unwrap_or(0.0);
                    let quantity = line["quantity"].as_u64().unwrap_or(0) as f64;
                    unit * quantity
                })
                .sum()
        })
        .unwrap_or(0.0)
}

async fn create_order(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if state.token_username(&headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Invalid token.");
    }

    let order = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "status": "pending_payment",
        "order_total": format!("{:.2}", order_total(&body["items"])),
        "items": [],
        "shipping_address": body["shipping_address"],
        "billing_address": body["billing_address"],
        "created_at": chrono::Utc::now().to_rfc3339()
    });

    state
        .orders
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(body);

    (StatusCode::CREATED, Json(order))
}

async fn list_orders(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if state.token_username(&headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Invalid token.");
    }

    let orders = state
        .recorded_orders()
        .iter()
        .map(|body| {
            json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "status": "pending_payment",
                "order_total": format!("{:.2}", order_total(&body["items"])),
                "items": [],
                "created_at": chrono::Utc::now().to_rfc3339()
            })
        })
        .collect();

    (StatusCode::OK, Json(page(orders)))
}

// ============================================================================
// Community endpoints
// ============================================================================

fn thread_json(slug: &str, title: &str, posts: Vec<Value>) -> Value {
    json!({
        "id": 3,
        "title": title,
        "slug": slug,
        "author_username": "millco",
        "post_count": posts.len(),
        "created_at": chrono::Utc::now().to_rfc3339(),
        "posts": posts
    })
}

async fn forum_categories() -> Json<Value> {
    Json(page(vec![
        json!({
            "id": 1,
            "name": "Sourcing",
            "slug": "sourcing",
            "description": "Finding and vetting material suppliers",
            "thread_count": 1
        }),
        json!({
            "id": 2,
            "name": "Production",
            "slug": "production",
            "description": "Manufacturing questions",
            "thread_count": 0
        }),
    ]))
}

async fn forum_category(Path(slug): Path<String>) -> (StatusCode, Json<Value>) {
    if slug == "sourcing" {
        (
            StatusCode::OK,
            Json(json!({
                "id": 1,
                "name": "Sourcing",
                "slug": "sourcing",
                "description": "Finding and vetting material suppliers",
                "thread_count": 1
            })),
        )
    } else {
        detail(StatusCode::NOT_FOUND, "Not found.")
    }
}

async fn forum_threads(Query(_query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(page(vec![thread_json(
        "denim-minimums",
        "Denim order minimums?",
        vec![],
    )]))
}

async fn forum_thread(Path(slug): Path<String>) -> (StatusCode, Json<Value>) {
    if slug == "denim-minimums" {
        let posts = vec![json!({
            "id": 11,
            "author_username": "millco",
            "content": "Most mills start at 300 meters.",
            "created_at": chrono::Utc::now().to_rfc3339()
        })];
        (
            StatusCode::OK,
            Json(thread_json("denim-minimums", "Denim order minimums?", posts)),
        )
    } else {
        detail(StatusCode::NOT_FOUND, "Not found.")
    }
}

async fn create_thread(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match state.token_username(&headers) {
        Some(_) => (
            StatusCode::CREATED,
            Json(thread_json(
                "new-thread",
                body["title"].as_str().unwrap_or_default(),
                vec![],
            )),
        ),
        None => detail(StatusCode::UNAUTHORIZED, "Invalid token."),
    }
}

async fn create_post(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(_slug): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match state.token_username(&headers) {
        Some(username) => (
            StatusCode::CREATED,
            Json(json!({
                "id": 42,
                "author_username": username,
                "content": body["content"],
                "created_at": chrono::Utc::now().to_rfc3339()
            })),
        ),
        None => detail(StatusCode::UNAUTHORIZED, "Invalid token."),
    }
}
