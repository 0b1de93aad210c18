//! Marketplace REST API client.
//!
//! Uses `reqwest` for HTTP with `serde` DTOs. Catalog reads are cached via
//! `moka` (5-minute TTL); cart and session state are never cached here.
//!
//! # Request/response behavior
//!
//! - When a token is attached (after login or rehydration), every request
//!   carries `Authorization: Token <token>`.
//! - JSON payloads are sent as `application/json`; multipart payloads (file
//!   uploads) let the transport set the boundary header itself.
//! - Any 401 response fires the registered unauthorized hook (installed by
//!   the session store) and maps to [`ApiError::Auth`]. The client itself
//!   never mutates session state and never navigates.

mod cache;
pub(crate) mod conversions;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use loomline_core::{
    CartItem, CreateOrderRequest, ForumCategory, ForumPost, ForumThread, ItemKind, NewPost,
    NewThread, Order, OrderId, Price, ProductSnapshot, Profile, RegisterRequest, User,
};

use crate::config::ClientConfig;
use crate::error::{ApiError, decode_error_body};

use cache::CacheValue;
use conversions::{
    RawListing, convert_design, convert_material, convert_order_lines, convert_snapshot,
};

/// Hook fired whenever the server answers 401.
type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

// =============================================================================
// Wire shapes
// =============================================================================

/// DRF-style paginated response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Successful login/register response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Opaque credential for the `Authorization` header.
    pub token: String,
    /// The authenticated account.
    pub user: User,
}

/// A material listing as shown in catalog browsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSummary {
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub fabric_type: String,
    pub price_per_unit: Price,
    pub unit_of_measurement: String,
    pub image: Option<String>,
    pub seller_username: Option<String>,
}

impl MaterialSummary {
    /// Capture this listing as an add-to-cart snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> ProductSnapshot {
        ProductSnapshot {
            id: self
                .id
                .map_or_else(|| self.slug.clone(), |id| id.to_string()),
            kind: ItemKind::Material,
            name: self.name,
            price: self.price_per_unit,
            unit: self.unit_of_measurement,
            image: self.image,
            slug: self.slug,
        }
    }
}

/// A design listing as shown in catalog browsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignSummary {
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub price: Price,
    pub licensing_options: String,
    pub image: Option<String>,
    pub designer_username: Option<String>,
}

impl DesignSummary {
    /// Capture this listing as an add-to-cart snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> ProductSnapshot {
        ProductSnapshot {
            id: self
                .id
                .map_or_else(|| self.slug.clone(), |id| id.to_string()),
            kind: ItemKind::Design,
            name: self.title,
            price: self.price,
            // Licensed designs have no unit of measurement.
            unit: String::new(),
            image: self.image,
            slug: self.slug,
        }
    }
}

/// Adapt an untyped listing payload into an add-to-cart snapshot.
///
/// Applies the documented kind-inference rule (explicit `type` wins, else
/// `price_per_unit` implies material) in the conversions layer; this is the
/// only entry point for payloads with no explicit discriminant.
///
/// # Errors
///
/// Returns [`ApiError::Parse`] if the value is not a listing-shaped object.
pub fn snapshot_from_listing(value: &serde_json::Value) -> Result<ProductSnapshot, ApiError> {
    let raw: RawListing = serde_json::from_value(value.clone())?;
    Ok(convert_snapshot(&raw))
}

/// Partial profile update for `PATCH /accounts/profiles/me/`.
///
/// Only set fields are sent; pair with a [`FilePart`] to upload a new
/// profile picture (which switches the request to multipart).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Payload for `POST /listings/materials/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewMaterial {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fabric_type: String,
    pub price_per_unit: Price,
    pub unit_of_measurement: String,
    pub quantity_available: String,
}

/// An in-memory file to attach to a multipart request.
#[derive(Clone)]
pub struct FilePart {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FilePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePart")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("bytes", &format!("{} bytes", self.bytes.len()))
            .finish()
    }
}

impl FilePart {
    fn into_part(self) -> Result<reqwest::multipart::Part, ApiError> {
        let part = reqwest::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)?;
        Ok(part)
    }
}

// =============================================================================
// MarketplaceClient
// =============================================================================

/// Client for the Loomline marketplace REST API.
///
/// Cheap to clone; all clones share the token slot, the unauthorized hook,
/// and the catalog cache.
#[derive(Clone)]
pub struct MarketplaceClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<SecretString>>,
    unauthorized_hook: RwLock<Option<UnauthorizedHook>>,
    cache: moka::future::Cache<String, CacheValue>,
}

impl std::fmt::Debug for MarketplaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceClient")
            .field("base_url", &self.inner.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl MarketplaceClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = moka::future::Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.api_base_url.as_str().trim_end_matches('/').to_owned(),
                token: RwLock::new(None),
                unauthorized_hook: RwLock::new(None),
                cache,
            }),
        })
    }

    // =========================================================================
    // Token & hook plumbing
    // =========================================================================

    /// Attach a token; every following request carries it.
    pub fn set_token(&self, token: SecretString) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Detach the token; following requests go out anonymous.
    pub fn clear_token(&self) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a token is currently attached.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Register the observer fired on any 401 response.
    ///
    /// The session store installs its invalidation handler here; the client
    /// only signals, it never clears state itself.
    pub fn set_unauthorized_hook(&self, hook: UnauthorizedHook) {
        *self
            .inner
            .unauthorized_hook
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    fn notify_unauthorized(&self) {
        let hook = self
            .inner
            .unauthorized_hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    // =========================================================================
    // Request machinery
    // =========================================================================

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self
            .inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match token.as_ref() {
            Some(token) => builder.header(
                AUTHORIZATION,
                format!("Token {}", token.expose_secret()),
            ),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let text = self.send_raw(builder, path).await?;
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(error) => {
                tracing::error!(
                    path,
                    %error,
                    body = %text.chars().take(500).collect::<String>(),
                    "failed to parse API response"
                );
                Err(ApiError::Parse(error))
            }
        }
    }

    /// Like [`Self::send`] but tolerates an empty success body (logout,
    /// deletes).
    async fn send_no_content(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<(), ApiError> {
        self.send_raw(builder, path).await.map(|_| ())
    }

    async fn send_raw(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<String, ApiError> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.notify_unauthorized();
        }

        Err(decode_error_body(status.as_u16(), path, &text))
    }

    // =========================================================================
    // Account Methods
    // =========================================================================

    /// Exchange credentials for a token and user.
    ///
    /// # Errors
    ///
    /// `ApiError::Auth` carries the server's message on invalid credentials.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let path = "accounts/login/";
        let body = serde_json::json!({ "username": username, "password": password });
        self.send(self.inner.http.post(self.endpoint(path)).json(&body), path)
            .await
    }

    /// Create an account; same response contract as [`Self::login`].
    ///
    /// # Errors
    ///
    /// Field-level problems surface as `ApiError::Validation` with the
    /// server's key/message mapping intact.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let path = "accounts/register/";
        self.send(self.inner.http.post(self.endpoint(path)).json(request), path)
            .await
    }

    /// Fetch the account behind the attached token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` when the token is missing or stale.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let path = "accounts/users/me/";
        self.send(self.inner.http.get(self.endpoint(path)), path)
            .await
    }

    /// Invalidate the token server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; callers treating logout as
    /// best-effort log and ignore it.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let path = "accounts/logout/";
        self.send_no_content(self.inner.http.post(self.endpoint(path)), path)
            .await
    }

    /// Fetch the authenticated user's profile record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_profile(&self) -> Result<Profile, ApiError> {
        let path = "accounts/profiles/me/";
        self.send(self.inner.http.get(self.endpoint(path)), path)
            .await
    }

    /// Patch the authenticated user's profile.
    ///
    /// Sent as JSON, unless `picture` is given: then the whole update goes as
    /// one multipart form and the transport sets the boundary header.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the picture's MIME type is
    /// invalid.
    #[instrument(skip(self, update, picture))]
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        picture: Option<FilePart>,
    ) -> Result<Profile, ApiError> {
        let path = "accounts/profiles/me/";
        let url = self.endpoint(path);

        let builder = match picture {
            Some(picture) => {
                let mut form = reqwest::multipart::Form::new();
                if let Some(value) = &update.company_name {
                    form = form.text("company_name", value.clone());
                }
                if let Some(value) = &update.contact_number {
                    form = form.text("contact_number", value.clone());
                }
                if let Some(value) = &update.address {
                    form = form.text("address", value.clone());
                }
                form = form.part("profile_picture", picture.into_part()?);
                self.inner.http.patch(url).multipart(form)
            }
            None => self.inner.http.patch(url).json(update),
        };

        self.send(builder, path).await
    }

    // =========================================================================
    // Catalog Methods (cached)
    // =========================================================================

    /// Get a page of material listings.
    ///
    /// Search results are never cached; plain page reads are (5-minute TTL).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_materials(
        &self,
        search: Option<&str>,
        page: Option<u32>,
    ) -> Result<Page<MaterialSummary>, ApiError> {
        let cache_key = format!("materials:{}", page.unwrap_or(1));

        if search.is_none()
            && let Some(CacheValue::Materials(materials)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for materials");
            return Ok(materials);
        }

        let path = "listings/materials/";
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(search) = search {
            query.push(("search", search.to_owned()));
        }
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }

        let raw: Page<RawListing> = self
            .send(
                self.inner.http.get(self.endpoint(path)).query(&query),
                path,
            )
            .await?;

        let page_out = Page {
            count: raw.count,
            next: raw.next,
            previous: raw.previous,
            results: raw.results.into_iter().map(convert_material).collect(),
        };

        if search.is_none() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Materials(page_out.clone()))
                .await;
        }

        Ok(page_out)
    }

    /// Get a material by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the material is not found or the request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_material(&self, slug: &str) -> Result<MaterialSummary, ApiError> {
        let cache_key = format!("material:{slug}");

        if let Some(CacheValue::Material(material)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for material");
            return Ok(*material);
        }

        let path = format!("listings/materials/{slug}/");
        let raw: RawListing = self
            .send(self.inner.http.get(self.endpoint(&path)), &path)
            .await?;
        let material = convert_material(raw);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Material(Box::new(material.clone())))
            .await;

        Ok(material)
    }

    /// Create a material listing, with an optional image upload (multipart).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; sellers only.
    #[instrument(skip(self, material, image), fields(name = %material.name))]
    pub async fn create_material(
        &self,
        material: &NewMaterial,
        image: Option<FilePart>,
    ) -> Result<MaterialSummary, ApiError> {
        let path = "listings/materials/";
        let url = self.endpoint(path);

        let builder = match image {
            Some(image) => {
                let mut form = reqwest::multipart::Form::new()
                    .text("name", material.name.clone())
                    .text("fabric_type", material.fabric_type.clone())
                    .text("price_per_unit", material.price_per_unit.to_string())
                    .text(
                        "unit_of_measurement",
                        material.unit_of_measurement.clone(),
                    )
                    .text("quantity_available", material.quantity_available.clone());
                if let Some(description) = &material.description {
                    form = form.text("description", description.clone());
                }
                form = form.part("image", image.into_part()?);
                self.inner.http.post(url).multipart(form)
            }
            None => self.inner.http.post(url).json(material),
        };

        let raw: RawListing = self.send(builder, path).await?;
        self.invalidate_materials().await;
        Ok(convert_material(raw))
    }

    /// Get a page of design listings.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_designs(
        &self,
        search: Option<&str>,
        page: Option<u32>,
    ) -> Result<Page<DesignSummary>, ApiError> {
        let cache_key = format!("designs:{}", page.unwrap_or(1));

        if search.is_none()
            && let Some(CacheValue::Designs(designs)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for designs");
            return Ok(designs);
        }

        let path = "listings/designs/";
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(search) = search {
            query.push(("search", search.to_owned()));
        }
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }

        let raw: Page<RawListing> = self
            .send(
                self.inner.http.get(self.endpoint(path)).query(&query),
                path,
            )
            .await?;

        let page_out = Page {
            count: raw.count,
            next: raw.next,
            previous: raw.previous,
            results: raw.results.into_iter().map(convert_design).collect(),
        };

        if search.is_none() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Designs(page_out.clone()))
                .await;
        }

        Ok(page_out)
    }

    /// Get a design by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the design is not found or the request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_design(&self, slug: &str) -> Result<DesignSummary, ApiError> {
        let cache_key = format!("design:{slug}");

        if let Some(CacheValue::Design(design)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for design");
            return Ok(*design);
        }

        let path = format!("listings/designs/{slug}/");
        let raw: RawListing = self
            .send(self.inner.http.get(self.endpoint(&path)), &path)
            .await?;
        let design = convert_design(raw);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Design(Box::new(design.clone())))
            .await;

        Ok(design)
    }

    // =========================================================================
    // Order Methods (not cached - mutable state)
    // =========================================================================

    /// Create an order from cart lines.
    ///
    /// Each line's kind picks the `material_id`/`design_id` discriminant and
    /// `unit_price` carries the add-time snapshot price.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is rejected or the request fails.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn create_order(
        &self,
        items: &[CartItem],
        shipping_address: Option<String>,
        billing_address: Option<String>,
    ) -> Result<Order, ApiError> {
        let path = "orders/";
        let request = CreateOrderRequest {
            items: convert_order_lines(items),
            shipping_address,
            billing_address,
        };
        self.send(
            self.inner.http.post(self.endpoint(path)).json(&request),
            path,
        )
        .await
    }

    /// Get the authenticated user's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_my_orders(&self) -> Result<Page<Order>, ApiError> {
        let path = "orders/";
        self.send(self.inner.http.get(self.endpoint(path)), path)
            .await
    }

    /// Get one order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, ApiError> {
        let path = format!("orders/{order_id}/");
        self.send(self.inner.http.get(self.endpoint(&path)), &path)
            .await
    }

    // =========================================================================
    // Community Methods
    // =========================================================================

    /// List forum categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_forum_categories(&self) -> Result<Page<ForumCategory>, ApiError> {
        let path = "community/forum-categories/";
        self.send(self.inner.http.get(self.endpoint(path)), path)
            .await
    }

    /// Get one category by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the category is not found or the request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_forum_category(&self, slug: &str) -> Result<ForumCategory, ApiError> {
        let path = format!("community/forum-categories/{slug}/");
        self.send(self.inner.http.get(self.endpoint(&path)), &path)
            .await
    }

    /// List threads, optionally filtered to one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_forum_threads(
        &self,
        category_slug: Option<&str>,
    ) -> Result<Page<ForumThread>, ApiError> {
        let path = "community/forum-threads/";
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(category_slug) = category_slug {
            query.push(("category_slug", category_slug.to_owned()));
        }
        self.send(
            self.inner.http.get(self.endpoint(path)).query(&query),
            path,
        )
        .await
    }

    /// Get a thread with its posts.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread is not found or the request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_forum_thread(&self, slug: &str) -> Result<ForumThread, ApiError> {
        let path = format!("community/forum-threads/{slug}/");
        self.send(self.inner.http.get(self.endpoint(&path)), &path)
            .await
    }

    /// Start a new thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; requires authentication.
    #[instrument(skip(self, thread), fields(title = %thread.title))]
    pub async fn create_forum_thread(&self, thread: &NewThread) -> Result<ForumThread, ApiError> {
        let path = "community/forum-threads/";
        self.send(
            self.inner.http.post(self.endpoint(path)).json(thread),
            path,
        )
        .await
    }

    /// Reply to a thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; requires authentication.
    #[instrument(skip(self, post), fields(thread = %thread_slug))]
    pub async fn create_forum_post(
        &self,
        thread_slug: &str,
        post: &NewPost,
    ) -> Result<ForumPost, ApiError> {
        let path = format!("community/forum-threads/{thread_slug}/create-post/");
        self.send(
            self.inner.http.post(self.endpoint(&path)).json(post),
            &path,
        )
        .await
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate all cached material pages and details.
    pub async fn invalidate_materials(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}
