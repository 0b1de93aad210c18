//! Authenticated-session lifecycle.
//!
//! [`SessionStore`] owns the identity state machine: `Unknown` until the
//! persisted token has been checked, then `Anonymous` or `Authenticated`.
//! The token and the user travel together inside the `Authenticated` variant,
//! so no observer can ever see one without the other.
//!
//! State changes are published over a `tokio::sync::watch` channel;
//! [`SessionStore::subscribe`] hands out receivers. The store also installs
//! itself as the API client's unauthorized hook, so any 401 anywhere in the
//! application flips the session to `Anonymous` and scrubs local state.
//!
//! A generation counter guards against stale async completions: every
//! invalidation or logout bumps it, and an in-flight login/rehydration whose
//! generation no longer matches publishes nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use loomline_core::{Profile, RegisterRequest, User};

use crate::error::ApiError;
use crate::marketplace::{MarketplaceClient, ProfileUpdate};
use crate::storage::{self, KeyValueStore, keys};

/// Session operation errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The API rejected or failed the request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The operation needs an authenticated session.
    #[error("Not authenticated")]
    NotAuthenticated,
}

/// An authenticated identity: the token and the account it belongs to,
/// inseparable by construction.
#[derive(Debug, Clone)]
pub struct Session {
    token: SecretString,
    user: User,
}

impl Session {
    /// The authenticated account.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }
}

/// Where the client currently stands with the server.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// Startup: persisted credentials not yet examined.
    #[default]
    Unknown,
    /// No credentials; browsing as a guest.
    Anonymous,
    /// Valid (as far as we know) token plus its account.
    Authenticated(Session),
}

impl SessionState {
    /// Whether this state carries an identity.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The authenticated account, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(session) => Some(&session.user),
            _ => None,
        }
    }
}

/// Reactive store for the authenticated session.
///
/// Create with [`SessionStore::new`], then call [`SessionStore::initialize`]
/// once at startup to resolve the persisted token.
pub struct SessionStore {
    api: MarketplaceClient,
    storage: Arc<dyn KeyValueStore>,
    state: watch::Sender<SessionState>,
    loading: AtomicBool,
    generation: AtomicU64,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.borrow())
            .field("loading", &self.loading.load(Ordering::Relaxed))
            .finish()
    }
}

impl SessionStore {
    /// Create the store and register it as the client's 401 observer.
    #[must_use]
    pub fn new(api: MarketplaceClient, storage: Arc<dyn KeyValueStore>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Unknown);
        let store = Arc::new(Self {
            api: api.clone(),
            storage,
            state,
            loading: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        });

        // Weak, so the hook never keeps a dropped store alive.
        let weak = Arc::downgrade(&store);
        api.set_unauthorized_hook(Arc::new(move || {
            if let Some(store) = weak.upgrade() {
                info!("server rejected credentials, invalidating session");
                store.invalidate();
            }
        }));

        store
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes. The receiver sees the current value
    /// immediately and every transition after it.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Whether an initialize/login/register call is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    /// The authenticated account, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Resolve the persisted token into a definite session state.
    ///
    /// No token: `Anonymous`. A token with a cached user: `Authenticated`
    /// provisionally while `users/me` revalidates it, then `Authenticated`
    /// with the fresh user. Any revalidation failure scrubs the persisted
    /// credentials and settles to `Anonymous`; this call always terminates in
    /// a settled state.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        self.loading.store(true, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::Acquire);

        let Some(token) = self.storage.get(keys::AUTH_TOKEN) else {
            self.publish(generation, SessionState::Anonymous);
            self.loading.store(false, Ordering::Relaxed);
            return;
        };

        let token = SecretString::from(token);
        self.api.set_token(token.clone());

        // Optimistic rehydration from the cached user snapshot; consumers
        // observing the loading flag won't act on it before we settle.
        if let Some(user) = storage::read_json(self.storage.as_ref(), keys::AUTH_USER) {
            self.publish(
                generation,
                SessionState::Authenticated(Session {
                    token: token.clone(),
                    user,
                }),
            );
        }

        match self.api.current_user().await {
            Ok(user) => {
                // A logout that raced this response has already scrubbed
                // storage; the stale snapshot must not be written back.
                if self.still_current(generation) {
                    storage::write_json(self.storage.as_ref(), keys::AUTH_USER, &user);
                    self.state
                        .send_replace(SessionState::Authenticated(Session { token, user }));
                } else {
                    debug!("discarding stale rehydration completion");
                }
            }
            Err(error) => {
                if error.is_unauthorized() {
                    debug!("persisted token rejected during rehydration");
                } else {
                    warn!(%error, "could not revalidate session, starting anonymous");
                }
                self.invalidate();
            }
        }

        self.loading.store(false, Ordering::Relaxed);
    }

    /// Log in with username and password.
    ///
    /// On success the token and user are persisted and published atomically
    /// as one `Authenticated` state.
    ///
    /// # Errors
    ///
    /// `ApiError::Auth` carries the server's message on bad credentials; the
    /// current state is left untouched on any failure.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, SessionError> {
        self.loading.store(true, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::Acquire);

        let result = self.api.login(username, password).await;
        self.loading.store(false, Ordering::Relaxed);

        let auth = result?;
        self.establish(generation, auth.token, auth.user.clone());
        Ok(auth.user)
    }

    /// Create an account and start its session in one step.
    ///
    /// # Errors
    ///
    /// Field problems come back as `ApiError::Validation` with the server's
    /// per-field messages.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, SessionError> {
        self.loading.store(true, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::Acquire);

        let result = self.api.register(request).await;
        self.loading.store(false, Ordering::Relaxed);

        let auth = result?;
        self.establish(generation, auth.token, auth.user.clone());
        Ok(auth.user)
    }

    /// End the session.
    ///
    /// The server call is best-effort; local state is cleared whether it
    /// succeeds or not, and calling this while already anonymous is a no-op.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if self.api.has_token() {
            if let Err(error) = self.api.logout().await {
                warn!(%error, "server-side logout failed, clearing local session anyway");
            }
        }
        self.invalidate();
    }

    /// Patch the profile of the authenticated user and publish the refreshed
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] when no session is active.
    #[instrument(skip(self, update, picture))]
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        picture: Option<crate::marketplace::FilePart>,
    ) -> Result<User, SessionError> {
        let current = self.state.borrow().clone();
        let SessionState::Authenticated(session) = current else {
            return Err(SessionError::NotAuthenticated);
        };
        let generation = self.generation.load(Ordering::Acquire);

        let profile: Profile = self.api.update_profile(update, picture).await?;
        let mut user = session.user;
        user.profile = profile;

        if self.still_current(generation) {
            storage::write_json(self.storage.as_ref(), keys::AUTH_USER, &user);
            self.state.send_replace(SessionState::Authenticated(Session {
                token: session.token,
                user: user.clone(),
            }));
        }
        Ok(user)
    }

    /// Replace the cached user snapshot without a server round-trip.
    ///
    /// For consumers that already hold a fresher user object (e.g. after a
    /// profile edit through another code path): re-persists the snapshot and
    /// publishes the refreshed identity under the existing token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] when no session is active.
    pub fn update_context(&self, user: User) -> Result<(), SessionError> {
        let current = self.state.borrow().clone();
        let SessionState::Authenticated(session) = current else {
            return Err(SessionError::NotAuthenticated);
        };

        storage::write_json(self.storage.as_ref(), keys::AUTH_USER, &user);
        self.state.send_replace(SessionState::Authenticated(Session {
            token: session.token,
            user,
        }));
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn establish(&self, generation: u64, token: String, user: User) {
        if !self.still_current(generation) {
            debug!("discarding stale login completion");
            return;
        }

        self.storage.set(keys::AUTH_TOKEN, &token);
        storage::write_json(self.storage.as_ref(), keys::AUTH_USER, &user);

        let token = SecretString::from(token);
        self.api.set_token(token.clone());
        self.state
            .send_replace(SessionState::Authenticated(Session { token, user }));
    }

    /// Drop the session locally: scrub storage, detach the token, publish
    /// `Anonymous`. Safe to call repeatedly.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.storage.remove(keys::AUTH_TOKEN);
        self.storage.remove(keys::AUTH_USER);
        self.api.clear_token();
        self.state.send_replace(SessionState::Anonymous);
    }

    /// Publish `next` unless the session generation has moved since the
    /// operation began.
    fn publish(&self, generation: u64, next: SessionState) {
        if !self.still_current(generation) {
            debug!("discarding stale session state");
            return;
        }
        self.state.send_replace(next);
    }

    /// Whether the session generation is unchanged since `generation` was
    /// read at the start of an async operation.
    fn still_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::MemoryStore;

    fn api(base: &str) -> MarketplaceClient {
        MarketplaceClient::new(&ClientConfig::for_base_url(base.parse().unwrap())).unwrap()
    }

    fn sample_user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "username": "mill_co",
            "email": "ops@mill.example",
            "user_type": "seller",
            "profile": { "user_type": "seller" }
        }))
        .unwrap()
    }

    #[test]
    fn test_starts_unknown() {
        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), Arc::new(MemoryStore::new()));
        assert!(matches!(store.state(), SessionState::Unknown));
        assert!(!store.is_loading());
        assert!(store.current_user().is_none());
    }

    #[tokio::test]
    async fn test_initialize_without_token_is_anonymous() {
        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), Arc::new(MemoryStore::new()));
        store.initialize().await;
        assert!(matches!(store.state(), SessionState::Anonymous));
    }

    #[tokio::test]
    async fn test_initialize_settles_anonymous_when_server_unreachable() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::AUTH_TOKEN, "tok-123");
        storage::write_json(storage.as_ref(), keys::AUTH_USER, &sample_user());

        // Port 9 (discard) refuses connections, so revalidation fails.
        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), storage.clone());
        store.initialize().await;

        assert!(matches!(store.state(), SessionState::Anonymous));
        assert!(!store.is_loading());
        assert!(storage.get(keys::AUTH_TOKEN).is_none());
        assert!(storage.get(keys::AUTH_USER).is_none());
    }

    #[tokio::test]
    async fn test_malformed_cached_user_is_treated_as_absent() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::AUTH_TOKEN, "tok-123");
        storage.set(keys::AUTH_USER, "{corrupted");

        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), storage);
        store.initialize().await;

        assert!(matches!(store.state(), SessionState::Anonymous));
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::AUTH_TOKEN, "tok-123");

        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), storage.clone());
        store.invalidate();
        assert!(matches!(store.state(), SessionState::Anonymous));
        assert!(storage.get(keys::AUTH_TOKEN).is_none());

        store.invalidate();
        assert!(matches!(store.state(), SessionState::Anonymous));
    }

    #[tokio::test]
    async fn test_logout_without_session_is_noop() {
        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), Arc::new(MemoryStore::new()));
        store.initialize().await;
        store.logout().await;
        store.logout().await;
        assert!(matches!(store.state(), SessionState::Anonymous));
    }

    #[tokio::test]
    async fn test_update_profile_requires_session() {
        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), Arc::new(MemoryStore::new()));
        store.initialize().await;
        let result = store.update_profile(&ProfileUpdate::default(), None).await;
        assert!(matches!(result, Err(SessionError::NotAuthenticated)));
    }

    #[test]
    fn test_update_context_requires_session() {
        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), Arc::new(MemoryStore::new()));
        let result = store.update_context(sample_user());
        assert!(matches!(result, Err(SessionError::NotAuthenticated)));
    }

    #[test]
    fn test_update_context_republishes_under_same_token() {
        let storage = Arc::new(MemoryStore::new());
        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), storage.clone());
        store.establish(0, "tok-123".to_owned(), sample_user());
        assert!(store.state().is_authenticated());

        let mut fresher = sample_user();
        fresher.first_name = "Mill".to_owned();
        store.update_context(fresher).unwrap();

        assert_eq!(store.current_user().unwrap().first_name, "Mill");
        let persisted: User = storage::read_json(storage.as_ref(), keys::AUTH_USER).unwrap();
        assert_eq!(persisted.first_name, "Mill");
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let store = SessionStore::new(api("http://127.0.0.1:9/api/v1"), Arc::new(MemoryStore::new()));
        let mut rx = store.subscribe();
        assert!(matches!(*rx.borrow_and_update(), SessionState::Unknown));

        store.initialize().await;
        rx.changed().await.unwrap();
        assert!(matches!(*rx.borrow_and_update(), SessionState::Anonymous));
    }
}
