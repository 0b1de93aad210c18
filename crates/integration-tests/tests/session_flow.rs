//! Session lifecycle against the stub marketplace API.
//!
//! Exercises the full loop the deployed client runs: cold start, login,
//! persistence, restart rehydration, server-side rejection, logout.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use loomline_client::storage::{KeyValueStore, MemoryStore, keys};
use loomline_client::{
    ApiError, MarketplaceClient, ProfileUpdate, SessionError, SessionState, SessionStore,
};
use loomline_integration_tests::{PASSWORD, TestServer};

async fn harness(server: &TestServer) -> (MarketplaceClient, Arc<SessionStore>, Arc<MemoryStore>) {
    let api = MarketplaceClient::new(&server.config()).unwrap();
    let storage = Arc::new(MemoryStore::new());
    let session = SessionStore::new(api.clone(), storage.clone());
    (api, session, storage)
}

#[tokio::test]
async fn cold_start_without_credentials_is_anonymous() {
    let server = TestServer::spawn().await;
    let (_, session, _) = harness(&server).await;

    assert!(matches!(session.state(), SessionState::Unknown));
    session.initialize().await;
    assert!(matches!(session.state(), SessionState::Anonymous));
}

#[tokio::test]
async fn login_persists_and_publishes_one_authenticated_state() {
    let server = TestServer::spawn().await;
    let (_, session, storage) = harness(&server).await;
    session.initialize().await;

    let mut rx = session.subscribe();
    rx.borrow_and_update();

    let user = session.login("millco", PASSWORD).await.unwrap();
    assert_eq!(user.username, "millco");

    // One transition, carrying both token and user at once.
    rx.changed().await.unwrap();
    let state = rx.borrow_and_update().clone();
    assert!(state.is_authenticated());
    assert_eq!(state.user().unwrap().username, "millco");

    assert_eq!(storage.get(keys::AUTH_TOKEN).as_deref(), Some("tok-millco"));
    assert!(storage.get(keys::AUTH_USER).is_some());
}

#[tokio::test]
async fn invalid_credentials_surface_the_server_message() {
    let server = TestServer::spawn().await;
    let (_, session, storage) = harness(&server).await;
    session.initialize().await;

    let error = session.login("millco", "wrong").await.unwrap_err();
    let SessionError::Api(ApiError::Auth(message)) = error else {
        panic!("expected auth error, got {error}");
    };
    assert_eq!(message, "Invalid credentials");

    // Failed login leaves everything untouched.
    assert!(matches!(session.state(), SessionState::Anonymous));
    assert!(storage.get(keys::AUTH_TOKEN).is_none());
}

#[tokio::test]
async fn register_validation_errors_keep_field_attribution() {
    let server = TestServer::spawn().await;
    let (_, session, _) = harness(&server).await;
    session.initialize().await;

    let request = loomline_core::RegisterRequest {
        username: "taken".to_owned(),
        email: "taken@example.com".to_owned(),
        password: "pw".to_owned(),
        password2: "pw".to_owned(),
        user_type: loomline_core::UserType::Buyer,
        first_name: None,
        last_name: None,
        company_name: None,
    };

    let error = session.register(&request).await.unwrap_err();
    let SessionError::Api(ApiError::Validation(fields)) = error else {
        panic!("expected validation error, got {error}");
    };
    assert_eq!(
        fields.field("username").unwrap(),
        ["A user with that username already exists.".to_string()]
    );
}

#[tokio::test]
async fn restart_rehydrates_from_persisted_token() {
    let server = TestServer::spawn().await;

    let storage = Arc::new(MemoryStore::new());
    {
        let api = MarketplaceClient::new(&server.config()).unwrap();
        let session = SessionStore::new(api, storage.clone());
        session.initialize().await;
        session.login("millco", PASSWORD).await.unwrap();
    }

    // New client and store over the same storage, like a process restart.
    let api = MarketplaceClient::new(&server.config()).unwrap();
    let session = SessionStore::new(api, storage);
    session.initialize().await;

    let state = session.state();
    assert!(state.is_authenticated());
    assert_eq!(state.user().unwrap().username, "millco");
}

#[tokio::test]
async fn stale_persisted_token_is_scrubbed_on_startup() {
    let server = TestServer::spawn().await;
    let (_, session, storage) = harness(&server).await;

    // A token the server never issued (or already revoked).
    storage.set(keys::AUTH_TOKEN, "tok-revoked");
    storage.set(keys::AUTH_USER, r#"{"not":"a user"}"#);

    session.initialize().await;

    assert!(matches!(session.state(), SessionState::Anonymous));
    assert!(storage.get(keys::AUTH_TOKEN).is_none());
    assert!(storage.get(keys::AUTH_USER).is_none());
}

#[tokio::test]
async fn midsession_revocation_flips_state_on_next_request() {
    let server = TestServer::spawn().await;
    let (api, session, storage) = harness(&server).await;
    session.initialize().await;
    session.login("millco", PASSWORD).await.unwrap();

    server.state.revoke_all_tokens();

    // Any authenticated call now comes back 401...
    let error = api.current_user().await.unwrap_err();
    assert!(error.is_unauthorized());

    // ...and the hook has already torn the session down.
    assert!(matches!(session.state(), SessionState::Anonymous));
    assert!(storage.get(keys::AUTH_TOKEN).is_none());
}

#[tokio::test]
async fn logout_during_slow_rehydration_leaves_storage_scrubbed() {
    let server = TestServer::spawn().await;
    let (_, session, storage) = harness(&server).await;

    // A valid persisted session from a previous run.
    server.state.seed_token("millco");
    storage.set(keys::AUTH_TOKEN, "tok-millco");

    // Hold the users/me response long enough for a logout to land first.
    server.state.delay_me(Duration::from_millis(200));
    let rehydrating = tokio::spawn({
        let session = session.clone();
        async move { session.initialize().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    session.logout().await;
    rehydrating.await.unwrap();

    // The late 200 from users/me must not republish the session or write
    // the user snapshot back into the scrubbed storage.
    assert!(matches!(session.state(), SessionState::Anonymous));
    assert!(storage.get(keys::AUTH_TOKEN).is_none());
    assert!(storage.get(keys::AUTH_USER).is_none());
}

#[tokio::test]
async fn profile_update_publishes_even_when_persisted_token_is_lost() {
    let server = TestServer::spawn().await;
    let (_, session, storage) = harness(&server).await;
    session.initialize().await;
    session.login("millco", PASSWORD).await.unwrap();

    // Simulate a storage backend that dropped the token write; the session
    // state, not storage, is the source of truth for the active token.
    storage.remove(keys::AUTH_TOKEN);

    let update = ProfileUpdate {
        company_name: Some("New Mill".to_owned()),
        ..ProfileUpdate::default()
    };
    let user = session.update_profile(&update, None).await.unwrap();
    assert_eq!(user.profile.company_name.as_deref(), Some("New Mill"));

    // Observers see the refreshed identity.
    let current = session.current_user().unwrap();
    assert_eq!(current.profile.company_name.as_deref(), Some("New Mill"));
}

#[tokio::test]
async fn logout_clears_locally_and_is_idempotent() {
    let server = TestServer::spawn().await;
    let (api, session, storage) = harness(&server).await;
    session.initialize().await;
    session.login("millco", PASSWORD).await.unwrap();

    session.logout().await;
    assert!(matches!(session.state(), SessionState::Anonymous));
    assert!(storage.get(keys::AUTH_TOKEN).is_none());
    assert!(!api.has_token());

    // Logging out while logged out changes nothing and raises nothing.
    session.logout().await;
    assert!(matches!(session.state(), SessionState::Anonymous));
}

#[tokio::test]
async fn logout_clears_locally_even_when_server_rejects_it() {
    let server = TestServer::spawn().await;
    let (_, session, storage) = harness(&server).await;
    session.initialize().await;
    session.login("millco", PASSWORD).await.unwrap();

    // The server no longer recognizes the token; the logout call will 401.
    server.state.revoke_all_tokens();
    session.logout().await;

    assert!(matches!(session.state(), SessionState::Anonymous));
    assert!(storage.get(keys::AUTH_TOKEN).is_none());
}
