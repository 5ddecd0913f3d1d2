//! Integration tests for token refresh and the authorization code flow

use std::sync::Arc;

use drivefs_core::ports::{MemorySessionStore, SessionStore};
use drivefs_graph::auth::{
    load_token, AuthError, AuthorizationFlow, TokenRefresher, TokenStore, TOKEN_SESSION_KEY,
};
use drivefs_graph::GraphError;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_valid_token_makes_no_exchange() {
    let server = MockServer::start().await;
    common::mount_token_endpoint(&server, 0).await;

    let refresher = TokenRefresher::new(common::settings(&server));
    let token = common::valid_token();
    let result = refresher.refresh(&token).await.unwrap();

    assert_eq!(result, token);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once_and_persisted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=test-refresh-token"))
        .and(body_string_contains("client_id=test-client"))
        .and(body_string_contains("client_secret=test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "new-refresh-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let store = TokenStore::new(
        common::expired_token(),
        TokenRefresher::new(common::settings(&server)),
        session.clone(),
    );

    assert_eq!(store.access_token().await.unwrap(), "new-access-token");
    // Second call uses the refreshed token
    assert_eq!(store.access_token().await.unwrap(), "new-access-token");

    let persisted = load_token(session.as_ref()).unwrap().expect("token persisted");
    assert_eq!(persisted.access_token, "new-access-token");
    assert_eq!(persisted.refresh_token.as_deref(), Some("new-refresh-token"));
    assert!(persisted.is_valid());
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    common::mount_token_endpoint(&server, 1).await;

    let store = Arc::new(TokenStore::new(
        common::expired_token(),
        TokenRefresher::new(common::settings(&server)),
        Arc::new(MemorySessionStore::new()),
    ));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.access_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "new-access-token");
    }
}

#[tokio::test]
async fn test_refresh_keeps_old_refresh_token_when_none_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access-token",
            "token_type": "bearer"
        })))
        .mount(&server)
        .await;

    let refresher = TokenRefresher::new(common::settings(&server));
    let token = refresher.refresh(&common::expired_token()).await.unwrap();

    assert_eq!(token.refresh_token.as_deref(), Some("test-refresh-token"));
    assert_eq!(token.expires_in, 3600);
}

#[tokio::test]
async fn test_rejected_exchange_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The refresh token has expired"
        })))
        .mount(&server)
        .await;

    let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let store = TokenStore::new(
        common::expired_token(),
        TokenRefresher::new(common::settings(&server)),
        session.clone(),
    );

    let err = store.access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::Exchange(_)), "got {err:?}");
    assert!(session.get(TOKEN_SESSION_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_unparsable_token_payload_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let refresher = TokenRefresher::new(common::settings(&server));
    let err = refresher
        .refresh(&common::expired_token())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidPayload(_)), "got {err:?}");
}

#[tokio::test]
async fn test_api_call_refreshes_before_request() {
    let server = MockServer::start().await;
    common::mount_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/drive/items/root"))
        .and(header("authorization", "Bearer new-access-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::folder_json("root", "root", 2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client_with(
        &server,
        common::expired_token(),
        Arc::new(MemorySessionStore::new()),
    );

    let item = client
        .get_item(
            &drivefs_core::domain::ItemId::root(),
            &Default::default(),
        )
        .await
        .unwrap();
    assert_eq!(item.id, "root");
}

#[tokio::test]
async fn test_api_call_with_unrefreshable_token_fails_with_auth() {
    let server = MockServer::start().await;
    let mut token = common::expired_token();
    token.refresh_token = None;

    let client = common::client_with(&server, token, Arc::new(MemorySessionStore::new()));
    let err = client
        .get_item(&drivefs_core::domain::ItemId::root(), &Default::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraphError::Auth(AuthError::MissingRefreshToken)
    ));
}

#[tokio::test]
async fn test_authorization_code_flow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "first-access-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "first-refresh-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let flow = AuthorizationFlow::new(common::settings(&server), session.clone());

    let url = url::Url::parse(&flow.begin().unwrap()).unwrap();
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state parameter");

    let token = flow.complete("auth-code-1", Some(state.as_str())).await.unwrap();
    assert_eq!(token.access_token, "first-access-token");

    let stored = flow.stored_token().unwrap().expect("stored token");
    assert_eq!(stored.refresh_token.as_deref(), Some("first-refresh-token"));

    // The persisted token is enough to build a token store later on
    let store = TokenStore::from_session(TokenRefresher::new(common::settings(&server)), session)
        .unwrap();
    assert_eq!(store.access_token().await.unwrap(), "first-access-token");
}
