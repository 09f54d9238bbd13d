//! SSO login flow tests against a mocked Garmin backend.

use chrono::Utc;
use secrecy::SecretString;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use garmin_client::config::{Credentials, GarminUrls, TokenPaths};
use garmin_client::{GarminClient, GarminError};
use garmin_client::http_client::ReqwestGarminClient;
use garmin_client::sso::LoginOutcome;
use garmin_client::token_store::{OAuth2Token, TokenStore};

const SIGNIN_FORM: &str = concat!(
    "<html><head><title>Sign In</title></head>",
    r#"<body><input type="hidden" name="_csrf" value="csrf-signin"></body></html>"#,
);

const SUCCESS_PAGE: &str = concat!(
    "<html><head><title>Success</title></head><body><script>",
    r#"var response_url = "https://sso.garmin.com/sso/embed?ticket=ST-TICKET-1";"#,
    "</script></body></html>",
);

const MFA_PAGE: &str = concat!(
    "<html><head><title>MFA Required</title></head>",
    r#"<body><input type="hidden" name="_csrf" value="csrf-mfa"></body></html>"#,
);

const BAD_CREDENTIALS_PAGE: &str =
    "<html><head><title>Sign In Failure</title></head><body></body></html>";

fn token_json() -> serde_json::Value {
    serde_json::json!({
        "access_token": "access-1",
        "refresh_token": "refresh-1",
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token_expires_in": 86400,
        "scope": "connect:all"
    })
}

fn credentials() -> Credentials {
    Credentials {
        email: "test@example.com".into(),
        password: SecretString::new("secret".into()),
    }
}

fn urls_for(server: &MockServer) -> GarminUrls {
    GarminUrls {
        sso_url: server.uri(),
        api_url: server.uri(),
    }
}

fn store_in(dir: &tempfile::TempDir) -> TokenStore {
    TokenStore::new(TokenPaths::new(
        dir.path().join("tokens"),
        dir.path().join("tokens.b64"),
    ))
}

async fn mount_sso_pages(server: &MockServer, signin_response: &str) {
    Mock::given(method("GET"))
        .and(path("/sso/embed"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sso/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SIGNIN_FORM))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_string(signin_response.to_string()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn login_succeeds_and_persists_tokens() {
    let server = MockServer::start().await;
    mount_sso_pages(&server, SUCCESS_PAGE).await;
    Mock::given(method("POST"))
        .and(path("/oauth-service/oauth/exchange/user/2.0"))
        .and(body_string_contains("ticket=ST-TICKET-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let client = ReqwestGarminClient::with_store(urls_for(&server), store.clone());

    let outcome = client.login(&credentials()).await.expect("login");
    assert!(matches!(outcome, LoginOutcome::Success(_)));
    assert!(client.is_authenticated().await);

    let persisted = store.load().expect("persisted tokens");
    assert_eq!(persisted.access_token, "access-1");
    assert_eq!(persisted.refresh_token, "refresh-1");
}

#[tokio::test]
async fn login_with_mfa_resumes_with_code() {
    let server = MockServer::start().await;
    mount_sso_pages(&server, MFA_PAGE).await;
    Mock::given(method("POST"))
        .and(path("/sso/verifyMFA/loginEnterMfaCode"))
        .and(body_string_contains("mfa-code=123456"))
        .and(body_string_contains("_csrf=csrf-mfa"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUCCESS_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth-service/oauth/exchange/user/2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let client = ReqwestGarminClient::with_store(urls_for(&server), store.clone());

    let outcome = client.login(&credentials()).await.expect("login");
    let ctx = match outcome {
        LoginOutcome::MfaRequired(ctx) => ctx,
        LoginOutcome::Success(_) => panic!("expected an MFA challenge"),
    };
    assert!(!client.is_authenticated().await);

    client.resume_login(&ctx, "123456").await.expect("resume");
    assert!(client.is_authenticated().await);
    assert!(store.exists());
}

#[tokio::test]
async fn mfa_rejects_empty_code_without_network() {
    let server = MockServer::start().await;
    mount_sso_pages(&server, MFA_PAGE).await;

    let client = ReqwestGarminClient::new(urls_for(&server));
    let outcome = client.login(&credentials()).await.expect("login");
    let ctx = match outcome {
        LoginOutcome::MfaRequired(ctx) => ctx,
        LoginOutcome::Success(_) => panic!("expected an MFA challenge"),
    };

    let err = client.resume_login(&ctx, "   ").await.unwrap_err();
    assert!(matches!(err, GarminError::Mfa(_)));
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let server = MockServer::start().await;
    mount_sso_pages(&server, BAD_CREDENTIALS_PAGE).await;

    let client = ReqwestGarminClient::new(urls_for(&server));
    let err = client.login(&credentials()).await.unwrap_err();
    assert!(matches!(err, GarminError::Auth(_)));
    assert!(err.to_string().contains("login rejected"));
}

#[tokio::test]
async fn stale_access_token_is_refreshed_and_repersisted() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();

    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .dump(&OAuth2Token {
            access_token: "stale".into(),
            refresh_token: "refresh-1".into(),
            token_type: "Bearer".into(),
            expires_at: now - 10,
            refresh_token_expires_at: now + 86400,
            scope: String::new(),
        })
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth-service/oauth/exchange/user/2.0"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-1",
            "refresh_token": "refresh-2",
            "expires_in": 3600,
            "refresh_token_expires_in": 86400,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/activity-service/activity/activityTypes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let client = ReqwestGarminClient::restore(urls_for(&server), store.clone()).expect("restore");
    client.get_activity_types().await.expect("request");

    let persisted = store.load().expect("persisted tokens");
    assert_eq!(persisted.access_token, "fresh-1");
    assert_eq!(persisted.refresh_token, "refresh-2");
}

#[tokio::test]
async fn restore_rejects_expired_refresh_token() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let now = Utc::now().timestamp();
    store
        .dump(&OAuth2Token {
            access_token: "stale".into(),
            refresh_token: "dead".into(),
            token_type: "Bearer".into(),
            expires_at: now - 10,
            refresh_token_expires_at: now - 10,
            scope: String::new(),
        })
        .unwrap();

    let urls = GarminUrls::default();
    let err = match ReqwestGarminClient::restore(urls, store) {
        Err(e) => e,
        Ok(_) => panic!("restore should fail"),
    };
    assert!(matches!(err, GarminError::Auth(_)));
    assert!(err.to_string().contains("re-authenticate"));
}
