//! IdentityClient adapter tests
//!
//! Covers:
//! - The bounded readiness gate (shared probe, cached failure)
//! - Provider error translation at the adapter boundary
//! - Request timeout handling
//! - Malformed provider responses

use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pd_session::{AuthError, IdentityClient, SessionConfig};

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

async fn ready_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DISCOVERY_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"issuer": server.uri()})),
        )
        .mount(&server)
        .await;
    server
}

fn test_config(server: &MockServer) -> SessionConfig {
    SessionConfig::new(server.uri(), "test-client")
        .with_request_timeout(Duration::from_secs(2))
        .with_ready_probing(Duration::from_millis(10), 3)
}

fn provider_error(kind: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(serde_json::json!({
        "__type": kind,
        "message": message,
    }))
}

#[tokio::test]
async fn test_readiness_bound_exceeded_fails_fast_afterwards() {
    // No discovery mock mounted: every probe sees 404
    let server = MockServer::start().await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();

    let err = client.sign_in("user@example.com", "pw").await.unwrap_err();
    assert_eq!(err, AuthError::SdkNotReady);

    let probes = server.received_requests().await.unwrap().len();
    assert_eq!(probes, 3);

    // The verdict is cached: no further probing, immediate failure
    let err = client.register("user@example.com", "pw").await.unwrap_err();
    assert_eq!(err, AuthError::SdkNotReady);
    assert_eq!(server.received_requests().await.unwrap().len(), probes);
}

#[tokio::test]
async fn test_readiness_probe_retries_until_discovery_appears() {
    let server = MockServer::start().await;

    // First two probes fail, the third succeeds
    Mock::given(method("GET"))
        .and(path(DISCOVERY_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DISCOVERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"issuer": "x"})))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();

    client.ensure_ready().await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_concurrent_operations_share_one_probe() {
    let server = ready_server().await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();

    let (a, b, c) = tokio::join!(
        client.ensure_ready(),
        client.ensure_ready(),
        client.ensure_ready()
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_duplicate_account() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .and(header("x-amz-target", "AWSCognitoIdentityProviderService.SignUp"))
        .respond_with(provider_error(
            "UsernameExistsException",
            "An account with the given email already exists.",
        ))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();
    let err = client.register("user@example.com", "Password1!").await.unwrap_err();

    assert_eq!(err, AuthError::DuplicateAccount);
}

#[tokio::test]
async fn test_register_weak_password() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .respond_with(provider_error(
            "InvalidPasswordException",
            "Password did not conform with policy",
        ))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();
    let err = client.register("user@example.com", "short").await.unwrap_err();

    assert_eq!(err, AuthError::WeakPassword);
}

#[tokio::test]
async fn test_confirm_code_mismatch() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .and(header(
            "x-amz-target",
            "AWSCognitoIdentityProviderService.ConfirmSignUp",
        ))
        .respond_with(provider_error("CodeMismatchException", "Invalid verification code"))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();
    let err = client
        .confirm_registration("user@example.com", "123456")
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::InvalidOrExpiredCode);
}

#[tokio::test]
async fn test_resend_rate_limited() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .respond_with(provider_error("LimitExceededException", "Attempt limit exceeded"))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();
    let err = client
        .resend_confirmation_code("user@example.com")
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::RateLimited);
}

#[tokio::test]
async fn test_sign_in_unconfirmed_account() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .respond_with(provider_error("UserNotConfirmedException", "User is not confirmed."))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();
    let err = client.sign_in("user@example.com", "pw").await.unwrap_err();

    assert_eq!(err, AuthError::UnconfirmedAccount);
}

#[tokio::test]
async fn test_namespaced_error_identifier() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .respond_with(provider_error(
            "com.amazonaws.cognito.identity.model#NotAuthorizedException",
            "Incorrect username or password.",
        ))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();
    let err = client.sign_in("user@example.com", "pw").await.unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
}

#[tokio::test]
async fn test_password_reset_round_trip() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .and(header(
            "x-amz-target",
            "AWSCognitoIdentityProviderService.ForgotPassword",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "CodeDeliveryDetails": {"Destination": "u***@e***", "DeliveryMedium": "EMAIL"},
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header(
            "x-amz-target",
            "AWSCognitoIdentityProviderService.ConfirmForgotPassword",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();

    client.request_password_reset("user@example.com").await.unwrap();
    client
        .confirm_password_reset("user@example.com", "123456", "NewPassword1!")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_request_timeout_is_network_error() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = test_config(&server).with_request_timeout(Duration::from_millis(100));
    let client = IdentityClient::new(&config).unwrap();

    let err = client.sign_in("user@example.com", "pw").await.unwrap_err();
    assert_eq!(err, AuthError::NetworkError);
}

#[tokio::test]
async fn test_malformed_success_body_is_unknown() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();
    let err = client.sign_in("user@example.com", "pw").await.unwrap_err();

    assert_eq!(err, AuthError::Unknown);
}

#[tokio::test]
async fn test_unsupported_challenge_is_unknown() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ChallengeName": "NEW_PASSWORD_REQUIRED",
            "ChallengeParameters": {},
        })))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();
    let err = client.sign_in("user@example.com", "pw").await.unwrap_err();

    assert_eq!(err, AuthError::Unknown);
}

#[tokio::test]
async fn test_unmapped_provider_error_is_unknown() {
    let server = ready_server().await;

    Mock::given(method("POST"))
        .respond_with(provider_error("InternalErrorException", "stack trace details here"))
        .mount(&server)
        .await;

    let client = IdentityClient::new(&test_config(&server)).unwrap();
    let err = client.sign_in("user@example.com", "pw").await.unwrap_err();

    assert_eq!(err, AuthError::Unknown);
    // The raw provider message must not leak into the user-facing string
    assert!(!err.to_string().contains("stack trace"));
}
