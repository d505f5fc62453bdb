//! Identity provider adapter
//!
//! Speaks the provider's JSON wire protocol: every operation is a POST to
//! the pool endpoint with an `x-amz-target` action header, and failures
//! come back as `{"__type": "...Exception", "message": "..."}` bodies.
//! Nothing escapes this boundary except the closed [`AuthError`] taxonomy -
//! transport failures, malformed bodies, and provider exceptions are all
//! normalized here.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use pd_common::AuthError;

use crate::config::{ConfigError, SessionConfig};
use crate::translate;

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Token material issued by a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignInTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
    /// Access-token lifetime in seconds, when the provider reports one
    pub expires_in: Option<u64>,
}

/// Token material issued by a successful refresh. The provider only
/// returns a new refresh token when it rotates the old one.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: Option<String>,
    refresh_token: Option<String>,
    id_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Adapter to the remote identity provider.
pub struct IdentityClient {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
    ready_poll_interval: Duration,
    ready_max_attempts: u32,
    /// One shared initialization future; its outcome (including failure) is
    /// cached so every caller observes the same readiness verdict.
    ready: OnceCell<Result<(), AuthError>>,
}

impl IdentityClient {
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.provider_endpoint.clone(),
            client_id: config.client_id.clone(),
            ready_poll_interval: config.ready_poll_interval,
            ready_max_attempts: config.ready_max_attempts,
            ready: OnceCell::new(),
        })
    }

    /// Wait for the provider to become reachable.
    ///
    /// Polls the discovery document at a fixed interval up to a bounded
    /// number of attempts. Concurrent callers share one probe; once the
    /// bound is exceeded every subsequent operation fails fast with
    /// [`AuthError::SdkNotReady`].
    pub async fn ensure_ready(&self) -> Result<(), AuthError> {
        self.ready.get_or_init(|| self.probe_ready()).await.clone()
    }

    async fn probe_ready(&self) -> Result<(), AuthError> {
        let url = format!("{}/.well-known/openid-configuration", self.endpoint);

        for attempt in 1..=self.ready_max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.ready_poll_interval).await;
            }
            match self.http.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(attempt, "identity provider ready");
                    return Ok(());
                }
                Ok(response) => {
                    debug!(attempt, status = %response.status(), "identity provider not ready yet");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "identity provider unreachable");
                }
            }
        }

        warn!(
            attempts = self.ready_max_attempts,
            "identity provider never became ready"
        );
        Err(AuthError::SdkNotReady)
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.call(
            "SignUp",
            json!({
                "ClientId": self.client_id,
                "Username": email,
                "Password": password,
                "UserAttributes": [{"Name": "email", "Value": email}],
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn confirm_registration(&self, email: &str, code: &str) -> Result<(), AuthError> {
        self.call(
            "ConfirmSignUp",
            json!({
                "ClientId": self.client_id,
                "Username": email,
                "ConfirmationCode": code,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn resend_confirmation_code(&self, email: &str) -> Result<(), AuthError> {
        self.call(
            "ResendConfirmationCode",
            json!({
                "ClientId": self.client_id,
                "Username": email,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInTokens, AuthError> {
        let value = self
            .call(
                "InitiateAuth",
                json!({
                    "AuthFlow": "USER_PASSWORD_AUTH",
                    "ClientId": self.client_id,
                    "AuthParameters": {"USERNAME": email, "PASSWORD": password},
                }),
            )
            .await?;
        let response = parse_auth_response(value)?;

        if let Some(challenge) = response.challenge_name {
            warn!(challenge, "unsupported authentication challenge");
            return Err(AuthError::Unknown);
        }

        let result = response.authentication_result.ok_or(AuthError::Unknown)?;
        match (result.access_token, result.refresh_token, result.id_token) {
            (Some(access_token), Some(refresh_token), Some(id_token)) => Ok(SignInTokens {
                access_token,
                refresh_token,
                id_token,
                expires_in: result.expires_in,
            }),
            _ => {
                warn!("provider omitted token material from sign-in response");
                Err(AuthError::Unknown)
            }
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        let value = self
            .call(
                "InitiateAuth",
                json!({
                    "AuthFlow": "REFRESH_TOKEN_AUTH",
                    "ClientId": self.client_id,
                    "AuthParameters": {"REFRESH_TOKEN": refresh_token},
                }),
            )
            .await?;
        let response = parse_auth_response(value)?;

        let result = response.authentication_result.ok_or(AuthError::Unknown)?;
        match (result.access_token, result.id_token) {
            (Some(access_token), Some(id_token)) => Ok(RefreshedTokens {
                access_token,
                id_token,
                refresh_token: result.refresh_token,
                expires_in: result.expires_in,
            }),
            _ => {
                warn!("provider omitted token material from refresh response");
                Err(AuthError::Unknown)
            }
        }
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.call(
            "ForgotPassword",
            json!({
                "ClientId": self.client_id,
                "Username": email,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.call(
            "ConfirmForgotPassword",
            json!({
                "ClientId": self.client_id,
                "Username": email,
                "ConfirmationCode": code,
                "Password": new_password,
            }),
        )
        .await?;
        Ok(())
    }

    /// Execute one provider action and normalize the outcome.
    async fn call(&self, action: &str, body: serde_json::Value) -> Result<serde_json::Value, AuthError> {
        self.ensure_ready().await?;

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-amz-target", format!("{TARGET_PREFIX}.{action}"))
            .header("content-type", AMZ_JSON)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(action, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(action, e))?;

        if status.is_success() {
            if text.is_empty() {
                return Ok(serde_json::Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| {
                warn!(action, error = %e, "provider returned a malformed success body");
                AuthError::Unknown
            })
        } else {
            let parsed: ProviderError = serde_json::from_str(&text).unwrap_or_default();
            let kind = parsed.kind.unwrap_or_default();
            let message = parsed.message.unwrap_or_else(|| text.clone());
            let err = translate::translate(&kind, &message);
            debug!(action, %status, identifier = %kind, category = %err, "provider call failed");
            Err(err)
        }
    }
}

fn parse_auth_response(value: serde_json::Value) -> Result<InitiateAuthResponse, AuthError> {
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "provider returned a malformed authentication response");
        AuthError::Unknown
    })
}

fn transport_error(action: &str, e: reqwest::Error) -> AuthError {
    warn!(action, error = %e, "provider transport failure");
    AuthError::NetworkError
}
