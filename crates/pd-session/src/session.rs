//! Session lifecycle manager
//!
//! Orchestrates identity operations, owns the credential slot, decides when
//! to refresh, and answers the two boundary queries every consumer depends
//! on: "is the caller authorized" and "give me a current bearer header".

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock as StateLock;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use pd_common::AuthError;

use crate::config::{ConfigError, SessionConfig};
use crate::identity::IdentityClient;
use crate::record::{AuthorizationRecord, Principal};
use crate::store::CredentialStore;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Lifecycle states. The machine cycles for the life of the process; there
/// is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
    PendingConfirmation,
}

/// Broadcast to every subscriber so in-process consumers converge on the
/// same authorization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { email: String },
    Refreshed,
    SignedOut,
    Invalidated,
}

pub struct SessionManager {
    identity: IdentityClient,
    store: Arc<dyn CredentialStore>,
    refresh_threshold: Duration,
    default_token_lifetime: Duration,
    /// In-memory mirror of the store slot. The write guard doubles as the
    /// single-flight gate for refreshes.
    record: RwLock<Option<AuthorizationRecord>>,
    state: StateLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Construct the manager, restoring any persisted session from `store`.
    ///
    /// A restored record that is expired with no refresh path is discarded
    /// up front; it could never produce a header.
    pub fn new(config: SessionConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
        let identity = IdentityClient::new(&config)?;

        let record = store
            .load()
            .filter(|r| !r.is_expired() || r.has_refresh_path());
        let state = if record.is_some() {
            debug!("restored persisted session");
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            identity,
            store,
            refresh_threshold: config.refresh_threshold,
            default_token_lifetime: config.default_token_lifetime,
            record: RwLock::new(record),
            state: StateLock::new(state),
            events,
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Structural/expiry check only; never touches the network.
    pub async fn is_authenticated(&self) -> bool {
        let slot = self.record.read().await;
        match &*slot {
            Some(record) => !record.is_expired() || record.has_refresh_path(),
            None => false,
        }
    }

    pub async fn current_principal(&self) -> Option<Principal> {
        self.record.read().await.as_ref().map(|r| r.principal())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let email = validated_email(email)?;
        validated_password(password)?;

        self.set_state(SessionState::Authenticating);
        match self.identity.sign_in(&email, password).await {
            Ok(tokens) => {
                let record = AuthorizationRecord {
                    access_token: tokens.access_token,
                    refresh_token: tokens.refresh_token,
                    id_token: tokens.id_token,
                    email: email.clone(),
                    expires_at: self.expiry_instant(tokens.expires_in),
                };
                let principal = record.principal();

                let mut slot = self.record.write().await;
                self.persist(&record);
                *slot = Some(record);
                drop(slot);

                self.set_state(SessionState::Authenticated);
                info!(email = %email, "signed in");
                self.emit(SessionEvent::SignedIn { email });
                Ok(principal)
            }
            Err(e) => {
                let slot = self.record.read().await;
                self.settle_state(slot.as_ref());
                debug!(category = %e, "sign-in failed");
                Err(e)
            }
        }
    }

    /// Register a new account. Success leaves the machine awaiting the
    /// emailed confirmation code; it never yields an authorized state.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = validated_email(email)?;
        validated_password(password)?;

        self.identity.register(&email, password).await?;
        self.set_state(SessionState::PendingConfirmation);
        info!(email = %email, "registration submitted; awaiting confirmation");
        Ok(())
    }

    /// Confirm a registration code. Codes are validated locally before any
    /// network call; confirmation success still requires an explicit
    /// sign-in afterwards.
    pub async fn confirm_registration(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let email = validated_email(email)?;
        let code = validated_code(code)?;

        self.identity.confirm_registration(&email, &code).await?;
        self.set_state(SessionState::Anonymous);
        info!(email = %email, "account confirmed");
        Ok(())
    }

    pub async fn resend_confirmation_code(&self, email: &str) -> Result<(), AuthError> {
        let email = validated_email(email)?;
        self.identity.resend_confirmation_code(&email).await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = validated_email(email)?;
        self.identity.request_password_reset(&email).await
    }

    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = validated_email(email)?;
        let code = validated_code(code)?;
        validated_password(new_password)?;

        self.identity
            .confirm_password_reset(&email, &code, new_password)
            .await
    }

    /// Tear down the session. Always succeeds, regardless of network state,
    /// and is idempotent.
    pub async fn sign_out(&self) {
        let mut slot = self.record.write().await;
        let was_signed_in = slot.is_some();
        *slot = None;
        self.clear_store();
        drop(slot);

        self.set_state(SessionState::Anonymous);
        if was_signed_in {
            info!("signed out");
        }
        self.emit(SessionEvent::SignedOut);
    }

    /// Produce an `Authorization` header value from a fresh access token.
    ///
    /// When the record's remaining lifetime has dropped below the refresh
    /// threshold a refresh is performed first, so callers never observe an
    /// already-expired token. Returns `None` when no record exists or the
    /// refresh fails; a failed refresh tears the session down rather than
    /// leaving it half-valid.
    pub async fn authorization_header(&self) -> Option<String> {
        {
            let slot = self.record.read().await;
            match &*slot {
                Some(record) if !record.expires_within(self.refresh_threshold) => {
                    return Some(record.bearer_header());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Near or past expiry. The write guard is the single-flight gate:
        // the first caller through performs the one refresh while later
        // callers queue here, re-check, and reuse its outcome.
        let mut slot = self.record.write().await;
        let current = match &*slot {
            Some(record) if !record.expires_within(self.refresh_threshold) => {
                return Some(record.bearer_header());
            }
            Some(record) => record.clone(),
            None => return None,
        };

        if !current.has_refresh_path() {
            warn!("access token expiring with no refresh path; session invalidated");
            *slot = None;
            self.clear_store();
            drop(slot);
            self.set_state(SessionState::Anonymous);
            self.emit(SessionEvent::Invalidated);
            return None;
        }

        self.set_state(SessionState::Refreshing);
        match self.identity.refresh(&current.refresh_token).await {
            Ok(tokens) => {
                let record = AuthorizationRecord {
                    access_token: tokens.access_token,
                    id_token: tokens.id_token,
                    // The provider only returns a refresh token when it
                    // rotates the old one
                    refresh_token: tokens.refresh_token.unwrap_or(current.refresh_token),
                    email: current.email,
                    expires_at: self.expiry_instant(tokens.expires_in),
                };
                let header = record.bearer_header();
                self.persist(&record);
                *slot = Some(record);
                drop(slot);

                self.set_state(SessionState::Authenticated);
                debug!("access token refreshed");
                self.emit(SessionEvent::Refreshed);
                Some(header)
            }
            Err(e) => {
                warn!(category = %e, "token refresh failed; session invalidated");
                *slot = None;
                self.clear_store();
                drop(slot);
                self.set_state(SessionState::Anonymous);
                self.emit(SessionEvent::Invalidated);
                None
            }
        }
    }

    fn expiry_instant(&self, expires_in: Option<u64>) -> i64 {
        let lifetime_secs = expires_in.unwrap_or(self.default_token_lifetime.as_secs());
        Utc::now().timestamp_millis() + (lifetime_secs as i64) * 1000
    }

    fn set_state(&self, next: SessionState) {
        *self.state.write() = next;
    }

    fn settle_state(&self, record: Option<&AuthorizationRecord>) {
        self.set_state(if record.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        });
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn persist(&self, record: &AuthorizationRecord) {
        if let Err(e) = self.store.save(record) {
            warn!(error = %e, "could not persist credential record");
        }
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "could not clear credential store");
        }
    }
}

fn validated_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(AuthError::invalid_input("Email is required"));
    }
    if !email.contains('@') {
        return Err(AuthError::invalid_input("Enter a valid email address"));
    }
    Ok(email)
}

fn validated_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::invalid_input("Password is required"));
    }
    Ok(())
}

fn validated_code(code: &str) -> Result<String, AuthError> {
    let code = code.trim();
    if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(code.to_string())
    } else {
        Err(AuthError::invalid_input(
            "The confirmation code must be exactly six digits",
        ))
    }
}
