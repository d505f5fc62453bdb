//! PrepDeck session and identity SDK
//!
//! Client-side session lifecycle for the PrepDeck platform: authenticates
//! end users against the hosted identity provider, manages short-lived
//! bearer credentials, and exposes authorization state to consumers.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pd_session::{FileCredentialStore, SessionConfig, SessionManager};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new("https://idp.example.com", "client-id");
//! let store = Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
//! let session = Arc::new(SessionManager::new(config, store)?);
//!
//! session.sign_in("user@example.com", "hunter2!").await?;
//! if let Some(header) = session.authorization_header().await {
//!     // attach `header` as the Authorization value on an API call
//! }
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod config;
pub mod guard;
pub mod identity;
pub mod record;
pub mod session;
pub mod store;
pub mod translate;

pub use config::{ConfigError, SessionConfig};
pub use guard::{GuardDecision, RouteGuard};
pub use identity::IdentityClient;
pub use record::{AuthorizationRecord, Principal};
pub use session::{SessionEvent, SessionManager, SessionState};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoreError};

pub use pd_common::{AuthError, Result};
