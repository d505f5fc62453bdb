//! Authorization record - the persisted session entity

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::claims;

/// The single persisted tuple representing "currently signed in".
///
/// At most one record exists per credential store at any time; a new
/// sign-in replaces it outright. `access_token` and `expires_at` are always
/// written together - a record carrying one without the other is malformed
/// and treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRecord {
    /// Short-lived bearer credential sent on every authenticated call
    pub access_token: String,

    /// Long-lived credential used solely to mint new tokens. Never leaves
    /// the session manager; never appears in outbound headers.
    pub refresh_token: String,

    /// Identity-claims token (email, display role claims)
    pub id_token: String,

    /// Principal identifier, cached so display code never re-parses tokens
    pub email: String,

    /// Epoch-millisecond instant after which `access_token` must not be
    /// trusted
    pub expires_at: i64,
}

impl AuthorizationRecord {
    /// Structural validity check applied on every load. Fails closed: an
    /// incomplete record is indistinguishable from "never signed in".
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && self.expires_at > 0 && !self.email.is_empty()
    }

    /// Whether a refresh could still be attempted for this record.
    pub fn has_refresh_path(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_ms() <= 0
    }

    /// True when remaining lifetime has dropped below `threshold`, which
    /// includes already-expired records.
    pub fn expires_within(&self, threshold: Duration) -> bool {
        self.remaining_ms() < threshold.as_millis() as i64
    }

    fn remaining_ms(&self) -> i64 {
        self.expires_at - Utc::now().timestamp_millis()
    }

    /// Value of the `Authorization` header for this record.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn principal(&self) -> Principal {
        let roles = claims::decode_id_claims(&self.id_token)
            .map(|c| c.roles)
            .unwrap_or_default();
        Principal {
            email: self.email.clone(),
            roles,
        }
    }
}

/// The authenticated principal as seen by view-layer consumers.
///
/// `roles` is decoded client-side from the id token for display purposes
/// only; authorization decisions are enforced server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub email: String,
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_expiring_in(ms: i64) -> AuthorizationRecord {
        AuthorizationRecord {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            id_token: "id".to_string(),
            email: "user@example.com".to_string(),
            expires_at: Utc::now().timestamp_millis() + ms,
        }
    }

    #[test]
    fn test_complete_record() {
        assert!(record_expiring_in(60_000).is_complete());
    }

    #[test]
    fn test_missing_access_token_is_incomplete() {
        let mut record = record_expiring_in(60_000);
        record.access_token.clear();
        assert!(!record.is_complete());
    }

    #[test]
    fn test_missing_expiry_is_incomplete() {
        let mut record = record_expiring_in(60_000);
        record.expires_at = 0;
        assert!(!record.is_complete());
    }

    #[test]
    fn test_empty_refresh_token_has_no_refresh_path() {
        let mut record = record_expiring_in(60_000);
        assert!(record.has_refresh_path());
        record.refresh_token.clear();
        assert!(!record.has_refresh_path());
    }

    #[test]
    fn test_expires_within_threshold() {
        let record = record_expiring_in(2 * 60 * 1000);
        assert!(record.expires_within(Duration::from_secs(300)));
        assert!(!record.expires_within(Duration::from_secs(60)));
        assert!(!record.is_expired());
    }

    #[test]
    fn test_expired_record_is_within_any_threshold() {
        let record = record_expiring_in(-1000);
        assert!(record.is_expired());
        assert!(record.expires_within(Duration::from_secs(1)));
    }

    #[test]
    fn test_bearer_header() {
        let record = record_expiring_in(60_000);
        assert_eq!(record.bearer_header(), "Bearer access");
    }
}
