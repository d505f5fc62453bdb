//! Best-effort id-token claims decoding
//!
//! Decodes the payload segment of a JWT without verifying its signature.
//! The result feeds display surfaces only (page shell, role badges) and is
//! never an authorization input - enforcement happens server-side against
//! the verified token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

/// Claims surfaced from the id token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdClaims {
    #[serde(default)]
    pub email: Option<String>,

    /// Group/role claims as issued by the provider
    #[serde(default, rename = "cognito:groups")]
    pub roles: Vec<String>,
}

/// Decode the claims payload of `id_token`, or `None` when the token is not
/// a parseable JWT. Malformed tokens are a display no-op, not an error.
pub fn decode_id_claims(id_token: &str) -> Option<IdClaims> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = match URL_SAFE_NO_PAD.decode(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "id token payload is not base64url");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!(error = %e, "id token payload is not a claims object");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.sig")
    }

    #[test]
    fn test_decodes_email_and_roles() {
        let token = token_with_payload(&serde_json::json!({
            "email": "user@example.com",
            "cognito:groups": ["admins", "editors"],
        }));

        let claims = decode_id_claims(&token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("user@example.com"));
        assert_eq!(claims.roles, vec!["admins", "editors"]);
    }

    #[test]
    fn test_missing_claims_default() {
        let token = token_with_payload(&serde_json::json!({"sub": "abc"}));

        let claims = decode_id_claims(&token).unwrap();
        assert!(claims.email.is_none());
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn test_garbage_token_yields_none() {
        assert!(decode_id_claims("not-a-jwt").is_none());
        assert!(decode_id_claims("a.@@@@.c").is_none());
        assert!(decode_id_claims("").is_none());
    }
}
