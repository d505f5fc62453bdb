//! Provider error translation
//!
//! Pure mapping from provider error identifiers to the closed [`AuthError`]
//! taxonomy. The provider reports failures as exception-style type names
//! (optionally namespaced, e.g. `com.amazonaws...#NotAuthorizedException`);
//! nothing here performs I/O and unmapped identifiers land on
//! [`AuthError::Unknown`] so raw provider text never reaches the user.

use pd_common::AuthError;

/// Translate a provider error identifier and raw message into a taxonomy
/// category.
pub fn translate(identifier: &str, raw_message: &str) -> AuthError {
    // Strip any service namespace prefix from the identifier
    let name = identifier.rsplit('#').next().unwrap_or(identifier);

    match name {
        // UserNotFound is folded into InvalidCredentials so sign-in never
        // reveals which accounts exist
        "NotAuthorizedException" | "UserNotFoundException" => AuthError::InvalidCredentials,

        "UserNotConfirmedException" => AuthError::UnconfirmedAccount,

        "CodeMismatchException" | "ExpiredCodeException" => AuthError::InvalidOrExpiredCode,

        "InvalidPasswordException" => AuthError::WeakPassword,

        "UsernameExistsException" | "AliasExistsException" => AuthError::DuplicateAccount,

        "LimitExceededException"
        | "TooManyRequestsException"
        | "TooManyFailedAttemptsException" => AuthError::RateLimited,

        "InvalidParameterException" => {
            AuthError::invalid_input("One of the submitted fields is invalid")
        }

        _ => fallback(raw_message),
    }
}

/// Heuristic fallback for identifiers outside the table: connectivity
/// flavored messages become `NetworkError`, everything else `Unknown`.
fn fallback(raw_message: &str) -> AuthError {
    let message = raw_message.to_ascii_lowercase();
    let connectivity = ["network", "connection", "connect", "timed out", "timeout", "unreachable"];

    if connectivity.iter().any(|needle| message.contains(needle)) {
        AuthError::NetworkError
    } else {
        AuthError::Unknown
    }
}
