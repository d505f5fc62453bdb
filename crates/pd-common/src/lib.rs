use thiserror::Error;

pub mod logging;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Closed taxonomy of user-facing authentication failures.
///
/// Every identity operation resolves to one of these categories. Display
/// strings are what the user sees; raw provider error text never crosses
/// this boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("This account has not been confirmed yet")]
    UnconfirmedAccount,

    #[error("The confirmation code is invalid or has expired")]
    InvalidOrExpiredCode,

    #[error("Password does not meet the security requirements")]
    WeakPassword,

    #[error("An account with this email already exists")]
    DuplicateAccount,

    #[error("Too many attempts; please wait a moment and try again")]
    RateLimited,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Could not reach the sign-in service; check your connection")]
    NetworkError,

    #[error("The sign-in service is still starting up; try again shortly")]
    SdkNotReady,

    #[error("Something went wrong; please try again")]
    Unknown,
}

impl AuthError {
    /// Transient failures may be retried with the same input; session state
    /// is left untouched when one occurs.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthError::NetworkError | AuthError::RateLimited | AuthError::SdkNotReady
        )
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        AuthError::InvalidInput(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AuthError::NetworkError.is_transient());
        assert!(AuthError::RateLimited.is_transient());
        assert!(AuthError::SdkNotReady.is_transient());

        assert!(!AuthError::InvalidCredentials.is_transient());
        assert!(!AuthError::DuplicateAccount.is_transient());
        assert!(!AuthError::Unknown.is_transient());
    }

    #[test]
    fn test_display_never_empty() {
        let all = [
            AuthError::InvalidCredentials,
            AuthError::UnconfirmedAccount,
            AuthError::InvalidOrExpiredCode,
            AuthError::WeakPassword,
            AuthError::DuplicateAccount,
            AuthError::RateLimited,
            AuthError::invalid_input("Email is required"),
            AuthError::NetworkError,
            AuthError::SdkNotReady,
            AuthError::Unknown,
        ];
        for err in all {
            assert!(!err.to_string().is_empty());
        }
    }
}
