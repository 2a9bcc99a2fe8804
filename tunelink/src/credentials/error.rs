//! Credential error types.

use spotify_auth::TokenRefreshError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Nothing has been authorized yet.
    #[error("Not authorized - connect a Spotify account first")]
    NotAuthorized,

    /// Missing refresh token - re-login required.
    #[error("Missing refresh token - re-login required")]
    MissingRefreshToken,

    /// Missing access token on a credential that is still fresh.
    #[error("Missing access token - re-login required")]
    MissingAccessToken,

    /// The provider rejected the refresh token - re-login required.
    #[error("Invalid refresh token - re-login required")]
    InvalidRefreshToken,

    /// Refresh rejected for another reason.
    #[error("Refresh failed: {0}")]
    RefreshFailed(String),

    /// Network error, including timeouts.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Parse error.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Stored record is malformed.
    #[error("Invalid stored credential: {0}")]
    InvalidRecord(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CredentialError {
    /// Check if this error requires the user to authorize again.
    pub fn requires_relogin(&self) -> bool {
        matches!(
            self,
            Self::NotAuthorized
                | Self::MissingRefreshToken
                | Self::MissingAccessToken
                | Self::InvalidRefreshToken
                | Self::InvalidRecord(_)
        )
    }

    /// Check if a later attempt may succeed without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::ParseError(_))
    }
}

impl From<TokenRefreshError> for CredentialError {
    fn from(err: TokenRefreshError) -> Self {
        match err {
            TokenRefreshError::Network(e) => Self::Network(e),
            TokenRefreshError::Parse(e) => Self::ParseError(e),
            e @ TokenRefreshError::Api { .. } if e.is_invalid_grant() => Self::InvalidRefreshToken,
            e @ TokenRefreshError::Api { .. } => Self::RefreshFailed(e.to_string()),
            TokenRefreshError::InvalidUrl(e) => Self::Internal(e.to_string()),
        }
    }
}
