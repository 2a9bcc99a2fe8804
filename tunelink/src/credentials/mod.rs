//! Credential management.
//!
//! - [`CredentialRecord`]: the access/refresh token pair and its issue time
//! - [`TokenRefresher`]: provider-specific refresh-token grant
//! - [`CredentialService`]: freshness check, refresh and persistence

mod error;
mod refresher;
mod service;
mod types;

pub use error::CredentialError;
pub use refresher::{RefreshedCredentials, SpotifyTokenRefresher, TokenRefresher};
pub use service::{CredentialService, DEFAULT_REFRESH_AFTER};
pub use types::{CredentialRecord, Freshness, StoredCredentials};
