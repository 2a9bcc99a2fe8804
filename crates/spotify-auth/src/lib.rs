//! Spotify accounts-service helpers.
//!
//! Only the refresh-token grant is implemented here. The initial PKCE
//! authorization happens in the browser and hands us the first token pair.

pub mod token_refresh;

pub use token_refresh::{
    DEFAULT_CLIENT_ID, RefreshedTokens, SPOTIFY_TOKEN_URL, TokenRefreshError, build_refresh_url,
    refresh_token,
};
