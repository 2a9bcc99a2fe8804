//! tunelink
//!
//! Native messaging host that likes the song playing in a browser tab on
//! Spotify. The browser extension sends a trigger with the tab's URL; the
//! host makes sure a usable Spotify access token is stored, asks the
//! song-resolver backend to like the matching track, and reports the
//! outcome through notifications, the toolbar badge and the shared store.

pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod logging;
pub mod notification;
pub mod outcome;
pub mod resolver;
pub mod services;
pub mod store;

pub use error::{Error, Result};
