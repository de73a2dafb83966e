//! # API Module
//!
//! HTTP endpoints of the short-lived local server that receives the OAuth redirect.
//!
//! - [`callback`] completes the PKCE flow by exchanging the authorization code for
//!   a token and storing it in the shared state polled by
//!   [`crate::spotify::auth::authorize`].
//! - [`health`] reports name and version.

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
