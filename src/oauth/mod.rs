//! OAuth 1.0a login against Flickr.
//!
//! Flickr still speaks the three-legged OAuth 1.0a protocol:
//!
//! 1. fetch a request token, passing our callback URL
//! 2. send the browser to the authorization page with that token
//! 3. exchange the token plus the verifier Flickr hands back for an access
//!    token, which also carries the user's NSID and username
//!
//! # Architecture
//!
//! - [`signature`] - RFC 5849 HMAC-SHA1 request signing
//! - [`FlickrClient`] - the two signed HTTP calls and the authorization URL
//! - [`RequestToken`] / [`AccessToken`] - token pairs returned by Flickr
//! - [`Handshake`] - drives the legs and keeps the in-flight request token in
//!   the browser session
//!
//! # Example
//!
//! ```rust,ignore
//! let client = FlickrClient::new(credentials, Endpoints::from_config(&config.flickr)?);
//! let handshake = Handshake::new(client, config.callback_url()?, "read");
//!
//! // GET /authorize
//! let outcome = handshake.start(current_user.as_ref(), &mut session).await?;
//! // ... user approves on flickr.com and comes back to /callback ...
//! let outcome = handshake.complete(current_user.as_ref(), &mut session, &params).await?;
//! ```

pub mod client;
pub mod handshake;
pub mod signature;
pub mod token;

pub use client::{Endpoints, FlickrClient};
pub use handshake::{
    CallbackParams, CompleteOutcome, Handshake, HandshakeError, HandshakeState, StartOutcome,
};
pub use token::{AccessToken, RequestToken};

// =============================================================================
// OAuthError
// =============================================================================

/// Errors talking to the OAuth provider.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network or transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("{operation} failed with HTTP {status}")]
    Upstream {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The provider answered 2xx but the body is not a usable token.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// HMAC computation failed.
    #[error("Signing error: {0}")]
    Signing(String),
}
