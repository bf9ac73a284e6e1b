//! The login handshake, spread over two browser requests.
//!
//! ```text
//! ANONYMOUS --start--> REQUEST_ISSUED --complete--> AUTHORIZED
//!     ^                      |
//!     +---- complete fails --+
//! ```
//!
//! Between the two legs the request token lives in the session under
//! [`REQUEST_TOKEN_KEY`]. `complete` takes it out before looking at anything
//! else, so a token is consumed at most once whatever the outcome.

use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::{AccessToken, FlickrClient, OAuthError, RequestToken};
use crate::auth::Principal;
use crate::session::Session;

/// Session key holding the in-flight request token.
pub const REQUEST_TOKEN_KEY: &str = "flickr_oauth_request_token";

/// Where a browser session is in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Anonymous,
    RequestIssued,
    Authorized,
}

impl HandshakeState {
    pub fn of(current: Option<&Principal>, session: &Session) -> Self {
        if current.is_some() {
            Self::Authorized
        } else if session.contains(REQUEST_TOKEN_KEY) {
            Self::RequestIssued
        } else {
            Self::Anonymous
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Already logged in; nothing was sent to Flickr.
    AlreadyAuthorized,
    /// Send the browser here to approve the app.
    Redirect(Url),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// Already logged in; nothing was sent to Flickr.
    AlreadyAuthorized,
    Authorized(AccessToken),
}

/// Query parameters Flickr appends to the callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub oauth_token: Option<String>,
    pub oauth_verifier: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("No request token in session")]
    MissingRequestToken,

    #[error("Request token in session is malformed")]
    MalformedRequestToken,

    #[error("Callback is missing `{0}`")]
    MissingCallbackParameter(&'static str),

    #[error("Callback token does not match the request token in session")]
    TokenMismatch,

    #[error(transparent)]
    Upstream(#[from] OAuthError),
}

impl HandshakeError {
    /// True when the browser sent something unusable, as opposed to Flickr
    /// failing.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Upstream(_))
    }
}

/// Drives the OAuth 1.0a legs for one configured app.
#[derive(Debug, Clone)]
pub struct Handshake {
    client: FlickrClient,
    callback_url: Url,
    perms: String,
}

impl Handshake {
    pub fn new(client: FlickrClient, callback_url: Url, perms: impl Into<String>) -> Self {
        Self {
            client,
            callback_url,
            perms: perms.into(),
        }
    }

    pub fn callback_url(&self) -> &Url {
        &self.callback_url
    }

    /// Begin a login: fetch a request token, remember it in the session and
    /// return the authorization URL.
    ///
    /// A second `start` before the first completes replaces the stored token.
    pub async fn start(
        &self,
        current: Option<&Principal>,
        session: &mut Session,
    ) -> Result<StartOutcome, HandshakeError> {
        let state = HandshakeState::of(current, session);
        if state == HandshakeState::Authorized {
            debug!("Already logged in, skipping request token");
            return Ok(StartOutcome::AlreadyAuthorized);
        }

        let request_token = self.client.fetch_request_token(&self.callback_url).await?;
        let stored = serde_json::to_value(&request_token)
            .map_err(|e| OAuthError::MalformedResponse(e.to_string()))?;

        if state == HandshakeState::RequestIssued {
            debug!("Replacing unconsumed request token");
        }
        session.insert(REQUEST_TOKEN_KEY, stored);

        Ok(StartOutcome::Redirect(
            self.client.authorization_url(&request_token, &self.perms),
        ))
    }

    /// Finish a login from the callback request.
    pub async fn complete(
        &self,
        current: Option<&Principal>,
        session: &mut Session,
        params: &CallbackParams,
    ) -> Result<CompleteOutcome, HandshakeError> {
        match HandshakeState::of(current, session) {
            HandshakeState::Authorized => {
                debug!("Already logged in, ignoring callback");
                return Ok(CompleteOutcome::AlreadyAuthorized);
            }
            HandshakeState::Anonymous => return Err(HandshakeError::MissingRequestToken),
            HandshakeState::RequestIssued => {}
        }

        let stored = session
            .remove(REQUEST_TOKEN_KEY)
            .ok_or(HandshakeError::MissingRequestToken)?;
        let request_token = serde_json::from_value::<RequestToken>(stored)
            .ok()
            .filter(|t| !t.oauth_token.is_empty() && !t.oauth_token_secret.is_empty())
            .ok_or(HandshakeError::MalformedRequestToken)?;

        let oauth_token = required_param(params.oauth_token.as_deref(), "oauth_token")?;
        let verifier = required_param(params.oauth_verifier.as_deref(), "oauth_verifier")?;

        if oauth_token != request_token.oauth_token {
            warn!("Callback oauth_token does not match the stored request token");
            return Err(HandshakeError::TokenMismatch);
        }

        let access_token = self
            .client
            .fetch_access_token(&request_token, verifier)
            .await?;
        info!(
            user_nsid = %access_token.user_nsid,
            username = %access_token.username,
            "Flickr login completed"
        );
        Ok(CompleteOutcome::Authorized(access_token))
    }
}

fn required_param<'a>(
    value: Option<&'a str>,
    name: &'static str,
) -> Result<&'a str, HandshakeError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(HandshakeError::MissingCallbackParameter(name))
}
