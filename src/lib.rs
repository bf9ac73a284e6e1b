//! flickr-login -- log in with Flickr over OAuth 1.0a.
//!
//! A small axum app: `/authorize` and `/callback` run the three-legged
//! handshake, the resulting identity lives in an encrypted session cookie,
//! and `/secret` is only served to logged-in users.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod session;
pub mod web;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::credentials::Credentials;
use crate::oauth::{Endpoints, FlickrClient, Handshake};

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub handshake: Arc<Handshake>,
    pub cookie_key: Key,
}

impl AppState {
    /// Wire the handshake and the cookie key from validated startup inputs.
    pub fn new(config: Config, credentials: Credentials) -> anyhow::Result<Self> {
        let endpoints =
            Endpoints::from_config(&config.flickr).context("Invalid Flickr endpoint URL")?;
        let callback_url = config
            .callback_url()
            .context("Invalid server.public_url")?;
        let cookie_key = session::cookie_key(&config.session)?;

        let client = FlickrClient::new(credentials, endpoints);
        let handshake = Handshake::new(client, callback_url, config.flickr.perms.clone());

        Ok(Self {
            config: Arc::new(config),
            handshake: Arc::new(handshake),
            cookie_key,
        })
    }
}

// PrivateCookieJar pulls its key out of the state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Build the application router with all middleware layers.
pub fn build_app(state: AppState) -> Router {
    // -- Request ID layer (X-Request-ID) --------------------------------------
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // -- Tracing layer --------------------------------------------------------
    let trace = TraceLayer::new_for_http();

    web::build_web_router(state.clone())
        .layer(propagate_id)
        .layer(request_id)
        .layer(trace)
        .with_state(state)
}
