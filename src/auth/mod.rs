//! Who is logged in.
//!
//! - [`principal`] - the logged-in user and its session encoding
//! - [`identity`] - binds a completed handshake to the session
//! - [`middleware`] - gates routes that require a login

pub mod identity;
pub mod middleware;
pub mod principal;

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;

pub use principal::{Principal, PrincipalError};

use crate::AppState;
use crate::session::Session;

/// The principal bound to the request's session, if any.
///
/// Resolved once per request and cached in the request extensions, so the
/// login gate and the handler behind it see the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub Option<Principal>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(current.clone());
        }

        let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let session = Session::load(&jar, &state.config.session.cookie_name);
        let current = CurrentUser(identity::resolve(&session));

        parts.extensions.insert(current.clone());
        Ok(current)
    }
}
