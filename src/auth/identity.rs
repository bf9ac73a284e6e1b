//! Binds a completed handshake to the browser session.
//!
//! The only thing kept across requests is the encoded [`Principal`] under
//! [`USER_ID_KEY`]; the access token itself is dropped once the identity is
//! bound.

use serde_json::Value;
use tracing::debug;

use super::Principal;
use crate::oauth::AccessToken;
use crate::session::Session;

/// Session key holding the encoded principal.
pub const USER_ID_KEY: &str = "_user_id";

/// Log the user in, replacing any identity already in the session.
pub fn bind(session: &mut Session, token: &AccessToken) -> Principal {
    let principal = Principal::from_access_token(token);
    session.insert(USER_ID_KEY, Value::String(principal.encode()));
    principal
}

/// The principal bound to this session, if any.
pub fn resolve(session: &Session) -> Option<Principal> {
    let id = session.get(USER_ID_KEY)?.as_str()?;
    match Principal::decode(id) {
        Ok(principal) => Some(principal),
        Err(e) => {
            debug!(error = %e, "Ignoring unparseable session identity");
            None
        }
    }
}

/// Log the user out. Does nothing when nobody is logged in.
pub fn unbind(session: &mut Session) {
    session.remove(USER_ID_KEY);
}
