//! Token pairs returned by the request-token and access-token legs.
//!
//! Flickr answers both legs with `application/x-www-form-urlencoded` bodies
//! rather than JSON.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::OAuthError;

/// A temporary credential from the first leg.
///
/// Serialized into the browser session between `/authorize` and `/callback`,
/// so its JSON shape must stay `{"oauth_token": .., "oauth_token_secret": ..}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToken {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_callback_confirmed: Option<bool>,
}

impl RequestToken {
    pub fn new(oauth_token: impl Into<String>, oauth_token_secret: impl Into<String>) -> Self {
        Self {
            oauth_token: oauth_token.into(),
            oauth_token_secret: oauth_token_secret.into(),
            oauth_callback_confirmed: None,
        }
    }

    /// Parse a request-token response body.
    pub fn from_form(body: &str) -> Result<Self, OAuthError> {
        let fields = parse_form(body);
        Ok(Self {
            oauth_token: required(&fields, "oauth_token")?,
            oauth_token_secret: required(&fields, "oauth_token_secret")?,
            oauth_callback_confirmed: fields
                .get("oauth_callback_confirmed")
                .map(|v| v == "true"),
        })
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("oauth_token", &self.oauth_token)
            .field("oauth_token_secret", &"********")
            .field("oauth_callback_confirmed", &self.oauth_callback_confirmed)
            .finish()
    }
}

/// The long-lived credential from the final leg, plus the identity Flickr
/// attaches to it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    pub user_nsid: String,
    pub username: String,
    pub fullname: Option<String>,
}

impl AccessToken {
    /// Parse an access-token response body.
    pub fn from_form(body: &str) -> Result<Self, OAuthError> {
        let fields = parse_form(body);
        Ok(Self {
            oauth_token: required(&fields, "oauth_token")?,
            oauth_token_secret: required(&fields, "oauth_token_secret")?,
            user_nsid: required(&fields, "user_nsid")?,
            username: required(&fields, "username")?,
            fullname: fields.get("fullname").filter(|v| !v.is_empty()).cloned(),
        })
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("oauth_token", &self.oauth_token)
            .field("oauth_token_secret", &"********")
            .field("user_nsid", &self.user_nsid)
            .field("username", &self.username)
            .field("fullname", &self.fullname)
            .finish()
    }
}

fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect()
}

fn required(fields: &HashMap<String, String>, name: &str) -> Result<String, OAuthError> {
    match fields.get(name) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(OAuthError::MalformedResponse(format!(
            "missing field `{name}`"
        ))),
    }
}
