//! Signed HTTP calls to Flickr's OAuth endpoints.

use tracing::{debug, warn};
use url::Url;

use super::signature::{self, Nonce, TokenCredential};
use super::{AccessToken, OAuthError, RequestToken};
use crate::config::FlickrConfig;
use crate::credentials::Credentials;

/// The three OAuth 1.0a endpoints.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub request_token_url: Url,
    pub authorize_url: Url,
    pub access_token_url: Url,
}

impl Endpoints {
    pub fn from_config(config: &FlickrConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            request_token_url: Url::parse(&config.request_token_url)?,
            authorize_url: Url::parse(&config.authorize_url)?,
            access_token_url: Url::parse(&config.access_token_url)?,
        })
    }
}

/// OAuth 1.0a client bound to one consumer key/secret.
#[derive(Debug, Clone)]
pub struct FlickrClient {
    http_client: reqwest::Client,
    credentials: Credentials,
    endpoints: Endpoints,
}

impl FlickrClient {
    pub fn new(credentials: Credentials, endpoints: Endpoints) -> Self {
        Self::with_http_client(reqwest::Client::new(), credentials, endpoints)
    }

    pub fn with_http_client(
        http_client: reqwest::Client,
        credentials: Credentials,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            http_client,
            credentials,
            endpoints,
        }
    }

    /// First leg: obtain a temporary credential, registering `callback_url`
    /// as the place Flickr sends the user back to.
    pub async fn fetch_request_token(&self, callback_url: &Url) -> Result<RequestToken, OAuthError> {
        debug!(callback = %callback_url, "Fetching Flickr request token");

        let url = signature::sign_url(
            "GET",
            &self.endpoints.request_token_url,
            &self.credentials,
            None,
            &[("oauth_callback", callback_url.as_str())],
            &Nonce::generate(),
        )?;

        let body = self.get_form("request token", url).await?;
        let token = RequestToken::from_form(&body)?;

        if token.oauth_callback_confirmed == Some(false) {
            warn!("Flickr did not confirm the callback URL");
        }
        debug!(oauth_token = %token.oauth_token, "Got Flickr request token");
        Ok(token)
    }

    /// Second leg: the page the user approves the app on.
    ///
    /// `perms` is appended before `oauth_token`, and any query already on the
    /// configured authorize URL is kept.
    pub fn authorization_url(&self, request_token: &RequestToken, perms: &str) -> Url {
        let mut url = self.endpoints.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("perms", perms)
            .append_pair("oauth_token", &request_token.oauth_token);
        url
    }

    /// Third leg: trade the request token and verifier for an access token.
    pub async fn fetch_access_token(
        &self,
        request_token: &RequestToken,
        verifier: &str,
    ) -> Result<AccessToken, OAuthError> {
        debug!(oauth_token = %request_token.oauth_token, "Exchanging verifier for Flickr access token");

        let url = signature::sign_url(
            "GET",
            &self.endpoints.access_token_url,
            &self.credentials,
            Some(TokenCredential {
                token: &request_token.oauth_token,
                secret: &request_token.oauth_token_secret,
            }),
            &[("oauth_verifier", verifier)],
            &Nonce::generate(),
        )?;

        let body = self.get_form("access token", url).await?;
        let token = AccessToken::from_form(&body)?;

        debug!(user_nsid = %token.user_nsid, "Flickr access token exchange successful");
        Ok(token)
    }

    async fn get_form(&self, operation: &'static str, url: Url) -> Result<String, OAuthError> {
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                operation,
                status = status.as_u16(),
                body = %body,
                "Flickr OAuth call failed"
            );
            return Err(OAuthError::Upstream {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}
