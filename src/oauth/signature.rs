//! OAuth 1.0a request signing (RFC 5849 section 3.4) with HMAC-SHA1.
//!
//! Flickr accepts the protocol parameters in the query string
//! (RFC 5849 section 3.5.3), so [`sign_url`] returns the request URL with every
//! `oauth_*` parameter, signature included, appended to it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use sha1::Sha1;
use url::Url;

use super::OAuthError;
use crate::credentials::Credentials;

type HmacSha1 = Hmac<Sha1>;

/// Value of `oauth_signature_method`.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

const OAUTH_VERSION: &str = "1.0";

const NONCE_LENGTH: usize = 32;

/// The per-request nonce and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl Nonce {
    /// A random alphanumeric nonce stamped with the current time.
    pub fn generate() -> Self {
        let nonce = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LENGTH)
            .map(char::from)
            .collect();
        Self {
            nonce,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// A token credential (`oauth_token` and its secret) to sign with.
#[derive(Clone, Copy)]
pub struct TokenCredential<'a> {
    pub token: &'a str,
    pub secret: &'a str,
}

/// RFC 3986 percent-encoding, as required for every component of the
/// signature base string.
pub fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Build the signature base string (RFC 5849 section 3.4.1).
///
/// `params` must hold every request parameter, query string included,
/// already decoded. `oauth_signature` itself must not be present.
pub fn base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_uri(url)),
        percent_encode(&normalized)
    )
}

/// Scheme, host, non-default port and path; no query or fragment.
fn base_uri(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

/// `consumer_secret&token_secret`, each percent-encoded. The token part is
/// empty when signing the request-token call.
pub fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or_default())
    )
}

/// Base64 HMAC-SHA1 of `base` under `key`.
pub fn hmac_sha1(key: &str, base: &str) -> Result<String, OAuthError> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| OAuthError::Signing(e.to_string()))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Sign a request and return `url` with the protocol parameters and
/// `oauth_signature` appended to its query string.
///
/// `extra` carries leg-specific protocol parameters such as `oauth_callback`
/// or `oauth_verifier`; they are signed and sent alongside the rest.
pub fn sign_url(
    method: &str,
    url: &Url,
    credentials: &Credentials,
    token: Option<TokenCredential<'_>>,
    extra: &[(&str, &str)],
    nonce: &Nonce,
) -> Result<Url, OAuthError> {
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), credentials.client_id().into()),
        ("oauth_nonce".into(), nonce.nonce.clone()),
        ("oauth_signature_method".into(), SIGNATURE_METHOD.into()),
        ("oauth_timestamp".into(), nonce.timestamp.to_string()),
        ("oauth_version".into(), OAUTH_VERSION.into()),
    ];
    if let Some(token) = token {
        oauth_params.push(("oauth_token".into(), token.token.into()));
    }
    oauth_params.extend(extra.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));

    let mut all_params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    all_params.extend(oauth_params.iter().cloned());

    let base = base_string(method, url, &all_params);
    let key = signing_key(credentials.client_secret(), token.map(|t| t.secret));
    let signature = hmac_sha1(&key, &base)?;

    let mut signed = url.clone();
    signed
        .query_pairs_mut()
        .extend_pairs(oauth_params)
        .append_pair("oauth_signature", &signature);
    Ok(signed)
}
