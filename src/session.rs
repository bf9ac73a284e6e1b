//! Per-browser session storage.
//!
//! The whole session is a small JSON object kept in one encrypted,
//! authenticated cookie (`PrivateCookieJar`). A cookie that fails to decrypt
//! or parse is treated as an empty session.

use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::SessionConfig;

/// Minimum length of `session.secret_key`, imposed by the cookie cipher.
pub const MIN_SECRET_KEY_LEN: usize = 64;

/// Session data for one request.
///
/// Handlers mutate it and hand it back to [`Session::save`]; the cookie is
/// only rewritten when something changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    data: Map<String, Value>,
    modified: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the session from the request's cookies.
    pub fn load(jar: &PrivateCookieJar, cookie_name: &str) -> Self {
        let Some(cookie) = jar.get(cookie_name) else {
            return Self::default();
        };
        match serde_json::from_str::<Map<String, Value>>(cookie.value()) {
            Ok(data) => Self {
                data,
                modified: false,
            },
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session cookie");
                Self::default()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
        self.modified = true;
    }

    /// Take `key` out of the session.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let value = self.data.remove(key);
        if value.is_some() {
            self.modified = true;
        }
        value
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Write the session back into `jar`.
    ///
    /// An emptied session removes the cookie altogether.
    pub fn save(self, jar: PrivateCookieJar, config: &SessionConfig) -> PrivateCookieJar {
        if !self.modified {
            return jar;
        }

        if self.data.is_empty() {
            return jar.remove(Cookie::build((config.cookie_name.clone(), "")).path("/"));
        }

        let value = match serde_json::to_string(&self.data) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to serialize session");
                return jar;
            }
        };

        jar.add(
            Cookie::build((config.cookie_name.clone(), value))
                .http_only(true)
                .secure(config.secure_cookies)
                .same_site(SameSite::Lax)
                .path("/")
                .build(),
        )
    }
}

/// The key session cookies are encrypted with.
///
/// Uses `session.secret_key` when set; otherwise a random key is generated,
/// which logs everyone out on restart.
pub fn cookie_key(config: &SessionConfig) -> anyhow::Result<Key> {
    match config.secret_key.as_deref() {
        Some(secret) => Key::try_from(secret.as_bytes()).map_err(|_| {
            anyhow::anyhow!(
                "session.secret_key is set but invalid (must be at least {MIN_SECRET_KEY_LEN} bytes)"
            )
        }),
        None => {
            info!("No session.secret_key configured, using an ephemeral cookie key");
            Ok(Key::generate())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};
    use axum::response::IntoResponse;

    fn config() -> SessionConfig {
        SessionConfig {
            cookie_name: "session".to_string(),
            secure_cookies: false,
            secret_key: None,
        }
    }

    /// Round-trip a jar through a response and back into request headers.
    fn reload(jar: PrivateCookieJar, key: &Key) -> PrivateCookieJar {
        let response = jar.into_response();
        let mut headers = HeaderMap::new();
        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let raw = set_cookie.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            headers.append(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        }
        PrivateCookieJar::from_headers(&headers, key.clone())
    }

    #[test]
    fn test_empty_jar_gives_empty_session() {
        let jar = PrivateCookieJar::new(Key::generate());
        let session = Session::load(&jar, "session");
        assert!(session.is_empty());
        assert!(!session.is_modified());
    }

    #[test]
    fn test_insert_and_remove_mark_modified() {
        let mut session = Session::new();
        session.insert("a", Value::from(1));
        assert!(session.is_modified());
        assert_eq!(session.get("a"), Some(&Value::from(1)));

        let mut session = Session::new();
        assert!(session.remove("missing").is_none());
        assert!(!session.is_modified());
    }

    #[test]
    fn test_save_and_load() {
        let key = Key::generate();
        let mut session = Session::new();
        session.insert("_user_id", Value::from("123@N01:alice"));

        let jar = session.save(PrivateCookieJar::new(key.clone()), &config());
        let jar = reload(jar, &key);

        let loaded = Session::load(&jar, "session");
        assert_eq!(loaded.get("_user_id"), Some(&Value::from("123@N01:alice")));
        assert!(!loaded.is_modified());
    }

    #[test]
    fn test_cookie_attributes() {
        let mut session = Session::new();
        session.insert("k", Value::from("v"));
        let jar = session.save(PrivateCookieJar::new(Key::generate()), &config());

        let cookie = jar.get("session").unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_emptied_session_removes_cookie() {
        let key = Key::generate();
        let mut session = Session::new();
        session.insert("k", Value::from("v"));
        let jar = reload(session.save(PrivateCookieJar::new(key.clone()), &config()), &key);

        let mut session = Session::load(&jar, "session");
        session.remove("k");
        let jar = session.save(jar, &config());
        assert!(jar.get("session").is_none());
    }

    #[test]
    fn test_cookie_from_other_key_is_ignored() {
        let mut session = Session::new();
        session.insert("k", Value::from("v"));
        let jar = reload(
            session.save(PrivateCookieJar::new(Key::generate()), &config()),
            &Key::generate(),
        );
        assert!(Session::load(&jar, "session").is_empty());
    }

    #[test]
    fn test_cookie_key_from_config() {
        let mut cfg = config();
        cfg.secret_key = Some("x".repeat(MIN_SECRET_KEY_LEN));
        let a = cookie_key(&cfg).unwrap();
        let b = cookie_key(&cfg).unwrap();
        assert_eq!(a.master(), b.master());
    }

    #[test]
    fn test_cookie_key_too_short() {
        let mut cfg = config();
        cfg.secret_key = Some("short".to_string());
        let err = cookie_key(&cfg).unwrap_err();
        assert!(err.to_string().contains("at least 64 bytes"));
    }
}
