//! Shared helpers for the integration tests.
//!
//! [`TestClient`] drives the full router with `oneshot` and carries cookies
//! between requests like a browser would. A wiremock server stands in for
//! Flickr.
#![allow(dead_code)]

use std::collections::BTreeMap;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use axum::response::IntoResponse;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Cookie;
use tower::ServiceExt;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flickr_login::auth::identity;
use flickr_login::config::Config;
use flickr_login::credentials::Credentials;
use flickr_login::oauth::AccessToken;
use flickr_login::session::Session;
use flickr_login::{AppState, build_app};

pub const REQUEST_TOKEN_PATH: &str = "/services/oauth/request_token";
pub const AUTHORIZE_PATH: &str = "/services/oauth/authorize";
pub const ACCESS_TOKEN_PATH: &str = "/services/oauth/access_token";

// ---------------------------------------------------------------------------
// App setup
// ---------------------------------------------------------------------------

/// Config pointing every Flickr endpoint at `provider_uri`.
pub fn test_config(provider_uri: &str) -> Config {
    let mut config = Config::default();
    config.server.public_url = Some("http://localhost".to_string());
    config.flickr.request_token_url = format!("{provider_uri}{REQUEST_TOKEN_PATH}");
    config.flickr.authorize_url = format!("{provider_uri}{AUTHORIZE_PATH}");
    config.flickr.access_token_url = format!("{provider_uri}{ACCESS_TOKEN_PATH}");
    config.session.secure_cookies = false;
    config
}

pub fn test_state(provider: &MockServer) -> AppState {
    AppState::new(test_config(&provider.uri()), Credentials::new("123", "456"))
        .expect("test state")
}

// ---------------------------------------------------------------------------
// Browser-like client
// ---------------------------------------------------------------------------

pub struct TestClient {
    state: AppState,
    app: Router,
    cookies: BTreeMap<String, String>,
}

impl TestClient {
    pub fn new(state: AppState) -> Self {
        Self {
            app: build_app(state.clone()),
            state,
            cookies: BTreeMap::new(),
        }
    }

    /// A client whose session cookie already holds `session`.
    pub fn with_session(state: AppState, session: Session) -> Self {
        let mut client = Self::new(state);
        client.set_session(session);
        client
    }

    /// A client logged in as `user_nsid` / `username`.
    pub fn logged_in(state: AppState, user_nsid: &str, username: &str) -> Self {
        let mut session = Session::new();
        identity::bind(&mut session, &access_token(user_nsid, username));
        Self::with_session(state, session)
    }

    /// Replace the session cookie, encrypting it with the app's key.
    pub fn set_session(&mut self, session: Session) {
        let jar = session.save(
            PrivateCookieJar::new(self.state.cookie_key.clone()),
            &self.state.config.session,
        );
        self.store_cookies(&jar.into_response());
    }

    /// Send `other`'s cookies from this client too.
    pub fn copy_cookies_from(&mut self, other: &TestClient) {
        self.cookies.clone_from(&other.cookies);
    }

    pub fn has_session_cookie(&self) -> bool {
        self.cookies.contains_key(&self.state.config.session.cookie_name)
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, cookie_header);
        }

        let response = self
            .app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        self.store_cookies(&response);
        response
    }

    fn store_cookies<B>(&mut self, response: &Response<B>) {
        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(set_cookie.to_str().unwrap().to_string()).unwrap();
            if cookie.value().is_empty() {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location<B>(response: &Response<B>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub fn assert_redirect<B>(response: &Response<B>, expected: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(response), expected);
}

pub fn access_token(user_nsid: &str, username: &str) -> AccessToken {
    AccessToken {
        oauth_token: "access-token".to_string(),
        oauth_token_secret: "access-token-secret".to_string(),
        user_nsid: user_nsid.to_string(),
        username: username.to_string(),
        fullname: None,
    }
}

// ---------------------------------------------------------------------------
// Fake Flickr
// ---------------------------------------------------------------------------

/// A provider that fails the test if it receives any request.
pub async fn silent_provider() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    server
}

pub async fn mount_request_token(server: &MockServer, token: &str, secret: &str) {
    Mock::given(method("GET"))
        .and(path(REQUEST_TOKEN_PATH))
        .and(query_param("oauth_consumer_key", "123"))
        .and(query_param("oauth_callback", "http://localhost/callback"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "oauth_callback_confirmed=true&oauth_token={token}&oauth_token_secret={secret}"
        )))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_access_token(
    server: &MockServer,
    token: &str,
    verifier: &str,
    user_nsid: &str,
    username: &str,
) {
    Mock::given(method("GET"))
        .and(path(ACCESS_TOKEN_PATH))
        .and(query_param("oauth_token", token))
        .and(query_param("oauth_verifier", verifier))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "fullname=&oauth_token=access-token&oauth_token_secret=access-token-secret\
             &user_nsid={}&username={}",
            urlencoding::encode(user_nsid),
            urlencoding::encode(username),
        )))
        .expect(1)
        .mount(server)
        .await;
}
