use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::CurrentUser;
use crate::web::found;

/// Axum middleware for routes that need a logged-in user.
///
/// Anonymous requests are redirected to the home page with the requested
/// path in `next`. Otherwise the [`Principal`](crate::auth::Principal) is
/// injected into request extensions for the handler to take as
/// `Extension<Principal>`.
pub async fn require_login(
    CurrentUser(current): CurrentUser,
    mut request: Request,
    next: Next,
) -> Response {
    match current {
        Some(principal) => {
            tracing::debug!(user_nsid = %principal.user_nsid, "Authenticated request");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        None => {
            let path = request.uri().path();
            tracing::debug!(path, "Login required, redirecting");
            found(&format!("/?next={}", urlencoding::encode(path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppState;
    use crate::auth::{Principal, identity};
    use crate::config::Config;
    use crate::credentials::Credentials;
    use crate::oauth::AccessToken;
    use crate::session::Session;
    use axum::Extension;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum_extra::extract::PrivateCookieJar;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let mut config = Config::default();
        config.session.secure_cookies = false;
        AppState::new(config, Credentials::new("123", "456")).unwrap()
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route(
                "/secret",
                get(|Extension(principal): Extension<Principal>| async move {
                    format!("hello {}", principal.user_nsid)
                }),
            )
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_login,
            ))
            .with_state(state)
    }

    fn logged_in_cookie(state: &AppState) -> String {
        let mut session = Session::new();
        identity::bind(
            &mut session,
            &AccessToken {
                oauth_token: "a".to_string(),
                oauth_token_secret: "b".to_string(),
                user_nsid: "test@123".to_string(),
                username: "Father Sword".to_string(),
                fullname: None,
            },
        );
        let jar = session.save(
            PrivateCookieJar::new(state.cookie_key.clone()),
            &state.config.session,
        );
        let response = jar.into_response();
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_anonymous_is_redirected() {
        let response = app(test_state())
            .oneshot(HttpRequest::builder().uri("/secret").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/?next=%2Fsecret");
    }

    #[tokio::test]
    async fn test_logged_in_passes_principal() {
        let state = test_state();
        let cookie = logged_in_cookie(&state);
        let response = app(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/secret")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hello test@123");
    }

    #[tokio::test]
    async fn test_cookie_from_other_key_is_anonymous() {
        let cookie = logged_in_cookie(&test_state());
        let response = app(test_state())
            .oneshot(
                HttpRequest::builder()
                    .uri("/secret")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
    }
}
