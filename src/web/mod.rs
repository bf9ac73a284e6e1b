//! Pages and login routes.
//!
//! | Route        | Access      |
//! |--------------|-------------|
//! | `/`          | public      |
//! | `/authorize` | public      |
//! | `/callback`  | public      |
//! | `/logout`    | public      |
//! | `/secret`    | logged in   |
//!
//! Every redirect is a `302 Found`.

pub mod templates;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router, middleware};
use axum_extra::extract::PrivateCookieJar;
use minijinja::{Environment, context};
use serde::Deserialize;

use crate::AppState;
use crate::auth::middleware::require_login;
use crate::auth::{CurrentUser, Principal, identity};
use crate::error::AppError;
use crate::oauth::{CallbackParams, CompleteOutcome, StartOutcome};
use crate::session::Session;

const LAYOUT_TEMPLATE: &str = "layout.html";
const HOME_TEMPLATE: &str = "home.html";
const SECRET_TEMPLATE: &str = "secret.html";

// ---------------------------------------------------------------------------
// Template engine
// ---------------------------------------------------------------------------

/// Build a minijinja environment with all embedded templates registered.
fn template_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_template(LAYOUT_TEMPLATE, templates::LAYOUT)
        .expect("layout template");
    env.add_template(HOME_TEMPLATE, templates::HOME)
        .expect("home template");
    env.add_template(SECRET_TEMPLATE, templates::SECRET)
        .expect("secret template");
    env
}

/// Render a template by name with the given minijinja context.
fn render(template_name: &str, ctx: minijinja::Value) -> Response {
    let env = template_env();
    match env.get_template(template_name) {
        Ok(tmpl) => match tmpl.render(ctx) {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!(template = template_name, error = %err, "Template render error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(format!(
                        "<h1>Template Error</h1><pre>{}</pre>",
                        html_escape(&err.to_string())
                    )),
                )
                    .into_response()
            }
        },
        Err(err) => {
            tracing::error!(template = template_name, error = %err, "Template not found");
            (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Template Not Found</h1>".to_string()))
                .into_response()
        }
    }
}

/// Minimal HTML entity escaping for error messages.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `302 Found` to `location`. (`Redirect::to` would answer `303`.)
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the router with all page and login routes.
///
/// `/secret` sits behind [`require_login`]; everything else is public.
pub fn build_web_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/secret", get(secret_page))
        .route_layer(middleware::from_fn_with_state(state, require_login))
        .route("/", get(home_page))
        .route("/authorize", get(authorize))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

// ---------------------------------------------------------------------------
// Page handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct HomeQuery {
    next: Option<String>,
}

/// Always renders; a query string that doesn't parse just drops the hint.
async fn home_page(
    CurrentUser(current): CurrentUser,
    query: Result<Query<HomeQuery>, QueryRejection>,
) -> Response {
    let next = query.ok().and_then(|Query(query)| query.next);
    render(HOME_TEMPLATE, context! { user => current, next => next })
}

async fn secret_page(Extension(principal): Extension<Principal>) -> Response {
    render(SECRET_TEMPLATE, context! { user => principal })
}

// ---------------------------------------------------------------------------
// Login handlers
// ---------------------------------------------------------------------------

/// First leg: get a request token and send the browser to Flickr.
async fn authorize(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let mut session = Session::load(&jar, &state.config.session.cookie_name);

    match state.handshake.start(current.as_ref(), &mut session).await? {
        StartOutcome::AlreadyAuthorized => Ok(found("/")),
        StartOutcome::Redirect(url) => {
            tracing::info!("Redirecting to Flickr for authorization");
            let jar = session.save(jar, &state.config.session);
            Ok((jar, found(url.as_str())).into_response())
        }
    }
}

/// Final leg: Flickr sends the browser back here with the verifier.
///
/// The session is written back on every outcome, since `complete` consumes
/// the stored request token even when it rejects the callback.
async fn callback(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut session = Session::load(&jar, &state.config.session.cookie_name);

    let result = state
        .handshake
        .complete(current.as_ref(), &mut session, &params)
        .await;

    match result {
        Ok(CompleteOutcome::AlreadyAuthorized) => found("/"),
        Ok(CompleteOutcome::Authorized(token)) => {
            let principal = identity::bind(&mut session, &token);
            tracing::info!(user_nsid = %principal.user_nsid, "Logged in");
            (session.save(jar, &state.config.session), found("/")).into_response()
        }
        Err(err) => (session.save(jar, &state.config.session), AppError::from(err)).into_response(),
    }
}

async fn logout(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let mut session = Session::load(&jar, &state.config.session.cookie_name);

    if let Some(principal) = identity::resolve(&session) {
        tracing::info!(user_nsid = %principal.user_nsid, "Logged out");
    }
    identity::unbind(&mut session);

    (session.save(jar, &state.config.session), found("/")).into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
