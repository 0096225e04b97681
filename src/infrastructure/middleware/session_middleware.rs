// Session Middleware - gates page requests on the session cookie
//
// Public pages bounce signed-in users to /discover, protected pages bounce
// anonymous users to /login. The root path has its own redirect handler,
// /api has its own guard and static assets are never gated.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::infrastructure::{
    cookies::clear_session_cookie,
    middleware::viewer_context_middleware::{inspect_session, HasTokenCodec, SessionCredential},
};

const PUBLIC_PREFIXES: [&str; 4] = ["/login", "/signup", "/forgot-password", "/reset-password"];
const ASSET_PREFIXES: [&str; 5] = ["/_next/", "/static/", "/assets/", "/public/", "/favicon.ico"];

pub const LOGIN_PATH: &str = "/login";
pub const DISCOVER_PATH: &str = "/discover";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Api,
    Asset,
    Root,
    Public,
    Protected,
}

pub fn classify_path(path: &str) -> PathClass {
    if path == "/api" || path.starts_with("/api/") {
        return PathClass::Api;
    }
    if ASSET_PREFIXES.iter().any(|p| path.starts_with(p)) || has_file_extension(path) {
        return PathClass::Asset;
    }
    if path == "/" || path.is_empty() {
        return PathClass::Root;
    }
    if PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return PathClass::Public;
    }
    PathClass::Protected
}

fn has_file_extension(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow { clear_cookie: bool },
    RedirectToLogin { clear_cookie: bool },
    RedirectToDiscover,
}

pub fn decide(class: PathClass, credential: &SessionCredential) -> GateDecision {
    let stale = matches!(credential, SessionCredential::Invalid(_));
    let signed_in = matches!(credential, SessionCredential::Valid(_));

    match class {
        PathClass::Api | PathClass::Asset => GateDecision::Allow { clear_cookie: false },
        PathClass::Protected if !signed_in => GateDecision::RedirectToLogin { clear_cookie: stale },
        PathClass::Public if signed_in => GateDecision::RedirectToDiscover,
        _ => GateDecision::Allow { clear_cookie: stale },
    }
}

pub async fn session_middleware<T>(State(app_state): State<T>, request: Request, next: Next) -> Response
where
    T: HasTokenCodec + Clone + Send + Sync + 'static,
{
    let class = classify_path(request.uri().path());
    if matches!(class, PathClass::Api | PathClass::Asset) {
        return next.run(request).await;
    }

    let credential = inspect_session(request.headers(), app_state.token_codec());
    let decision = decide(class, &credential);
    debug!(path = %request.uri().path(), ?class, ?decision, "Session gate");

    match decision {
        GateDecision::RedirectToLogin { clear_cookie } => {
            with_cleared_cookie(Redirect::to(LOGIN_PATH).into_response(), clear_cookie)
        }
        GateDecision::RedirectToDiscover => Redirect::to(DISCOVER_PATH).into_response(),
        GateDecision::Allow { clear_cookie } => with_cleared_cookie(next.run(request).await, clear_cookie),
    }
}

fn with_cleared_cookie(mut response: Response, clear: bool) -> Response {
    if clear {
        response
            .headers_mut()
            .append(header::SET_COOKIE, clear_session_cookie());
    }
    response
}
