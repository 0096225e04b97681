// ViewerContext Middleware - decodes the session cookie for /api requests
// and injects the resulting ViewerContext into request extensions

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::infrastructure::{
    cookies::read_session_token,
    token_codec::{Principal, TokenCodec, TokenError},
    viewer::ViewerContext,
};

/// Application state that can verify session credentials
pub trait HasTokenCodec {
    fn token_codec(&self) -> &TokenCodec;
}

/// Outcome of looking at a request's session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCredential {
    Missing,
    Invalid(TokenError),
    Valid(Principal),
}

impl SessionCredential {
    pub fn principal(self) -> Option<Principal> {
        match self {
            SessionCredential::Valid(principal) => Some(principal),
            _ => None,
        }
    }
}

/// Read and verify the session cookie. Page gating and the API share this.
pub fn inspect_session(headers: &axum::http::HeaderMap, codec: &TokenCodec) -> SessionCredential {
    match read_session_token(headers) {
        None => SessionCredential::Missing,
        Some(token) => match codec.verify(&token) {
            Ok(principal) => SessionCredential::Valid(principal),
            Err(err) => SessionCredential::Invalid(err),
        },
    }
}

/// Attach a ViewerContext to every API request. Invalid credentials are
/// treated as anonymous; handlers that need an identity return 401.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Response
where
    T: HasTokenCodec + Clone + Send + Sync + 'static,
{
    let request_id = format!("req-{}", Uuid::new_v4());

    let viewer_context = match inspect_session(request.headers(), app_state.token_codec()) {
        SessionCredential::Valid(principal) => ViewerContext::authenticated(principal, request_id),
        SessionCredential::Invalid(err) => {
            debug!(request_id = %request_id, "Ignoring session cookie: {}", err);
            ViewerContext::anonymous(request_id)
        }
        SessionCredential::Missing => ViewerContext::anonymous(request_id),
    };

    request.extensions_mut().insert(Arc::new(viewer_context));

    next.run(request).await
}
