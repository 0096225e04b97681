// Page-level handlers: the root redirect and not-found responses

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    infrastructure::{
        cookies::clear_session_cookie,
        middleware::{inspect_session, session_middleware::LOGIN_PATH, SessionCredential},
    },
    services::UserService,
};

/// `/` sends each visitor to the page their account state allows.
pub async fn root_redirect(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let principal = match inspect_session(&headers, &state.tokens) {
        SessionCredential::Valid(principal) => principal,
        SessionCredential::Invalid(err) => {
            debug!("Clearing unusable session on root: {}", err);
            return Ok(login_with_cleared_cookie());
        }
        SessionCredential::Missing => return Ok(Redirect::to(LOGIN_PATH).into_response()),
    };

    let users = UserService::new(state.db.clone());
    let Some(user) = users.find_by_id(principal.user_id).await? else {
        return Ok(login_with_cleared_cookie());
    };

    let (account_state, _) = users.account_state(&user).await?;
    Ok(Redirect::to(account_state.landing_path()).into_response())
}

fn login_with_cleared_cookie() -> Response {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to(LOGIN_PATH),
    )
        .into_response()
}

pub async fn api_not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

pub async fn page_not_found() -> AppError {
    AppError::NotFound("Page not found".to_string())
}
