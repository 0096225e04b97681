use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    infrastructure::{cookies::clear_session_cookie, middleware::Vc},
    routes::ApiJson,
    services::{
        auth_service::{
            ForgotPasswordRequest, GoogleSignInRequest, LoginRequest, ResetPasswordRequest, SessionUser,
            SignupRequest, FORGOT_PASSWORD_MESSAGE,
        },
        AuthService, UserService,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.db.clone(),
        state.google.clone(),
        state.mailer.clone(),
        state.config.mail.app_url.clone(),
    )
}

/// Session cookie plus the snapshot the client routes on.
fn session_response(state: &AppState, user: SessionUser) -> AppResult<Response> {
    let cookie = state.issue_session(&user.principal())?;
    let redirect_to = user.redirect_to;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "user": user, "redirectTo": redirect_to })),
    )
        .into_response())
}

pub async fn signup(State(state): State<AppState>, ApiJson(req): ApiJson<SignupRequest>) -> AppResult<Response> {
    let user = auth_service(&state).signup(req).await?;
    session_response(&state, user)
}

pub async fn login(State(state): State<AppState>, ApiJson(req): ApiJson<LoginRequest>) -> AppResult<Response> {
    let user = auth_service(&state).login(req).await?;
    session_response(&state, user)
}

pub async fn google(State(state): State<AppState>, ApiJson(req): ApiJson<GoogleSignInRequest>) -> AppResult<Response> {
    let user = auth_service(&state).google_sign_in(req).await?;
    session_response(&state, user)
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    auth_service(&state).forgot_password(req).await?;
    Ok(Json(json!({ "message": FORGOT_PASSWORD_MESSAGE })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    auth_service(&state).reset_password(req).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn logout() -> impl IntoResponse {
    ([(header::SET_COOKIE, clear_session_cookie())], Json(json!({ "success": true })))
}

/// Current user from a fresh read. A token whose account is gone gets a 404
/// and its cookie cleared.
pub async fn me(State(state): State<AppState>, vc: Vc) -> AppResult<Response> {
    let principal = vc.require_principal()?;
    let users = UserService::new(state.db.clone());

    match users.find_by_id(principal.user_id).await? {
        Some(user) => {
            let current = users.current_user(user).await?;
            Ok(Json(json!({ "user": current })).into_response())
        }
        None => Ok((
            [(header::SET_COOKIE, clear_session_cookie())],
            AppError::NotFound("User not found".to_string()),
        )
            .into_response()),
    }
}
