use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use crate::{
    app_state::AppState,
    error::AppResult,
    infrastructure::{middleware::Vc, token_codec::Principal},
    routes::ApiJson,
    services::{profile_service::OnboardingRequest, ProfileService},
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/onboarding", post(submit))
}

/// Completes onboarding and re-issues the session so the cookie's
/// onboarding flag matches the account.
pub async fn submit(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<OnboardingRequest>,
) -> AppResult<Response> {
    let principal = vc.require_principal()?;
    let outcome = ProfileService::new(state.db.clone())
        .submit_onboarding(principal.user_id, req)
        .await?;

    let cookie = state.issue_session(&Principal {
        onboarding_complete: true,
        ..principal.clone()
    })?;
    Ok(([(header::SET_COOKIE, cookie)], Json(outcome)).into_response())
}
