use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    error::AppResult,
    infrastructure::middleware::Vc,
    routes::ApiJson,
    services::{profile_service::ProfileUpdate, ProfileService},
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

pub async fn get_profile(State(state): State<AppState>, vc: Vc) -> AppResult<Json<Value>> {
    let principal = vc.require_principal()?;
    let profile = ProfileService::new(state.db.clone())
        .get_profile(principal.user_id)
        .await?;
    Ok(Json(json!({ "user": profile })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> AppResult<Json<Value>> {
    let principal = vc.require_principal()?;
    let profile = ProfileService::new(state.db.clone())
        .update_profile(principal.user_id, update)
        .await?;
    Ok(Json(json!({ "user": profile })))
}
