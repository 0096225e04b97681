use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    error::AppResult,
    infrastructure::middleware::Vc,
    models::PostId,
    routes::{ApiJson, ApiPath},
    services::{
        post_service::{CommentRequest, VoteOutcome, VoteRequest},
        PostService,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}", delete(delete_post))
        .route("/posts/{id}/vote", post(vote))
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
}

pub async fn delete_post(State(state): State<AppState>, vc: Vc, ApiPath(id): ApiPath<PostId>) -> AppResult<Json<Value>> {
    let principal = vc.require_principal()?;
    PostService::new(state.db.clone())
        .delete(principal.user_id, id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn vote(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<PostId>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> AppResult<Json<VoteOutcome>> {
    let principal = vc.require_principal()?;
    let outcome = PostService::new(state.db.clone())
        .vote(principal.user_id, id, req.value)
        .await?;
    Ok(Json(outcome))
}

pub async fn list_comments(State(state): State<AppState>, ApiPath(id): ApiPath<PostId>) -> AppResult<Json<Value>> {
    let comments = PostService::new(state.db.clone()).comments(id).await?;
    Ok(Json(json!({ "comments": comments })))
}

pub async fn add_comment(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<PostId>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> AppResult<Json<Value>> {
    let principal = vc.require_principal()?;
    let comment = PostService::new(state.db.clone())
        .add_comment(principal.user_id, id, req)
        .await?;
    Ok(Json(json!({ "comment": comment })))
}
