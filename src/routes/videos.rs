use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    error::AppResult,
    infrastructure::middleware::Vc,
    models::VideoId,
    routes::{ApiJson, ApiPath, ApiQuery},
    services::{
        review_service::{FeedbackOutcome, FeedbackRequest, ReviewRequest},
        video_service::{VideoFilter, ViewRequest},
        ReviewService, VideoService,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/{id}", get(get_video))
        .route("/videos/{id}/view", post(record_view))
        .route("/videos/{id}/feedback", get(feedback_status).post(submit_feedback))
        .route("/videos/{id}/reviews", post(submit_review))
}

pub async fn list_videos(State(state): State<AppState>, ApiQuery(filter): ApiQuery<VideoFilter>) -> AppResult<Json<Value>> {
    let videos = VideoService::new(state.db.clone()).list(&filter).await?;
    Ok(Json(json!({ "videos": videos })))
}

pub async fn get_video(State(state): State<AppState>, ApiPath(id): ApiPath<VideoId>) -> AppResult<Json<Value>> {
    let video = VideoService::new(state.db.clone()).detail(id).await?;
    Ok(Json(json!({ "video": video })))
}

/// The body is optional; anything unparseable counts as `completed: false`.
pub async fn record_view(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<VideoId>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let principal = vc.require_principal()?;
    let view: ViewRequest = serde_json::from_slice(&body).unwrap_or_default();

    VideoService::new(state.db.clone())
        .record_view(principal.user_id, id, view.completed == Some(true))
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn feedback_status(State(state): State<AppState>, vc: Vc, ApiPath(id): ApiPath<VideoId>) -> AppResult<Json<Value>> {
    let completed = ReviewService::new(state.db.clone())
        .feedback_status(vc.user_id(), id)
        .await?;
    Ok(Json(json!({ "feedbackCompleted": completed })))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<VideoId>,
    ApiJson(req): ApiJson<FeedbackRequest>,
) -> AppResult<Json<FeedbackOutcome>> {
    let principal = vc.require_principal()?;
    let outcome = ReviewService::new(state.db.clone())
        .submit_feedback(principal.user_id, id, req)
        .await?;
    Ok(Json(outcome))
}

pub async fn submit_review(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<VideoId>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> AppResult<Json<Value>> {
    let principal = vc.require_principal()?;
    let review = ReviewService::new(state.db.clone())
        .submit_review(principal.user_id, id, req)
        .await?;
    Ok(Json(json!({ "review": review })))
}
