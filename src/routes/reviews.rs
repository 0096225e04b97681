use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    error::AppResult,
    infrastructure::middleware::Vc,
    services::{review_service::ReviewQueue, ReviewService},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(review_feed))
        .route("/reviews/pending", get(pending_reviews))
}

pub async fn review_feed(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let reviews = ReviewService::new(state.db.clone()).feed().await?;
    Ok(Json(json!({ "reviews": reviews })))
}

pub async fn pending_reviews(State(state): State<AppState>, vc: Vc) -> AppResult<Json<ReviewQueue>> {
    let principal = vc.require_principal()?;
    let queue = ReviewService::new(state.db.clone())
        .pending(principal.user_id)
        .await?;
    Ok(Json(queue))
}
