use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    error::AppResult,
    infrastructure::middleware::Vc,
    models::GroupId,
    routes::{ApiJson, ApiPath, ApiQuery},
    services::{
        group_service::CreateGroupRequest,
        post_service::{CreatePostRequest, PostSort},
        GroupService, PostService,
    },
};

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub sort: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{id}", get(get_group))
        .route("/groups/{id}/join", post(toggle_membership))
        .route("/groups/{id}/posts", get(list_posts).post(create_post))
}

pub async fn list_groups(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let groups = GroupService::new(state.db.clone()).list().await?;
    Ok(Json(json!({ "groups": groups })))
}

pub async fn create_group(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> AppResult<Json<Value>> {
    let principal = vc.require_principal()?;
    let group = GroupService::new(state.db.clone())
        .create(principal.user_id, req)
        .await?;
    Ok(Json(json!({ "group": group })))
}

pub async fn get_group(State(state): State<AppState>, vc: Vc, ApiPath(id): ApiPath<GroupId>) -> AppResult<Json<Value>> {
    let group = GroupService::new(state.db.clone()).detail(id, vc.user_id()).await?;
    Ok(Json(json!({ "group": group })))
}

pub async fn toggle_membership(State(state): State<AppState>, vc: Vc, ApiPath(id): ApiPath<GroupId>) -> AppResult<Json<Value>> {
    let principal = vc.require_principal()?;
    let joined = GroupService::new(state.db.clone())
        .toggle_membership(principal.user_id, id)
        .await?;
    Ok(Json(json!({ "joined": joined })))
}

pub async fn list_posts(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<GroupId>,
    ApiQuery(query): ApiQuery<PostListQuery>,
) -> AppResult<Json<Value>> {
    let sort = PostSort::parse(query.sort.as_deref());
    let posts = PostService::new(state.db.clone()).list(id, sort).await?;
    Ok(Json(json!({ "posts": posts })))
}

pub async fn create_post(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<GroupId>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> AppResult<Json<Value>> {
    let principal = vc.require_principal()?;
    let post = PostService::new(state.db.clone())
        .create(principal.user_id, id, req)
        .await?;
    Ok(Json(json!({ "post": post })))
}
