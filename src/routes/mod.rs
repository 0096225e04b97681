// HTTP surface - JSON API under /api plus the gated frontend pages

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    app_state::AppState,
    error::AppError,
    infrastructure::middleware::{session_middleware, viewer_context_middleware},
};

pub mod auth;
pub mod groups;
pub mod onboarding;
pub mod pages;
pub mod posts;
pub mod profile;
pub mod reviews;
pub mod videos;

/// `Json` that reports malformed bodies in the API's error shape.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(bad_json(rejection)),
        }
    }
}

fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
}

/// `Path` whose rejections (e.g. a non-numeric id) use the API error shape.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(bad_path(rejection)),
        }
    }
}

fn bad_path(rejection: PathRejection) -> AppError {
    AppError::BadRequest(format!("Invalid path parameter: {}", rejection.body_text()))
}

#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(bad_query(rejection)),
        }
    }
}

fn bad_query(rejection: QueryRejection) -> AppError {
    AppError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
}

pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(onboarding::routes())
        .merge(videos::routes())
        .merge(groups::routes())
        .merge(posts::routes())
        .merge(profile::routes())
        .merge(reviews::routes())
        .fallback(pages::api_not_found)
        .layer(from_fn_with_state(state, viewer_context_middleware::<AppState>))
}

/// Full application: API, root redirect and the static frontend, all behind
/// request tracing and the page session gate.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(pages::root_redirect))
        .nest("/api", api_router(state.clone()));

    router = match state.config.server.static_dir.as_deref() {
        Some(dir) => router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => router.fallback(pages::page_not_found),
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(state.clone(), session_middleware::<AppState>)),
        )
        .with_state(state)
}
