// ViewerContext Extractor - ergonomic access for handlers

use std::sync::Arc;
use crate::error::AppError;
use crate::infrastructure::viewer::ViewerContext;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Cheap-to-clone handle on the request's ViewerContext.
///
/// ```rust,ignore
/// async fn handler(vc: Vc) -> AppResult<Json<Value>> {
///     let principal = vc.require_principal()?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }
}

// Field access goes straight through: vc.request_id, vc.require_principal(), ...
impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc::new(vc.clone()))
            .ok_or_else(|| {
                AppError::Internal("ViewerContext missing; viewer_context_middleware not installed".to_string())
            });

        async move { vc }
    }
}
