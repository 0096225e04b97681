use crate::error::{AppError, AppResult};
use crate::infrastructure::token_codec::Principal;
use crate::models::UserId;

/// Request-scoped view of who is calling.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub request_id: String,
    pub principal: Option<Principal>,
}

impl ViewerContext {
    pub fn anonymous(request_id: String) -> Self {
        Self {
            request_id,
            principal: None,
        }
    }

    pub fn authenticated(principal: Principal, request_id: String) -> Self {
        Self {
            request_id,
            principal: Some(principal),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.principal.as_ref().map(|p| p.user_id)
    }

    /// The principal, or 401 for anonymous viewers.
    pub fn require_principal(&self) -> AppResult<&Principal> {
        self.principal
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}
