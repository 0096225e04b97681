// Session cookie - reading it from requests and building Set-Cookie values

use axum::http::{header, HeaderMap, HeaderValue};

use crate::error::{AppError, AppResult};
use crate::infrastructure::token_codec::SESSION_TTL_SECS;

pub const SESSION_COOKIE: &str = "token";

/// Value of the session cookie, if the request carries a non-empty one.
pub fn read_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// HttpOnly, SameSite=Lax, seven-day session cookie.
pub fn session_cookie(token: &str, secure: bool) -> AppResult<HeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(format!("Invalid session cookie: {}", e)))
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
