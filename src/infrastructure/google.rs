// Google Sign-In - verifies ID tokens issued to the web client

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::{AppError, AppResult};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Claims taken from a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub google_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
}

#[async_trait]
pub trait GoogleVerifier: Send + Sync {
    async fn verify_id_token(&self, credential: &str) -> AppResult<GoogleIdentity>;
}

/// Verifies ID tokens through Google's tokeninfo endpoint, which checks the
/// signature and expiry; the audience and issuer are checked here.
pub struct TokenInfoVerifier {
    client: reqwest::Client,
    client_id: String,
}

impl TokenInfoVerifier {
    pub fn new(client_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
        }
    }
}

#[async_trait]
impl GoogleVerifier for TokenInfoVerifier {
    async fn verify_id_token(&self, credential: &str) -> AppResult<GoogleIdentity> {
        let response = self
            .client
            .get(TOKENINFO_URL)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Google tokeninfo request failed: {}", e)))?;

        if !response.status().is_success() {
            warn!("Google rejected ID token with status {}", response.status());
            return Err(AppError::Unauthorized("Invalid Google account".to_string()));
        }

        let claims: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Unreadable tokeninfo response: {}", e)))?;

        identity_from_claims(&claims, &self.client_id)
    }
}

/// Used when no client id is configured.
pub struct DisabledGoogleVerifier;

#[async_trait]
impl GoogleVerifier for DisabledGoogleVerifier {
    async fn verify_id_token(&self, _credential: &str) -> AppResult<GoogleIdentity> {
        Err(AppError::ConfigurationError(
            "GOOGLE_CLIENT_ID is not set; Google sign-in is disabled".to_string(),
        ))
    }
}

fn identity_from_claims(claims: &Value, client_id: &str) -> AppResult<GoogleIdentity> {
    let invalid = || AppError::Unauthorized("Invalid Google account".to_string());

    if claims.get("aud").and_then(Value::as_str) != Some(client_id) {
        return Err(invalid());
    }
    let issuer = claims.get("iss").and_then(Value::as_str).unwrap_or_default();
    if !GOOGLE_ISSUERS.contains(&issuer) {
        return Err(invalid());
    }

    let google_id = claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?
        .to_string();

    // tokeninfo reports booleans as strings
    let email_verified = match claims.get("email_verified") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    };

    Ok(GoogleIdentity {
        google_id,
        email: claims.get("email").and_then(Value::as_str).map(str::to_string),
        email_verified,
        name: claims
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_from_claims() {
        let claims = json!({
            "aud": "client-1",
            "iss": "https://accounts.google.com",
            "sub": "1234",
            "email": "p@example.com",
            "email_verified": "true",
            "name": "Pat"
        });
        let identity = identity_from_claims(&claims, "client-1").unwrap();
        assert_eq!(identity.google_id, "1234");
        assert!(identity.email_verified);
        assert_eq!(identity.name.as_deref(), Some("Pat"));
    }

    #[test]
    fn test_wrong_audience_or_issuer() {
        let claims = json!({"aud": "other", "iss": "accounts.google.com", "sub": "1"});
        assert!(identity_from_claims(&claims, "client-1").is_err());

        let claims = json!({"aud": "client-1", "iss": "evil.example.com", "sub": "1"});
        assert!(identity_from_claims(&claims, "client-1").is_err());
    }

    #[test]
    fn test_unverified_email() {
        let claims = json!({
            "aud": "client-1",
            "iss": "accounts.google.com",
            "sub": "1",
            "email": "p@example.com",
            "email_verified": false
        });
        assert!(!identity_from_claims(&claims, "client-1").unwrap().email_verified);
    }
}
