// AuthService - password accounts, Google sign-in and password recovery

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    database::Database,
    domains::{AccountState, LifecycleEvent},
    error::{AppError, AppResult},
    infrastructure::{
        google::GoogleVerifier,
        mailer::{password_reset_email, Mailer},
        security::{generate_reset_token, hash_password, validate_new_password, verify_password},
        token_codec::Principal,
    },
    models::{User, UserId},
    services::user_service::{feedback_review_count, find_by_email, normalize_email},
};

pub const GOOGLE_ACCOUNT_MESSAGE: &str =
    "An account with this email uses Google Sign-In. Please sign in with Google.";
pub const GOOGLE_ONLY_LOGIN_MESSAGE: &str =
    "This account uses Google Sign-In. Please sign in with Google.";
pub const FORGOT_PASSWORD_MESSAGE: &str = "If an account with that email exists, we sent a reset link.";
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_RESET_LINK: &str = "Invalid or expired reset link";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignupRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::Validation("All fields are required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        validate_new_password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleSignInRequest {
    #[serde(default)]
    pub credential: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

/// Snapshot taken when a session is issued; the client routes on it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub onboarding_complete: bool,
    pub review_count: i64,
    pub is_new_user: bool,
    pub state: AccountState,
    pub redirect_to: &'static str,
}

impl SessionUser {
    fn snapshot(user: &User, review_count: i64, is_new_user: bool) -> Self {
        let state = AccountState::derive(user.onboarding_complete, review_count);
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            onboarding_complete: user.onboarding_complete,
            review_count,
            is_new_user,
            state,
            redirect_to: state.landing_path(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            email: self.email.clone(),
            onboarding_complete: self.onboarding_complete,
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    google: Arc<dyn GoogleVerifier>,
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

impl AuthService {
    pub fn new(
        db: Database,
        google: Arc<dyn GoogleVerifier>,
        mailer: Arc<dyn Mailer>,
        app_url: String,
    ) -> Self {
        Self {
            db,
            google,
            mailer,
            app_url,
        }
    }

    pub async fn signup(&self, req: SignupRequest) -> AppResult<SessionUser> {
        req.validate()?;
        let email = normalize_email(&req.email);
        let password_hash = hash_password(&req.password)?;

        let mut tx = self.db.pool.begin().await?;

        if let Some(existing) = find_by_email(&mut tx, &email).await? {
            if existing.google_id.is_some() {
                return Err(AppError::BadRequest(GOOGLE_ACCOUNT_MESSAGE.to_string()));
            }
            return Err(AppError::BadRequest("Email already registered".to_string()));
        }

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash, onboarding_complete, created_at)
             VALUES (?, ?, ?, 0, ?)
             RETURNING *",
        )
        .bind(req.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if AppError::is_unique_violation(&e) {
                AppError::BadRequest("Email already registered".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        tx.commit().await?;

        let state = AccountState::Anonymous.apply(LifecycleEvent::Registered);
        info!(user_id = user.id, ?state, "User signed up");
        Ok(SessionUser::snapshot(&user, 0, true))
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<SessionUser> {
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::Validation("Email and password are required".to_string()));
        }
        let email = normalize_email(&req.email);

        let mut conn = self.db.pool.acquire().await?;
        let user = find_by_email(&mut conn, &email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let Some(password_hash) = user.password_hash.as_deref() else {
            return Err(AppError::Unauthorized(GOOGLE_ONLY_LOGIN_MESSAGE.to_string()));
        };
        if !verify_password(&req.password, password_hash)? {
            warn!(user_id = user.id, "Rejected login with wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let review_count = feedback_review_count(&mut conn, user.id).await?;
        info!(user_id = user.id, "User logged in");
        Ok(SessionUser::snapshot(&user, review_count, false))
    }

    /// Returning Google user, existing account by email (linked now), or a
    /// brand new account.
    pub async fn google_sign_in(&self, req: GoogleSignInRequest) -> AppResult<SessionUser> {
        if req.credential.trim().is_empty() {
            return Err(AppError::Validation("Missing credential".to_string()));
        }

        let identity = self.google.verify_id_token(req.credential.trim()).await?;
        let email = match identity.email.as_deref() {
            Some(email) if identity.email_verified && !email.trim().is_empty() => normalize_email(email),
            _ => return Err(AppError::Unauthorized("Invalid Google account".to_string())),
        };

        let mut tx = self.db.pool.begin().await?;
        let mut is_new_user = false;

        let by_google = sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_id = ?")
            .bind(&identity.google_id)
            .fetch_optional(&mut *tx)
            .await?;

        let user = match by_google {
            Some(user) => user,
            None => {
                match find_by_email(&mut tx, &email).await? {
                    Some(user) => {
                        info!(user_id = user.id, "Linking Google account to existing user");
                        sqlx::query_as::<_, User>("UPDATE users SET google_id = ? WHERE id = ? RETURNING *")
                            .bind(&identity.google_id)
                            .bind(user.id)
                            .fetch_one(&mut *tx)
                            .await?
                    }
                    None => {
                        let name = identity
                            .name
                            .as_deref()
                            .map(str::trim)
                            .filter(|name| !name.is_empty())
                            .map(str::to_string)
                            .unwrap_or_else(|| email_local_part(&email));

                        is_new_user = true;
                        sqlx::query_as::<_, User>(
                            "INSERT INTO users (name, email, google_id, onboarding_complete, created_at)
                             VALUES (?, ?, ?, 0, ?)
                             RETURNING *",
                        )
                        .bind(name)
                        .bind(&email)
                        .bind(&identity.google_id)
                        .bind(Utc::now())
                        .fetch_one(&mut *tx)
                        .await?
                    }
                }
            }
        };

        let review_count = feedback_review_count(&mut *tx, user.id).await?;
        tx.commit().await?;

        info!(user_id = user.id, is_new_user, "Google sign-in");
        Ok(SessionUser::snapshot(&user, review_count, is_new_user))
    }

    /// Always succeeds from the caller's point of view so the endpoint cannot
    /// be used to discover which accounts exist.
    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> AppResult<()> {
        if req.email.trim().is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }
        let email = normalize_email(&req.email);

        let mut conn = self.db.pool.acquire().await?;
        let user = find_by_email(&mut conn, &email).await?;
        drop(conn);

        let user = match user {
            Some(user) if !user.is_google_only() => user,
            _ => return Ok(()),
        };

        let reset = generate_reset_token(Utc::now());
        sqlx::query("UPDATE users SET reset_token = ?, reset_token_expiry = ? WHERE id = ?")
            .bind(&reset.token)
            .bind(reset.expires_at)
            .bind(user.id)
            .execute(&self.db.pool)
            .await?;

        let link = format!("{}/reset-password?token={}", self.app_url.trim_end_matches('/'), reset.token);
        let message = password_reset_email(&user.email, &user.name, &link);
        if let Err(e) = self.mailer.send(&message).await {
            warn!(user_id = user.id, "Failed to send password reset email: {}", e);
        } else {
            info!(user_id = user.id, "Password reset email sent");
        }

        Ok(())
    }

    pub async fn reset_password(&self, req: ResetPasswordRequest) -> AppResult<()> {
        if req.token.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::Validation("Token and password are required".to_string()));
        }
        validate_new_password(&req.password)?;

        let mut tx = self.db.pool.begin().await?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE reset_token = ?")
            .bind(req.token.trim())
            .fetch_optional(&mut *tx)
            .await?
            .filter(|user| user.reset_token_expiry.is_some_and(|expiry| expiry > Utc::now()))
            .ok_or_else(|| AppError::BadRequest(INVALID_RESET_LINK.to_string()))?;

        let password_hash = hash_password(&req.password)?;
        sqlx::query(
            "UPDATE users SET password_hash = ?, reset_token = NULL, reset_token_expiry = NULL WHERE id = ?",
        )
        .bind(&password_hash)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(user_id = user.id, "Password reset");
        Ok(())
    }
}

fn email_local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::google::DisabledGoogleVerifier;
    use crate::infrastructure::mailer::LogMailer;

    async fn service() -> AuthService {
        let db = Database::new_in_memory().await.unwrap();
        AuthService::new(
            db,
            Arc::new(DisabledGoogleVerifier),
            Arc::new(LogMailer),
            "http://localhost:3000".to_string(),
        )
    }

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            name: "Jo".to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
        }
    }

    #[test]
    fn test_signup_validation() {
        let mut req = signup("jo@example.com");
        assert!(req.validate().is_ok());

        req.password = "123".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        req.name = " ".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let auth = service().await;
        let created = auth.signup(signup("Jo@Example.com")).await.unwrap();
        assert!(created.is_new_user);
        assert_eq!(created.email, "jo@example.com");
        assert_eq!(created.redirect_to, "/onboarding");

        let session = auth
            .login(LoginRequest {
                email: "jo@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.id, created.id);
        assert!(!session.principal().onboarding_complete);
    }

    #[tokio::test]
    async fn test_duplicate_signup_and_bad_password() {
        let auth = service().await;
        auth.signup(signup("jo@example.com")).await.unwrap();

        let err = auth.signup(signup("jo@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Email already registered"));

        let err = auth
            .login(LoginRequest {
                email: "jo@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_google_disabled() {
        let auth = service().await;
        let err = auth
            .google_sign_in(GoogleSignInRequest {
                credential: "id-token".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_reset_password_rejects_unknown_token() {
        let auth = service().await;
        let err = auth
            .reset_password(ResetPasswordRequest {
                token: "nope".to_string(),
                password: "another-pass".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == INVALID_RESET_LINK));
    }

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("kim@example.com"), "kim");
    }
}
