use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    config::Config,
    database::Database,
    error::AppResult,
    infrastructure::{
        cookies::session_cookie,
        google::{DisabledGoogleVerifier, GoogleVerifier, TokenInfoVerifier},
        mailer::{LogMailer, Mailer, ResendMailer},
        middleware::HasTokenCodec,
        token_codec::{Principal, TokenCodec},
    },
};
use axum::http::HeaderValue;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub tokens: TokenCodec,
    pub google: Arc<dyn GoogleVerifier>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize database
        let db = Database::new(&config.database.url).await?;
        db.init().await?;

        if config.auth.using_dev_secret {
            warn!("JWT_SECRET is not set; signing sessions with the development secret");
        }

        let google: Arc<dyn GoogleVerifier> = match &config.google.client_id {
            Some(client_id) => Arc::new(TokenInfoVerifier::new(client_id.clone())),
            None => {
                info!("GOOGLE_CLIENT_ID is not set; Google sign-in disabled");
                Arc::new(DisabledGoogleVerifier)
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.mail.resend_api_key {
            Some(api_key) => Arc::new(ResendMailer::new(api_key.clone(), config.mail.from.clone())),
            None => {
                info!("RESEND_API_KEY is not set; reset emails will be logged");
                Arc::new(LogMailer)
            }
        };

        Ok(Self::from_parts(db, config, google, mailer))
    }

    /// Assemble state from already-built collaborators (tests swap in fakes here).
    pub fn from_parts(
        db: Database,
        config: Config,
        google: Arc<dyn GoogleVerifier>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let tokens = TokenCodec::new(&config.auth.jwt_secret);
        Self {
            db,
            config,
            tokens,
            google,
            mailer,
        }
    }

    /// Sign a session for `principal` and wrap it in a Set-Cookie value.
    pub fn issue_session(&self, principal: &Principal) -> AppResult<HeaderValue> {
        let token = self.tokens.sign(principal)?;
        session_cookie(&token, self.config.auth.secure_cookies)
    }
}

impl HasTokenCodec for AppState {
    fn token_codec(&self) -> &TokenCodec {
        &self.tokens
    }
}
