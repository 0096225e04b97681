use serde::{Deserialize, Serialize};
use std::env;

/// Secret used when `JWT_SECRET` is not set. Only suitable for local development.
pub const DEV_JWT_SECRET: &str = "parentpick-secret-key-change-in-production";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub google: GoogleConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prebuilt frontend bundle served behind the session gate
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub using_dev_secret: bool,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
    pub app_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").ok().filter(|s| !s.is_empty());
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/parentpick.db".to_string()),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
                static_dir: env::var("STATIC_DIR").ok().filter(|s| !s.is_empty()),
            },
            auth: AuthConfig {
                using_dev_secret: jwt_secret.is_none(),
                jwt_secret: jwt_secret.unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
                secure_cookies: production,
            },
            google: GoogleConfig {
                client_id: env::var("GOOGLE_CLIENT_ID").ok().filter(|s| !s.is_empty()),
            },
            mail: MailConfig {
                resend_api_key: env::var("RESEND_API_KEY").ok().filter(|s| !s.is_empty()),
                from: env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "ParentPick <onboarding@resend.dev>".to_string()),
                app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
        })
    }

    /// Configuration for tests: in-memory database, dev secret, no outbound services.
    pub fn for_tests() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                static_dir: None,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-that-is-at-least-32-characters-long".to_string(),
                using_dev_secret: false,
                secure_cookies: false,
            },
            google: GoogleConfig { client_id: None },
            mail: MailConfig {
                resend_api_key: None,
                from: "ParentPick <test@example.com>".to_string(),
                app_url: "http://localhost:3000".to_string(),
            },
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
