// Transactional email - password reset links

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::error::{AppError, AppResult};

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let response = self
            .client
            .post(RESEND_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": message.to,
                "subject": message.subject,
                "html": message.html,
            }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Email provider returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Development mailer: nothing leaves the process, the message is logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        info!(to = %message.to, subject = %message.subject, "Email delivery disabled; logging message");
        tracing::debug!("{}", message.html);
        Ok(())
    }
}

pub fn password_reset_email(to: &str, name: &str, reset_link: &str) -> EmailMessage {
    let html = format!(
        r#"<div style="font-family: sans-serif; max-width: 480px; margin: 0 auto;">
  <h2 style="color: #0d9488;">ParentPick</h2>
  <p>Hi {name},</p>
  <p>You requested a password reset. Click the button below to set a new password:</p>
  <a href="{link}" style="display: inline-block; background: #0d9488; color: white; padding: 12px 24px; border-radius: 8px; text-decoration: none; font-weight: 600;">Reset Password</a>
  <p style="color: #64748b; font-size: 14px; margin-top: 24px;">This link expires in 1 hour. If you didn't request this, you can safely ignore this email.</p>
</div>"#,
        name = escape_html(name),
        link = reset_link,
    );

    EmailMessage {
        to: to.to_string(),
        subject: "Reset your ParentPick password".to_string(),
        html,
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_email_contents() {
        let message = password_reset_email(
            "p@example.com",
            "<Pat>",
            "http://localhost:3000/reset-password?token=abc",
        );
        assert_eq!(message.to, "p@example.com");
        assert!(message.html.contains("reset-password?token=abc"));
        assert!(message.html.contains("&lt;Pat&gt;"));
        assert!(!message.html.contains("<Pat>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"Tom & "Jerry" <b>O'Neil</b>"#),
            "Tom &amp; &quot;Jerry&quot; &lt;b&gt;O&#39;Neil&lt;/b&gt;"
        );
        // Already-escaped input is escaped again, not passed through
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        let message = password_reset_email("a@b.c", "A", "http://x");
        assert!(LogMailer.send(&message).await.is_ok());
    }
}
