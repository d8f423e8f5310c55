use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("failed to build email message: {0}")]
    MessageBuild(String),
    #[error("failed to send email: {0}")]
    SendFailed(String),
    #[error("mail configuration error: {0}")]
    Config(String),
}

/// Delivery of one-time passcodes.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to_email: &str, otp: &str) -> Result<(), MailError>;
}

/// Logs the code instead of sending it; used when SMTP is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, to_email: &str, otp: &str) -> Result<(), MailError> {
        info!(to = %to_email, %otp, "otp mail (smtp disabled)");
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let builder = match cfg.encryption.to_lowercase().as_str() {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
                .map_err(|e| MailError::Config(format!("smtp relay: {e}")))?,
            "starttls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
                .map_err(|e| MailError::Config(format!("smtp starttls: {e}")))?,
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host),
            other => {
                return Err(MailError::Config(format!(
                    "unknown SMTP_ENCRYPTION {other:?}; use tls, starttls or none"
                )))
            }
        };
        let transport = builder.port(cfg.port).credentials(credentials).build();

        Ok(Self {
            transport,
            from: format!("{} <{}>", cfg.from_name, cfg.from_email),
        })
    }
}

fn otp_body(otp: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 480px; margin: 0 auto;">
  <h2 style="color: #ff4d2d;">QuickBite password reset</h2>
  <p>Your one-time code is <b style="font-size: 20px; letter-spacing: 2px;">{otp}</b>.</p>
  <p style="color: #666;">It expires in a few minutes. If you did not ask to reset your password, ignore this email.</p>
</div>"#
    )
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, to_email: &str, otp: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| MailError::MessageBuild(format!("invalid from address: {e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| MailError::MessageBuild(format!("invalid to address: {e}")))?)
            .subject("Reset your QuickBite password")
            .header(ContentType::TEXT_HTML)
            .body(otp_body(otp))
            .map_err(|e| MailError::MessageBuild(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::SendFailed(e.to_string()))?;
        info!(to = %to_email, "otp mail sent");
        Ok(())
    }
}
