use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    auth::{
        otp::{OtpSource, RandomOtp},
        password::{Argon2Hasher, PasswordHasher},
        repo::{PgUserStore, UserStore},
    },
    chatbot::repo::{PgCatalog, ProductCatalog},
    clock::{Clock, SystemClock},
    config::AppConfig,
    mail::{LogMailer, Mailer, SmtpMailer},
};

/// SMTP when configured; outside production, a mailer that only logs codes.
fn select_mailer(config: &AppConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(smtp).context("configure smtp")?)),
        None if config.production => {
            tracing::error!("SMTP_HOST not set in production");
            anyhow::bail!("SMTP_HOST must be set when APP_ENV=production")
        }
        None => {
            tracing::warn!("SMTP_HOST not set; OTP codes will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub mailer: Arc<dyn Mailer>,
    pub otp: Arc<dyn OtpSource>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and wires the production ports.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let mailer = select_mailer(&config)?;

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self {
            users: Arc::new(PgUserStore::new(db.clone())),
            catalog: Arc::new(PgCatalog::new(db)),
            hasher: Arc::new(Argon2Hasher),
            mailer,
            otp: Arc::new(RandomOtp),
            clock: Arc::new(SystemClock),
            config,
        })
    }
}
