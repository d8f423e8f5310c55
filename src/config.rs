use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

/// Attributes of the `token` session cookie.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub encryption: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub otp_ttl_minutes: i64,
    pub frontend_origin: Option<String>,
    /// `APP_ENV=production`.
    pub production: bool,
    /// `None` falls back to logging OTP mails instead of sending them.
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "quickbite".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "quickbite-users".into()),
            ttl_days: parse_env("SESSION_TTL_DAYS").unwrap_or(7),
        };

        let production = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let cookie = CookieConfig {
            name: "token".into(),
            secure: parse_env("COOKIE_SECURE").unwrap_or(production),
        };
        if production && !cookie.secure {
            tracing::warn!("COOKIE_SECURE=false in production; session cookie may travel over plaintext");
        }

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: parse_env("SMTP_PORT").unwrap_or(587),
                username: std::env::var("SMTP_USERNAME")?,
                password: std::env::var("SMTP_PASSWORD")?,
                from_email: std::env::var("SMTP_FROM_EMAIL")?,
                from_name: std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "QuickBite".into()),
                encryption: std::env::var("SMTP_ENCRYPTION").unwrap_or_else(|_| "starttls".into()),
            }),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            jwt,
            cookie,
            otp_ttl_minutes: parse_env("OTP_TTL_MINUTES").unwrap_or(5),
            frontend_origin: std::env::var("FRONTEND_ORIGIN").ok(),
            production,
            smtp,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
