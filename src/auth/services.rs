use std::sync::Arc;

use axum::extract::FromRef;
use time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        GoogleAuthRequest, GoogleSignInRequest, ResetPasswordRequest, SendOtpRequest,
        SignInRequest, SignUpRequest, VerifyOtpRequest,
    },
    errors::AuthError,
    otp::{codes_match, OtpSource},
    password::PasswordHasher,
    repo::UserStore,
    repo_types::{NewUser, User},
    validation::{
        check_email, check_federated_name, check_full_name, check_mobile,
        check_password_strength, normalize_email, present,
    },
};
use crate::{clock::Clock, mail::Mailer, state::AppState};

/// Account lifecycle: signup, signin, OTP reset and Google flows.
///
/// Every operation validates its input before touching the store. Session
/// issuance is left to the caller, which gets the affected `User` back.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    mailer: Arc<dyn Mailer>,
    otp: Arc<dyn OtpSource>,
    clock: Arc<dyn Clock>,
    otp_ttl: Duration,
}

impl FromRef<AppState> for AccountService {
    fn from_ref(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            hasher: state.hasher.clone(),
            mailer: state.mailer.clone(),
            otp: state.otp.clone(),
            clock: state.clock.clone(),
            otp_ttl: Duration::minutes(state.config.otp_ttl_minutes),
        }
    }
}

impl AccountService {
    async fn find(&self, email: &str) -> Result<User, AuthError> {
        self.users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(AuthError::no_account)
    }

    #[instrument(skip_all)]
    pub async fn register(&self, req: SignUpRequest) -> Result<User, AuthError> {
        let (Some(full_name), Some(email), Some(password), Some(mobile), Some(role)) = (
            present(&req.full_name),
            present(&req.email),
            present(&req.password),
            present(&req.mobile),
            present(&req.role),
        ) else {
            return Err(AuthError::validation("All fields are required"));
        };

        check_full_name(full_name)?;
        check_email(email)?;
        check_mobile(mobile)?;
        check_password_strength(password)?;

        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(%email, "email already registered");
            return Err(AuthError::DuplicateAccount);
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self
            .users
            .create(NewUser {
                full_name: full_name.trim().to_string(),
                email,
                mobile: mobile.to_string(),
                role: role.to_string(),
                password_hash: Some(password_hash),
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    #[instrument(skip_all)]
    pub async fn login(&self, req: SignInRequest) -> Result<User, AuthError> {
        let (Some(email), Some(password)) = (present(&req.email), present(&req.password)) else {
            return Err(AuthError::validation("Email and password are required"));
        };
        check_email(email)?;

        let user = self.find(email).await?;
        let ok = match user.password_hash.as_deref() {
            Some(hash) => self.hasher.verify(password, hash)?,
            None => false,
        };
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::Unauthorized);
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    #[instrument(skip_all)]
    pub async fn request_otp(&self, req: SendOtpRequest) -> Result<(), AuthError> {
        let Some(email) = present(&req.email) else {
            return Err(AuthError::validation("Email is required"));
        };
        check_email(email)?;

        let user = self.find(email).await?;
        let otp = self.otp.generate();
        let expires = self.clock.now() + self.otp_ttl;
        self.users.store_otp(user.id, &otp, expires).await?;
        self.mailer.send_otp(&user.email, &otp).await?;

        info!(user_id = %user.id, "otp issued");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn verify_otp(&self, req: VerifyOtpRequest) -> Result<(), AuthError> {
        let (Some(email), Some(otp)) = (present(&req.email), present(&req.otp)) else {
            return Err(AuthError::validation("Email and OTP are required"));
        };
        check_email(email)?;

        let user = self.find(email).await?;
        // no stored code falls through to InvalidOtp
        let matches = user
            .reset_otp
            .as_deref()
            .is_some_and(|stored| codes_match(stored, otp));
        if !matches {
            warn!(user_id = %user.id, "otp mismatch");
            return Err(AuthError::InvalidOtp);
        }
        let live = user.otp_expires.is_some_and(|exp| exp >= self.clock.now());
        if !live {
            warn!(user_id = %user.id, "otp expired");
            return Err(AuthError::Expired);
        }

        self.users.mark_otp_verified(user.id).await?;
        info!(user_id = %user.id, "otp verified");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AuthError> {
        let (Some(email), Some(new_password)) = (present(&req.email), present(&req.new_password))
        else {
            return Err(AuthError::validation("Email and new password are required"));
        };
        check_email(email)?;
        check_password_strength(new_password)?;

        let user = self.find(email).await?;
        if !user.is_otp_verified {
            warn!(user_id = %user.id, "reset without verified otp");
            return Err(AuthError::OtpNotVerified);
        }

        let hash = self.hasher.hash(new_password)?;
        self.users.reset_password(user.id, &hash).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    /// Google signup. The provider vouches for name and email; only the
    /// locally collected mobile number gets the full check.
    #[instrument(skip_all)]
    pub async fn federated_upsert(&self, req: GoogleAuthRequest) -> Result<User, AuthError> {
        let (Some(full_name), Some(email), Some(mobile), Some(role)) = (
            present(&req.full_name),
            present(&req.email),
            present(&req.mobile),
            present(&req.role),
        ) else {
            return Err(AuthError::validation("All fields are required"));
        };
        check_mobile(mobile)?;
        check_federated_name(full_name)?;

        let email = normalize_email(email);
        let user = match self.users.find_by_email(&email).await? {
            Some(existing) => {
                let user = self.users.update_contact(existing.id, mobile, role).await?;
                info!(user_id = %user.id, "google user updated");
                user
            }
            None => {
                let user = self
                    .users
                    .create(NewUser {
                        full_name: full_name.trim().to_string(),
                        email,
                        mobile: mobile.to_string(),
                        role: role.to_string(),
                        password_hash: None,
                    })
                    .await?;
                info!(user_id = %user.id, "google user created");
                user
            }
        };
        Ok(user)
    }

    #[instrument(skip_all)]
    pub async fn federated_sign_in(&self, req: GoogleSignInRequest) -> Result<User, AuthError> {
        let Some(email) = present(&req.email) else {
            return Err(AuthError::validation("Email is required"));
        };
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| {
                AuthError::NotFound(
                    "No account found with this Google account. Please sign up first.".into(),
                )
            })?;
        info!(user_id = %user.id, "google user signed in");
        Ok(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::SessionRequired)
    }
}
