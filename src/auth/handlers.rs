use axum::{
    async_trait,
    extract::{FromRef, FromRequest, Request, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            GoogleAuthRequest, GoogleSignInRequest, MessageResponse, ResetPasswordRequest,
            SendOtpRequest, SignInRequest, SignUpRequest, UserProfile, VerifyOtpRequest,
        },
        errors::AuthError,
        services::AccountService,
        session::{AuthUser, SessionIssuer},
    },
    state::AppState,
};

type SessionReply = (StatusCode, CookieJar, Json<UserProfile>);

/// `Json` whose rejection is reported like any other validation failure.
pub struct AuthJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AuthJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .route("/auth/otp/send", post(send_otp))
        .route("/auth/otp/verify", post(verify_otp))
        .route("/auth/password/reset", post(reset_password))
        .route("/auth/google", post(google_auth))
        .route("/auth/google/signin", post(google_sign_in))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, jar, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    AuthJson(payload): AuthJson<SignUpRequest>,
) -> Result<SessionReply, AuthError> {
    let user = AccountService::from_ref(&state).register(payload).await?;
    let jar = SessionIssuer::from_ref(&state).issue(jar, user.id)?;
    Ok((StatusCode::CREATED, jar, Json(user.into())))
}

#[instrument(skip(state, jar, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    AuthJson(payload): AuthJson<SignInRequest>,
) -> Result<SessionReply, AuthError> {
    let user = AccountService::from_ref(&state).login(payload).await?;
    let jar = SessionIssuer::from_ref(&state).issue(jar, user.id)?;
    Ok((StatusCode::OK, jar, Json(user.into())))
}

#[instrument(skip_all)]
pub async fn sign_out(
    State(session): State<SessionIssuer>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    info!("user signed out");
    (
        session.revoke(jar),
        Json(MessageResponse::new("Log out successfully")),
    )
}

#[instrument(skip(accounts, payload))]
pub async fn send_otp(
    State(accounts): State<AccountService>,
    AuthJson(payload): AuthJson<SendOtpRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    accounts.request_otp(payload).await?;
    Ok(Json(MessageResponse::new("OTP sent successfully to your email")))
}

#[instrument(skip(accounts, payload))]
pub async fn verify_otp(
    State(accounts): State<AccountService>,
    AuthJson(payload): AuthJson<VerifyOtpRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    accounts.verify_otp(payload).await?;
    Ok(Json(MessageResponse::new("OTP verified successfully")))
}

#[instrument(skip(accounts, payload))]
pub async fn reset_password(
    State(accounts): State<AccountService>,
    AuthJson(payload): AuthJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    accounts.reset_password(payload).await?;
    Ok(Json(MessageResponse::new(
        "Password reset successfully. You can now login with your new password",
    )))
}

#[instrument(skip(state, jar, payload))]
pub async fn google_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    AuthJson(payload): AuthJson<GoogleAuthRequest>,
) -> Result<SessionReply, AuthError> {
    let user = AccountService::from_ref(&state)
        .federated_upsert(payload)
        .await?;
    let jar = SessionIssuer::from_ref(&state).issue(jar, user.id)?;
    Ok((StatusCode::OK, jar, Json(user.into())))
}

#[instrument(skip(state, jar, payload))]
pub async fn google_sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    AuthJson(payload): AuthJson<GoogleSignInRequest>,
) -> Result<SessionReply, AuthError> {
    let user = AccountService::from_ref(&state)
        .federated_sign_in(payload)
        .await?;
    let jar = SessionIssuer::from_ref(&state).issue(jar, user.id)?;
    Ok((StatusCode::OK, jar, Json(user.into())))
}

#[instrument(skip(accounts))]
pub async fn get_me(
    State(accounts): State<AccountService>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, AuthError> {
    let user = accounts.profile(user_id).await?;
    Ok(Json(user.into()))
}
