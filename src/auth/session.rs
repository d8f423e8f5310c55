use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{errors::AuthError, jwt::JwtKeys};
use crate::{config::CookieConfig, state::AppState};

/// Mints session tokens and carries them in the session cookie.
#[derive(Clone)]
pub struct SessionIssuer {
    keys: JwtKeys,
    cookie: CookieConfig,
}

impl FromRef<AppState> for SessionIssuer {
    fn from_ref(state: &AppState) -> Self {
        Self::new(JwtKeys::from_ref(state), state.config.cookie.clone())
    }
}

impl SessionIssuer {
    pub fn new(keys: JwtKeys, cookie: CookieConfig) -> Self {
        Self { keys, cookie }
    }

    /// Signs a token for `user_id` and adds it to the jar.
    pub fn issue(&self, jar: CookieJar, user_id: Uuid) -> Result<CookieJar, AuthError> {
        let token = self.keys.sign(user_id)?;
        let max_age = time::Duration::seconds(self.keys.ttl.as_secs() as i64);
        let cookie = Cookie::build((self.cookie.name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.cookie.secure)
            .max_age(max_age)
            .build();
        debug!(user_id = %user_id, "session issued");
        Ok(jar.add(cookie))
    }

    pub fn revoke(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((self.cookie.name.clone(), "")).path("/"))
    }

    /// Resolves the session cookie to a user id, if it holds a valid token.
    pub fn authenticate(&self, jar: &CookieJar) -> Option<Uuid> {
        let token = jar.get(&self.cookie.name)?;
        match self.keys.verify(token.value()) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                warn!(error = %e, "invalid or expired session token");
                None
            }
        }
    }
}

/// Extracts the signed-in user's id from the session cookie.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        SessionIssuer::from_ref(state)
            .authenticate(&jar)
            .map(AuthUser)
            .ok_or(AuthError::SessionRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn issuer(secure: bool) -> SessionIssuer {
        let keys = JwtKeys::from(&JwtConfig {
            secret: "test".into(),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_days: 7,
        });
        SessionIssuer::new(
            keys,
            CookieConfig {
                name: "token".into(),
                secure,
            },
        )
    }

    #[test]
    fn issued_cookie_is_http_only_strict_and_lasts_seven_days() {
        let jar = issuer(false).issue(CookieJar::new(), Uuid::new_v4()).unwrap();
        let cookie = jar.get("token").expect("token cookie");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn secure_flag_follows_config() {
        let jar = issuer(true).issue(CookieJar::new(), Uuid::new_v4()).unwrap();
        assert_eq!(jar.get("token").unwrap().secure(), Some(true));
    }

    #[test]
    fn authenticate_roundtrips_the_user_id() {
        let issuer = issuer(false);
        let user_id = Uuid::new_v4();
        let jar = issuer.issue(CookieJar::new(), user_id).unwrap();
        assert_eq!(issuer.authenticate(&jar), Some(user_id));
    }

    #[test]
    fn authenticate_rejects_garbage_and_missing_cookie() {
        let issuer = issuer(false);
        assert_eq!(issuer.authenticate(&CookieJar::new()), None);
        let jar = CookieJar::new().add(Cookie::new("token", "not-a-jwt"));
        assert_eq!(issuer.authenticate(&jar), None);
    }

    #[test]
    fn revoke_drops_the_cookie() {
        let issuer = issuer(false);
        let jar = issuer.issue(CookieJar::new(), Uuid::new_v4()).unwrap();
        let jar = issuer.revoke(jar);
        assert!(jar.get("token").is_none());
    }
}
