use crate::{db_helpers::get_user_by_id, errors::RequestError, AppState};
use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::FromRequestParts;
use axum::http::{header::COOKIE, request::Parts, HeaderMap};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

pub const SESSION_COOKIE: &str = "yatube_session";

#[derive(Debug, Serialize, Deserialize)]
struct AuthClaim {
    id: i64,
    exp: i64,
}

/// The signed-in account behind a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Resolves the session cookie, if any. Broken, expired, or orphaned
/// sessions are treated as anonymous.
pub struct MaybeUser(pub Option<AuthUser>);

/// Like [`MaybeUser`] but anonymous requests are sent to the login page.
pub struct RequireUser(pub AuthUser);

impl MaybeUser {
    pub fn get_id(&self) -> Option<i64> {
        self.0.as_ref().map(|a| a.id)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let state = match parts.extensions.get::<AppState>() {
            Some(state) => state.clone(),
            None => return Err(RequestError::ServerError),
        };

        let token = match session_token(&parts.headers) {
            Some(token) => token,
            None => return Ok(MaybeUser(None)),
        };

        let id = match verify_jwt_token(&token, &state.config.jwt_secret) {
            Ok(id) => id,
            Err(e) => {
                debug!("Ignoring session cookie: {}", e);
                return Ok(MaybeUser(None));
            }
        };

        let user = get_user_by_id(&state.pool, id).await?;
        Ok(MaybeUser(user.map(|user| AuthUser {
            id: user.id,
            username: user.username,
        })))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(RequireUser(user)),
            MaybeUser(None) => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|p| p.as_str().to_owned())
                    .unwrap_or_else(|| parts.uri.path().to_owned());
                Err(RequestError::LoginRequired { next })
            }
        }
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_owned())
        .filter(|token| !token.is_empty())
}

pub fn session_cookie(token: &str, lifetime: time::Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        lifetime.whole_seconds()
    )
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn get_jwt_token(id: i64, secret: &str, lifetime: time::Duration) -> Result<String> {
    let expiry_date = OffsetDateTime::now_utc() + lifetime;
    let claim = AuthClaim {
        id,
        exp: expiry_date.unix_timestamp(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claim,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_ref()),
    )
    .context("Failed to generate jwt token")
}

pub fn verify_jwt_token(token: &str, secret: &str) -> Result<i64> {
    let token_data = jsonwebtoken::decode::<AuthClaim>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_ref()),
        &jsonwebtoken::Validation::default(),
    )
    .context("Invalid token")?;
    let claim = token_data.claims;
    if claim.exp < OffsetDateTime::now_utc().unix_timestamp() {
        anyhow::bail!("Token expired");
    }
    Ok(claim.id)
}

pub async fn verify_password_argon2(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Failed to verify password"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}
