use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{
    App,
    error::{ApiRequestError, AppError},
    schema::{profiles, sessions},
};

use self::models::profile::Profile;

pub mod models;
pub mod password;
pub mod profile;
pub mod routes;

pub const COOKIE_NAME: &str = "auth_token";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AuthenticationError {
    #[error("Authentication required, but no cookie `{COOKIE_NAME}` found in headers.")]
    NoCookie,

    #[error(
        "Unauthorized, please check if you're logged in by refreshing the \
         page. This could be due to an expired session or token has became invalid."
    )]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,
}

impl ApiRequestError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

pub fn session_token(parts: &Parts) -> Option<String> {
    let jar = axum_extra::extract::cookie::CookieJar::from_headers(&parts.headers);
    jar.get(COOKIE_NAME).map(|t| t.value().to_owned())
}

/// The viewer if they're logged in. Never rejects because of a missing or
/// stale session, only because of server errors.
pub struct MaybeAuthUser(pub Result<Profile, AuthenticationError>);

impl MaybeAuthUser {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().ok().map(|p| p.id)
    }
}

impl FromRequestParts<App> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let Some(session_token) = session_token(parts) else {
            return Ok(MaybeAuthUser(Err(AuthenticationError::NoCookie)));
        };

        let mut conn = state.diesel.get().await?;
        let now = chrono::Utc::now().naive_utc();

        let profile = sessions::table
            .inner_join(profiles::table)
            .filter(sessions::token.eq(&session_token))
            .filter(sessions::active.eq(true))
            .filter(sessions::expires_at.gt(now))
            .filter(sessions::issued_at.le(now))
            .select(Profile::as_select())
            .first::<Profile>(&mut conn)
            .await
            .optional()?;

        Ok(MaybeAuthUser(
            profile.ok_or(AuthenticationError::Unauthorized),
        ))
    }
}

/// Guards routes that need a logged in user
pub struct AuthUser(pub Profile);

impl FromRequestParts<App> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(auth_user) = MaybeAuthUser::from_request_parts(parts, state).await?;

        Ok(AuthUser(auth_user?))
    }
}
