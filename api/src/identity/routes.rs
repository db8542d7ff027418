use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use time::Duration;

use crate::{
    App,
    error::AppError,
    identity::models::{
        profile::{NewProfile, Profile},
        session::NewSession,
    },
    schema::{profiles, sessions},
};

use super::{
    AuthUser, AuthenticationError, COOKIE_NAME, MaybeAuthUser,
    password::{
        hash_password, normalize_email, normalize_username, validate_password, verify_password,
    },
    profile::{Me, get_profile, update_me, upload_avatar},
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(handle_whoami))
        .route("/auth/is_auth", get(is_auth))
        .route("/me", patch(update_me))
        .route("/me/avatar", post(upload_avatar))
        .route("/profiles/{username}", get(get_profile))
}

#[derive(Deserialize)]
pub struct SignupRequest {
    email: String,
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(serde::Serialize)]
struct IsAuth {
    is_auth: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

fn session_cookie(token: String, lifetime: std::time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .expires(time::OffsetDateTime::now_utc() + lifetime)
        .path("/")
        .build()
}

async fn open_session(
    ctx: &App,
    conn: &mut AsyncPgConnection,
    profile_id: i32,
) -> Result<CookieJar, AppError> {
    let session = NewSession::new_with_profile_id(profile_id, ctx.config.session_ttl_days);

    diesel::insert_into(sessions::table)
        .values(&session)
        .execute(conn)
        .await?;

    let cookie = session_cookie(
        session.token.clone(),
        session.lifetime(),
        !ctx.config.is_dev(),
    );
    Ok(CookieJar::new().add(cookie))
}

#[axum::debug_handler]
pub async fn signup(
    State(ctx): State<App>,
    crate::json::Json(request): crate::json::Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<Me>), AppError> {
    let email = normalize_email(&request.email)?;
    let username = normalize_username(&request.username)?;
    validate_password(&request.password)?;

    let password_hash = hash_password(request.password).await?;

    let mut conn = ctx.diesel.get().await?;

    let profile = diesel::insert_into(profiles::table)
        .values(&NewProfile {
            email,
            username,
            password_hash,
        })
        .returning(Profile::as_returning())
        .get_result::<Profile>(&mut conn)
        .await?;

    let jar = open_session(&ctx, &mut conn, profile.id).await?;

    tracing::info!(profile_id = profile.id, "New account created");

    Ok((StatusCode::CREATED, jar, Json(Me::from(profile))))
}

#[axum::debug_handler]
pub async fn login(
    State(ctx): State<App>,
    crate::json::Json(request): crate::json::Json<LoginRequest>,
) -> Result<(CookieJar, Json<Me>), AppError> {
    // Malformed emails can't belong to an account, don't leak the difference
    let email =
        normalize_email(&request.email).map_err(|_| AuthenticationError::InvalidCredentials)?;

    let mut conn = ctx.diesel.get().await?;

    let profile = profiles::table
        .filter(profiles::email.eq(&email))
        .select(Profile::as_select())
        .first::<Profile>(&mut conn)
        .await
        .optional()?;

    // Unknown emails go through a full verification too
    let stored_hash = profile.as_ref().map(|p| p.password_hash.clone());
    let matches = verify_password(request.password, stored_hash).await?;

    let profile = match profile {
        Some(profile) if matches => profile,
        Some(profile) => {
            tracing::info!(profile_id = profile.id, "Failed login attempt");
            return Err(AuthenticationError::InvalidCredentials.into());
        }
        None => return Err(AuthenticationError::InvalidCredentials.into()),
    };

    let jar = open_session(&ctx, &mut conn, profile.id).await?;

    Ok((jar, Json(Me::from(profile))))
}

#[axum::debug_handler]
pub async fn logout(State(ctx): State<App>, jar: CookieJar) -> Result<CookieJar, AppError> {
    if let Some(token) = jar.get(COOKIE_NAME).map(|c| c.value().to_owned()) {
        let mut conn = ctx.diesel.get().await?;

        diesel::update(sessions::table.filter(sessions::token.eq(&token)))
            .set((
                sessions::active.eq(false),
                sessions::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .await?;
    }

    let auth_cookie = Cookie::build(COOKIE_NAME)
        .secure(!ctx.config.is_dev())
        .http_only(true)
        .max_age(Duration::ZERO)
        .path("/");

    Ok(CookieJar::new().add(auth_cookie))
}

async fn handle_whoami(AuthUser(profile): AuthUser) -> Json<Me> {
    Json(Me::from(profile))
}

async fn is_auth(MaybeAuthUser(profile): MaybeAuthUser) -> Json<IsAuth> {
    Json(IsAuth {
        is_auth: profile.is_ok(),
        id: profile.as_ref().ok().map(|p| p.id),
        username: profile.ok().map(|p| p.username),
    })
}
