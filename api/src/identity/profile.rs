use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    App,
    error::{ApiRequestError, AppError},
    identity::{
        AuthUser,
        models::profile::{Profile, PublicProfile, UpdateProfile},
        password::normalize_username,
    },
    schema::{posts, profiles},
    storage::{ImageKind, read_image_field},
};

pub const MAX_BIO_LENGTH: usize = 500;

/// The logged in user's own profile
#[derive(Serialize, Debug)]
pub struct Me {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<Profile> for Me {
    fn from(p: Profile) -> Self {
        Me {
            id: p.id,
            email: p.email,
            username: p.username,
            avatar_url: p.avatar_url,
            bio: p.bio,
            created_at: p.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    profile: PublicProfile,
    posts_count: i64,
}

#[derive(Deserialize, Default)]
pub struct ProfilePatch {
    username: Option<String>,
    bio: Option<String>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("Bio too long (max {MAX_BIO_LENGTH} characters)")]
pub struct BioTooLong;

impl ApiRequestError for BioTooLong {}

impl ProfilePatch {
    fn into_changeset(self) -> Result<UpdateProfile, AppError> {
        let username = self
            .username
            .map(|u| normalize_username(&u))
            .transpose()?;

        // An empty bio clears it
        let bio = match self.bio.map(|b| b.trim().to_string()) {
            Some(b) if b.chars().count() > MAX_BIO_LENGTH => return Err(BioTooLong.into()),
            Some(b) if b.is_empty() => Some(None),
            other => other.map(Some),
        };

        Ok(UpdateProfile {
            username,
            bio,
            avatar_url: None,
            updated_at: Some(chrono::Utc::now().naive_utc()),
        })
    }
}

pub async fn get_profile(
    State(ctx): State<App>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let profile = profiles::table
        .filter(profiles::username.eq(username.to_lowercase()))
        .select(PublicProfile::as_select())
        .first::<PublicProfile>(&mut conn)
        .await?;

    let posts_count = posts::table
        .filter(posts::author_id.eq(profile.id))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;

    Ok(Json(ProfileResponse {
        profile,
        posts_count,
    }))
}

#[axum::debug_handler]
pub async fn update_me(
    State(ctx): State<App>,
    AuthUser(me): AuthUser,
    crate::json::Json(patch): crate::json::Json<ProfilePatch>,
) -> Result<Json<Me>, AppError> {
    let changeset = patch.into_changeset()?;

    let mut conn = ctx.diesel.get().await?;

    let profile = diesel::update(profiles::table.find(me.id))
        .set(&changeset)
        .returning(Profile::as_returning())
        .get_result::<Profile>(&mut conn)
        .await?;

    Ok(Json(Me::from(profile)))
}

#[axum::debug_handler]
pub async fn upload_avatar(
    State(ctx): State<App>,
    AuthUser(me): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<Me>, AppError> {
    let bytes = read_image_field(&mut multipart).await?;

    let pool = ctx.diesel.clone();
    let profile = ctx
        .images
        .upload_and_record(ImageKind::Avatar, bytes, |avatar_url| async move {
            let mut conn = pool.get().await?;

            let profile = diesel::update(profiles::table.find(me.id))
                .set(&UpdateProfile {
                    avatar_url: Some(Some(avatar_url)),
                    updated_at: Some(chrono::Utc::now().naive_utc()),
                    ..Default::default()
                })
                .returning(Profile::as_returning())
                .get_result::<Profile>(&mut conn)
                .await?;

            Ok::<_, AppError>(profile)
        })
        .await?;

    if let Some(old) = me.avatar_url {
        ctx.images.delete_by_url(&old).await;
    }

    Ok(Json(Me::from(profile)))
}
