use axum::{
    Json,
    extract::{Path, State},
};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::{
    App,
    blog::models::blog_post_like::NewBlogPostLike,
    error::AppError,
    identity::AuthUser,
    schema::likes,
};

use super::ensure_post_exists;

#[derive(Serialize, Debug)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}

/// Removes the like if there was one, adds it otherwise. Returns whether the
/// post is liked afterwards.
async fn toggle(
    conn: &mut AsyncPgConnection,
    post_id: i32,
    profile_id: i32,
) -> Result<bool, AppError> {
    let removed = diesel::delete(
        likes::table
            .filter(likes::post_id.eq(post_id))
            .filter(likes::profile_id.eq(profile_id)),
    )
    .execute(conn)
    .await?;

    if removed > 0 {
        return Ok(false);
    }

    diesel::insert_into(likes::table)
        .values(&NewBlogPostLike {
            post_id,
            profile_id,
        })
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;

    Ok(true)
}

#[axum::debug_handler]
pub async fn toggle_post_like(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(me): AuthUser,
) -> Result<Json<LikeState>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    ensure_post_exists(&mut conn, id).await?;

    let liked = toggle(&mut conn, id, me.id).await?;

    let likes_count = likes::table
        .filter(likes::post_id.eq(id))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;

    Ok(Json(LikeState { liked, likes_count }))
}
