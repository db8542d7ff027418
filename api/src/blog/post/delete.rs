use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{App, error::AppError, identity::AuthUser, schema::posts};

use super::find_owned_post;

/// Comments and likes go with the post through the foreign key cascade
#[axum::debug_handler]
pub async fn delete_post(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(me): AuthUser,
) -> Result<StatusCode, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let post = find_owned_post(&mut conn, id, me.id).await?;

    diesel::delete(posts::table.find(id))
        .execute(&mut conn)
        .await?;

    if let Some(url) = &post.thumbnail_url {
        ctx.images.delete_by_url(url).await;
    }

    tracing::info!(post_id = id, author_id = me.id, "Deleted post");

    Ok(StatusCode::NO_CONTENT)
}
