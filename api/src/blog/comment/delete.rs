use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{
    App, blog::models::blog_comment::DeleteBlogComment, error::AppError, identity::AuthUser,
    schema::comments,
};

use super::{ensure_comment_owner, find_post_comment};

/// Soft delete, the row stays so replies keep their place in the thread
#[axum::debug_handler]
pub async fn delete_comment(
    State(ctx): State<App>,
    Path((post_id, id)): Path<(i32, i32)>,
    AuthUser(me): AuthUser,
) -> Result<StatusCode, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let comment = find_post_comment(&mut conn, post_id, id).await?;
    ensure_comment_owner(&comment, me.id)?;

    if comment.is_deleted {
        return Ok(StatusCode::NO_CONTENT);
    }

    diesel::update(comments::table.find(id))
        .set(&DeleteBlogComment {
            is_deleted: true,
            deleted_at: Some(chrono::Utc::now().naive_utc()),
        })
        .execute(&mut conn)
        .await?;

    tracing::debug!(comment_id = id, post_id, "Soft deleted comment");

    Ok(StatusCode::NO_CONTENT)
}
