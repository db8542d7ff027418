use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    App,
    blog::models::blog_comment::{BlogComment, UpdateBlogComment},
    error::AppError,
    identity::AuthUser,
    schema::comments,
};

use super::{Comment, ensure_comment_owner, find_post_comment, validate_content};

#[derive(Deserialize)]
pub struct CommentPatch {
    content: String,
}

#[axum::debug_handler]
pub async fn patch_comment(
    State(ctx): State<App>,
    Path((post_id, id)): Path<(i32, i32)>,
    AuthUser(me): AuthUser,
    crate::json::Json(patch): crate::json::Json<CommentPatch>,
) -> Result<Json<Comment>, AppError> {
    let content = validate_content(&patch.content).map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let mut conn = ctx.diesel.get().await?;

    let existing = find_post_comment(&mut conn, post_id, id).await?;
    ensure_comment_owner(&existing, me.id)?;

    if existing.is_deleted {
        return Err(("You can't edit a deleted comment", StatusCode::BAD_REQUEST).into());
    }

    let comment = diesel::update(comments::table.find(id))
        .set(&UpdateBlogComment {
            content: Some(content),
            updated_at: Some(chrono::Utc::now().naive_utc()),
        })
        .returning(BlogComment::as_returning())
        .get_result::<BlogComment>(&mut conn)
        .await?;

    Ok(Json(Comment::new(comment, me.author_ref())))
}
