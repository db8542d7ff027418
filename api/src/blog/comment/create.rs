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
    blog::{
        models::blog_comment::{BlogComment, NewBlogComment},
        post::ensure_post_exists,
    },
    error::AppError,
    identity::AuthUser,
    schema::comments,
};

use super::{Comment, check_reply_target, validate_content};

#[derive(Deserialize)]
pub struct CommentSubmission {
    content: String,
    parent_id: Option<i32>,
}

#[axum::debug_handler]
pub async fn create_comment(
    State(ctx): State<App>,
    Path(post_id): Path<i32>,
    AuthUser(me): AuthUser,
    crate::json::Json(submission): crate::json::Json<CommentSubmission>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let content =
        validate_content(&submission.content).map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let mut conn = ctx.diesel.get().await?;

    ensure_post_exists(&mut conn, post_id).await?;

    // check if the parent comment actually belongs to the post
    if let Some(parent_id) = submission.parent_id {
        let parent = comments::table
            .find(parent_id)
            .select(BlogComment::as_select())
            .first::<BlogComment>(&mut conn)
            .await
            .optional()?;

        check_reply_target(parent.as_ref(), post_id).map_err(|e| (e, StatusCode::BAD_REQUEST))?;
    }

    let comment = diesel::insert_into(comments::table)
        .values(&NewBlogComment::new(
            post_id,
            me.id,
            submission.parent_id,
            content,
        ))
        .returning(BlogComment::as_returning())
        .get_result::<BlogComment>(&mut conn)
        .await?;

    tracing::debug!(comment_id = comment.id, post_id, "Created comment");

    Ok((StatusCode::CREATED, Json(Comment::new(comment, me.author_ref()))))
}
