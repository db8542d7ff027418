use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{
    App,
    blog::{models::blog_comment_like::NewBlogCommentLike, post::like::LikeState},
    error::AppError,
    identity::AuthUser,
    schema::comment_likes,
};

use super::find_post_comment;

#[axum::debug_handler]
pub async fn toggle_comment_like(
    State(ctx): State<App>,
    Path((post_id, id)): Path<(i32, i32)>,
    AuthUser(me): AuthUser,
) -> Result<Json<LikeState>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let comment = find_post_comment(&mut conn, post_id, id).await?;
    if comment.is_deleted {
        return Err(("You can't like a deleted comment", StatusCode::BAD_REQUEST).into());
    }

    let removed = diesel::delete(
        comment_likes::table
            .filter(comment_likes::comment_id.eq(id))
            .filter(comment_likes::profile_id.eq(me.id)),
    )
    .execute(&mut conn)
    .await?;

    let liked = removed == 0;
    if liked {
        diesel::insert_into(comment_likes::table)
            .values(&NewBlogCommentLike {
                comment_id: id,
                profile_id: me.id,
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;
    }

    let likes_count = comment_likes::table
        .filter(comment_likes::comment_id.eq(id))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;

    Ok(Json(LikeState { liked, likes_count }))
}
