use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    App,
    blog::models::blog_post::{BlogPost, NewBlogPost},
    error::AppError,
    identity::AuthUser,
    schema::posts,
};

use super::{PostDetail, PostStats, normalize_tags, validate_post_content, validate_title};

#[derive(Deserialize)]
pub struct PostSubmission {
    title: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[axum::debug_handler]
pub async fn create_post(
    State(ctx): State<App>,
    AuthUser(me): AuthUser,
    crate::json::Json(submission): crate::json::Json<PostSubmission>,
) -> Result<(StatusCode, Json<PostDetail>), AppError> {
    let new_post = NewBlogPost {
        author_id: me.id,
        title: validate_title(&submission.title)?,
        content: validate_post_content(&submission.content)?,
        tags: normalize_tags(submission.tags)?,
    };

    let mut conn = ctx.diesel.get().await?;

    let post = diesel::insert_into(posts::table)
        .values(&new_post)
        .returning(BlogPost::as_returning())
        .get_result::<BlogPost>(&mut conn)
        .await?;

    tracing::info!(post_id = post.id, author_id = me.id, "Created post");

    Ok((
        StatusCode::CREATED,
        Json(PostDetail::new(
            post,
            me.author_ref(),
            &PostStats::default(),
            Some(me.id),
        )),
    ))
}
