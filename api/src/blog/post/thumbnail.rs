use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{
    App,
    blog::models::blog_post::{BlogPost, UpdateBlogPost},
    error::AppError,
    identity::AuthUser,
    schema::posts,
    storage::{ImageKind, read_image_field},
};

use super::{PostDetail, PostStats, find_owned_post};

/// No connection is held while the body streams in and the image is processed
#[axum::debug_handler]
pub async fn upload_thumbnail(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(me): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<PostDetail>, AppError> {
    let previous = {
        let mut conn = ctx.diesel.get().await?;
        find_owned_post(&mut conn, id, me.id).await?
    };

    let bytes = read_image_field(&mut multipart).await?;

    let pool = ctx.diesel.clone();
    let (post, stats) = ctx
        .images
        .upload_and_record(ImageKind::Thumbnail, bytes, |thumbnail_url| async move {
            let mut conn = pool.get().await?;

            let post = diesel::update(posts::table.find(id))
                .set(&UpdateBlogPost {
                    thumbnail_url: Some(Some(thumbnail_url)),
                    ..Default::default()
                })
                .returning(BlogPost::as_returning())
                .get_result::<BlogPost>(&mut conn)
                .await?;

            let stats = PostStats::load(&mut conn, &[id]).await?;
            Ok::<_, AppError>((post, stats))
        })
        .await?;

    if let Some(old) = &previous.thumbnail_url {
        ctx.images.delete_by_url(old).await;
    }

    Ok(Json(PostDetail::new(
        post,
        me.author_ref(),
        &stats,
        Some(me.id),
    )))
}

#[axum::debug_handler]
pub async fn delete_thumbnail(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(me): AuthUser,
) -> Result<Json<PostDetail>, AppError> {
    let mut conn = ctx.diesel.get().await?;
    let previous = find_owned_post(&mut conn, id, me.id).await?;

    let post = diesel::update(posts::table.find(id))
        .set(&UpdateBlogPost {
            thumbnail_url: Some(None),
            ..Default::default()
        })
        .returning(BlogPost::as_returning())
        .get_result::<BlogPost>(&mut conn)
        .await?;

    if let Some(old) = &previous.thumbnail_url {
        ctx.images.delete_by_url(old).await;
    }

    let stats = PostStats::load(&mut conn, &[id]).await?;

    Ok(Json(PostDetail::new(
        post,
        me.author_ref(),
        &stats,
        Some(me.id),
    )))
}
