use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Path, Query, State},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::{
    App,
    blog::{Page, models::blog_comment::BlogComment, post::ensure_post_exists},
    error::AppError,
    identity::{MaybeAuthUser, models::profile::PublicProfile},
    schema::{comment_likes, comments, profiles},
};

use super::{CommentNode, CommentRecord, tree::build_comment_tree};

#[derive(Serialize, Debug)]
pub struct CommentSection {
    pub comments: Vec<CommentNode>,
    pub total: i64,
    pub has_more: bool,
}

/// Every page up to the requested one is loaded and the forest is rebuilt
/// from scratch, so a reply on a later page can still find its parent.
pub async fn get_comments(
    State(ctx): State<App>,
    Path(post_id): Path<i32>,
    Query(page): Query<Page>,
    viewer: MaybeAuthUser,
) -> Result<Json<CommentSection>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    ensure_post_exists(&mut conn, post_id).await?;

    let rows = comments::table
        .inner_join(profiles::table)
        .filter(comments::post_id.eq(post_id))
        .order((comments::created_at.desc(), comments::id.desc()))
        .limit(page.accumulated_limit())
        .select((BlogComment::as_select(), PublicProfile::as_select()))
        .load::<(BlogComment, PublicProfile)>(&mut conn)
        .await?;

    let total = comments::table
        .filter(comments::post_id.eq(post_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;

    let ids = rows.iter().map(|(c, _)| c.id).collect::<Vec<_>>();

    let likes_counts: HashMap<i32, i64> = comment_likes::table
        .filter(comment_likes::comment_id.eq_any(&ids))
        .group_by(comment_likes::comment_id)
        .select((
            comment_likes::comment_id,
            diesel::dsl::count(comment_likes::id),
        ))
        .load::<(i32, i64)>(&mut conn)
        .await?
        .into_iter()
        .collect();

    let liked_by_viewer: HashSet<i32> = match viewer.id() {
        Some(viewer_id) => comment_likes::table
            .filter(comment_likes::comment_id.eq_any(&ids))
            .filter(comment_likes::profile_id.eq(viewer_id))
            .select(comment_likes::comment_id)
            .load::<i32>(&mut conn)
            .await?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    let loaded = rows.len() as i64;
    let records = rows
        .into_iter()
        .map(|(comment, author)| {
            let likes_count = likes_counts.get(&comment.id).copied().unwrap_or(0);
            let viewer_has_liked = liked_by_viewer.contains(&comment.id);
            CommentRecord::new(
                comment,
                author.into(),
                likes_count,
                viewer_has_liked,
                viewer.id(),
            )
        })
        .collect::<Vec<_>>();

    tracing::debug!(post_id, loaded, total, "Loaded comments");

    Ok(Json(CommentSection {
        comments: build_comment_tree(records),
        total,
        has_more: loaded < total,
    }))
}
