use axum::{
    Json,
    extract::{Query, State},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::{
    App,
    blog::{Page, models::blog_post::BlogPost},
    error::AppError,
    identity::{AuthUser, models::profile::PublicProfile},
    schema::{comments, likes, posts, profiles},
};

use super::{PostSummary, summarize};

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct DashboardTotals {
    pub posts: i64,
    pub likes: i64,
    pub comments: i64,
}

#[derive(Serialize)]
pub struct Dashboard {
    totals: DashboardTotals,
    posts: Vec<PostSummary>,
    has_more: bool,
}

#[axum::debug_handler]
pub async fn get_dashboard(
    State(ctx): State<App>,
    AuthUser(me): AuthUser,
    Query(page): Query<Page>,
) -> Result<Json<Dashboard>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let rows = posts::table
        .inner_join(profiles::table)
        .filter(posts::author_id.eq(me.id))
        .order((posts::created_at.desc(), posts::id.desc()))
        .limit(page.size())
        .offset(page.offset())
        .select((BlogPost::as_select(), PublicProfile::as_select()))
        .load::<(BlogPost, PublicProfile)>(&mut conn)
        .await?;

    let totals = DashboardTotals {
        posts: posts::table
            .filter(posts::author_id.eq(me.id))
            .count()
            .get_result::<i64>(&mut conn)
            .await?,
        likes: likes::table
            .inner_join(posts::table)
            .filter(posts::author_id.eq(me.id))
            .count()
            .get_result::<i64>(&mut conn)
            .await?,
        comments: comments::table
            .inner_join(posts::table)
            .filter(posts::author_id.eq(me.id))
            .filter(comments::is_deleted.eq(false))
            .count()
            .get_result::<i64>(&mut conn)
            .await?,
    };

    let has_more = page.offset() + (rows.len() as i64) < totals.posts;
    let posts = summarize(&mut conn, rows).await?;

    Ok(Json(Dashboard {
        totals,
        posts,
        has_more,
    }))
}
