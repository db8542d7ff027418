use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    App,
    blog::{Page, models::blog_post::BlogPost},
    error::AppError,
    identity::{MaybeAuthUser, models::profile::PublicProfile},
    schema::{likes, posts, profiles},
};

use super::{PostDetail, PostStats, PostSummary, summarize};

#[derive(Serialize)]
pub struct PostPage {
    posts: Vec<PostSummary>,
    total: i64,
    has_more: bool,
}

impl PostPage {
    fn new(posts: Vec<PostSummary>, total: i64, page: &Page) -> Self {
        PostPage {
            has_more: page.offset() + (posts.len() as i64) < total,
            posts,
            total,
        }
    }
}

pub async fn list_posts(
    State(ctx): State<App>,
    Query(page): Query<Page>,
) -> Result<Json<PostPage>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let rows = posts::table
        .inner_join(profiles::table)
        .order((posts::created_at.desc(), posts::id.desc()))
        .limit(page.size())
        .offset(page.offset())
        .select((BlogPost::as_select(), PublicProfile::as_select()))
        .load::<(BlogPost, PublicProfile)>(&mut conn)
        .await?;

    let total = posts::table
        .count()
        .get_result::<i64>(&mut conn)
        .await?;

    let summaries = summarize(&mut conn, rows).await?;

    Ok(Json(PostPage::new(summaries, total, &page)))
}

#[derive(Deserialize, Debug)]
pub struct SearchQueries {
    q: Option<String>,
    tag: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
}

impl SearchQueries {
    /// Returns the `ILIKE` pattern and the normalized tag, rejecting a search
    /// with neither.
    fn criteria(&self) -> Result<(Option<String>, Option<String>), AppError> {
        let pattern = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)));

        let tag = self
            .tag
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        if pattern.is_none() && tag.is_none() {
            return Err(("Provide a search query or a tag", StatusCode::BAD_REQUEST).into());
        }

        Ok((pattern, tag))
    }

    fn page(&self) -> Page {
        Page {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

fn escape_like(q: &str) -> String {
    let mut escaped = String::with_capacity(q.len());
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn search_posts(
    State(ctx): State<App>,
    Query(queries): Query<SearchQueries>,
) -> Result<Json<PostPage>, AppError> {
    let (pattern, tag) = queries.criteria()?;
    let page = queries.page();

    let filtered = || {
        let mut query = posts::table.inner_join(profiles::table).into_boxed();

        if let Some(pattern) = &pattern {
            query = query.filter(
                posts::title
                    .ilike(pattern.clone())
                    .or(posts::content.ilike(pattern.clone())),
            );
        }

        if let Some(tag) = &tag {
            query = query.filter(posts::tags.contains(vec![tag.clone()]));
        }

        query
    };

    let mut conn = ctx.diesel.get().await?;

    let rows = filtered()
        .order((posts::created_at.desc(), posts::id.desc()))
        .limit(page.size())
        .offset(page.offset())
        .select((BlogPost::as_select(), PublicProfile::as_select()))
        .load::<(BlogPost, PublicProfile)>(&mut conn)
        .await?;

    let total = filtered()
        .count()
        .get_result::<i64>(&mut conn)
        .await?;

    tracing::debug!(?queries, results = rows.len(), total, "Searched posts");

    let summaries = summarize(&mut conn, rows).await?;

    Ok(Json(PostPage::new(summaries, total, &page)))
}

pub async fn get_post(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    viewer: MaybeAuthUser,
) -> Result<Json<PostDetail>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let (post, author) = posts::table
        .inner_join(profiles::table)
        .filter(posts::id.eq(id))
        .select((BlogPost::as_select(), PublicProfile::as_select()))
        .first::<(BlogPost, PublicProfile)>(&mut conn)
        .await?;

    let stats = PostStats::load(&mut conn, &[id]).await?;

    let viewer_has_liked = match viewer.id() {
        Some(viewer_id) => {
            diesel::select(diesel::dsl::exists(
                likes::table
                    .filter(likes::post_id.eq(id))
                    .filter(likes::profile_id.eq(viewer_id)),
            ))
            .get_result::<bool>(&mut conn)
            .await?
        }
        None => false,
    };

    Ok(Json(PostDetail {
        viewer_has_liked,
        ..PostDetail::new(post, author.into(), &stats, viewer.id())
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    fn queries(q: Option<&str>, tag: Option<&str>) -> SearchQueries {
        SearchQueries {
            q: q.map(str::to_string),
            tag: tag.map(str::to_string),
            page: None,
            page_size: None,
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_search_needs_query_or_tag() {
        let err = queries(Some("   "), None).criteria().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        assert_eq!(
            queries(Some(" rust "), None).criteria().unwrap(),
            (Some("%rust%".to_string()), None)
        );
        assert_eq!(
            queries(None, Some(" Web ")).criteria().unwrap(),
            (None, Some("web".to_string()))
        );
    }

    #[test]
    fn test_has_more() {
        let page = Page {
            page: Some(1),
            page_size: Some(2),
        };
        assert!(PostPage::new(vec![], 5, &page).has_more);
        assert!(!PostPage::new(vec![], 2, &page).has_more);
    }
}
