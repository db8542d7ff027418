use axum::{
    Json,
    extract::{Path, State},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    App,
    blog::models::blog_post::{BlogPost, UpdateBlogPost},
    error::AppError,
    identity::AuthUser,
    schema::posts,
};

use super::{
    PostDetail, PostStats, find_owned_post, normalize_tags, validate_post_content, validate_title,
};

#[derive(Deserialize, Default)]
pub struct PostPatch {
    title: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
}

impl PostPatch {
    fn into_changeset(self) -> Result<UpdateBlogPost, AppError> {
        Ok(UpdateBlogPost {
            title: self.title.as_deref().map(validate_title).transpose()?,
            content: self.content.as_deref().map(validate_post_content).transpose()?,
            tags: self.tags.map(normalize_tags).transpose()?,
            thumbnail_url: None,
            updated_at: Some(chrono::Utc::now().naive_utc()),
        })
    }
}

#[axum::debug_handler]
pub async fn patch_post(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(me): AuthUser,
    crate::json::Json(patch): crate::json::Json<PostPatch>,
) -> Result<Json<PostDetail>, AppError> {
    let changeset = patch.into_changeset()?;

    let mut conn = ctx.diesel.get().await?;

    find_owned_post(&mut conn, id, me.id).await?;

    let post = diesel::update(posts::table.find(id))
        .set(&changeset)
        .returning(BlogPost::as_returning())
        .get_result::<BlogPost>(&mut conn)
        .await?;

    let stats = PostStats::load(&mut conn, &[id]).await?;

    Ok(Json(PostDetail::new(
        post,
        me.author_ref(),
        &stats,
        Some(me.id),
    )))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_patch_validates_present_fields_only() {
        let changeset = PostPatch {
            title: Some("  New title ".into()),
            ..Default::default()
        }
        .into_changeset()
        .unwrap();

        assert_eq!(changeset.title.as_deref(), Some("New title"));
        assert!(changeset.content.is_none());
        assert!(changeset.tags.is_none());
        assert!(changeset.updated_at.is_some());
    }

    #[test]
    fn test_patch_rejects_blank_title() {
        let result = PostPatch {
            title: Some(" ".into()),
            ..Default::default()
        }
        .into_changeset();

        assert!(result.is_err());
    }

    #[test]
    fn test_patch_normalizes_tags() {
        let changeset = PostPatch {
            tags: Some(vec!["Rust".into(), "rust ".into()]),
            ..Default::default()
        }
        .into_changeset()
        .unwrap();

        assert_eq!(changeset.tags, Some(vec!["rust".to_string()]));
    }
}
