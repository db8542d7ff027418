pub mod create;
pub mod dashboard;
pub mod delete;
pub mod get;
pub mod like;
pub mod patch;
pub mod thumbnail;

use std::collections::{HashMap, HashSet};

use axum::http::StatusCode;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::{
    blog::{comment::AuthorRef, models::blog_post::BlogPost},
    error::{ApiRequestError, AppError},
    identity::models::profile::PublicProfile,
    schema::{comments, likes, posts},
};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_POST_LENGTH: usize = 50_000;
pub const MAX_TAGS: usize = 5;
pub const MAX_TAG_LENGTH: usize = 30;
const EXCERPT_LENGTH: usize = 200;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PostValidationError {
    #[error("No title provided")]
    EmptyTitle,

    #[error("Title too long (max {MAX_TITLE_LENGTH} characters)")]
    TitleTooLong,

    #[error("No content provided")]
    EmptyContent,

    #[error("Content too long (max {MAX_POST_LENGTH} characters)")]
    ContentTooLong,

    #[error("Too many tags (max {MAX_TAGS})")]
    TooManyTags,

    #[error("Tag `{0}` is too long (max {MAX_TAG_LENGTH} characters)")]
    TagTooLong(String),
}

impl ApiRequestError for PostValidationError {}

pub fn validate_title(title: &str) -> Result<String, PostValidationError> {
    let title = title.trim();

    if title.is_empty() {
        return Err(PostValidationError::EmptyTitle);
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(PostValidationError::TitleTooLong);
    }

    Ok(title.to_string())
}

pub fn validate_post_content(content: &str) -> Result<String, PostValidationError> {
    let content = content.trim();

    if content.is_empty() {
        return Err(PostValidationError::EmptyContent);
    }

    if content.chars().count() > MAX_POST_LENGTH {
        return Err(PostValidationError::ContentTooLong);
    }

    Ok(content.to_string())
}

/// Trims, lowercases and deduplicates tags while keeping their order. Blank
/// tags are dropped.
pub fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, PostValidationError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();

    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || !seen.insert(tag.clone()) {
            continue;
        }

        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(PostValidationError::TagTooLong(tag));
        }

        normalized.push(tag);
    }

    if normalized.len() > MAX_TAGS {
        return Err(PostValidationError::TooManyTags);
    }

    Ok(normalized)
}

pub fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_LENGTH) {
        Some((idx, _)) => format!("{}…", content[..idx].trim_end()),
        None => content.to_string(),
    }
}

/// A post in a listing
#[derive(Serialize, Debug)]
pub struct PostSummary {
    pub id: i32,
    pub title: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub author: AuthorRef,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub likes_count: i64,
    pub comments_count: i64,
}

#[derive(Serialize, Debug)]
pub struct PostDetail {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub author: AuthorRef,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_edited: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub viewer_has_liked: bool,
    pub is_post_owner: bool,
}

impl PostDetail {
    pub fn new(post: BlogPost, author: AuthorRef, stats: &PostStats, viewer: Option<i32>) -> Self {
        PostDetail {
            likes_count: stats.likes(post.id),
            comments_count: stats.comments(post.id),
            is_post_owner: viewer == Some(post.author_id),
            is_edited: post.updated_at != post.created_at,
            viewer_has_liked: false,
            id: post.id,
            title: post.title,
            content: post.content,
            tags: post.tags,
            thumbnail_url: post.thumbnail_url,
            author,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// Like and comment counts of a batch of posts
#[derive(Debug, Default)]
pub struct PostStats {
    likes: HashMap<i32, i64>,
    comments: HashMap<i32, i64>,
}

impl PostStats {
    pub fn likes(&self, post_id: i32) -> i64 {
        self.likes.get(&post_id).copied().unwrap_or(0)
    }

    /// Deleted comments are not counted
    pub fn comments(&self, post_id: i32) -> i64 {
        self.comments.get(&post_id).copied().unwrap_or(0)
    }

    pub async fn load(conn: &mut AsyncPgConnection, post_ids: &[i32]) -> Result<Self, AppError> {
        if post_ids.is_empty() {
            return Ok(PostStats::default());
        }

        let likes = likes::table
            .filter(likes::post_id.eq_any(post_ids))
            .group_by(likes::post_id)
            .select((likes::post_id, diesel::dsl::count(likes::id)))
            .load::<(i32, i64)>(conn)
            .await?;

        let comments = comments::table
            .filter(comments::post_id.eq_any(post_ids))
            .filter(comments::is_deleted.eq(false))
            .group_by(comments::post_id)
            .select((comments::post_id, diesel::dsl::count(comments::id)))
            .load::<(i32, i64)>(conn)
            .await?;

        Ok(PostStats {
            likes: likes.into_iter().collect(),
            comments: comments.into_iter().collect(),
        })
    }
}

pub async fn summarize(
    conn: &mut AsyncPgConnection,
    rows: Vec<(BlogPost, PublicProfile)>,
) -> Result<Vec<PostSummary>, AppError> {
    let ids = rows.iter().map(|(p, _)| p.id).collect::<Vec<_>>();
    let stats = PostStats::load(conn, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|(post, author)| PostSummary {
            likes_count: stats.likes(post.id),
            comments_count: stats.comments(post.id),
            excerpt: excerpt(&post.content),
            id: post.id,
            title: post.title,
            tags: post.tags,
            thumbnail_url: post.thumbnail_url,
            author: author.into(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
        .collect())
}

pub fn ensure_post_owner(post: &BlogPost, profile_id: i32) -> Result<(), AppError> {
    if post.author_id != profile_id {
        return Err(("You are not the owner of this post", StatusCode::FORBIDDEN).into());
    }

    Ok(())
}

/// 404 when the post doesn't exist, 403 when it belongs to someone else
pub async fn find_owned_post(
    conn: &mut AsyncPgConnection,
    post_id: i32,
    profile_id: i32,
) -> Result<BlogPost, AppError> {
    let post = posts::table
        .find(post_id)
        .select(BlogPost::as_select())
        .first::<BlogPost>(conn)
        .await?;

    ensure_post_owner(&post, profile_id)?;

    Ok(post)
}

/// Fails with 404 for unknown posts
pub async fn ensure_post_exists(conn: &mut AsyncPgConnection, post_id: i32) -> Result<(), AppError> {
    posts::table
        .find(post_id)
        .select(posts::id)
        .first::<i32>(conn)
        .await?;

    Ok(())
}
