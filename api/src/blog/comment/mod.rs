pub mod create;
pub mod delete;
pub mod get;
pub mod like;
pub mod patch;
pub mod tree;

use axum::http::StatusCode;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{blog::models::blog_comment::BlogComment, error::AppError, schema::comments};

pub const MAX_COMMENT_LENGTH: usize = 5000;

/// Public part of the author's profile shown next to a comment
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AuthorRef {
    pub id: i32,
    pub username: String,
    pub avatar_url: Option<String>,
}

// A comment row annotated with its likes and the viewer's relation to it
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRecord {
    pub id: i32,
    pub post_id: i32,
    pub parent_id: Option<i32>,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub likes_count: i64,
    pub viewer_has_liked: bool,
    pub is_comment_owner: bool,
    pub author: AuthorRef,
}

impl CommentRecord {
    pub fn new(
        comment: BlogComment,
        author: AuthorRef,
        likes_count: i64,
        viewer_has_liked: bool,
        viewer: Option<i32>,
    ) -> Self {
        CommentRecord {
            is_comment_owner: viewer == Some(comment.author_id),
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            is_deleted: comment.is_deleted,
            deleted_at: comment.deleted_at,
            likes_count,
            viewer_has_liked,
            author,
        }
    }
}

// The model that will be returned to the client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommentNode {
    pub id: i32,
    pub post_id: i32,
    pub parent_id: Option<i32>,
    /// `None` once the comment has been deleted
    pub content: Option<String>,
    pub author: AuthorRef,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub likes_count: i64,
    pub viewer_has_liked: bool,
    pub is_comment_owner: bool,
    pub depth: usize,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn from_record(record: CommentRecord, depth: usize) -> Self {
        CommentNode {
            id: record.id,
            post_id: record.post_id,
            parent_id: record.parent_id,
            is_edited: !record.is_deleted && record.updated_at != record.created_at,
            content: (!record.is_deleted).then_some(record.content),
            author: record.author,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_deleted: record.is_deleted,
            deleted_at: record.deleted_at,
            likes_count: record.likes_count,
            viewer_has_liked: record.viewer_has_liked,
            is_comment_owner: record.is_comment_owner,
            depth,
            children: vec![],
        }
    }
}

// Returned after a comment was written
#[derive(Debug, Serialize, Clone)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub parent_id: Option<i32>,
    pub content: String,
    pub author: AuthorRef,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_edited: bool,
}

impl Comment {
    pub fn new(comment: BlogComment, author: AuthorRef) -> Self {
        Comment {
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            is_edited: comment.updated_at != comment.created_at,
            content: comment.content,
            author,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// Trims the content and checks its length, shared by create and patch
pub fn validate_content(content: &str) -> Result<String, &'static str> {
    let content = content.trim();

    if content.is_empty() {
        return Err("No content provided");
    }

    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err("Content too long (max 5000 characters)");
    }

    Ok(content.to_string())
}

/// Looks the comment up within its post, 404 if it's somewhere else
pub async fn find_post_comment(
    conn: &mut AsyncPgConnection,
    post_id: i32,
    comment_id: i32,
) -> Result<BlogComment, AppError> {
    let comment = comments::table
        .filter(comments::id.eq(comment_id))
        .filter(comments::post_id.eq(post_id))
        .select(BlogComment::as_select())
        .first::<BlogComment>(conn)
        .await?;

    Ok(comment)
}

pub fn ensure_comment_owner(comment: &BlogComment, profile_id: i32) -> Result<(), AppError> {
    if comment.author_id != profile_id {
        return Err(("You are not the owner of this comment", StatusCode::FORBIDDEN).into());
    }

    Ok(())
}

/// Replies must stay within the post and can't go under a deleted comment
pub fn check_reply_target(parent: Option<&BlogComment>, post_id: i32) -> Result<(), &'static str> {
    match parent {
        Some(parent) if parent.post_id != post_id => {
            Err("You're replying to the comment that does not belong to this post")
        }
        Some(parent) if parent.is_deleted => Err("You can't reply to a deleted comment"),
        Some(_) => Ok(()),
        None => Err("You're replying to a comment that does not exist"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn comment(post_id: i32, author_id: i32, is_deleted: bool) -> BlogComment {
        let now = chrono::Utc::now().naive_utc();
        BlogComment {
            id: 1,
            post_id,
            author_id,
            parent_id: None,
            content: "hello".into(),
            is_deleted,
            deleted_at: is_deleted.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_check_reply_target() {
        assert!(check_reply_target(Some(&comment(1, 5, false)), 1).is_ok());
        assert!(check_reply_target(Some(&comment(2, 5, false)), 1).is_err());
        assert_eq!(
            check_reply_target(Some(&comment(1, 5, true)), 1),
            Err("You can't reply to a deleted comment")
        );
        assert!(check_reply_target(None, 1).is_err());
    }

    #[test]
    fn test_ensure_comment_owner() {
        assert!(ensure_comment_owner(&comment(1, 5, false), 5).is_ok());
        assert_eq!(
            ensure_comment_owner(&comment(1, 5, false), 6)
                .unwrap_err()
                .status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_record_flags_owner() {
        let author = AuthorRef {
            id: 5,
            username: "jane".into(),
            avatar_url: None,
        };

        let record = CommentRecord::new(comment(1, 5, false), author.clone(), 3, true, Some(5));
        assert!(record.is_comment_owner);
        assert!(record.viewer_has_liked);
        assert_eq!(record.likes_count, 3);

        let record = CommentRecord::new(comment(1, 5, false), author, 0, false, None);
        assert!(!record.is_comment_owner);
    }

    #[test]
    fn test_validate_content_trims() {
        assert_eq!(validate_content("  hi there \n"), Ok("hi there".to_string()));
    }

    #[test]
    fn test_validate_content_rejects_blank() {
        assert!(validate_content("   ").is_err());
    }

    #[test]
    fn test_validate_content_counts_characters() {
        let exactly_max = "é".repeat(MAX_COMMENT_LENGTH);
        assert!(validate_content(&exactly_max).is_ok());
        assert!(validate_content(&format!("{exactly_max}a")).is_err());
    }
}
