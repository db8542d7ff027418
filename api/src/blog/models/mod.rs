pub mod blog_comment;
pub mod blog_comment_like;
pub mod blog_post;
pub mod blog_post_like;
