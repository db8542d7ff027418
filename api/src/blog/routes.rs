use axum::{
    Router,
    routing::{get, post},
};

use crate::App;

use super::comment::{
    create::create_comment, delete::delete_comment, get::get_comments, like::toggle_comment_like,
    patch::patch_comment,
};
use super::post::{
    create::create_post,
    dashboard::get_dashboard,
    delete::delete_post,
    get::{get_post, list_posts, search_posts},
    like::toggle_post_like,
    patch::patch_post,
    thumbnail::{delete_thumbnail, upload_thumbnail},
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/search", get(search_posts))
        .route(
            "/posts/{id}",
            get(get_post).patch(patch_post).delete(delete_post),
        )
        .route(
            "/posts/{id}/thumbnail",
            post(upload_thumbnail).delete(delete_thumbnail),
        )
        .route("/posts/{id}/like", post(toggle_post_like))
        .route(
            "/posts/{id}/comments",
            get(get_comments).post(create_comment),
        )
        .route(
            "/posts/{id}/comments/{comment_id}",
            axum::routing::patch(patch_comment).delete(delete_comment),
        )
        .route(
            "/posts/{id}/comments/{comment_id}/like",
            post(toggle_comment_like),
        )
        .route("/dashboard", get(get_dashboard))
}
