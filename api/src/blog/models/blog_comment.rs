use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlogComment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub parent_id: Option<i32>,
    pub content: String,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::comments)]
pub struct NewBlogComment {
    pub post_id: i32,
    pub author_id: i32,
    pub parent_id: Option<i32>,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewBlogComment {
    pub fn new(post_id: i32, author_id: i32, parent_id: Option<i32>, content: String) -> Self {
        // created_at and updated_at must match exactly, otherwise the comment
        // shows up as edited
        let now = chrono::Utc::now().naive_utc();
        NewBlogComment {
            post_id,
            author_id,
            parent_id,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::comments)]
pub struct UpdateBlogComment {
    pub content: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::comments)]
pub struct DeleteBlogComment {
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
}
