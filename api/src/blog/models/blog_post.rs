use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlogPost {
    pub id: i32,
    pub author_id: i32,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::posts)]
pub struct NewBlogPost {
    pub author_id: i32,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::posts)]
pub struct UpdateBlogPost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub thumbnail_url: Option<Option<String>>,
    pub updated_at: Option<NaiveDateTime>,
}
