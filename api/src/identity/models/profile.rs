use diesel::prelude::*;
use serde::Serialize;

use crate::blog::comment::AuthorRef;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Profile {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::profiles)]
pub struct NewProfile {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::profiles)]
pub struct UpdateProfile {
    pub username: Option<String>,
    pub bio: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}

/// The columns of a profile that are safe to show to anyone
#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PublicProfile {
    pub id: i32,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

impl From<PublicProfile> for AuthorRef {
    fn from(p: PublicProfile) -> Self {
        AuthorRef {
            id: p.id,
            username: p.username,
            avatar_url: p.avatar_url,
        }
    }
}

impl Profile {
    pub fn author_ref(&self) -> AuthorRef {
        AuthorRef {
            id: self.id,
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}
