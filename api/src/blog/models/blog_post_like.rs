use diesel::prelude::*;

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::likes)]
pub struct NewBlogPostLike {
    pub post_id: i32,
    pub profile_id: i32,
}
