use diesel::prelude::*;

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::comment_likes)]
pub struct NewBlogCommentLike {
    pub comment_id: i32,
    pub profile_id: i32,
}
