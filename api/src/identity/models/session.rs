use std::ops::Add;

use base64::Engine;
use diesel::prelude::*;
use rand::RngCore;

pub const TOKEN_PREFIX: &str = "blog_";

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::sessions)]
pub struct NewSession {
    pub token: String,
    pub active: bool,
    pub issued_at: chrono::NaiveDateTime,
    pub expires_at: chrono::NaiveDateTime,
    pub profile_id: i32,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl NewSession {
    pub fn new_with_profile_id(profile_id: i32, ttl_days: i64) -> NewSession {
        let mut session_bytes = [0u8; 96];
        rand::rngs::OsRng.fill_bytes(&mut session_bytes);

        let token =
            TOKEN_PREFIX.to_owned() + &base64::engine::general_purpose::STANDARD.encode(session_bytes);

        let now = chrono::Utc::now().naive_utc();

        NewSession {
            active: true,
            token,
            issued_at: now,
            expires_at: now.add(chrono::Duration::try_days(ttl_days).unwrap_or_else(|| {
                tracing::error!("Could not convert {ttl_days} to days, using default");
                chrono::Duration::days(1)
            })),
            profile_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lifetime of the session, used for the cookie expiry
    pub fn lifetime(&self) -> std::time::Duration {
        (self.expires_at - self.issued_at)
            .to_std()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_prefixed() {
        let a = NewSession::new_with_profile_id(1, 30);
        let b = NewSession::new_with_profile_id(1, 30);

        assert!(a.token.starts_with(TOKEN_PREFIX));
        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), TOKEN_PREFIX.len() + 128);
    }

    #[test]
    fn test_expiry_follows_ttl() {
        let session = NewSession::new_with_profile_id(7, 30);

        assert_eq!(session.profile_id, 7);
        assert!(session.active);
        assert_eq!(session.lifetime().as_secs(), 30 * 24 * 60 * 60);
    }
}
