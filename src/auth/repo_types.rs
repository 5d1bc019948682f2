use time::OffsetDateTime;

use crate::auth::dto::PublicUser;
use crate::auth::password;
use crate::store::UserDoc;

/// User account as the domain sees it. The password hash never leaves this
/// module tree; responses are built through [`User::to_public`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub username_normalized: String,
    pub(crate) password_hash: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<UserDoc> for User {
    fn from(doc: UserDoc) -> Self {
        Self {
            id: doc.id.to_hex(),
            username: doc.username,
            username_normalized: doc.username_normalized,
            password_hash: doc.password_hash,
            created_at: doc.created_at.to_time_0_3(),
            updated_at: doc.updated_at.to_time_0_3(),
        }
    }
}

impl User {
    pub fn verify_password(&self, candidate: &str) -> bool {
        password::verify_password(candidate, &self.password_hash)
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
