use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    options::{ClientOptions, IndexOptions, UpdateOptions},
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::StoreConfig;

const USERS_COLLECTION: &str = "users";
const SESSIONS_COLLECTION: &str = "sessions";

/// A user document as it lives in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub username_normalized: String,
    pub password_hash: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// A session record in the `sessions` collection, keyed by the keyed hash
/// of the cookie token. The raw token is never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDoc {
    pub token_hash: String,
    pub user_id: String,
    pub created_at: DateTime,
    pub expires_at: DateTime,
}

impl SessionDoc {
    pub fn new(
        token_hash: String,
        user_id: String,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            token_hash,
            user_id,
            created_at: DateTime::from_time_0_3(now),
            expires_at: DateTime::from_time_0_3(expires_at),
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.to_time_0_3() <= now
    }
}

/// Access to the document database, narrowed to what the auth domain needs.
/// [`MongoStore`] is the production implementation; tests run against
/// [`memory::MemoryStore`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Create the session expiry index and the username lookup index.
    async fn ensure_indexes(&self) -> anyhow::Result<()>;

    async fn get_user(&self, id: &str) -> anyhow::Result<Option<UserDoc>>;

    async fn find_user_by_normalized_username(
        &self,
        normalized: &str,
    ) -> anyhow::Result<Option<UserDoc>>;

    /// Insert a user document and return its assigned id. `createdAt` and
    /// `updatedAt` are stamped by the store clock, not by this process.
    async fn insert_user(
        &self,
        username: &str,
        normalized: &str,
        password_hash: &str,
    ) -> anyhow::Result<String>;

    async fn update_user_username(
        &self,
        id: &str,
        username: &str,
        normalized: &str,
    ) -> anyhow::Result<()>;

    async fn update_user_password(&self, id: &str, password_hash: &str) -> anyhow::Result<()>;

    async fn insert_session(&self, session: SessionDoc) -> anyhow::Result<()>;

    async fn get_session(&self, token_hash: &str) -> anyhow::Result<Option<SessionDoc>>;

    async fn delete_session(&self, token_hash: &str) -> anyhow::Result<()>;
}

/// MongoDB-backed [`Store`]. One handle per process, cloned into state.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .context("parse store connection uri")?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        let client = Client::with_options(options).context("build store client")?;
        Ok(Self {
            db: client.database(&config.database),
        })
    }

    fn users(&self) -> Collection<UserDoc> {
        self.db.collection(USERS_COLLECTION)
    }

    fn sessions(&self) -> Collection<SessionDoc> {
        self.db.collection(SESSIONS_COLLECTION)
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ensure_indexes(&self) -> anyhow::Result<()> {
        // Sessions drop out server-side once `expiresAt` passes.
        self.sessions()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "expiresAt": 1 })
                    .options(
                        IndexOptions::builder()
                            .expire_after(Duration::from_secs(0))
                            .build(),
                    )
                    .build(),
                None,
            )
            .await
            .context("create session expiry index")?;
        self.sessions()
            .create_index(
                IndexModel::builder().keys(doc! { "tokenHash": 1 }).build(),
                None,
            )
            .await
            .context("create session lookup index")?;
        // Lookup index only. Username uniqueness is a check-then-write
        // concern in the repository, not a store constraint.
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "usernameNormalized": 1 })
                    .build(),
                None,
            )
            .await
            .context("create username lookup index")?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> anyhow::Result<Option<UserDoc>> {
        // Ids that never came from this store cannot match anything.
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        self.users()
            .find_one(doc! { "_id": oid }, None)
            .await
            .context("get user by id")
    }

    async fn find_user_by_normalized_username(
        &self,
        normalized: &str,
    ) -> anyhow::Result<Option<UserDoc>> {
        self.users()
            .find_one(doc! { "usernameNormalized": normalized }, None)
            .await
            .context("find user by username")
    }

    async fn insert_user(
        &self,
        username: &str,
        normalized: &str,
        password_hash: &str,
    ) -> anyhow::Result<String> {
        // Upsert on a fresh id so `$currentDate` stamps both timestamps
        // with the store clock.
        let id = ObjectId::new();
        self.users()
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$setOnInsert": {
                        "username": username,
                        "usernameNormalized": normalized,
                        "passwordHash": password_hash,
                    },
                    "$currentDate": { "createdAt": true, "updatedAt": true },
                },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .context("insert user")?;
        Ok(id.to_hex())
    }

    async fn update_user_username(
        &self,
        id: &str,
        username: &str,
        normalized: &str,
    ) -> anyhow::Result<()> {
        let oid = ObjectId::parse_str(id).context("malformed user id")?;
        self.users()
            .update_one(
                doc! { "_id": oid },
                doc! {
                    "$set": { "username": username, "usernameNormalized": normalized },
                    "$currentDate": { "updatedAt": true },
                },
                None,
            )
            .await
            .context("update username")?;
        Ok(())
    }

    async fn update_user_password(&self, id: &str, password_hash: &str) -> anyhow::Result<()> {
        let oid = ObjectId::parse_str(id).context("malformed user id")?;
        self.users()
            .update_one(
                doc! { "_id": oid },
                doc! {
                    "$set": { "passwordHash": password_hash },
                    "$currentDate": { "updatedAt": true },
                },
                None,
            )
            .await
            .context("update password")?;
        Ok(())
    }

    async fn insert_session(&self, session: SessionDoc) -> anyhow::Result<()> {
        self.sessions()
            .insert_one(session, None)
            .await
            .context("insert session")?;
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> anyhow::Result<Option<SessionDoc>> {
        self.sessions()
            .find_one(doc! { "tokenHash": token_hash }, None)
            .await
            .context("get session")
    }

    async fn delete_session(&self, token_hash: &str) -> anyhow::Result<()> {
        self.sessions()
            .delete_one(doc! { "tokenHash": token_hash }, None)
            .await
            .context("delete session")?;
        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory [`Store`] for unit and handler tests. Users keep insertion
    /// order so lookups behave like an unsorted collection scan.
    #[derive(Default)]
    pub struct MemoryStore {
        users: Mutex<Vec<UserDoc>>,
        sessions: Mutex<HashMap<String, SessionDoc>>,
    }

    #[async_trait]
    impl Store for MemoryStore {
        async fn ensure_indexes(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn get_user(&self, id: &str) -> anyhow::Result<Option<UserDoc>> {
            let Ok(oid) = ObjectId::parse_str(id) else {
                return Ok(None);
            };
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|user| user.id == oid)
                .cloned())
        }

        async fn find_user_by_normalized_username(
            &self,
            normalized: &str,
        ) -> anyhow::Result<Option<UserDoc>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|user| user.username_normalized == normalized)
                .cloned())
        }

        async fn insert_user(
            &self,
            username: &str,
            normalized: &str,
            password_hash: &str,
        ) -> anyhow::Result<String> {
            let now = DateTime::now();
            let user = UserDoc {
                id: ObjectId::new(),
                username: username.to_string(),
                username_normalized: normalized.to_string(),
                password_hash: password_hash.to_string(),
                created_at: now,
                updated_at: now,
            };
            let id = user.id.to_hex();
            self.users.lock().unwrap().push(user);
            Ok(id)
        }

        async fn update_user_username(
            &self,
            id: &str,
            username: &str,
            normalized: &str,
        ) -> anyhow::Result<()> {
            let oid = ObjectId::parse_str(id)?;
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.iter_mut().find(|user| user.id == oid) {
                user.username = username.to_string();
                user.username_normalized = normalized.to_string();
                user.updated_at = DateTime::now();
            }
            Ok(())
        }

        async fn update_user_password(&self, id: &str, password_hash: &str) -> anyhow::Result<()> {
            let oid = ObjectId::parse_str(id)?;
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.iter_mut().find(|user| user.id == oid) {
                user.password_hash = password_hash.to_string();
                user.updated_at = DateTime::now();
            }
            Ok(())
        }

        async fn insert_session(&self, session: SessionDoc) -> anyhow::Result<()> {
            self.sessions
                .lock()
                .unwrap()
                .insert(session.token_hash.clone(), session);
            Ok(())
        }

        async fn get_session(&self, token_hash: &str) -> anyhow::Result<Option<SessionDoc>> {
            Ok(self.sessions.lock().unwrap().get(token_hash).cloned())
        }

        async fn delete_session(&self, token_hash: &str) -> anyhow::Result<()> {
            self.sessions.lock().unwrap().remove(token_hash);
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn insert_then_read_back_by_id_and_username() {
            let store = MemoryStore::default();
            let id = store
                .insert_user("Alice", "alice", "argon2-hash")
                .await
                .unwrap();

            let by_id = store.get_user(&id).await.unwrap().unwrap();
            assert_eq!(by_id.username, "Alice");
            assert_eq!(by_id.username_normalized, "alice");
            assert_eq!(by_id.created_at, by_id.updated_at);

            let by_name = store
                .find_user_by_normalized_username("alice")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(by_name.id.to_hex(), id);
        }

        #[tokio::test]
        async fn malformed_id_reads_as_absent() {
            let store = MemoryStore::default();
            assert!(store.get_user("not-an-object-id").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn first_matching_user_wins_on_duplicates() {
            let store = MemoryStore::default();
            let first = store.insert_user("bob", "bob", "hash-1").await.unwrap();
            store.insert_user("BOB", "bob", "hash-2").await.unwrap();

            let found = store
                .find_user_by_normalized_username("bob")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(found.id.to_hex(), first);
        }

        #[tokio::test]
        async fn session_lifecycle() {
            let store = MemoryStore::default();
            let now = OffsetDateTime::now_utc();
            let session = SessionDoc::new(
                "hash-abc".into(),
                "user-1".into(),
                now,
                now + time::Duration::days(7),
            );
            store.insert_session(session).await.unwrap();

            let found = store.get_session("hash-abc").await.unwrap().unwrap();
            assert_eq!(found.user_id, "user-1");
            assert!(!found.is_expired(now));
            assert!(found.is_expired(now + time::Duration::days(8)));

            store.delete_session("hash-abc").await.unwrap();
            assert!(store.get_session("hash-abc").await.unwrap().is_none());
        }
    }
}
