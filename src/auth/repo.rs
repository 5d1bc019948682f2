use crate::auth::password;
use crate::auth::repo_types::User;
use crate::error::UserError;
use crate::store::Store;

const MIN_USERNAME_CHARS: usize = 3;
const MAX_USERNAME_CHARS: usize = 40;

/// Lower-cased, trimmed form of a username, used for lookups and for the
/// uniqueness check.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

fn validate_username(username: &str) -> Result<String, UserError> {
    let value = username.trim();
    if value.is_empty() {
        return Err(UserError::Validation("Username is required.".into()));
    }
    let length = value.chars().count();
    if !(MIN_USERNAME_CHARS..=MAX_USERNAME_CHARS).contains(&length) {
        return Err(UserError::Validation(
            "Username must be between 3 and 40 characters.".into(),
        ));
    }
    Ok(value.to_string())
}

impl User {
    /// Find a user by id. Ids that the store never issued read as absent.
    pub async fn find_by_id(store: &dyn Store, id: &str) -> Result<Option<User>, UserError> {
        Ok(store.get_user(id).await?.map(User::from))
    }

    /// Find a user by username, case-insensitively.
    pub async fn find_by_username(
        store: &dyn Store,
        username: &str,
    ) -> Result<Option<User>, UserError> {
        let normalized = normalize_username(username);
        if normalized.is_empty() {
            return Ok(None);
        }
        Ok(store
            .find_user_by_normalized_username(&normalized)
            .await?
            .map(User::from))
    }

    /// Reject the username when someone else already holds it. `exclude_id`
    /// lets an account keep (or re-case) its own name.
    async fn ensure_username_available(
        store: &dyn Store,
        username: &str,
        exclude_id: Option<&str>,
    ) -> Result<(), UserError> {
        if let Some(existing) = User::find_by_username(store, username).await? {
            if exclude_id != Some(existing.id.as_str()) {
                return Err(UserError::UsernameTaken);
            }
        }
        Ok(())
    }

    /// Create an account with a hashed password.
    ///
    /// The availability check and the insert are two separate store calls;
    /// concurrent registrations of the same name can slip through both
    /// checks. Accepted for now, the store keeps whatever lands.
    pub async fn create(
        store: &dyn Store,
        username: &str,
        password: &str,
    ) -> Result<User, UserError> {
        let username = validate_username(username)?;
        User::ensure_username_available(store, &username, None).await?;

        let password_hash = password::hash_password(password)?;
        let normalized = normalize_username(&username);
        let id = store
            .insert_user(&username, &normalized, &password_hash)
            .await?;

        // Read back instead of trusting the write payload; ids and
        // timestamps belong to the store.
        let doc = store.get_user(&id).await?.ok_or_else(|| {
            UserError::Store(anyhow::anyhow!("created user {id} not found on read-back"))
        })?;
        Ok(User::from(doc))
    }

    /// Rename the account, re-running validation and the uniqueness check.
    pub async fn update_profile(
        &mut self,
        store: &dyn Store,
        username: &str,
    ) -> Result<(), UserError> {
        let username = validate_username(username)?;
        User::ensure_username_available(store, &username, Some(self.id.as_str())).await?;

        let normalized = normalize_username(&username);
        store
            .update_user_username(&self.id, &username, &normalized)
            .await?;

        let doc = store.get_user(&self.id).await?.ok_or_else(|| {
            UserError::Store(anyhow::anyhow!("user {} vanished during update", self.id))
        })?;
        self.username = doc.username;
        self.username_normalized = doc.username_normalized;
        self.updated_at = doc.updated_at.to_time_0_3();
        Ok(())
    }

    /// Re-hash and persist a new password. Only the in-memory hash field is
    /// refreshed; the entity's timestamps stay as loaded.
    pub async fn update_password(
        &mut self,
        store: &dyn Store,
        new_password: &str,
    ) -> Result<(), UserError> {
        let password_hash = password::hash_password(new_password)?;
        store
            .update_user_password(&self.id, &password_hash)
            .await?;
        self.password_hash = password_hash;
        Ok(())
    }
}
