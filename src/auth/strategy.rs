use tracing::{debug, warn};

use crate::auth::repo_types::User;
use crate::error::UserError;
use crate::store::Store;

/// Verify a username/password pair against the store.
///
/// Unknown usernames and wrong passwords both come back as `None`, so the
/// HTTP layer can answer every failed login with one uniform message.
pub async fn verify_credentials(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> Result<Option<User>, UserError> {
    let Some(user) = User::find_by_username(store, username).await? else {
        warn!(username = %username.trim(), "login attempt for unknown username");
        return Ok(None);
    };
    if !user.verify_password(password) {
        warn!(user_id = %user.id, "login attempt with wrong password");
        return Ok(None);
    }
    debug!(user_id = %user.id, "credentials verified");
    Ok(Some(user))
}
