use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::auth::repo_types::User;
use crate::auth::session;
use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated user behind the current request.
///
/// Extraction resolves the session cookie against the store and loads the
/// account. Requests with no cookie, an unknown or expired session, or a
/// session pointing at a deleted account are all rejected the same way.
pub struct CurrentUser {
    pub user: User,
    /// Raw cookie token, kept so logout can destroy this exact session.
    pub(crate) token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session::extract_token(&parts.headers) else {
            return Err(ApiError::AuthRequired);
        };

        let user_id = session::resolve(state.store.as_ref(), &state.config.session, &token)
            .await
            .map_err(ApiError::Internal)?;
        let Some(user_id) = user_id else {
            debug!("session cookie did not resolve");
            return Err(ApiError::AuthRequired);
        };

        // A session that outlived its account reads as logged out.
        match User::find_by_id(state.store.as_ref(), &user_id).await {
            Ok(Some(user)) => Ok(CurrentUser { user, token }),
            Ok(None) => {
                debug!(user_id = %user_id, "session points at a missing account");
                Err(ApiError::AuthRequired)
            }
            Err(err) => Err(ApiError::from(err)),
        }
    }
}
