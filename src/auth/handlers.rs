use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, Envelope, LoginRequest, RegisterRequest, UpdateAccountRequest,
            UserData,
        },
        extractors::CurrentUser,
        repo_types::User,
        session, strategy,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/account", patch(update_account))
        .route("/auth/password", patch(change_password))
}

/// Write the session record and build its `Set-Cookie` header. The record
/// is durable before the caller can produce a response.
async fn establish_session(state: &AppState, user: &User) -> Result<HeaderMap, ApiError> {
    let token = session::issue(state.store.as_ref(), &state.config.session, &user.id)
        .await
        .map_err(ApiError::Internal)?;
    let cookie = session::session_cookie(&state.config.session, &token)
        .map_err(|err| ApiError::Internal(err.into()))?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok(headers)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<Envelope<UserData>>), ApiError> {
    let username = payload.username.unwrap_or_default().trim().to_string();
    let password = payload.password.unwrap_or_default();
    let confirm_password = payload.confirm_password.unwrap_or_default();

    if username.is_empty() || password.is_empty() {
        warn!("registration with missing fields");
        return Err(ApiError::Validation(
            "Username and password are required.".into(),
        ));
    }
    // An empty confirmation counts as not provided, not as a mismatch.
    if !confirm_password.is_empty() && confirm_password != password {
        return Err(ApiError::Validation("Passwords do not match.".into()));
    }

    let user = User::create(state.store.as_ref(), &username, &password).await?;
    let headers = establish_session(&state, &user).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(Envelope::success(
            "Registration successful.",
            UserData {
                user: user.to_public(),
            },
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<Envelope<UserData>>), ApiError> {
    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    // Missing fields fall through to the same uniform rejection as a wrong
    // password; login never explains which part failed.
    let user = strategy::verify_credentials(state.store.as_ref(), &username, &password)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let headers = establish_session(&state, &user).await?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((
        headers,
        Json(Envelope::success(
            format!("Logged in as {}", user.username),
            UserData {
                user: user.to_public(),
            },
        )),
    ))
}

#[instrument(skip(state, current))]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<(HeaderMap, Json<Envelope>), ApiError> {
    session::destroy(state.store.as_ref(), &state.config.session, &current.token)
        .await
        .map_err(ApiError::Internal)?;

    let cookie = session::clear_session_cookie(&state.config.session)
        .map_err(|err| ApiError::Internal(err.into()))?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    info!(user_id = %current.user.id, "user logged out");
    Ok((headers, Json(Envelope::message("Logged out."))))
}

#[instrument(skip(current))]
pub async fn me(current: CurrentUser) -> Json<Envelope<UserData>> {
    Json(Envelope::data(UserData {
        user: current.user.to_public(),
    }))
}

#[instrument(skip(state, current, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    mut current: CurrentUser,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<Envelope<UserData>>, ApiError> {
    let username = payload.username.unwrap_or_default().trim().to_string();
    if username.is_empty() {
        warn!(user_id = %current.user.id, "account update with missing username");
        return Err(ApiError::Validation("Username is required.".into()));
    }

    current
        .user
        .update_profile(state.store.as_ref(), &username)
        .await?;

    info!(user_id = %current.user.id, username = %current.user.username, "account updated");
    Ok(Json(Envelope::success(
        "Account updated.",
        UserData {
            user: current.user.to_public(),
        },
    )))
}

#[instrument(skip(state, current, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    mut current: CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let current_password = payload.current_password.unwrap_or_default();
    let new_password = payload.new_password.unwrap_or_default();
    let confirm_password = payload.confirm_password.unwrap_or_default();

    if current_password.is_empty() || new_password.is_empty() {
        return Err(ApiError::Validation(
            "Current password and new password are required.".into(),
        ));
    }
    // Same rule as registration: an empty confirmation is not a mismatch.
    if !confirm_password.is_empty() && confirm_password != new_password {
        return Err(ApiError::Validation("New passwords do not match.".into()));
    }
    if !current.user.verify_password(&current_password) {
        warn!(user_id = %current.user.id, "password change with wrong current password");
        return Err(ApiError::Validation("Current password is incorrect.".into()));
    }

    current
        .user
        .update_password(state.store.as_ref(), &new_password)
        .await?;

    info!(user_id = %current.user.id, "password updated");
    Ok(Json(Envelope::message("Password updated.")))
}
