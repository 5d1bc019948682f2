use anyhow::Context;
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::config::SessionConfig;
use crate::store::{SessionDoc, Store};

pub const SESSION_COOKIE: &str = "wicket.sid";

type HmacSha256 = Hmac<Sha256>;

/// Random token handed to the browser. Only its keyed hash is stored.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Keyed digest of the token. Session records cannot be minted or matched
/// without the session secret.
fn hash_token(secret: &str, token: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Persist a session record for `user_id` and return the raw cookie token.
/// The record is durable before this returns.
pub async fn issue(
    store: &dyn Store,
    config: &SessionConfig,
    user_id: &str,
) -> anyhow::Result<String> {
    let token = generate_token();
    let now = OffsetDateTime::now_utc();
    let session = SessionDoc::new(
        hash_token(&config.secret, &token),
        user_id.to_string(),
        now,
        now + Duration::seconds(config.ttl_seconds),
    );
    store.insert_session(session).await.context("persist session")?;
    debug!(user_id = %user_id, "session issued");
    Ok(token)
}

/// Resolve a raw cookie token to the owning user id.
///
/// Expired records read as absent and are removed on sight; the store's
/// expiry index is a sweeper, not the source of truth.
pub async fn resolve(
    store: &dyn Store,
    config: &SessionConfig,
    token: &str,
) -> anyhow::Result<Option<String>> {
    let token_hash = hash_token(&config.secret, token);
    let Some(session) = store.get_session(&token_hash).await? else {
        return Ok(None);
    };
    if session.is_expired(OffsetDateTime::now_utc()) {
        store.delete_session(&token_hash).await?;
        return Ok(None);
    }
    Ok(Some(session.user_id))
}

/// Remove the session record behind a raw token. Deleting a token that was
/// never issued, or twice, is fine.
pub async fn destroy(store: &dyn Store, config: &SessionConfig, token: &str) -> anyhow::Result<()> {
    store.delete_session(&hash_token(&config.secret, token)).await
}

/// `Set-Cookie` value carrying the session token.
pub fn session_cookie(
    config: &SessionConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.ttl_seconds
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// `Set-Cookie` value that clears the session token.
pub fn clear_session_cookie(config: &SessionConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull the raw session token out of the `Cookie` header, if present.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        let Some((key, token)) = pair.trim().split_once('=') else {
            continue;
        };
        if key.trim() == SESSION_COOKIE {
            return Some(token.trim().to_string());
        }
    }
    None
}
