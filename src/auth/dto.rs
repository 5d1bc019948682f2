use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Response envelope shared by every endpoint: a `status` of `success` or
/// `error`, an optional human-readable `message`, optional `data`.
#[derive(Debug, Serialize)]
pub struct Envelope<T = ()> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn data(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Request body for account registration. Fields are optional so that a
/// missing key surfaces as a validation message, not a deserialize failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for the account update.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub username: Option<String>,
}

/// Request body for the password change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

/// Payload wrapper for endpoints that return the account.
#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: PublicUser,
}

/// Public part of the user returned to the client. Never carries the
/// password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use time::macros::datetime;

    #[test]
    fn public_user_exposes_only_safe_fields() {
        let user = PublicUser {
            id: "665f1e2a9b3c4d5e6f708192".into(),
            username: "alice123".into(),
            created_at: datetime!(2024-06-01 12:00:00 UTC),
            updated_at: datetime!(2024-06-02 08:30:00 UTC),
        };
        let value = serde_json::to_value(&user).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 4);
        for key in ["id", "username", "createdAt", "updatedAt"] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(value["createdAt"], json!("2024-06-01T12:00:00Z"));
    }

    #[test]
    fn envelope_drops_absent_fields() {
        let body = serde_json::to_value(Envelope::message("Logged out.")).unwrap();
        assert_eq!(body, json!({"status": "success", "message": "Logged out."}));

        let body = serde_json::to_value(Envelope::error("Authentication required.")).unwrap();
        assert_eq!(
            body,
            json!({"status": "error", "message": "Authentication required."})
        );
    }

    #[test]
    fn register_request_tolerates_missing_keys() {
        let request: RegisterRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.username.is_none());
        assert!(request.password.is_none());
        assert!(request.confirm_password.is_none());
    }

    #[test]
    fn confirm_password_uses_camel_case_key() {
        let request: RegisterRequest = serde_json::from_value(json!({
            "username": "alice123",
            "password": "hunter22",
            "confirmPassword": "hunter22",
        }))
        .unwrap();
        assert_eq!(request.confirm_password.as_deref(), Some("hunter22"));

        let request: ChangePasswordRequest = serde_json::from_value(json!({
            "currentPassword": "old-password",
            "newPassword": "new-password",
        }))
        .unwrap();
        assert_eq!(request.current_password.as_deref(), Some("old-password"));
        assert_eq!(request.new_password.as_deref(), Some("new-password"));
        assert!(request.confirm_password.is_none());
    }

    #[test]
    fn envelope_success_carries_message_and_data() {
        let value: Value =
            serde_json::to_value(Envelope::success("Account updated.", json!({"n": 1}))).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "Account updated.");
        assert_eq!(value["data"]["n"], 1);
    }
}
