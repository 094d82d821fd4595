//! Request and response bodies
//!
//! Every response carries `ok`. Success bodies are `{ok: true, ...fields}`,
//! failures are `{ok: false, error: CODE, ...details}`.

use serde::{Deserialize, Serialize};

use super::error_code::ErrorCode;
use crate::services::{ActiveItem, LeaseStatus};
use crate::storage::{BlacklistEntry, KickSignal};

// ============ Requests ============

/// `?hwid=...`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HwidQuery {
    pub hwid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedeemRequest {
    pub hwid: Option<String>,
    pub key: Option<String>,
}

/// Body of `/admin/blacklist`, `/admin/unblacklist` and `/admin/kick`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HwidActionRequest {
    pub hwid: Option<String>,
    pub reason: Option<String>,
}

// ============ Responses ============

/// `{ok: true}` merged with the fields of `data`
#[derive(Debug, Serialize)]
pub struct OkBody<T> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> OkBody<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

/// No fields beyond `ok`
#[derive(Debug, Serialize)]
pub struct Ack {}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: ErrorCode) -> Self {
        Self {
            ok: false,
            error,
            reason: None,
            at: None,
            message: None,
        }
    }

    pub fn blacklisted(entry: &BlacklistEntry) -> Self {
        Self {
            reason: Some(entry.reason.clone()),
            at: Some(entry.at),
            ..Self::new(ErrorCode::Blacklisted)
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(ErrorCode::ServerError)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(
    tag = "mode",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum GetKeyBody {
    Active { seconds_left: u64, expires_at: i64 },
    PendingExists { link: String, ttl: u64 },
    PendingCreated { link: String, ttl: u64 },
}

#[derive(Debug, Serialize)]
#[serde(
    tag = "mode",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum RedeemBody {
    AlreadyActive { seconds_left: u64, expires_at: i64 },
    Activated { expires_at: i64, seconds_left: u64 },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub valid: bool,
    pub seconds_left: u64,
    /// `null` when no lease exists
    pub expires_at: Option<i64>,
}

impl From<LeaseStatus> for StatusBody {
    fn from(status: LeaseStatus) -> Self {
        Self {
            valid: status.valid,
            seconds_left: status.seconds_left,
            expires_at: status.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PollBody {
    #[serde(flatten)]
    pub status: StatusBody,
    pub kick: Option<KickSignal>,
}

#[derive(Debug, Serialize)]
pub struct ActivesBody {
    pub count: usize,
    pub items: Vec<ActiveItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBody {
    pub ok: bool,
    pub store: &'static str,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_key_body_shape() {
        let body = OkBody::new(GetKeyBody::PendingCreated {
            link: "https://s.example/x".to_string(),
            ttl: 1800,
        });
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"ok": true, "mode": "PENDING_CREATED", "link": "https://s.example/x", "ttl": 1800})
        );

        let body = OkBody::new(GetKeyBody::Active {
            seconds_left: 10,
            expires_at: 99,
        });
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"ok": true, "mode": "ACTIVE", "secondsLeft": 10, "expiresAt": 99})
        );
    }

    #[test]
    fn test_error_body_shape() {
        let entry = BlacklistEntry {
            reason: "abuse".to_string(),
            at: 5,
        };
        assert_eq!(
            serde_json::to_value(ErrorBody::blacklisted(&entry)).unwrap(),
            json!({"ok": false, "error": "BLACKLISTED", "reason": "abuse", "at": 5})
        );
        assert_eq!(
            serde_json::to_value(ErrorBody::new(ErrorCode::InvalidKey)).unwrap(),
            json!({"ok": false, "error": "INVALID_KEY"})
        );
    }

    #[test]
    fn test_poll_body_shape() {
        let body = OkBody::new(PollBody {
            status: StatusBody {
                valid: false,
                seconds_left: 0,
                expires_at: None,
            },
            kick: None,
        });
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"ok": true, "valid": false, "secondsLeft": 0, "expiresAt": null, "kick": null})
        );
    }
}
