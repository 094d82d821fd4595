//! 统一 API 错误码定义

use actix_web::http::StatusCode;
use serde::Serialize;
use strum::{AsRefStr, Display};

/// API 错误码枚举
///
/// 序列化为 SCREAMING_SNAKE_CASE 字符串，例如 `"NO_PENDING_KEY"`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 400
    MissingHwid,
    MissingHwidOrKey,

    // 401
    Unauthorized,
    InvalidKey,

    // 403
    Blacklisted,

    // 404
    NoPendingKey,

    // 500
    ServerError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::MissingHwid | ErrorCode::MissingHwidOrKey => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized | ErrorCode::InvalidKey => StatusCode::UNAUTHORIZED,
            ErrorCode::Blacklisted => StatusCode::FORBIDDEN,
            ErrorCode::NoPendingKey => StatusCode::NOT_FOUND,
            ErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(ErrorCode::MissingHwidOrKey).unwrap(),
            "MISSING_HWID_OR_KEY"
        );
        assert_eq!(ErrorCode::NoPendingKey.as_ref(), "NO_PENDING_KEY");
        assert_eq!(ErrorCode::ServerError.to_string(), "SERVER_ERROR");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::MissingHwid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidKey.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Blacklisted.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NoPendingKey.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ServerError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
