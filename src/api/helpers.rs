//! API 帮助函数

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, trace};

use super::error_code::ErrorCode;
use super::types::{ErrorBody, OkBody};
use crate::errors::KeywardError;
use crate::storage::BlacklistEntry;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(body)
}

/// 构建成功响应：`{ok: true, ...data}`
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, &OkBody::new(data))
}

/// 构建错误响应，状态码由错误码决定
pub fn error_response(code: ErrorCode) -> HttpResponse {
    json_response(code.status(), &ErrorBody::new(code))
}

pub fn blacklisted_response(entry: &BlacklistEntry) -> HttpResponse {
    json_response(
        ErrorCode::Blacklisted.status(),
        &ErrorBody::blacklisted(entry),
    )
}

/// 基础设施错误统一映射为 SERVER_ERROR
pub fn server_error_response(operation: &str, err: &KeywardError) -> HttpResponse {
    error!("{} failed: {}", operation, err.format_simple());
    json_response(
        ErrorCode::ServerError.status(),
        &ErrorBody::server_error(err.message()),
    )
}

/// 解析 JSON 请求体；格式错误时按空对象处理
pub fn parse_body_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    if body.is_empty() {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        trace!("Malformed JSON body treated as empty: {}", e);
        T::default()
    })
}

/// 解析查询字符串；格式错误时按空对象处理
pub fn parse_query_or_default<T: DeserializeOwned + Default>(req: &HttpRequest) -> T {
    web::Query::<T>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_else(|e| {
            trace!("Malformed query string treated as empty: {}", e);
            T::default()
        })
}
