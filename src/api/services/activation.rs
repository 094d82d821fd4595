//! Client-facing `/v1` routes

use actix_web::{HttpRequest, Responder, web};
use std::sync::Arc;
use tracing::trace;

use crate::api::error_code::ErrorCode;
use crate::api::helpers::{
    blacklisted_response, error_response, parse_body_or_default, parse_query_or_default,
    server_error_response, success_response,
};
use crate::api::types::{GetKeyBody, HwidQuery, PollBody, RedeemBody, RedeemRequest, StatusBody};
use crate::services::{
    ActivationService, GetKeyOutcome, PollOutcome, RedeemOutcome, StatusOutcome,
};
use crate::utils::non_blank;

pub struct ActivationApi;

impl ActivationApi {
    pub async fn get_key(
        req: HttpRequest,
        service: web::Data<Arc<ActivationService>>,
    ) -> impl Responder {
        let query: HwidQuery = parse_query_or_default(&req);
        let Some(hwid) = non_blank(query.hwid.as_deref()) else {
            return error_response(ErrorCode::MissingHwid);
        };
        trace!("GET getkey for '{}'", hwid);

        match service.get_key(hwid).await {
            Ok(GetKeyOutcome::Blacklisted(entry)) => blacklisted_response(&entry),
            Ok(GetKeyOutcome::Active(lease)) => success_response(GetKeyBody::Active {
                seconds_left: lease.seconds_left,
                expires_at: lease.expires_at,
            }),
            Ok(GetKeyOutcome::PendingExists { link, ttl_secs }) => {
                success_response(GetKeyBody::PendingExists {
                    link,
                    ttl: ttl_secs,
                })
            }
            Ok(GetKeyOutcome::PendingCreated { link, ttl_secs }) => {
                success_response(GetKeyBody::PendingCreated {
                    link,
                    ttl: ttl_secs,
                })
            }
            Err(e) => server_error_response("get-key", &e),
        }
    }

    pub async fn redeem(
        body: web::Bytes,
        service: web::Data<Arc<ActivationService>>,
    ) -> impl Responder {
        let request: RedeemRequest = parse_body_or_default(&body);
        let (Some(hwid), Some(key)) = (
            non_blank(request.hwid.as_deref()),
            non_blank(request.key.as_deref()),
        ) else {
            return error_response(ErrorCode::MissingHwidOrKey);
        };

        match service.redeem(hwid, key).await {
            Ok(RedeemOutcome::Blacklisted(entry)) => blacklisted_response(&entry),
            Ok(RedeemOutcome::AlreadyActive(lease)) => success_response(RedeemBody::AlreadyActive {
                seconds_left: lease.seconds_left,
                expires_at: lease.expires_at,
            }),
            Ok(RedeemOutcome::Activated(lease)) => success_response(RedeemBody::Activated {
                expires_at: lease.expires_at,
                seconds_left: lease.seconds_left,
            }),
            Ok(RedeemOutcome::NoPendingKey) => error_response(ErrorCode::NoPendingKey),
            Ok(RedeemOutcome::InvalidKey) => error_response(ErrorCode::InvalidKey),
            Err(e) => server_error_response("redeem", &e),
        }
    }

    pub async fn status(
        req: HttpRequest,
        service: web::Data<Arc<ActivationService>>,
    ) -> impl Responder {
        let query: HwidQuery = parse_query_or_default(&req);
        let Some(hwid) = non_blank(query.hwid.as_deref()) else {
            return error_response(ErrorCode::MissingHwid);
        };

        match service.status(hwid).await {
            Ok(StatusOutcome::Blacklisted(entry)) => blacklisted_response(&entry),
            Ok(StatusOutcome::Lease(status)) => success_response(StatusBody::from(status)),
            Err(e) => server_error_response("status", &e),
        }
    }

    pub async fn poll(
        req: HttpRequest,
        service: web::Data<Arc<ActivationService>>,
    ) -> impl Responder {
        let query: HwidQuery = parse_query_or_default(&req);
        let Some(hwid) = non_blank(query.hwid.as_deref()) else {
            return error_response(ErrorCode::MissingHwid);
        };

        match service.poll(hwid).await {
            Ok(PollOutcome::Blacklisted(entry)) => blacklisted_response(&entry),
            Ok(PollOutcome::Lease { status, kick }) => success_response(PollBody {
                status: status.into(),
                kick,
            }),
            Err(e) => server_error_response("poll", &e),
        }
    }
}

/// 客户端路由 `/v1`
///
/// 包含：
/// - GET /v1/getkey?hwid= - 签发或查询激活码
/// - POST /v1/redeem - 兑换激活码
/// - GET /v1/status?hwid= - 查询租约状态
/// - GET /v1/poll?hwid= - 状态 + 踢出信号
pub fn activation_routes() -> actix_web::Scope {
    web::scope("/v1")
        .route("/getkey", web::get().to(ActivationApi::get_key))
        .route("/redeem", web::post().to(ActivationApi::redeem))
        .route("/status", web::get().to(ActivationApi::status))
        .route("/poll", web::get().to(ActivationApi::poll))
}
