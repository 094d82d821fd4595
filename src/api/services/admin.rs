//! `/admin` routes, guarded by [`crate::api::middleware::AdminAuth`]

use actix_web::{HttpRequest, Responder, web};
use std::sync::Arc;

use crate::api::error_code::ErrorCode;
use crate::api::helpers::{
    error_response, parse_body_or_default, parse_query_or_default, server_error_response,
    success_response,
};
use crate::api::types::{Ack, ActivesBody, HwidActionRequest, HwidQuery};
use crate::services::AdminService;
use crate::utils::non_blank;

pub struct AdminApi;

impl AdminApi {
    pub async fn list_actives(service: web::Data<Arc<AdminService>>) -> impl Responder {
        match service.list_actives().await {
            Ok(items) => success_response(ActivesBody {
                count: items.len(),
                items,
            }),
            Err(e) => server_error_response("list-actives", &e),
        }
    }

    pub async fn blacklist(
        body: web::Bytes,
        service: web::Data<Arc<AdminService>>,
    ) -> impl Responder {
        let request: HwidActionRequest = parse_body_or_default(&body);
        let Some(hwid) = non_blank(request.hwid.as_deref()) else {
            return error_response(ErrorCode::MissingHwid);
        };

        match service.blacklist(hwid, request.reason.as_deref()).await {
            Ok(_) => success_response(Ack {}),
            Err(e) => server_error_response("blacklist", &e),
        }
    }

    pub async fn unblacklist(
        body: web::Bytes,
        service: web::Data<Arc<AdminService>>,
    ) -> impl Responder {
        let request: HwidActionRequest = parse_body_or_default(&body);
        let Some(hwid) = non_blank(request.hwid.as_deref()) else {
            return error_response(ErrorCode::MissingHwid);
        };

        match service.unblacklist(hwid).await {
            Ok(_) => success_response(Ack {}),
            Err(e) => server_error_response("unblacklist", &e),
        }
    }

    pub async fn kick(
        body: web::Bytes,
        service: web::Data<Arc<AdminService>>,
    ) -> impl Responder {
        let request: HwidActionRequest = parse_body_or_default(&body);
        let Some(hwid) = non_blank(request.hwid.as_deref()) else {
            return error_response(ErrorCode::MissingHwid);
        };

        match service.kick(hwid, request.reason.as_deref()).await {
            Ok(_) => success_response(Ack {}),
            Err(e) => server_error_response("kick", &e),
        }
    }

    pub async fn inspect(
        req: HttpRequest,
        service: web::Data<Arc<AdminService>>,
    ) -> impl Responder {
        let query: HwidQuery = parse_query_or_default(&req);
        let Some(hwid) = non_blank(query.hwid.as_deref()) else {
            return error_response(ErrorCode::MissingHwid);
        };

        match service.inspect(hwid).await {
            Ok(snapshot) => success_response(snapshot),
            Err(e) => server_error_response("inspect", &e),
        }
    }
}

/// 管理路由（挂载在 `/admin` 下）
pub fn admin_routes() -> actix_web::Scope {
    web::scope("/admin")
        .route("/actives", web::get().to(AdminApi::list_actives))
        .route("/blacklist", web::post().to(AdminApi::blacklist))
        .route("/unblacklist", web::post().to(AdminApi::unblacklist))
        .route("/kick", web::post().to(AdminApi::kick))
        .route("/hwid", web::get().to(AdminApi::inspect))
}
