use actix_web::http::StatusCode;
use actix_web::{Responder, web};
use std::time::{Duration, Instant};
use tracing::{error, trace};

use crate::api::helpers::json_response;
use crate::api::types::HealthBody;
use crate::storage::StateStore;

/// 存储探活超时
const STORE_PING_TIMEOUT: Duration = Duration::from_secs(5);

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        (chrono::Utc::now() - self.start_datetime)
            .num_seconds()
            .max(0) as u64
    }
}

pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        store: web::Data<StateStore>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let error = match tokio::time::timeout(STORE_PING_TIMEOUT, store.ping()).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                error!("Store health check failed: {}", e);
                Some(e.message().to_string())
            }
            Err(_) => {
                error!("Store health check timeout");
                Some("timeout".to_string())
            }
        };

        let body = HealthBody {
            ok: error.is_none(),
            store: store.backend_name(),
            uptime_secs: app_start_time.uptime_secs(),
            error,
        };
        let status = if body.ok {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        trace!(
            "Health check completed in {:?}, ok: {}",
            start_time.elapsed(),
            body.ok
        );
        json_response(status, &body)
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
}
