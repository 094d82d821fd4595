//! HTTP surface: routes, middleware and wire types

use actix_web::web;
use std::sync::Arc;

use crate::services::{ActivationService, AdminService};
use crate::storage::StateStore;

pub mod error_code;
pub mod helpers;
pub mod middleware;
pub mod services;
pub mod types;

pub use error_code::ErrorCode;

use middleware::AdminAuth;
use services::{AppStartTime, activation_routes, admin_routes, health_routes};

/// Everything the handlers need, shared by all workers
#[derive(Clone)]
pub struct ApiContext {
    pub activation: Arc<ActivationService>,
    pub admin: Arc<AdminService>,
    pub store: StateStore,
    pub started: AppStartTime,
    pub admin_token: Arc<str>,
}

impl ApiContext {
    /// Registers app data and every route (`/v1`, `/admin`, `/health`).
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.activation.clone()))
            .app_data(web::Data::new(self.admin.clone()))
            .app_data(web::Data::new(self.store.clone()))
            .app_data(web::Data::new(self.started.clone()))
            .service(activation_routes())
            .service(admin_routes().wrap(AdminAuth::new(&*self.admin_token)))
            .service(health_routes());
    }
}
