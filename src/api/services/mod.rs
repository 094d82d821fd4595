pub mod activation;
pub mod admin;
pub mod health;

pub use activation::{ActivationApi, activation_routes};
pub use admin::{AdminApi, admin_routes};
pub use health::{AppStartTime, HealthService, health_routes};
