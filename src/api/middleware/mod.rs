pub mod auth;
pub mod timing;

pub use auth::{ADMIN_TOKEN_HEADER, AdminAuth};
pub use timing::TimingMiddleware;
