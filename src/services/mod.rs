//! Service layer for business logic
//!
//! Shared between the HTTP API and the CLI admin commands.

mod activation;
mod admin;
pub mod delivery;

pub use activation::*;
pub use admin::*;
