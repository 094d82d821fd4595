//! Mode routing
//!
//! - Server mode (HTTP server, the default)
//! - CLI mode (admin and config commands)

pub mod server;

#[cfg(feature = "cli")]
pub mod cli;

pub use server::run_server;

#[cfg(feature = "cli")]
pub use cli::run_cli;
