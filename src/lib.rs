//! keyward - HWID-bound activation key service
//!
//! Issues short-lived activation keys bound to a client hardware identifier,
//! trades them for 24-hour leases, and lets an admin blacklist or kick any
//! identifier.
//!
//! # Features
//! - **cli**: Admin and config commands (default); `serve` is always built
//!
//! # Architecture
//! - `storage`: TTL key-value backends (memory, Redis) and typed records
//! - `services`: activation state machine, admin control plane, key delivery
//! - `api`: HTTP routes and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
