//! Storage backends
//!
//! - `memory`: process-local map with clock-driven expiry
//! - `redis`: SET NX / SCAN / Lua-scripted compare-and-move

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;
