//! Per-namespace activation records
//!
//! Each record type has a fixed schema and a fixed [`Namespace`]; decoding
//! happens once, at the store boundary (see [`super::StateStore`]).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// 待兑换激活码的存活时间
pub const PENDING_TTL_SECS: u64 = 1800;
/// 激活租约时长
pub const ACTIVE_TTL_SECS: u64 = 86_400;
/// 踢出信号的存活时间
pub const KICK_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Pending,
    Active,
    Blacklist,
    Kick,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Pending => "pending",
            Namespace::Active => "active",
            Namespace::Blacklist => "blacklist",
            Namespace::Kick => "kick",
        }
    }

    /// Store-managed expiry; `None` means the record persists until deleted.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Namespace::Pending => Some(Duration::from_secs(PENDING_TTL_SECS)),
            Namespace::Active => Some(Duration::from_secs(ACTIVE_TTL_SECS)),
            Namespace::Blacklist => None,
            Namespace::Kick => Some(Duration::from_secs(KICK_TTL_SECS)),
        }
    }

    /// `"{namespace}:"`, the prefix every key of this namespace starts with
    pub fn key_prefix(&self) -> String {
        format!("{}:", self.as_str())
    }

    pub fn key_for(&self, hwid: &str) -> String {
        format!("{}:{}", self.as_str(), hwid)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record stored under exactly one namespace.
pub trait StateRecord: Serialize + DeserializeOwned + Send + Sync {
    const NAMESPACE: Namespace;
}

/// Issued but not yet redeemed key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingGrant {
    pub key: String,
    pub created_at: i64,
    pub paste_id: String,
    pub paste_url: String,
    /// Link handed to the end user (shortened paste URL, or the paste URL)
    pub delivery_url: String,
}

impl StateRecord for PendingGrant {
    const NAMESPACE: Namespace = Namespace::Pending;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLease {
    pub key: String,
    pub activated_at: i64,
    /// Absolute epoch milliseconds
    pub expires_at: i64,
}

impl ActiveLease {
    pub fn starting_at(key: String, activated_at: i64) -> Self {
        Self {
            key,
            activated_at,
            expires_at: activated_at + (ACTIVE_TTL_SECS as i64) * 1000,
        }
    }

    pub fn seconds_left(&self, now_millis: i64) -> u64 {
        seconds_until(self.expires_at, now_millis)
    }

    pub fn is_live(&self, now_millis: i64) -> bool {
        self.seconds_left(now_millis) > 0
    }
}

impl StateRecord for ActiveLease {
    const NAMESPACE: Namespace = Namespace::Active;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub reason: String,
    pub at: i64,
}

impl StateRecord for BlacklistEntry {
    const NAMESPACE: Namespace = Namespace::Blacklist;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickSignal {
    pub reason: String,
    pub at: i64,
}

impl StateRecord for KickSignal {
    const NAMESPACE: Namespace = Namespace::Kick;
}

/// `max(0, floor((deadline - now) / 1000))`
pub fn seconds_until(deadline_millis: i64, now_millis: i64) -> u64 {
    (deadline_millis.saturating_sub(now_millis).max(0) / 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_until_floors_and_clamps() {
        assert_eq!(seconds_until(10_999, 0), 10);
        assert_eq!(seconds_until(1_000, 1_000), 0);
        assert_eq!(seconds_until(500, 1_000), 0);
        assert_eq!(seconds_until(i64::MIN, i64::MAX), 0);
    }

    #[test]
    fn test_lease_window_is_exactly_one_day() {
        let lease = ActiveLease::starting_at("k".to_string(), 1_000);
        assert_eq!(lease.expires_at - lease.activated_at, 86_400_000);
        assert_eq!(lease.seconds_left(1_000), 86_400);
        assert!(lease.is_live(1_000));
        assert!(!lease.is_live(lease.expires_at));
    }

    #[test]
    fn test_pending_grant_wire_shape() {
        let grant = PendingGrant {
            key: "abc".to_string(),
            created_at: 42,
            paste_id: "Xy12".to_string(),
            paste_url: "https://paste.example/Xy12".to_string(),
            delivery_url: "https://s.example/q".to_string(),
        };
        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["createdAt"], 42);
        assert_eq!(json["pasteId"], "Xy12");
        assert_eq!(json["deliveryUrl"], "https://s.example/q");
    }

    #[test]
    fn test_namespace_keys_and_ttls() {
        assert_eq!(Namespace::Pending.key_for("ABC"), "pending:ABC");
        assert_eq!(Namespace::Kick.key_prefix(), "kick:");
        assert_eq!(Namespace::Blacklist.ttl(), None);
        assert_eq!(Namespace::Active.ttl(), Some(Duration::from_secs(86_400)));
    }
}
