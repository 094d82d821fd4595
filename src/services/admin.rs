//! Admin control plane
//!
//! Shared by the `/admin` HTTP routes and the CLI admin commands.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::errors::Result;
use crate::storage::{
    ActiveLease, BlacklistEntry, KeyTtl, KickSignal, PendingGrant, StateRecord, StateStore,
};

pub const DEFAULT_BLACKLIST_REASON: &str = "blacklisted";
pub const DEFAULT_KICK_REASON: &str = "kicked";

/// One row of `list_actives`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveItem {
    pub hwid: String,
    pub seconds_left: u64,
    pub expires_at: i64,
    pub activated_at: i64,
}

/// A stored record with the store-reported remaining TTL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracked<R> {
    #[serde(flatten)]
    pub record: R,
    /// `None` for records without expiry
    pub ttl_secs: Option<u64>,
}

/// Read-only view of everything stored for one HWID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HwidSnapshot {
    pub hwid: String,
    pub pending: Option<Tracked<PendingGrant>>,
    pub active: Option<Tracked<ActiveLease>>,
    pub blacklist: Option<Tracked<BlacklistEntry>>,
    pub kick: Option<Tracked<KickSignal>>,
}

impl HwidSnapshot {
    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
            && self.active.is_none()
            && self.blacklist.is_none()
            && self.kick.is_none()
    }
}

fn reason_or(reason: Option<&str>, default: &str) -> String {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(default)
        .to_string()
}

pub struct AdminService {
    store: StateStore,
    clock: Arc<dyn Clock>,
}

impl AdminService {
    pub fn new(store: StateStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Every lease with time left, longest remaining first.
    pub async fn list_actives(&self) -> Result<Vec<ActiveItem>> {
        let hwids = self.store.scan_hwids::<ActiveLease>().await?;
        let now = self.clock.now_millis();

        let mut items = Vec::with_capacity(hwids.len());
        for hwid in hwids {
            let lease = match self.store.get::<ActiveLease>(&hwid).await {
                Ok(Some(lease)) => lease,
                // 扫描后过期
                Ok(None) => continue,
                Err(e) => {
                    warn!("list-actives: skipping '{}': {}", hwid, e);
                    continue;
                }
            };
            let seconds_left = lease.seconds_left(now);
            if seconds_left == 0 {
                continue;
            }
            items.push(ActiveItem {
                hwid,
                seconds_left,
                expires_at: lease.expires_at,
                activated_at: lease.activated_at,
            });
        }

        items.sort_by(|a, b| {
            b.seconds_left
                .cmp(&a.seconds_left)
                .then_with(|| a.hwid.cmp(&b.hwid))
        });
        Ok(items)
    }

    /// Bans `hwid`: clears pending and active state and signals a kick.
    pub async fn blacklist(&self, hwid: &str, reason: Option<&str>) -> Result<BlacklistEntry> {
        let entry = BlacklistEntry {
            reason: reason_or(reason, DEFAULT_BLACKLIST_REASON),
            at: self.clock.now_millis(),
        };

        self.store.put(hwid, &entry).await?;
        let dropped_pending = self.store.remove::<PendingGrant>(hwid).await?;
        let dropped_active = self.store.remove::<ActiveLease>(hwid).await?;
        self.store
            .put(
                hwid,
                &KickSignal {
                    reason: entry.reason.clone(),
                    at: entry.at,
                },
            )
            .await?;

        info!(
            "Blacklisted '{}' ({}); pending dropped: {}, lease dropped: {}",
            hwid, entry.reason, dropped_pending, dropped_active
        );
        Ok(entry)
    }

    /// Returns whether an entry was removed.
    pub async fn unblacklist(&self, hwid: &str) -> Result<bool> {
        let removed = self.store.remove::<BlacklistEntry>(hwid).await?;
        info!("Unblacklisted '{}' (was listed: {})", hwid, removed);
        Ok(removed)
    }

    /// Signals a disconnect without touching any other state.
    pub async fn kick(&self, hwid: &str, reason: Option<&str>) -> Result<KickSignal> {
        let signal = KickSignal {
            reason: reason_or(reason, DEFAULT_KICK_REASON),
            at: self.clock.now_millis(),
        };
        self.store.put(hwid, &signal).await?;
        info!("Kicked '{}' ({})", hwid, signal.reason);
        Ok(signal)
    }

    pub async fn inspect(&self, hwid: &str) -> Result<HwidSnapshot> {
        Ok(HwidSnapshot {
            hwid: hwid.to_string(),
            pending: self.tracked::<PendingGrant>(hwid).await?,
            active: self.tracked::<ActiveLease>(hwid).await?,
            blacklist: self.tracked::<BlacklistEntry>(hwid).await?,
            kick: self.tracked::<KickSignal>(hwid).await?,
        })
    }

    async fn tracked<R: StateRecord>(&self, hwid: &str) -> Result<Option<Tracked<R>>> {
        let Some(record) = self.store.get::<R>(hwid).await? else {
            return Ok(None);
        };
        let ttl_secs = match self.store.ttl::<R>(hwid).await? {
            KeyTtl::Expires(left) => Some(left.as_secs()),
            KeyTtl::Persistent => None,
            // 读取后恰好过期
            KeyTtl::Missing => return Ok(None),
        };
        Ok(Some(Tracked { record, ttl_secs }))
    }
}
