//! Activation state machine
//!
//! Per HWID: `NONE -> PENDING -> ACTIVE -> (expired) NONE`, with a blacklist
//! entry absorbing every other state until an admin clears it.
//!
//! The store is the only synchronisation point. Pending creation goes through
//! `put_if_absent` and redemption through `promote` (compare-and-move), so
//! concurrent requests for one HWID never mint two live grants or redeem one
//! grant twice.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::errors::{KeywardError, Result};
use crate::services::delivery::{DeliveryChannel, KeyNote};
use crate::storage::{
    ActiveLease, BlacklistEntry, KeyTtl, KickSignal, PENDING_TTL_SECS, PendingGrant, StateStore,
};
use crate::utils::generate_activation_key;

/// get-key 在并发竞争中最多重试的轮数
const MAX_ISSUE_ATTEMPTS: usize = 3;

// ============ Outcomes ============

/// Remaining lifetime of an active lease at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseView {
    pub activated_at: i64,
    pub expires_at: i64,
    pub seconds_left: u64,
}

impl LeaseView {
    pub fn of(lease: &ActiveLease, now_millis: i64) -> Self {
        Self {
            activated_at: lease.activated_at,
            expires_at: lease.expires_at,
            seconds_left: lease.seconds_left(now_millis),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetKeyOutcome {
    Blacklisted(BlacklistEntry),
    /// A live lease exists; no key was minted
    Active(LeaseView),
    /// Same link as the call that created the grant
    PendingExists { link: String, ttl_secs: u64 },
    PendingCreated { link: String, ttl_secs: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Blacklisted(BlacklistEntry),
    AlreadyActive(LeaseView),
    Activated(LeaseView),
    NoPendingKey,
    /// Wrong key; the pending grant is left untouched
    InvalidKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseStatus {
    pub valid: bool,
    pub seconds_left: u64,
    pub expires_at: Option<i64>,
}

impl LeaseStatus {
    pub fn none() -> Self {
        Self {
            valid: false,
            seconds_left: 0,
            expires_at: None,
        }
    }

    fn of(lease: Option<&ActiveLease>, now_millis: i64) -> Self {
        match lease {
            Some(lease) => {
                let seconds_left = lease.seconds_left(now_millis);
                Self {
                    valid: seconds_left > 0,
                    seconds_left,
                    expires_at: Some(lease.expires_at),
                }
            }
            None => Self::none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Blacklisted(BlacklistEntry),
    Lease(LeaseStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Blacklisted(BlacklistEntry),
    Lease {
        status: LeaseStatus,
        kick: Option<KickSignal>,
    },
}

// ============ ActivationService ============

pub struct ActivationService {
    store: StateStore,
    delivery: DeliveryChannel,
    clock: Arc<dyn Clock>,
}

impl ActivationService {
    pub fn new(store: StateStore, delivery: DeliveryChannel, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            delivery,
            clock,
        }
    }

    async fn blacklist_entry(&self, hwid: &str) -> Result<Option<BlacklistEntry>> {
        self.store.get::<BlacklistEntry>(hwid).await
    }

    /// The active lease, only if it still has time left at `now_millis`
    async fn live_lease(&self, hwid: &str, now_millis: i64) -> Result<Option<ActiveLease>> {
        Ok(self
            .store
            .get::<ActiveLease>(hwid)
            .await?
            .filter(|lease| lease.is_live(now_millis)))
    }

    /// Issues a key for `hwid`, or reports the state that prevents it.
    ///
    /// Repeated calls while a grant is pending return the same link.
    pub async fn get_key(&self, hwid: &str) -> Result<GetKeyOutcome> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            if let Some(entry) = self.blacklist_entry(hwid).await? {
                debug!("get-key '{}': blacklisted ({})", hwid, entry.reason);
                return Ok(GetKeyOutcome::Blacklisted(entry));
            }

            let now = self.clock.now_millis();
            if let Some(lease) = self.live_lease(hwid, now).await? {
                return Ok(GetKeyOutcome::Active(LeaseView::of(&lease, now)));
            }

            if let Some(grant) = self.store.get::<PendingGrant>(hwid).await? {
                let ttl_secs = match self.store.ttl::<PendingGrant>(hwid).await? {
                    KeyTtl::Expires(left) => left.as_secs(),
                    KeyTtl::Persistent => PENDING_TTL_SECS,
                    // 读到记录后恰好过期，重新走一遍
                    KeyTtl::Missing => continue,
                };
                return Ok(GetKeyOutcome::PendingExists {
                    link: grant.delivery_url,
                    ttl_secs,
                });
            }

            let grant = self.mint(hwid).await?;
            if self.store.put_if_absent(hwid, &grant).await? {
                // blacklist written between the first check and the insert
                if let Some(entry) = self.blacklist_entry(hwid).await? {
                    self.store.remove::<PendingGrant>(hwid).await?;
                    warn!("get-key '{}': blacklisted during issuance, grant dropped", hwid);
                    return Ok(GetKeyOutcome::Blacklisted(entry));
                }

                info!(
                    "Issued activation key for '{}' (paste {})",
                    hwid, grant.paste_id
                );
                return Ok(GetKeyOutcome::PendingCreated {
                    link: grant.delivery_url,
                    ttl_secs: PENDING_TTL_SECS,
                });
            }

            warn!(
                "get-key '{}': lost issuance race (attempt {}), discarding paste {}",
                hwid, attempt, grant.paste_id
            );
        }

        Err(KeywardError::conflict(format!(
            "state of '{}' kept changing during issuance",
            hwid
        )))
    }

    /// Mints a key and publishes it. Nothing is stored yet.
    async fn mint(&self, hwid: &str) -> Result<PendingGrant> {
        let key = generate_activation_key();
        let issued_at = self.clock.now();
        let delivery = self
            .delivery
            .deliver(&KeyNote::for_key(hwid, &key, issued_at))
            .await?;

        Ok(PendingGrant {
            key,
            created_at: issued_at.timestamp_millis(),
            paste_id: delivery.paste_id,
            paste_url: delivery.paste_url,
            delivery_url: delivery.delivery_url,
        })
    }

    /// Trades the pending key for a one-day lease.
    pub async fn redeem(&self, hwid: &str, key: &str) -> Result<RedeemOutcome> {
        if let Some(entry) = self.blacklist_entry(hwid).await? {
            return Ok(RedeemOutcome::Blacklisted(entry));
        }

        let now = self.clock.now_millis();
        if let Some(lease) = self.live_lease(hwid, now).await? {
            return Ok(RedeemOutcome::AlreadyActive(LeaseView::of(&lease, now)));
        }

        let Some((grant, token)) = self.store.get_with_token::<PendingGrant>(hwid).await? else {
            return Ok(RedeemOutcome::NoPendingKey);
        };

        if !keys_match(&grant.key, key) {
            warn!("redeem '{}': key mismatch", hwid);
            return Ok(RedeemOutcome::InvalidKey);
        }

        let lease = ActiveLease::starting_at(grant.key, now);
        if !self.store.promote(hwid, &token, &lease).await? {
            // 并发兑换、拉黑，或 grant 恰好过期
            if let Some(entry) = self.blacklist_entry(hwid).await? {
                return Ok(RedeemOutcome::Blacklisted(entry));
            }
            let now = self.clock.now_millis();
            return Ok(match self.live_lease(hwid, now).await? {
                Some(current) => RedeemOutcome::AlreadyActive(LeaseView::of(&current, now)),
                None => RedeemOutcome::NoPendingKey,
            });
        }

        if let Some(entry) = self.blacklist_entry(hwid).await? {
            self.store.remove::<ActiveLease>(hwid).await?;
            warn!("redeem '{}': blacklisted during promotion, lease dropped", hwid);
            return Ok(RedeemOutcome::Blacklisted(entry));
        }

        info!("Activated '{}' until {}", hwid, lease.expires_at);
        Ok(RedeemOutcome::Activated(LeaseView::of(&lease, now)))
    }

    pub async fn status(&self, hwid: &str) -> Result<StatusOutcome> {
        if let Some(entry) = self.blacklist_entry(hwid).await? {
            return Ok(StatusOutcome::Blacklisted(entry));
        }
        Ok(StatusOutcome::Lease(self.lease_status(hwid).await?))
    }

    /// Status plus the current kick signal. Reading never clears the signal.
    pub async fn poll(&self, hwid: &str) -> Result<PollOutcome> {
        if let Some(entry) = self.blacklist_entry(hwid).await? {
            return Ok(PollOutcome::Blacklisted(entry));
        }
        let status = self.lease_status(hwid).await?;
        let kick = self.store.get::<KickSignal>(hwid).await?;
        Ok(PollOutcome::Lease { status, kick })
    }

    async fn lease_status(&self, hwid: &str) -> Result<LeaseStatus> {
        let lease = self.store.get::<ActiveLease>(hwid).await?;
        Ok(LeaseStatus::of(lease.as_ref(), self.clock.now_millis()))
    }
}

fn keys_match(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}
