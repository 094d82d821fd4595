//! Typed access to activation records

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::errors::{KeywardError, Result};
use crate::storage::{ActiveLease, KeyTtl, KvStore, PendingGrant, StateRecord};

const DEFAULT_SCAN_COUNT: usize = 100;

/// Opaque snapshot of a stored value, used for compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasToken(String);

/// Activation records on top of a raw [`KvStore`].
///
/// Keys are `"{namespace}:{hwid}"`; TTLs come from the record's namespace.
#[derive(Clone)]
pub struct StateStore {
    backend: Arc<dyn KvStore>,
    scan_count: usize,
}

impl StateStore {
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            backend,
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    pub fn with_scan_count(mut self, scan_count: usize) -> Self {
        self.scan_count = scan_count.max(1);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }

    fn decode<R: StateRecord>(hwid: &str, raw: &str) -> Result<R> {
        serde_json::from_str(raw).map_err(|e| {
            warn!("Corrupt {} record for '{}': {}", R::NAMESPACE, hwid, e);
            KeywardError::serialization(format!(
                "corrupt {} record for '{}': {}",
                R::NAMESPACE,
                hwid,
                e
            ))
        })
    }

    fn encode<R: StateRecord>(record: &R) -> Result<String> {
        Ok(serde_json::to_string(record)?)
    }

    pub async fn get<R: StateRecord>(&self, hwid: &str) -> Result<Option<R>> {
        Ok(self.get_with_token::<R>(hwid).await?.map(|(record, _)| record))
    }

    /// Reads a record together with a token identifying this exact version.
    pub async fn get_with_token<R: StateRecord>(
        &self,
        hwid: &str,
    ) -> Result<Option<(R, CasToken)>> {
        let key = R::NAMESPACE.key_for(hwid);
        match self.backend.get(&key).await? {
            Some(raw) => {
                let record = Self::decode::<R>(hwid, &raw)?;
                Ok(Some((record, CasToken(raw))))
            }
            None => Ok(None),
        }
    }

    pub async fn put<R: StateRecord>(&self, hwid: &str, record: &R) -> Result<()> {
        let key = R::NAMESPACE.key_for(hwid);
        let raw = Self::encode(record)?;
        self.backend.set(&key, &raw, R::NAMESPACE.ttl()).await
    }

    /// Writes only if no live record exists. Returns whether it was written.
    pub async fn put_if_absent<R: StateRecord>(&self, hwid: &str, record: &R) -> Result<bool> {
        let key = R::NAMESPACE.key_for(hwid);
        let raw = Self::encode(record)?;
        self.backend
            .set_if_absent(&key, &raw, R::NAMESPACE.ttl())
            .await
    }

    pub async fn remove<R: StateRecord>(&self, hwid: &str) -> Result<bool> {
        self.backend.delete(&R::NAMESPACE.key_for(hwid)).await
    }

    pub async fn ttl<R: StateRecord>(&self, hwid: &str) -> Result<KeyTtl> {
        self.backend.ttl(&R::NAMESPACE.key_for(hwid)).await
    }

    /// Consumes the pending grant identified by `token` and writes `lease`,
    /// atomically. `false` means the grant changed or vanished since it was read.
    pub async fn promote(&self, hwid: &str, token: &CasToken, lease: &ActiveLease) -> Result<bool> {
        let raw = Self::encode(lease)?;
        self.backend
            .compare_and_move(
                &PendingGrant::NAMESPACE.key_for(hwid),
                &token.0,
                &ActiveLease::NAMESPACE.key_for(hwid),
                &raw,
                ActiveLease::NAMESPACE.ttl(),
            )
            .await
    }

    /// Every HWID holding a record in `R`'s namespace, via a full cursor scan.
    pub async fn scan_hwids<R: StateRecord>(&self) -> Result<Vec<String>> {
        let prefix = R::NAMESPACE.key_prefix();
        let mut hwids = BTreeSet::new();
        let mut cursor = 0u64;
        let mut pages = 0usize;

        loop {
            let page = self.backend.scan(&prefix, cursor, self.scan_count).await?;
            pages += 1;
            hwids.extend(
                page.keys
                    .iter()
                    .filter_map(|k| k.strip_prefix(&prefix))
                    .filter(|hwid| !hwid.is_empty())
                    .map(str::to_string),
            );
            if page.next_cursor == 0 {
                break;
            }
            cursor = page.next_cursor;
        }

        trace!(
            "Scanned {} namespace: {} HWIDs in {} pages",
            R::NAMESPACE,
            hwids.len(),
            pages
        );
        Ok(hwids.into_iter().collect())
    }
}
