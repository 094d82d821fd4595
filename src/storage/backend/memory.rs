use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use crate::clock::Clock;
use crate::errors::Result;
use crate::storage::{KeyTtl, KvStore, ScanPage};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    /// Absolute epoch milliseconds
    expires_at: Option<i64>,
    /// Write order, the scan cursor resumes from it
    seq: u64,
}

impl MemoryEntry {
    fn new(value: &str, ttl: Option<Duration>, now: i64, seq: u64) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| now + ttl.as_millis() as i64),
            seq,
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process TTL store.
///
/// A single lock guards the whole map, which makes every multi-key primitive
/// (`set_if_absent`, `compare_and_move`) trivially atomic. Expiry is lazy:
/// dead entries are dropped when touched or scanned.
///
/// Scan cursors are write sequence numbers rather than positions, so removing
/// keys between pages never makes a later page skip a live key.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    next_seq: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            clock,
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now_millis();
        self.entries
            .lock()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, value: &str, ttl: Option<Duration>, now: i64) -> MemoryEntry {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        MemoryEntry::new(value, ttl, now, seq)
    }

    fn live_value<'a>(
        entries: &'a mut HashMap<String, MemoryEntry>,
        key: &str,
        now: i64,
    ) -> Option<&'a MemoryEntry> {
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            trace!("MemoryStore: dropping expired key {}", key);
            entries.remove(key);
        }
        entries.get(key)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        Ok(Self::live_value(&mut entries, key, now).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        let entry = self.entry(value, ttl, now);
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        if Self::live_value(&mut entries, key, now).is_some() {
            return Ok(false);
        }
        let entry = self.entry(value, ttl, now);
        entries.insert(key.to_string(), entry);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        Ok(entries.remove(key).is_some_and(|e| !e.is_expired(now)))
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        Ok(match Self::live_value(&mut entries, key, now) {
            None => KeyTtl::Missing,
            Some(MemoryEntry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(MemoryEntry {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Expires(Duration::from_secs(((at - now).max(0) / 1000) as u64)),
        })
    }

    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<ScanPage> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        entries.retain(|_, e| !e.is_expired(now));

        // 按写入序号排序，cursor 为下一页的起始序号
        let mut matching: Vec<(u64, &String)> = entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.seq >= cursor)
            .map(|(k, e)| (e.seq, k))
            .collect();
        matching.sort_unstable();

        let end = count.max(1).min(matching.len());
        let page: Vec<String> = matching[..end].iter().map(|(_, k)| (*k).clone()).collect();
        let next_cursor = match matching.get(end) {
            Some((seq, _)) => *seq,
            None => 0,
        };

        Ok(ScanPage {
            next_cursor,
            keys: page,
        })
    }

    async fn compare_and_move(
        &self,
        from: &str,
        expected: &str,
        to: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        match Self::live_value(&mut entries, from, now) {
            Some(current) if current.value == expected => {}
            _ => return Ok(false),
        }
        entries.remove(from);
        let entry = self.entry(value, ttl, now);
        entries.insert(to.to_string(), entry);
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store() -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let store = MemoryStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_entries_expire_with_the_clock() {
        let (clock, store) = store();
        store
            .set("kick:a", "v", Some(Duration::from_secs(300)))
            .await
            .unwrap();

        clock.advance_secs(299);
        assert_eq!(store.get("kick:a").await.unwrap().as_deref(), Some("v"));
        assert_eq!(
            store.ttl("kick:a").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(1))
        );

        clock.advance_secs(1);
        assert_eq!(store.get("kick:a").await.unwrap(), None);
        assert_eq!(store.ttl("kick:a").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_persistent_entries() {
        let (clock, store) = store();
        store.set("blacklist:a", "v", None).await.unwrap();
        clock.advance_secs(10 * 365 * 86_400);
        assert_eq!(store.ttl("blacklist:a").await.unwrap(), KeyTtl::Persistent);
        assert!(store.delete("blacklist:a").await.unwrap());
        assert!(!store.delete("blacklist:a").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_if_absent_respects_live_and_expired_entries() {
        let (clock, store) = store();
        let ttl = Some(Duration::from_secs(10));
        assert!(store.set_if_absent("pending:a", "one", ttl).await.unwrap());
        assert!(!store.set_if_absent("pending:a", "two", ttl).await.unwrap());
        assert_eq!(store.get("pending:a").await.unwrap().as_deref(), Some("one"));

        clock.advance_secs(10);
        assert!(store.set_if_absent("pending:a", "three", ttl).await.unwrap());
        assert_eq!(
            store.get("pending:a").await.unwrap().as_deref(),
            Some("three")
        );
    }

    #[tokio::test]
    async fn test_compare_and_move() {
        let (_clock, store) = store();
        store.set("pending:a", "grant", None).await.unwrap();

        assert!(
            !store
                .compare_and_move("pending:a", "other", "active:a", "lease", None)
                .await
                .unwrap()
        );
        assert_eq!(store.get("active:a").await.unwrap(), None);

        assert!(
            store
                .compare_and_move("pending:a", "grant", "active:a", "lease", None)
                .await
                .unwrap()
        );
        assert_eq!(store.get("pending:a").await.unwrap(), None);
        assert_eq!(store.get("active:a").await.unwrap().as_deref(), Some("lease"));

        // 源 key 已被消费，第二次必然失败
        assert!(
            !store
                .compare_and_move("pending:a", "grant", "active:a", "lease2", None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_scan_pages_until_cursor_returns_to_zero() {
        let (_clock, store) = store();
        for i in 0..5 {
            store.set(&format!("active:h{i}"), "x", None).await.unwrap();
        }
        store.set("pending:h0", "x", None).await.unwrap();

        let mut cursor = 0;
        let mut seen = Vec::new();
        loop {
            let page = store.scan("active:", cursor, 2).await.unwrap();
            assert!(page.keys.len() <= 2);
            seen.extend(page.keys);
            if page.next_cursor == 0 {
                break;
            }
            cursor = page.next_cursor;
        }

        assert_eq!(
            seen,
            vec!["active:h0", "active:h1", "active:h2", "active:h3", "active:h4"]
        );
    }

    #[tokio::test]
    async fn test_scan_skips_expired() {
        let (clock, store) = store();
        store
            .set("active:old", "x", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        store.set("active:new", "x", None).await.unwrap();
        clock.advance_secs(2);

        let page = store.scan("active:", 0, 100).await.unwrap();
        assert_eq!(page.keys, vec!["active:new"]);
        assert_eq!(page.next_cursor, 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_survives_removal_between_pages() {
        let (clock, store) = store();
        for hwid in ["a", "b", "c", "d", "e"] {
            store.set(&format!("active:{hwid}"), "x", None).await.unwrap();
        }
        store
            .set("active:f", "x", Some(Duration::from_secs(5)))
            .await
            .unwrap();

        let first = store.scan("active:", 0, 2).await.unwrap();
        assert_eq!(first.keys, vec!["active:a", "active:b"]);

        // 翻页之间删除与过期都不能让后续 key 被跳过
        assert!(store.delete("active:a").await.unwrap());
        clock.advance_secs(5);

        let mut seen = first.keys;
        let mut cursor = first.next_cursor;
        while cursor != 0 {
            let page = store.scan("active:", cursor, 2).await.unwrap();
            seen.extend(page.keys);
            cursor = page.next_cursor;
        }

        assert_eq!(
            seen,
            vec!["active:a", "active:b", "active:c", "active:d", "active:e"]
        );
    }
}
