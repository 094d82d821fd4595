//! Shared fixtures: memory store, manual clock and fake delivery providers.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use keyward::api::ApiContext;
use keyward::api::services::AppStartTime;
use keyward::clock::ManualClock;
use keyward::errors::{KeywardError, Result};
use keyward::services::delivery::{DeliveryChannel, LinkShortener, PasteHost, PublishedPaste};
use keyward::services::{ActivationService, AdminService};
use keyward::storage::{MemoryStore, PendingGrant, StateStore};

pub const START_MILLIS: i64 = 1_700_000_000_000;
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Paste host that keeps every note and hands out sequential ids.
#[derive(Default)]
pub struct FakePaste {
    pub bodies: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    /// Artificial latency, widens race windows in concurrency tests
    pub delay: Mutex<Option<Duration>>,
}

impl FakePaste {
    pub fn published(&self) -> usize {
        self.bodies.lock().len()
    }
}

#[async_trait]
impl PasteHost for FakePaste {
    async fn publish(&self, _title: &str, body: &str) -> Result<PublishedPaste> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(KeywardError::delivery("paste host unavailable"));
        }

        let mut bodies = self.bodies.lock();
        bodies.push(body.to_string());
        let id = format!("P{:04}", bodies.len());
        Ok(PublishedPaste {
            url: format!("https://paste.test/{}", id),
            id,
        })
    }

    fn name(&self) -> &'static str {
        "fake-paste"
    }
}

/// Shortener mapping `https://paste.test/X` to `https://s.test/X`.
#[derive(Default)]
pub struct FakeShortener {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl LinkShortener for FakeShortener {
    async fn shorten(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(KeywardError::delivery("shortener unavailable"));
        }
        Ok(url.replace("https://paste.test/", "https://s.test/"))
    }

    fn name(&self) -> &'static str {
        "fake-shortener"
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub backend: Arc<MemoryStore>,
    pub store: StateStore,
    pub paste: Arc<FakePaste>,
    pub shortener: Arc<FakeShortener>,
    pub activation: Arc<ActivationService>,
    pub admin: Arc<AdminService>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::at_millis(START_MILLIS));
        let backend = Arc::new(MemoryStore::new(clock.clone()));
        let store = StateStore::new(backend.clone()).with_scan_count(3);
        let paste = Arc::new(FakePaste::default());
        let shortener = Arc::new(FakeShortener::default());
        let delivery = DeliveryChannel::new(paste.clone(), Some(shortener.clone()));

        let activation = Arc::new(ActivationService::new(
            store.clone(),
            delivery,
            clock.clone(),
        ));
        let admin = Arc::new(AdminService::new(store.clone(), clock.clone()));

        Self {
            clock,
            backend,
            store,
            paste,
            shortener,
            activation,
            admin,
        }
    }

    pub fn api_context(&self, admin_token: &str) -> ApiContext {
        ApiContext {
            activation: self.activation.clone(),
            admin: self.admin.clone(),
            store: self.store.clone(),
            started: AppStartTime::now(),
            admin_token: Arc::from(admin_token),
        }
    }

    /// The key currently waiting to be redeemed for `hwid`
    pub async fn pending_key(&self, hwid: &str) -> Option<String> {
        self.store
            .get::<PendingGrant>(hwid)
            .await
            .unwrap()
            .map(|grant| grant.key)
    }
}
