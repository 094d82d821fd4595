//! 投递渠道抽象层

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::link4m::Link4mShortener;
use super::pastebin::PastebinHost;
use crate::config::DeliveryConfig;
use crate::errors::Result;
use crate::storage::PENDING_TTL_SECS;

/// A published note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPaste {
    pub id: String,
    pub url: String,
}

/// Where a freshly minted key ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub paste_id: String,
    pub paste_url: String,
    /// Link given to the end user
    pub delivery_url: String,
}

/// Human-readable note carrying an activation key.
#[derive(Debug, Clone)]
pub struct KeyNote {
    pub title: String,
    pub body: String,
}

impl KeyNote {
    pub fn for_key(hwid: &str, key: &str, issued_at: DateTime<Utc>) -> Self {
        let title = format!("Activation key {}", issued_at.format("%Y-%m-%d %H:%M UTC"));
        let body = format!(
            "HWID: {hwid}\n\
             KEY: {key}\n\
             \n\
             Issued at {issued}. Redeem within {minutes} minutes; the key is bound to this HWID.\n",
            issued = issued_at.to_rfc3339(),
            minutes = PENDING_TTL_SECS / 60,
        );
        Self { title, body }
    }
}

#[async_trait]
pub trait PasteHost: Send + Sync {
    async fn publish(&self, title: &str, body: &str) -> Result<PublishedPaste>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait LinkShortener: Send + Sync {
    async fn shorten(&self, url: &str) -> Result<String>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// Publish, then shorten with fallback.
#[derive(Clone)]
pub struct DeliveryChannel {
    paste: Arc<dyn PasteHost>,
    shortener: Option<Arc<dyn LinkShortener>>,
}

impl DeliveryChannel {
    pub fn new(paste: Arc<dyn PasteHost>, shortener: Option<Arc<dyn LinkShortener>>) -> Self {
        Self { paste, shortener }
    }

    /// Pastebin + link4m. Shortening is disabled when no shortener token is set.
    pub fn from_config(config: &DeliveryConfig) -> Self {
        let paste: Arc<dyn PasteHost> = Arc::new(PastebinHost::new(config));
        let shortener: Option<Arc<dyn LinkShortener>> = if config.shortener_api_token.is_empty() {
            info!("Delivery: link shortening disabled (no shortener token)");
            None
        } else {
            Some(Arc::new(Link4mShortener::new(config)))
        };

        info!(
            "Delivery: paste host = {}, shortener = {}",
            paste.name(),
            shortener.as_ref().map(|s| s.name()).unwrap_or("none")
        );
        Self::new(paste, shortener)
    }

    /// `shorten(url)` on success, `url` on any failure or when no shortener
    /// is configured. Never fails.
    pub async fn shorten_or_original(&self, url: &str) -> String {
        let Some(shortener) = &self.shortener else {
            return url.to_string();
        };

        match shortener.shorten(url).await {
            Ok(short) if !short.trim().is_empty() => {
                debug!("Shortened {} -> {} via {}", url, short, shortener.name());
                short
            }
            Ok(_) => {
                warn!("{} returned an empty short URL, using {}", shortener.name(), url);
                url.to_string()
            }
            Err(e) => {
                warn!("{} failed ({}), using {}", shortener.name(), e, url);
                url.to_string()
            }
        }
    }

    /// Publishes the note and derives the delivery link.
    pub async fn deliver(&self, note: &KeyNote) -> Result<Delivery> {
        let paste = self.paste.publish(&note.title, &note.body).await?;
        debug!("Published note {} via {}", paste.id, self.paste.name());

        let delivery_url = self.shorten_or_original(&paste.url).await;
        Ok(Delivery {
            paste_id: paste.id,
            paste_url: paste.url,
            delivery_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::KeywardError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPaste;

    #[async_trait]
    impl PasteHost for FixedPaste {
        async fn publish(&self, _title: &str, _body: &str) -> Result<PublishedPaste> {
            Ok(PublishedPaste {
                id: "AbC123".to_string(),
                url: "https://paste.example/AbC123".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FailingPaste;

    #[async_trait]
    impl PasteHost for FailingPaste {
        async fn publish(&self, _title: &str, _body: &str) -> Result<PublishedPaste> {
            Err(KeywardError::delivery("paste host down"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct CountingShortener {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl LinkShortener for CountingShortener {
        async fn shorten(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(KeywardError::delivery("shortener down"))
            } else {
                Ok(format!("https://s.example/{}", url.len()))
            }
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_deliver_uses_short_link() {
        let shortener = Arc::new(CountingShortener {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let channel = DeliveryChannel::new(Arc::new(FixedPaste), Some(shortener.clone()));
        let note = KeyNote::for_key("HW", "KEY", Utc::now());

        let delivery = channel.deliver(&note).await.unwrap();
        assert_eq!(delivery.paste_id, "AbC123");
        assert_eq!(delivery.paste_url, "https://paste.example/AbC123");
        assert!(delivery.delivery_url.starts_with("https://s.example/"));
        assert_eq!(shortener.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shortener_failure_falls_back_to_paste_url() {
        let shortener = Arc::new(CountingShortener {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let channel = DeliveryChannel::new(Arc::new(FixedPaste), Some(shortener));
        let note = KeyNote::for_key("HW", "KEY", Utc::now());

        let delivery = channel.deliver(&note).await.unwrap();
        assert_eq!(delivery.delivery_url, delivery.paste_url);
    }

    #[tokio::test]
    async fn test_no_shortener_keeps_url() {
        let channel = DeliveryChannel::new(Arc::new(FixedPaste), None);
        assert_eq!(
            channel.shorten_or_original("https://x.example/a").await,
            "https://x.example/a"
        );
    }

    #[tokio::test]
    async fn test_publish_failure_is_fatal() {
        let channel = DeliveryChannel::new(Arc::new(FailingPaste), None);
        let note = KeyNote::for_key("HW", "KEY", Utc::now());
        let err = channel.deliver(&note).await.unwrap_err();
        assert!(matches!(err, KeywardError::Delivery(_)));
    }

    #[test]
    fn test_note_contains_key_and_hwid() {
        let note = KeyNote::for_key("HW-1", "secret-key", Utc::now());
        assert!(note.body.contains("HW-1"));
        assert!(note.body.contains("secret-key"));
        assert!(note.body.contains("30 minutes"));
        assert!(!note.title.contains("secret-key"));
    }
}
