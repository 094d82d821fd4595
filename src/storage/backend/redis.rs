use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::Script;
use redis::aio::ConnectionManager;
use tracing::{debug, error, trace};

use crate::config::RedisConfig;
use crate::errors::{KeywardError, Result};
use crate::storage::{KeyTtl, KvStore, ScanPage};

/// KEYS[1]=from KEYS[2]=to ARGV[1]=expected ARGV[2]=value ARGV[3]=ttl seconds (0 = none)
static COMPARE_AND_MOVE: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
if redis.call('GET', KEYS[1]) ~= ARGV[1] then
    return 0
end
redis.call('DEL', KEYS[1])
if tonumber(ARGV[3]) > 0 then
    redis.call('SET', KEYS[2], ARGV[2], 'EX', ARGV[3])
else
    redis.call('SET', KEYS[2], ARGV[2])
end
return 1
"#,
    )
});

/// Redis-backed TTL store.
///
/// `ConnectionManager` reconnects transparently after a dropped connection,
/// and is cheap to clone per command.
pub struct RedisStore {
    manager: ConnectionManager,
    key_prefix: String,
}

impl RedisStore {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            KeywardError::store_connection(format!(
                "Invalid Redis URL '{}': {}. Check store.redis.url",
                config.url, e
            ))
        })?;

        let mut manager = client.get_connection_manager().await.map_err(|e| {
            error!("Failed to connect to Redis at {}: {}", config.url, e);
            KeywardError::store_connection(format!("Redis connection failed: {e}"))
        })?;

        // 启动时测试连接
        let pong: String = redis::cmd("PING").query_async(&mut manager).await?;
        debug!(
            "RedisStore connected (prefix '{}'), PING -> {}",
            config.key_prefix, pong
        );

        Ok(Self {
            manager,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn strip_key(&self, redis_key: String) -> String {
        match redis_key.strip_prefix(&self.key_prefix) {
            Some(key) => key.to_string(),
            None => redis_key,
        }
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

/// Escapes glob metacharacters so a literal prefix can be used with MATCH.
fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = redis::cmd("GET")
            .arg(self.make_key(key))
            .query_async(&mut self.conn())
            .await?;
        trace!("RedisStore GET {} -> hit={}", key, value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.make_key(key)).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }
        let _: () = cmd.query_async(&mut self.conn()).await?;
        trace!("RedisStore SET {} ttl={:?}", key, ttl);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.make_key(key)).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }
        // NX 未写入时返回 nil
        let reply: Option<String> = cmd.query_async(&mut self.conn()).await?;
        trace!("RedisStore SET NX {} -> {:?}", key, reply);
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed: i64 = redis::cmd("DEL")
            .arg(self.make_key(key))
            .query_async(&mut self.conn())
            .await?;
        trace!("RedisStore DEL {} -> {}", key, removed);
        Ok(removed > 0)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let secs: i64 = redis::cmd("TTL")
            .arg(self.make_key(key))
            .query_async(&mut self.conn())
            .await?;
        Ok(match secs {
            -2 => KeyTtl::Missing,
            -1 => KeyTtl::Persistent,
            s => KeyTtl::Expires(Duration::from_secs(s.max(0) as u64)),
        })
    }

    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<ScanPage> {
        let pattern = format!("{}*", escape_glob(&self.make_key(prefix)));
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(&pattern)
            .arg("COUNT")
            .arg(count.max(1))
            .query_async(&mut self.conn())
            .await?;
        trace!(
            "RedisStore SCAN {} cursor={} -> {} keys, next={}",
            pattern,
            cursor,
            keys.len(),
            next_cursor
        );
        Ok(ScanPage {
            next_cursor,
            keys: keys.into_iter().map(|k| self.strip_key(k)).collect(),
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
        let ttl_secs = ttl.map(|t| t.as_secs().max(1)).unwrap_or(0);
        let mut invocation = COMPARE_AND_MOVE.prepare_invoke();
        invocation
            .key(self.make_key(from))
            .key(self.make_key(to))
            .arg(expected)
            .arg(value)
            .arg(ttl_secs);
        let moved: i64 = invocation.invoke_async(&mut self.conn()).await?;
        trace!("RedisStore compare_and_move {} -> {}: {}", from, to, moved);
        Ok(moved == 1)
    }

    async fn ping(&self) -> Result<()> {
        let _: String = redis::cmd("PING").query_async(&mut self.conn()).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("keyward:active:"), "keyward:active:");
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let config = RedisConfig {
            url: "not a url".to_string(),
            key_prefix: "t:".to_string(),
        };
        let err = RedisStore::connect(&config).await.err().unwrap();
        assert!(matches!(err, KeywardError::StoreConnection(_)));
    }
}
