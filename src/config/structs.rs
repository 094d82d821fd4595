use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::errors::KeywardError;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 环境变量前缀，例如 KW__SERVER__PORT=9999
pub const ENV_PREFIX: &str = "KW";

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreBackend {
    /// In-process map; state is lost on restart
    #[default]
    Memory,
    Redis,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// - server: 监听地址、端口、worker 数量
/// - store: TTL 存储后端
/// - admin: 管理接口令牌
/// - delivery: 激活码投递渠道（paste + 短链）
/// - logging: 日志配置
/// - cors: 跨域配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：KW，分隔符：__
    pub fn try_load(path: &str) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<StaticConfig>()
    }

    /// Like [`StaticConfig::try_load`], falling back to defaults on error.
    pub fn load(path: &str) -> Self {
        match Self::try_load(path) {
            Ok(config) => {
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Failed to load config from {}: {}", path, e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> crate::errors::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| KeywardError::config(format!("cannot render config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Non-fatal problems worth a startup warning.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.admin.token.is_empty() {
            warnings.push(
                "admin.token is empty: every /admin request will be rejected".to_string(),
            );
        }
        if self.delivery.paste_api_key.is_empty() {
            warnings.push(
                "delivery.paste_api_key is empty: key issuance will fail at the paste host"
                    .to_string(),
            );
        }
        if self.delivery.shortener_api_token.is_empty() {
            warnings.push(
                "delivery.shortener_api_token is empty: raw paste URLs will be handed out"
                    .to_string(),
            );
        }
        if self.store.backend == StoreBackend::Memory {
            warnings.push(
                "store.backend is memory: activation state is lost on restart".to_string(),
            );
        }

        warnings
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// TTL 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SCAN 每批次的 COUNT 提示
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
    #[serde(default)]
    pub redis: RedisConfig,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

/// 管理接口配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    /// `x-admin-token` 请求头的期望值，为空时管理接口全部拒绝
    #[serde(default)]
    pub token: String,
}

/// 投递渠道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_paste_api_url")]
    pub paste_api_url: String,
    #[serde(default)]
    pub paste_api_key: String,
    /// Paste expiry code understood by the paste host (e.g. "1H")
    #[serde(default = "default_paste_expire")]
    pub paste_expire: String,
    #[serde(default = "default_shortener_api_url")]
    pub shortener_api_url: String,
    /// 为空时不缩短链接
    #[serde(default)]
    pub shortener_api_token: String,
    #[serde(default = "default_delivery_timeout")]
    pub timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_scan_count() -> usize {
    100
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "keyward:".to_string()
}

fn default_paste_api_url() -> String {
    "https://pastebin.com/api/api_post.php".to_string()
}

fn default_paste_expire() -> String {
    "1H".to_string()
}

fn default_shortener_api_url() -> String {
    "https://link4m.co/api-shorten/v2".to_string()
}

fn default_delivery_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_cors_max_age() -> u64 {
    3600
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            scan_count: default_scan_count(),
            redis: RedisConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            paste_api_url: default_paste_api_url(),
            paste_api_key: String::new(),
            paste_expire: default_paste_expire(),
            shortener_api_url: default_shortener_api_url(),
            shortener_api_token: String::new(),
            timeout_secs: default_delivery_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!(StoreBackend::from_str("redis").unwrap(), StoreBackend::Redis);
        assert_eq!(StoreBackend::from_str("MEMORY").unwrap(), StoreBackend::Memory);
        assert!(StoreBackend::from_str("sqlite").is_err());
        assert_eq!(StoreBackend::Redis.to_string(), "redis");
    }

    #[test]
    fn test_sample_config_round_trips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.store.redis.key_prefix, "keyward:");
        assert_eq!(parsed.delivery.timeout_secs, 10);
    }

    #[test]
    fn test_load_reads_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyward.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9191

[store]
backend = "redis"

[admin]
token = "s3cret"
"#,
        )
        .unwrap();

        let config = StaticConfig::try_load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.admin.token, "s3cret");
        // untouched sections keep their defaults
        assert_eq!(config.logging.level, "info");
        assert!(config.warnings().iter().all(|w| !w.contains("admin.token")));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = StaticConfig::load("/nonexistent/keyward.toml");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.warnings().iter().any(|w| w.contains("admin.token")));
    }
    #[test]
    fn test_save_to_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keyward.toml");
        StaticConfig::default().save_to_file(&path).unwrap();

        let parsed = StaticConfig::try_load(path.to_str().unwrap()).unwrap();
        assert_eq!(parsed.server.port, 8080);
    }

    #[test]
    fn test_save_to_file_reports_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let err = StaticConfig::default()
            .save_to_file(blocker.join("keyward.toml"))
            .unwrap_err();
        assert!(matches!(err, KeywardError::FileOperation(_)));
        assert_eq!(err.code(), "E007");
    }
}
