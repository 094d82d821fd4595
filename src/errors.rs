use std::fmt;

/// Infrastructure failures.
///
/// Business-rule outcomes (blacklisted, wrong key, ...) are not errors; they
/// are variants of the service outcome enums. Everything here surfaces as
/// `SERVER_ERROR` at the HTTP boundary.
#[derive(Debug, Clone)]
pub enum KeywardError {
    StoreConnection(String),
    StoreOperation(String),
    Serialization(String),
    Delivery(String),
    Conflict(String),
    Config(String),
    FileOperation(String),
}

impl KeywardError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            KeywardError::StoreConnection(_) => "E001",
            KeywardError::StoreOperation(_) => "E002",
            KeywardError::Serialization(_) => "E003",
            KeywardError::Delivery(_) => "E004",
            KeywardError::Conflict(_) => "E005",
            KeywardError::Config(_) => "E006",
            KeywardError::FileOperation(_) => "E007",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            KeywardError::StoreConnection(_) => "Store Connection Error",
            KeywardError::StoreOperation(_) => "Store Operation Error",
            KeywardError::Serialization(_) => "Serialization Error",
            KeywardError::Delivery(_) => "Delivery Channel Error",
            KeywardError::Conflict(_) => "Concurrent Update Conflict",
            KeywardError::Config(_) => "Configuration Error",
            KeywardError::FileOperation(_) => "File Operation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            KeywardError::StoreConnection(msg)
            | KeywardError::StoreOperation(msg)
            | KeywardError::Serialization(msg)
            | KeywardError::Delivery(msg)
            | KeywardError::Conflict(msg)
            | KeywardError::Config(msg)
            | KeywardError::FileOperation(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于启动失败与 CLI）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for KeywardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for KeywardError {}

// 便捷的构造函数
impl KeywardError {
    pub fn store_connection<T: Into<String>>(msg: T) -> Self {
        KeywardError::StoreConnection(msg.into())
    }

    pub fn store_operation<T: Into<String>>(msg: T) -> Self {
        KeywardError::StoreOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        KeywardError::Serialization(msg.into())
    }

    pub fn delivery<T: Into<String>>(msg: T) -> Self {
        KeywardError::Delivery(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        KeywardError::Conflict(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        KeywardError::Config(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        KeywardError::FileOperation(msg.into())
    }
}

impl From<redis::RedisError> for KeywardError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            KeywardError::StoreConnection(err.to_string())
        } else {
            KeywardError::StoreOperation(err.to_string())
        }
    }
}

impl From<serde_json::Error> for KeywardError {
    fn from(err: serde_json::Error) -> Self {
        KeywardError::Serialization(err.to_string())
    }
}

impl From<ureq::Error> for KeywardError {
    fn from(err: ureq::Error) -> Self {
        KeywardError::Delivery(err.to_string())
    }
}

impl From<std::io::Error> for KeywardError {
    fn from(err: std::io::Error) -> Self {
        KeywardError::FileOperation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KeywardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            KeywardError::store_connection("a"),
            KeywardError::store_operation("a"),
            KeywardError::serialization("a"),
            KeywardError::delivery("a"),
            KeywardError::conflict("a"),
            KeywardError::config("a"),
            KeywardError::file_operation("a"),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = KeywardError::delivery("paste host returned 503");
        assert_eq!(
            err.to_string(),
            "Delivery Channel Error: paste host returned 503"
        );
        assert_eq!(err.message(), "paste host returned 503");
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: KeywardError = parse_err.into();
        assert!(matches!(err, KeywardError::Serialization(_)));
    }
}
