use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// 激活码原始字节数（编码后 43 个 URL 安全字符）
pub const ACTIVATION_KEY_BYTES: usize = 32;

/// 生成激活码：32 字节 CSPRNG 随机数，base64url 无填充编码
pub fn generate_activation_key() -> String {
    let bytes: [u8; ACTIVATION_KEY_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Trims a client-supplied field; `None` when nothing is left.
pub fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_activation_key_shape() {
        let key = generate_activation_key();
        assert_eq!(key.len(), 43);
        assert!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_activation_keys_are_unique() {
        let keys: HashSet<String> = (0..256).map(|_| generate_activation_key()).collect();
        assert_eq!(keys.len(), 256);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ABC123 ")), Some("ABC123"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some("")), None);
        assert_eq!(non_blank(None), None);
    }
}
