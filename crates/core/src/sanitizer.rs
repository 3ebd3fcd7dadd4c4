//! 凭证脱敏
//!
//! 服务商错误体、网络错误描述在写入日志或技术错误信息前先经过这里，
//! 避免 API Key 与 Authorization 头被原样带出。

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// 替换文本
pub const REDACTED: &str = "[REDACTED]";

fn credential_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // OpenRouter 密钥（sk-or-v1-...）及 OpenAI 风格密钥
            r"sk-(?:or-v1-)?[a-zA-Z0-9_-]{20,}",
            r"Bearer\s+[a-zA-Z0-9_\-.]+",
            r"(?i)(api[_-]?key|access[_-]?token|authorization)\s*[=:]\s*\S+",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// 脱敏；无敏感内容时不分配
pub fn redact(text: &str) -> Cow<'_, str> {
    let patterns = credential_patterns();
    if !patterns.iter().any(|p| p.is_match(text)) {
        return Cow::Borrowed(text);
    }

    let mut result = text.to_string();
    for pattern in patterns {
        if let Cow::Owned(replaced) = pattern.replace_all(&result, REDACTED) {
            result = replaced;
        }
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_openrouter_key() {
        let input = "invalid key sk-or-v1-0123456789abcdef0123456789abcdef";
        let result = redact(input);
        assert!(!result.contains("0123456789abcdef"));
        assert!(result.contains(REDACTED));
    }

    #[test]
    fn test_redact_bearer_header() {
        let result = redact("Authorization: Bearer abc.def-123");
        assert!(!result.contains("abc.def-123"));
    }

    #[test]
    fn test_plain_text_borrowed() {
        let input = "rate limited by upstream";
        assert!(matches!(redact(input), Cow::Borrowed(_)));
    }
}
