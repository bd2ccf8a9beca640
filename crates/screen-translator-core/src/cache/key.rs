use crate::config::Lang;

/// Cache key for translated text.
///
/// Keys are opaque MD5 hashes of `(text, source language or "auto", target
/// language)`, ensuring:
/// - Same text + languages = same key
/// - Any change to inputs produces a different key
/// - Keys are fixed-length (32 hex chars) regardless of text length
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn new(text: &str, source_lang: Option<&Lang>, target_lang: &Lang) -> Self {
        let source = source_lang.map_or(crate::config::AUTO_LANG, Lang::as_str);

        // Null bytes as separators prevent collisions between inputs like
        // ("a", "bc") and ("ab", "c").
        let combined = format!("{}\0{}\0{}", text, source, target_lang.as_str());

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str, src: Option<&str>, tgt: &str) -> CacheKey {
        let src = src.map(Lang::new);
        CacheKey::new(text, src.as_ref(), &Lang::new(tgt))
    }

    #[test]
    fn test_cache_key_is_fixed_length_hash() {
        let k = key("Hello world", Some("fr"), "zh-CN");
        assert_eq!(k.to_string().len(), 32);
        assert!(k.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_differs_by_content() {
        assert_ne!(key("Hello", Some("fr"), "en"), key("World", Some("fr"), "en"));
    }

    #[test]
    fn test_cache_key_differs_by_target_language() {
        assert_ne!(key("Hello", Some("fr"), "en"), key("Hello", Some("fr"), "zh-CN"));
    }

    #[test]
    fn test_cache_key_differs_by_source_language() {
        assert_ne!(key("Hello", Some("fr"), "en"), key("Hello", Some("de"), "en"));
    }

    #[test]
    fn test_missing_source_is_auto() {
        assert_eq!(key("Hello", None, "en"), key("Hello", Some("auto"), "en"));
    }

    #[test]
    fn test_separator_prevents_collisions() {
        assert_ne!(key("a", Some("bc"), "en"), key("a\0b", Some("c"), "en"));
    }

    #[test]
    fn test_cache_key_same_inputs_same_key() {
        assert_eq!(key("Hello", Some("fr"), "en"), key("Hello", Some("fr"), "en"));
    }
}
