//! Subtitle-likelihood classification of extracted text.
//!
//! Classification is a pure function of the text. A fixed, ordered table of
//! pattern rules is tried first; the first match decides the category. Text
//! that matches no rule goes through a shape heuristic instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;

/// Confidence of a pattern rule match
pub const RULE_CONFIDENCE: f32 = 0.9;
/// Confidence when the fallback heuristic passes
pub const HEURISTIC_CONFIDENCE: f32 = 0.6;
/// Confidence when nothing suggests a subtitle
pub const REJECT_CONFIDENCE: f32 = 0.1;

/// Kind of subtitle line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleCategory {
    Dialogue,
    Narrator,
    Action,
    Song,
    Unknown,
}

impl SubtitleCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dialogue => "dialogue",
            Self::Narrator => "narrator",
            Self::Action => "action",
            Self::Song => "song",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SubtitleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubtitleClassification {
    pub is_subtitle: bool,
    pub category: SubtitleCategory,
    /// In `[0, 1]`
    pub confidence: f32,
}

struct Rule {
    category: SubtitleCategory,
    pattern: Regex,
}

// Patterns are compile-time constants covered by the tests below
#[allow(clippy::unwrap_used)]
fn rule(category: SubtitleCategory, pattern: &str) -> Rule {
    Rule {
        category,
        pattern: Regex::new(pattern).unwrap(),
    }
}

/// Ordered rule table. Order matters: the first match wins.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use SubtitleCategory::{Action, Dialogue, Narrator, Song};
    vec![
        // Speaker dash at the start of a line
        rule(Dialogue, r"^[-–—]\s+\S"),
        // Whole line quoted
        rule(Dialogue, r#"^["“«„].+["”»“]$"#),
        rule(Narrator, r"(?i)^(narrator|voice[- ]?over|v\.o\.)\s*:"),
        rule(Narrator, r"(?is)^<i>.+</i>$"),
        // Sound and stage descriptions
        rule(Action, r"^\[[^\]]+\]$"),
        rule(Action, r"^\([^)]+\)$"),
        rule(Action, r"^\*[^*]+\*$"),
        rule(Song, r"[♪♫]"),
        rule(Song, r"^#.+#$"),
    ]
});

#[allow(clippy::unwrap_used)]
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(^www\.|[a-z][a-z0-9+.-]*://)").unwrap());

/// Digits with time/number separators only, e.g. `00:01:23,456` or `12.5`
#[allow(clippy::unwrap_used)]
static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s:.,/\-–>]+$").unwrap());

const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', '…', '。', '！', '？'];
const CLOSING_QUOTES: &[char] = &['"', '\'', '”', '’', '»', '」', '』'];

/// Classify with the default heuristic bounds
pub fn classify(text: &str) -> SubtitleClassification {
    classify_with(text, &ClassifierConfig::default())
}

pub fn classify_with(text: &str, config: &ClassifierConfig) -> SubtitleClassification {
    let text = text.trim();

    if let Some(rule) = RULES.iter().find(|rule| rule.pattern.is_match(text)) {
        return SubtitleClassification {
            is_subtitle: true,
            category: rule.category,
            confidence: RULE_CONFIDENCE,
        };
    }

    let is_subtitle = looks_like_subtitle(text, config);
    SubtitleClassification {
        is_subtitle,
        category: SubtitleCategory::Unknown,
        confidence: if is_subtitle {
            HEURISTIC_CONFIDENCE
        } else {
            REJECT_CONFIDENCE
        },
    }
}

fn looks_like_subtitle(text: &str, config: &ClassifierConfig) -> bool {
    let len = text.chars().count();
    (config.min_len..=config.max_len).contains(&len)
        && ends_with_terminal_punctuation(text)
        && !URL.is_match(text)
        && !NUMERIC.is_match(text)
}

fn ends_with_terminal_punctuation(text: &str) -> bool {
    let trimmed = text.trim_end_matches(CLOSING_QUOTES);
    trimmed.ends_with(TERMINAL_PUNCTUATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(text: &str) -> SubtitleCategory {
        classify(text).category
    }

    #[test]
    fn test_rules_compile() {
        assert_eq!(RULES.len(), 9);
        assert!(URL.is_match("https://example.com"));
        assert!(NUMERIC.is_match("00:01:23,456 --> 00:01:25,000"));
    }

    #[test]
    fn test_hello_world_falls_back_to_heuristic() {
        let c = classify("Hello, world!");
        assert!(c.is_subtitle);
        assert_eq!(c.category, SubtitleCategory::Unknown);
        assert!((c.confidence - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_dialogue_rules() {
        assert_eq!(category("- Where are you going?"), SubtitleCategory::Dialogue);
        assert_eq!(category("– Nowhere"), SubtitleCategory::Dialogue);
        assert_eq!(category("\"I told you so\""), SubtitleCategory::Dialogue);
        assert!((classify("- Hi").confidence - RULE_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_dash_without_space_is_not_dialogue() {
        for text in ["-5", "-----", "—", "-12.5"] {
            let c = classify(text);
            assert_ne!(c.category, SubtitleCategory::Dialogue, "{text:?}");
            assert!(!c.is_subtitle, "{text:?} should not be a subtitle");
        }
    }

    #[test]
    fn test_narrator_rules() {
        assert_eq!(category("NARRATOR: Long ago..."), SubtitleCategory::Narrator);
        assert_eq!(category("Voice-over: It began"), SubtitleCategory::Narrator);
        assert_eq!(category("<i>Years later</i>"), SubtitleCategory::Narrator);
    }

    #[test]
    fn test_action_rules() {
        assert_eq!(category("[door slams]"), SubtitleCategory::Action);
        assert_eq!(category("(sighs)"), SubtitleCategory::Action);
        assert_eq!(category("*laughs*"), SubtitleCategory::Action);
    }

    #[test]
    fn test_song_rules() {
        assert_eq!(category("♪ Let it go ♪"), SubtitleCategory::Song);
        assert_eq!(category("# Happy birthday #"), SubtitleCategory::Song);
    }

    #[test]
    fn test_rule_order_is_fixed() {
        // Matches both the dialogue dash and the song note; dialogue is first
        assert_eq!(category("- ♪ la la la"), SubtitleCategory::Dialogue);
    }

    #[test]
    fn test_heuristic_rejections() {
        for text in ["Hello world", "https://example.com/watch.", "00:12:34.", "12.5.", "!", ""] {
            let c = classify(text);
            assert!(!c.is_subtitle, "{text:?} should not be a subtitle");
            assert_eq!(c.category, SubtitleCategory::Unknown);
            assert!((c.confidence - REJECT_CONFIDENCE).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_heuristic_accepts_cjk_and_quotes() {
        assert!(classify("どこへ行くの？").is_subtitle);
        assert!(classify("He said it's over.'").is_subtitle);
    }

    #[test]
    fn test_max_length_bound() {
        let config = ClassifierConfig { min_len: 2, max_len: 10 };
        assert!(!classify_with("This sentence is too long.", &config).is_subtitle);
        assert!(classify_with("Short one.", &config).is_subtitle);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(SubtitleCategory::Song.to_string(), "song");
    }
}
