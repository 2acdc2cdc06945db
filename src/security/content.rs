//! Content validation and profanity filtering for relayed text messages.

use std::sync::LazyLock;

use regex::Regex;

/// Default cap used by this module's own tests; the live cap is
/// `Config::max_message_length`, threaded through `validate_message`.
#[cfg(test)]
const MAX_MESSAGE_LENGTH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    Empty,
    TooLong { length: usize, limit: usize },
    DangerousPattern,
}

impl ContentError {
    pub fn reason(&self) -> String {
        match self {
            ContentError::Empty => "message is empty".to_string(),
            ContentError::TooLong { length, limit } => {
                format!("message exceeds {limit} characters (got {length})")
            }
            ContentError::DangerousPattern => "message contains disallowed content".to_string(),
        }
    }
}

static DANGEROUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<\s*script",
        r"(?i)<\s*iframe",
        r"(?i)<\s*object",
        r"(?i)<\s*embed",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?i)eval\s*\(",
        r"(?i)'\s*or\s*'1'\s*=\s*'1",
        r"(?i)union\s+select",
        r"(?i)drop\s+table",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern is valid"))
    .collect()
});

const PROFANITY_LIST: &[&str] = &["damn", "hell", "crap", "shit", "fuck", "bitch", "asshole"];

static PROFANITY_PATTERNS: LazyLock<Vec<(Regex, usize)>> = LazyLock::new(|| {
    PROFANITY_LIST
        .iter()
        .map(|word| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
            (Regex::new(&pattern).expect("static word pattern is valid"), word.len())
        })
        .collect()
});

/// Rejects empty, oversized, or dangerous-pattern content; otherwise
/// returns the input with profanity asterisked out. `max_length` is the
/// configured character cap (`Config::max_message_length`).
pub fn validate_message(s: &str, max_length: usize) -> Result<String, ContentError> {
    if s.is_empty() {
        return Err(ContentError::Empty);
    }
    let length = s.chars().count();
    if length > max_length {
        return Err(ContentError::TooLong { length, limit: max_length });
    }
    if DANGEROUS_PATTERNS.iter().any(|re| re.is_match(s)) {
        return Err(ContentError::DangerousPattern);
    }
    Ok(filter_profanity(s))
}

/// Replaces whole-word profanity matches with asterisks of equal length.
/// Idempotent: filtering already-filtered text is a no-op, since asterisks
/// never match a word-boundary profanity pattern.
pub fn filter_profanity(s: &str) -> String {
    let mut out = s.to_string();
    for (re, len) in PROFANITY_PATTERNS.iter() {
        out = re.replace_all(&out, "*".repeat(*len)).into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_message() {
        assert_eq!(
            validate_message("", MAX_MESSAGE_LENGTH),
            Err(ContentError::Empty)
        );
    }

    #[test]
    fn accepts_exactly_500_chars() {
        let s = "a".repeat(500);
        assert!(validate_message(&s, MAX_MESSAGE_LENGTH).is_ok());
    }

    #[test]
    fn rejects_501_chars() {
        let s = "a".repeat(501);
        assert!(matches!(
            validate_message(&s, MAX_MESSAGE_LENGTH),
            Err(ContentError::TooLong { length: 501, limit: 500 })
        ));
    }

    #[test]
    fn honors_a_configured_length_other_than_the_default() {
        let s = "a".repeat(50);
        assert!(validate_message(&s, 100).is_ok());
        assert!(matches!(
            validate_message(&s, 10),
            Err(ContentError::TooLong { length: 50, limit: 10 })
        ));
    }

    #[test]
    fn rejects_script_tag() {
        assert_eq!(
            validate_message("hello <script>alert(1)</script>", MAX_MESSAGE_LENGTH),
            Err(ContentError::DangerousPattern)
        );
    }

    #[test]
    fn rejects_inline_event_handler() {
        assert_eq!(
            validate_message("<img onerror=alert(1)>", MAX_MESSAGE_LENGTH),
            Err(ContentError::DangerousPattern)
        );
    }

    #[test]
    fn rejects_sql_injection_shape() {
        assert_eq!(
            validate_message("' OR '1'='1", MAX_MESSAGE_LENGTH),
            Err(ContentError::DangerousPattern)
        );
    }

    #[test]
    fn filters_profanity_case_insensitively_preserving_length() {
        let filtered = validate_message("that is such CRAP", MAX_MESSAGE_LENGTH).unwrap();
        assert_eq!(filtered, "that is such ****");
    }

    #[test]
    fn does_not_filter_substrings_within_other_words() {
        let filtered = validate_message("hello classic", MAX_MESSAGE_LENGTH).unwrap();
        assert_eq!(filtered, "hello classic");
    }

    #[test]
    fn filtering_is_idempotent() {
        let once = filter_profanity("this is hell");
        let twice = filter_profanity(&once);
        assert_eq!(once, twice);
    }
}
