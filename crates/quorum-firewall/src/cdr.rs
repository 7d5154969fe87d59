//! Content Disarm & Reconstruct (CDR)
//!
//! Strips markup and script vectors from text before it is forwarded to
//! analysis backends, keeping the prose intact.

use regex::Regex;
use std::sync::OnceLock;

fn javascript_scheme() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)javascript\s*:").expect("scheme pattern compiles"))
}

fn event_handler() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bon\w+\s*=").expect("handler pattern compiles"))
}

/// Sanitize text before it reaches a backend.
///
/// - Removes `<` and `>`
/// - Removes `javascript:` schemes (any case)
/// - Removes inline event-handler attributes (`onload=`, `onerror =`, ...)
/// - Trims surrounding whitespace
///
/// # Arguments
/// * `input` - The untrusted text
///
/// # Returns
/// Sanitized text
pub fn sanitize_content(input: &str) -> String {
    let without_brackets: String = input.chars().filter(|c| !matches!(c, '<' | '>')).collect();
    let without_scheme = javascript_scheme().replace_all(&without_brackets, "");
    let without_handlers = event_handler().replace_all(&without_scheme, "");
    without_handlers.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        let text = "Notre nouvelle gamme arrive en magasin demain.";
        assert_eq!(sanitize_content(text), text);
    }

    #[test]
    fn test_strips_angle_brackets() {
        assert_eq!(sanitize_content("<b>bold</b> move"), "bbold/b move");
    }

    #[test]
    fn test_strips_javascript_scheme() {
        assert_eq!(
            sanitize_content("click JavaScript:alert(1) now"),
            "click alert(1) now"
        );
    }

    #[test]
    fn test_strips_event_handlers() {
        let cleaned = sanitize_content("<img src=x onerror=alert(1) onLoad = go()>");
        assert!(!cleaned.contains('<'));
        assert!(!cleaned.to_lowercase().contains("onerror="));
        assert!(!cleaned.to_lowercase().contains("onload"));
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(sanitize_content("   hello world \n"), "hello world");
    }
}
