//! Query parsing, result limits, and the text-matching primitives shared by
//! every search evaluator in this adapter.
//!
//! Kept deliberately small and dependency-free: these are pure functions over
//! `&str`, unit-tested in isolation from the index and the HTTP layer.

/// Default number of results returned when a request omits `limit`.
pub const DEFAULT_LIMIT: i64 = 40;
/// Hard ceiling on requested result counts, regardless of what the caller asks for.
pub const MAX_LIMIT: i64 = 100;
/// Minimum query length after trimming; shorter queries are rejected.
pub const MIN_QUERY_LENGTH: usize = 2;
/// Queries longer than this are silently truncated rather than rejected.
pub const MAX_QUERY_LENGTH: usize = 180;

/// Snippet half-window: how many characters of context to keep on each side
/// of the first match.
const SNIPPET_RADIUS: usize = 90;

/// Trims and validates a raw query string.
///
/// Returns an error describing why the query was rejected; otherwise returns
/// the trimmed, length-capped query.
pub fn parse_query(raw_query: &str) -> Result<String, String> {
    let trimmed = raw_query.trim();
    if trimmed.is_empty() {
        return Err("Search query is required.".to_string());
    }
    if trimmed.chars().count() < MIN_QUERY_LENGTH {
        return Err(format!(
            "Search query must be at least {} characters.",
            MIN_QUERY_LENGTH
        ));
    }
    Ok(trimmed.chars().take(MAX_QUERY_LENGTH).collect())
}

/// Clamps a caller-supplied limit into `[1, MAX_LIMIT]`, defaulting to
/// [`DEFAULT_LIMIT`] when absent.
pub fn parse_limit(raw_limit: Option<i64>) -> i64 {
    match raw_limit {
        None => DEFAULT_LIMIT,
        Some(value) => value.clamp(1, MAX_LIMIT),
    }
}

/// Scores how well a single haystack matches a lowercased needle.
///
/// Exact match scores highest, then prefix match, then a substring match
/// whose score decays the further into the haystack it starts. Returns `0`
/// when there is no match at all.
pub fn score_text_match(haystack: &str, needle_lower: &str) -> i64 {
    if haystack.is_empty() {
        return 0;
    }

    let value = haystack.to_lowercase();
    if value == needle_lower {
        return 220;
    }
    if value.starts_with(needle_lower) {
        return 170;
    }

    match value.find(needle_lower) {
        None => 0,
        Some(byte_index) => {
            let char_index = value[..byte_index].chars().count() as i64;
            let early_bonus = (40 - char_index / 4).max(0);
            120 + early_bonus
        }
    }
}

/// Builds a windowed snippet around the first occurrence of `needle_lower` in
/// `text`, normalizing internal whitespace first. Falls back to a
/// from-the-start window (with a trailing ellipsis) when there's no match.
pub fn extract_snippet(text: &str, needle_lower: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return None;
    }

    let lower = normalized.to_lowercase();
    let Some(byte_index) = lower.find(needle_lower) else {
        let fallback: String = normalized.chars().take(SNIPPET_RADIUS * 2).collect();
        return Some(if fallback.chars().count() < normalized.chars().count() {
            format!("{fallback}\u{2026}")
        } else {
            fallback
        });
    };

    let chars: Vec<char> = normalized.chars().collect();
    let needle_char_len = lower[byte_index..].chars().take(needle_lower.chars().count()).count();
    let match_char_index = lower[..byte_index].chars().count();

    let start = match_char_index.saturating_sub(SNIPPET_RADIUS);
    let end = (match_char_index + needle_char_len + SNIPPET_RADIUS).min(chars.len());

    let snippet: String = chars[start..end].iter().collect();
    let snippet = snippet.trim();
    let prefix = if start > 0 { "\u{2026}" } else { "" };
    let suffix = if end < chars.len() { "\u{2026}" } else { "" };
    Some(format!("{prefix}{snippet}{suffix}"))
}

/// Collapses runs of whitespace (including newlines) into single spaces and
/// trims the ends.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_rejects_empty() {
        assert!(parse_query("   ").is_err());
    }

    #[test]
    fn parse_query_rejects_too_short() {
        assert!(parse_query("a").is_err());
    }

    #[test]
    fn parse_query_trims_and_caps_length() {
        let long = "x".repeat(500);
        let parsed = parse_query(&format!("  {long}  ")).unwrap();
        assert_eq!(parsed.len(), MAX_QUERY_LENGTH);
    }

    #[test]
    fn parse_limit_defaults_and_clamps() {
        assert_eq!(parse_limit(None), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some(0)), 1);
        assert_eq!(parse_limit(Some(-5)), 1);
        assert_eq!(parse_limit(Some(1_000)), MAX_LIMIT);
        assert_eq!(parse_limit(Some(12)), 12);
    }

    #[test]
    fn score_text_match_ranks_exact_above_prefix_above_substring() {
        let exact = score_text_match("report", "report");
        let prefix = score_text_match("reporting-final", "report");
        let substring = score_text_match("quarterly report final", "report");
        assert!(exact > prefix);
        assert!(prefix > substring);
        assert_eq!(score_text_match("no match here", "zzz"), 0);
    }

    #[test]
    fn score_text_match_decays_with_later_match_position() {
        let early = score_text_match("report somewhere near start", "near");
        let late = score_text_match(
            "report padding padding padding padding padding near the end",
            "near",
        );
        assert!(early >= late);
    }

    #[test]
    fn extract_snippet_centers_on_match_with_ellipses() {
        let body = format!("{}needle{}", "a".repeat(200), "b".repeat(200));
        let snippet = extract_snippet(&body, "needle").unwrap();
        assert!(snippet.starts_with('\u{2026}'));
        assert!(snippet.ends_with('\u{2026}'));
        assert!(snippet.contains("needle"));
    }

    #[test]
    fn extract_snippet_falls_back_without_match() {
        let body = "short body with no hits";
        let snippet = extract_snippet(body, "zzz").unwrap();
        assert_eq!(snippet, "short body with no hits");
    }

    #[test]
    fn extract_snippet_returns_none_for_empty_text() {
        assert!(extract_snippet("", "needle").is_none());
    }
}
