use std::fmt;

/// Substrings marking an error as permanent; checked first
const NON_RETRYABLE_PATTERNS: &[&str] = &[
    "content policy",
    "safety filter",
    "blocked",
    "forbidden",
    "invalid api key",
    "authentication",
    "unauthorized",
    "not found",
    "invalid request",
    "bad request",
];

/// Substrings marking an error as transient
const RETRYABLE_PATTERNS: &[&str] = &[
    "rate limit",
    "429",
    "too many requests",
    "timeout",
    "timed out",
    "network",
    "connection",
    "econnreset",
    "econnrefused",
    "socket",
    "temporarily unavailable",
    "503",
    "502",
    "500",
    "internal server error",
    "service unavailable",
    "gateway",
];

/// Default classifier: decide from the lowercased error message
///
/// Fatal keywords win over transient ones. Messages matching neither set
/// are treated as retryable, so an unlabelled fatal error will burn the
/// full retry budget.
pub fn is_retryable_error<E: fmt::Display + ?Sized>(error: &E) -> bool {
    let message = error.to_string().to_lowercase();

    if NON_RETRYABLE_PATTERNS.iter().any(|pattern| message.contains(pattern)) {
        return false;
    }

    if RETRYABLE_PATTERNS.iter().any(|pattern| message.contains(pattern)) {
        return true;
    }

    tracing::trace!(%message, "unclassified error, treating as retryable");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_messages_are_retryable() {
        assert!(is_retryable_error("Rate limit exceeded"));
        assert!(is_retryable_error("HTTP 429"));
        assert!(is_retryable_error("read ECONNRESET"));
        assert!(is_retryable_error("Provider API error (502): bad gateway"));
        assert!(is_retryable_error("request timed out"));
    }

    #[test]
    fn fatal_messages_are_not_retryable() {
        assert!(!is_retryable_error("Request blocked by content policy"));
        assert!(!is_retryable_error("Invalid API key provided"));
        assert!(!is_retryable_error("Authentication failed: nope"));
        assert!(!is_retryable_error("model not found"));
    }

    #[test]
    fn fatal_keywords_take_precedence() {
        assert!(!is_retryable_error("429 rate limit hit while checking content policy"));
        assert!(!is_retryable_error("503 forbidden"));
    }

    #[test]
    fn unknown_errors_default_to_retryable() {
        assert!(is_retryable_error("something odd happened"));
        assert!(is_retryable_error(""));
    }
}
