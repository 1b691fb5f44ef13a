//! Correlation-id generation for outbound requests.
//!
//! Every request to the external task service carries an `x-correlation-id`
//! header so a single pipeline stage's retries can be traced end to end in
//! the model service's own logs.

use uuid::Uuid;

/// Generate a fresh correlation id.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Return `existing` if present, otherwise mint a new correlation id. Used
/// when a caller (e.g. a retried stage) wants to keep the same id across
/// attempts rather than generating a new one per attempt.
pub fn correlation_id_or_new(existing: Option<&str>) -> String {
    match existing {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => new_correlation_id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_correlation_id_is_uuid() {
        let id = new_correlation_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_correlation_id_or_new_keeps_existing() {
        let existing = "abc-123";
        assert_eq!(correlation_id_or_new(Some(existing)), existing);
    }

    #[test]
    fn test_correlation_id_or_new_generates_when_missing() {
        let id = correlation_id_or_new(None);
        assert!(Uuid::parse_str(&id).is_ok());
        let id = correlation_id_or_new(Some("  "));
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
