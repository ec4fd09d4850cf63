use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One successful decode of a camera frame into a token.
#[derive(Debug, Clone)]
pub struct ScanEvent {
    pub raw_text: String,
    pub timestamp: DateTime<Utc>,
    pub scan_id: Uuid,
}

impl ScanEvent {
    pub fn new(raw_text: String) -> Self {
        Self {
            raw_text,
            timestamp: Utc::now(),
            scan_id: Uuid::new_v4(),
        }
    }
}

/// Outcome of submitting a scanned token to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkResult {
    Success {
        message: String,
        student_name: String,
        roll_number: String,
    },
    Failure {
        reason: String,
    },
}

impl MarkResult {
    pub fn is_success(&self) -> bool {
        matches!(self, MarkResult::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_events_get_distinct_ids() {
        let a = ScanEvent::new("abc-123".to_string());
        let b = ScanEvent::new("abc-123".to_string());
        assert_eq!(a.raw_text, b.raw_text);
        assert_ne!(a.scan_id, b.scan_id);
    }
}
