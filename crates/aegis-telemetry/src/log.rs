use std::collections::VecDeque;

use aegis_types::alert::{AlertEntry, AlertSource};

/// Bounded, newest-first alert feed.
///
/// Deduplication is adjacent-only: a push is refused only when the message
/// equals the current newest entry, by string equality. A repeated alert
/// separated by any other message is admitted again. No full-log scan.
#[derive(Debug)]
pub struct AlertLog {
    entries: VecDeque<AlertEntry>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Prepends an entry unless it duplicates the current newest message.
    /// Evicts the oldest entry when the bound is exceeded. Returns whether
    /// the log actually changed.
    pub fn push(&mut self, source: AlertSource, message: impl Into<String>) -> bool {
        let message = message.into();
        if self
            .entries
            .front()
            .map(|newest| newest.message == message)
            .unwrap_or(false)
        {
            return false;
        }
        self.entries.push_front(AlertEntry::new(source, message));
        self.entries.truncate(self.capacity);
        true
    }

    pub fn newest(&self) -> Option<&AlertEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlertEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<AlertEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_never_exceeds_capacity() {
        let mut log = AlertLog::new(5);
        for i in 0..20 {
            log.push(AlertSource::Ai, format!("alert {i}"));
        }
        assert_eq!(log.len(), 5);
        assert_eq!(log.newest().map(|e| e.message.as_str()), Some("alert 19"));
    }

    #[test]
    fn eviction_drops_the_oldest_entry() {
        let mut log = AlertLog::new(3);
        for msg in ["a", "b", "c", "d"] {
            log.push(AlertSource::Ai, msg);
        }
        let messages: Vec<&str> = log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["d", "c", "b"]);
    }

    #[test]
    fn consecutive_duplicates_collapse_to_one_entry() {
        let mut log = AlertLog::new(15);
        assert!(log.push(AlertSource::Ai, "Scanning local airspace... Clear."));
        assert!(!log.push(AlertSource::Ai, "Scanning local airspace... Clear."));
        assert!(!log.push(AlertSource::Ai, "Scanning local airspace... Clear."));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn nonadjacent_repeats_are_admitted() {
        // Dedupe is adjacent-only, not set-based.
        let mut log = AlertLog::new(15);
        assert!(log.push(AlertSource::Ai, "A"));
        assert!(log.push(AlertSource::Ai, "B"));
        assert!(log.push(AlertSource::Ai, "A"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn dedupe_ignores_entry_source() {
        let mut log = AlertLog::new(15);
        assert!(log.push(AlertSource::System, "Telemetry link established."));
        assert!(!log.push(AlertSource::Ai, "Telemetry link established."));
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = AlertLog::new(15);
        log.push(AlertSource::Ai, "A");
        log.push(AlertSource::Ai, "B");
        log.clear();
        assert!(log.is_empty());
        // After a clear the previously-newest message is admissible again.
        assert!(log.push(AlertSource::Ai, "B"));
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut log = AlertLog::new(0);
        assert!(log.push(AlertSource::Ai, "A"));
        assert!(log.push(AlertSource::Ai, "B"));
        assert_eq!(log.len(), 1);
    }
}
