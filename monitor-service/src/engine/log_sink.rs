//! Bounded, chronologically ordered log buffer.

use std::collections::VecDeque;

use common::models::LogEntry;

/// Fixed-capacity FIFO of log entries.
///
/// Entries are kept sorted by timestamp; when full, the oldest entry is
/// evicted first.
#[derive(Debug, Clone)]
pub struct LogSink {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogSink {
    /// Creates an empty sink. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        // Producers run concurrently, so an entry may arrive slightly after a
        // newer one. Insert behind every entry not newer than it.
        let pos = self
            .entries
            .iter()
            .rposition(|e| e.timestamp <= entry.timestamp)
            .map_or(0, |i| i + 1);
        self.entries.insert(pos, entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Copies the current contents, oldest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    fn entry_at(offset_secs: i64, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Local::now() + Duration::seconds(offset_secs),
            message: message.into(),
        }
    }

    fn messages(sink: &LogSink) -> Vec<&str> {
        sink.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut sink = LogSink::new(4);
        for i in 0..20 {
            sink.push(entry_at(i, &format!("m{}", i)));
            assert!(sink.len() <= sink.capacity());
        }
        assert_eq!(messages(&sink), vec!["m16", "m17", "m18", "m19"]);
    }

    #[test]
    fn test_late_entry_is_placed_chronologically() {
        let mut sink = LogSink::new(4);
        sink.push(entry_at(0, "first"));
        sink.push(entry_at(10, "third"));
        sink.push(entry_at(5, "second"));
        assert_eq!(messages(&sink), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_entry_older_than_everything_is_evicted_when_full() {
        let mut sink = LogSink::new(2);
        sink.push(entry_at(10, "b"));
        sink.push(entry_at(20, "c"));
        sink.push(entry_at(0, "a"));
        assert_eq!(messages(&sink), vec!["b", "c"]);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut sink = LogSink::new(0);
        sink.push(entry_at(0, "a"));
        sink.push(entry_at(1, "b"));
        assert_eq!(sink.capacity(), 1);
        assert_eq!(messages(&sink), vec!["b"]);
    }
}
