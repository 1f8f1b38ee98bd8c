//! Activity log entries shown next to the session table.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A timestamped diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LogEntry {
    /// When the message was produced.
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Local>,
    /// Message text.
    pub message: String,
}

impl LogEntry {
    /// Creates an entry stamped with the current local time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }

    /// Formats the entry as a single `HH:MM:SS message` line.
    pub fn line(&self) -> String {
        format!("{} {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_line_format() {
        let entry = LogEntry {
            timestamp: Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap(),
            message: "Connection to b failed".into(),
        };
        assert_eq!(entry.line(), "09:05:07 Connection to b failed");
    }
}
