use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enum representing the severity of a log message for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A single operator-facing log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogMessage {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// Renders as `[HH:MM:SS] message` in local time, the format shown to the operator.
impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local = self.timestamp.with_timezone(&Local);
        write!(f, "[{}] {}", local.format("%H:%M:%S"), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_a_clock_time() {
        let msg = LogMessage::new(LogLevel::Info, "monitoring started");
        let rendered = msg.to_string();

        // "[HH:MM:SS] " is 11 characters.
        assert_eq!(&rendered[0..1], "[");
        assert_eq!(&rendered[9..11], "] ");
        assert!(rendered.ends_with("monitoring started"));
    }

    #[test]
    fn level_serializes_by_name() {
        let json = serde_json::to_string(&LogMessage::new(LogLevel::Warn, "x")).unwrap();
        assert!(json.contains("\"level\":\"Warn\""));
    }
}
