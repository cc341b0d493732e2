//! In-memory log sink for asserting on log output.

use claw_webapp::logger::{LogLevel, LogRecord, LogSink};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub level: LogLevel,
    pub scope: String,
    pub message: String,
}

#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Captured>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<Captured> {
        self.records.lock().unwrap().clone()
    }

    /// Messages logged under exactly `scope`.
    pub fn lines_in(&self, scope: &str) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.scope == scope)
            .map(|r| r.message)
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.level == LogLevel::Warn)
            .map(|r| r.message)
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}

impl LogSink for RecordingSink {
    fn write(&self, record: &LogRecord<'_>) {
        self.records.lock().unwrap().push(Captured {
            level: record.level,
            scope: record.scope.to_string(),
            message: record.message.to_string(),
        });
    }
}
