//! In-memory security audit log
//!
//! A bounded ring buffer: once `capacity` entries are held the oldest is
//! evicted first. Details are redacted before they are stored, and every
//! entry is mirrored to `tracing`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::Result;

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 1000;

/// Replacement text for sensitive fields
pub const REDACTED: &str = "[REDACTED]";

/// Field names (compared case-insensitively) whose values are never stored
const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "apikey",
    "api_key",
    "secret",
    "ssn",
    "creditcard",
    "authorization",
    "access_token",
    "refresh_token",
];

/// Severity of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
    Critical,
}

/// One audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: AuditLevel,
    pub event: String,
    /// Redacted event details
    pub details: Value,
}

/// Bounded, redacting audit log
pub struct AuditLogger {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl AuditLogger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record an event
    pub fn log(&self, level: AuditLevel, event: &str, details: Value) -> AuditEntry {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            event: event.to_string(),
            details: redact(details),
        };

        match level {
            AuditLevel::Info => info!(target: "audit", event, details = %entry.details),
            AuditLevel::Warning => warn!(target: "audit", event, details = %entry.details),
            AuditLevel::Error | AuditLevel::Critical => {
                error!(target: "audit", event, level = ?level, details = %entry.details)
            }
        }

        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    pub fn info(&self, event: &str, details: Value) -> AuditEntry {
        self.log(AuditLevel::Info, event, details)
    }

    pub fn warning(&self, event: &str, details: Value) -> AuditEntry {
        self.log(AuditLevel::Warning, event, details)
    }

    pub fn error(&self, event: &str, details: Value) -> AuditEntry {
        self.log(AuditLevel::Error, event, details)
    }

    pub fn critical(&self, event: &str, details: Value) -> AuditEntry {
        self.log(AuditLevel::Critical, event, details)
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().iter().cloned().collect()
    }

    /// The `n` most recent entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<AuditEntry> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn by_level(&self, level: AuditLevel) -> Vec<AuditEntry> {
        self.lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Serialize every entry as a JSON array
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn is_sensitive(field: &str) -> bool {
    SENSITIVE_FIELDS
        .iter()
        .any(|name| name.eq_ignore_ascii_case(field))
}

/// Blank sensitive fields anywhere in `value`
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let v = if is_sensitive(&k) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact(v)
                    };
                    (k, v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}
