//! Per-request session capability used by the access layer.
//!
//! The transport owns persistence; the access layer only reads and writes a
//! handful of string keys through [`SessionState`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::services::ServiceError;

#[async_trait]
pub trait SessionState: Send + Sync {
    async fn read_key(&self, key: &str) -> Result<Option<String>, ServiceError>;
    async fn write_key(&self, key: &str, value: String) -> Result<(), ServiceError>;
    async fn delete_key(&self, key: &str) -> Result<(), ServiceError>;
}

#[async_trait]
impl SessionState for Session {
    async fn read_key(&self, key: &str) -> Result<Option<String>, ServiceError> {
        self.get::<String>(key)
            .await
            .map_err(|e| ServiceError::Session(e.to_string()))
    }

    async fn write_key(&self, key: &str, value: String) -> Result<(), ServiceError> {
        self.insert(key, value)
            .await
            .map_err(|e| ServiceError::Session(e.to_string()))
    }

    async fn delete_key(&self, key: &str) -> Result<(), ServiceError> {
        self.remove::<String>(key)
            .await
            .map(|_| ())
            .map_err(|e| ServiceError::Session(e.to_string()))
    }
}

/// Names of the session keys the access layer touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    /// Slug of the last organization the caller worked in.
    pub active_organization: String,
    /// Path to return to after login.
    pub next: String,
    /// RFC 3339 instant until which the session counts as re-authenticated.
    pub sudo_until: String,
    /// JSON-encoded queue of [`FlashMessage`]s.
    pub messages: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            active_organization: "activeorg".to_string(),
            next: "_next".to_string(),
            sudo_until: "_sudo_until".to_string(),
            messages: "_messages".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl FlashMessage {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}

pub async fn push_message(
    session: &dyn SessionState,
    key: &str,
    message: FlashMessage,
) -> Result<(), ServiceError> {
    let mut messages = read_messages(session, key).await?;
    messages.push(message);
    let encoded = serde_json::to_string(&messages)
        .map_err(|e| ServiceError::Session(format!("cannot encode messages: {}", e)))?;
    session.write_key(key, encoded).await
}

/// Return and clear every queued message.
pub async fn take_messages(
    session: &dyn SessionState,
    key: &str,
) -> Result<Vec<FlashMessage>, ServiceError> {
    let messages = read_messages(session, key).await?;
    if !messages.is_empty() {
        session.delete_key(key).await?;
    }
    Ok(messages)
}

async fn read_messages(
    session: &dyn SessionState,
    key: &str,
) -> Result<Vec<FlashMessage>, ServiceError> {
    match session.read_key(key).await? {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(messages) => Ok(messages),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable session messages");
                Ok(Vec::new())
            }
        },
        None => Ok(Vec::new()),
    }
}

/// Whether the session holds an unexpired sudo marker.
pub async fn is_sudo(
    session: &dyn SessionState,
    key: &str,
    now: DateTime<Utc>,
) -> Result<bool, ServiceError> {
    let Some(raw) = session.read_key(key).await? else {
        return Ok(false);
    };

    match DateTime::parse_from_rfc3339(&raw) {
        Ok(until) => Ok(until.with_timezone(&Utc) > now),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed sudo marker");
            Ok(false)
        }
    }
}

/// Session kept in process memory, for tests and tooling. Counts writes so
/// callers can assert that an operation left the session untouched.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    /// Number of `write_key` and `delete_key` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionState for MemorySession {
    async fn read_key(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let values = self
            .values
            .lock()
            .map_err(|e| ServiceError::Session(format!("session mutex poisoned: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    async fn write_key(&self, key: &str, value: String) -> Result<(), ServiceError> {
        self.values
            .lock()
            .map_err(|e| ServiceError::Session(format!("session mutex poisoned: {}", e)))?
            .insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<(), ServiceError> {
        self.values
            .lock()
            .map_err(|e| ServiceError::Session(format!("session mutex poisoned: {}", e)))?
            .remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_messages_are_queued_then_drained() {
        let session = MemorySession::new();
        push_message(&session, "_messages", FlashMessage::error("first"))
            .await
            .unwrap();
        push_message(&session, "_messages", FlashMessage::error("second"))
            .await
            .unwrap();

        let messages = take_messages(&session, "_messages").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "first");

        assert!(take_messages(&session, "_messages").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sudo_marker_expiry() {
        let now = Utc::now();
        let session =
            MemorySession::new().with_value("_sudo_until", &(now + Duration::minutes(5)).to_rfc3339());
        assert!(is_sudo(&session, "_sudo_until", now).await.unwrap());
        assert!(!is_sudo(&session, "_sudo_until", now + Duration::minutes(10))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_missing_or_malformed_sudo_marker() {
        let now = Utc::now();
        assert!(!is_sudo(&MemorySession::new(), "_sudo_until", now).await.unwrap());

        let session = MemorySession::new().with_value("_sudo_until", "tomorrow");
        assert!(!is_sudo(&session, "_sudo_until", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_session_counts_writes() {
        let session = MemorySession::new();
        session.write_key("a", "1".to_string()).await.unwrap();
        session.delete_key("a").await.unwrap();
        assert_eq!(session.writes(), 2);
        assert_eq!(session.value("a"), None);
    }
}
