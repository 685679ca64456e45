//! Storage, Clock, and Consent Ports
//!
//! The tracking core never talks to real browser or server storage
//! directly. It is constructed with these ports so tests supply
//! deterministic time and storage. All ports are synchronous: storage
//! reads/writes are fast and the core never waits.
//!
//! Storage never raises. A missing, expired, or unparseable value reads as
//! `None`; an oversized write to a size-limited store is a logged no-op.
//! Writes are last-write-wins with no cross-writer locking.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

// ============================================
// Ports
// ============================================

/// Wall-clock port.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Key-value storage port shared by the durable and backup locations.
pub trait StorePort: Send + Sync {
    /// Read a value. Absent and expired entries both return `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, optionally with an expiration instant.
    fn put(&self, key: &str, value: &str, expires_at: Option<DateTime<Utc>>);

    /// Remove a value if present.
    fn remove(&self, key: &str);
}

/// Consent signal queried before every event append.
pub trait ConsentSignal: Send + Sync {
    fn allowed(&self) -> bool;
}

// ============================================
// Clock Implementations
// ============================================

/// System wall clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: std::sync::atomic::AtomicI64,
}

impl ManualClock {
    pub fn starting_at(instant: DateTime<Utc>) -> Self {
        Self {
            millis: std::sync::atomic::AtomicI64::new(instant.timestamp_millis()),
        }
    }

    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or_else(Utc::now)
    }
}

// ============================================
// Memory Store
// ============================================

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory key-value store with per-entry expiration and an optional
/// value-size limit (the backup location is cookie-sized).
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    max_value_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            max_value_bytes: None,
        }
    }

    /// A store that silently rejects values larger than `max_value_bytes`.
    pub fn with_size_limit(clock: Arc<dyn Clock>, max_value_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            max_value_bytes: Some(max_value_bytes),
        }
    }

    /// Drop every entry, modeling an external storage clearance.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

impl StorePort for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = entries.get(key)?;

        if let Some(expires_at) = entry.expires_at {
            if expires_at <= self.clock.now() {
                return None;
            }
        }

        Some(entry.value.clone())
    }

    fn put(&self, key: &str, value: &str, expires_at: Option<DateTime<Utc>>) {
        if let Some(limit) = self.max_value_bytes {
            if value.len() > limit {
                tracing::debug!(key = %key, size = value.len(), limit, "value exceeds store limit, write skipped");
                return;
            }
        }

        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at,
                },
            );
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
    }
}

// ============================================
// Consent Implementations
// ============================================

/// Shared mutable consent flag. The host flips it as the visitor grants or
/// withdraws consent; the recorder reads it per event.
#[derive(Debug, Clone)]
pub struct SharedConsent {
    allowed: Arc<AtomicBool>,
}

impl SharedConsent {
    pub fn new(allowed: bool) -> Self {
        Self {
            allowed: Arc::new(AtomicBool::new(allowed)),
        }
    }

    pub fn set(&self, allowed: bool) {
        self.allowed.store(allowed, Ordering::SeqCst);
    }
}

impl ConsentSignal for SharedConsent {
    fn allowed(&self) -> bool {
        self.allowed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::starting_at(
            "2024-01-01T00:00:00Z".parse().unwrap(),
        ))
    }

    #[test]
    fn test_put_get_round_trip() {
        let store = MemoryStore::new(clock());
        store.put("k", "v", None);
        assert_eq!(store.get("k").as_deref(), Some("v"));

        store.remove("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_expired_entry_reads_as_absent() {
        let clock = clock();
        let store = MemoryStore::new(clock.clone());
        let expires = clock.now() + Duration::days(90);
        store.put("k", "v", Some(expires));

        assert_eq!(store.get("k").as_deref(), Some("v"));

        clock.advance_millis(Duration::days(91).num_milliseconds());
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_oversized_write_is_skipped() {
        let store = MemoryStore::with_size_limit(clock(), 8);
        store.put("k", "tiny", None);
        assert_eq!(store.get("k").as_deref(), Some("tiny"));

        // Larger than the limit: the previous value survives untouched.
        store.put("k", "way too large for the limit", None);
        assert_eq!(store.get("k").as_deref(), Some("tiny"));
    }

    #[test]
    fn test_clear_models_external_clearance() {
        let store = MemoryStore::new(clock());
        store.put("k", "v", None);
        store.clear();
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_shared_consent_flips() {
        let consent = SharedConsent::new(true);
        assert!(consent.allowed());
        consent.set(false);
        assert!(!consent.allowed());
    }
}
