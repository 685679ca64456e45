//! Persistence Synchronizer
//!
//! Keeps the durable and backup storage locations consistent. The durable
//! store is authoritative for all reads; the backup exists solely for
//! recovery after the durable store has been externally cleared. Values
//! that fail to parse read as absent. Writes are last-write-wins; nothing
//! locks across concurrent writers, a known consistency gap shared with
//! browser storage across tabs.

use crate::config::AttributionConfig;
use crate::models::AttributionRecord;
use crate::store::{Clock, StorePort};

use chrono::Duration;
use std::sync::Arc;

pub struct PersistenceSynchronizer {
    durable: Arc<dyn StorePort>,
    backup: Arc<dyn StorePort>,
    clock: Arc<dyn Clock>,
    config: AttributionConfig,
}

impl PersistenceSynchronizer {
    pub fn new(
        durable: Arc<dyn StorePort>,
        backup: Arc<dyn StorePort>,
        clock: Arc<dyn Clock>,
        config: AttributionConfig,
    ) -> Self {
        Self {
            durable,
            backup,
            clock,
            config,
        }
    }

    /// Record currently held by the durable store, if parseable and
    /// non-empty.
    pub fn current_durable(&self) -> Option<AttributionRecord> {
        decode(self.durable.get(&self.config.durable_key)?)
    }

    /// Record currently held by the backup store, if parseable and
    /// non-empty.
    pub fn current_backup(&self) -> Option<AttributionRecord> {
        decode(self.backup.get(&self.config.backup_key)?)
    }

    /// Raw backup value, for callers that adopt it verbatim.
    pub fn raw_backup(&self) -> Option<String> {
        self.backup.get(&self.config.backup_key)
    }

    /// Serialize `record` identically to both stores. The backup entry
    /// carries the configured expiration horizon.
    pub fn reconcile(&self, record: &AttributionRecord) {
        let serialized = match serde_json::to_string(record) {
            Ok(s) => s,
            Err(e) => {
                // Record fields are all plain strings/timestamps; this
                // should be unreachable, and persistence must not fail.
                tracing::warn!("attribution record failed to serialize: {e}");
                return;
            }
        };

        let expires_at = self.clock.now() + Duration::days(self.config.expiration_days);
        self.durable.put(&self.config.durable_key, &serialized, None);
        self.backup
            .put(&self.config.backup_key, &serialized, Some(expires_at));
    }

    /// Copy the backup record into the durable store when the durable
    /// store is empty. This is the only path by which data moves
    /// backup -> durable, and it never consults URL or referrer signals.
    pub fn self_heal(&self) {
        if self.current_durable().is_some() {
            return;
        }

        let Some(raw) = self.raw_backup() else {
            return;
        };
        if decode(raw.clone()).is_none() {
            return;
        }

        tracing::debug!("durable attribution missing, restored from backup");
        self.durable.put(&self.config.durable_key, &raw, None);
    }
}

/// Parse a stored value, collapsing corruption and empty records to
/// absence. Storage problems never surface as errors.
fn decode(raw: String) -> Option<AttributionRecord> {
    serde_json::from_str::<AttributionRecord>(&raw)
        .ok()
        .filter(|record| !record.is_empty())
}
