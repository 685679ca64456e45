//! Attribution Configuration
//!
//! All configuration values are loaded from environment variables.
//! Storage key names are configurable so multiple sites sharing a host
//! never collide on the same keys.

use crate::error::AttributionError;
use std::env;

/// Attribution configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AttributionConfig {
    /// Durable store key for the serialized attribution record (from ATTR_DURABLE_KEY env var)
    pub durable_key: String,

    /// Backup store key for the serialized attribution record (from ATTR_BACKUP_KEY env var)
    pub backup_key: String,

    /// Durable store key for the visitor identity (from ATTR_IDENTITY_KEY env var)
    pub identity_key: String,

    /// Expiration horizon in days for backup and identity entries (from ATTR_EXPIRATION_DAYS env var)
    pub expiration_days: i64,

    /// Maximum serialized value size accepted by the backup store in bytes (from ATTR_BACKUP_MAX_BYTES env var)
    pub backup_max_bytes: usize,

    /// Whether event tracking is enabled at all (from ATTR_TRACKING_ENABLED env var)
    pub tracking_enabled: bool,
}

impl AttributionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            durable_key: env::var("ATTR_DURABLE_KEY")
                .unwrap_or_else(|_| "rp_attribution".to_string()),

            backup_key: env::var("ATTR_BACKUP_KEY")
                .unwrap_or_else(|_| "rp_attribution_bak".to_string()),

            identity_key: env::var("ATTR_IDENTITY_KEY")
                .unwrap_or_else(|_| "rp_visitor_id".to_string()),

            expiration_days: env::var("ATTR_EXPIRATION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(90),

            backup_max_bytes: env::var("ATTR_BACKUP_MAX_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4096), // cookie-sized backup location

            tracking_enabled: env::var("ATTR_TRACKING_ENABLED")
                .ok()
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AttributionError> {
        if self.durable_key.is_empty() || self.backup_key.is_empty() || self.identity_key.is_empty()
        {
            return Err(AttributionError::Config(
                "storage key names must not be empty".to_string(),
            ));
        }

        if self.durable_key == self.backup_key {
            return Err(AttributionError::Config(
                "ATTR_DURABLE_KEY and ATTR_BACKUP_KEY must differ".to_string(),
            ));
        }

        if self.expiration_days <= 0 {
            return Err(AttributionError::Config(
                "ATTR_EXPIRATION_DAYS must be positive".to_string(),
            ));
        }

        if self.backup_max_bytes < 512 {
            return Err(AttributionError::Config(
                "ATTR_BACKUP_MAX_BYTES must be at least 512".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            durable_key: "rp_attribution".to_string(),
            backup_key: "rp_attribution_bak".to_string(),
            identity_key: "rp_visitor_id".to_string(),
            expiration_days: 90,
            backup_max_bytes: 4096,
            tracking_enabled: true,
        }
    }
}
