//! RustPress Attribution Plugin
//!
//! Marketing attribution system for RustPress providing:
//! - First-touch attribution from campaign tags and referrers
//! - Durable/backup store reconciliation with self-healing recovery
//! - Consent-gated interaction event recording
//! - Funnel, source, and visitor-journey reporting
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `ATTR_DURABLE_KEY` - Durable store key for the record (default: "rp_attribution")
//! - `ATTR_BACKUP_KEY` - Backup store key for the record (default: "rp_attribution_bak")
//! - `ATTR_IDENTITY_KEY` - Durable store key for the visitor identity (default: "rp_visitor_id")
//! - `ATTR_EXPIRATION_DAYS` - Backup/identity expiration horizon (default: 90)
//! - `ATTR_BACKUP_MAX_BYTES` - Backup store value-size limit (default: 4096)
//! - `ATTR_TRACKING_ENABLED` - Master tracking switch (default: true)
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustpress_attribution::{AttributionPlugin, Plugin};
//!
//! // Initialize plugin
//! let plugin = AttributionPlugin::new();
//! plugin.activate().await?;
//!
//! // Use tracker service
//! let service = plugin.tracker_service().await.unwrap();
//! let report = service.report(&client_id).await;
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod recorder;
pub mod report;
pub mod resolver;
pub mod service;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use config::AttributionConfig;
pub use error::AttributionError;
pub use extractors::ClientContext;
pub use handlers::AttributionState;
pub use models::*;
pub use resolver::{resolve, ResolveInputs};
pub use service::{Tracker, TrackerService};
pub use store::{Clock, ConsentSignal, ManualClock, MemoryStore, SharedConsent, StorePort, SystemClock};

use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================
// Plugin Types (Standalone - no external deps)
// ============================================

/// Plugin state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Inactive,
    Active,
    Error,
}

/// Plugin metadata
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Plugin lifecycle trait
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Get plugin information
    fn info(&self) -> &PluginInfo;

    /// Get current plugin state
    async fn state(&self) -> PluginState;

    /// Activate the plugin
    async fn activate(&self) -> Result<(), AttributionError>;

    /// Deactivate the plugin
    async fn deactivate(&self) -> Result<(), AttributionError>;

    /// Get plugin routes
    fn routes(&self) -> Option<Router>;
}

// ============================================
// Attribution Plugin Implementation
// ============================================

/// RustPress Attribution Plugin
///
/// Provides first-touch attribution and event tracking as a standalone
/// plugin.
pub struct AttributionPlugin {
    info: PluginInfo,
    state: RwLock<PluginState>,
    config: RwLock<Option<AttributionConfig>>,
    tracker_service: RwLock<Option<Arc<TrackerService>>>,
}

impl AttributionPlugin {
    /// Create a new attribution plugin instance
    pub fn new() -> Self {
        Self {
            info: PluginInfo {
                id: "rustpress-attribution".into(),
                name: "RustPress Attribution".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                description: "Marketing attribution system for RustPress".into(),
            },
            state: RwLock::new(PluginState::Inactive),
            config: RwLock::new(None),
            tracker_service: RwLock::new(None),
        }
    }

    /// Get the attribution configuration
    pub async fn config(&self) -> Option<AttributionConfig> {
        self.config.read().await.clone()
    }

    /// Get the tracker service
    pub async fn tracker_service(&self) -> Option<Arc<TrackerService>> {
        self.tracker_service.read().await.clone()
    }
}

impl Default for AttributionPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for AttributionPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn state(&self) -> PluginState {
        *self.state.read().await
    }

    async fn activate(&self) -> Result<(), AttributionError> {
        tracing::info!("Activating RustPress Attribution plugin");

        // Load configuration from environment
        let config = AttributionConfig::from_env();
        config.validate()?;

        // Initialize tracker service
        let service = Arc::new(TrackerService::new(
            Arc::new(store::SystemClock),
            config.clone(),
        ));

        // Store state
        *self.config.write().await = Some(config);
        *self.tracker_service.write().await = Some(service);
        *self.state.write().await = PluginState::Active;

        tracing::info!("RustPress Attribution plugin activated successfully");
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), AttributionError> {
        tracing::info!("Deactivating RustPress Attribution plugin");

        *self.tracker_service.write().await = None;
        *self.config.write().await = None;
        *self.state.write().await = PluginState::Inactive;

        tracing::info!("RustPress Attribution plugin deactivated");
        Ok(())
    }

    fn routes(&self) -> Option<Router> {
        // Routes are created dynamically when the tracker service is
        // available. Use create_routes() instead.
        None
    }
}

/// Create attribution routes
///
/// Call this after activating the plugin to get the router with all
/// tracking and reporting endpoints.
pub fn create_routes(service: Arc<TrackerService>) -> Router {
    handlers::create_routes(service)
}

// ============================================
// Module Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_info() {
        let plugin = AttributionPlugin::new();
        assert_eq!(plugin.info.id, "rustpress-attribution");
        assert_eq!(plugin.info.name, "RustPress Attribution");
    }

    #[tokio::test]
    async fn test_plugin_initial_state() {
        let plugin = AttributionPlugin::new();
        assert_eq!(plugin.state().await, PluginState::Inactive);
    }

    #[tokio::test]
    async fn test_plugin_activation_cycle() {
        let plugin = AttributionPlugin::new();

        plugin.activate().await.unwrap();
        assert_eq!(plugin.state().await, PluginState::Active);
        assert!(plugin.tracker_service().await.is_some());

        plugin.deactivate().await.unwrap();
        assert_eq!(plugin.state().await, PluginState::Inactive);
        assert!(plugin.tracker_service().await.is_none());
    }
}
