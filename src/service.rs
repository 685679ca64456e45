//! Attribution Tracking Service
//!
//! `Tracker` is the per-visitor core: it owns the synchronizer and
//! recorder for one visitor context and exposes the page-entry,
//! event-recording, and reporting operations. `TrackerService` is the
//! async registry the HTTP surface talks to, holding one `Tracker` per
//! client key.

use crate::config::AttributionConfig;
use crate::models::{
    AttributionRecord, EventType, InteractionEvent, PageContext, Report,
};
use crate::recorder::EventRecorder;
use crate::report::aggregate;
use crate::resolver::{resolve, ResolveInputs};
use crate::store::{Clock, MemoryStore, SharedConsent, StorePort};
use crate::sync::PersistenceSynchronizer;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================
// Per-Visitor Tracker
// ============================================

/// Tracking core for a single visitor context, constructed with injected
/// clock, storage, and consent ports.
pub struct Tracker {
    sync: Arc<PersistenceSynchronizer>,
    recorder: EventRecorder,
    consent: SharedConsent,
    clock: Arc<dyn Clock>,
}

impl Tracker {
    pub fn new(
        durable: Arc<dyn StorePort>,
        backup: Arc<dyn StorePort>,
        clock: Arc<dyn Clock>,
        consent: SharedConsent,
        config: AttributionConfig,
    ) -> Self {
        let sync = Arc::new(PersistenceSynchronizer::new(
            durable.clone(),
            backup,
            clock.clone(),
            config.clone(),
        ));
        let recorder = EventRecorder::new(
            sync.clone(),
            durable,
            clock.clone(),
            Arc::new(consent.clone()),
            config,
        );

        Self {
            sync,
            recorder,
            consent,
            clock,
        }
    }

    /// Consent handle for this visitor. Attribution capture is
    /// consent-independent; the flag gates event recording only.
    pub fn consent(&self) -> &SharedConsent {
        &self.consent
    }

    /// Handle a page entry: resolve attribution, persist it, then record
    /// the `page_view` event.
    ///
    /// Recognized `details` key for page views: `title`.
    ///
    /// Resolution is reconciled to both stores BEFORE the event is
    /// recorded, so the event's attribution snapshot can never miss a
    /// record that exists a moment later.
    pub fn page_ready(
        &mut self,
        ctx: &PageContext,
        details: HashMap<String, String>,
    ) -> (Option<AttributionRecord>, InteractionEvent) {
        self.sync.self_heal();

        let existing = self.sync.current_durable();
        let backup_value = self.sync.raw_backup();
        let resolved = resolve(&ResolveInputs {
            existing: existing.as_ref(),
            backup_value: backup_value.as_deref(),
            page: ctx,
            now: self.clock.now(),
        });

        if let Some(record) = &resolved {
            self.sync.reconcile(record);
        }

        let event = self.recorder.record(EventType::PageView, details, &ctx.url);
        (resolved, event)
    }

    /// Record an interaction event against the current attribution
    /// snapshot and identity. Returns the event and whether it reached
    /// the log (consent may suppress the append).
    pub fn record_event(
        &mut self,
        event_type: EventType,
        details: HashMap<String, String>,
        page_url: &str,
    ) -> (InteractionEvent, bool) {
        let before = self.recorder.log().len();
        let event = self.recorder.record(event_type, details, page_url);
        let tracked = self.recorder.log().len() > before;
        (event, tracked)
    }

    /// The authoritative attribution record, read from the durable store.
    pub fn attribution(&self) -> Option<AttributionRecord> {
        self.sync.current_durable()
    }

    /// Aggregate the session log into a report.
    pub fn generate_report(&self) -> Report {
        aggregate(self.recorder.log())
    }

    fn recorder_len(&self) -> usize {
        self.recorder.log().len()
    }
}

// ============================================
// Client Registry
// ============================================

/// Async registry of per-client trackers used by the HTTP handlers. Each
/// client key gets its own storage pair and consent flag, created on
/// first use.
pub struct TrackerService {
    trackers: RwLock<HashMap<String, Tracker>>,
    clock: Arc<dyn Clock>,
    config: AttributionConfig,
}

impl TrackerService {
    pub fn new(clock: Arc<dyn Clock>, config: AttributionConfig) -> Self {
        Self {
            trackers: RwLock::new(HashMap::new()),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AttributionConfig {
        &self.config
    }

    fn new_tracker(&self) -> Tracker {
        let durable = Arc::new(MemoryStore::new(self.clock.clone()));
        let backup = Arc::new(MemoryStore::with_size_limit(
            self.clock.clone(),
            self.config.backup_max_bytes,
        ));
        Tracker::new(
            durable,
            backup,
            self.clock.clone(),
            SharedConsent::new(true),
            self.config.clone(),
        )
    }

    /// Page entry for `client`. Consent applies to the `page_view` event,
    /// not to attribution capture.
    pub async fn page_view(
        &self,
        client: &str,
        consent: bool,
        ctx: PageContext,
        details: HashMap<String, String>,
    ) -> (Option<AttributionRecord>, InteractionEvent, bool) {
        let mut trackers = self.trackers.write().await;
        let tracker = trackers
            .entry(client.to_string())
            .or_insert_with(|| self.new_tracker());
        tracker.consent().set(consent);

        let before = tracker.recorder_len();
        let (resolved, event) = tracker.page_ready(&ctx, details);
        let tracked = tracker.recorder_len() > before;
        (resolved, event, tracked)
    }

    /// Record an interaction event for `client`.
    pub async fn track(
        &self,
        client: &str,
        consent: bool,
        event_type: EventType,
        details: HashMap<String, String>,
        page_url: &str,
    ) -> (InteractionEvent, bool) {
        let mut trackers = self.trackers.write().await;
        let tracker = trackers
            .entry(client.to_string())
            .or_insert_with(|| self.new_tracker());
        tracker.consent().set(consent);
        tracker.record_event(event_type, details, page_url)
    }

    /// Current attribution record for `client`, if any.
    pub async fn attribution(&self, client: &str) -> Option<AttributionRecord> {
        self.trackers
            .read()
            .await
            .get(client)
            .and_then(|t| t.attribution())
    }

    /// Aggregate report for `client`. Unknown clients get an empty report.
    pub async fn report(&self, client: &str) -> Report {
        self.trackers
            .read()
            .await
            .get(client)
            .map(|t| t.generate_report())
            .unwrap_or_default()
    }
}
