//! Event Recorder
//!
//! Appends normalized interaction events to the session log, stamping each
//! with the current attribution snapshot and the visitor identity. The log
//! is append-only and unbounded within a session; eviction is out of
//! scope. When consent is withheld the event is still constructed (and
//! returned for inspection) but never appended.

use crate::config::AttributionConfig;
use crate::models::{EventType, InteractionEvent};
use crate::store::{Clock, ConsentSignal, StorePort};
use crate::sync::PersistenceSynchronizer;

use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct EventRecorder {
    log: Vec<InteractionEvent>,
    sync: Arc<PersistenceSynchronizer>,
    durable: Arc<dyn StorePort>,
    clock: Arc<dyn Clock>,
    consent: Arc<dyn ConsentSignal>,
    config: AttributionConfig,
}

impl EventRecorder {
    pub fn new(
        sync: Arc<PersistenceSynchronizer>,
        durable: Arc<dyn StorePort>,
        clock: Arc<dyn Clock>,
        consent: Arc<dyn ConsentSignal>,
        config: AttributionConfig,
    ) -> Self {
        Self {
            log: Vec::new(),
            sync,
            durable,
            clock,
            consent,
            config,
        }
    }

    /// The visitor identity, created on first use and persisted under the
    /// identity key with the configured horizon. Never regenerated while
    /// the durable store survives.
    pub fn identity(&self) -> String {
        if let Some(existing) = self.durable.get(&self.config.identity_key) {
            return existing;
        }

        let identity = Uuid::new_v4().to_string();
        let expires_at = self.clock.now() + Duration::days(self.config.expiration_days);
        self.durable
            .put(&self.config.identity_key, &identity, Some(expires_at));
        tracing::debug!(identity = %identity, "visitor identity created");
        identity
    }

    /// Record one interaction. The returned event is always fully
    /// constructed; it reaches the log only when consent allows.
    pub fn record(
        &mut self,
        event_type: EventType,
        details: HashMap<String, String>,
        page_url: &str,
    ) -> InteractionEvent {
        let event = InteractionEvent {
            event_type,
            timestamp: self.clock.now(),
            attribution: self.sync.current_durable(),
            identity: self.identity(),
            page_url: page_url.to_string(),
            details,
        };

        if !self.consent.allowed() {
            tracing::debug!(event_type = %event.event_type, "consent withheld, event suppressed");
            return event;
        }

        self.log.push(event.clone());
        event
    }

    /// The append-ordered session log.
    pub fn log(&self) -> &[InteractionEvent] {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttributionRecord;
    use crate::store::{ManualClock, MemoryStore, SharedConsent};

    struct Fixture {
        clock: Arc<ManualClock>,
        consent: SharedConsent,
        sync: Arc<PersistenceSynchronizer>,
        recorder: EventRecorder,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::starting_at(
            "2024-01-01T00:00:00Z".parse().unwrap(),
        ));
        let config = AttributionConfig::default();
        let durable: Arc<MemoryStore> = Arc::new(MemoryStore::new(clock.clone()));
        let backup = Arc::new(MemoryStore::with_size_limit(
            clock.clone(),
            config.backup_max_bytes,
        ));
        let sync = Arc::new(PersistenceSynchronizer::new(
            durable.clone(),
            backup,
            clock.clone(),
            config.clone(),
        ));
        let consent = SharedConsent::new(true);
        let recorder = EventRecorder::new(
            sync.clone(),
            durable,
            clock.clone(),
            Arc::new(consent.clone()),
            config,
        );
        Fixture {
            clock,
            consent,
            sync,
            recorder,
        }
    }

    #[test]
    fn test_identity_is_stable() {
        let mut f = fixture();
        let first = f.recorder.record(EventType::PageView, HashMap::new(), "https://example.com/");
        f.clock.advance_millis(1000);
        let second =
            f.recorder.record(EventType::ButtonClick, HashMap::new(), "https://example.com/");

        assert_eq!(first.identity, second.identity);
        assert_eq!(f.recorder.identity(), first.identity);
    }

    #[test]
    fn test_event_carries_attribution_snapshot() {
        let mut f = fixture();
        let record = AttributionRecord::from_campaign(
            &HashMap::from([("utm_source".to_string(), "google".to_string())]),
            f.clock.now(),
            "https://example.com/",
        );
        f.sync.reconcile(&record);

        let event = f
            .recorder
            .record(EventType::PageView, HashMap::new(), "https://example.com/");
        assert_eq!(event.attribution, Some(record));
    }

    #[test]
    fn test_unattributed_event_still_recorded() {
        let mut f = fixture();
        let event = f
            .recorder
            .record(EventType::PageView, HashMap::new(), "https://example.com/");
        assert_eq!(event.attribution, None);
        assert_eq!(f.recorder.log().len(), 1);
    }

    #[test]
    fn test_consent_withheld_suppresses_append() {
        let mut f = fixture();
        f.consent.set(false);

        let event = f.recorder.record(
            EventType::ButtonClick,
            HashMap::from([("element_id".to_string(), "cta".to_string())]),
            "https://example.com/pricing",
        );

        // Constructed and inspectable, but never appended.
        assert_eq!(event.event_type, EventType::ButtonClick);
        assert_eq!(event.page_url, "https://example.com/pricing");
        assert!(f.recorder.log().is_empty());

        // Consent granted again: recording resumes.
        f.consent.set(true);
        f.recorder
            .record(EventType::ButtonClick, HashMap::new(), "https://example.com/");
        assert_eq!(f.recorder.log().len(), 1);
    }

    #[test]
    fn test_log_preserves_append_order() {
        let mut f = fixture();
        f.recorder
            .record(EventType::PageView, HashMap::new(), "https://example.com/");
        f.clock.advance_millis(10);
        f.recorder
            .record(EventType::ButtonClick, HashMap::new(), "https://example.com/");
        f.clock.advance_millis(10);
        f.recorder
            .record(EventType::FormSubmission, HashMap::new(), "https://example.com/");

        let types: Vec<_> = f.recorder.log().iter().map(|e| e.event_type.clone()).collect();
        assert_eq!(
            types,
            vec![
                EventType::PageView,
                EventType::ButtonClick,
                EventType::FormSubmission
            ]
        );
    }
}
