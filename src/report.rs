//! Report Aggregator
//!
//! Folds the append-ordered event log into per-source counts, funnel
//! counts, and per-identity journeys with elapsed-time series. Aggregation
//! never fails on malformed events: an event without an attribution
//! snapshot counts under the "unknown" source, so `total_events` always
//! equals the log length.

use crate::models::{InteractionEvent, JourneyStep, Report, UNKNOWN_SOURCE};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Aggregate the event log in one chronological pass. Events sharing a
/// timestamp keep their log append order.
pub fn aggregate(log: &[InteractionEvent]) -> Report {
    let mut report = Report {
        total_events: log.len(),
        ..Report::default()
    };

    let mut epochs: HashMap<&str, DateTime<Utc>> = HashMap::new();

    for event in log {
        let source = event
            .attribution
            .as_ref()
            .and_then(|a| a.source.as_deref())
            .unwrap_or(UNKNOWN_SOURCE);
        *report.source_counts.entry(source.to_string()).or_insert(0) += 1;

        *report
            .funnel_counts
            .entry(event.event_type.name().to_string())
            .or_insert(0) += 1;

        let epoch = *epochs
            .entry(event.identity.as_str())
            .or_insert(event.timestamp);
        let elapsed_ms = (event.timestamp - epoch).num_milliseconds();

        report
            .time_metrics
            .entry(event.identity.clone())
            .or_default()
            .push(elapsed_ms);
        report
            .user_journeys
            .entry(event.identity.clone())
            .or_default()
            .push(JourneyStep {
                event_type: event.event_type.clone(),
                timestamp: event.timestamp,
                page_url: event.page_url.clone(),
            });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributionRecord, EventType};

    fn at(offset_ms: i64) -> DateTime<Utc> {
        let base: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        base + chrono::Duration::milliseconds(offset_ms)
    }

    fn event(
        event_type: EventType,
        identity: &str,
        offset_ms: i64,
        source: Option<&str>,
    ) -> InteractionEvent {
        InteractionEvent {
            event_type,
            timestamp: at(offset_ms),
            attribution: source.map(|s| {
                AttributionRecord::from_campaign(
                    &HashMap::from([("utm_source".to_string(), s.to_string())]),
                    at(0),
                    "https://example.com/",
                )
            }),
            identity: identity.to_string(),
            page_url: "https://example.com/".to_string(),
            details: HashMap::new(),
        }
    }

    #[test]
    fn test_total_count_invariant() {
        let log = vec![
            event(EventType::PageView, "v1", 0, Some("google")),
            event(EventType::ButtonClick, "v1", 100, None),
            event(EventType::PageView, "v2", 200, Some("bing")),
        ];
        let report = aggregate(&log);
        assert_eq!(report.total_events, log.len());
    }

    #[test]
    fn test_funnel_counts_partition_the_log() {
        let log = vec![
            event(EventType::PageView, "v1", 0, Some("google")),
            event(EventType::PageView, "v2", 10, None),
            event(EventType::ButtonClick, "v1", 20, Some("google")),
            event(EventType::FormSubmission, "v1", 30, Some("google")),
            event(
                EventType::Custom("newsletter_signup".to_string()),
                "v2",
                40,
                None,
            ),
        ];
        let report = aggregate(&log);

        assert_eq!(report.funnel_counts["page_view"], 2);
        assert_eq!(report.funnel_counts["button_click"], 1);
        assert_eq!(report.funnel_counts["form_submission"], 1);
        assert_eq!(report.funnel_counts["newsletter_signup"], 1);
        assert_eq!(
            report.funnel_counts.values().sum::<u64>() as usize,
            report.total_events
        );
    }

    #[test]
    fn test_unattributed_events_group_under_unknown() {
        let log = vec![
            event(EventType::PageView, "v1", 0, Some("google")),
            event(EventType::PageView, "v2", 10, None),
            event(EventType::PageView, "v3", 20, None),
        ];
        let report = aggregate(&log);

        assert_eq!(report.source_counts["google"], 1);
        assert_eq!(report.source_counts[UNKNOWN_SOURCE], 2);
        assert_eq!(
            report.source_counts.values().sum::<u64>() as usize,
            report.total_events
        );
    }

    #[test]
    fn test_time_metrics_and_journey_ordering() {
        // page_view at t=0, button_click at t=1000ms, form_submission at
        // t=2500ms for one identity.
        let log = vec![
            event(EventType::PageView, "V1", 0, Some("google")),
            event(EventType::ButtonClick, "V1", 1000, Some("google")),
            event(EventType::FormSubmission, "V1", 2500, Some("google")),
        ];
        let report = aggregate(&log);

        assert_eq!(report.time_metrics["V1"], vec![0, 1000, 2500]);

        let journey = &report.user_journeys["V1"];
        assert_eq!(journey.len(), 3);
        assert_eq!(journey[0].event_type, EventType::PageView);
        assert_eq!(journey[1].event_type, EventType::ButtonClick);
        assert_eq!(journey[2].event_type, EventType::FormSubmission);
        assert!(journey.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_epoch_is_per_identity() {
        let log = vec![
            event(EventType::PageView, "v1", 0, None),
            event(EventType::PageView, "v2", 5000, None),
            event(EventType::ButtonClick, "v2", 5100, None),
            event(EventType::ButtonClick, "v1", 6000, None),
        ];
        let report = aggregate(&log);

        assert_eq!(report.time_metrics["v1"], vec![0, 6000]);
        assert_eq!(report.time_metrics["v2"], vec![0, 100]);
    }

    #[test]
    fn test_identical_timestamps_keep_append_order() {
        let log = vec![
            event(EventType::PageView, "v1", 0, None),
            event(EventType::ButtonClick, "v1", 0, None),
            event(EventType::FormSubmission, "v1", 0, None),
        ];
        let report = aggregate(&log);

        let journey = &report.user_journeys["v1"];
        assert_eq!(journey[0].event_type, EventType::PageView);
        assert_eq!(journey[1].event_type, EventType::ButtonClick);
        assert_eq!(journey[2].event_type, EventType::FormSubmission);
        assert_eq!(report.time_metrics["v1"], vec![0, 0, 0]);
    }

    #[test]
    fn test_empty_log_yields_empty_report() {
        let report = aggregate(&[]);
        assert_eq!(report.total_events, 0);
        assert!(report.source_counts.is_empty());
        assert!(report.funnel_counts.is_empty());
        assert!(report.user_journeys.is_empty());
    }
}
