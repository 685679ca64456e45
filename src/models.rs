//! Attribution Data Models
//!
//! Data structures for attribution records, interaction events, aggregate
//! reports, and the HTTP request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

// ============================================
// Attribution Record
// ============================================

/// The marketing-source tag set captured on a visitor's first qualifying
/// visit. Once durably stored, the record is immutable until the store is
/// externally cleared (first-touch policy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionRecord {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub term: Option<String>,
    pub content: Option<String>,
    /// True when the record was derived from the referrer rather than an
    /// explicit campaign tag.
    pub fallback: bool,
    pub first_visit_at: DateTime<Utc>,
    pub first_landing_page: String,
}

impl AttributionRecord {
    /// A record with no source fields carries no attribution signal and is
    /// treated as absent everywhere.
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.medium.is_none()
            && self.campaign.is_none()
            && self.term.is_none()
            && self.content.is_none()
    }

    /// Build a record from explicit campaign parameters.
    pub fn from_campaign(
        params: &HashMap<String, String>,
        now: DateTime<Utc>,
        landing_page: &str,
    ) -> Self {
        let field = |key: &str| params.get(key).filter(|v| !v.is_empty()).cloned();

        Self {
            source: field("utm_source"),
            medium: field("utm_medium"),
            campaign: field("utm_campaign"),
            term: field("utm_term"),
            content: field("utm_content"),
            fallback: false,
            first_visit_at: now,
            first_landing_page: landing_page.to_string(),
        }
    }

    /// Build a fallback record from an inbound-link referrer source.
    pub fn from_referrer(source: &str, now: DateTime<Utc>, landing_page: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            medium: Some("referral".to_string()),
            campaign: None,
            term: None,
            content: None,
            fallback: true,
            first_visit_at: now,
            first_landing_page: landing_page.to_string(),
        }
    }
}

// ============================================
// Interaction Events
// ============================================

/// Interaction event kinds. Extensible on the wire: unrecognized names
/// round-trip through the `Custom` variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    PageView,
    ButtonClick,
    FormSubmission,
    Custom(String),
}

impl EventType {
    pub fn name(&self) -> &str {
        match self {
            EventType::PageView => "page_view",
            EventType::ButtonClick => "button_click",
            EventType::FormSubmission => "form_submission",
            EventType::Custom(name) => name,
        }
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "page_view" => EventType::PageView,
            "button_click" => EventType::ButtonClick,
            "form_submission" => EventType::FormSubmission,
            _ => EventType::Custom(name),
        }
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.name().to_string()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One recorded interaction. Immutable once appended; the event log is
/// append-only for the lifetime of the aggregation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    /// Snapshot of the attribution record at record time, or absent.
    pub attribution: Option<AttributionRecord>,
    pub identity: String,
    pub page_url: String,
    /// Constrained string-to-string detail map. Recognized keys are fixed
    /// per event type and documented at the recording call site.
    pub details: HashMap<String, String>,
}

// ============================================
// Page Context
// ============================================

/// Environment snapshot for one page load: the current URL, its query
/// parameters, and the referrer host (if any).
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub url: String,
    pub query_params: HashMap<String, String>,
    pub referrer_host: Option<String>,
}

// ============================================
// Aggregate Report
// ============================================

/// Sentinel source for events carrying no attribution snapshot.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// One step of a visitor's ordered journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyStep {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub page_url: String,
}

/// Aggregate view of the event log, recomputed on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub total_events: usize,
    /// Attribution source -> event count; unattributed events grouped
    /// under [`UNKNOWN_SOURCE`].
    pub source_counts: HashMap<String, u64>,
    /// Event-type name -> event count.
    pub funnel_counts: HashMap<String, u64>,
    /// Identity -> elapsed milliseconds since that identity's first event,
    /// in arrival order.
    pub time_metrics: HashMap<String, Vec<i64>>,
    /// Identity -> ordered journey steps.
    pub user_journeys: HashMap<String, Vec<JourneyStep>>,
}

// ============================================
// Request DTOs
// ============================================

/// Page view tracking request. Mirrors what the embedded tracker sends on
/// page entry: location, referrer, and any campaign tag parameters.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PageViewRequest {
    #[validate(length(min = 1, max = 2048, message = "page_url must be 1-2048 characters"))]
    pub page_url: String,

    #[validate(length(max = 512, message = "title too long"))]
    pub title: Option<String>,

    #[validate(length(max = 2048, message = "referrer too long"))]
    pub referrer: Option<String>,

    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

impl PageViewRequest {
    /// Campaign parameters as the resolver's query-parameter map. Explicit
    /// DTO fields win over parameters embedded in the page URL.
    pub fn campaign_params(&self) -> HashMap<String, String> {
        let mut params: HashMap<String, String> = url::Url::parse(&self.page_url)
            .map(|u| {
                u.query_pairs()
                    .filter(|(k, _)| CAMPAIGN_KEYS.contains(&k.as_ref()))
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        let explicit = [
            ("utm_source", &self.utm_source),
            ("utm_medium", &self.utm_medium),
            ("utm_campaign", &self.utm_campaign),
            ("utm_term", &self.utm_term),
            ("utm_content", &self.utm_content),
        ];
        for (key, value) in explicit {
            if let Some(value) = value {
                if !value.is_empty() {
                    params.insert(key.to_string(), value.clone());
                }
            }
        }

        params
    }

    /// Referrer host, if the referrer parses as a URL with one.
    pub fn referrer_host(&self) -> Option<String> {
        let referrer = self.referrer.as_deref()?;
        let parsed = url::Url::parse(referrer).ok()?;
        parsed.host_str().map(|h| h.to_string())
    }

    /// Details for the recorded `page_view` event. Recognized key: `title`.
    pub fn page_view_details(&self) -> HashMap<String, String> {
        let mut details = HashMap::new();
        if let Some(title) = self.title.as_ref().filter(|t| !t.is_empty()) {
            details.insert("title".to_string(), title.clone());
        }
        details
    }
}

/// Recognized campaign tag parameter names.
pub const CAMPAIGN_KEYS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
];

/// Interaction event tracking request.
///
/// Recognized `details` keys by event type:
/// - `button_click`: `element_id`, `label`
/// - `form_submission`: `form_id`, `form_name`
/// - custom types: free-form, but still string-to-string
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrackEventRequest {
    #[validate(length(min = 1, max = 64, message = "event_type must be 1-64 characters"))]
    pub event_type: String,

    #[validate(length(min = 1, max = 2048, message = "page_url must be 1-2048 characters"))]
    pub page_url: String,

    #[serde(default)]
    pub details: HashMap<String, String>,
}

// ============================================
// Response DTOs
// ============================================

/// Outcome of a tracking call. Echoes the client key so first-time
/// clients can persist it and present it on subsequent requests.
#[derive(Debug, Clone, Serialize)]
pub struct TrackResponse {
    pub client_id: String,
    /// False when the event was constructed but suppressed (no consent or
    /// tracking disabled) rather than appended.
    pub tracked: bool,
    pub event: InteractionEvent,
}

/// Outcome of a page view, including the resolved attribution.
#[derive(Debug, Clone, Serialize)]
pub struct PageViewResponse {
    pub client_id: String,
    pub tracked: bool,
    pub attribution: Option<AttributionRecord>,
    pub event: InteractionEvent,
}

/// Current attribution state for a client.
#[derive(Debug, Clone, Serialize)]
pub struct AttributionResponse {
    pub attribution: Option<AttributionRecord>,
}

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
