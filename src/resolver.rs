//! Attribution Resolver
//!
//! Decides what attribution record is authoritative for the current page
//! load. Pure function of its inputs: no hidden state, idempotent, and
//! once a record exists repeated resolution is a no-op (first-touch).

use crate::models::{AttributionRecord, PageContext, CAMPAIGN_KEYS};
use chrono::{DateTime, Utc};

/// Inputs to one resolution pass.
#[derive(Debug, Clone)]
pub struct ResolveInputs<'a> {
    /// Record already held by the durable store, if any.
    pub existing: Option<&'a AttributionRecord>,
    /// Raw value held by the backup store, if any.
    pub backup_value: Option<&'a str>,
    /// Environment snapshot for this page load.
    pub page: &'a PageContext,
    /// Resolution instant.
    pub now: DateTime<Utc>,
}

/// Resolve the authoritative attribution record for this page load.
///
/// Precedence, first match wins:
/// 1. existing non-empty record, unchanged
/// 2. recognized campaign parameters in the URL
/// 3. parseable non-empty backup record, adopted verbatim
/// 4. cross-origin referrer, as a fallback record
/// 5. none (anonymous/direct visit)
pub fn resolve(inputs: &ResolveInputs<'_>) -> Option<AttributionRecord> {
    if let Some(existing) = inputs.existing {
        if !existing.is_empty() {
            return Some(existing.clone());
        }
    }

    let page = inputs.page;
    let has_campaign_tag = CAMPAIGN_KEYS
        .iter()
        .any(|key| page.query_params.get(*key).is_some_and(|v| !v.is_empty()));
    if has_campaign_tag {
        return Some(AttributionRecord::from_campaign(
            &page.query_params,
            inputs.now,
            &page.url,
        ));
    }

    if let Some(backup) = inputs.backup_value {
        if let Ok(record) = serde_json::from_str::<AttributionRecord>(backup) {
            if !record.is_empty() {
                return Some(record);
            }
        }
    }

    if let Some(referrer_host) = page.referrer_host.as_deref() {
        if let Some(source) = referrer_source(referrer_host, &page.url) {
            return Some(AttributionRecord::from_referrer(
                &source, inputs.now, &page.url,
            ));
        }
    }

    None
}

/// Map a referrer host to an attribution source. Known search/social
/// domains map to their canonical names; any other cross-origin host is
/// used raw. Same-host referrers carry no attribution signal.
fn referrer_source(referrer_host: &str, page_url: &str) -> Option<String> {
    let host = referrer_host.to_ascii_lowercase();
    let host = host.trim_start_matches("www.");

    const KNOWN: [(&str, &str); 7] = [
        ("google.", "google"),
        ("bing.", "bing"),
        ("facebook.", "facebook"),
        ("instagram.", "instagram"),
        ("linkedin.", "linkedin"),
        ("twitter.", "twitter"),
        ("t.co", "twitter"),
    ];
    for (prefix, source) in KNOWN {
        if host.starts_with(prefix) {
            return Some(source.to_string());
        }
    }

    let own_host = url::Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));
    match own_host {
        Some(own) if own.trim_start_matches("www.") == host => None,
        _ => Some(host.to_string()),
    }
}
