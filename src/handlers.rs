//! Attribution HTTP Handlers
//!
//! REST API endpoints for the tracking surface. The pageview and event
//! routes are public and CORS-open (the embedded tracker posts to them
//! cross-origin); the read routes serve the current attribution record
//! and the aggregate report.

use crate::error::AttributionError;
use crate::extractors::ClientContext;
use crate::models::*;
use crate::service::TrackerService;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;
use validator::Validate;

/// Shared tracker service state
pub type AttributionState = Arc<TrackerService>;

// ============================================
// Route Builder
// ============================================

/// Create attribution routes
pub fn create_routes(service: Arc<TrackerService>) -> Router {
    // Public tracking routes, posted to by the embedded tracker.
    let tracking = Router::new()
        .route("/attribution/pageview", post(track_pageview))
        .route("/attribution/event", post(track_event))
        .layer(CorsLayer::permissive());

    // Read routes for the current record and the aggregate report.
    let reads = Router::new()
        .route("/attribution/record", get(get_attribution))
        .route("/attribution/report", get(get_report));

    Router::new()
        .merge(tracking)
        .merge(reads)
        .with_state(service)
}

fn client_key(ctx: &ClientContext) -> String {
    ctx.client_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// ============================================
// Tracking
// ============================================

/// POST /attribution/pageview
///
/// Resolve and persist attribution for a page entry, then record the
/// `page_view` event.
pub async fn track_pageview(
    State(service): State<AttributionState>,
    ctx: ClientContext,
    Json(req): Json<PageViewRequest>,
) -> Result<impl IntoResponse, AttributionError> {
    req.validate()
        .map_err(|e| AttributionError::Validation(e.to_string()))?;

    if !service.config().tracking_enabled {
        return Err(AttributionError::TrackingDisabled);
    }

    let client = client_key(&ctx);
    let details = req.page_view_details();
    let page = PageContext {
        query_params: req.campaign_params(),
        referrer_host: req.referrer_host(),
        url: req.page_url,
    };

    let (attribution, event, tracked) = service
        .page_view(&client, ctx.consent, page, details)
        .await;

    tracing::debug!(
        client = %client,
        tracked,
        attributed = attribution.is_some(),
        "page view processed"
    );

    Ok(Json(PageViewResponse {
        client_id: client,
        tracked,
        attribution,
        event,
    }))
}

/// POST /attribution/event
///
/// Record an interaction event. Recognized `details` keys:
/// `button_click` -> `element_id`, `label`; `form_submission` ->
/// `form_id`, `form_name`.
pub async fn track_event(
    State(service): State<AttributionState>,
    ctx: ClientContext,
    Json(req): Json<TrackEventRequest>,
) -> Result<impl IntoResponse, AttributionError> {
    req.validate()
        .map_err(|e| AttributionError::Validation(e.to_string()))?;

    if !service.config().tracking_enabled {
        return Err(AttributionError::TrackingDisabled);
    }

    let client = client_key(&ctx);
    let event_type = EventType::from(req.event_type.clone());

    let (event, tracked) = service
        .track(&client, ctx.consent, event_type, req.details, &req.page_url)
        .await;

    Ok(Json(TrackResponse {
        client_id: client,
        tracked,
        event,
    }))
}

// ============================================
// Reads
// ============================================

/// GET /attribution/record
///
/// Current attribution record for the calling client, if any.
pub async fn get_attribution(
    State(service): State<AttributionState>,
    ctx: ClientContext,
) -> Result<impl IntoResponse, AttributionError> {
    let attribution = match &ctx.client_id {
        Some(client) => service.attribution(client).await,
        None => None,
    };

    Ok(Json(AttributionResponse { attribution }))
}

/// GET /attribution/report
///
/// Aggregate funnel/source/journey report for the calling client.
pub async fn get_report(
    State(service): State<AttributionState>,
    ctx: ClientContext,
) -> Result<impl IntoResponse, AttributionError> {
    let report = match &ctx.client_id {
        Some(client) => service.report(client).await,
        None => Report::default(),
    };

    Ok(Json(report))
}
