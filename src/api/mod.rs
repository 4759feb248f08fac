//! HTTP API
//!
//! Axum router and handlers for the block management and IP check routes.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::BlockError;
use crate::Geoblock;

pub mod countries;
pub mod ip;
pub mod logs;

/// Build the API router around a shared service instance
pub fn router(service: Arc<Geoblock>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Permanent blocks
        .route("/api/countries/block", post(countries::add_blocked_country))
        .route("/api/countries/block/{code}", delete(countries::remove_blocked_country))
        .route("/api/countries/blocked", get(countries::list_blocked_countries))
        .route("/api/countries/status/{code}", get(countries::country_status))
        // Temporal blocks
        .route("/api/countries/temporal-block", post(countries::add_temporal_block))
        .route("/api/countries/temporal-block/{code}", delete(countries::remove_temporal_block))
        .route("/api/countries/temporal-blocks", get(countries::list_temporal_blocks))
        // IP lookups and checks
        .route("/api/ip/lookup", get(ip::lookup))
        .route("/api/ip/check-block", get(ip::check_block))
        // Audit log
        .route("/api/logs/blocked-attempts", get(logs::blocked_attempts))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

impl IntoResponse for BlockError {
    fn into_response(self) -> Response {
        let status = match &self {
            BlockError::InvalidCountryCode(_) | BlockError::InvalidDuration(_) => {
                StatusCode::BAD_REQUEST
            }
            BlockError::AlreadyPermanentlyBlocked(_) | BlockError::AlreadyTemporallyBlocked(_) => {
                StatusCode::CONFLICT
            }
            BlockError::NotFound(_) => StatusCode::NOT_FOUND,
            BlockError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
