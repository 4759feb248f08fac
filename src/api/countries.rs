use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::models::CountryCode;
use crate::Geoblock;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCountryRequest {
    pub country_code: String,
    #[serde(default)]
    pub country_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalBlockRequest {
    pub country_code: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedCountriesQuery {
    pub search: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

pub async fn add_blocked_country(
    State(service): State<Arc<Geoblock>>,
    Json(request): Json<BlockCountryRequest>,
) -> Response {
    match service.add_permanent_block(&request.country_code, &request.country_name) {
        Ok(country) => Json(json!({
            "success": true,
            "message": format!("Country '{}' has been permanently blocked.", country.country_code),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn remove_blocked_country(
    State(service): State<Arc<Geoblock>>,
    Path(code): Path<String>,
) -> Response {
    match service.remove_permanent_block(&code) {
        Ok(()) => Json(json!({
            "success": true,
            "message": format!("Country '{}' has been unblocked successfully.", code.trim().to_uppercase()),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_blocked_countries(
    State(service): State<Arc<Geoblock>>,
    Query(query): Query<BlockedCountriesQuery>,
) -> Json<serde_json::Value> {
    let mut countries = service.list_permanent();

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let needle = search.trim().to_lowercase();
        countries.retain(|c| {
            c.country_code.as_str().to_lowercase().contains(&needle)
                || c.country_name.to_lowercase().contains(&needle)
        });
    }

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(10).max(1);
    let total = countries.len();
    let results: Vec<_> = countries
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Json(json!({
        "success": true,
        "total": total,
        "page": page,
        "pageSize": page_size,
        "results": results,
    }))
}

pub async fn add_temporal_block(
    State(service): State<Arc<Geoblock>>,
    Json(request): Json<TemporalBlockRequest>,
) -> Response {
    match service.add_temporal_block(&request.country_code, request.duration_minutes) {
        Ok(block) => Json(json!({
            "success": true,
            "message": format!(
                "Country '{}' temporarily blocked for {} minutes.",
                block.country_code, request.duration_minutes
            ),
            "expiresAtUtc": block.expires_at,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn remove_temporal_block(
    State(service): State<Arc<Geoblock>>,
    Path(code): Path<String>,
) -> Response {
    match service.remove_temporal_block(&code) {
        Ok(()) => Json(json!({
            "success": true,
            "message": format!("Temporal block for '{}' removed.", code.trim().to_uppercase()),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn country_status(
    State(service): State<Arc<Geoblock>>,
    Path(code): Path<String>,
) -> Response {
    match code.parse::<CountryCode>() {
        Ok(code) => {
            let status = service.block_status(&code);
            Json(json!({
                "success": true,
                "data": {
                    "countryCode": code,
                    "blocked": status.is_blocked(),
                    "reason": status,
                },
            }))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn list_temporal_blocks(State(service): State<Arc<Geoblock>>) -> Json<serde_json::Value> {
    let blocks = service.list_temporal();
    Json(json!({
        "success": true,
        "total": blocks.len(),
        "results": blocks,
    }))
}
