use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::Geoblock;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpQuery {
    pub ip_address: Option<String>,
}

/// The explicitly queried IP, or the caller's own address
fn resolve_ip(param: Option<&str>, peer: SocketAddr) -> Result<IpAddr, Response> {
    let raw = match param.map(str::trim).filter(|s| !s.is_empty()) {
        Some(explicit) => explicit.to_string(),
        None => peer.ip().to_string(),
    };

    raw.parse::<IpAddr>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Invalid IP address format.",
            })),
        )
            .into_response()
    })
}

pub async fn lookup(
    State(service): State<Arc<Geoblock>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<IpQuery>,
) -> Response {
    let ip = match resolve_ip(query.ip_address.as_deref(), peer) {
        Ok(ip) => ip,
        Err(response) => return response,
    };

    if ip.is_loopback() {
        return Json(json!({
            "success": true,
            "data": {
                "ip": ip.to_string(),
                "countryCode": "LOCAL",
                "countryName": "Localhost",
                "isp": "Local Network",
            },
        }))
        .into_response();
    }

    match service.lookup_ip(&ip.to_string()).await {
        Ok(info) => Json(json!({ "success": true, "data": info })).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "success": false,
                "message": format!("Failed to fetch data from Geo API: {}", e),
            })),
        )
            .into_response(),
    }
}

pub async fn check_block(
    State(service): State<Arc<Geoblock>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<IpQuery>,
) -> Response {
    let ip = match resolve_ip(query.ip_address.as_deref(), peer) {
        Ok(ip) => ip,
        Err(response) => return response,
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    match service.check_ip(&ip.to_string(), &user_agent).await {
        Ok(outcome) => Json(json!({
            "success": true,
            "data": {
                "ip": outcome.geo.ip,
                "countryCode": outcome.geo.country_code,
                "countryName": outcome.geo.country_name,
                "isp": outcome.geo.isp,
                "blocked": outcome.blocked(),
                "reason": outcome.status,
            },
        }))
        .into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "message": "Failed to fetch Geo info from external provider.",
            })),
        )
            .into_response(),
    }
}
