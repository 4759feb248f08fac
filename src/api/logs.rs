use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::Geoblock;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

pub async fn blocked_attempts(
    State(service): State<Arc<Geoblock>>,
    Query(query): Query<PaginationQuery>,
) -> Json<serde_json::Value> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(10).clamp(1, 100);

    let (items, total) = service.attempts_page(page, page_size);

    Json(json!({
        "page": page,
        "pageSize": page_size,
        "total": total,
        "items": items,
    }))
}
