//! Search API handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::error;
use tracing::info;

use super::parse_body;
use super::AppState;
use crate::api::types::ApiError;
use crate::api::types::RestaurantInfo;
use crate::api::types::SearchRequest;
use crate::api::types::SearchResponse;

const ACTION: &str = "Lỗi khi tìm kiếm";

/// Filtered semantic search (POST /api/search)
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let req = parse_body(payload)?;
    req.validate()?;
    let rag = state.rag()?;
    info!("POST /api/search: {}", req.query);

    let filters = req
        .filter_input()
        .resolve()
        .map_err(|e| ApiError::from_error(&e, ACTION))?;

    let hits = rag
        .retriever()
        .search(&req.query, req.top_k, &filters)
        .await
        .map_err(|e| {
            error!("Search error: {}", e);
            ApiError::from_error(&e, ACTION)
        })?;

    let restaurants: Vec<RestaurantInfo> = hits
        .iter()
        .filter(|hit| hit.similarity_score >= req.min_score)
        .map(RestaurantInfo::from)
        .collect();

    Ok(Json(SearchResponse {
        total_found: restaurants.len(),
        query: req.query,
        restaurants,
        filters_applied: filters.applied(),
    }))
}
