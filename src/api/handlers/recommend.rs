//! Recommendation API handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::error;

use super::parse_body;
use super::AppState;
use crate::api::types::ApiError;
use crate::api::types::RecommendationResponse;
use crate::api::types::RestaurantInfo;
use crate::recommend::recommend;
use crate::recommend::RecommendationCriteria;

/// Occasion-based recommendations (POST /api/recommendations)
pub async fn recommendations(
    State(state): State<AppState>,
    payload: Result<Json<RecommendationCriteria>, JsonRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let criteria = parse_body(payload)?;
    criteria
        .validate()
        .map_err(|e| ApiError::from_error(&e, "Lỗi khi tạo gợi ý"))?;
    let rag = state.rag()?;

    let result = recommend(rag.retriever(), &criteria).await.map_err(|e| {
        error!("Recommendation error: {}", e);
        ApiError::from_error(&e, "Lỗi khi tạo gợi ý")
    })?;

    let recommendations: Vec<RestaurantInfo> =
        result.venues.iter().map(RestaurantInfo::from).collect();
    Ok(Json(RecommendationResponse {
        total_recommendations: recommendations.len(),
        recommendations,
        criteria_used: criteria,
        suggestion_reason: result.reason,
    }))
}
