//! API request and response types

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::errors::TopgoError;
use crate::llm::ChatMessage;
use crate::models::FilterInput;
use crate::models::VenueHit;
use crate::recommend::RecommendationCriteria;

/// Error body shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub details: Option<Value>,
}

/// An error that renders as `{ error, message, details }`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.body.details = Some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "ValidationError", message)
    }

    pub fn not_ready(reason: &str) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "ServiceUnavailable",
            format!("Hệ thống chưa sẵn sàng. Lỗi: {reason}"),
        )
    }

    /// Map a pipeline error; `action` prefixes the message of server errors
    pub fn from_error(err: &TopgoError, action: &str) -> Self {
        match err {
            TopgoError::InvalidDistrict(district) => Self::new(
                StatusCode::BAD_REQUEST,
                "InvalidDistrict",
                format!("Quận '{district}' không tồn tại tại Hà Nội"),
            )
            .with_details(serde_json::json!({ "district": district })),
            TopgoError::NotReady(reason) => Self::not_ready(reason),
            e if e.is_client_error() => Self::validation(e.to_string()),
            e => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                format!("{action}: {e}"),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Venue as returned to API clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub business_type: String,
    pub address: String,
    pub district: String,
    pub price_range: String,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub similarity_score: Option<f32>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

impl From<&VenueHit> for RestaurantInfo {
    fn from(hit: &VenueHit) -> Self {
        let venue = &hit.venue;
        Self {
            name: venue.name.clone(),
            business_type: venue.business_type.clone(),
            address: venue.address.clone(),
            district: venue.district.clone(),
            price_range: venue.price_range.clone(),
            phone: non_empty(&venue.phone),
            description: non_empty(&venue.description),
            url: non_empty(&venue.url),
            similarity_score: Some(hit.similarity_score),
        }
    }
}

/// API info (GET /)
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub status: String,
    pub health: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database_status: String,
    pub llm_status: String,
    pub total_restaurants: usize,
    pub available_models: Vec<String>,
}

/// Chat request (POST /api/chat)
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatMessage>>,
    #[serde(default = "default_true")]
    pub use_rag: bool,
    #[serde(default = "default_chat_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub filters: Option<FilterInput>,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_query(&self.query)?;
        validate_range("top_k", self.top_k, 1, 20)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub restaurants: Vec<RestaurantInfo>,
    pub sources_count: usize,
    /// "rag" or "search"
    pub query_type: String,
    pub llm_model: Option<String>,
}

/// Search request (POST /api/search)
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub restaurant_type: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    /// cheap, moderate, expensive or all
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl SearchRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_query(&self.query)?;
        validate_range("top_k", self.top_k, 1, 50)?;
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(ApiError::validation("min_score must be within 0..=1"));
        }
        Ok(())
    }

    pub fn filter_input(&self) -> FilterInput {
        FilterInput {
            business_type: self.restaurant_type.clone(),
            district: self.district.clone(),
            price_range: self.price_range.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub restaurants: Vec<RestaurantInfo>,
    pub total_found: usize,
    pub filters_applied: serde_json::Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<RestaurantInfo>,
    pub criteria_used: RecommendationCriteria,
    pub suggestion_reason: String,
    pub total_recommendations: usize,
}

fn validate_query(query: &str) -> Result<(), ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::validation("query must not be empty"));
    }
    Ok(())
}

fn validate_range(field: &str, value: usize, min: usize, max: usize) -> Result<(), ApiError> {
    if !(min..=max).contains(&value) {
        return Err(ApiError::validation(format!(
            "{field} must be within {min}..={max}"
        )));
    }
    Ok(())
}

const fn default_true() -> bool {
    true
}

const fn default_chat_top_k() -> usize {
    5
}

const fn default_search_top_k() -> usize {
    10
}

const fn default_min_score() -> f32 {
    0.3
}
