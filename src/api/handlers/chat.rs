//! Chat API handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::error;
use tracing::info;

use super::parse_body;
use super::AppState;
use crate::api::types::ApiError;
use crate::api::types::ChatRequest;
use crate::api::types::ChatResponse;
use crate::api::types::RestaurantInfo;
use crate::errors::TopgoError;
use crate::rag::context::truncate_chars;
use crate::rag::pipeline::invalid_district_answer;
use crate::rag::AnswerMode;
use crate::rag::AnswerRequest;
use crate::rag::ContextAssembler;

const ACTION: &str = "Lỗi khi xử lý chat";

/// Chat with the assistant (POST /api/chat)
///
/// `use_rag = false` skips generation and lists the retrieved venues.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let req = parse_body(payload)?;
    req.validate()?;
    let rag = state.rag()?;
    info!("POST /api/chat: {}", truncate_chars(&req.query, 100));

    if req.use_rag {
        let mut request = AnswerRequest::new(req.query)
            .with_history(req.conversation_history.unwrap_or_default())
            .with_top_k(req.top_k);
        request.filters = req.filters;

        let response = rag.answer(request).await.map_err(|e| {
            error!("Chat error: {}", e);
            ApiError::from_error(&e, ACTION)
        })?;

        let llm_model =
            (response.mode == AnswerMode::Rag).then(|| rag.generator().model().to_string());
        return Ok(Json(ChatResponse {
            restaurants: response.sources.iter().map(RestaurantInfo::from).collect(),
            sources_count: response.num_sources,
            answer: response.answer,
            query_type: "rag".to_string(),
            llm_model,
        }));
    }

    let filters = match req.filters.unwrap_or_default().resolve() {
        Ok(filters) => filters,
        Err(TopgoError::InvalidDistrict(district)) => {
            return Ok(Json(ChatResponse {
                answer: invalid_district_answer(&district),
                restaurants: Vec::new(),
                sources_count: 0,
                query_type: "search".to_string(),
                llm_model: None,
            }));
        }
        Err(e) => return Err(ApiError::from_error(&e, ACTION)),
    };

    let hits = rag
        .retrieve(&req.query, &filters, Some(req.top_k))
        .await
        .map_err(|e| {
            error!("Chat search error: {}", e);
            ApiError::from_error(&e, ACTION)
        })?;

    Ok(Json(ChatResponse {
        answer: ContextAssembler::default().create_listing(&hits),
        restaurants: hits.iter().map(RestaurantInfo::from).collect(),
        sources_count: hits.len(),
        query_type: "search".to_string(),
        llm_model: None,
    }))
}
