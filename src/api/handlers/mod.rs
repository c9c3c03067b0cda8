/// API request handlers
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::error;
use tracing::warn;

use crate::api::types::ApiError;
use crate::api::types::HealthResponse;
use crate::api::types::RootResponse;
use crate::rag::RagService;

pub mod chat;
pub mod recommend;
pub mod search;

pub use chat::chat;
pub use recommend::recommendations;
pub use search::search;

/// Shared application state
///
/// The server starts even when the pipeline could not be built, so that
/// `/health` can report what went wrong; every other endpoint answers 503.
#[derive(Clone)]
pub struct AppState {
    rag: Option<Arc<RagService>>,
    startup_error: Option<Arc<str>>,
}

impl AppState {
    pub fn ready(rag: Arc<RagService>) -> Self {
        Self {
            rag: Some(rag),
            startup_error: None,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            rag: None,
            startup_error: Some(Arc::from(error.into())),
        }
    }

    pub fn rag(&self) -> Result<&Arc<RagService>, ApiError> {
        self.rag.as_ref().ok_or_else(|| {
            ApiError::not_ready(self.startup_error.as_deref().unwrap_or("Unknown error"))
        })
    }
}

/// Turn a body that failed to parse into a 400
pub(crate) fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

/// API info
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "TopGo RAG Chatbot API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        health: "/health".to_string(),
    })
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let Some(rag) = state.rag.as_ref() else {
        return Json(HealthResponse {
            status: "degraded".to_string(),
            version,
            database_status: "disconnected".to_string(),
            llm_status: "disconnected".to_string(),
            total_restaurants: 0,
            available_models: Vec::new(),
        });
    };

    let (database_status, total_restaurants) = match rag.retriever().count().await {
        Ok(count) => ("connected", count),
        Err(e) => {
            error!("Database check failed: {}", e);
            ("error", 0)
        }
    };

    let (llm_status, available_models) = if rag.refresh_llm_status().await {
        match rag.generator().list_models().await {
            Ok(models) => ("connected", models),
            Err(e) => {
                warn!("LLM check failed: {}", e);
                ("error", Vec::new())
            }
        }
    } else {
        ("disconnected", Vec::new())
    };

    let status = if database_status == "connected" && llm_status == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version,
        database_status: database_status.to_string(),
        llm_status: llm_status.to_string(),
        total_restaurants,
        available_models,
    })
}
