//! Complete RAG pipeline: Classify -> Filter -> Retrieve -> Generate

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::districts;
use crate::errors::Result;
use crate::errors::TopgoError;
use crate::llm::prompts::CONVERSATION_SYSTEM;
use crate::llm::prompts::NO_RESULTS_ANSWER;
use crate::llm::prompts::SYSTEM_PROMPT;
use crate::llm::ChatMessage;
use crate::llm::GenerationParams;
use crate::llm::Generator;
use crate::llm::LlmService;
use crate::llm::VenuePrompts;
use crate::models::FilterInput;
use crate::models::SearchFilters;
use crate::models::VenueHit;
use crate::rag::postprocess::postprocess_answer;
use crate::rag::query_analysis::is_off_topic;
use crate::rag::query_analysis::QueryAnalyzer;
use crate::rag::query_analysis::ResponseType;
use crate::rag::ContextAssembler;
use crate::rag::VenueRetriever;

/// Reply to a bare greeting
pub const GREETING_ANSWER: &str = "Xin chào! Tôi là trợ lý AI chuyên tư vấn về nhà hàng, quán bar và karaoke tại Hà Nội.

Tôi có thể giúp bạn:
- Tìm nhà hàng theo loại hình, quận, mức giá
- Gợi ý địa điểm phù hợp cho các dịp đặc biệt
- Tư vấn quán bar, karaoke

Bạn đang tìm loại địa điểm nào?";

/// Conversational reply when the LLM cannot be used
pub const SHORT_GREETING_ANSWER: &str =
    "Xin chào! Tôi là trợ lý tư vấn nhà hàng tại Hà Nội. Bạn cần tìm loại địa điểm nào?";

/// Refusal for questions outside venue recommendations
pub const OFF_TOPIC_ANSWER: &str = "Xin lỗi bạn, tôi là chuyên viên tư vấn về nhà hàng, quán bar và karaoke tại Hà Nội. Tôi không có khả năng trả lời về các vấn đề khác.

Tôi chỉ có thể giúp bạn:
- Tìm nhà hàng phù hợp
- Gợi ý quán bar, karaoke
- Tư vấn địa điểm ăn uống theo nhu cầu

Bạn cần tìm loại địa điểm nào?";

const CONVERSATION_PARAMS: GenerationParams = GenerationParams::new(0.5, 150);

/// Fixed answer for a district Hanoi does not have
pub fn invalid_district_answer(district: &str) -> String {
    format!(
        "Xin lỗi, quận '{district}' không tồn tại tại Hà Nội. Hà Nội có các quận sau: {} và các huyện ngoại thành. Bạn có thể chọn một quận khác.",
        districts::urban_names()
    )
}

/// How an answer was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Retrieved venues composed into an answer by the LLM
    Rag,
    /// Retrieved venues formatted locally
    SearchOnly,
    /// Small talk, no retrieval
    Conversational,
    /// Off-topic question or unknown district
    Rejected,
}

/// One question to the pipeline
#[derive(Debug, Clone, Default)]
pub struct AnswerRequest {
    pub query: String,
    /// Earlier turns, oldest first
    pub history: Vec<ChatMessage>,
    /// Caller-supplied filters; when absent they are extracted from the query
    pub filters: Option<FilterInput>,
    pub top_k: Option<usize>,
    pub params: Option<GenerationParams>,
}

impl AnswerRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: FilterInput) -> Self {
        self.filters = Some(filters);
        self
    }

    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    #[must_use]
    pub const fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = Some(params);
        self
    }
}

/// RAG response
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub query: String,
    pub answer: String,
    pub num_sources: usize,
    pub sources: Vec<VenueHit>,
    pub mode: AnswerMode,
}

impl RagResponse {
    fn without_sources(query: &str, answer: impl Into<String>, mode: AnswerMode) -> Self {
        Self {
            query: query.to_string(),
            answer: answer.into(),
            num_sources: 0,
            sources: Vec::new(),
            mode,
        }
    }
}

/// Complete RAG service
pub struct RagService {
    retriever: VenueRetriever,
    generator: Arc<dyn Generator>,
    analyzer: QueryAnalyzer,
    context_assembler: ContextAssembler,
    llm_available: Arc<AtomicBool>,
    default_top_k: usize,
    params: GenerationParams,
}

impl RagService {
    /// Connect the store, embedder and Ollama described by `config`
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let retriever = VenueRetriever::from_config(config).await?;
        let llm = LlmService::new(&config.llm)?;
        let params = llm.default_params();

        Self::from_services(retriever, Arc::new(llm), config.search.default_top_k, params).await
    }

    /// Create from existing services; probes the generator once
    pub async fn from_services(
        retriever: VenueRetriever,
        generator: Arc<dyn Generator>,
        default_top_k: usize,
        params: GenerationParams,
    ) -> Result<Self> {
        let analyzer = QueryAnalyzer::new(generator.clone())?;
        let service = Self {
            retriever,
            generator,
            analyzer,
            context_assembler: ContextAssembler::default(),
            llm_available: Arc::new(AtomicBool::new(false)),
            default_top_k,
            params,
        };

        if service.refresh_llm_status().await {
            info!("LLM '{}' is available", service.generator.model());
        } else {
            warn!("LLM '{}' is unreachable, answers fall back to search results", service.generator.model());
        }
        Ok(service)
    }

    pub fn llm_available(&self) -> bool {
        self.llm_available.load(Ordering::Relaxed)
    }

    /// Probe the generator and remember the result
    pub async fn refresh_llm_status(&self) -> bool {
        let available = self.generator.check_connection().await;
        let previous = self.llm_available.swap(available, Ordering::Relaxed);
        if previous != available {
            info!("LLM availability changed: {previous} -> {available}");
        }
        available
    }

    /// Re-probe the generator every `interval` until the handle is aborted
    pub fn spawn_llm_probe(&self, interval: Duration) -> JoinHandle<()> {
        let generator = self.generator.clone();
        let flag = self.llm_available.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let available = generator.check_connection().await;
                if flag.swap(available, Ordering::Relaxed) != available {
                    info!("LLM availability changed to {available}");
                }
            }
        })
    }

    pub const fn retriever(&self) -> &VenueRetriever {
        &self.retriever
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    pub const fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Retrieve ranked venues without generating an answer
    pub async fn retrieve(
        &self,
        query: &str,
        filters: &SearchFilters,
        top_k: Option<usize>,
    ) -> Result<Vec<VenueHit>> {
        let top_k = top_k.unwrap_or(self.default_top_k);
        self.retriever.search(query, top_k, filters).await
    }

    /// Answer one question
    pub async fn answer(&self, request: AnswerRequest) -> Result<RagResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(TopgoError::InvalidRequest("query must not be empty".to_string()));
        }
        info!("Processing RAG query: {}", query);
        let llm_available = self.llm_available();

        // Step 1: Classify
        debug!("Step 1: Classifying query");
        let classification = self.analyzer.classify(query, llm_available).await;
        debug!("Classification: {:?}", classification);
        if !classification.needs_search {
            let (answer, mode) = self
                .conversational_reply(query, classification.response_type, llm_available)
                .await;
            return Ok(RagResponse::without_sources(query, answer, mode));
        }

        // Step 2: Filters
        debug!("Step 2: Resolving filters");
        let filters = match request.filters.as_ref().filter(|f| !f.is_empty()) {
            Some(input) => match input.resolve() {
                Ok(filters) => filters,
                Err(TopgoError::InvalidDistrict(district)) => {
                    return Ok(self.reject_district(query, &district));
                }
                Err(e) => return Err(e),
            },
            None => {
                if let Some(district) = self.analyzer.find_invalid_district(query) {
                    return Ok(self.reject_district(query, &district));
                }
                self.analyzer.extract_filters(query, llm_available).await
            }
        };

        // Step 3: Retrieve
        debug!("Step 3: Retrieving venues");
        let sources = self.retrieve(query, &filters, request.top_k).await?;
        debug!("Retrieved {} venues", sources.len());

        // Step 4: Generate
        debug!("Step 4: Generating answer");
        let params = request.params.unwrap_or(self.params);
        let (answer, mode) = self
            .generate(query, &sources, &request.history, params, llm_available)
            .await;

        info!("RAG query completed ({:?}, {} sources)", mode, sources.len());
        Ok(RagResponse {
            query: query.to_string(),
            answer,
            num_sources: sources.len(),
            sources,
            mode,
        })
    }

    /// Answer the last user message, with earlier messages as history
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        filters: Option<FilterInput>,
        top_k: Option<usize>,
    ) -> Result<RagResponse> {
        let last_user = messages
            .iter()
            .rposition(|m| m.role == "user")
            .ok_or_else(|| TopgoError::InvalidRequest("No user message found".to_string()))?;

        let history: Vec<ChatMessage> = messages[..last_user]
            .iter()
            .filter(|m| m.role != "system")
            .cloned()
            .collect();

        let mut request =
            AnswerRequest::new(messages[last_user].content.clone()).with_history(history);
        request.filters = filters;
        request.top_k = top_k;
        self.answer(request).await
    }

    /// Compose the answer text for retrieved venues
    async fn generate(
        &self,
        query: &str,
        sources: &[VenueHit],
        history: &[ChatMessage],
        params: GenerationParams,
        llm_available: bool,
    ) -> (String, AnswerMode) {
        if !llm_available {
            return (
                self.context_assembler.create_summary(sources),
                AnswerMode::SearchOnly,
            );
        }
        if sources.is_empty() {
            return (NO_RESULTS_ANSWER.to_string(), AnswerMode::Rag);
        }

        let context = self.context_assembler.assemble(sources);
        let prompt = if history.is_empty() {
            VenuePrompts::build_prompt(query, &context)
        } else {
            VenuePrompts::build_followup_prompt(query, &context, history)
        };

        match self
            .generator
            .generate(&prompt, Some(SYSTEM_PROMPT), params)
            .await
        {
            Ok(answer) => (postprocess_answer(&answer, sources), AnswerMode::Rag),
            Err(e) => {
                warn!("LLM error, returning search results instead: {e}");
                (
                    self.context_assembler.create_summary(sources),
                    AnswerMode::SearchOnly,
                )
            }
        }
    }

    async fn conversational_reply(
        &self,
        query: &str,
        response_type: ResponseType,
        llm_available: bool,
    ) -> (String, AnswerMode) {
        if !llm_available {
            return (SHORT_GREETING_ANSWER.to_string(), AnswerMode::Conversational);
        }
        if is_off_topic(query) {
            return (OFF_TOPIC_ANSWER.to_string(), AnswerMode::Rejected);
        }
        if response_type == ResponseType::Greeting {
            return (GREETING_ANSWER.to_string(), AnswerMode::Conversational);
        }

        let prompt = VenuePrompts::build_conversation_prompt(query);
        match self
            .generator
            .generate(&prompt, Some(CONVERSATION_SYSTEM), CONVERSATION_PARAMS)
            .await
        {
            Ok(answer) => (answer.trim().to_string(), AnswerMode::Conversational),
            Err(e) => {
                warn!("Conversational reply failed: {e}");
                (SHORT_GREETING_ANSWER.to_string(), AnswerMode::Conversational)
            }
        }
    }

    fn reject_district(&self, query: &str, district: &str) -> RagResponse {
        warn!("Invalid district detected: '{district}'");
        RagResponse::without_sources(query, invalid_district_answer(district), AnswerMode::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusinessType;
    use crate::testing::sample_retriever;
    use crate::testing::ScriptedGenerator;

    async fn service(generator: &Arc<ScriptedGenerator>) -> RagService {
        let retriever = sample_retriever().await.unwrap();
        RagService::from_services(retriever, generator.clone(), 5, GenerationParams::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_llm_down_returns_search_only() {
        let generator = Arc::new(ScriptedGenerator::offline());
        let service = service(&generator).await;
        assert!(!service.llm_available());

        let response = service
            .answer(AnswerRequest::new("quán lẩu bình dân").with_top_k(2))
            .await
            .unwrap();

        assert_eq!(response.mode, AnswerMode::SearchOnly);
        assert_eq!(response.num_sources, 2);
        assert!(response.answer.starts_with("Tìm thấy 2 địa điểm phù hợp:"));
        assert!(response.answer.contains("1. Lẩu Phan"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_generation_error_falls_back() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        // extraction, then answer
        generator.push_reply("{}");
        generator.push_error(TopgoError::Llm("Ollama API error (500)".into()));
        let service = service(&generator).await;

        let response = service
            .answer(AnswerRequest::new("quán lẩu"))
            .await
            .unwrap();

        assert_eq!(response.mode, AnswerMode::SearchOnly);
        assert!(response.answer.starts_with("Tìm thấy 5 địa điểm phù hợp:"));
        assert!(!response.answer.contains("Ollama"));
    }

    #[tokio::test]
    async fn test_rag_answer_is_postprocessed() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        generator.push_reply("{\"district\": \"Hoàn Kiếm\"}");
        generator.push_reply("Chào bạn! Lẩu Nấm Ashima ở quận hoàng kim rất đáng thử.");
        let service = service(&generator).await;

        let response = service
            .answer(AnswerRequest::new("lẩu sang trọng"))
            .await
            .unwrap();

        assert_eq!(response.mode, AnswerMode::Rag);
        assert_eq!(response.num_sources, 1);
        assert_eq!(response.sources[0].venue.name, "Lẩu Nấm Ashima");
        assert_eq!(
            response.answer,
            "Chào bạn! Lẩu Nấm Ashima ở quận Hoàn Kiếm rất đáng thử."
        );
        assert!(generator.prompts()[1].contains("Lẩu Nấm Ashima"));
    }

    #[tokio::test]
    async fn test_empty_retrieval_skips_llm() {
        let generator = Arc::new(ScriptedGenerator::new("{}"));
        let service = service(&generator).await;

        let filters = FilterInput {
            district: Some("Ba Đình".into()),
            ..FilterInput::default()
        };
        let response = service
            .answer(AnswerRequest::new("quán lẩu").with_filters(filters))
            .await
            .unwrap();

        assert_eq!(response.num_sources, 0);
        assert_eq!(response.answer, NO_RESULTS_ANSWER);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_district_in_query() {
        let generator = Arc::new(ScriptedGenerator::offline());
        let service = service(&generator).await;

        let response = service
            .answer(AnswerRequest::new("nhà hàng ở quận sao hỏa"))
            .await
            .unwrap();

        assert_eq!(response.mode, AnswerMode::Rejected);
        assert_eq!(response.num_sources, 0);
        assert!(response.answer.starts_with("Xin lỗi, quận 'sao hỏa' không tồn tại tại Hà Nội."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_recheck_tracks_llm() {
        let generator = Arc::new(ScriptedGenerator::offline());
        let service = service(&generator).await;
        assert!(!service.llm_available());

        let handle = service.spawn_llm_probe(Duration::from_secs(30));
        generator.set_online(true);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!service.llm_available());

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert!(service.llm_available());

        generator.set_online(false);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!service.llm_available());

        handle.abort();
    }

    #[tokio::test]
    async fn test_valid_district_followed_by_description() {
        let generator = Arc::new(ScriptedGenerator::offline());
        let service = service(&generator).await;

        let response = service
            .answer(AnswerRequest::new("nhà hàng quận Cầu Giấy có view đẹp"))
            .await
            .unwrap();

        assert_ne!(response.mode, AnswerMode::Rejected);
        assert!(!response.answer.contains("không tồn tại"));
    }

    #[tokio::test]
    async fn test_invalid_district_in_filters() {
        let generator = Arc::new(ScriptedGenerator::offline());
        let service = service(&generator).await;
        let filters = FilterInput {
            district: Some("Quận 1".into()),
            ..FilterInput::default()
        };

        let response = service
            .answer(AnswerRequest::new("quán bar").with_filters(filters))
            .await
            .unwrap();
        assert_eq!(response.mode, AnswerMode::Rejected);
        assert!(response.answer.contains("'Quận 1'"));
    }

    #[tokio::test]
    async fn test_caller_filters_are_applied() {
        let generator = Arc::new(ScriptedGenerator::offline());
        let service = service(&generator).await;
        let filters = FilterInput {
            business_type: Some("restaurant".into()),
            district: Some("cau giay".into()),
            price_range: None,
        };

        let response = service
            .answer(AnswerRequest::new("quán ăn gia đình").with_filters(filters))
            .await
            .unwrap();

        assert_eq!(response.num_sources, 2);
        assert!(response.sources.iter().all(|h| {
            h.venue.district == "Cầu Giấy"
                && h.venue.business_type == BusinessType::Restaurant.as_str()
        }));
    }

    #[tokio::test]
    async fn test_conversational_paths() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        generator.push_reply(
            "{\"needs_search\": false, \"response_type\": \"general_question\"}",
        );
        generator.push_reply("Tôi là trợ lý AI chuyên tư vấn nhà hàng.");
        generator.push_reply("{\"needs_search\": false, \"response_type\": \"general_question\"}");
        let service = service(&generator).await;

        let greeting = service.answer(AnswerRequest::new("hello")).await.unwrap();
        assert_eq!(greeting.answer, GREETING_ANSWER);
        assert_eq!(greeting.mode, AnswerMode::Conversational);

        let about = service.answer(AnswerRequest::new("bạn là ai")).await.unwrap();
        assert_eq!(about.answer, "Tôi là trợ lý AI chuyên tư vấn nhà hàng.");

        let weather = service
            .answer(AnswerRequest::new("thời tiết hôm nay thế nào"))
            .await
            .unwrap();
        assert_eq!(weather.mode, AnswerMode::Rejected);
        assert_eq!(weather.answer, OFF_TOPIC_ANSWER);
    }

    #[tokio::test]
    async fn test_chat_uses_last_user_message() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        generator.push_reply("{}");
        generator.push_reply("Skyline Bar là lựa chọn tốt.");
        let service = service(&generator).await;

        let messages = vec![
            ChatMessage::system("bỏ qua"),
            ChatMessage::user("tìm quán bar"),
            ChatMessage::assistant("Bạn muốn ở quận nào?"),
            ChatMessage::user("bar view đẹp"),
        ];
        let response = service.chat(&messages, None, Some(1)).await.unwrap();

        assert_eq!(response.query, "bar view đẹp");
        assert_eq!(response.sources[0].venue.name, "Skyline Bar");
        let prompt = &generator.prompts()[1];
        assert!(prompt.contains("Khách: tìm quán bar"));
        assert!(prompt.contains("Trợ lý: Bạn muốn ở quận nào?"));
    }

    #[tokio::test]
    async fn test_chat_requires_user_message() {
        let generator = Arc::new(ScriptedGenerator::offline());
        let service = service(&generator).await;
        let result = service
            .chat(&[ChatMessage::assistant("Xin chào")], None, None)
            .await;
        assert!(matches!(result, Err(TopgoError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_refresh_tracks_availability() {
        let generator = Arc::new(ScriptedGenerator::offline());
        let service = service(&generator).await;
        assert!(!service.llm_available());

        generator.set_online(true);
        assert!(service.refresh_llm_status().await);
        assert!(service.llm_available());
    }
}
