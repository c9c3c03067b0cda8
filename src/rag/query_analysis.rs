//! Query classification and filter extraction
//!
//! Cheap keyword checks run first; the LLM is only consulted for
//! ambiguous queries and for pulling structured filters out of free text.
//! Every LLM failure degrades to "search without filters".

use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::districts;
use crate::errors::Result;
use crate::errors::TopgoError;
use crate::llm::prompts::CLASSIFICATION_SYSTEM;
use crate::llm::prompts::EXTRACTION_SYSTEM;
use crate::llm::GenerationParams;
use crate::llm::Generator;
use crate::llm::VenuePrompts;
use crate::models::BusinessType;
use crate::models::PriceTier;
use crate::models::SearchFilters;

/// Words that mark a query as a venue search without asking the LLM
const RESTAURANT_KEYWORDS: &[&str] = &[
    "nhà hàng", "quán ăn", "quán", "bar", "pub", "karaoke", "buffet", "restaurant", "cafe",
    "quán cafe", "ăn", "món", "đồ ăn", "thức ăn", "bữa", "cơm", "phở", "bún", "mì", "lẩu",
    "nướng", "dimsum", "quận", "ở đâu", "gần", "phù hợp", "tốt", "ngon", "giá rẻ", "bình dân",
    "sang trọng", "cao cấp", "trung bình", "gợi ý", "giới thiệu", "tìm", "cho tôi", "tây", "ý",
    "nhật", "hàn", "trung", "việt", "âu", "á", "cầu giấy", "tây hồ", "hoàn kiếm", "ba đình",
    "đống đa", "hai bà trưng", "thanh xuân", "long biên", "hoàng mai",
];

const GREETINGS: &[&str] = &["xin chào", "chào", "hello", "hi", "hey"];

/// Topics the assistant declines to talk about
const OFF_TOPIC_KEYWORDS: &[&str] = &[
    "toán", "tính", "+", "-", "*", "/", "bằng mấy", "kết quả", "thời tiết", "trời", "nắng",
    "mưa", "nhiệt độ", "tin tức", "bóng đá", "chính trị", "kinh tế", "lịch sử", "địa lý",
    "khoa học", "vật lý", "hóa học", "code", "lập trình", "python", "javascript",
];

const JSON_OBJECT_PATTERN: &str = r"\{[^}]*\}";

/// "quận X" / "district X", ending at punctuation or a trailing search word
const DISTRICT_MENTION_PATTERN: &str = r"(?:quận|district)\s+([^,\.\?!\n]+?)(?:\s+(?:nhà|quán|bar|restaurant|karaoke|giá|rẻ|sang|$)|$)";

const MAX_DISTRICT_WORDS: usize = 3;

const CLASSIFICATION_PARAMS: GenerationParams = GenerationParams::new(0.1, 150);
const EXTRACTION_PARAMS: GenerationParams = GenerationParams::new(0.1, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Greeting,
    GeneralQuestion,
    RestaurantQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub needs_search: bool,
    pub response_type: ResponseType,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl Classification {
    pub const fn search() -> Self {
        Self {
            needs_search: true,
            response_type: ResponseType::RestaurantQuery,
            reasoning: None,
        }
    }

    pub const fn greeting() -> Self {
        Self {
            needs_search: false,
            response_type: ResponseType::Greeting,
            reasoning: None,
        }
    }
}

/// Raw filter object as the LLM writes it
#[derive(Debug, Default, Deserialize)]
struct ExtractedFilters {
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    business_type: Option<String>,
    #[serde(default)]
    price_range: Option<String>,
}

/// Lowercased NFC form used for keyword matching
fn normalize(query: &str) -> String {
    query.nfc().collect::<String>().to_lowercase()
}

pub fn has_restaurant_keyword(query: &str) -> bool {
    let lowered = normalize(query);
    RESTAURANT_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

pub fn is_greeting(query: &str) -> bool {
    let lowered = normalize(query);
    GREETINGS.contains(&lowered.trim())
}

pub fn is_off_topic(query: &str) -> bool {
    let lowered = normalize(query);
    OFF_TOPIC_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

pub struct QueryAnalyzer {
    generator: Arc<dyn Generator>,
    json_object: Regex,
    district_mention: Regex,
}

impl QueryAnalyzer {
    pub fn new(generator: Arc<dyn Generator>) -> Result<Self> {
        let json_object = Regex::new(JSON_OBJECT_PATTERN)
            .map_err(|e| TopgoError::Config(format!("invalid regex: {e}")))?;
        let district_mention = Regex::new(DISTRICT_MENTION_PATTERN)
            .map_err(|e| TopgoError::Config(format!("invalid regex: {e}")))?;

        Ok(Self {
            generator,
            json_object,
            district_mention,
        })
    }

    /// Decide whether the query needs a venue search
    pub async fn classify(&self, query: &str, llm_available: bool) -> Classification {
        if !llm_available || has_restaurant_keyword(query) {
            return Classification::search();
        }
        if is_greeting(query) {
            return Classification::greeting();
        }

        let prompt = VenuePrompts::build_classification_prompt(query);
        let response = match self
            .generator
            .generate(&prompt, Some(CLASSIFICATION_SYSTEM), CLASSIFICATION_PARAMS)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Classification error: {e}");
                return Classification::search();
            }
        };

        match self.parse_json::<Classification>(&response) {
            Some(classification) => classification,
            None => {
                debug!("Unparsable classification: {response}");
                Classification::search()
            }
        }
    }

    /// A district the query names that Hanoi does not have
    pub fn find_invalid_district(&self, query: &str) -> Option<String> {
        let lowered = normalize(query);
        if !lowered.contains("quận") && !lowered.contains("district") {
            return None;
        }

        let captures = self.district_mention.captures(&lowered)?;
        let words: Vec<&str> = captures
            .get(1)?
            .as_str()
            .split_whitespace()
            .take(MAX_DISTRICT_WORDS)
            .collect();
        if words.is_empty() {
            return None;
        }

        // "cầu giấy có view" still names Cầu Giấy
        let known = (1..=words.len())
            .rev()
            .any(|n| districts::is_valid(&words[..n].join(" ")));
        if known {
            return None;
        }
        let mentioned = words.join(" ");
        warn!("Invalid district in query: '{mentioned}'");
        Some(mentioned)
    }

    /// Ask the LLM for filters and keep only the values that validate
    pub async fn extract_filters(&self, query: &str, llm_available: bool) -> SearchFilters {
        if !llm_available {
            return SearchFilters::default();
        }

        let prompt = VenuePrompts::build_extraction_prompt(query);
        let response = match self
            .generator
            .generate(&prompt, Some(EXTRACTION_SYSTEM), EXTRACTION_PARAMS)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Filter extraction error: {e}");
                return SearchFilters::default();
            }
        };

        let Some(extracted) = self.parse_json::<ExtractedFilters>(&response) else {
            return SearchFilters::default();
        };

        let mut filters = SearchFilters::default();
        if let Some(district) = extracted.district.as_deref().map(str::trim) {
            match districts::resolve(district) {
                Some(d) => filters.district = Some(d.name.to_string()),
                None if district.is_empty() => {}
                None => warn!("Invalid district from LLM: '{district}'"),
            }
        }
        if let Some(business_type) = extracted.business_type.as_deref() {
            filters.business_type = business_type.parse().ok().filter(|t| {
                matches!(
                    t,
                    BusinessType::Restaurant | BusinessType::Bar | BusinessType::Karaoke
                )
            });
        }
        if let Some(price) = extracted.price_range.as_deref() {
            filters.price_range = price.parse::<PriceTier>().ok();
        }

        debug!("Extracted filters: {:?}", filters);
        filters
    }

    fn parse_json<T: serde::de::DeserializeOwned>(&self, response: &str) -> Option<T> {
        let object = self.json_object.find(response)?;
        serde_json::from_str(object.as_str()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    fn analyzer(generator: &Arc<ScriptedGenerator>) -> QueryAnalyzer {
        QueryAnalyzer::new(generator.clone()).unwrap()
    }

    #[test]
    fn test_keyword_checks() {
        assert!(has_restaurant_keyword("Tìm quán lẩu ở Cầu Giấy"));
        assert!(has_restaurant_keyword("BAR nào vui?"));
        assert!(!has_restaurant_keyword("hello"));
        assert!(is_greeting("  Xin chào "));
        assert!(!is_greeting("xin chào, tìm quán phở"));
        assert!(is_off_topic("1+1 bằng mấy"));
        assert!(is_off_topic("thời tiết hôm nay"));
    }

    #[tokio::test]
    async fn test_classify_without_llm_always_searches() {
        let generator = Arc::new(ScriptedGenerator::offline());
        let result = analyzer(&generator).classify("hello", false).await;
        assert_eq!(result, Classification::search());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_classify_keyword_shortcuts() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        let analyzer = analyzer(&generator);

        assert!(analyzer.classify("quán nhậu gần đây", true).await.needs_search);
        assert_eq!(
            analyzer.classify("hello", true).await.response_type,
            ResponseType::Greeting
        );
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_classify_parses_llm_json() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        generator.push_reply(
            "Kết quả: {\"needs_search\": false, \"response_type\": \"general_question\", \"reasoning\": \"Hỏi về chatbot\"} xong",
        );

        let result = analyzer(&generator).classify("bạn là ai", true).await;
        assert!(!result.needs_search);
        assert_eq!(result.response_type, ResponseType::GeneralQuestion);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_classify_falls_back_on_garbage() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        generator.push_reply("không biết");
        generator.push_error(TopgoError::Llm("timeout".into()));
        let analyzer = analyzer(&generator);

        assert_eq!(analyzer.classify("bạn là ai", true).await, Classification::search());
        assert_eq!(analyzer.classify("bạn là ai", true).await, Classification::search());
    }

    #[test]
    fn test_find_invalid_district() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        let analyzer = analyzer(&generator);

        assert_eq!(
            analyzer.find_invalid_district("nhà hàng ở quận sao hỏa giá rẻ"),
            Some("sao hỏa".to_string())
        );
        assert_eq!(
            analyzer.find_invalid_district("quán ăn quận 1"),
            Some("1".to_string())
        );
        assert_eq!(analyzer.find_invalid_district("quán bar quận Tây Hồ"), None);
        assert_eq!(analyzer.find_invalid_district("quận cau giay nhà hàng"), None);
        assert_eq!(analyzer.find_invalid_district("lẩu ngon ở Cầu Giấy"), None);
    }

    #[test]
    fn test_district_followed_by_other_words() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        let analyzer = analyzer(&generator);

        assert_eq!(
            analyzer.find_invalid_district("nhà hàng quận Cầu Giấy có view đẹp"),
            None
        );
        assert_eq!(analyzer.find_invalid_district("quận Hoàn Kiếm có gì ăn"), None);
        assert_eq!(
            analyzer.find_invalid_district("quán ở quận sao hỏa có view"),
            Some("sao hỏa có".to_string())
        );
    }

    #[tokio::test]
    async fn test_extract_filters_validates_each_value() {
        let generator = Arc::new(ScriptedGenerator::new(""));
        generator.push_reply(
            "{\"district\": \"tay ho\", \"business_type\": \"Bar\", \"price_range\": \"cao cap\"}",
        );
        generator.push_reply(
            "{\"district\": \"Sao Hỏa\", \"business_type\": \"cafe\", \"price_range\": \"free\"}",
        );
        let analyzer = analyzer(&generator);

        let filters = analyzer.extract_filters("bar sang ở tây hồ", true).await;
        assert_eq!(filters.district.as_deref(), Some("Tây Hồ"));
        assert_eq!(filters.business_type, Some(BusinessType::Bar));
        assert_eq!(filters.price_range, Some(PriceTier::CaoCap));

        let filters = analyzer.extract_filters("quán cafe trên sao hỏa", true).await;
        assert!(filters.is_empty());
    }

    #[tokio::test]
    async fn test_extract_filters_without_llm() {
        let generator = Arc::new(ScriptedGenerator::new("{\"district\": \"Tây Hồ\"}"));
        let filters = analyzer(&generator).extract_filters("bar", false).await;
        assert!(filters.is_empty());
        assert_eq!(generator.calls(), 0);
    }
}
