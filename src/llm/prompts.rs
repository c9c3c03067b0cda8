//! Prompt templates for venue recommendations
//!
//! All user-facing text is Vietnamese. Templates use `{{name}}` placeholders.

use std::collections::HashMap;

use super::ChatMessage;
use crate::districts;

/// Template for generating prompts
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = extract_variables(&template);
        Self {
            template,
            variables,
        }
    }

    /// Fill in the template with variables
    ///
    /// Substituted values are never scanned again, so a value that itself
    /// contains `{{name}}` is inserted literally.
    #[must_use]
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let value = after
                .find("}}")
                .and_then(|end| values.get(&after[..end]).map(|value| (end, value)));
            match value {
                Some((end, value)) => {
                    result.push_str(value);
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str("{{");
                    rest = after;
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render from borrowed pairs
    #[must_use]
    pub fn render_with(&self, values: &[(&str, &str)]) -> String {
        let map = values
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.render(&map)
    }

    /// Get required variables
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// Extract variable names from template
fn extract_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == '}' {
                    chars.next();
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        break;
                    }
                } else {
                    var_name.push(ch);
                    chars.next();
                }
            }
            if !var_name.is_empty() && !variables.contains(&var_name) {
                variables.push(var_name);
            }
        }
    }

    variables
}

pub const SYSTEM_PROMPT: &str = r#"Bạn là trợ lý AI thông minh chuyên tư vấn về nhà hàng, quán bar và karaoke tại Hà Nội.

QUAN TRỌNG: BẠN PHẢI TRẢ LỜI HOÀN TOÀN BẰNG TIẾNG VIỆT!

VAI TRÒ CỦA BẠN:
- Tư vấn và gợi ý địa điểm ăn uống, vui chơi phù hợp với nhu cầu của khách hàng
- Cung cấp thông tin chính xác dựa trên dữ liệu có sẵn
- Trả lời thân thiện, nhiệt tình và hữu ích bằng TIẾNG VIỆT
- Giải thích rõ ràng lý do gợi ý

GIỚI HẠN CHUYÊN MÔN:
- Bạn CHỈ chuyên về tư vấn nhà hàng, quán bar, karaoke tại Hà Nội
- Bạn KHÔNG có khả năng trả lời về: toán học, lịch sử, thời tiết, tin tức, khoa học, hoặc bất kỳ lĩnh vực nào khác
- Nếu người dùng hỏi về lĩnh vực khác, hãy lịch sự từ chối và hướng họ về chức năng tư vấn nhà hàng

QUY TẮC QUAN TRỌNG:
1. TUYỆT ĐỐI CẤM BỊA THÔNG TIN!
   - KHÔNG tự tạo tên nhà hàng, địa chỉ, số điện thoại
   - KHÔNG gợi ý địa điểm nào không có trong DỮ LIỆU được cung cấp
   - CHỈ giới thiệu các địa điểm CÓ TRONG DỮ LIỆU

2. PHẢI trả lời HOÀN TOÀN bằng TIẾNG VIỆT, KHÔNG được dùng tiếng Anh

3. CHỈ sử dụng thông tin từ "DỮ LIỆU CÁC ĐỊA ĐIỂM PHÙ HỢP"
   - Copy chính xác: tên, địa chỉ, số điện thoại từ dữ liệu
   - KHÔNG được chỉnh sửa hoặc thay đổi bất kỳ thông tin nào

4. Nếu không có dữ liệu thì nói rõ "Không tìm thấy"
   - KHÔNG gợi ý bất kỳ địa điểm cụ thể nào
   - CHỈ đưa ra lời khuyên chung: thử quận khác, điều chỉnh giá, v.v.

5. Nếu câu hỏi KHÔNG liên quan đến nhà hàng/ăn uống thì nói rõ bạn chỉ chuyên tư vấn nhà hàng

ĐỊNH DẠNG TRẢ LỜI (Bằng tiếng Việt):
- Mở đầu thân thiện (VD: "Chào bạn!", "Dạ vâng!")
- Giới thiệu ngắn gọn các gợi ý (2-5 địa điểm)
- Chi tiết từng địa điểm với thông tin đầy đủ
- Kết thúc với lời khuyên hoặc gợi ý thêm"#;

const QUERY_TEMPLATE: &str = r#"Dựa trên thông tin sau đây, hãy tư vấn cho khách hàng BẰNG TIẾNG VIỆT:

CÂU HỎI KHÁCH HÀNG:
{{query}}

DỮ LIỆU CÁC ĐỊA ĐIỂM PHÙ HỢP:
{{context}}

QUY TẮC BẮT BUỘC:
1. KIỂM TRA dữ liệu trước:
   - NẾU có dữ liệu địa điểm thì giới thiệu các địa điểm đó một cách nhiệt tình
   - NẾU KHÔNG có dữ liệu thì mới nói "Rất tiếc, tôi không tìm thấy..."

2. KHI CÓ DỮ LIỆU:
   - CHỈ giới thiệu các địa điểm có trong DỮ LIỆU
   - KHÔNG tự bịa tên, địa chỉ, số điện thoại
   - Phải cung cấp đầy đủ: tên, địa chỉ, số điện thoại
   - TUYỆT ĐỐI KHÔNG thay đổi tên quận từ dữ liệu!
     VD: "Hoàn Kiếm" PHẢI viết "Hoàn Kiếm" (KHÔNG viết "Hoàng Kim")
     VD: "Cầu Giấy" PHẢI viết "Cầu Giấy" (KHÔNG viết "Cầu Gỗ" hay "Cầu Giầy")
   - KẾT THÚC bằng lời khuyên hữu ích (đặt bàn trước, thời gian tốt nhất, v.v.)
   - KHÔNG thêm câu "không tìm thấy" khi đã giới thiệu địa điểm

3. CHỈ nói "Rất tiếc, tôi không tìm thấy địa điểm phù hợp" KHI dữ liệu trống hoặc không phù hợp

Hãy trả lời HOÀN TOÀN bằng TIẾNG VIỆT, dựa CHÍNH XÁC vào dữ liệu được cung cấp."#;

const NO_RESULTS_TEMPLATE: &str = r#"CẤM TUYỆT ĐỐI BỊA THÔNG TIN

Khách hàng hỏi: "{{query}}"

CƠ SỞ DỮ LIỆU TRỐNG, KHÔNG CÓ DỮ LIỆU NÀO!

BẠN CHỈ ĐƯỢC PHÉP TRẢ LỜI SAU ĐÂY (KHÔNG THÊM THẮT):

"{{answer}}"

TUYỆT ĐỐI KHÔNG ĐƯỢC bịa tên nhà hàng, địa chỉ, số điện thoại hoặc gợi ý bất kỳ địa điểm cụ thể nào."#;

const FOLLOWUP_TEMPLATE: &str = r#"LỊCH SỬ HỘI THOẠI:
{{history}}

CÂU HỎI MỚI:
{{query}}

DỮ LIỆU CÁC ĐỊA ĐIỂM PHÙ HỢP:
{{context}}

Hãy trả lời câu hỏi mới dựa trên ngữ cảnh cuộc hội thoại và dữ liệu địa điểm."#;

const CLASSIFICATION_TEMPLATE: &str = r#"Phân tích câu hỏi của người dùng và trả lời theo format JSON:

Câu hỏi: "{{query}}"

Hãy xác định:
1. Người dùng có đang TÌM KIẾM nhà hàng/quán bar/karaoke cụ thể không?
2. Hay chỉ đang chào hỏi/hỏi thông tin chung về chatbot?

Trả lời CHÍNH XÁC theo format JSON này (không giải thích thêm):
{"needs_search": true/false, "response_type": "greeting" hoặc "general_question" hoặc "restaurant_query", "reasoning": "lý do ngắn gọn"}

VÍ DỤ:
- "hello" => {"needs_search": false, "response_type": "greeting", "reasoning": "Chỉ chào hỏi"}
- "bạn là ai" => {"needs_search": false, "response_type": "general_question", "reasoning": "Hỏi về chatbot"}
- "tìm nhà hàng bình dân" => {"needs_search": true, "response_type": "restaurant_query", "reasoning": "Tìm nhà hàng cụ thể"}

Chỉ trả về JSON, không có text khác."#;

const EXTRACTION_TEMPLATE: &str = r#"Phân tích câu hỏi và trích xuất thông tin:

Câu hỏi: "{{query}}"

Tìm các thông tin sau (NẾU CÓ trong câu hỏi):
1. Quận (CHỈ các quận HỢP LỆ ở Hà Nội): {{districts}}
2. Loại: restaurant (nhà hàng), bar (quán bar), karaoke
3. Giá: binh_dan (bình dân/rẻ), trung_binh (trung bình), cao_cap (sang/cao cấp)

QUAN TRỌNG:
- CHỈ trích xuất quận NẾU nó là quận THẬT của Hà Nội
- NẾU quận KHÔNG HỢP LỆ thì KHÔNG trả về district
- KHÔNG tự sửa hoặc đoán tên quận
- Nếu KHÔNG chắc chắn thì bỏ qua key đó

Trả lời CHÍNH XÁC theo format JSON (KHÔNG thêm text):
{"district": "Tây Hồ", "business_type": "restaurant", "price_range": "binh_dan"}

Bây giờ trích xuất (chỉ JSON):"#;

const CONVERSATION_TEMPLATE: &str = r#"Người dùng hỏi: {{query}}

Trả lời NGẮN GỌN (2-3 câu) bằng TIẾNG VIỆT:

Nếu hỏi về BẠN:
- Giới thiệu: "Tôi là trợ lý AI chuyên tư vấn nhà hàng, quán bar và karaoke tại Hà Nội."
- Chức năng: "Tôi có thể giúp bạn tìm địa điểm ăn uống phù hợp với nhu cầu."
- Hỏi ngược: "Bạn cần tìm loại địa điểm nào?"

KHÔNG liệt kê nhà hàng cụ thể."#;

pub const CLASSIFICATION_SYSTEM: &str =
    "Bạn là AI phân loại câu hỏi. Chỉ trả về JSON, không giải thích thêm.";

pub const EXTRACTION_SYSTEM: &str = "Trả về JSON. KHÔNG giải thích.";

pub const CONVERSATION_SYSTEM: &str =
    "Bạn là trợ lý AI chuyên tư vấn nhà hàng tại Hà Nội. Trả lời ngắn gọn, thân thiện.";

/// Fixed reply when retrieval finds nothing
pub const NO_RESULTS_ANSWER: &str = "Rất tiếc, tôi không tìm thấy địa điểm nào phù hợp với yêu cầu của bạn trong cơ sở dữ liệu hiện tại.

Bạn có thể thử:
- Mở rộng khu vực tìm kiếm (thử các quận khác)
- Điều chỉnh mức giá
- Thay đổi loại hình (nhà hàng, bar, karaoke)

Hoặc cho tôi biết thêm chi tiết về nhu cầu của bạn để tôi có thể tư vấn tốt hơn.";

/// Messages of history carried into a follow-up prompt
pub const FOLLOWUP_HISTORY_LEN: usize = 3;

/// Venue recommendation prompts
pub struct VenuePrompts;

impl VenuePrompts {
    #[must_use]
    pub fn query() -> PromptTemplate {
        PromptTemplate::new(QUERY_TEMPLATE)
    }

    #[must_use]
    pub fn followup() -> PromptTemplate {
        PromptTemplate::new(FOLLOWUP_TEMPLATE)
    }

    /// Full answer prompt for a query and its formatted venue context
    #[must_use]
    pub fn build_prompt(query: &str, context: &str) -> String {
        Self::query().render_with(&[("query", query), ("context", context)])
    }

    /// Prompt that pins the model to the fixed not-found reply
    #[must_use]
    pub fn build_no_results_prompt(query: &str) -> String {
        PromptTemplate::new(NO_RESULTS_TEMPLATE)
            .render_with(&[("query", query), ("answer", NO_RESULTS_ANSWER)])
    }

    /// Answer prompt that carries the last few conversation turns
    #[must_use]
    pub fn build_followup_prompt(query: &str, context: &str, history: &[ChatMessage]) -> String {
        let start = history.len().saturating_sub(FOLLOWUP_HISTORY_LEN);
        let history_text = history[start..]
            .iter()
            .filter_map(|msg| match msg.role.as_str() {
                "user" => Some(format!("Khách: {}", msg.content)),
                "assistant" => Some(format!("Trợ lý: {}", msg.content)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self::followup().render_with(&[
            ("history", &history_text),
            ("query", query),
            ("context", context),
        ])
    }

    #[must_use]
    pub fn build_classification_prompt(query: &str) -> String {
        PromptTemplate::new(CLASSIFICATION_TEMPLATE).render_with(&[("query", query)])
    }

    #[must_use]
    pub fn build_extraction_prompt(query: &str) -> String {
        PromptTemplate::new(EXTRACTION_TEMPLATE)
            .render_with(&[("query", query), ("districts", &districts::urban_names())])
    }

    #[must_use]
    pub fn build_conversation_prompt(query: &str) -> String {
        PromptTemplate::new(CONVERSATION_TEMPLATE).render_with(&[("query", query)])
    }
}
