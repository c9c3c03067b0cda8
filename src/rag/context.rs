//! Context assembly from retrieved venues

use crate::models::title_case;
use crate::models::VenueHit;

/// Venue features listed per context block
const MAX_FEATURES: usize = 5;

/// Description prefix shown in short listings
const LISTING_DESCRIPTION_CHARS: usize = 100;

/// Assembler for creating LLM context from search results
pub struct ContextAssembler {
    max_context_length: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(8000)
    }
}

impl ContextAssembler {
    #[must_use]
    pub const fn new(max_context_length: usize) -> Self {
        Self { max_context_length }
    }

    /// Numbered venue blocks for the answer prompt
    ///
    /// Blocks that would push the context past the length limit are dropped,
    /// but the first block is always kept.
    #[must_use]
    pub fn assemble(&self, hits: &[VenueHit]) -> String {
        if hits.is_empty() {
            return "Không tìm thấy địa điểm phù hợp.".to_string();
        }

        let mut blocks: Vec<String> = Vec::with_capacity(hits.len());
        let mut total_length = 0;

        for (idx, hit) in hits.iter().enumerate() {
            let block = format_venue_block(idx + 1, hit);
            if !blocks.is_empty() && total_length + block.len() > self.max_context_length {
                break;
            }
            total_length += block.len() + 1;
            blocks.push(block);
        }

        blocks.join("\n")
    }

    /// Plain-text answer used when the LLM is unavailable or failed
    #[must_use]
    pub fn create_summary(&self, hits: &[VenueHit]) -> String {
        if hits.is_empty() {
            return "Không tìm thấy địa điểm phù hợp với yêu cầu của bạn.".to_string();
        }

        let mut summary = format!("Tìm thấy {} địa điểm phù hợp:\n\n", hits.len());

        for (idx, hit) in hits.iter().enumerate() {
            let venue = &hit.venue;
            summary.push_str(&format!("{}. {}\n", idx + 1, venue.name));
            summary.push_str(&format!("   - Loại: {}\n", title_case(&venue.business_type)));
            summary.push_str(&format!("   - Quận: {}\n", venue.district));
            summary.push_str(&format!("   - Giá: {}\n", venue.price_label()));
            summary.push_str(&format!("   - SĐT: {}\n", venue.phone));
            summary.push_str(&format!("   - Địa chỉ: {}\n", venue.address));
            if let Some(cuisines) = join_non_empty(&venue.cuisine_type, usize::MAX) {
                summary.push_str(&format!("   - Ẩm thực: {cuisines}\n"));
            }
            summary.push('\n');
        }

        summary
    }

    /// Short markdown listing returned by the chat API when RAG is off
    #[must_use]
    pub fn create_listing(&self, hits: &[VenueHit]) -> String {
        if hits.is_empty() {
            return "Xin lỗi, không tìm thấy nhà hàng phù hợp với yêu cầu của bạn.".to_string();
        }

        let mut listing = format!(
            "Tìm thấy {} nhà hàng phù hợp với yêu cầu của bạn:\n\n",
            hits.len()
        );
        for (idx, hit) in hits.iter().enumerate() {
            let venue = &hit.venue;
            listing.push_str(&format!("{}. **{}** - {}\n", idx + 1, venue.name, venue.address));
            if let Some(description) = venue.description_opt() {
                listing.push_str(&format!(
                    "   {}...\n",
                    truncate_chars(description, LISTING_DESCRIPTION_CHARS)
                ));
            }
        }
        listing
    }
}

fn format_venue_block(position: usize, hit: &VenueHit) -> String {
    let venue = &hit.venue;
    let mut block = format!(
        "\n{position}. {}\n   - Loại hình: {}\n   - Quận: {}\n   - Mức giá: {}\n   - Số điện thoại: {}\n   - Địa chỉ: {}",
        venue.name,
        title_case(&venue.business_type),
        venue.district,
        venue.price_label(),
        venue.phone,
        venue.address,
    );

    if let Some(cuisines) = join_non_empty(&venue.cuisine_type, usize::MAX) {
        block.push_str(&format!("\n   - Ẩm thực: {cuisines}"));
    }
    if let Some(features) = join_non_empty(&venue.features, MAX_FEATURES) {
        block.push_str(&format!("\n   - Đặc điểm: {features}"));
    }
    block.push_str(&format!(
        "\n   - Độ phù hợp: {:.0}%",
        hit.similarity_score * 100.0
    ));
    block
}

fn join_non_empty(values: &[String], limit: usize) -> Option<String> {
    let joined = values
        .iter()
        .take(limit)
        .filter(|v| !v.trim().is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

/// First `max_chars` characters of `s`
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
