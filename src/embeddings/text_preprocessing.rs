//! Text preprocessing utilities for embedding generation

use tracing::debug;
use tracing::warn;

use crate::errors::Result;
use crate::errors::TopgoError;

/// Longest text (in characters) sent to the embedding model
pub const MAX_EMBED_CHARS: usize = 1500;

/// Normalize and bound text before it is embedded
///
/// - collapses newlines, tabs and runs of spaces
/// - replaces control characters
/// - truncates long text at a word boundary
pub fn preprocess_text_for_embedding(text: &str) -> Result<String> {
    let sanitized = sanitize_text(text);

    if sanitized.is_empty() {
        return Err(TopgoError::Embedding(
            "Text contains only whitespace after preprocessing".to_string(),
        ));
    }

    let char_count = sanitized.chars().count();
    if char_count > MAX_EMBED_CHARS {
        warn!("Text too long ({char_count} chars), truncating to {MAX_EMBED_CHARS}");
        return Ok(truncate_at_word(&sanitized, MAX_EMBED_CHARS));
    }

    debug!("Preprocessed text: {} -> {} bytes", text.len(), sanitized.len());
    Ok(sanitized)
}

/// Replace control characters and collapse whitespace
fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Cut to at most `max_chars` characters, preferring the last space
fn truncate_at_word(text: &str, max_chars: usize) -> String {
    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        // Keep the word boundary unless it throws away most of the text
        Some(pos) if pos > cut.len() / 2 => cut[..pos].to_string(),
        _ => cut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_normalized() {
        let text = "Nhà hàng\r\nCơm Việt\t\tHeritage   Cầu Giấy";
        assert_eq!(
            preprocess_text_for_embedding(text).unwrap(),
            "Nhà hàng Cơm Việt Heritage Cầu Giấy"
        );
    }

    #[test]
    fn test_control_chars_removed() {
        let text = "Quán\u{0007}bar\u{0000}Tây Hồ";
        assert_eq!(preprocess_text_for_embedding(text).unwrap(), "Quán bar Tây Hồ");
    }

    #[test]
    fn test_empty_rejected() {
        assert!(preprocess_text_for_embedding("").is_err());
        assert!(preprocess_text_for_embedding(" \n\t ").is_err());
    }

    #[test]
    fn test_long_text_truncated_on_char_boundary() {
        let text = "lẩu nướng ".repeat(400);
        let processed = preprocess_text_for_embedding(&text).unwrap();
        assert!(processed.chars().count() <= MAX_EMBED_CHARS);
        assert!(processed.ends_with("lẩu") || processed.ends_with("nướng"));
    }
}
