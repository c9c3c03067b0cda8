//! Clean-up of generated answers

use std::collections::HashSet;

use regex::RegexBuilder;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::models::VenueHit;

/// District names small models tend to garble, with the intended spelling
const DISTRICT_CORRECTIONS: &[(&str, &str)] = &[
    ("hoàng kim", "Hoàn Kiếm"),
    ("hoang kim", "Hoàn Kiếm"),
    ("cầu gỗ", "Cầu Giấy"),
    ("cau go", "Cầu Giấy"),
    ("cầu giầy", "Cầu Giấy"),
    ("tây hô", "Tây Hồ"),
    ("tay ho", "Tây Hồ"),
    ("đồng đa", "Đống Đa"),
    ("dong da", "Đống Đa"),
];

/// Phrases that contradict an answer which already lists venues
const NEGATIVE_PHRASES: &[&str] = &[
    "Rất tiếc, tôi không tìm thấy",
    "Xin lỗi, không tìm thấy",
    "Không tìm thấy địa điểm phù hợp",
];

/// Answers at or below this many characters are left untrimmed
const MIN_TRIM_LENGTH: usize = 100;

/// Apply every correction to a generated answer
pub fn postprocess_answer(answer: &str, sources: &[VenueHit]) -> String {
    let answer: String = answer.nfc().collect();
    if sources.is_empty() {
        return answer;
    }
    let corrected = correct_district_names(&answer, sources);
    trim_negative_phrases(&corrected)
}

/// Replace misspelled districts, but only with districts the sources contain
pub fn correct_district_names(answer: &str, sources: &[VenueHit]) -> String {
    let actual: HashSet<&str> = sources.iter().map(|h| h.venue.district.as_str()).collect();
    let mut result = answer.to_string();

    for (wrong, correct) in DISTRICT_CORRECTIONS {
        if !actual.contains(correct) || !result.to_lowercase().contains(wrong) {
            continue;
        }
        let Ok(pattern) = RegexBuilder::new(&regex::escape(wrong))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        result = pattern.replace_all(&result, *correct).into_owned();
        warn!("Fixed LLM mistake: '{wrong}' -> '{correct}'");
    }

    result
}

/// Cut a long answer at the first "not found" phrase
pub fn trim_negative_phrases(answer: &str) -> String {
    if answer.chars().count() <= MIN_TRIM_LENGTH {
        return answer.to_string();
    }

    let mut result = answer.to_string();
    for phrase in NEGATIVE_PHRASES {
        if let Some(pos) = result.find(phrase) {
            result = result[..pos].trim().to_string();
        }
    }
    result
}
