//! Registry of Hanoi administrative districts
//!
//! User input arrives with or without Vietnamese diacritics ("Cầu Giấy",
//! "cau giay", "QUẬN CẦU GIẤY"). Every lookup goes through [`fold`] so all
//! of those resolve to the same canonical entry.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Administrative level of a district
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistrictKind {
    /// Quận
    Urban,
    /// Huyện
    Rural,
    /// Thị xã
    Town,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct District {
    pub name: &'static str,
    pub kind: DistrictKind,
}

const fn urban(name: &'static str) -> District {
    District {
        name,
        kind: DistrictKind::Urban,
    }
}

const fn rural(name: &'static str) -> District {
    District {
        name,
        kind: DistrictKind::Rural,
    }
}

static DISTRICTS: &[District] = &[
    urban("Ba Đình"),
    urban("Hoàn Kiếm"),
    urban("Tây Hồ"),
    urban("Long Biên"),
    urban("Cầu Giấy"),
    urban("Đống Đa"),
    urban("Hai Bà Trưng"),
    urban("Hoàng Mai"),
    urban("Thanh Xuân"),
    urban("Nam Từ Liêm"),
    urban("Bắc Từ Liêm"),
    urban("Hà Đông"),
    // Split into Nam/Bắc Từ Liêm in 2013 but still common in listings
    urban("Từ Liêm"),
    District {
        name: "Sơn Tây",
        kind: DistrictKind::Town,
    },
    rural("Sóc Sơn"),
    rural("Đông Anh"),
    rural("Gia Lâm"),
    rural("Thanh Trì"),
    rural("Mê Linh"),
    rural("Ba Vì"),
    rural("Phúc Thọ"),
    rural("Đan Phượng"),
    rural("Hoài Đức"),
    rural("Quốc Oai"),
    rural("Thạch Thất"),
    rural("Chương Mỹ"),
    rural("Thanh Oai"),
    rural("Thường Tín"),
    rural("Phú Xuyên"),
    rural("Ứng Hòa"),
    rural("Mỹ Đức"),
];

/// Administrative prefixes users put in front of a district name
const PREFIXES: &[&str] = &["quan ", "huyen ", "thi xa ", "district "];

/// Lowercase, strip Vietnamese diacritics and collapse whitespace
pub fn fold(text: &str) -> String {
    let stripped: String = text
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == 'đ' { 'd' } else { c })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve user input to a known district
pub fn resolve(input: &str) -> Option<&'static District> {
    let folded = fold(input);
    let key = PREFIXES
        .iter()
        .find_map(|prefix| folded.strip_prefix(prefix))
        .unwrap_or(&folded);

    if key.is_empty() {
        return None;
    }
    DISTRICTS.iter().find(|d| fold(d.name) == key)
}

pub fn is_valid(input: &str) -> bool {
    resolve(input).is_some()
}

pub fn all() -> &'static [District] {
    DISTRICTS
}

/// Comma-separated names of the inner-city districts
pub fn urban_names() -> String {
    DISTRICTS
        .iter()
        .filter(|d| d.kind == DistrictKind::Urban && d.name != "Từ Liêm")
        .map(|d| d.name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_diacritics() {
        assert_eq!(fold("Cầu Giấy"), "cau giay");
        assert_eq!(fold("  ĐỐNG   ĐA "), "dong da");
        assert_eq!(fold("Ứng Hòa"), "ung hoa");
        assert_eq!(fold("Ứng Hoà"), "ung hoa");
    }

    #[test]
    fn test_resolve_with_and_without_diacritics() {
        let canonical = resolve("Hoàn Kiếm").unwrap();
        assert_eq!(canonical.name, "Hoàn Kiếm");
        assert_eq!(resolve("hoan kiem"), Some(canonical));
        assert_eq!(resolve("HOAN KIEM"), Some(canonical));
        assert_eq!(resolve("Quận Hoàn Kiếm"), Some(canonical));
    }

    #[test]
    fn test_rural_and_town_units() {
        assert_eq!(resolve("huyen gia lam").unwrap().kind, DistrictKind::Rural);
        assert_eq!(resolve("Sơn Tây").unwrap().kind, DistrictKind::Town);
    }

    #[test]
    fn test_unknown_districts_rejected() {
        assert!(!is_valid("sao Hỏa"));
        assert!(!is_valid("1"));
        assert!(!is_valid(""));
        assert!(!is_valid("quận "));
        assert!(!is_valid("Quận 1"));
    }

    #[test]
    fn test_registry_has_no_fold_collisions() {
        let mut keys: Vec<String> = all().iter().map(|d| fold(d.name)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), all().len());
    }

    #[test]
    fn test_urban_names_listing() {
        let names = urban_names();
        assert!(names.starts_with("Ba Đình, Hoàn Kiếm"));
        assert!(!names.split(", ").any(|n| n == "Từ Liêm"));
        assert!(!names.contains("Sóc Sơn"));
    }
}
