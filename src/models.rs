use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::districts;
use crate::errors::Result;
use crate::errors::TopgoError;

/// A crawled venue as produced by the batch processor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub address: String,
    pub district: String,
    pub phone: String,
    pub business_type: String,
    pub price_range: String,
    pub cuisine_type: Vec<String>,
    pub features: Vec<String>,
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub searchable_text: String,
}

impl Venue {
    /// Text that gets embedded for this venue
    pub fn document(&self) -> String {
        if self.searchable_text.trim().is_empty() {
            format!("{} {} {}", self.name, self.description, self.address)
        } else {
            self.searchable_text.clone()
        }
    }

    /// Price tier in display form ("Binh Dan")
    pub fn price_label(&self) -> String {
        title_case(&self.price_range)
    }

    pub fn description_opt(&self) -> Option<&str> {
        Some(self.description.as_str()).filter(|d| !d.trim().is_empty())
    }
}

/// Venue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessType {
    Restaurant,
    Bar,
    Karaoke,
    Cafe,
    Buffet,
    Other,
}

impl BusinessType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Bar => "bar",
            Self::Karaoke => "karaoke",
            Self::Cafe => "cafe",
            Self::Buffet => "buffet",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessType {
    type Err = TopgoError;

    fn from_str(s: &str) -> Result<Self> {
        match districts::fold(s).as_str() {
            "restaurant" | "nha hang" => Ok(Self::Restaurant),
            "bar" | "quan bar" | "pub" | "lounge" => Ok(Self::Bar),
            "karaoke" => Ok(Self::Karaoke),
            "cafe" | "coffee" => Ok(Self::Cafe),
            "buffet" => Ok(Self::Buffet),
            "other" => Ok(Self::Other),
            _ => Err(TopgoError::InvalidFilter {
                field: "business_type".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Price tier as stored in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    BinhDan,
    TrungBinh,
    CaoCap,
}

impl PriceTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BinhDan => "binh_dan",
            Self::TrungBinh => "trung_binh",
            Self::CaoCap => "cao_cap",
        }
    }

    /// Bucket a per-person budget in VND
    pub const fn from_budget(budget_per_person: u64) -> Self {
        if budget_per_person < 100_000 {
            Self::BinhDan
        } else if budget_per_person < 300_000 {
            Self::TrungBinh
        } else {
            Self::CaoCap
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceTier {
    type Err = TopgoError;

    fn from_str(s: &str) -> Result<Self> {
        match districts::fold(&s.replace('_', " ")).as_str() {
            "binh dan" | "cheap" => Ok(Self::BinhDan),
            "trung binh" | "moderate" => Ok(Self::TrungBinh),
            "cao cap" | "expensive" => Ok(Self::CaoCap),
            _ => Err(TopgoError::InvalidFilter {
                field: "price_range".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Resolved, validated search filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Canonical district name
    pub district: Option<String>,
    pub business_type: Option<BusinessType>,
    pub price_range: Option<PriceTier>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.district.is_none() && self.business_type.is_none() && self.price_range.is_none()
    }

    pub fn by_type(business_type: BusinessType) -> Self {
        Self {
            business_type: Some(business_type),
            ..Self::default()
        }
    }

    pub fn by_price(price_range: PriceTier) -> Self {
        Self {
            price_range: Some(price_range),
            ..Self::default()
        }
    }

    /// Filter on a district given as free user input
    pub fn by_district(input: &str) -> Result<Self> {
        Ok(Self {
            district: Some(canonical_district(input)?),
            ..Self::default()
        })
    }

    /// Whether a venue satisfies every filter
    pub fn matches(&self, venue: &Venue) -> bool {
        let district_ok = self
            .district
            .as_deref()
            .map_or(true, |d| districts::fold(d) == districts::fold(&venue.district));
        let type_ok = self
            .business_type
            .map_or(true, |t| venue.business_type.eq_ignore_ascii_case(t.as_str()));
        let price_ok = self
            .price_range
            .map_or(true, |p| venue.price_range.eq_ignore_ascii_case(p.as_str()));
        district_ok && type_ok && price_ok
    }

    /// Filters as a JSON object, for echoing back to API callers
    pub fn applied(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        if let Some(business_type) = self.business_type {
            map.insert("business_type".into(), business_type.as_str().into());
        }
        if let Some(district) = &self.district {
            map.insert("district".into(), district.clone().into());
        }
        if let Some(price) = self.price_range {
            map.insert("price_range".into(), price.as_str().into());
        }
        map
    }
}

/// Loosely typed filters as they arrive from clients or the LLM
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterInput {
    #[serde(default, alias = "type")]
    pub business_type: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default, alias = "price")]
    pub price_range: Option<String>,
}

impl FilterInput {
    pub fn is_empty(&self) -> bool {
        [&self.business_type, &self.district, &self.price_range]
            .iter()
            .all(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
    }

    /// Validate every value; `price_range = "all"` means no price filter
    pub fn resolve(&self) -> Result<SearchFilters> {
        let mut filters = SearchFilters::default();

        if let Some(district) = non_blank(self.district.as_deref()) {
            filters.district = Some(canonical_district(district)?);
        }
        if let Some(business_type) = non_blank(self.business_type.as_deref()) {
            filters.business_type = Some(business_type.parse()?);
        }
        if let Some(price) = non_blank(self.price_range.as_deref()) {
            if !price.eq_ignore_ascii_case("all") {
                filters.price_range = Some(price.parse()?);
            }
        }

        Ok(filters)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn canonical_district(input: &str) -> Result<String> {
    districts::resolve(input)
        .map(|d| d.name.to_string())
        .ok_or_else(|| TopgoError::InvalidDistrict(input.trim().to_string()))
}

/// A retrieved venue with its score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueHit {
    #[serde(flatten)]
    pub venue: Venue,
    pub similarity_score: f32,
    /// 1-based position in the result list
    pub rank: usize,
}

/// Map an L2 distance to a 0..=1 similarity via the squared distance
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance * distance)
}

/// Python-style title case: "binh_dan" -> "Binh Dan"
pub fn title_case(s: &str) -> String {
    s.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue(district: &str, business_type: &str, price: &str) -> Venue {
        Venue {
            id: "v1".into(),
            name: "Test".into(),
            district: district.into(),
            business_type: business_type.into(),
            price_range: price.into(),
            ..Venue::default()
        }
    }

    #[test]
    fn test_document_fallback() {
        let mut v = Venue {
            name: "Cơm Việt".into(),
            description: "Ẩm thực Việt".into(),
            address: "17 Nguyễn Thị Thập".into(),
            ..Venue::default()
        };
        assert_eq!(v.document(), "Cơm Việt Ẩm thực Việt 17 Nguyễn Thị Thập");

        v.searchable_text = "nhà hàng gia đình".into();
        assert_eq!(v.document(), "nhà hàng gia đình");
    }

    #[test]
    fn test_price_tier_parsing() {
        assert_eq!("binh_dan".parse::<PriceTier>().unwrap(), PriceTier::BinhDan);
        assert_eq!("Binh Dan".parse::<PriceTier>().unwrap(), PriceTier::BinhDan);
        assert_eq!("bình dân".parse::<PriceTier>().unwrap(), PriceTier::BinhDan);
        assert_eq!("moderate".parse::<PriceTier>().unwrap(), PriceTier::TrungBinh);
        assert_eq!("CAO_CAP".parse::<PriceTier>().unwrap(), PriceTier::CaoCap);
        assert!("free".parse::<PriceTier>().is_err());
    }

    #[test]
    fn test_budget_buckets() {
        assert_eq!(PriceTier::from_budget(0), PriceTier::BinhDan);
        assert_eq!(PriceTier::from_budget(99_999), PriceTier::BinhDan);
        assert_eq!(PriceTier::from_budget(100_000), PriceTier::TrungBinh);
        assert_eq!(PriceTier::from_budget(299_999), PriceTier::TrungBinh);
        assert_eq!(PriceTier::from_budget(300_000), PriceTier::CaoCap);
    }

    #[test]
    fn test_business_type_parsing() {
        assert_eq!("Karaoke".parse::<BusinessType>().unwrap(), BusinessType::Karaoke);
        assert_eq!("nhà hàng".parse::<BusinessType>().unwrap(), BusinessType::Restaurant);
        assert!("spa".parse::<BusinessType>().is_err());
    }

    #[test]
    fn test_filter_input_aliases() {
        let input: FilterInput = serde_json::from_value(serde_json::json!({
            "type": "restaurant",
            "district": "Cau Giay",
            "price": "cheap"
        }))
        .unwrap();

        let filters = input.resolve().unwrap();
        assert_eq!(filters.business_type, Some(BusinessType::Restaurant));
        assert_eq!(filters.district.as_deref(), Some("Cầu Giấy"));
        assert_eq!(filters.price_range, Some(PriceTier::BinhDan));
    }

    #[test]
    fn test_filter_input_rejects_unknown_district() {
        let input = FilterInput {
            district: Some("sao Hỏa".into()),
            ..FilterInput::default()
        };
        assert!(matches!(input.resolve(), Err(TopgoError::InvalidDistrict(d)) if d == "sao Hỏa"));
    }

    #[test]
    fn test_filter_input_all_price_and_blanks() {
        let input = FilterInput {
            business_type: Some("  ".into()),
            district: None,
            price_range: Some("all".into()),
        };
        assert!(!input.is_empty());
        assert!(input.resolve().unwrap().is_empty());
    }

    #[test]
    fn test_filters_match() {
        let filters = FilterInput {
            business_type: Some("bar".into()),
            district: Some("tay ho".into()),
            price_range: None,
        }
        .resolve()
        .unwrap();

        assert!(filters.matches(&venue("Tây Hồ", "bar", "cao_cap")));
        assert!(!filters.matches(&venue("Tây Hồ", "restaurant", "cao_cap")));
        assert!(!filters.matches(&venue("Ba Đình", "bar", "cao_cap")));
        assert!(SearchFilters::default().matches(&venue("Ba Đình", "bar", "cao_cap")));
    }

    #[test]
    fn test_applied_map() {
        let filters = SearchFilters {
            district: Some("Hoàn Kiếm".into()),
            business_type: None,
            price_range: Some(PriceTier::TrungBinh),
        };
        let applied = filters.applied();
        assert_eq!(applied["district"], "Hoàn Kiếm");
        assert_eq!(applied["price_range"], "trung_binh");
        assert!(!applied.contains_key("business_type"));
    }

    #[test]
    fn test_similarity_from_distance() {
        assert!((similarity_from_distance(0.0) - 1.0).abs() < f32::EPSILON);
        assert!((similarity_from_distance(1.0) - 0.5).abs() < f32::EPSILON);
        assert!(similarity_from_distance(2.0) < similarity_from_distance(1.5));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("binh_dan"), "Binh Dan");
        assert_eq!(title_case("restaurant"), "Restaurant");
        assert_eq!(title_case(""), "");
    }
}
