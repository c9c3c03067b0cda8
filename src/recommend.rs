//! Occasion-based recommendations
//!
//! Turns structured criteria (occasion, group size, budget, district,
//! preferences) into a retrieval query plus filters, then explains the
//! result in one Vietnamese sentence.

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::districts;
use crate::errors::Result;
use crate::errors::TopgoError;
use crate::models::BusinessType;
use crate::models::PriceTier;
use crate::models::SearchFilters;
use crate::models::VenueHit;
use crate::rag::VenueRetriever;

/// Occasions with a richer description for retrieval
const OCCASION_KEYWORDS: &[(&str, &str)] = &[
    ("sinh nhật", "phù hợp sinh nhật, không gian vui vẻ"),
    ("hẹn hò", "lãng mạn, view đẹp, riêng tư"),
    ("họp lớp", "phòng riêng, karaoke, nhóm đông"),
    ("gia đình", "gia đình, trẻ em, thoải mái"),
    ("công ty", "chuyên nghiệp, phòng VIP, hội nghị"),
];

const DEFAULT_QUERY: &str = "nhà hàng tốt";
const DEFAULT_REASON: &str = "Gợi ý nhà hàng phù hợp";
const DEFAULT_RESULTS: usize = 5;
const MAX_RESULTS: usize = 10;
const MAX_GROUP_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationCriteria {
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub group_size: Option<u32>,
    /// VND per person
    #[serde(default)]
    pub budget_per_person: Option<u64>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub preferences: Option<Vec<String>>,
}

impl RecommendationCriteria {
    pub fn validate(&self) -> Result<()> {
        if let Some(size) = self.group_size {
            if !(1..=MAX_GROUP_SIZE).contains(&size) {
                return Err(TopgoError::InvalidRequest(format!(
                    "group_size must be within 1..={MAX_GROUP_SIZE}"
                )));
            }
        }
        Ok(())
    }

    fn occasion(&self) -> Option<&str> {
        self.occasion.as_deref().map(str::trim).filter(|o| !o.is_empty())
    }

    fn district(&self) -> Option<&str> {
        self.district.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    fn budget(&self) -> Option<u64> {
        self.budget_per_person.filter(|b| *b > 0)
    }
}

/// Search derived from a set of criteria
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationPlan {
    pub query: String,
    pub filters: SearchFilters,
    pub n_results: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Recommendations {
    pub venues: Vec<VenueHit>,
    pub reason: String,
}

/// Build the retrieval query, filters and explanation for `criteria`
pub fn plan(criteria: &RecommendationCriteria) -> Result<RecommendationPlan> {
    criteria.validate()?;

    let mut query_parts: Vec<String> = Vec::new();
    if let Some(occasion) = criteria.occasion() {
        query_parts.push(expand_occasion(occasion));
    }
    if let Some(preferences) = &criteria.preferences {
        query_parts.extend(
            preferences
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        );
    }
    let query = if query_parts.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        query_parts.join(" ")
    };

    let mut filters = SearchFilters {
        price_range: criteria.budget().map(PriceTier::from_budget),
        ..SearchFilters::default()
    };
    if let Some(district) = criteria.district() {
        let resolved = districts::resolve(district)
            .ok_or_else(|| TopgoError::InvalidDistrict(district.to_string()))?;
        filters.district = Some(resolved.name.to_string());
    }
    if let Some(occasion) = criteria.occasion() {
        filters.business_type = occasion_business_type(occasion);
    }

    let n_results = criteria
        .group_size
        .map_or(DEFAULT_RESULTS, |size| (size as usize).min(MAX_RESULTS));

    Ok(RecommendationPlan {
        query,
        filters,
        n_results,
        reason: suggestion_reason(criteria),
    })
}

/// Plan and run a recommendation search
pub async fn recommend(
    retriever: &VenueRetriever,
    criteria: &RecommendationCriteria,
) -> Result<Recommendations> {
    info!(
        "Recommendation request: {:?}, {:?} people",
        criteria.occasion, criteria.group_size
    );
    let plan = plan(criteria)?;
    let venues = retriever
        .search(&plan.query, plan.n_results, &plan.filters)
        .await?;

    Ok(Recommendations {
        venues,
        reason: plan.reason,
    })
}

fn expand_occasion(occasion: &str) -> String {
    let folded = districts::fold(occasion);
    OCCASION_KEYWORDS
        .iter()
        .find(|(name, _)| districts::fold(name) == folded)
        .map_or_else(|| occasion.to_string(), |(_, keywords)| (*keywords).to_string())
}

fn occasion_business_type(occasion: &str) -> Option<BusinessType> {
    let lowered = occasion.to_lowercase();
    if lowered.contains("karaoke") {
        Some(BusinessType::Karaoke)
    } else if ["bar", "rượu", "cocktail"].iter().any(|kw| lowered.contains(kw)) {
        Some(BusinessType::Bar)
    } else {
        None
    }
}

fn suggestion_reason(criteria: &RecommendationCriteria) -> String {
    let mut parts = Vec::new();
    if let Some(occasion) = criteria.occasion() {
        parts.push(format!("phù hợp cho {occasion}"));
    }
    if let Some(size) = criteria.group_size {
        parts.push(format!("{size} người"));
    }
    if let Some(budget) = criteria.budget() {
        parts.push(format!("ngân sách {}đ/người", group_thousands(budget)));
    }
    if let Some(district) = criteria.district() {
        parts.push(format!("tại {district}"));
    }

    if parts.is_empty() {
        DEFAULT_REASON.to_string()
    } else {
        format!("Các nhà hàng này {}", parts.join(", "))
    }
}

/// 500000 -> "500,000"
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
