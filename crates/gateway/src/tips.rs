//! `GET /farming/tips` — static advice cards by category.

use axum::{extract::Query, response::Json};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIPS_CATEGORY: &str = "general";

const CROPS: [&str; 4] = [
    "Plant maize during long rains (March-May) for best yields",
    "Use certified seeds for better disease resistance",
    "Apply organic manure 2 weeks before planting",
    "Practice crop rotation to maintain soil fertility",
];

const LIVESTOCK: [&str; 4] = [
    "Provide clean water daily for healthy animals",
    "Vaccinate cattle against common diseases",
    "Build proper shelter to protect from weather",
    "Feed animals balanced diet with minerals",
];

const WEATHER: [&str; 4] = [
    "Check weather forecast before planting",
    "Harvest crops before heavy rains",
    "Use mulching to conserve soil moisture",
    "Plant drought-resistant varieties in dry areas",
];

const GENERAL: [&str; 4] = [
    "Keep farm records for better planning",
    "Join farmer groups for knowledge sharing",
    "Test your soil before applying fertilizers",
    "Practice sustainable farming methods",
];

/// Tips for `category`; anything unrecognised gets the general list.
pub fn tips_for(category: &str) -> &'static [&'static str] {
    match category {
        "crops" => &CROPS,
        "livestock" => &LIVESTOCK,
        "weather" => &WEATHER,
        _ => &GENERAL,
    }
}

#[derive(Debug, Deserialize)]
pub struct TipsQuery {
    category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TipsResponse {
    /// The category as requested, even when the general list was served.
    pub category: String,
    pub tips: Vec<&'static str>,
}

pub async fn tips_handler(Query(query): Query<TipsQuery>) -> Json<TipsResponse> {
    let category = query
        .category
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TIPS_CATEGORY.to_string());
    let tips = tips_for(&category).to_vec();
    Json(TipsResponse { category, tips })
}
