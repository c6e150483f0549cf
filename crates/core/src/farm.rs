//! Agricultural records the agent reads from: the curated knowledge base,
//! the farmer's own farms, and the user directory that maps a phone number
//! to a registered farmer.
//!
//! All three are read-only from the workflow's point of view. The write
//! methods exist for seeding and administration.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A curated article or FAQ entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub content: String,
    /// crops, livestock, weather_advice, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_language() -> String {
    "en".into()
}

fn default_true() -> bool {
    true
}

impl KnowledgeEntry {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            title: title.into(),
            content: content.into(),
            category: Some(category.into()),
            language: default_language(),
            is_active: true,
        }
    }
}

/// A crop planted on a farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    /// planted, growing, harvested, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A herd or flock kept on a farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivestockRecord {
    pub animal_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    pub count: u32,
}

/// Everything the agent may tell the model about one of the farmer's farms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Size in acres
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_type: Option<String>,
    #[serde(default)]
    pub crops: Vec<CropRecord>,
    #[serde(default)]
    pub livestock: Vec<LivestockRecord>,
}

/// A registered farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

/// Read access to the curated knowledge base.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Active entries whose category contains `category_fragment`, in
    /// insertion order, at most `limit` of them.
    async fn find_active_by_category(
        &self,
        category_fragment: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, StoreError>;

    /// Add an entry and return its id.
    async fn add_entry(&self, entry: KnowledgeEntry) -> Result<i64, StoreError>;
}

/// Read access to the farmer's farm records.
#[async_trait]
pub trait FarmRecords: Send + Sync {
    /// Every farm owned by `user_id`, crops and livestock included.
    async fn farms_for_user(&self, user_id: i64) -> Result<Vec<FarmSnapshot>, StoreError>;

    /// Register a farm (with its crops and livestock) for `user_id`.
    async fn add_farm(&self, user_id: i64, farm: FarmSnapshot) -> Result<i64, StoreError>;
}

/// Phone-number lookup for inbound SMS senders.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Register a farmer and return the stored profile.
    async fn register(
        &self,
        username: &str,
        phone_number: Option<&str>,
    ) -> Result<UserProfile, StoreError>;
}
