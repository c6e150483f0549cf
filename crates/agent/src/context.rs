//! Context fetcher: knowledge-base articles and, when the question is about
//! the farmer's own operation, their farm records.

use mkulima_core::agent::{ContextBag, QueryClassification};
use mkulima_core::farm::{FarmRecords, KnowledgeBase, KnowledgeEntry};
use std::sync::Arc;
use tracing::{debug, warn};

/// At most this many knowledge entries reach the prompt.
pub const MAX_KNOWLEDGE_ENTRIES: usize = 3;

/// Knowledge content longer than this is cut and suffixed with `...`.
pub const MAX_KNOWLEDGE_CHARS: usize = 500;

pub struct ContextFetcher {
    knowledge: Arc<dyn KnowledgeBase>,
    farms: Arc<dyn FarmRecords>,
}

impl ContextFetcher {
    pub fn new(knowledge: Arc<dyn KnowledgeBase>, farms: Arc<dyn FarmRecords>) -> Self {
        Self { knowledge, farms }
    }

    /// Gather supporting data. Read-only, makes no model calls, and treats
    /// store errors as "nothing found".
    ///
    /// The returned bag has no classification; the workflow sets it.
    pub async fn fetch(
        &self,
        classification: &QueryClassification,
        user_id: Option<i64>,
    ) -> ContextBag {
        let knowledge = match self
            .knowledge
            .find_active_by_category(&classification.category, MAX_KNOWLEDGE_ENTRIES)
            .await
        {
            Ok(entries) => entries
                .into_iter()
                .take(MAX_KNOWLEDGE_ENTRIES)
                .map(truncate_entry)
                .collect(),
            Err(e) => {
                warn!(category = %classification.category, error = %e, "Knowledge lookup failed");
                Vec::new()
            }
        };

        let farms = match (classification.requires_farm_data, user_id) {
            (true, Some(user_id)) => match self.farms.farms_for_user(user_id).await {
                Ok(farms) => Some(farms),
                Err(e) => {
                    warn!(user_id, error = %e, "Farm lookup failed");
                    None
                }
            },
            _ => None,
        };

        debug!(
            knowledge = knowledge.len(),
            farms = farms.as_ref().map_or(0, Vec::len),
            "Context fetched"
        );

        ContextBag {
            classification: None,
            farms,
            knowledge,
        }
    }
}

fn truncate_entry(mut entry: KnowledgeEntry) -> KnowledgeEntry {
    entry.content = truncate_chars(&entry.content, MAX_KNOWLEDGE_CHARS);
    entry
}

/// Keep the first `max` characters, appending `...` when anything was cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
