//! System prompt composition.

use crate::context::truncate_chars;
use mkulima_core::agent::ContextBag;
use mkulima_core::farm::FarmSnapshot;
use std::fmt::Write;

/// Upper bound on the composed system prompt, in characters.
pub const MAX_SYSTEM_PROMPT_CHARS: usize = 4000;

pub const DEFAULT_PERSONA: &str = "You are Mkulima Smart, an agricultural advisor for smallholder farmers in Kenya. \
You are an expert in crop management, livestock, soil health, pests and diseases, weather-aware planning and market prices. \
Answers are delivered by SMS: keep them short, practical and in plain language, at most three short paragraphs. \
Never use asterisks or markdown formatting. \
If a question depends on current weather, call the get_weather tool with the farmer's town. \
If you are not sure, say so and suggest contacting the local agricultural extension officer.";

/// Builds the system message from the persona and the turn's context bag.
///
/// Pure: the same bag always yields the same prompt.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    persona: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.into(),
        }
    }
}

impl PromptComposer {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    /// Use `persona` when set and non-blank, the built-in persona otherwise.
    pub fn with_override(persona: Option<&str>) -> Self {
        match persona.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Self::new(p),
            None => Self::default(),
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn compose(&self, bag: &ContextBag) -> String {
        let mut prompt = self.persona.clone();

        if let Some(farms) = bag.farms.as_ref().filter(|f| !f.is_empty()) {
            prompt.push_str("\n\nFARMER'S FARM DATA:\n");
            for farm in farms {
                render_farm(&mut prompt, farm);
            }
        }

        if !bag.knowledge.is_empty() {
            prompt.push_str("\n\nRELEVANT KNOWLEDGE:\n");
            for (i, entry) in bag.knowledge.iter().enumerate() {
                let _ = writeln!(prompt, "{}. {}: {}", i + 1, entry.title, entry.content);
            }
        }

        if prompt.chars().count() > MAX_SYSTEM_PROMPT_CHARS {
            // Leave room for the ellipsis so the result stays within bounds.
            return truncate_chars(&prompt, MAX_SYSTEM_PROMPT_CHARS - 3);
        }
        prompt
    }
}

fn render_farm(out: &mut String, farm: &FarmSnapshot) {
    let _ = write!(out, "- {}", farm.name);
    if let Some(location) = &farm.location {
        let _ = write!(out, " in {location}");
    }
    if let Some(size) = farm.size {
        let _ = write!(out, ", {size} acres");
    }
    if let Some(kind) = &farm.farm_type {
        let _ = write!(out, " ({kind})");
    }
    out.push('\n');

    if !farm.crops.is_empty() {
        let crops: Vec<String> = farm
            .crops
            .iter()
            .map(|c| {
                let mut s = c.name.clone();
                if let Some(v) = &c.variety {
                    let _ = write!(s, " {v}");
                }
                if let Some(st) = &c.status {
                    let _ = write!(s, " [{st}]");
                }
                s
            })
            .collect();
        let _ = writeln!(out, "  Crops: {}", crops.join(", "));
    }

    if !farm.livestock.is_empty() {
        let herds: Vec<String> = farm
            .livestock
            .iter()
            .map(|l| match &l.breed {
                Some(b) => format!("{} {} {}", l.count, b, l.animal_type),
                None => format!("{} {}", l.count, l.animal_type),
            })
            .collect();
        let _ = writeln!(out, "  Livestock: {}", herds.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkulima_core::farm::{CropRecord, KnowledgeEntry, LivestockRecord};

    fn farm() -> FarmSnapshot {
        FarmSnapshot {
            name: "Shamba".into(),
            location: Some("Nakuru".into()),
            size: Some(2.5),
            farm_type: Some("mixed".into()),
            crops: vec![CropRecord {
                name: "beans".into(),
                variety: Some("Rosecoco".into()),
                status: Some("growing".into()),
            }],
            livestock: vec![LivestockRecord {
                animal_type: "cows".into(),
                breed: Some("Friesian".into()),
                count: 2,
            }],
        }
    }

    #[test]
    fn empty_bag_is_just_persona() {
        let composer = PromptComposer::default();
        assert_eq!(composer.compose(&ContextBag::default()), DEFAULT_PERSONA);
    }

    #[test]
    fn sections_appear_in_order() {
        let bag = ContextBag {
            classification: None,
            farms: Some(vec![farm()]),
            knowledge: vec![KnowledgeEntry::new("Bean rust", "Spray early.", "pest_disease")],
        };
        let prompt = PromptComposer::default().compose(&bag);
        let farm_at = prompt.find("FARMER'S FARM DATA").unwrap();
        let kb_at = prompt.find("RELEVANT KNOWLEDGE").unwrap();
        assert!(farm_at < kb_at);
        assert!(prompt.contains("Shamba in Nakuru, 2.5 acres (mixed)"));
        assert!(prompt.contains("beans Rosecoco [growing]"));
        assert!(prompt.contains("2 Friesian cows"));
        assert!(prompt.contains("1. Bean rust: Spray early."));
    }

    #[test]
    fn composition_is_deterministic() {
        let bag = ContextBag {
            classification: None,
            farms: Some(vec![farm()]),
            knowledge: vec![],
        };
        let composer = PromptComposer::default();
        assert_eq!(composer.compose(&bag), composer.compose(&bag));
    }

    #[test]
    fn prompt_is_bounded() {
        let knowledge = (0..20)
            .map(|i| KnowledgeEntry::new(format!("T{i}"), "y".repeat(500), "general_farming"))
            .collect();
        let bag = ContextBag {
            classification: None,
            farms: None,
            knowledge,
        };
        let prompt = PromptComposer::default().compose(&bag);
        assert_eq!(prompt.chars().count(), MAX_SYSTEM_PROMPT_CHARS);
        assert!(prompt.ends_with("..."));
    }

    #[test]
    fn blank_override_keeps_default() {
        assert_eq!(
            PromptComposer::with_override(Some("   ")).persona(),
            DEFAULT_PERSONA
        );
        assert_eq!(
            PromptComposer::with_override(Some("Jibu kwa Kiswahili.")).persona(),
            "Jibu kwa Kiswahili."
        );
    }
}
