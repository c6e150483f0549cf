//! The advisory agent — the heart of Mkulima Smart.
//!
//! Every inbound message runs one pass of a small state machine:
//!
//! 1. **Classify** the question with one model call (best effort)
//! 2. **Fetch context**: knowledge-base articles, and the farmer's own farm
//!    records when the question needs them
//! 3. **Compose** the system prompt and **invoke** the model
//! 4. **If tool calls**: run the registered tools, feed results back, go to 3
//! 5. **Persist** the turn as one transaction and return the answer
//!
//! Tool rounds are bounded; a failed model call yields a fixed apology.

pub mod classifier;
pub mod context;
pub mod persistence;
pub mod prompt;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use classifier::{QueryClassifier, parse_classification};
pub use context::{ContextFetcher, MAX_KNOWLEDGE_CHARS, MAX_KNOWLEDGE_ENTRIES, truncate_chars};
pub use persistence::{TurnPersister, build_turn, session_title};
pub use prompt::{DEFAULT_PERSONA, MAX_SYSTEM_PROMPT_CHARS, PromptComposer};
pub use workflow::{APOLOGY, AdvisoryAgent, Step, TurnOutcome};
