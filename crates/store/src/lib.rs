//! Persistence for Mkulima Smart.
//!
//! Backends:
//! - **SQLite** (default) — sqlx pool in WAL mode, one transaction per turn
//! - **In-memory** — for tests and ephemeral runs
//!
//! Both implement every store trait from `mkulima-core`:
//! `ConversationStore`, `KnowledgeBase`, `FarmRecords` and `UserDirectory`.

pub mod in_memory;
pub mod seed;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use seed::{seed_knowledge, starter_knowledge};
pub use sqlite::SqliteStore;
