//! LLM provider implementations for Mkulima Smart.
//!
//! All providers implement the `mkulima_core::Provider` trait.
//! `build_from_config` picks the backend from configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, resolve_base_url};
