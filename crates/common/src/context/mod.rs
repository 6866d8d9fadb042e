//! Retrieval-augmented answering
//!
//! - Complexity tiers
//! - Relevance filtering with top-N fallback
//! - Context formatting for the prompt
//! - Answer synthesis
//! - Source link extraction
//! - The orchestrator that sequences them

mod formatter;
mod links;
mod orchestrator;
mod relevance;
mod synthesizer;
mod tier;

pub use formatter::ContextFormatter;
pub use links::{extract_links, SourceLink};
pub use orchestrator::{ComponentStatus, RagAnswer, RagOrchestrator, Readiness};
pub use relevance::{FilteredContext, RelevancePolicy};
pub use synthesizer::{
    build_system_prompt, build_user_prompt, tier_instruction, AnswerGenerator, GenerationSettings,
    OpenAIChatGenerator, Synthesizer,
};
pub use tier::ComplexityTier;
