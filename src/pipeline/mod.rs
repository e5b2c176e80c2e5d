//! Hand processing pipeline.
//!
//! Every inbound message flows through:
//! 1. `looks_like_hand_history()` — signature count, drops ordinary chat
//! 2. `parse()` — structured record, or an error report
//! 3. `RuleSet::validate()` — violations suppress the advice step
//! 4. `AdviceProvider::advise()` — coaching text, degraded note on failure

pub mod processor;
pub mod types;

pub use processor::HandPipeline;
pub use types::{Outcome, Reply};
