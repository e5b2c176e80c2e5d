//! Hand history recognition, parsing, validation and reporting.
//!
//! Everything here is pure and synchronous:
//! 1. `classifier::looks_like_hand_history()` — cheap signature count
//! 2. `parser::parse()` — structured `HandRecord`
//! 3. `validator::RuleSet::validate()` — accumulated rule violations
//! 4. `formatter::render_report()` — Markdown report

pub mod classifier;
pub mod formatter;
pub mod model;
pub mod parser;
pub mod validator;

pub use classifier::looks_like_hand_history;
pub use formatter::{format_number, render_report};
pub use model::{Action, HandRecord, Player, Street};
pub use parser::parse;
pub use validator::{RuleSet, Violation};
