//! Flag evaluators.

mod evaluator;
mod json;

pub use evaluator::{Evaluator, Reason, Resolution, ValueKind};
pub use json::{Flag, FlagState, JsonEvaluator};
