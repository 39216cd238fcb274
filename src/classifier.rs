//! Query intent classification
//!
//! Maps free-form user input to a rhetorical intent category that the
//! prompt builder uses to pick a tone instruction. Classification is a pure
//! total function: rules run against the trimmed, lower-cased text in fixed
//! priority order and the first match wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rhetorical category of a user query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// The user asks what something is ("what is ...", "define ...")
    Definition,
    /// The user asks for a procedure ("how ...", mentions "steps")
    HowTo,
    /// The user asks for a recap (mentions "summarize" or "summary")
    Summary,
    /// The user asks for a cause or justification (mentions "why")
    Reasoning,
    /// Anything else
    General,
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Definition => "definition",
            Self::HowTo => "how_to",
            Self::Summary => "summary",
            Self::Reasoning => "reasoning",
            Self::General => "general",
        };
        f.write_str(name)
    }
}

/// Classify a query into its [`QueryIntent`]
///
/// No normalization beyond case-folding and whitespace trim is applied.
///
/// # Examples
///
/// ```
/// use parley::classifier::{classify, QueryIntent};
///
/// assert_eq!(classify("What is gravity?"), QueryIntent::Definition);
/// assert_eq!(classify("Tell me a joke"), QueryIntent::General);
/// ```
pub fn classify(text: &str) -> QueryIntent {
    let text = text.trim().to_lowercase();

    if text.starts_with("what is") || text.starts_with("define") {
        QueryIntent::Definition
    } else if text.starts_with("how") || text.contains("steps") {
        QueryIntent::HowTo
    } else if text.contains("summarize") || text.contains("summary") {
        QueryIntent::Summary
    } else if text.contains("why") {
        QueryIntent::Reasoning
    } else {
        QueryIntent::General
    }
}
