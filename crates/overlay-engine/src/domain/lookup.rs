//! Lookup value objects: questions, answers, formulas and the history
//! selector that bounds chain-of-custody rehydration.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use overlay_primitives::Outpoint;

/// A query addressed to a named lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupQuestion {
    pub service: String,
    pub query: serde_json::Value,
}

/// One hydrated output in an output-list answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputListItem {
    pub beef: Vec<u8>,
    pub output_index: u32,
}

/// A fully-formed lookup answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LookupAnswer {
    Freeform { data: serde_json::Value },
    OutputList { outputs: Vec<OutputListItem> },
}

/// Decides how deep history rehydration descends through ancestors.
#[derive(Clone, Default)]
pub enum HistorySelector {
    /// No rehydration; the output is returned as stored.
    #[default]
    None,
    /// Descend while the current depth does not exceed the bound.
    Depth(u32),
    /// Descend while the predicate holds for `(beef, output_index, depth)`.
    Predicate(HistoryPredicate),
}

/// Caller-supplied descent predicate.
pub type HistoryPredicate = Arc<dyn Fn(&[u8], u32, u32) -> bool + Send + Sync>;

impl HistorySelector {
    /// Whether to descend past the node currently being hydrated.
    pub fn descend(&self, beef: &[u8], output_index: u32, depth: u32) -> bool {
        match self {
            Self::None => false,
            Self::Depth(bound) => depth <= *bound,
            Self::Predicate(predicate) => predicate(beef, output_index, depth),
        }
    }
}

impl fmt::Debug for HistorySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("HistorySelector::None"),
            Self::Depth(bound) => write!(f, "HistorySelector::Depth({bound})"),
            Self::Predicate(_) => f.write_str("HistorySelector::Predicate(..)"),
        }
    }
}

/// One output a lookup service wants hydrated into an answer.
#[derive(Debug, Clone)]
pub struct FormulaEntry {
    pub outpoint: Outpoint,
    pub history: HistorySelector,
}

/// A lookup service's instruction set for the engine: which unspent
/// outputs to fetch and how much of their history to embed.
pub type LookupFormula = Vec<FormulaEntry>;

/// What a lookup service hands back: a finished answer or a formula the
/// engine must hydrate.
#[derive(Debug, Clone)]
pub enum LookupResolution {
    Answer(LookupAnswer),
    Formula(LookupFormula),
}
