//! Defines the error types for the validation module.
use crate::store::VertexId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The specific reason a recorded answer was found inadmissible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// The answer references a vertex that does not exist.
    InvalidNode,
    /// No chain of answered vertices leads from the answer back to a root.
    InvalidPath,
    /// Another recorded answer shares a parent with this one.
    DuplicatePath,
    /// The vertex's own checks, or those of a question above it, failed.
    Invalid,
    MustBePresent,
    MinimumLength,
    MaximumLength,
    MaximumValue,
    MinimumValue,
    MaximumAnswer,
}

/// Structured validation report: reason codes keyed by the offending vertex.
///
/// Serializes as `{"nodes": {"<vertex id>": ["CODE", ...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub nodes: BTreeMap<VertexId, Vec<ReasonCode>>,
}

impl ValidationErrors {
    pub fn new() -> Self { Self::default() }

    /// Records `code` against `vertex` unless it is already there.
    pub fn push(&mut self, vertex: VertexId, code: ReasonCode) {
        let codes = self.nodes.entry(vertex).or_default();
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn has(&self, vertex: VertexId, code: ReasonCode) -> bool {
        self.codes_for(vertex).contains(&code)
    }

    pub fn codes_for(&self, vertex: VertexId) -> &[ReasonCode] {
        self.nodes.get(&vertex).map_or(&[], |codes| codes.as_slice())
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (vertex, codes) in other.nodes {
            for code in codes {
                self.push(vertex, code);
            }
        }
    }
}
