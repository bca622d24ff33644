//! Kind-specific predicates of the vertex model.
use super::topology;
use crate::store::{AnswerKind, Respondent, Survey, ValueShape, VertexId, VertexKind};
use crate::validation::rules::leading_int;

impl Survey {
    /// Whether the respondent's first recorded value for `vertex` counts as
    /// answered for the vertex's kind.
    pub fn is_answered_for(&self, vertex: VertexId, respondent: &Respondent) -> bool {
        let (Some(kind), Some(answer)) = (self.kind_of(vertex), respondent.answer_for(vertex)) else {
            return false;
        };
        (kind.capabilities().answered)(&answer.value)
    }

    /// Whether `value` has the shape the vertex kind accepts. Attached rules are
    /// checked separately.
    pub fn accepts_value(&self, vertex: VertexId, value: &str) -> bool {
        let Some(kind) = self.kind_of(vertex) else { return false };
        match kind.capabilities().shape {
            ValueShape::Any => true,
            ValueShape::BooleanLiteral => value == "true" || value == "false",
            ValueShape::Rank => {
                let blank = value.is_empty();
                let digits = blank || value.bytes().all(|b| b.is_ascii_digit());
                let rank = leading_int(value);
                digits && (blank || rank >= 1) && rank <= self.max_rank(vertex) as i64
            }
        }
    }

    /// `1 +` the rank answers chained above and below the vertex, taking the
    /// longest chain over all of its occurrences.
    pub fn max_rank(&self, vertex: VertexId) -> usize {
        let is_rank = |v: VertexId| self.kind_of(v) == Some(VertexKind::Answer(AnswerKind::Rank));
        let longest = self
            .forest
            .occurrences_of(vertex)
            .into_iter()
            .map(|occ| {
                let above = self
                    .forest
                    .parent(occ)
                    .map_or(0, |p| topology::ancestors_while(&self.forest, p, is_rank).len());
                let below = topology::descendants_while(&self.forest, occ, is_rank).len().saturating_sub(1);
                above + below
            })
            .max()
            .unwrap_or(0);
        longest + 1
    }
}
