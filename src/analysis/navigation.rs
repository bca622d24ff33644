//! Vertex-level navigation over the occurrence forest.
use crate::store::{RuleKind, Survey, VertexId};
use std::collections::BTreeSet;

impl Survey {
    /// Answer vertices hanging directly below any occurrence of `vertex`.
    fn answer_children(&self, vertex: VertexId) -> Vec<VertexId> {
        let mut out = Vec::new();
        for occ in self.forest.occurrences_of(vertex) {
            for &child in self.forest.children(occ) {
                let child_vertex = self.forest.vertex_of(child);
                if self.is_answer(child_vertex) && !out.contains(&child_vertex) {
                    out.push(child_vertex);
                }
            }
        }
        out
    }

    /// Every answer vertex that follows `vertex` through answer occurrences,
    /// in pre-order. For a chained question this is the chain, in order.
    pub fn answers(&self, vertex: VertexId) -> Vec<VertexId> {
        let mut list = Vec::new();
        let mut stack: Vec<VertexId> = self.answer_children(vertex).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if list.contains(&current) {
                continue;
            }
            list.push(current);
            stack.extend(self.answer_children(current).into_iter().rev());
        }
        list
    }

    /// The question preceding `answer`, walking up through chained answers.
    pub fn question(&self, answer: VertexId) -> Option<VertexId> {
        let mut current = answer;
        let mut seen = BTreeSet::new();
        while seen.insert(current) {
            let parent = self
                .forest
                .occurrences_of(current)
                .into_iter()
                .find_map(|occ| self.forest.parent(occ))?;
            let parent_vertex = self.forest.vertex_of(parent);
            if !self.is_answer(parent_vertex) {
                return Some(parent_vertex);
            }
            current = parent_vertex;
        }
        None
    }

    /// The question that follows `answer`, walking down through chained answers.
    pub fn next_question(&self, answer: VertexId) -> Option<VertexId> {
        let mut current = answer;
        let mut seen = BTreeSet::new();
        'walk: while seen.insert(current) {
            for occ in self.forest.occurrences_of(current) {
                if let Some(&child) = self.forest.children(occ).first() {
                    let child_vertex = self.forest.vertex_of(child);
                    if self.is_question(child_vertex) {
                        return Some(child_vertex);
                    }
                    current = child_vertex;
                    continue 'walk;
                }
            }
            return None;
        }
        None
    }

    /// Questions following `question`, directly or through its answers.
    pub fn next_questions(&self, question: VertexId) -> Vec<VertexId> {
        let mut list = Vec::new();
        let Some(first) = self.forest.occurrences_of(question).into_iter().next() else {
            return list;
        };
        for &child in self.forest.children(first) {
            let child_vertex = self.forest.vertex_of(child);
            let next = if self.is_question(child_vertex) {
                Some(child_vertex)
            } else {
                self.next_question(child_vertex)
            };
            if let Some(next) = next.filter(|n| !list.contains(n)) {
                list.push(next);
            }
        }
        list
    }

    /// A question is required when a presence rule is attached.
    pub fn is_required(&self, question: VertexId) -> bool {
        self.rules_for(question).any(|r| r.kind == RuleKind::Presence)
    }

    /// Placed somewhere, but never as a root.
    pub fn is_hidden(&self, question: VertexId) -> bool {
        let occurrences = self.forest.occurrences_of(question);
        !occurrences.is_empty() && occurrences.iter().all(|&o| self.forest.node(o).depth != 0)
    }

    /// Questions that are unplaced or placed at least once as a root.
    pub fn visible_questions(&self) -> Vec<VertexId> {
        self.vertices()
            .filter(|v| v.kind.is_question() && !self.is_hidden(v.id))
            .map(|v| v.id)
            .collect()
    }
}
