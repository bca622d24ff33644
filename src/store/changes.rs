use super::forest::OccurrenceRecord;
use super::types::{OccurrenceId, RuleId, ValidationRule, Vertex, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The result of a batch of structural edits, for the persistence layer to
/// commit in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingChanges {
    pub vertices_to_upsert: Vec<Vertex>,
    pub vertices_to_delete: Vec<VertexId>,
    pub rules_to_upsert: Vec<ValidationRule>,
    pub rules_to_delete: Vec<RuleId>,
    pub occurrences_to_upsert: Vec<OccurrenceRecord>,
    pub occurrences_to_delete: Vec<OccurrenceId>,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.vertices_to_upsert.is_empty()
            && self.vertices_to_delete.is_empty()
            && self.rules_to_upsert.is_empty()
            && self.rules_to_delete.is_empty()
            && self.occurrences_to_upsert.is_empty()
            && self.occurrences_to_delete.is_empty()
    }
}

/// Vertex and rule bookkeeping. Occurrence bookkeeping lives in the forest.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChangeLog {
    pub vertices_dirty: BTreeSet<VertexId>,
    pub vertices_deleted: BTreeSet<VertexId>,
    pub rules_dirty: BTreeSet<RuleId>,
    pub rules_deleted: BTreeSet<RuleId>,
}

impl ChangeLog {
    pub fn touch_vertex(&mut self, id: VertexId) {
        self.vertices_dirty.insert(id);
    }

    pub fn delete_vertex(&mut self, id: VertexId, persisted: bool) {
        self.vertices_dirty.remove(&id);
        if persisted {
            self.vertices_deleted.insert(id);
        }
    }

    pub fn touch_rule(&mut self, id: RuleId) {
        self.rules_dirty.insert(id);
    }

    pub fn delete_rule(&mut self, id: RuleId, persisted: bool) {
        self.rules_dirty.remove(&id);
        if persisted {
            self.rules_deleted.insert(id);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
