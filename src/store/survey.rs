//! survey.rs
//! The aggregate for one questionnaire: vertices, their rules and the
//! occurrence forest, plus the bookkeeping needed to report pending changes.

use super::changes::{ChangeLog, PendingChanges};
use super::forest::Forest;
use super::persist::SurveySnapshot;
use super::types::*;
use crate::analysis::topology;
use crate::config::EngineConfig;
use crate::error::{Result, SurveyError};
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A `{source, target}` vertex pair derived from a parent -> child occurrence link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
}

#[derive(Debug, Clone)]
pub struct Survey {
    id: SurveyId,
    config: EngineConfig,
    pub(crate) vertices: BTreeMap<VertexId, Vertex>,
    pub(crate) rules: BTreeMap<RuleId, ValidationRule>,
    pub(crate) forest: Forest,
    changes: ChangeLog,
    persisted_vertices: BTreeSet<VertexId>,
    persisted_rules: BTreeSet<RuleId>,
    next_vertex: u32,
    next_rule: u32,
}

impl Survey {
    pub fn new(id: SurveyId) -> Self {
        Self::with_config(id, EngineConfig::default())
    }

    pub fn with_config(id: SurveyId, config: EngineConfig) -> Self {
        Self {
            id,
            config,
            vertices: BTreeMap::new(),
            rules: BTreeMap::new(),
            forest: Forest::new(),
            changes: ChangeLog::default(),
            persisted_vertices: BTreeSet::new(),
            persisted_rules: BTreeSet::new(),
            next_vertex: 0,
            next_rule: 0,
        }
    }

    pub fn id(&self) -> SurveyId { self.id }
    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn forest(&self) -> &Forest { &self.forest }

    // --- Vertices ---

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> { self.vertices.get(&id) }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> { self.vertices.values() }

    pub fn kind_of(&self, id: VertexId) -> Option<VertexKind> {
        self.vertices.get(&id).map(|v| v.kind)
    }

    pub(crate) fn is_question(&self, id: VertexId) -> bool {
        self.kind_of(id).is_some_and(|k| k.is_question())
    }

    pub(crate) fn is_answer(&self, id: VertexId) -> bool {
        self.kind_of(id).is_some_and(|k| k.is_answer())
    }

    pub(crate) fn require_vertex(&self, id: VertexId) -> Result<&Vertex> {
        self.vertices.get(&id).ok_or(SurveyError::UnknownVertex(id))
    }

    pub(crate) fn require_question(&self, id: VertexId) -> Result<()> {
        if self.require_vertex(id)?.kind.is_question() {
            Ok(())
        } else {
            Err(SurveyError::InvalidArgument(format!("vertex {:?} is not a question", id)))
        }
    }

    pub(crate) fn require_answer(&self, id: VertexId) -> Result<AnswerKind> {
        self.require_vertex(id)?
            .kind
            .answer_kind()
            .ok_or_else(|| SurveyError::InvalidArgument(format!("vertex {:?} is not an answer", id)))
    }

    pub fn add_vertex(&mut self, kind: VertexKind, text: impl Into<String>) -> VertexId {
        let id = VertexId(self.next_vertex);
        self.next_vertex += 1;
        self.vertices.insert(id, Vertex { id, kind, text: text.into(), survey: self.id });
        self.changes.touch_vertex(id);
        id
    }

    pub fn add_question(&mut self, text: impl Into<String>) -> VertexId {
        self.add_vertex(VertexKind::Question, text)
    }

    pub fn add_answer(&mut self, kind: AnswerKind, text: impl Into<String>) -> VertexId {
        self.add_vertex(VertexKind::Answer(kind), text)
    }

    pub fn set_text(&mut self, id: VertexId, text: impl Into<String>) -> Result<()> {
        let vertex = self.vertices.get_mut(&id).ok_or(SurveyError::UnknownVertex(id))?;
        vertex.text = text.into();
        self.changes.touch_vertex(id);
        Ok(())
    }

    pub(crate) fn set_kind(&mut self, id: VertexId, kind: VertexKind) {
        if let Some(vertex) = self.vertices.get_mut(&id) {
            vertex.kind = kind;
            self.changes.touch_vertex(id);
        }
    }

    /// Drops a vertex and its rules. Occurrences are the caller's concern.
    pub(crate) fn drop_vertex(&mut self, id: VertexId) {
        if self.vertices.remove(&id).is_some() {
            self.changes.delete_vertex(id, self.persisted_vertices.remove(&id));
        }
        let rule_ids: Vec<RuleId> = self.rules_for(id).map(|r| r.id).collect();
        for rule in rule_ids {
            self.rules.remove(&rule);
            self.changes.delete_rule(rule, self.persisted_rules.remove(&rule));
        }
    }

    // --- Rules ---

    pub fn add_rule(&mut self, vertex: VertexId, kind: RuleKind) -> Result<RuleId> {
        self.require_vertex(vertex)?;
        let id = RuleId(self.next_rule);
        self.next_rule += 1;
        self.rules.insert(id, ValidationRule { id, vertex, kind });
        self.changes.touch_rule(id);
        Ok(id)
    }

    pub fn remove_rule(&mut self, id: RuleId) -> Result<()> {
        self.rules
            .remove(&id)
            .ok_or_else(|| SurveyError::InvalidArgument(format!("rule {:?} does not exist", id)))?;
        self.changes.delete_rule(id, self.persisted_rules.remove(&id));
        Ok(())
    }

    pub fn rules_for(&self, vertex: VertexId) -> impl Iterator<Item = &ValidationRule> {
        self.rules.values().filter(move |r| r.vertex == vertex)
    }

    // --- Occurrences ---

    pub fn occurrences_of(&self, vertex: VertexId) -> Vec<OccurrenceId> {
        self.forest.occurrences_of(vertex)
    }

    /// Runs a structural edit atomically: on error every change made by `op`
    /// is discarded, on success nested-set bounds are refreshed.
    pub(crate) fn transact<T>(&mut self, name: &'static str, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.clone();
        match op(self) {
            Ok(value) => {
                topology::renumber(&mut self.forest);
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(operation = name, error = %err, "structural edit rolled back");
                *self = checkpoint;
                Err(err)
            }
        }
    }

    // --- Edges ---

    /// Vertex-level graph of every live parent -> child occurrence link.
    pub fn vertex_graph(&self) -> DiGraphMap<VertexId, ()> {
        let mut graph = DiGraphMap::new();
        for id in self.forest.live_ids() {
            if let Some(parent) = self.forest.parent(id) {
                graph.add_edge(self.forest.vertex_of(parent), self.forest.vertex_of(id), ());
            }
        }
        graph
    }

    /// Deduplicated `{source, target}` vertex pairs.
    pub fn edges(&self) -> Vec<Edge> {
        self.vertex_graph()
            .all_edges()
            .map(|(source, target, _)| Edge { source, target })
            .collect()
    }

    // --- Persistence ---

    pub fn from_snapshot(snapshot: SurveySnapshot, config: EngineConfig) -> Result<Self> {
        let mut survey = Self::with_config(snapshot.id, config);

        for vertex in snapshot.vertices {
            if vertex.survey != snapshot.id {
                return Err(SurveyError::MalformedForest(format!(
                    "vertex {:?} belongs to survey {:?}",
                    vertex.id, vertex.survey
                )));
            }
            survey.next_vertex = survey.next_vertex.max(vertex.id.0 + 1);
            survey.persisted_vertices.insert(vertex.id);
            survey.vertices.insert(vertex.id, vertex);
        }
        for rule in snapshot.rules {
            if !survey.vertices.contains_key(&rule.vertex) {
                return Err(SurveyError::UnknownVertex(rule.vertex));
            }
            survey.next_rule = survey.next_rule.max(rule.id.0 + 1);
            survey.persisted_rules.insert(rule.id);
            survey.rules.insert(rule.id, rule);
        }

        let vertices = &survey.vertices;
        survey.forest = Forest::from_records(snapshot.occurrences, |v| vertices.contains_key(&v))?;
        if survey.config.verify_on_load {
            topology::verify(&survey.forest, survey.config.max_depth)?;
        }
        tracing::debug!(
            survey = survey.id.0,
            vertices = survey.vertices.len(),
            occurrences = survey.forest.live_count(),
            "survey loaded"
        );
        Ok(survey)
    }

    pub fn snapshot(&self) -> SurveySnapshot {
        SurveySnapshot {
            id: self.id,
            vertices: self.vertices.values().cloned().collect(),
            occurrences: self.forest.records(),
            rules: self.rules.values().cloned().collect(),
        }
    }

    pub fn pending_changes(&self) -> PendingChanges {
        let (occurrences_to_upsert, occurrences_to_delete) = self.forest.pending();
        PendingChanges {
            vertices_to_upsert: self
                .changes
                .vertices_dirty
                .iter()
                .filter_map(|id| self.vertices.get(id).cloned())
                .collect(),
            vertices_to_delete: self.changes.vertices_deleted.iter().copied().collect(),
            rules_to_upsert: self
                .changes
                .rules_dirty
                .iter()
                .filter_map(|id| self.rules.get(id).cloned())
                .collect(),
            rules_to_delete: self.changes.rules_deleted.iter().copied().collect(),
            occurrences_to_upsert,
            occurrences_to_delete,
        }
    }

    /// Returns the pending changes and treats them as committed.
    pub fn take_pending_changes(&mut self) -> PendingChanges {
        let changes = self.pending_changes();
        self.forest.take_pending();
        self.persisted_vertices.extend(changes.vertices_to_upsert.iter().map(|v| v.id));
        self.persisted_rules.extend(changes.rules_to_upsert.iter().map(|r| r.id));
        self.changes.clear();
        changes
    }
}
