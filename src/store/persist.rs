//! The seam to whatever stores surveys and respondents.
use super::changes::PendingChanges;
use super::forest::OccurrenceRecord;
use super::types::*;
use crate::config::EngineConfig;
use crate::error::{Result, SurveyError};
use crate::store::Survey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything needed to rebuild a `Survey`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveySnapshot {
    pub id: SurveyId,
    pub vertices: Vec<Vertex>,
    pub occurrences: Vec<OccurrenceRecord>,
    pub rules: Vec<ValidationRule>,
}

pub trait SurveyStore {
    fn load_survey(&self, id: SurveyId) -> Result<SurveySnapshot>;

    fn load_recorded_answers(&self, respondent: RespondentId) -> Result<Vec<(VertexId, String)>>;

    /// Applies one batch of changes atomically.
    fn commit(&mut self, id: SurveyId, changes: &PendingChanges) -> Result<()>;

    fn load(&self, id: SurveyId, config: EngineConfig) -> Result<Survey> {
        Survey::from_snapshot(self.load_survey(id)?, config)
    }

    fn load_respondent(&self, id: RespondentId) -> Result<Respondent> {
        let answers = self
            .load_recorded_answers(id)?
            .into_iter()
            .map(|(vertex, value)| RecordedAnswer::new(vertex, value))
            .collect();
        Ok(Respondent { id, answers })
    }
}

/// A `SurveyStore` backed by plain maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    surveys: HashMap<SurveyId, SurveySnapshot>,
    answers: HashMap<RespondentId, Vec<(VertexId, String)>>,
}

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert_survey(&mut self, snapshot: SurveySnapshot) {
        self.surveys.insert(snapshot.id, snapshot);
    }

    pub fn record_answer(&mut self, respondent: RespondentId, vertex: VertexId, value: impl Into<String>) {
        self.answers.entry(respondent).or_default().push((vertex, value.into()));
    }
}

fn upsert_by<T: Clone, K: PartialEq>(list: &mut Vec<T>, items: &[T], key: impl Fn(&T) -> K) {
    for item in items {
        match list.iter_mut().find(|existing| key(existing) == key(item)) {
            Some(slot) => *slot = item.clone(),
            None => list.push(item.clone()),
        }
    }
}

impl SurveyStore for InMemoryStore {
    fn load_survey(&self, id: SurveyId) -> Result<SurveySnapshot> {
        self.surveys
            .get(&id)
            .cloned()
            .ok_or_else(|| SurveyError::Store(format!("survey {:?} not found", id)))
    }

    fn load_recorded_answers(&self, respondent: RespondentId) -> Result<Vec<(VertexId, String)>> {
        Ok(self.answers.get(&respondent).cloned().unwrap_or_default())
    }

    fn commit(&mut self, id: SurveyId, changes: &PendingChanges) -> Result<()> {
        let snapshot = self.surveys.entry(id).or_insert_with(|| SurveySnapshot { id, ..Default::default() });

        upsert_by(&mut snapshot.vertices, &changes.vertices_to_upsert, |v| v.id);
        snapshot.vertices.retain(|v| !changes.vertices_to_delete.contains(&v.id));

        upsert_by(&mut snapshot.rules, &changes.rules_to_upsert, |r| r.id);
        snapshot.rules.retain(|r| !changes.rules_to_delete.contains(&r.id));

        upsert_by(&mut snapshot.occurrences, &changes.occurrences_to_upsert, |o| o.id);
        snapshot.occurrences.retain(|o| !changes.occurrences_to_delete.contains(&o.id));
        Ok(())
    }
}
