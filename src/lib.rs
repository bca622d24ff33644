//! Branching survey graph engine.
//!
//! Questions and answers are vertices; each placement of a vertex in the
//! survey is an occurrence in a nested-set indexed forest. The link engine
//! edits that forest (cloning sub-trees so converging paths stay distinct),
//! and the validator checks respondents' recorded answers against it.

pub mod analysis;
pub mod config;
pub mod display;
pub mod error;
pub mod link;
pub mod shared;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::EngineConfig;
pub use display::{outline, MapOptions, TreeMap};
pub use error::{Result, SurveyError};
pub use shared::SharedSurvey;
pub use store::{
    AnswerKind, Edge, InMemoryStore, OccurrenceId, PendingChanges, RecordedAnswer, Respondent, RespondentId,
    RuleKind, Survey, SurveyId, SurveySnapshot, SurveyStore, VertexId, VertexKind,
};
pub use validation::{validate_respondents, ReasonCode, ValidationErrors, Validator};
