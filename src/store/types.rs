use crate::validation::error::ValidationErrors;
use crate::validation::rules::leading_int;
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($($name:ident),* $(,)?) => {$(
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            #[inline(always)]
            pub fn index(&self) -> usize { self.0 as usize }
            pub fn new(idx: usize) -> Self { Self(idx as u32) }
        }
    )*};
}

id_type!(SurveyId, VertexId, OccurrenceId, RuleId, RespondentId);

/// The answer sub-kinds. Every kind except `Plain` forms answer chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    Plain,
    Boolean,
    Checkbox,
    Comment,
    File,
    Rank,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "answer", rename_all = "snake_case")]
pub enum VertexKind {
    Question,
    Answer(AnswerKind),
}

/// What values a vertex accepts from a respondent, beyond its attached rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Any,
    /// Exactly `"true"` or `"false"`.
    BooleanLiteral,
    /// Blank, or a positive integer no larger than the chain's rank count.
    Rank,
}

/// Per-tag behaviour table.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub chained: bool,
    /// Whether a recorded value counts as "answered".
    pub answered: fn(&str) -> bool,
    pub shape: ValueShape,
}

fn recorded(_: &str) -> bool { true }
fn boolean_literal(v: &str) -> bool { v == "true" || v == "false" }
fn non_blank(v: &str) -> bool { !v.trim().is_empty() }
fn positive_rank(v: &str) -> bool { leading_int(v) > 0 }

impl VertexKind {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            VertexKind::Question | VertexKind::Answer(AnswerKind::Plain) => Capabilities {
                chained: false,
                answered: recorded,
                shape: ValueShape::Any,
            },
            VertexKind::Answer(AnswerKind::Boolean) => Capabilities {
                chained: true,
                answered: boolean_literal,
                shape: ValueShape::BooleanLiteral,
            },
            VertexKind::Answer(AnswerKind::Rank) => Capabilities {
                chained: true,
                answered: positive_rank,
                shape: ValueShape::Rank,
            },
            VertexKind::Answer(
                AnswerKind::Checkbox | AnswerKind::Comment | AnswerKind::File | AnswerKind::Text,
            ) => Capabilities {
                chained: true,
                answered: non_blank,
                shape: ValueShape::Any,
            },
        }
    }

    pub fn is_question(&self) -> bool { matches!(self, VertexKind::Question) }
    pub fn is_answer(&self) -> bool { matches!(self, VertexKind::Answer(_)) }
    pub fn is_chained(&self) -> bool { self.capabilities().chained }

    pub fn answer_kind(&self) -> Option<AnswerKind> {
        match self {
            VertexKind::Answer(kind) => Some(*kind),
            VertexKind::Question => None,
        }
    }

    /// Stable name used by the nested-map serializer.
    pub fn type_name(&self) -> &'static str {
        match self {
            VertexKind::Question => "question",
            VertexKind::Answer(AnswerKind::Plain) => "answer",
            VertexKind::Answer(AnswerKind::Boolean) => "boolean_answer",
            VertexKind::Answer(AnswerKind::Checkbox) => "checkbox_answer",
            VertexKind::Answer(AnswerKind::Comment) => "comment_answer",
            VertexKind::Answer(AnswerKind::File) => "file_answer",
            VertexKind::Answer(AnswerKind::Rank) => "rank_answer",
            VertexKind::Answer(AnswerKind::Text) => "text_answer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    #[serde(flatten)]
    pub kind: VertexKind,
    pub text: String,
    pub survey: SurveyId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleKind {
    Presence,
    MinimumLength(usize),
    MaximumLength(usize),
    MinimumValue(f64),
    MaximumValue(f64),
    MaximumAnswerCount(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub id: RuleId,
    pub vertex: VertexId,
    #[serde(flatten)]
    pub kind: RuleKind,
}

/// One value submitted by a respondent against one vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedAnswer {
    pub vertex: VertexId,
    pub value: String,
    #[serde(default, skip_serializing_if = "ValidationErrors::is_empty")]
    pub errors: ValidationErrors,
}

impl RecordedAnswer {
    pub fn new(vertex: VertexId, value: impl Into<String>) -> Self {
        Self { vertex, value: value.into(), errors: ValidationErrors::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Respondent {
    pub id: RespondentId,
    pub answers: Vec<RecordedAnswer>,
}

impl Respondent {
    pub fn new(id: RespondentId) -> Self { Self { id, answers: Vec::new() } }

    pub fn record(&mut self, vertex: VertexId, value: impl Into<String>) -> &mut Self {
        self.answers.push(RecordedAnswer::new(vertex, value));
        self
    }

    /// The first answer recorded against `vertex`.
    pub fn answer_for(&self, vertex: VertexId) -> Option<&RecordedAnswer> {
        self.answers.iter().find(|a| a.vertex == vertex)
    }

    pub fn count_for(&self, vertex: VertexId) -> usize {
        self.answers.iter().filter(|a| a.vertex == vertex).count()
    }
}
