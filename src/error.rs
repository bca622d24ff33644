//! Structural errors raised by the link engine and the persistence seam.
use crate::store::{AnswerKind, OccurrenceId, VertexId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Vertex {0:?} does not belong to this survey")]
    UnknownVertex(VertexId),
    #[error("Occurrence {0:?} does not exist")]
    UnknownOccurrence(OccurrenceId),
    #[error("Vertex {0:?} has already been linked")]
    AlreadyLinked(VertexId),
    #[error("Answer {0:?} needs a question before it can be linked")]
    MissingQuestion(VertexId),
    #[error("Cannot mix answer types on question {question:?}: has {expected:?}, got {found:?}")]
    MixedAnswerType {
        question: VertexId,
        expected: AnswerKind,
        found: AnswerKind,
    },
    #[error("Infinite loop detected below vertex {0:?}")]
    InfiniteLoop(VertexId),
    #[error("Walk exceeded the configured depth limit of {limit}")]
    DepthLimit { limit: usize },
    #[error("Malformed forest: {0}")]
    MalformedForest(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SurveyError>;
