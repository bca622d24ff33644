//! Survey data: typed ids, vertices, rules, respondents and the occurrence forest.
pub mod changes;
pub mod forest;
pub mod persist;
pub mod survey;
pub mod types;

pub use changes::PendingChanges;
pub use forest::{Forest, Occurrence, OccurrenceRecord};
pub use persist::{InMemoryStore, SurveySnapshot, SurveyStore};
pub use survey::{Edge, Survey};
pub use types::*;
