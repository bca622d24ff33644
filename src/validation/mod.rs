//! Respondent validation: rule evaluation, reason codes and the validator that
//! walks the forest for each recorded answer.
pub mod error;
pub mod rules;
pub mod validator;

pub use error::{ReasonCode, ValidationErrors};
pub use rules::RuleInput;
pub use validator::{validate_respondents, Validator};
