//! A survey shared between threads. Structural edits take the write lock,
//! validation and reads take the read lock, so validation never observes a
//! half-applied edit.
use crate::error::Result;
use crate::store::{Respondent, Survey};
use crate::validation::{validate_respondents, Validator};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SharedSurvey {
    inner: Arc<RwLock<Survey>>,
}

impl SharedSurvey {
    pub fn new(survey: Survey) -> Self {
        Self { inner: Arc::new(RwLock::new(survey)) }
    }

    /// Runs a structural edit under the write lock.
    pub fn edit<T>(&self, op: impl FnOnce(&mut Survey) -> Result<T>) -> Result<T> {
        op(&mut self.inner.write())
    }

    pub fn read<T>(&self, op: impl FnOnce(&Survey) -> T) -> T {
        op(&self.inner.read())
    }

    pub fn validate(&self, respondent: &mut Respondent) -> bool {
        Validator::new(&self.inner.read()).validate(respondent)
    }

    pub fn validate_all(&self, respondents: &mut [Respondent]) -> Vec<bool> {
        validate_respondents(&self.inner.read(), respondents)
    }

    /// Clones the current state, for work that should not hold the lock.
    pub fn snapshot(&self) -> Survey {
        self.inner.read().clone()
    }
}
