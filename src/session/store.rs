use std::sync::Arc;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::models::{Criteria, CriteriaUpdate};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CriteriaError {
    #[error("Invalid criteria: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Current criteria plus the version of the last accepted update
///
/// Each accepted update swaps in a fresh `Arc<Criteria>`, so snapshots
/// handed out earlier never change under their holder.
#[derive(Debug, Clone)]
pub struct CriteriaStore {
    current: Arc<Criteria>,
    version: u64,
}

impl CriteriaStore {
    pub fn new(initial: Criteria) -> Result<Self, CriteriaError> {
        initial.validate()?;
        Ok(Self {
            current: Arc::new(initial),
            version: 0,
        })
    }

    pub fn current(&self) -> Arc<Criteria> {
        Arc::clone(&self.current)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Merge `update` into the current criteria
    ///
    /// Invalid results are rejected and leave both criteria and version
    /// untouched.
    pub fn apply(&mut self, update: &CriteriaUpdate) -> Result<u64, CriteriaError> {
        let next = self.current.merged(update);
        next.validate()?;

        self.current = Arc::new(next);
        self.version += 1;

        Ok(self.version)
    }
}

impl Default for CriteriaStore {
    fn default() -> Self {
        Self {
            current: Arc::new(Criteria::default()),
            version: 0,
        }
    }
}
