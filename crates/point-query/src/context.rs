//! Per-query execution context.

use crate::error::QueryError;
use std::time::{Duration, Instant};

/// Deadline carried by a query.
///
/// The reader checks the deadline before each splitter call and aborts with
/// [`QueryError::Cancelled`]; partial results are never returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryContext {
    deadline: Option<Instant>,
}

impl QueryContext {
    /// A context that never cancels.
    pub fn unbounded() -> Self {
        Self { deadline: None }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Fail if the deadline has passed.
    pub fn check(&self) -> Result<(), QueryError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(QueryError::Cancelled),
            _ => Ok(()),
        }
    }
}
