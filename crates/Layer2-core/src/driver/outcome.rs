//! Run outcome and failure classification

use crate::wire::Acknowledgement;
use forkrun_foundation::Error;
use std::fmt;

/// Counters for one completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tests requested by the orchestrator
    pub requested: usize,
    /// Framework descriptors received
    pub frameworks: usize,
    /// Descriptors whose implementation was not registered
    pub missing_frameworks: usize,
    /// Targets executed across all frameworks
    pub executed: usize,
    /// Targets that ended in a synthesized Error event
    pub errored: usize,
}

/// How a run ended. The process exits successfully in every case.
#[derive(Debug)]
pub enum RunOutcome {
    /// Completion sentinel sent and acknowledged
    Completed {
        summary: RunSummary,
        ack: Acknowledgement,
    },

    /// A fatal failure was reported to the orchestrator
    Reported { failure: String },

    /// Nothing could be reported; the failure went to stderr only
    Aborted { failure: String },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Completed { summary, .. } => Some(summary),
            _ => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { summary, .. } => write!(
                f,
                "completed: {} executed, {} errored, {} missing framework(s)",
                summary.executed, summary.errored, summary.missing_frameworks
            ),
            Self::Reported { failure } => write!(f, "failed (reported): {}", failure),
            Self::Aborted { failure } => write!(f, "aborted: {}", failure),
        }
    }
}

/// Failure that escaped the per-test isolation
#[derive(Debug)]
pub(crate) enum RunFailure {
    /// The channel is gone; nothing more can be sent
    Aborted(Error),

    /// Anything else; reported once before terminating
    Uncaught(anyhow::Error),
}

impl From<Error> for RunFailure {
    fn from(e: Error) -> Self {
        if e.is_channel_failure() {
            Self::Aborted(e)
        } else {
            Self::Uncaught(e.into())
        }
    }
}

impl From<anyhow::Error> for RunFailure {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<Error>() {
            Ok(inner) => inner.into(),
            Err(other) => Self::Uncaught(other),
        }
    }
}
