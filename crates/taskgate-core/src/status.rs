//! Dispatcher state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// State of one request inside the dispatcher.
///
/// `Received → Validating → Classifying → ExtractingParameters → Resolving →
/// Executing → Completed`, with `Failed(kind)` reachable from every
/// non-terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "kind", rename_all = "snake_case")]
pub enum DispatchState {
    /// Request accepted, nothing checked yet.
    #[default]
    Received,
    /// Checking the description.
    Validating,
    /// Waiting on the classifier.
    Classifying,
    /// Waiting on the parameter extractor.
    ExtractingParameters,
    /// Looking up the executor for the category.
    Resolving,
    /// Executor running.
    Executing,
    /// Executor succeeded.
    Completed,
    /// Request failed with the given kind.
    Failed(ErrorKind),
}

impl DispatchState {
    /// Returns true if the request is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// Returns true if the request is still active (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: DispatchState) -> bool {
        use DispatchState::*;

        match (self, next) {
            (Completed | Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Received, Validating)
            | (Validating, Classifying)
            | (Classifying, ExtractingParameters)
            | (ExtractingParameters, Resolving)
            | (Resolving, Executing)
            | (Executing, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("received"),
            Self::Validating => f.write_str("validating"),
            Self::Classifying => f.write_str("classifying"),
            Self::ExtractingParameters => f.write_str("extracting_parameters"),
            Self::Resolving => f.write_str("resolving"),
            Self::Executing => f.write_str("executing"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}
