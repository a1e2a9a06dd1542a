//! Request orchestration.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use taskgate_core::{
    Category, DispatchState, ErrorKind, ExecutorResult, Payload, RequestId, TaskError,
    TaskRequest,
};
use taskgate_llm::TextGenerator;

use crate::classifier::TaskClassifier;
use crate::extractor::ParameterExtractor;
use crate::failure::TaskFailure;
use crate::registry::ExecutorRegistry;

/// Terminal outcome of one dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub request_id: RequestId,
    /// Set once classification succeeded.
    pub category: Option<Category>,
    /// Every state visited, starting with `Received`, ending in a terminal state.
    pub trail: Vec<DispatchState>,
    pub result: Result<Payload, TaskFailure>,
}

impl DispatchOutcome {
    /// The terminal state.
    pub fn state(&self) -> DispatchState {
        self.trail.last().copied().unwrap_or_default()
    }

    /// Returns true if the request completed.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether the request passed through `state`.
    pub fn visited(&self, state: DispatchState) -> bool {
        self.trail.contains(&state)
    }
}

/// Progress of one request through the state machine.
struct Progress {
    request_id: RequestId,
    category: Option<Category>,
    trail: Vec<DispatchState>,
}

impl Progress {
    fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            category: None,
            trail: vec![DispatchState::Received],
        }
    }

    fn current(&self) -> DispatchState {
        self.trail.last().copied().unwrap_or_default()
    }

    fn advance(&mut self, next: DispatchState) -> Result<(), TaskFailure> {
        let current = self.current();
        if !current.can_transition_to(next) {
            error!(
                request_id = %self.request_id,
                from = %current,
                to = %next,
                "Refusing illegal state transition"
            );
            return Err(TaskError::ExecutionFailure(format!(
                "illegal transition from {current} to {next}"
            ))
            .into());
        }
        debug!(request_id = %self.request_id, from = %current, to = %next, "State transition");
        self.trail.push(next);
        Ok(())
    }

    fn fail(&mut self, kind: ErrorKind) {
        if self.current().is_active() {
            self.trail.push(DispatchState::Failed(kind));
        }
    }
}

/// Drives a request from description to terminal outcome.
///
/// One deterministic pass per request: the pipeline as a whole is never
/// retried. Shares nothing mutable between requests.
#[derive(Clone)]
pub struct Dispatcher {
    classifier: TaskClassifier,
    extractor: ParameterExtractor,
    registry: Arc<ExecutorRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher. Both model stages use `generator`.
    pub fn new(generator: Arc<dyn TextGenerator>, registry: Arc<ExecutorRegistry>) -> Self {
        Self {
            classifier: TaskClassifier::new(generator.clone()),
            extractor: ParameterExtractor::new(generator),
            registry,
        }
    }

    /// The executor registry.
    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Run one request to completion.
    pub async fn dispatch(&self, description: impl Into<String>) -> DispatchOutcome {
        let mut progress = Progress::new(RequestId::generate());
        let result = self.run(&mut progress, description.into()).await;

        match &result {
            Ok(_) => info!(
                request_id = %progress.request_id,
                category = ?progress.category,
                "Task completed"
            ),
            Err(failure) => {
                progress.fail(failure.kind);
                warn!(
                    request_id = %progress.request_id,
                    category = ?progress.category,
                    kind = %failure.kind,
                    message = %failure.message,
                    "Task failed"
                );
            }
        }

        DispatchOutcome {
            request_id: progress.request_id,
            category: progress.category,
            trail: progress.trail,
            result,
        }
    }

    async fn run(&self, progress: &mut Progress, description: String) -> Result<Payload, TaskFailure> {
        progress.advance(DispatchState::Validating)?;
        let request = TaskRequest::new(description)?;

        progress.advance(DispatchState::Classifying)?;
        let category = self.classifier.classify(&request).await?;
        progress.category = Some(category);
        debug!(request_id = %progress.request_id, category = %category, "Classified");

        progress.advance(DispatchState::ExtractingParameters)?;
        let params = self.extractor.extract(&request, category).await?;

        progress.advance(DispatchState::Resolving)?;
        let executor = self.registry.lookup(category).ok_or_else(|| {
            TaskFailure::from(TaskError::UnsupportedCategory(format!(
                "{} ({}) has no executor",
                category.id(),
                category.name()
            )))
        })?;

        progress.advance(DispatchState::Executing)?;
        let result = AssertUnwindSafe(executor.execute(&params))
            .catch_unwind()
            .await
            .map_err(|_| {
                error!(request_id = %progress.request_id, category = %category, "Executor panicked");
                TaskFailure::from(TaskError::ExecutionFailure(
                    "executor terminated unexpectedly".to_string(),
                ))
            })?;

        match result {
            ExecutorResult::Success(payload) => {
                progress.advance(DispatchState::Completed)?;
                Ok(payload)
            }
            ExecutorResult::Failure(descriptor) => Err(TaskFailure::execution(descriptor)),
        }
    }
}
