//! Category to executor table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use taskgate_core::{Category, ExecutorResult, TaskParams};
use taskgate_sandbox::Storage;

use crate::executors::{
    ApiFetchExecutor, CountWeekdaysExecutor, CsvFilterExecutor, ExtractEmailExecutor,
    MarkdownIndexExecutor, MarkdownToHtmlExecutor, RecentLogsExecutor, SortContactsExecutor,
    SqlQueryExecutor, TicketSalesExecutor, WebScrapingExecutor,
};

/// The unit of work bound to one category.
///
/// Implementations must route every path in `params` through the sandbox,
/// report domain failures as [`ExecutorResult::Failure`] instead of
/// panicking, and be idempotent for identical parameters and sandbox state.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// The category this executor handles.
    fn category(&self) -> Category;

    /// Run the task.
    async fn execute(&self, params: &TaskParams) -> ExecutorResult;
}

/// Immutable map from category to executor, built once at startup.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<Category, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in executor, all sharing `storage`.
    pub fn standard(storage: Arc<Storage>) -> Self {
        let registry = Self::new()
            .with_executor(Arc::new(CountWeekdaysExecutor::new(storage.clone())))
            .with_executor(Arc::new(SortContactsExecutor::new(storage.clone())))
            .with_executor(Arc::new(RecentLogsExecutor::new(storage.clone())))
            .with_executor(Arc::new(MarkdownIndexExecutor::new(storage.clone())))
            .with_executor(Arc::new(ExtractEmailExecutor::new(storage.clone())))
            .with_executor(Arc::new(TicketSalesExecutor::new(storage.clone())))
            .with_executor(Arc::new(ApiFetchExecutor::new(storage.clone())))
            .with_executor(Arc::new(SqlQueryExecutor::new(storage.clone())))
            .with_executor(Arc::new(WebScrapingExecutor::new(storage.clone())))
            .with_executor(Arc::new(MarkdownToHtmlExecutor::new(storage.clone())))
            .with_executor(Arc::new(CsvFilterExecutor::new(storage)));

        info!(
            registered = registry.executors.len(),
            unregistered = Category::ALL.len() - registry.executors.len(),
            "Executor registry built"
        );
        registry
    }

    /// Builder method to register an executor under its own category.
    ///
    /// A later registration for the same category replaces the earlier one.
    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executors.insert(executor.category(), executor);
        self
    }

    /// Executor for `category`, or `None` if the category is unregistered.
    pub fn lookup(&self, category: Category) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(&category).cloned()
    }

    /// Whether `category` has an executor.
    pub fn is_registered(&self, category: Category) -> bool {
        self.executors.contains_key(&category)
    }

    /// Registered categories, in taxonomy order.
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.is_registered(*c))
            .collect()
    }
}
