//! Shared application state.

use std::sync::Arc;

use taskgate_agent::{Dispatcher, ExecutorRegistry};
use taskgate_llm::{ChatClient, Retrying, TextGenerator};
use taskgate_sandbox::Storage;
use tracing::info;

use crate::config::Config;
use crate::error::StartupError;
use crate::metrics::RequestMetrics;

/// Shared application state.
pub struct AppState {
    /// Runs `/run` requests.
    pub dispatcher: Dispatcher,

    /// Serves `/read` requests. Shared with the executors.
    pub storage: Arc<Storage>,

    /// Request counters.
    pub metrics: RequestMetrics,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(dispatcher: Dispatcher, storage: Arc<Storage>) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            storage,
            metrics: RequestMetrics::default(),
        })
    }

    /// Build the sandbox, the model client and the standard executors.
    pub fn from_config(config: &Config) -> Result<Arc<Self>, StartupError> {
        let storage = Arc::new(Storage::new(&config.sandbox)?);

        let client = ChatClient::new(&config.llm)?;
        info!(
            endpoint = %client.endpoint(),
            model = %config.llm.model,
            max_retries = config.llm.max_retries,
            "Model client configured"
        );
        let generator: Arc<dyn TextGenerator> =
            Arc::new(Retrying::new(client, config.llm.retry_policy()));

        let registry = Arc::new(ExecutorRegistry::standard(storage.clone()));
        Ok(Self::new(Dispatcher::new(generator, registry), storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgate_sandbox::SandboxConfig;
    use tempfile::TempDir;

    #[test]
    fn test_from_config_requires_token() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            sandbox: SandboxConfig::new(dir.path()),
            ..Config::default()
        };

        let result = AppState::from_config(&config);
        assert!(matches!(result, Err(StartupError::Llm(_))));
    }

    #[test]
    fn test_from_config_rejects_missing_root() {
        let config = Config {
            sandbox: SandboxConfig::new("/definitely/not/a/real/root/dir"),
            ..Config::default()
        };

        let result = AppState::from_config(&config);
        assert!(matches!(result, Err(StartupError::Sandbox(_))));
    }

    #[test]
    fn test_from_config_with_token() {
        let dir = TempDir::new().unwrap();
        let mut config = Config {
            sandbox: SandboxConfig::new(dir.path()),
            ..Config::default()
        };
        config.llm.api_token = Some("secret".to_string());

        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.dispatcher.registry().categories().len(), 11);
    }
}
