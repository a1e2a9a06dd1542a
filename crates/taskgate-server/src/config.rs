//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use taskgate_llm::{LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use taskgate_sandbox::{SandboxConfig, DEFAULT_DATA_DIR, DEFAULT_MAX_FILE_SIZE};

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Filesystem sandbox.
    pub sandbox: SandboxConfig,

    /// Model collaborator.
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            sandbox: SandboxConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

/// Command-line arguments. Every flag falls back to an environment variable.
#[derive(Debug, Parser)]
#[command(name = "taskgate-server")]
#[command(about = "Natural-language task gateway", long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "TASKGATE_BIND", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// Comma-separated directories file access is confined to; the first is
    /// the primary root
    #[arg(
        long,
        env = "TASKGATE_ALLOWED_ROOTS",
        value_delimiter = ',',
        default_value = DEFAULT_DATA_DIR
    )]
    pub allowed_roots: Vec<PathBuf>,

    /// Largest file in bytes that may be read or written
    #[arg(long, env = "TASKGATE_MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// OpenAI-compatible base URL
    #[arg(long, env = "TASKGATE_LLM_URL", default_value = DEFAULT_BASE_URL)]
    pub llm_url: String,

    /// Model identifier
    #[arg(long, env = "TASKGATE_LLM_MODEL", default_value = DEFAULT_MODEL)]
    pub llm_model: String,

    /// Bearer token for the model endpoint
    #[arg(long, env = "AIPROXY_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Timeout for a single model call, in seconds
    #[arg(long, env = "TASKGATE_LLM_TIMEOUT_SECS", default_value_t = 30)]
    pub llm_timeout_secs: u64,

    /// Retries of a transient model failure
    #[arg(long, env = "TASKGATE_LLM_MAX_RETRIES", default_value_t = 2)]
    pub llm_max_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "TASKGATE_LLM_RETRY_DELAY_MS", default_value_t = 500)]
    pub llm_retry_delay_ms: u64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let mut roots = args.allowed_roots.into_iter();
        let primary = roots
            .next()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let sandbox = roots
            .fold(SandboxConfig::new(primary), |config, root| config.with_root(root))
            .with_max_file_size(args.max_file_size);

        let mut llm = LlmConfig::default()
            .with_base_url(args.llm_url)
            .with_model(args.llm_model);
        llm.api_token = args.api_token;
        llm.timeout = Duration::from_secs(args.llm_timeout_secs);
        llm.max_retries = args.llm_max_retries;
        llm.retry_base_delay = Duration::from_millis(args.llm_retry_delay_ms);

        Self {
            bind_addr: args.bind,
            sandbox,
            llm,
        }
    }
}
