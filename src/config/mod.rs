pub mod args;

use crate::types::error::S3WipeError;
use crate::types::{ClientConfigLocation, S3Credentials};

pub const DEFAULT_BATCH_SIZE: u16 = 100;
pub const MAX_BATCH_SIZE: u16 = 1000;
pub const DEFAULT_MAX_QUEUE_SIZE: u32 = 10_000;
pub const DEFAULT_MAX_KEYS: i32 = 1000;
pub const DEFAULT_PROGRESS_INTERVAL_SECONDS: u64 = 5;
pub const DEFAULT_FORCE_RETRY_COUNT: u32 = 3;
pub const DEFAULT_FORCE_RETRY_INTERVAL_MILLISECONDS: u64 = 1000;

/// Main configuration for the s3wipe-rs pipeline.
///
/// Holds everything needed to run a [`WipePipeline`](crate::WipePipeline):
/// the target bucket, AWS client settings, batching and queue sizes, the
/// application-level retry policy and the progress interval.
///
/// # Quick Start
///
/// ```
/// use s3wipe_rs::Config;
///
/// let config = Config::for_bucket("my-bucket");
/// assert_eq!(config.batch_size, 100);
/// assert_eq!(config.max_queue_size, 10_000);
/// ```
///
/// Then customize fields as needed:
///
/// ```
/// use s3wipe_rs::Config;
///
/// let mut config = Config::for_bucket("my-bucket");
/// config.batch_size = 1000;
/// config.force_retry_config.force_retry_count = 5;
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub target_client_config: Option<ClientConfig>,
    pub force_retry_config: ForceRetryConfig,
    pub tracing_config: Option<TracingConfig>,
    pub batch_size: u16,
    pub max_queue_size: u32,
    pub max_keys: i32,
    pub progress_interval_seconds: u64,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    /// Create a `Config` with the CLI defaults for the given bucket.
    ///
    /// `target_client_config` is left unset; [`WipePipeline::new`](crate::WipePipeline::new)
    /// then loads credentials and region from the environment.
    pub fn for_bucket(bucket: &str) -> Self {
        Config {
            bucket: bucket.to_string(),
            ..Config::default()
        }
    }

    /// Number of deletion workers for a given number of listing workers.
    pub fn deletion_worker_count(listing_workers: usize) -> usize {
        listing_workers.saturating_mul(2)
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// The CLI already enforces these; this covers configs built in code.
    pub fn validate(&self) -> Result<(), S3WipeError> {
        if self.max_queue_size == 0 {
            return Err(S3WipeError::InvalidConfig(
                "max_queue_size must be at least 1".to_string(),
            ));
        }
        if self.progress_interval_seconds == 0 {
            return Err(S3WipeError::InvalidConfig(
                "progress_interval_seconds must be at least 1".to_string(),
            ));
        }
        if self.max_keys < 1 {
            return Err(S3WipeError::InvalidConfig(
                "max_keys must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bucket: String::new(),
            target_client_config: None,
            force_retry_config: ForceRetryConfig::default(),
            tracing_config: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            max_keys: DEFAULT_MAX_KEYS,
            progress_interval_seconds: DEFAULT_PROGRESS_INTERVAL_SECONDS,
            auto_complete_shell: None,
        }
    }
}

impl Default for ForceRetryConfig {
    fn default() -> Self {
        ForceRetryConfig {
            force_retry_count: DEFAULT_FORCE_RETRY_COUNT,
            force_retry_interval_milliseconds: DEFAULT_FORCE_RETRY_INTERVAL_MILLISECONDS,
        }
    }
}

/// AWS S3 client configuration.
///
/// Turned into an `aws_sdk_s3::Client` by
/// [`create_client`](ClientConfig::create_client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_config_location: ClientConfigLocation,
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
}

/// Retry configuration for AWS SDK operations (exponential backoff).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

/// Timeout configuration for AWS SDK operations.
#[derive(Debug, Clone, Default)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

/// Application-level retry of failed DeleteObjects batches, on top of the
/// SDK's own retries.
#[derive(Debug, Clone, Copy)]
pub struct ForceRetryConfig {
    pub force_retry_count: u32,
    pub force_retry_interval_milliseconds: u64,
}
