//! Batch deletion using the S3 DeleteObjects API.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::types::ObjectIdentifier;
use tracing::{debug, warn};

use crate::config::Config;
use crate::storage::Storage;
use crate::types::ObjectIdentity;
use crate::types::token::PipelineCancellationToken;

use super::{DeleteResult, Deleter, FailedKey};

/// Maximum objects per batch DeleteObjects API call (S3 limit).
pub const MAX_BATCH_SIZE: usize = 1000;

/// Determines whether an S3 batch deletion error code is retryable.
///
/// Retryable errors are transient server-side issues that may succeed
/// on a subsequent attempt:
/// - `InternalError` / `ServiceUnavailable`: transient server errors
/// - `SlowDown`: throttling
/// - `RequestTimeout`: transient network/timeout
///
/// Everything else (e.g. `AccessDenied`) is permanent.
pub(crate) fn is_retryable_error_code(code: &str) -> bool {
    matches!(
        code,
        "InternalError" | "SlowDown" | "ServiceUnavailable" | "RequestTimeout"
    )
}

/// Deletes one batch with DeleteObjects, retrying what can be retried.
///
/// Per-key retryable errors are resubmitted on the next attempt. A failed
/// call resubmits every key still outstanding. After
/// `force_retry_count` extra attempts, whatever is left is reported as failed.
/// Cancellation ends the retry loop early; unsent keys are reported as failed
/// with code `Cancelled`.
pub struct BatchDeleter {
    target: Storage,
    cancellation_token: PipelineCancellationToken,
}

impl BatchDeleter {
    pub fn new(target: Storage, cancellation_token: PipelineCancellationToken) -> Self {
        Self {
            target,
            cancellation_token,
        }
    }
}

#[async_trait]
impl Deleter for BatchDeleter {
    async fn delete(&self, objects: &[ObjectIdentity], config: &Config) -> Result<DeleteResult> {
        let mut result = DeleteResult::default();

        if objects.is_empty() {
            return Ok(result);
        }

        let force_retry_count = config.force_retry_config.force_retry_count;
        let force_retry_interval =
            Duration::from_millis(config.force_retry_config.force_retry_interval_milliseconds);

        let mut outstanding: Vec<ObjectIdentity> = objects.to_vec();
        let mut last_call_error = String::new();
        let mut cancelled = false;

        for attempt in 0..=force_retry_count {
            if outstanding.is_empty() {
                break;
            }
            if attempt > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(force_retry_interval) => {}
                    _ = self.cancellation_token.cancelled() => {
                        debug!(outstanding = outstanding.len(), "batch retry cancelled.");
                        last_call_error = "cancelled before retry".to_string();
                        cancelled = true;
                        break;
                    }
                }
            }

            let identifiers: Vec<ObjectIdentifier> = outstanding
                .iter()
                .map(ObjectIdentity::to_object_identifier)
                .collect();

            debug!(
                batch_size = identifiers.len(),
                attempt = attempt + 1,
                "sending DeleteObjects batch request."
            );

            let response = match self.target.delete_objects(identifiers).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        batch_size = outstanding.len(),
                        attempt = attempt + 1,
                        max_attempts = force_retry_count + 1,
                        error = format!("{e:#}"),
                        "DeleteObjects attempt {}/{} failed.",
                        attempt + 1,
                        force_retry_count + 1,
                    );
                    last_call_error = format!("{e:#}");
                    continue;
                }
            };

            for deleted in response.deleted() {
                result.deleted.push(ObjectIdentity::new(
                    deleted.key().unwrap_or_default(),
                    deleted.version_id().map(String::from),
                ));
            }

            let mut retry = Vec::new();
            for err in response.errors() {
                let identity = ObjectIdentity::new(
                    err.key().unwrap_or("unknown"),
                    err.version_id().map(String::from),
                );
                let code = err.code().unwrap_or("unknown").to_string();
                let message = err.message().unwrap_or("no message").to_string();

                if is_retryable_error_code(&code) && attempt < force_retry_count {
                    debug!(
                        key = identity.key,
                        version_id = identity.version_id,
                        code = code,
                        "retryable DeleteObjects error, resubmitting."
                    );
                    retry.push(identity);
                    continue;
                }

                warn!(
                    key = identity.key,
                    version_id = identity.version_id,
                    code = code,
                    message = message,
                    "S3 DeleteObjects partial failure for key '{}': {} ({}).",
                    identity.key,
                    code,
                    message,
                );
                result.failed.push(FailedKey {
                    identity,
                    error_code: code,
                    error_message: message,
                });
            }

            outstanding = retry;
            last_call_error.clear();
        }

        // Only reachable when the last attempt failed as a whole, or on cancellation.
        let error_code = if cancelled {
            "Cancelled"
        } else {
            "N/A"
        };
        for identity in outstanding {
            result.failed.push(FailedKey {
                identity,
                error_code: error_code.to_string(),
                error_message: last_call_error.clone(),
            });
        }

        debug!(
            deleted = result.deleted.len(),
            failed = result.failed.len(),
            "DeleteObjects batch completed."
        );

        Ok(result)
    }
}
