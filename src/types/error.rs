use anyhow::Error;
use thiserror::Error;

/// Application-level error types for s3wipe-rs.
///
/// ## Exit Codes
///
/// Each variant maps to an exit code (via `exit_code()`):
/// - 0: Cancelled by the user
/// - 1: Startup, listing, teardown and general pipeline errors
/// - 2: Configuration errors
#[derive(Error, Debug, PartialEq)]
pub enum S3WipeError {
    /// The bucket does not exist.
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// The bucket exists but cannot be accessed (permissions, region, ...).
    #[error("Bucket is not accessible: {0}")]
    BucketInaccessible(String),

    /// A listing worker failed while paginating its shard.
    #[error("Listing failed: {0}")]
    ListingFailed(String),

    /// The final DeleteBucket call was rejected, usually because objects remain.
    #[error("Bucket deletion failed: {0}")]
    BucketDeletion(String),

    /// Operation cancelled by user.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Configuration error.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// General pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl S3WipeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            S3WipeError::Cancelled => 0,
            S3WipeError::InvalidConfig(_) => 2,
            _ => 1,
        }
    }
}

/// Check if an anyhow::Error wraps a cancellation error.
pub fn is_cancelled_error(e: &Error) -> bool {
    if let Some(err) = e.downcast_ref::<S3WipeError>() {
        return *err == S3WipeError::Cancelled;
    }
    false
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<S3WipeError>() {
        return err.exit_code();
    }
    1
}
