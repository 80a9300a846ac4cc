/// A cancellation token used to signal pipeline shutdown.
///
/// Pass the token to [`WipePipeline::new`](crate::WipePipeline::new) and call
/// [`cancel()`](tokio_util::sync::CancellationToken::cancel) on it (e.g. from
/// a Ctrl+C handler) to stop a running pipeline. A cancelled pipeline never
/// deletes the bucket.
pub type PipelineCancellationToken = tokio_util::sync::CancellationToken;

/// Create a new [`PipelineCancellationToken`].
///
/// # Example
///
/// ```
/// use s3wipe_rs::create_pipeline_cancellation_token;
///
/// let token = create_pipeline_cancellation_token();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
pub fn create_pipeline_cancellation_token() -> PipelineCancellationToken {
    tokio_util::sync::CancellationToken::new()
}
