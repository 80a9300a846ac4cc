/*!
# Overview
s3wipe-rs is an extremely fast Amazon S3 bucket wiper.
It deletes every object version and delete marker in a bucket and then
deletes the bucket itself.

## How it works
- **Parallel listing**: one listing worker per top-level prefix, plus one for
  keys at the bucket root
- **Batch deletion**: twice as many deletion workers, each sending
  DeleteObjects requests of up to 1000 versions
- **Bounded memory**: listers and deleters meet at a bounded work queue
- **Safe teardown**: DeleteBucket is only issued once every listed version has
  been handled, and never after cancellation

## As a Library
The s3wipe CLI is a thin wrapper over the s3wipe-rs library.

Example usage
=============

```toml
[dependencies]
s3wipe-rs = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3wipe_rs::config::args::parse_from_args;
use s3wipe_rs::{Config, WipePipeline, create_pipeline_cancellation_token};

#[tokio::main]
async fn main() {
    let args = vec!["s3wipe", "s3://my-bucket", "--batch-size", "1000"];

    let parsed_args = parse_from_args(args).unwrap();
    let config = Config::try_from(parsed_args).unwrap();
    let cancellation_token = create_pipeline_cancellation_token();
    let mut pipeline = WipePipeline::new(config, cancellation_token).await;
    pipeline.run().await;

    if pipeline.has_error() {
        eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
    }
}
```
*/

#![allow(clippy::collapsible_if)]

pub mod config;
pub mod counters;
pub mod deleter;
pub mod lister;
pub mod pipeline;
pub mod queue;
pub mod reporter;
pub mod stage;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use config::args::CLIArgs;
pub use counters::ProgressSnapshot;
pub use pipeline::WipePipeline;
pub use types::error::{S3WipeError, exit_code_from_error, is_cancelled_error};
pub use types::token::{PipelineCancellationToken, create_pipeline_cancellation_token};
