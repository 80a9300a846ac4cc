use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::{debug, error, info, trace};

use s3wipe_rs::config::Config;
use s3wipe_rs::{
    CLIArgs, WipePipeline, create_pipeline_cancellation_token, exit_code_from_error,
    is_cancelled_error,
};

mod ctrl_c_handler;
pub mod indicator;
mod tracing_init;
pub mod ui_config;

const EXIT_CODE_ERROR: i32 = 1;
const EXIT_CODE_WARNING: i32 = 3;

/// s3wipe - Extremely fast Amazon S3 bucket wiper.
///
/// This binary is a thin wrapper over the s3wipe-rs library.
#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "s3wipe",
            &mut std::io::stdout(),
        );

        return Ok(());
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    run(config).await
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn load_config_exit_if_err() -> Config {
    match Config::try_from(CLIArgs::parse()) {
        Ok(config) => config,
        Err(error_message) => {
            clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit()
        }
    }
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    tracing_init::init_tracing(tracing_config);
    true
}

async fn run(config: Config) -> Result<()> {
    let exit_code;

    {
        let cancellation_token = create_pipeline_cancellation_token();

        ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

        let start_time = tokio::time::Instant::now();
        debug!("wipe pipeline start.");

        let mut pipeline = WipePipeline::new(config.clone(), cancellation_token.clone()).await;
        pipeline.run().await;

        let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());

        indicator::show_summary(
            pipeline.progress(),
            start_time.elapsed(),
            pipeline.is_bucket_deleted(),
            ui_config::is_show_result_needed(&config),
        );

        if pipeline.has_error() {
            let errors = pipeline.get_errors_and_consume().unwrap_or_default();
            if errors.iter().any(is_cancelled_error) {
                info!(
                    duration_sec = duration_sec,
                    "s3wipe has been cancelled. bucket was not deleted."
                );
            } else {
                for err in &errors {
                    error!("{:#}", err);
                }
                error!(duration_sec = duration_sec, "s3wipe failed.");
            }
            exit_code = exit_code_for_errors(&errors);
        } else if pipeline.has_warning() {
            exit_code = EXIT_CODE_WARNING;
        } else {
            debug!(duration_sec = duration_sec, "s3wipe has been completed.");
            exit_code = 0;
        }
    }

    match exit_code {
        0 => Ok(()),
        EXIT_CODE_ERROR => Err(anyhow!("s3wipe failed.")),
        code => std::process::exit(code),
    }
}

/// Exit code for a failed run: 0 on user cancellation, otherwise the code of the first error.
fn exit_code_for_errors(errors: &[anyhow::Error]) -> i32 {
    if errors.iter().any(is_cancelled_error) {
        return 0;
    }
    errors.first().map_or(EXIT_CODE_ERROR, exit_code_from_error)
}
