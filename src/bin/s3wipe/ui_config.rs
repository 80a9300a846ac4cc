// Decides what the CLI prints on top of the tracing output.

use s3wipe_rs::config::Config;

/// Whether to print the final result summary line.
///
/// Returns `false` when:
/// - tracing is off (`-qqq`) or below Info (`-q`, quiet mode)
/// - JSON logging is enabled (the line would corrupt JSON output)
pub fn is_show_result_needed(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    if tracing_config.tracing_level < log::Level::Info {
        return false;
    }

    !tracing_config.json_tracing
}
