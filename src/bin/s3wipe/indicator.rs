// Final run summary.
//
// Progress lines during the run come from the library's reporter; this prints
// the one-line result after the pipeline returns.

use std::io;
use std::io::Write;
use std::time::Duration;

use indicatif::{HumanCount, HumanDuration, ProgressBar, ProgressStyle};
use s3wipe_rs::ProgressSnapshot;
use tracing::info;

/// Build the human-readable summary line.
pub fn format_summary(snapshot: &ProgressSnapshot, elapsed: Duration, bucket_deleted: bool) -> String {
    let elapsed_secs = elapsed.as_secs_f64();
    let versions_per_sec = if elapsed_secs < 1.0 {
        snapshot.deleted
    } else {
        (snapshot.deleted as f64 / elapsed_secs) as u64
    };

    format!(
        "deleted {} of {} object versions | {} versions/sec,  failed {},  bucket {},  duration {}",
        HumanCount(snapshot.deleted),
        HumanCount(snapshot.found),
        HumanCount(versions_per_sec),
        HumanCount(snapshot.failed),
        if bucket_deleted { "deleted" } else { "kept" },
        HumanDuration(elapsed),
    )
}

/// Log the structured summary and, if requested, print the summary line.
pub fn show_summary(
    snapshot: ProgressSnapshot,
    elapsed: Duration,
    bucket_deleted: bool,
    show_result: bool,
) -> String {
    info!(
        message = "wipe summary",
        found = snapshot.found,
        deleted = snapshot.deleted,
        failed = snapshot.failed,
        bucket_deleted = bucket_deleted,
        duration_sec = elapsed.as_secs_f64(),
    );

    let summary = format_summary(&snapshot, elapsed, bucket_deleted);
    if show_result {
        let progress_text = ProgressBar::new(0);
        progress_text.set_style(ProgressStyle::with_template("{msg}").unwrap());
        progress_text.finish_with_message(summary.clone());

        println!();
        let _ = io::stdout().flush();
    }

    summary
}
