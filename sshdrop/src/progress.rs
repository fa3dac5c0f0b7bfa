//! Upload progress rendering.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use is_terminal::IsTerminal;
use sshdrop_common::{StepFailure, UploadObserver, UploadPlan, UploadReport, format_bytes};
use tracing::{info, warn};

/// Progress bar on an interactive stderr, `Uploaded i/total` log lines
/// everywhere else.
pub enum Progress {
    Bar(ProgressBar),
    Log,
}

impl Progress {
    pub fn for_stderr(quiet: bool) -> Self {
        if quiet || !std::io::stderr().is_terminal() {
            return Self::Log;
        }
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} chunks ({eta})",
        )
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self::Bar(bar)
    }
}

fn failure_line(failure: &StepFailure) -> String {
    match failure.chunk {
        Some(chunk) => format!(
            "{} (chunk {}) failed: [{}] {}",
            failure.step, chunk, failure.code, failure.message
        ),
        None => format!(
            "{} failed: [{}] {}",
            failure.step, failure.code, failure.message
        ),
    }
}

impl UploadObserver for Progress {
    fn on_start(&self, plan: &UploadPlan) {
        match self {
            Self::Bar(bar) => {
                bar.set_length(plan.chunk_count as u64);
                bar.set_message(format!(
                    "{} -> {}",
                    format_bytes(plan.source_bytes),
                    plan.dest_path
                ));
            }
            Self::Log => info!(
                chunks = plan.chunk_count,
                encoded = plan.encoded_len,
                "Uploading {} in {} chunks",
                format_bytes(plan.source_bytes),
                plan.chunk_count
            ),
        }
    }

    fn on_chunk(&self, ordinal: usize, total: usize) {
        match self {
            Self::Bar(bar) => bar.set_position(ordinal as u64),
            Self::Log => info!("Uploaded {}/{}", ordinal, total),
        }
    }

    fn on_decode(&self) {
        match self {
            Self::Bar(bar) => bar.set_message("decoding"),
            Self::Log => info!("Decoding on remote"),
        }
    }

    fn on_step_failed(&self, failure: &StepFailure) {
        let line = failure_line(failure);
        match self {
            Self::Bar(bar) => bar.println(line),
            Self::Log => warn!("{}", line),
        }
    }

    fn on_finish(&self, _report: &UploadReport) {
        if let Self::Bar(bar) = self {
            bar.finish_and_clear();
        }
    }
}
