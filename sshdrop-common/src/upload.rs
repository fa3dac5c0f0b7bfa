//! The upload pipeline.
//!
//! Steps run strictly in order, one remote session each:
//!
//! 1. read and encode the source
//! 2. (optional) create the destination directory
//! 3. clear the remote scratch file
//! 4. append every chunk to the scratch file
//! 5. decode into the destination and read back its size
//! 6. (optional) compare SHA-256
//! 7. (optional) remove the scratch file

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::commands;
use crate::encoding::{self, EncodedPayload};
use crate::errors::{DropError, Step};
use crate::remote::{RemoteOutput, RemoteShell};
use crate::retry::{RetryPolicy, run_with_retry};
use crate::types::{DropConfig, TransferSettings};
use crate::util::{format_bytes, truncate_for_log};

/// Per-upload settings.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub chunk_size: usize,
    pub temp_path: String,
    pub dest_path: String,
    pub create_dirs: bool,
    pub verify_checksum: bool,
    pub cleanup: bool,
    pub continue_on_error: bool,
    pub retry: RetryPolicy,
}

impl UploadOptions {
    pub fn new(dest_path: impl Into<String>) -> Self {
        Self::from_settings(&TransferSettings::default(), RetryPolicy::default(), dest_path)
    }

    pub fn from_settings(
        settings: &TransferSettings,
        retry: RetryPolicy,
        dest_path: impl Into<String>,
    ) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            temp_path: settings.temp_path.clone(),
            dest_path: dest_path.into(),
            create_dirs: settings.create_dirs,
            verify_checksum: settings.verify_checksum,
            cleanup: settings.cleanup,
            continue_on_error: settings.continue_on_error,
            retry,
        }
    }

    /// Options for `dest_path` using the `[transfer]` and `[retry]` sections.
    pub fn from_config(config: &DropConfig, dest_path: impl Into<String>) -> Self {
        Self::from_settings(
            &config.transfer,
            RetryPolicy::from_settings(&config.retry),
            dest_path,
        )
    }
}

/// Progress hooks. All methods default to no-ops.
pub trait UploadObserver {
    fn on_start(&self, _plan: &UploadPlan) {}
    fn on_chunk(&self, _ordinal: usize, _total: usize) {}
    fn on_decode(&self) {}
    fn on_step_failed(&self, _failure: &StepFailure) {}
    fn on_finish(&self, _report: &UploadReport) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}

/// A command as it will be issued, shortened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCommand {
    pub step: Step,
    pub command: String,
    /// How many times this command shape is issued.
    pub repeat: usize,
}

/// Chunk schedule and command preview, computed without touching the remote.
#[derive(Debug, Clone, Serialize)]
pub struct UploadPlan {
    pub source: PathBuf,
    pub source_bytes: u64,
    pub encoded_len: usize,
    pub chunk_size: usize,
    pub chunk_count: usize,
    pub last_chunk_len: usize,
    pub temp_path: String,
    pub dest_path: String,
    pub sha256: String,
    pub commands: Vec<PlannedCommand>,
}

/// A step that failed while `continue_on_error` was set.
#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    pub step: Step,
    /// One-based chunk number for append failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<usize>,
    pub code: String,
    pub message: String,
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub source_bytes: u64,
    pub encoded_len: usize,
    pub chunk_count: usize,
    pub dest_path: String,
    /// Size reported by the remote after decoding.
    pub remote_bytes: Option<u64>,
    /// `ls -lh` line for the destination.
    pub listing: Option<String>,
    /// `None` when verification was not requested or could not run.
    pub checksum_verified: Option<bool>,
    pub cleaned_up: bool,
    pub failed_steps: Vec<StepFailure>,
    pub elapsed_ms: u64,
}

impl UploadReport {
    /// True when every step succeeded and the remote size matched.
    pub fn is_complete(&self) -> bool {
        self.failed_steps.is_empty()
            && self.remote_bytes == Some(self.source_bytes)
            && self.checksum_verified != Some(false)
    }
}

async fn read_source(source: &Path) -> Result<Vec<u8>, DropError> {
    tokio::fs::read(source)
        .await
        .map_err(|e| DropError::SourceRead {
            path: source.to_path_buf(),
            source: e,
        })
}

fn build_plan(
    source: &Path,
    bytes: &[u8],
    payload: &EncodedPayload,
    options: &UploadOptions,
) -> UploadPlan {
    let encoded_len = payload.encoded_len();
    let chunk_count = encoding::chunk_count(encoded_len, options.chunk_size);

    let mut planned = Vec::new();
    if options.create_dirs
        && let Some(cmd) = commands::mkdir_command(&options.dest_path)
    {
        planned.push(PlannedCommand {
            step: Step::Prepare,
            command: cmd,
            repeat: 1,
        });
    }
    planned.push(PlannedCommand {
        step: Step::Clear,
        command: commands::clear_command(&options.temp_path),
        repeat: 1,
    });
    if chunk_count > 0 {
        planned.push(PlannedCommand {
            step: Step::Append,
            command: commands::append_preview(&options.temp_path),
            repeat: chunk_count,
        });
    }
    planned.push(PlannedCommand {
        step: Step::Decode,
        command: commands::decode_command(&options.temp_path, &options.dest_path),
        repeat: 1,
    });
    if options.verify_checksum {
        planned.push(PlannedCommand {
            step: Step::Verify,
            command: commands::checksum_command(&options.dest_path),
            repeat: 1,
        });
    }
    if options.cleanup {
        planned.push(PlannedCommand {
            step: Step::Cleanup,
            command: commands::cleanup_command(&options.temp_path),
            repeat: 1,
        });
    }

    UploadPlan {
        source: source.to_path_buf(),
        source_bytes: payload.source_len,
        encoded_len,
        chunk_size: options.chunk_size,
        chunk_count,
        last_chunk_len: encoding::last_chunk_len(encoded_len, options.chunk_size),
        temp_path: options.temp_path.clone(),
        dest_path: options.dest_path.clone(),
        sha256: encoding::sha256_hex(bytes),
        commands: planned,
    }
}

/// Compute the plan for `source` without contacting the remote.
pub async fn plan_upload(source: &Path, options: &UploadOptions) -> Result<UploadPlan, DropError> {
    if options.chunk_size == 0 {
        return Err(DropError::InvalidChunkSize(0));
    }
    let bytes = read_source(source).await?;
    let payload = encoding::encode(&bytes);
    Ok(build_plan(source, &bytes, &payload, options))
}

/// Drives one upload over a [`RemoteShell`].
pub struct Uploader<S> {
    shell: S,
    options: UploadOptions,
}

impl<S: RemoteShell> Uploader<S> {
    pub fn new(shell: S, options: UploadOptions) -> Self {
        Self { shell, options }
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    pub async fn plan(&self, source: &Path) -> Result<UploadPlan, DropError> {
        plan_upload(source, &self.options).await
    }

    /// Upload `source` to the configured destination.
    ///
    /// With `continue_on_error` unset the first failing step aborts the
    /// upload. With it set, failures are recorded in the report and the
    /// remaining steps still run.
    pub async fn upload(
        &self,
        source: &Path,
        observer: &dyn UploadObserver,
    ) -> Result<UploadReport, DropError> {
        let started = Instant::now();
        let opts = &self.options;

        let bytes = read_source(source).await?;
        let payload = encoding::encode(&bytes);
        let chunks = payload.chunks(opts.chunk_size)?;
        let plan = build_plan(source, &bytes, &payload, opts);
        let total = plan.chunk_count;

        info!(
            source = %source.display(),
            size = %format_bytes(plan.source_bytes),
            chunks = total,
            transport = %self.shell.describe(),
            dest = %opts.dest_path,
            "Starting upload"
        );
        observer.on_start(&plan);

        let mut failures = Vec::new();

        if opts.create_dirs
            && let Some(cmd) = commands::mkdir_command(&opts.dest_path)
        {
            self.step(Step::Prepare, None, &cmd, &mut failures, observer)
                .await?;
        }

        self.step(
            Step::Clear,
            None,
            &commands::clear_command(&opts.temp_path),
            &mut failures,
            observer,
        )
        .await?;

        for chunk in chunks {
            let cmd = commands::append_command(chunk.text, chunk.offset, &opts.temp_path);
            self.step(Step::Append, Some(chunk.ordinal()), &cmd, &mut failures, observer)
                .await?;
            debug!(chunk = chunk.ordinal(), total, len = chunk.text.len(), "Chunk appended");
            observer.on_chunk(chunk.ordinal(), total);
        }

        observer.on_decode();
        let decoded = self
            .step(
                Step::Decode,
                None,
                &commands::decode_command(&opts.temp_path, &opts.dest_path),
                &mut failures,
                observer,
            )
            .await?;

        let mut remote_bytes = None;
        let mut listing = None;
        if let Some(output) = decoded {
            match commands::parse_decode_output(&output.stdout) {
                Some((size, ls)) => {
                    remote_bytes = Some(size);
                    listing = ls;
                    if size != plan.source_bytes {
                        self.record(
                            Step::Decode,
                            None,
                            DropError::SizeMismatch {
                                local: plan.source_bytes,
                                remote: size,
                            },
                            &mut failures,
                            observer,
                        )?;
                    }
                }
                None => self.record(
                    Step::Decode,
                    None,
                    DropError::UnexpectedOutput {
                        step: Step::Decode,
                        output: truncate_for_log(output.stdout.trim(), 200),
                    },
                    &mut failures,
                    observer,
                )?,
            }
        }

        let mut checksum_verified = None;
        if opts.verify_checksum && remote_bytes.is_some() {
            let output = self
                .step(
                    Step::Verify,
                    None,
                    &commands::checksum_command(&opts.dest_path),
                    &mut failures,
                    observer,
                )
                .await?;
            if let Some(output) = output {
                match commands::parse_sha256(&output.stdout) {
                    Some(remote) if remote == plan.sha256 => checksum_verified = Some(true),
                    Some(remote) => {
                        checksum_verified = Some(false);
                        self.record(
                            Step::Verify,
                            None,
                            DropError::ChecksumMismatch {
                                local: plan.sha256.clone(),
                                remote,
                            },
                            &mut failures,
                            observer,
                        )?;
                    }
                    None => self.record(
                        Step::Verify,
                        None,
                        DropError::UnexpectedOutput {
                            step: Step::Verify,
                            output: truncate_for_log(output.stdout.trim(), 200),
                        },
                        &mut failures,
                        observer,
                    )?,
                }
            }
        }

        // The scratch file is the only copy of the data if decoding failed.
        let mut cleaned_up = false;
        if opts.cleanup && failures.is_empty() {
            cleaned_up = self
                .step(
                    Step::Cleanup,
                    None,
                    &commands::cleanup_command(&opts.temp_path),
                    &mut failures,
                    observer,
                )
                .await?
                .is_some();
        }

        let report = UploadReport {
            source_bytes: plan.source_bytes,
            encoded_len: plan.encoded_len,
            chunk_count: total,
            dest_path: opts.dest_path.clone(),
            remote_bytes,
            listing,
            checksum_verified,
            cleaned_up,
            failed_steps: failures,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if report.is_complete() {
            info!(
                dest = %report.dest_path,
                bytes = report.source_bytes,
                elapsed_ms = report.elapsed_ms,
                "Upload complete"
            );
        } else {
            warn!(
                dest = %report.dest_path,
                failed_steps = report.failed_steps.len(),
                "Upload finished with failures"
            );
        }
        observer.on_finish(&report);
        Ok(report)
    }

    /// Run one remote command with retries.
    ///
    /// Returns `Ok(None)` when the step failed and was recorded because
    /// `continue_on_error` is set.
    async fn step(
        &self,
        step: Step,
        chunk: Option<usize>,
        command: &str,
        failures: &mut Vec<StepFailure>,
        observer: &dyn UploadObserver,
    ) -> Result<Option<RemoteOutput>, DropError> {
        let shell = &self.shell;
        let phase = step.to_string();
        let result = run_with_retry(&phase, &self.options.retry, || async move {
            shell.run(step, command).await?.into_result(step)
        })
        .await;

        match result {
            Ok(output) => Ok(Some(output)),
            Err(err) => {
                self.record(step, chunk, err, failures, observer)?;
                Ok(None)
            }
        }
    }

    /// Either propagate `err` or, with `continue_on_error`, log and keep it.
    fn record(
        &self,
        step: Step,
        chunk: Option<usize>,
        err: DropError,
        failures: &mut Vec<StepFailure>,
        observer: &dyn UploadObserver,
    ) -> Result<(), DropError> {
        if !self.options.continue_on_error {
            return Err(err);
        }
        warn!(%step, chunk, error = %err, "Step failed, continuing");
        let failure = StepFailure {
            step,
            chunk,
            code: err.code().code_string(),
            message: err.to_string(),
        };
        observer.on_step_failed(&failure);
        failures.push(failure);
        Ok(())
    }
}

/// Run the connectivity probe and return the round-trip time.
pub async fn probe<S: RemoteShell>(shell: &S) -> Result<Duration, DropError> {
    let started = Instant::now();
    let output = shell
        .run(Step::Probe, commands::probe_command())
        .await?
        .into_result(Step::Probe)?;
    if output.stdout.trim() != "ok" {
        return Err(DropError::UnexpectedOutput {
            step: Step::Probe,
            output: truncate_for_log(output.stdout.trim(), 200),
        });
    }
    Ok(started.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::remote::{MockReply, MockShell};
    use std::cell::RefCell;
    use std::io::Write;

    fn source_file(data: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file
    }

    fn options(chunk_size: usize) -> UploadOptions {
        let mut opts = UploadOptions::new("/var/www/app/index.js");
        opts.chunk_size = chunk_size;
        opts.retry = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: 0.0,
        };
        opts
    }

    fn decode_reply(size: u64) -> MockReply {
        MockReply::Ok(format!(
            "{}\n-rw-r--r-- 1 root root {} Oct 19 10:00 /var/www/app/index.js\n",
            size, size
        ))
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl UploadObserver for Recorder {
        fn on_start(&self, plan: &UploadPlan) {
            self.events
                .borrow_mut()
                .push(format!("start {}", plan.chunk_count));
        }
        fn on_chunk(&self, ordinal: usize, total: usize) {
            self.events
                .borrow_mut()
                .push(format!("Uploaded {}/{}", ordinal, total));
        }
        fn on_decode(&self) {
            self.events.borrow_mut().push("decode".into());
        }
        fn on_finish(&self, report: &UploadReport) {
            self.events
                .borrow_mut()
                .push(format!("finish {}", report.is_complete()));
        }
    }

    #[tokio::test]
    async fn test_commands_issued_in_order() {
        init_test_logging();
        let data = b"console.log('hello');\n".repeat(10); // 220 bytes
        let file = source_file(&data);
        let shell = MockShell::new().reply(Step::Decode, decode_reply(220));
        let uploader = Uploader::new(shell, options(100));

        let report = uploader.upload(file.path(), &NoopObserver).await.unwrap();

        let steps: Vec<Step> = uploader.shell().calls().iter().map(|c| c.step).collect();
        // 220 bytes -> 296 encoded chars -> 3 chunks of 100.
        assert_eq!(
            steps,
            vec![Step::Clear, Step::Append, Step::Append, Step::Append, Step::Decode]
        );
        assert_eq!(report.chunk_count, 3);
        assert_eq!(report.remote_bytes, Some(220));
        assert!(report.listing.as_ref().unwrap().contains("index.js"));
        assert!(report.is_complete());
        assert!(!report.cleaned_up);
    }

    #[tokio::test]
    async fn test_appended_chunks_reassemble_source() {
        let data: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let file = source_file(&data);
        let shell = MockShell::new().reply(Step::Decode, decode_reply(5000));
        let uploader = Uploader::new(shell, options(333));

        uploader.upload(file.path(), &NoopObserver).await.unwrap();

        let joined: String = uploader
            .shell()
            .commands_for(Step::Append)
            .iter()
            .map(|cmd| {
                cmd.split_once("printf '%s' ")
                    .and_then(|(_, rest)| rest.split_once(" >> "))
                    .map(|(chunk, _)| chunk.to_string())
                    .unwrap()
            })
            .collect();
        assert_eq!(encoding::decode(&joined).unwrap(), data);
    }

    #[tokio::test]
    async fn test_observer_sees_progress() {
        let file = source_file(&[1u8; 30]); // 40 encoded chars
        let shell = MockShell::new().reply(Step::Decode, decode_reply(30));
        let uploader = Uploader::new(shell, options(16));
        let recorder = Recorder::default();

        uploader.upload(file.path(), &recorder).await.unwrap();

        assert_eq!(
            recorder.events.into_inner(),
            vec![
                "start 3",
                "Uploaded 1/3",
                "Uploaded 2/3",
                "Uploaded 3/3",
                "decode",
                "finish true"
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_file_skips_appends() {
        let file = source_file(b"");
        let shell = MockShell::new().reply(Step::Decode, decode_reply(0));
        let uploader = Uploader::new(shell, options(100));

        let report = uploader.upload(file.path(), &NoopObserver).await.unwrap();
        assert_eq!(report.chunk_count, 0);
        assert!(uploader.shell().commands_for(Step::Append).is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_append_failure_aborts_by_default() {
        let file = source_file(&[0u8; 300]);
        let shell = MockShell::new().reply(
            Step::Append,
            MockReply::Exit {
                status: 1,
                stderr: "No space left on device".into(),
            },
        );
        let uploader = Uploader::new(shell, options(100));

        let err = uploader
            .upload(file.path(), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DropError::RemoteCommandFailed {
                step: Step::Append,
                status: Some(1),
                ..
            }
        ));
        // Nothing after the failing append.
        assert_eq!(uploader.shell().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_connection_failure_is_retried() {
        let file = source_file(&[0u8; 30]);
        let shell = MockShell::new()
            .reply(Step::Append, MockReply::ConnectionFailed)
            .reply(Step::Decode, decode_reply(30));
        let uploader = Uploader::new(shell, options(100));

        let report = uploader.upload(file.path(), &NoopObserver).await.unwrap();
        assert!(report.is_complete());
        // One chunk, sent again after the ssh client failed.
        assert_eq!(uploader.shell().commands_for(Step::Append).len(), 2);
    }

    #[tokio::test]
    async fn test_appends_cut_scratch_back_to_chunk_offset() {
        let file = source_file(&[7u8; 300]); // 400 chars -> 4 chunks
        let shell = MockShell::new()
            .reply(Step::Append, MockReply::Ok(String::new()))
            .reply(Step::Append, MockReply::ConnectionFailed)
            .reply(Step::Decode, decode_reply(300));
        let uploader = Uploader::new(shell, options(100));

        let report = uploader.upload(file.path(), &NoopObserver).await.unwrap();
        assert!(report.is_complete());

        let offsets: Vec<String> = uploader
            .shell()
            .commands_for(Step::Append)
            .iter()
            .map(|cmd| {
                cmd.strip_prefix("truncate -s ")
                    .and_then(|rest| rest.split_once(' '))
                    .map(|(offset, _)| offset.to_string())
                    .unwrap()
            })
            .collect();
        // The second chunk is resent from the same offset.
        assert_eq!(offsets, vec!["0", "100", "100", "200", "300"]);
    }

    #[tokio::test]
    async fn test_continue_on_error_records_failures() {
        let file = source_file(&[0u8; 300]); // 400 chars -> 4 chunks
        let shell = MockShell::new()
            .reply(Step::Append, MockReply::Ok(String::new()))
            .reply(
                Step::Append,
                MockReply::Exit {
                    status: 1,
                    stderr: "disk full".into(),
                },
            )
            .reply(Step::Decode, decode_reply(225));
        let mut opts = options(100);
        opts.continue_on_error = true;
        opts.cleanup = true;
        let uploader = Uploader::new(shell, opts);

        let report = uploader.upload(file.path(), &NoopObserver).await.unwrap();

        assert_eq!(uploader.shell().commands_for(Step::Append).len(), 4);
        assert_eq!(report.failed_steps.len(), 2);
        assert_eq!(report.failed_steps[0].step, Step::Append);
        assert_eq!(report.failed_steps[0].chunk, Some(2));
        assert_eq!(report.failed_steps[1].code, "SSHDROP-E201");
        assert!(!report.is_complete());
        // Scratch file kept for inspection.
        assert!(!report.cleaned_up);
        assert!(uploader.shell().commands_for(Step::Cleanup).is_empty());
    }

    #[tokio::test]
    async fn test_size_mismatch_is_error() {
        let file = source_file(&[0u8; 30]);
        let shell = MockShell::new().reply(Step::Decode, decode_reply(29));
        let uploader = Uploader::new(shell, options(100));

        let err = uploader
            .upload(file.path(), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DropError::SizeMismatch {
                local: 30,
                remote: 29
            }
        ));
    }

    #[tokio::test]
    async fn test_checksum_verification() {
        let data = b"abc";
        let file = source_file(data);
        let good = format!("{}  /var/www/app/index.js\n", encoding::sha256_hex(data));
        let shell = MockShell::new()
            .reply(Step::Decode, decode_reply(3))
            .reply(Step::Verify, MockReply::Ok(good));
        let mut opts = options(100);
        opts.verify_checksum = true;
        opts.cleanup = true;
        let uploader = Uploader::new(shell, opts);

        let report = uploader.upload(file.path(), &NoopObserver).await.unwrap();
        assert_eq!(report.checksum_verified, Some(true));
        assert!(report.cleaned_up);
        assert_eq!(
            uploader.shell().commands_for(Step::Cleanup),
            vec!["rm -f /tmp/sshdrop.b64"]
        );
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_error() {
        let file = source_file(b"abc");
        let bad = format!("{}  /var/www/app/index.js\n", "0".repeat(64));
        let shell = MockShell::new()
            .reply(Step::Decode, decode_reply(3))
            .reply(Step::Verify, MockReply::Ok(bad));
        let mut opts = options(100);
        opts.verify_checksum = true;
        let uploader = Uploader::new(shell, opts);

        let err = uploader
            .upload(file.path(), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, DropError::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn test_create_dirs_runs_first() {
        let file = source_file(b"x");
        let shell = MockShell::new().reply(Step::Decode, decode_reply(1));
        let mut opts = options(100);
        opts.create_dirs = true;
        let uploader = Uploader::new(shell, opts);

        uploader.upload(file.path(), &NoopObserver).await.unwrap();
        let calls = uploader.shell().calls();
        assert_eq!(calls[0].step, Step::Prepare);
        assert_eq!(calls[0].command, "mkdir -p /var/www/app");
        assert_eq!(calls[1].step, Step::Clear);
    }

    #[tokio::test]
    async fn test_missing_source_is_reported() {
        let uploader = Uploader::new(MockShell::new(), options(100));
        let err = uploader
            .upload(Path::new("/nonexistent/sshdrop-src"), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, DropError::SourceRead { .. }));
        assert!(uploader.shell().calls().is_empty());
    }

    #[tokio::test]
    async fn test_plan_matches_chunk_math() {
        let file = source_file(&[9u8; 15_000]); // 20_000 encoded chars
        let mut opts = options(6_000);
        opts.verify_checksum = true;
        let plan = plan_upload(file.path(), &opts).await.unwrap();

        assert_eq!(plan.encoded_len, 20_000);
        assert_eq!(plan.chunk_count, 4);
        assert_eq!(plan.last_chunk_len, 2_000);
        let steps: Vec<Step> = plan.commands.iter().map(|c| c.step).collect();
        assert_eq!(steps, vec![Step::Clear, Step::Append, Step::Decode, Step::Verify]);
        assert_eq!(plan.commands[1].repeat, 4);
    }

    #[tokio::test]
    async fn test_plan_rejects_zero_chunk_size() {
        let file = source_file(b"abc");
        let err = plan_upload(file.path(), &options(0)).await.unwrap_err();
        assert!(matches!(err, DropError::InvalidChunkSize(0)));
    }

    #[tokio::test]
    async fn test_probe() {
        let shell = MockShell::new().reply(Step::Probe, MockReply::Ok("ok\n".into()));
        assert!(probe(&shell).await.is_ok());

        let shell = MockShell::new().reply(Step::Probe, MockReply::Ok("Welcome!\nok\n".into()));
        assert!(matches!(
            probe(&shell).await,
            Err(DropError::UnexpectedOutput { .. })
        ));
    }
}
