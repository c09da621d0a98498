//! Batch conversion: enumerate inputs, convert them on a bounded worker
//! pool, and aggregate a summary.
//!
//! ## Isolation
//!
//! Each file runs in its own `tokio::spawn`ed task. A panic inside a reader
//! surfaces as a `JoinError` and becomes an `UnknownFailure` for that file
//! only. Each task is bounded by the per-file timeout and races the batch
//! cancellation token; external tools are spawned with `kill_on_drop`, so
//! abandoning a task also terminates its child process.
//!
//! ## Aggregation
//!
//! Results flow back through `buffer_unordered` to the single driver task,
//! which owns the counters and fires progress events. Completion order is
//! arbitrary; records are sorted back into input order at the end, so the
//! summary is identical for any worker count.

use crate::convert::{failed_result, output_stem, write_atomic, ConversionJob, Converter};
use crate::error::{ConversionError, Resume2HtmlError};
use crate::format::DocumentFormat;
use crate::output::{file_name, BatchSummary, ConversionResult, FileRecord};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use chrono::Local;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name of the batch summary inside the output directory.
pub const SUMMARY_FILE: &str = "batch_summary.json";

/// File name of the optional output archive.
pub const ARCHIVE_FILE: &str = "converted_files.zip";

/// The files a batch will work on.
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub input_dir: PathBuf,
    /// Supported files, in input order.
    pub jobs: Vec<ConversionJob>,
    /// Files left out because their extension is not supported.
    pub skipped: Vec<PathBuf>,
}

impl BatchPlan {
    /// Enumerated files, supported or not.
    pub fn total(&self) -> usize {
        self.jobs.len() + self.skipped.len()
    }
}

// ── Enumeration ──────────────────────────────────────────────────────────

/// List the regular files directly inside `dir` (non-recursive), sorted by
/// file name.
pub async fn enumerate(dir: &Path) -> Result<BatchPlan, Resume2HtmlError> {
    let meta = tokio::fs::metadata(dir)
        .await
        .map_err(|_| Resume2HtmlError::InputNotFound {
            path: dir.to_path_buf(),
        })?;
    if !meta.is_dir() {
        return Err(Resume2HtmlError::InvalidInput {
            path: dir.to_path_buf(),
            reason: "batch input must be a directory".to_string(),
        });
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Resume2HtmlError::InvalidInput {
            path: dir.to_path_buf(),
            reason: format!("cannot list directory: {e}"),
        })?;

    let mut files = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                return Err(Resume2HtmlError::InvalidInput {
                    path: dir.to_path_buf(),
                    reason: format!("cannot list directory: {e}"),
                })
            }
        };
        let is_file = match entry.file_type().await {
            Ok(t) if t.is_symlink() => tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Ok(t) => t.is_file(),
            Err(_) => false,
        };
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut plan = enumerate_files(&files);
    plan.input_dir = dir.to_path_buf();
    Ok(plan)
}

/// Build a plan from an explicit list of files, keeping the given order.
pub fn enumerate_files(paths: &[PathBuf]) -> BatchPlan {
    let mut jobs = Vec::new();
    let mut skipped = Vec::new();
    for path in paths {
        match DocumentFormat::from_path(path) {
            Some(format) => jobs.push(ConversionJob {
                index: jobs.len(),
                path: path.clone(),
                format,
                output_stem: output_stem(path),
            }),
            None => {
                debug!("Skipping unsupported file {}", path.display());
                skipped.push(path.clone());
            }
        }
    }
    resolve_stem_collisions(&mut jobs);

    let input_dir = paths
        .first()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    BatchPlan {
        input_dir,
        jobs,
        skipped,
    }
}

/// Jobs sharing an output stem (`cv.pdf`, `cv.docx`) all switch to
/// `<stem>_<ext>`.
fn resolve_stem_collisions(jobs: &mut [ConversionJob]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for job in jobs.iter() {
        *counts.entry(job.output_stem.to_lowercase()).or_default() += 1;
    }
    for job in jobs.iter_mut() {
        if counts[&job.output_stem.to_lowercase()] > 1 {
            job.output_stem = format!("{}_{}", job.output_stem, job.format.extension());
        }
    }
}

// ── Driver ───────────────────────────────────────────────────────────────

/// Runs a [`BatchPlan`] on a bounded pool of concurrent conversions.
pub struct BatchDriver {
    converter: Converter,
    progress: ProgressCallback,
    cancel: CancellationToken,
}

impl BatchDriver {
    pub fn new(converter: Converter) -> Self {
        Self {
            converter,
            progress: Arc::new(NoopProgressCallback),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Cancelling `token` stops new files from starting and interrupts the
    /// ones in flight.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Convert a single file with the same isolation, timeout and
    /// cancellation as a batch job. No summary is written.
    pub async fn convert_one(&self, path: &Path) -> ConversionResult {
        let stem = output_stem(path);
        let settings = self.converter.settings();
        let task = tokio::spawn(run_job(
            self.converter.clone(),
            path.to_path_buf(),
            stem.clone(),
            settings.timeout,
            self.cancel.clone(),
        ));
        match task.await {
            Ok(result) => result,
            Err(e) => {
                let mut failed =
                    failed_result(path, ConversionError::unknown(join_error_message(e))).await;
                let dir = settings.output_dir.clone();
                self.converter.persist(&mut failed, &dir, &stem).await;
                failed
            }
        }
    }

    /// Enumerate `dir` and run the resulting plan.
    pub async fn run_dir(&self, dir: &Path) -> Result<BatchSummary, Resume2HtmlError> {
        let plan = enumerate(dir).await?;
        self.run(plan).await
    }

    /// Convert every job in `plan` and write `batch_summary.json`.
    ///
    /// Per-file failures are recorded in the summary; `Err` is returned only
    /// when the output directory, the summary or the archive cannot be
    /// written.
    pub async fn run(&self, plan: BatchPlan) -> Result<BatchSummary, Resume2HtmlError> {
        let settings = self.converter.settings();
        let output_dir = settings.output_dir.clone();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| Resume2HtmlError::OutputDirFailed {
                path: output_dir.clone(),
                source,
            })?;

        let started_at = Local::now();
        let started = Instant::now();
        let total_jobs = plan.jobs.len();
        let skipped_files: Vec<String> = plan.skipped.iter().map(|p| file_name(p)).collect();
        let workers = settings.workers.max(1);
        let timeout = settings.timeout;

        info!(
            "Batch: {} files to convert, {} skipped, {} workers",
            total_jobs,
            skipped_files.len(),
            workers
        );
        self.progress.on_batch_start(total_jobs, skipped_files.len());
        for name in &skipped_files {
            self.progress.on_file_skipped(name);
        }

        let mut results: Vec<(usize, ConversionResult)> = Vec::with_capacity(total_jobs);
        let mut started_jobs = 0;
        let mut completed = stream::iter(plan.jobs.into_iter().map(|job| {
            let converter = self.converter.clone();
            let progress = Arc::clone(&self.progress);
            let token = self.cancel.clone();
            async move {
                let index = job.index;
                if token.is_cancelled() {
                    return (index, false, not_started(&job).await);
                }
                progress.on_file_start(index, total_jobs, &file_name(&job.path));

                let task = tokio::spawn(run_job(
                    converter.clone(),
                    job.path.clone(),
                    job.output_stem.clone(),
                    timeout,
                    token,
                ));
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!("Conversion task for {} aborted: {}", job.path.display(), e);
                        let mut failed = failed_result(
                            &job.path,
                            ConversionError::unknown(join_error_message(e)),
                        )
                        .await;
                        let dir = converter.settings().output_dir.clone();
                        converter.persist(&mut failed, &dir, &job.output_stem).await;
                        failed
                    }
                };
                (index, true, result)
            }
        }))
        .buffer_unordered(workers);

        while let Some((index, started, result)) = completed.next().await {
            if started {
                started_jobs += 1;
            }
            self.progress.on_file_complete(index, total_jobs, &result);
            results.push((index, result));
        }
        drop(completed);

        results.sort_by_key(|(index, _)| *index);
        let cancelled = self.cancel.is_cancelled();
        let succeeded = results.iter().filter(|(_, r)| r.is_success()).count();
        let failed = results.len() - succeeded;

        let archive_path = if settings.archive {
            Some(build_archive(&output_dir, &results).await?)
        } else {
            None
        };

        let summary = BatchSummary {
            input_dir: plan.input_dir.display().to_string(),
            started_at,
            finished_at: Local::now(),
            total: total_jobs + skipped_files.len(),
            attempted: started_jobs,
            succeeded,
            failed,
            skipped: skipped_files.len(),
            cancelled,
            skipped_files,
            archive_path: archive_path.map(|p| p.display().to_string()),
            records: results.iter().map(|(_, r)| FileRecord::from(r)).collect(),
        };

        write_summary(&output_dir, &summary).await?;
        info!(
            "Batch finished in {:.1}s: {} succeeded, {} failed, {} skipped{}",
            started.elapsed().as_secs_f64(),
            summary.succeeded,
            summary.failed,
            summary.skipped,
            if cancelled { " (cancelled)" } else { "" }
        );
        self.progress.on_batch_complete(&summary);
        Ok(summary)
    }
}

/// One file inside its spawned task: convert under timeout and
/// cancellation, then write outputs.
async fn run_job(
    converter: Converter,
    path: PathBuf,
    stem: String,
    timeout: Option<Duration>,
    token: CancellationToken,
) -> ConversionResult {
    let started = Instant::now();
    let outcome = tokio::select! {
        _ = token.cancelled() => Err(ConversionError::Cancelled),
        result = convert_with_timeout(&converter, &path, timeout) => result,
    };

    let mut result = match outcome {
        Ok(result) => result,
        Err(e) => {
            warn!("{}: {}", path.display(), e);
            let mut failed = failed_result(&path, e).await;
            failed.duration_ms = started.elapsed().as_millis() as u64;
            failed
        }
    };
    let output_dir = converter.settings().output_dir.clone();
    converter.persist(&mut result, &output_dir, &stem).await;
    result
}

async fn convert_with_timeout(
    converter: &Converter,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<ConversionResult, ConversionError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, converter.convert(path))
            .await
            .map_err(|_| ConversionError::Timeout {
                limit_ms: limit.as_millis() as u64,
            }),
        None => Ok(converter.convert(path).await),
    }
}

/// Recorded for jobs the cancellation reached before they started.
async fn not_started(job: &ConversionJob) -> ConversionResult {
    failed_result(&job.path, ConversionError::Cancelled).await
}

fn join_error_message(e: tokio::task::JoinError) -> String {
    if !e.is_panic() {
        return format!("task aborted: {e}");
    }
    let payload = e.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with non-string payload".to_string()
    }
}

// ── Summary + archive ────────────────────────────────────────────────────

async fn write_summary(output_dir: &Path, summary: &BatchSummary) -> Result<(), Resume2HtmlError> {
    let path = output_dir.join(SUMMARY_FILE);
    let json = serde_json::to_vec_pretty(summary)
        .map_err(|e| Resume2HtmlError::Internal(format!("cannot serialise summary: {e}")))?;
    write_atomic(&path, &json)
        .await
        .map_err(|source| Resume2HtmlError::SummaryWriteFailed { path, source })
}

/// Bundle every produced HTML and text file into `converted_files.zip`.
async fn build_archive(
    output_dir: &Path,
    results: &[(usize, ConversionResult)],
) -> Result<PathBuf, Resume2HtmlError> {
    let files: Vec<PathBuf> = results
        .iter()
        .filter(|(_, r)| r.is_success())
        .flat_map(|(_, r)| [r.output_path.clone(), r.text_path.clone()])
        .flatten()
        .collect();
    let path = output_dir.join(ARCHIVE_FILE);
    let target = path.clone();

    tokio::task::spawn_blocking(move || write_zip(&target, &files))
        .await
        .map_err(|e| Resume2HtmlError::Internal(format!("archive task panicked: {e}")))?
        .map_err(|detail| Resume2HtmlError::ArchiveFailed {
            path: path.clone(),
            detail,
        })?;
    info!("Archive written: {}", path.display());
    Ok(path)
}

fn write_zip(target: &Path, files: &[PathBuf]) -> Result<(), String> {
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let file = File::create(&tmp).map_err(|e| e.to_string())?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for path in files {
        let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
        zip.start_file(file_name(path), options)
            .map_err(|e| e.to_string())?;
        zip.write_all(&bytes).map_err(|e| e.to_string())?;
    }
    zip.finish().map_err(|e| e.to_string())?;
    std::fs::rename(&tmp, target).map_err(|e| e.to_string())
}
