//! Batch driver integration tests.
//!
//! PDF reading and OCR are replaced by fakes from `common`, so these tests
//! run without pdfium, LibreOffice or tesseract installed. DOCX inputs go
//! through the real reader.

mod common;

use common::*;
use resume2html::{
    enumerate, BatchDriver, BatchProgressCallback, BatchSummary, CancellationToken,
    ConversionResult, ConversionSettings, Converter, FailureKind, FileRecord, Resume2HtmlError,
    ARCHIVE_FILE, SUMMARY_FILE,
};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn read_summary(output_dir: &Path) -> BatchSummary {
    let bytes = std::fs::read(output_dir.join(SUMMARY_FILE)).expect("summary written");
    serde_json::from_slice(&bytes).expect("summary parses")
}

fn record<'a>(summary: &'a BatchSummary, filename: &str) -> &'a FileRecord {
    summary
        .records
        .iter()
        .find(|r| r.filename == filename)
        .unwrap_or_else(|| panic!("no record for {filename}"))
}

/// Counts against a summary that must always hold.
fn assert_counts_consistent(summary: &BatchSummary) {
    assert_eq!(summary.succeeded + summary.failed + summary.skipped, summary.total);
    assert_eq!(summary.records.len(), summary.total - summary.skipped);
    assert!(summary.attempted <= summary.succeeded + summary.failed);
    if !summary.cancelled {
        assert_eq!(summary.attempted, summary.succeeded + summary.failed);
    }
    assert_eq!(summary.skipped_files.len(), summary.skipped);
}

fn docx_driver(output_dir: &Path, workers: usize) -> BatchDriver {
    let settings = settings(output_dir).workers(workers).build().unwrap();
    BatchDriver::new(converter(
        settings,
        FakePdfReader::with_text("Jane Doe\nEngineer"),
        FakeRecognizer(vec![]),
    ))
}

#[derive(Default)]
struct Recorder {
    started: AtomicUsize,
    completed: Mutex<Vec<usize>>,
    skipped: Mutex<Vec<String>>,
    batch_total: AtomicUsize,
}

impl BatchProgressCallback for Recorder {
    fn on_batch_start(&self, total: usize, _skipped: usize) {
        self.batch_total.store(total, Ordering::SeqCst);
    }

    fn on_file_start(&self, _index: usize, _total: usize, _name: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_file_complete(&self, index: usize, _total: usize, _result: &ConversionResult) {
        self.completed.lock().unwrap().push(index);
    }

    fn on_file_skipped(&self, name: &str) {
        self.skipped.lock().unwrap().push(name.to_string());
    }
}

// ── Mixed directories ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_directory_converts_supported_files_and_skips_the_rest() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "alice.docx", &resume_docx("Alice Example"));
    write(input.path(), "bob.docx", &resume_docx("Bob Example"));
    write(input.path(), "carol.docx", &resume_docx("Carol Example"));
    write(input.path(), "dave.pdf", &fake_pdf());
    write(input.path(), "notes.txt", b"not a resume");

    let summary = docx_driver(output.path(), 2)
        .run_dir(input.path())
        .await
        .unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.skipped_files, vec!["notes.txt".to_string()]);
    assert!(!summary.cancelled);
    assert_counts_consistent(&summary);

    let names: Vec<&str> = summary.records.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, ["alice.docx", "bob.docx", "carol.docx", "dave.pdf"]);

    for stem in ["alice", "bob", "carol", "dave"] {
        assert!(output.path().join(format!("{stem}.html")).is_file(), "{stem}.html");
        assert!(output.path().join(format!("{stem}.txt")).is_file(), "{stem}.txt");
        assert!(output.path().join(format!("{stem}_metadata.json")).is_file());
    }
    assert!(!output.path().join("notes.html").exists());

    let on_disk = read_summary(output.path());
    assert_eq!(on_disk.records, summary.records);

    let html = std::fs::read_to_string(output.path().join("alice.html")).unwrap();
    assert!(html.contains("Alice Example"));
    assert!(html.contains("ACME &amp; Co"));
}

#[tokio::test(flavor = "multi_thread")]
async fn corrupt_file_fails_alone() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "good.docx", &resume_docx("Good"));
    write(input.path(), "broken.docx", &corrupt_docx());

    let summary = docx_driver(output.path(), 2)
        .run_dir(input.path())
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.has_failures());
    assert_counts_consistent(&summary);

    let broken = record(&summary, "broken.docx");
    assert_eq!(broken.error_kind, Some(FailureKind::CorruptDocument));
    assert!(broken.output_path.is_none());
    assert!(broken.error.is_some());

    // Failures still get a sidecar so they can be found without the summary.
    let sidecar = std::fs::read(output.path().join("broken_metadata.json")).unwrap();
    let sidecar: FileRecord = serde_json::from_slice(&sidecar).unwrap();
    assert_eq!(sidecar.error_kind, Some(FailureKind::CorruptDocument));
    assert!(!output.path().join("broken.html").exists());
    assert!(output.path().join("good.html").is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_count_does_not_change_outcomes() {
    let input = TempDir::new().unwrap();
    for i in 0..6 {
        write(input.path(), &format!("cv{i}.docx"), &resume_docx(&format!("Person {i}")));
    }
    write(input.path(), "zz-broken.docx", &corrupt_docx());

    let mut outcomes = Vec::new();
    for workers in [1, 8] {
        let output = TempDir::new().unwrap();
        let summary = docx_driver(output.path(), workers)
            .run_dir(input.path())
            .await
            .unwrap();
        let view: Vec<_> = summary
            .records
            .iter()
            .map(|r| (r.filename.clone(), r.status, r.html_size, r.error_kind))
            .collect();
        outcomes.push(view);
    }
    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[0].len(), 7);
}

#[tokio::test(flavor = "multi_thread")]
async fn stem_collisions_get_distinct_outputs() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "cv.docx", &resume_docx("Docx Person"));
    write(input.path(), "cv.pdf", &fake_pdf());

    let summary = docx_driver(output.path(), 2)
        .run_dir(input.path())
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert!(output.path().join("cv_docx.html").is_file());
    assert!(output.path().join("cv_pdf.html").is_file());
    assert!(!output.path().join("cv.html").exists());

    let outputs: HashSet<_> = summary
        .records
        .iter()
        .filter_map(|r| r.output_path.clone())
        .collect();
    assert_eq!(outputs.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_directory_yields_empty_summary() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let summary = docx_driver(output.path(), 4)
        .run_dir(input.path())
        .await
        .unwrap();

    assert_eq!(summary.total, 0);
    assert!(summary.records.is_empty());
    assert!(!summary.has_failures());
    assert!(output.path().join(SUMMARY_FILE).is_file());
}

#[tokio::test]
async fn missing_input_directory_is_fatal() {
    let output = TempDir::new().unwrap();
    let err = docx_driver(output.path(), 1)
        .run_dir(Path::new("/definitely/not/here"))
        .await
        .unwrap_err();
    assert!(matches!(err, Resume2HtmlError::InputNotFound { .. }));
}

// ── OCR ──────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn image_only_pdf_is_recognised_when_ocr_enabled() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let path = write(input.path(), "scan.pdf", &fake_pdf());

    let settings = settings(output.path()).ocr_enabled(true).build().unwrap();
    let driver = BatchDriver::new(converter(
        settings,
        FakePdfReader::image_only(2),
        FakeRecognizer(vec!["Jane Doe", "Rust engineer"]),
    ));
    let result = driver.convert_one(&path).await;

    assert!(result.is_success(), "{:?}", result.error);
    assert!(result.ocr_applied);
    assert_eq!(result.page_count, 2);
    let text = result.text.unwrap();
    assert!(text.contains("Jane Doe"));
    assert!(text.contains("Rust engineer"));
    let html = result.html.unwrap();
    assert!(html.contains("ocr-page"));
    assert!(html.contains("data:image/jpeg;base64,"));
}

#[tokio::test(flavor = "multi_thread")]
async fn image_only_pdf_without_ocr_succeeds_with_empty_text() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let path = write(input.path(), "scan.pdf", &fake_pdf());

    let settings = settings(output.path()).ocr_enabled(false).build().unwrap();
    let driver = BatchDriver::new(converter(
        settings,
        FakePdfReader::image_only(1),
        FakeRecognizer(vec!["never used"]),
    ));
    let result = driver.convert_one(&path).await;

    assert!(result.is_success());
    assert!(!result.ocr_applied);
    assert!(result.text.unwrap().trim().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn text_layer_pdf_skips_ocr() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let path = write(input.path(), "cv.pdf", &fake_pdf());

    let settings = settings(output.path()).min_text_chars(5).build().unwrap();
    let driver = BatchDriver::new(converter(
        settings,
        FakePdfReader::with_text("Jane Doe\nSenior Engineer"),
        MissingRecognizer,
    ));
    let result = driver.convert_one(&path).await;

    assert!(result.is_success());
    assert!(!result.ocr_applied);
    assert!(result.html.unwrap().contains("pdf-page"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_ocr_engine_fails_only_scanned_files() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "scan.pdf", &fake_pdf());
    write(input.path(), "typed.docx", &resume_docx("Typed"));

    let settings = settings(output.path()).build().unwrap();
    let driver = BatchDriver::new(converter(
        settings,
        FakePdfReader::image_only(1),
        MissingRecognizer,
    ));
    let summary = driver.run_dir(input.path()).await.unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        record(&summary, "scan.pdf").error_kind,
        Some(FailureKind::OcrUnavailable)
    );
    assert_eq!(record(&summary, "typed.docx").error_kind, None);
}

// ── Isolation, timeouts, cancellation ────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn panicking_reader_is_contained() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "explodes.pdf", &fake_pdf());
    write(input.path(), "fine.docx", &resume_docx("Fine"));

    let settings = settings(output.path()).build().unwrap();
    let driver = BatchDriver::new(converter(settings, PanickingReader, FakeRecognizer(vec![])));
    let summary = driver.run_dir(input.path()).await.unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    let exploded = record(&summary, "explodes.pdf");
    assert_eq!(exploded.error_kind, Some(FailureKind::UnknownFailure));
    assert!(exploded.error.as_deref().unwrap_or("").contains("parser blew up"));
    assert!(output.path().join("explodes_metadata.json").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_file_times_out_without_blocking_others() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let hung = write(input.path(), "hung.pdf", &fake_pdf());
    write(input.path(), "quick.docx", &resume_docx("Quick"));

    let settings = settings(output.path())
        .timeout(Some(Duration::from_millis(300)))
        .workers(2)
        .build()
        .unwrap();
    let driver = BatchDriver::new(converter(
        settings,
        SlowReader(Duration::from_secs(30)),
        FakeRecognizer(vec![]),
    ));

    let started = std::time::Instant::now();
    let summary = driver.run_dir(input.path()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    let timed_out = record(&summary, "hung.pdf");
    assert_eq!(timed_out.error_kind, Some(FailureKind::Timeout));
    assert_eq!(timed_out.file_size, std::fs::metadata(&hung).unwrap().len());
    assert!(timed_out.error.as_deref().unwrap_or("").contains("0.3s"));
    assert_eq!(record(&summary, "quick.docx").error_kind, None);

    let sidecar: FileRecord =
        serde_json::from_slice(&std::fs::read(output.path().join("hung_metadata.json")).unwrap())
            .unwrap();
    assert_eq!(sidecar.file_size, timed_out.file_size);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_before_start_converts_nothing() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for name in ["a.docx", "b.docx", "c.docx"] {
        write(input.path(), name, &resume_docx(name));
    }

    let token = CancellationToken::new();
    token.cancel();
    let recorder = Arc::new(Recorder::default());
    let driver = docx_driver(output.path(), 2)
        .with_cancellation(token)
        .with_progress(recorder.clone());
    let summary = driver.run_dir(input.path()).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.attempted, 0);
    assert_counts_consistent(&summary);
    assert!(summary
        .records
        .iter()
        .all(|r| r.error_kind == Some(FailureKind::Cancelled)));
    assert_eq!(recorder.started.load(Ordering::SeqCst), 0);
    assert!(!output.path().join("a.html").exists());
    // The summary is still written for a cancelled run.
    assert!(read_summary(output.path()).cancelled);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_interrupts_in_flight_work() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for name in ["one.pdf", "two.pdf", "three.pdf"] {
        write(input.path(), name, &fake_pdf());
    }

    let settings = settings(output.path()).workers(1).build().unwrap();
    let driver = BatchDriver::new(converter(
        settings,
        SlowReader(Duration::from_secs(30)),
        FakeRecognizer(vec![]),
    ));
    let token = driver.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let started = std::time::Instant::now();
    let summary = driver.run_dir(input.path()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(summary.cancelled);
    assert_eq!(summary.failed, 3);
    // Only the first file was in flight with one worker.
    assert_eq!(summary.attempted, 1);
    assert_counts_consistent(&summary);
    assert!(summary
        .records
        .iter()
        .all(|r| r.error_kind == Some(FailureKind::Cancelled)));
    assert!(summary.records.iter().all(|r| r.file_size > 0));
}

// ── Progress, determinism, archive ───────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn progress_callback_sees_every_file() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for name in ["a.docx", "b.docx", "c.docx"] {
        write(input.path(), name, &resume_docx(name));
    }
    write(input.path(), "photo.png", b"\x89PNG");

    let recorder = Arc::new(Recorder::default());
    let driver = docx_driver(output.path(), 3).with_progress(recorder.clone());
    driver.run_dir(input.path()).await.unwrap();

    assert_eq!(recorder.batch_total.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.started.load(Ordering::SeqCst), 3);
    let mut completed = recorder.completed.lock().unwrap().clone();
    completed.sort_unstable();
    assert_eq!(completed, vec![0, 1, 2]);
    assert_eq!(*recorder.skipped.lock().unwrap(), vec!["photo.png".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn converting_twice_gives_identical_html() {
    let input = TempDir::new().unwrap();
    let path = write(input.path(), "cv.docx", &resume_docx("Same Person"));

    let mut renders = Vec::new();
    for _ in 0..2 {
        let output = TempDir::new().unwrap();
        let settings = ConversionSettings::builder()
            .output_dir(output.path())
            .build()
            .unwrap();
        let result = Converter::new(settings).convert(&path).await;
        renders.push(result.html.expect("html rendered"));
    }
    assert_eq!(renders[0], renders[1]);
}

#[tokio::test(flavor = "multi_thread")]
async fn archive_bundles_outputs() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write(input.path(), "alice.docx", &resume_docx("Alice"));
    write(input.path(), "bob.docx", &resume_docx("Bob"));

    let settings = settings(output.path()).archive(true).build().unwrap();
    let driver = BatchDriver::new(converter(
        settings,
        FakePdfReader::with_text("unused"),
        FakeRecognizer(vec![]),
    ));
    let summary = driver.run_dir(input.path()).await.unwrap();

    let archive_path = output.path().join(ARCHIVE_FILE);
    assert_eq!(
        summary.archive_path.as_deref(),
        Some(archive_path.display().to_string().as_str())
    );

    let file = std::fs::File::open(&archive_path).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let names: HashSet<String> = zip.file_names().map(String::from).collect();
    for expected in ["alice.html", "alice.txt", "bob.html", "bob.txt"] {
        assert!(names.contains(expected), "missing {expected} in {names:?}");
    }

    let mut html = String::new();
    zip.by_name("alice.html").unwrap().read_to_string(&mut html).unwrap();
    assert!(html.contains("Alice"));
}

#[tokio::test]
async fn enumerate_orders_by_file_name() {
    let input = TempDir::new().unwrap();
    for name in ["zeta.pdf", "Alpha.docx", "mid.doc", "readme.md"] {
        write(input.path(), name, b"x");
    }
    std::fs::create_dir(input.path().join("nested.pdf")).unwrap();

    let plan = enumerate(input.path()).await.unwrap();
    let names: Vec<String> = plan
        .jobs
        .iter()
        .map(|j| j.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, ["Alpha.docx", "mid.doc", "zeta.pdf"]);
    assert_eq!(plan.skipped.len(), 1);
    assert_eq!(plan.total(), 4);
}
