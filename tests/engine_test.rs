use kwscan::scheduler::{CancelToken, NullObserver, ProgressEvent, ScanObserver};
use kwscan::{Capabilities, Config, KeywordSet, ResultSink, ScanError, ScanRequest, Scanner};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn request_for(root: &Path, caps: Capabilities) -> ScanRequest {
    let config = Config {
        roots: vec![root.to_path_buf()],
        workers: 2,
        ..Config::default()
    };
    config.to_request(caps).unwrap()
}

fn offline_caps() -> Capabilities {
    // No external binaries in play; pure-Rust backends only.
    Capabilities {
        pdf: true,
        docx: true,
        spreadsheet: true,
        ocr: false,
        sevenz: false,
        rar: false,
    }
}

fn scan(request: ScanRequest, keywords: KeywordSet) -> kwscan::ScanOutcome {
    let sink = ResultSink::new();
    Scanner::new(request, keywords)
        .run(&sink, &NullObserver, &CancelToken::new())
        .unwrap()
}

#[test]
fn finds_keywords_in_plain_text_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "This Invoice needs review").unwrap();
    fs::write(dir.path().join("b.txt"), "nothing relevant here").unwrap();

    let keywords = KeywordSet::from_terms(["invoice", "urgent"]).unwrap();
    let outcome = scan(request_for(dir.path(), offline_caps()), keywords);

    assert_eq!(outcome.matched_files(), 1);
    let (path, found) = outcome.matches.iter().next().unwrap();
    assert!(path.ends_with("a.txt"));
    assert_eq!(found.len(), 1);
    assert!(found.contains("invoice"));
    assert_eq!(outcome.processed, 2);
}

#[test]
fn zip_entries_are_reported_under_virtual_paths() {
    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("bundle.zip");
    let mut writer = zip::ZipWriter::new(File::create(&archive_path).unwrap());
    writer
        .start_file("doc.txt", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"urgent memo").unwrap();
    writer.finish().unwrap();

    let keywords = KeywordSet::from_terms(["urgent"]).unwrap();
    let outcome = scan(request_for(dir.path(), offline_caps()), keywords);

    assert_eq!(outcome.matched_files(), 1);
    let (path, found) = outcome.matches.iter().next().unwrap();
    assert!(path.ends_with("bundle.zip!doc.txt"), "got {path}");
    assert!(found.contains("urgent"));
}

#[test]
fn oversized_files_never_reach_an_extractor() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("big.txt"), "invoice ".repeat(1024)).unwrap();
    fs::write(dir.path().join("small.txt"), "invoice").unwrap();

    let config = Config {
        roots: vec![dir.path().to_path_buf()],
        max_file_size_mb: 0, // every non-empty file is over the limit
        ..Config::default()
    };
    let request = config.to_request(offline_caps()).unwrap();
    let keywords = KeywordSet::from_terms(["invoice"]).unwrap();
    let outcome = scan(request, keywords);

    assert_eq!(outcome.filtered_size, 2);
    assert_eq!(outcome.processed, 0);
    assert!(outcome.matches.is_empty());
    assert!(outcome.errors.is_empty());
}

#[test]
fn one_corrupt_file_does_not_suppress_siblings() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.zip"), "definitely not a zip").unwrap();
    fs::write(dir.path().join("good.txt"), "urgent invoice").unwrap();

    let keywords = KeywordSet::from_terms(["urgent"]).unwrap();
    let outcome = scan(request_for(dir.path(), offline_caps()), keywords);

    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.matched_files(), 1);
    assert!(outcome
        .matches
        .keys()
        .next()
        .unwrap()
        .ends_with("good.txt"));
}

#[test]
fn capability_gated_files_are_skipped_not_errored() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("x.png"), "fake image bytes").unwrap();
    fs::write(dir.path().join("a.txt"), "invoice").unwrap();

    let keywords = KeywordSet::from_terms(["invoice"]).unwrap();
    let outcome = scan(request_for(dir.path(), offline_caps()), keywords);

    assert_eq!(outcome.skipped_capability, 1);
    assert_eq!(outcome.processed, 1);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.matched_files(), 1);
}

#[test]
fn repeated_scans_yield_identical_matches() {
    let dir = TempDir::new().unwrap();
    for i in 0..20 {
        fs::write(
            dir.path().join(format!("file{i}.txt")),
            format!("note {i}: invoice pending"),
        )
        .unwrap();
    }

    let run = || {
        let keywords = KeywordSet::from_terms(["invoice"]).unwrap();
        scan(request_for(dir.path(), offline_caps()), keywords).matches
    };
    assert_eq!(run(), run());
}

#[test]
fn every_candidate_is_processed_exactly_once() {
    let dir = TempDir::new().unwrap();
    for i in 0..50 {
        fs::write(dir.path().join(format!("f{i}.txt")), "text").unwrap();
    }
    let keywords = KeywordSet::from_terms(["absent"]).unwrap();
    let outcome = scan(request_for(dir.path(), offline_caps()), keywords);
    assert_eq!(outcome.processed, 50);
    assert!(outcome.matches.is_empty());
}

struct CancelAfter {
    seen: AtomicUsize,
    after: usize,
    cancel: CancelToken,
}

impl ScanObserver for CancelAfter {
    fn on_progress(&self, _event: &ProgressEvent) {
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.cancel.cancel();
        }
    }
}

#[test]
fn cancellation_stops_the_pool_promptly() {
    let dir = TempDir::new().unwrap();
    let total = 40;
    for i in 0..total {
        fs::write(dir.path().join(format!("f{i}.txt")), "invoice").unwrap();
    }

    let cancel_after = 3;
    let workers = 2;
    let config = Config {
        roots: vec![dir.path().to_path_buf()],
        workers,
        ..Config::default()
    };
    let request = config.to_request(offline_caps()).unwrap();
    let keywords = KeywordSet::from_terms(["invoice"]).unwrap();

    let cancel = CancelToken::new();
    let observer = CancelAfter {
        seen: AtomicUsize::new(0),
        after: cancel_after,
        cancel: cancel.clone(),
    };
    let sink = ResultSink::new();
    let outcome = Scanner::new(request, keywords)
        .run(&sink, &observer, &cancel)
        .unwrap();

    assert!(outcome.cancelled);
    assert!(
        outcome.processed <= cancel_after + workers,
        "processed {} files after cancelling at {}",
        outcome.processed,
        cancel_after
    );
    assert!(outcome.processed < total);
}

#[test]
fn progress_counts_are_monotonic_and_complete() {
    let dir = TempDir::new().unwrap();
    for i in 0..10 {
        fs::write(dir.path().join(format!("f{i}.txt")), "x").unwrap();
    }

    struct Monotonic {
        last: AtomicUsize,
        total_seen: AtomicUsize,
    }
    impl ScanObserver for Monotonic {
        fn on_progress(&self, event: &ProgressEvent) {
            let last = self.last.swap(event.processed, Ordering::SeqCst);
            assert!(event.processed > last);
            assert_eq!(event.total, Some(10));
            self.total_seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    let observer = Monotonic {
        last: AtomicUsize::new(0),
        total_seen: AtomicUsize::new(0),
    };
    let keywords = KeywordSet::from_terms(["x"]).unwrap();
    let sink = ResultSink::new();
    Scanner::new(request_for(dir.path(), offline_caps()), keywords)
        .run(&sink, &observer, &CancelToken::new())
        .unwrap();
    assert_eq!(observer.total_seen.load(Ordering::SeqCst), 10);
}

#[cfg(unix)]
#[test]
fn timed_out_file_is_counted_and_siblings_complete() {
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("ok.txt"), "invoice").unwrap();
    fs::write(root.join("wedged.7z"), "contents never reached").unwrap();

    // Stand-in 7z that hangs far past the per-file budget.
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    let fake = bin.join("7z");
    fs::write(&fake, "#!/bin/sh\nsleep 30\n").unwrap();
    fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();
    let path_var = std::env::var("PATH").unwrap_or_default();
    std::env::set_var("PATH", format!("{}:{path_var}", bin.display()));

    let mut caps = offline_caps();
    caps.sevenz = true;
    let config = Config {
        roots: vec![root],
        workers: 2,
        ..Config::default()
    };
    let mut request = config.to_request(caps).unwrap();
    request.per_file_timeout = Duration::from_millis(300);

    let keywords = KeywordSet::from_terms(["invoice"]).unwrap();
    let outcome = scan(request, keywords);

    assert_eq!(outcome.timeouts, 1);
    assert_eq!(outcome.processed, 2);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.matched_files(), 1);
    assert!(outcome.matches.keys().next().unwrap().ends_with("ok.txt"));
}

#[test]
fn missing_root_is_recoverable_when_another_exists() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "invoice").unwrap();
    let missing = dir.path().join("does-not-exist");

    let config = Config {
        roots: vec![missing, dir.path().to_path_buf()],
        ..Config::default()
    };
    let request = config.to_request(offline_caps()).unwrap();
    let keywords = KeywordSet::from_terms(["invoice"]).unwrap();
    let outcome = scan(request, keywords);

    assert_eq!(outcome.matched_files(), 1);
    assert_eq!(outcome.errors.len(), 1);
}

#[test]
fn all_roots_missing_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        roots: vec![dir.path().join("nope")],
        ..Config::default()
    };
    let request = config.to_request(offline_caps()).unwrap();
    let keywords = KeywordSet::from_terms(["invoice"]).unwrap();
    let sink = ResultSink::new();
    let result = Scanner::new(request, keywords).run(&sink, &NullObserver, &CancelToken::new());
    assert!(matches!(result, Err(ScanError::NoUsableRoots)));
}

#[test]
fn matches_are_written_to_the_results_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), "invoice here").unwrap();
    // Keep the results file outside the scanned root.
    let out_path = dir.path().join("results.out");

    let sink = ResultSink::open(&out_path).unwrap();
    let keywords = KeywordSet::from_terms(["invoice"]).unwrap();
    Scanner::new(request_for(&root, offline_caps()), keywords)
        .run(&sink, &NullObserver, &CancelToken::new())
        .unwrap();
    sink.finish();
    drop(sink);

    let content = fs::read_to_string(&out_path).unwrap();
    assert!(content.starts_with("Search results"));
    assert!(content.contains("Keywords found: invoice"));
    assert!(content.contains("Finished: "));
}
