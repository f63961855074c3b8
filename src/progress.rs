//! Progress bar observer for the CLI.
use crate::scheduler::{ProgressEvent, ScanObserver, ScanOutcome};
use indicatif::{ProgressBar, ProgressStyle};

pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0).with_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files {msg}",
                )
                .unwrap()
                .progress_chars("=>-"),
        );
        Self { bar }
    }

    pub fn finish(&self, outcome: &ScanOutcome) {
        self.bar.finish_with_message(format!(
            "done in {:.2}s: {} files, {} matched",
            outcome.elapsed.as_secs_f64(),
            outcome.processed,
            outcome.matched_files()
        ));
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanObserver for ProgressObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Some(total) = event.total {
            self.bar.set_length(total as u64);
        }
        self.bar.set_position(event.processed as u64);
        if let Some(name) = event.path.file_name().and_then(|n| n.to_str()) {
            self.bar.set_message(name.to_string());
        }
    }
}
