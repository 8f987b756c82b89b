//! Progress reporter implementation
//!
//! indicatif-backed live view of a running import: one bar for files
//! processed, one for bytes published, and a status line naming the file
//! currently in flight.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress reporter for import runs
pub struct ProgressReporter {
    multi: MultiProgress,
    /// Bytes published so far
    bytes_bar: ProgressBar,
    /// Candidates processed so far
    files_bar: ProgressBar,
    /// Current status message
    status: ProgressBar,
    start_time: Instant,
    imported: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    bytes_published: AtomicU64,
    enabled: AtomicBool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let status = multi.add(ProgressBar::new_spinner());
        status.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("Invalid template"),
        );

        let files_bar = multi.add(ProgressBar::new(0));
        files_bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} files ({msg})")
                .expect("Invalid template")
                .progress_chars("=> "),
        );
        files_bar.set_prefix("Files");
        files_bar.set_message("0 imported");

        let bytes_bar = multi.add(ProgressBar::new(0));
        bytes_bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold.dim} [{bar:40.green/white}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})")
                .expect("Invalid template")
                .progress_chars("=> "),
        );
        bytes_bar.set_prefix("Data ");

        Self {
            multi,
            bytes_bar,
            files_bar,
            status,
            start_time: Instant::now(),
            imported: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bytes_published: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a disabled progress reporter (for quiet mode)
    pub fn disabled() -> Self {
        let reporter = Self::new();
        reporter.enabled.store(false, Ordering::SeqCst);
        reporter.multi.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Set total candidate count
    pub fn set_total_files(&self, total: u64) {
        self.files_bar.set_length(total);
    }

    /// Set total candidate payload in bytes
    pub fn set_total_bytes(&self, total: u64) {
        self.bytes_bar.set_length(total);
    }

    /// Record one published candidate
    pub fn record_imported(&self, bytes: u64) {
        self.imported.fetch_add(1, Ordering::Relaxed);
        self.bytes_published.fetch_add(bytes, Ordering::Relaxed);
        self.files_bar.inc(1);
        self.bytes_bar.inc(bytes);
        self.update_counts();
    }

    /// Record one skipped candidate
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.files_bar.inc(1);
        self.update_counts();
    }

    /// Record one failed candidate
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.files_bar.inc(1);
        self.update_counts();
    }

    fn update_counts(&self) {
        let imported = self.imported.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);

        let mut message = format!("{} imported", imported);
        if skipped > 0 {
            message.push_str(&format!(", {} skipped", skipped));
        }
        if failed > 0 {
            message.push_str(&format!(", {} failed", failed));
        }
        self.files_bar.set_message(message);
    }

    /// Set current status message
    pub fn set_status(&self, msg: &str) {
        self.status.set_message(msg.to_string());
    }

    /// Set the file currently being processed
    pub fn set_current_file(&self, path: &str) {
        // Truncate long paths, keeping the cut on a char boundary
        let display = if path.len() > 60 {
            let mut start = path.len() - 57;
            while !path.is_char_boundary(start) {
                start += 1;
            }
            format!("...{}", &path[start..])
        } else {
            path.to_string()
        };
        self.status.set_message(display);
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get current publish throughput in bytes/second
    pub fn throughput(&self) -> f64 {
        let bytes = self.bytes_published.load(Ordering::Relaxed);
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            bytes as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Finish progress with success message
    pub fn finish_success(&self, message: &str) {
        self.status.finish_with_message(format!("✓ {}", message));
        self.files_bar.finish();
        self.bytes_bar.finish();
    }

    /// Finish progress with error message
    pub fn finish_error(&self, message: &str) {
        self.status.finish_with_message(format!("✗ {}", message));
        self.files_bar.abandon();
        self.bytes_bar.abandon();
    }

    /// Check if progress is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
