// SPDX-License-Identifier: MIT

//! Front-end facing callbacks and the cancellation flag
//!
//! The log stream is the sole error-reporting channel while a scan runs;
//! both sinks may be called from any worker context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress and log sinks supplied by the front end
pub trait ScanSink: Send + Sync {
    /// Completion percentage, 0-100, non-decreasing over a run
    fn progress(&self, percent: f64);

    /// One human-readable log line
    fn log(&self, line: &str);
}

/// Set-once cooperative cancellation signal
///
/// Raising the flag stops new dispatch within one task-dispatch cycle;
/// in-flight classifications always run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal; there is no way to lower it again
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ScanSink;
    use std::sync::Mutex;

    /// Sink that records everything it receives, for assertions
    #[derive(Default)]
    pub struct RecordingSink {
        pub lines: Mutex<Vec<String>>,
        pub percents: Mutex<Vec<f64>>,
    }

    impl RecordingSink {
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        pub fn percents(&self) -> Vec<f64> {
            self.percents.lock().unwrap().clone()
        }
    }

    impl ScanSink for RecordingSink {
        fn progress(&self, percent: f64) {
            self.percents.lock().unwrap().push(percent);
        }

        fn log(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }
}
