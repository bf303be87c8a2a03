// SPDX-License-Identifier: MIT

//! Scan orchestrator
//!
//! Owns the bounded worker pool and the run-scoped state. One classification
//! task per enumerated image goes into a `JoinSet` capped at [`WORKER_LIMIT`]
//! in-flight calls; a single drain loop consumes completions, so counters and
//! the match accumulator have exactly one writer. Cancellation and backend
//! loss both stop new dispatch and let in-flight calls finish.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

use crate::classifier::{basename, build_classifier, Classifier, Verdict};
use crate::config::RunConfig;
use crate::disposition;
use crate::sink::{CancelFlag, ScanSink};
use crate::walker;
use crate::Result;

/// Maximum classification calls in flight at once
///
/// Small and fixed: remote providers rate-limit, and a local inference
/// server serves one model. Decoupled from the image count.
pub const WORKER_LIMIT: usize = 4;

/// How a run ended
///
/// Validation failures never produce a report; they surface as
/// `Err(ScanError::Validation)` before any scan state exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every enumerated image got a verdict, or the backend was lost and
    /// in-flight work drained
    Completed,
    /// The cancellation signal was observed before natural completion
    Cancelled,
}

/// Aggregated result of one scan
#[derive(Debug)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    /// Per-image verdicts in completion order (not enumeration order)
    pub verdicts: Vec<(PathBuf, Verdict)>,
    /// Paths that classified as matches, in completion order
    pub matched: Vec<PathBuf>,
    /// Images with a terminal verdict other than backend loss
    pub processed: usize,
    /// Images enumerated at the start of the run
    pub total: usize,
    /// The backend became unreachable and dispatch stopped early
    pub backend_lost: bool,
}

/// Run-scoped mutable state, written only by the completion drain loop
struct ScanState {
    verdicts: Vec<(PathBuf, Verdict)>,
    matched: Vec<PathBuf>,
    processed: usize,
    backend_lost: bool,
}

/// Validate the configuration and run a full scan with the configured backend
pub async fn run_scan(
    config: &RunConfig,
    sink: &dyn ScanSink,
    cancel: &CancelFlag,
) -> Result<ScanReport> {
    config.validate()?;
    let classifier = build_classifier(&config.backend)?;
    run_with_classifier(config, classifier, sink, cancel).await
}

/// Run a scan with an explicit classifier
///
/// Validation still happens first, so an invalid configuration aborts
/// before the classifier is ever invoked.
pub async fn run_with_classifier(
    config: &RunConfig,
    classifier: Arc<dyn Classifier>,
    sink: &dyn ScanSink,
    cancel: &CancelFlag,
) -> Result<ScanReport> {
    config.validate()?;

    sink.log("Gathering image files...");
    if config.recursive {
        sink.log("Recursive scan enabled: searching in subdirectories...");
    } else {
        sink.log("Recursive scan disabled: searching in top-level directory only.");
    }

    let images = walker::enumerate(&config.root, config.recursive)?;
    let total = images.len();
    sink.log(&format!("Found {} images to analyze.", total));

    let mut state = ScanState {
        verdicts: Vec::with_capacity(total),
        matched: Vec::new(),
        processed: 0,
        backend_lost: false,
    };

    if images.is_empty() {
        warn!("No compatible images found under {}", config.root.display());
        sink.log("Warning: no compatible images found.");
        return Ok(finish(config, state, total, sink, cancel));
    }

    sink.log(&format!(
        "Starting analysis using '{}' for '{}'...",
        classifier.name(),
        config.keyword
    ));

    let mut queue = images.into_iter();
    let mut pool: JoinSet<(PathBuf, Verdict)> = JoinSet::new();

    loop {
        // Top the pool back up, unless a stop condition was observed
        while pool.len() < WORKER_LIMIT && !state.backend_lost && !cancel.is_cancelled() {
            let Some(path) = queue.next() else { break };
            let classifier = Arc::clone(&classifier);
            let keyword = config.keyword.clone();
            pool.spawn(async move {
                let verdict = classifier.classify(&path, &keyword).await;
                (path, verdict)
            });
        }

        let Some(joined) = pool.join_next().await else {
            break;
        };

        match joined {
            Ok((path, Verdict::BackendUnavailable)) => {
                state.verdicts.push((path, Verdict::BackendUnavailable));
                if !state.backend_lost {
                    state.backend_lost = true;
                    sink.log(&format!(
                        "Error: could not connect to the {} backend. Stopping analysis.",
                        classifier.name()
                    ));
                }
            }
            Ok((path, verdict)) => {
                if let Verdict::Error(detail) = &verdict {
                    sink.log(&format!(
                        "Error ({}) with {}: {}",
                        classifier.name(),
                        basename(&path),
                        detail
                    ));
                }
                if verdict == Verdict::Match {
                    state.matched.push(path.clone());
                }
                state.verdicts.push((path, verdict));
                state.processed += 1;
                sink.progress(state.processed as f64 / total as f64 * 100.0);
            }
            Err(e) => {
                // A panicking task loses its path; log it and keep draining
                warn!("Classification task failed: {}", e);
                sink.log(&format!("Error: classification task failed: {}", e));
            }
        }
    }

    Ok(finish(config, state, total, sink, cancel))
}

/// Emit the summary, run disposition if configured, and build the report
fn finish(
    config: &RunConfig,
    state: ScanState,
    total: usize,
    sink: &dyn ScanSink,
    cancel: &CancelFlag,
) -> ScanReport {
    let outcome = if cancel.is_cancelled() {
        ScanOutcome::Cancelled
    } else {
        ScanOutcome::Completed
    };

    if outcome == ScanOutcome::Cancelled {
        sink.log("Scan stopped by user.");
    }

    if state.matched.is_empty() {
        if outcome == ScanOutcome::Completed && total > 0 {
            sink.log(&format!(
                "No images were found where '{}' is the main subject.",
                config.keyword
            ));
        }
    } else {
        sink.log(&format!(
            "--- Found {} images where '{}' is the main subject ---",
            state.matched.len(),
            config.keyword
        ));
        for path in &state.matched {
            sink.log(&format!("  - {}", basename(path)));
        }
    }

    if let Some(destination) = &config.destination {
        if !state.matched.is_empty() {
            disposition::relocate(&state.matched, destination, config.disposition, sink);
        }
    }

    sink.log("Scan finished.");

    ScanReport {
        outcome,
        verdicts: state.verdicts,
        matched: state.matched,
        processed: state.processed,
        total,
        backend_lost: state.backend_lost,
    }
}
