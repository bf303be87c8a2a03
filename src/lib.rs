// SPDX-License-Identifier: MIT

//! Imagehound: AI-powered subject scanner
//!
//! Walks a directory tree for images and asks a vision model, local or
//! cloud, whether each one shows a given subject. Matches can then be
//! copied or moved into a destination folder.

pub mod classifier;
pub mod config;
pub mod disposition;
pub mod error;
pub mod scan;
pub mod sink;
pub mod walker;

pub use config::RunConfig;
pub use error::{Result, ScanError};
pub use scan::{run_scan, ScanOutcome, ScanReport};
pub use sink::{CancelFlag, ScanSink};
