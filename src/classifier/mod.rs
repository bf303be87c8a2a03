// SPDX-License-Identifier: MIT

//! Classifier capability: one image in, one verdict out
//!
//! Every backend implements the same contract and folds its own failures
//! into a [`Verdict`] at the call boundary, so the orchestrator never has to
//! unwind a per-image error.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;
use std::sync::Arc;

use crate::config::BackendConfig;
use crate::Result;

/// Classification outcome for one image in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The keyword is the main subject
    Match,
    /// The keyword is not the main subject
    NoMatch,
    /// The backend itself is unreachable; every further call would fail too
    BackendUnavailable,
    /// This image failed (encode, HTTP, parse); the run continues
    Error(String),
}

/// A vision backend that can judge whether a keyword is an image's subject
///
/// Implementations must be safe to invoke concurrently: no mutable state is
/// shared across calls beyond read-only configuration.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Backend name used in log lines
    fn name(&self) -> &'static str;

    /// Classify a single image against the keyword
    async fn classify(&self, path: &Path, keyword: &str) -> Verdict;
}

/// Map a supported extension to its MIME type
///
/// Returns `None` for anything outside the supported set; remote backends
/// treat that as an immediate `NoMatch` rather than an error.
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "cr2" => Some("image/x-canon-cr2"),
        "dng" => Some("image/x-adobe-dng"),
        "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// Read an image and base64-encode it for a vision request
pub fn encode_image(path: &Path) -> std::io::Result<String> {
    let data = std::fs::read(path)?;
    Ok(general_purpose::STANDARD.encode(&data))
}

/// Short display name for log lines
pub(crate) fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Construct the classifier for the selected backend
pub fn build_classifier(backend: &BackendConfig) -> Result<Arc<dyn Classifier>> {
    let classifier: Arc<dyn Classifier> = match backend {
        BackendConfig::Gemini { api_key } => {
            Arc::new(remote::GeminiClassifier::new(api_key.clone())?)
        }
        BackendConfig::OpenAi { api_key } => {
            Arc::new(remote::OpenAiCompatClassifier::openai(api_key.clone())?)
        }
        BackendConfig::DeepSeek { api_key } => {
            Arc::new(remote::OpenAiCompatClassifier::deepseek(api_key.clone())?)
        }
        BackendConfig::Ollama {
            model,
            mode,
            threshold,
            prompt_style,
            temperature,
        } => Arc::new(local::OllamaClassifier::new(
            model.clone(),
            *mode,
            *threshold,
            *prompt_style,
            *temperature,
        )?),
    };
    Ok(classifier)
}
