// SPDX-License-Identifier: MIT

//! Run configuration for a single scan
//!
//! A `RunConfig` is built once from caller input, validated, and never
//! mutated after the scan starts. Backend-specific knobs live inside the
//! `BackendConfig` variant for that backend rather than as loose fields.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Result, ScanError};

/// Frozen parameters for one scan
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RunConfig {
    /// Subject the classifier looks for (non-empty)
    pub keyword: String,

    /// Enumeration root
    pub root: PathBuf,

    /// Descend into subdirectories
    pub recursive: bool,

    /// Selected classifier backend and its parameters
    pub backend: BackendConfig,

    /// Where matched files go after the scan; `None` disables disposition
    #[serde(default)]
    pub destination: Option<PathBuf>,

    /// Copy or move matched files
    #[serde(default)]
    pub disposition: DispositionMode,
}

/// Classifier backend selection with per-backend parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Google Gemini vision API
    Gemini { api_key: String },

    /// OpenAI chat completions with image input
    OpenAi { api_key: String },

    /// DeepSeek vision chat (OpenAI-compatible wire shape)
    DeepSeek { api_key: String },

    /// Local Ollama inference server
    Ollama {
        /// Vision model name, e.g. "llava"
        model: String,
        #[serde(default)]
        mode: AnalysisMode,
        /// Match cutoff for confidence mode (1-10)
        #[serde(default = "default_threshold")]
        threshold: u8,
        #[serde(default)]
        prompt_style: PromptStyle,
        #[serde(default = "default_temperature")]
        temperature: f64,
    },
}

/// How the local backend extracts an answer
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Ask for a 1-10 certainty score, match at or above the threshold
    #[default]
    Confidence,
    /// Ask for a direct yes/no answer
    YesNo,
}

/// Prompt construction strategy in yes/no mode
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    #[default]
    Simple,
    /// Chain-of-thought: describe first, then answer on the final line
    Cot,
}

/// What happens to matched files at the destination
///
/// Same-named files already present at the destination are overwritten.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispositionMode {
    #[default]
    Copy,
    Move,
}

fn default_threshold() -> u8 {
    8
}

fn default_temperature() -> f64 {
    0.1
}

impl BackendConfig {
    /// Human-readable backend name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Gemini { .. } => "Google",
            BackendConfig::OpenAi { .. } => "ChatGPT",
            BackendConfig::DeepSeek { .. } => "DeepSeek",
            BackendConfig::Ollama { .. } => "Ollama",
        }
    }
}

impl RunConfig {
    /// Check all fields before any scan state is created
    ///
    /// Failures here abort the run synchronously; no classifier is ever
    /// invoked for an invalid configuration.
    pub fn validate(&self) -> Result<()> {
        if self.keyword.trim().is_empty() {
            return Err(ScanError::Validation(
                "keyword must not be empty".to_string(),
            ));
        }

        if !self.root.is_dir() {
            return Err(ScanError::Validation(format!(
                "image directory not found: {}",
                self.root.display()
            )));
        }

        match &self.backend {
            BackendConfig::Gemini { api_key }
            | BackendConfig::OpenAi { api_key }
            | BackendConfig::DeepSeek { api_key } => {
                if api_key.trim().is_empty() {
                    return Err(ScanError::Validation(format!(
                        "API key is required for provider '{}'",
                        self.backend.name()
                    )));
                }
            }
            BackendConfig::Ollama {
                model, threshold, ..
            } => {
                if model.trim().is_empty() {
                    return Err(ScanError::Validation(
                        "model name is required for the Ollama backend".to_string(),
                    ));
                }
                if !(1..=10).contains(threshold) {
                    return Err(ScanError::Validation(format!(
                        "confidence threshold must be between 1 and 10, got {}",
                        threshold
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(root: PathBuf) -> RunConfig {
        RunConfig {
            keyword: "bird".to_string(),
            root,
            recursive: true,
            backend: BackendConfig::Ollama {
                model: "llava".to_string(),
                mode: AnalysisMode::Confidence,
                threshold: 8,
                prompt_style: PromptStyle::Simple,
                temperature: 0.1,
            },
            destination: None,
            disposition: DispositionMode::Copy,
        }
    }

    #[test]
    fn valid_config_passes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(base_config(dir.path().to_path_buf()).validate().is_ok());
    }

    #[test]
    fn empty_keyword_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = base_config(dir.path().to_path_buf());
        config.keyword = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ScanError::Validation(_))
        ));
    }

    #[test]
    fn missing_root_rejected() {
        let config = base_config(PathBuf::from("/nonexistent/imagehound-test"));
        assert!(matches!(
            config.validate(),
            Err(ScanError::Validation(_))
        ));
    }

    #[test]
    fn remote_backend_requires_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = base_config(dir.path().to_path_buf());
        config.backend = BackendConfig::Gemini {
            api_key: String::new(),
        };
        assert!(matches!(
            config.validate(),
            Err(ScanError::Validation(_))
        ));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = base_config(dir.path().to_path_buf());
        config.backend = BackendConfig::Ollama {
            model: "llava".to_string(),
            mode: AnalysisMode::Confidence,
            threshold: 11,
            prompt_style: PromptStyle::Simple,
            temperature: 0.1,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn backend_config_roundtrip() {
        let backend = BackendConfig::Ollama {
            model: "llava".to_string(),
            mode: AnalysisMode::YesNo,
            threshold: 8,
            prompt_style: PromptStyle::Cot,
            temperature: 0.2,
        };
        let json = serde_json::to_string(&backend).unwrap();
        assert!(json.contains("\"provider\":\"ollama\""));
        let back: BackendConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "Ollama");
    }
}
