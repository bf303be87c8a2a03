// SPDX-License-Identifier: MIT

//! Local inference classifier (Ollama)
//!
//! Talks to the fixed local generate endpoint. Unlike the remote backends, a
//! connection failure here means the server is down and every later call
//! would fail the same way, so it is reported as `BackendUnavailable` and
//! the orchestrator stops dispatching.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use super::{basename, encode_image, mime_for, Classifier, Verdict};
use crate::config::{AnalysisMode, PromptStyle};
use crate::Result;

const OLLAMA_URL: &str = "http://localhost:11434/api/generate";
const LOCAL_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    images: Vec<String>,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Classifier backed by a local Ollama server
pub struct OllamaClassifier {
    client: Client,
    model: String,
    mode: AnalysisMode,
    threshold: u8,
    prompt_style: PromptStyle,
    temperature: f64,
}

impl OllamaClassifier {
    pub fn new(
        model: String,
        mode: AnalysisMode,
        threshold: u8,
        prompt_style: PromptStyle,
        temperature: f64,
    ) -> Result<Self> {
        let client = Client::builder().timeout(LOCAL_TIMEOUT).build()?;
        Ok(Self {
            client,
            model,
            mode,
            threshold,
            prompt_style,
            temperature,
        })
    }

    fn prompt(&self, keyword: &str) -> String {
        match (self.mode, self.prompt_style) {
            (AnalysisMode::Confidence, _) => format!(
                "On a scale of 1 to 10, where 1 is 'not at all' and 10 is \
                 'absolutely certain', how confident are you that the main \
                 subject of this image is a '{}'? Your response must be only \
                 the number.",
                keyword
            ),
            (AnalysisMode::YesNo, PromptStyle::Cot) => format!(
                "First, briefly describe the image in one sentence. Then, \
                 based on your description, determine if a '{}' is the main \
                 subject. Finally, answer with a single word on a new line: \
                 'yes' or 'no'.",
                keyword
            ),
            (AnalysisMode::YesNo, PromptStyle::Simple) => format!(
                "You are an expert image analyst. Your only task is to \
                 determine if the main subject of the image is a '{}'. Your \
                 entire response must be a single word: 'yes' or 'no'. Is \
                 the main subject a '{}'?",
                keyword, keyword
            ),
        }
    }

    fn read_verdict(&self, response_text: &str, path: &Path) -> Verdict {
        let text = response_text.trim().to_lowercase();
        match self.mode {
            AnalysisMode::Confidence => match parse_score(&text) {
                Some(score) if score >= self.threshold as i64 => Verdict::Match,
                Some(_) => Verdict::NoMatch,
                None => {
                    warn!(
                        "Error (Ollama) with {}: non-numeric confidence reply {:?}",
                        basename(path),
                        response_text.trim()
                    );
                    Verdict::Error(format!(
                        "non-numeric confidence reply: {:?}",
                        response_text.trim()
                    ))
                }
            },
            AnalysisMode::YesNo => {
                // The chain-of-thought prompt puts the answer on the last line
                let final_answer = text.lines().last().unwrap_or("").trim();
                if final_answer.contains("yes") {
                    Verdict::Match
                } else {
                    Verdict::NoMatch
                }
            }
        }
    }
}

/// Parse the leading integer out of a confidence reply ("8", "8.5", "9/10")
fn parse_score(text: &str) -> Option<i64> {
    let head = text.split(['.', '/']).next()?.trim();
    head.parse().ok()
}

#[async_trait]
impl Classifier for OllamaClassifier {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    async fn classify(&self, path: &Path, keyword: &str) -> Verdict {
        if mime_for(path).is_none() {
            return Verdict::NoMatch;
        }
        let image = match encode_image(path) {
            Ok(data) => data,
            Err(e) => {
                return Verdict::Error(format!(
                    "error reading file {}: {}",
                    basename(path),
                    e
                ))
            }
        };

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: self.prompt(keyword),
            stream: false,
            images: vec![image],
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        debug!(
            "Sending vision request to Ollama: model={} file={}",
            self.model,
            basename(path)
        );

        let response = match self.client.post(OLLAMA_URL).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                // The server itself is gone; every later call fails too
                warn!("Could not connect to Ollama server: {}", e);
                return Verdict::BackendUnavailable;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(
                "Error (Ollama) with {}: status {}",
                basename(path),
                status
            );
            return Verdict::Error(format!("bad status code {}", status));
        }

        let body: GenerateResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Error (Ollama) with {}: {}", basename(path), e);
                return Verdict::Error(format!("malformed response: {}", e));
            }
        };

        self.read_verdict(&body.response, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn classifier(mode: AnalysisMode, threshold: u8, style: PromptStyle) -> OllamaClassifier {
        OllamaClassifier::new("llava".to_string(), mode, threshold, style, 0.1).unwrap()
    }

    #[test]
    fn confidence_score_at_threshold_matches() {
        let c = classifier(AnalysisMode::Confidence, 8, PromptStyle::Simple);
        let path = PathBuf::from("a.jpg");
        assert_eq!(c.read_verdict("8", &path), Verdict::Match);
        assert_eq!(c.read_verdict("10", &path), Verdict::Match);
        assert_eq!(c.read_verdict("7", &path), Verdict::NoMatch);
    }

    #[test]
    fn confidence_handles_decorated_numbers() {
        let c = classifier(AnalysisMode::Confidence, 8, PromptStyle::Simple);
        let path = PathBuf::from("a.jpg");
        assert_eq!(c.read_verdict("9.5", &path), Verdict::Match);
        assert_eq!(c.read_verdict("8/10", &path), Verdict::Match);
    }

    #[test]
    fn confidence_rejects_prose() {
        let c = classifier(AnalysisMode::Confidence, 8, PromptStyle::Simple);
        let verdict = c.read_verdict("I am quite sure", &PathBuf::from("a.jpg"));
        assert!(matches!(verdict, Verdict::Error(_)));
    }

    #[test]
    fn yesno_reads_final_line() {
        let c = classifier(AnalysisMode::YesNo, 8, PromptStyle::Cot);
        let path = PathBuf::from("a.jpg");
        let cot_reply = "The image shows a small bird on a branch.\nyes";
        assert_eq!(c.read_verdict(cot_reply, &path), Verdict::Match);
        let cot_no = "The image shows a yes-shaped cloud.\nno";
        assert_eq!(c.read_verdict(cot_no, &path), Verdict::NoMatch);
    }

    #[test]
    fn prompt_varies_with_mode() {
        let conf = classifier(AnalysisMode::Confidence, 8, PromptStyle::Simple);
        assert!(conf.prompt("bird").contains("scale of 1 to 10"));
        let cot = classifier(AnalysisMode::YesNo, 8, PromptStyle::Cot);
        assert!(cot.prompt("bird").contains("describe the image"));
        let simple = classifier(AnalysisMode::YesNo, 8, PromptStyle::Simple);
        assert!(simple.prompt("bird").contains("single word"));
    }

    #[test]
    fn request_wire_shape() {
        let request = GenerateRequest {
            model: "llava".to_string(),
            prompt: "p".to_string(),
            stream: false,
            images: vec!["AAAA".to_string()],
            options: GenerateOptions { temperature: 0.1 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llava");
        assert_eq!(json["stream"], false);
        assert_eq!(json["images"][0], "AAAA");
        assert_eq!(json["options"]["temperature"], 0.1);
    }
}
