// SPDX-License-Identifier: MIT

//! Remote multimodal API classifiers
//!
//! All remote providers share the same scheme: base64 the image, send one
//! request with a fixed yes/no instruction, and read an answer string out of
//! the provider's response shape. A bad status or malformed body marks that
//! image as failed; it never marks the backend unavailable, since a flaky
//! but reachable endpoint may still answer for other images.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use super::{basename, encode_image, mime_for, Classifier, Verdict};
use crate::Result;

const REMOTE_TIMEOUT: Duration = Duration::from_secs(90);

fn subject_prompt(keyword: &str) -> String {
    format!(
        "You are an image analyst. Your task is to determine if '{}' is the \
         main subject. Answer only 'yes' or 'no'.",
        keyword
    )
}

/// Any answer containing "yes" counts as a match, everything else does not
fn answer_is_match(text: &str) -> bool {
    text.to_lowercase().contains("yes")
}

// --- Google Gemini ---

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum GeminiPart {
    Text(String),
    #[serde(rename_all = "camelCase")]
    InlineData { mime_type: String, data: String },
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    text: String,
}

/// Classifier backed by the Gemini generateContent API
pub struct GeminiClassifier {
    client: Client,
    api_key: String,
}

impl GeminiClassifier {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder().timeout(REMOTE_TIMEOUT).build()?;
        Ok(Self { client, api_key })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/\
             gemini-1.5-flash-latest:generateContent?key={}",
            self.api_key
        )
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    fn name(&self) -> &'static str {
        "Google"
    }

    async fn classify(&self, path: &Path, keyword: &str) -> Verdict {
        let Some(mime_type) = mime_for(path) else {
            return Verdict::NoMatch;
        };
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

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text(subject_prompt(keyword)),
                    GeminiPart::InlineData {
                        mime_type: mime_type.to_string(),
                        data: image,
                    },
                ],
            }],
        };

        debug!("Sending Gemini request for {}", basename(path));

        let response = match self.client.post(self.endpoint()).json(&request).send().await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Error (Google) with {}: {}", basename(path), e);
                return Verdict::Error(format!("request failed: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(
                "Warning (Google): bad status code {} for {}",
                status,
                basename(path)
            );
            return Verdict::Error(format!("bad status code {}", status));
        }

        let body: GeminiResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Error (Google) with {}: {}", basename(path), e);
                return Verdict::Error(format!("malformed response: {}", e));
            }
        };

        let answer = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim());

        match answer {
            Some(text) if answer_is_match(text) => Verdict::Match,
            Some(_) => Verdict::NoMatch,
            None => Verdict::NoMatch,
        }
    }
}

// --- OpenAI-compatible chat completions (OpenAI, DeepSeek) ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ChatPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Classifier for providers exposing the OpenAI chat-completions shape
pub struct OpenAiCompatClassifier {
    client: Client,
    api_key: String,
    endpoint: &'static str,
    model: &'static str,
    provider: &'static str,
}

impl OpenAiCompatClassifier {
    pub fn openai(api_key: String) -> Result<Self> {
        Self::new(
            api_key,
            "https://api.openai.com/v1/chat/completions",
            "gpt-4o",
            "ChatGPT",
        )
    }

    pub fn deepseek(api_key: String) -> Result<Self> {
        Self::new(
            api_key,
            "https://api.deepseek.com/v1/chat/completions",
            "deepseek-vl-chat",
            "DeepSeek",
        )
    }

    fn new(
        api_key: String,
        endpoint: &'static str,
        model: &'static str,
        provider: &'static str,
    ) -> Result<Self> {
        let client = Client::builder().timeout(REMOTE_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
            provider,
        })
    }
}

#[async_trait]
impl Classifier for OpenAiCompatClassifier {
    fn name(&self) -> &'static str {
        self.provider
    }

    async fn classify(&self, path: &Path, keyword: &str) -> Verdict {
        let Some(mime_type) = mime_for(path) else {
            return Verdict::NoMatch;
        };
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

        let request = ChatRequest {
            model: self.model.to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ChatPart::Text {
                        text: subject_prompt(keyword),
                    },
                    ChatPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{};base64,{}", mime_type, image),
                        },
                    },
                ],
            }],
            max_tokens: 10,
        };

        debug!(
            "Sending {} request for {}",
            self.provider,
            basename(path)
        );

        let response = match self
            .client
            .post(self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Error ({}) with {}: {}", self.provider, basename(path), e);
                return Verdict::Error(format!("request failed: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(
                "Warning ({}): bad status {} for {}",
                self.provider,
                status,
                basename(path)
            );
            return Verdict::Error(format!("bad status code {}", status));
        }

        let body: ChatResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Error ({}) with {}: {}", self.provider, basename(path), e);
                return Verdict::Error(format!("malformed response: {}", e));
            }
        };

        match body.choices.first() {
            Some(choice) if answer_is_match(choice.message.content.trim()) => {
                Verdict::Match
            }
            Some(_) => Verdict::NoMatch,
            None => Verdict::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn answer_reading_is_containment_based() {
        assert!(answer_is_match("yes"));
        assert!(answer_is_match("Yes."));
        assert!(answer_is_match("I would say yes, it is"));
        assert!(!answer_is_match("no"));
        assert!(!answer_is_match("absolutely not"));
    }

    #[tokio::test]
    async fn unsupported_extension_is_no_match() {
        let classifier = GeminiClassifier::new("key".to_string()).unwrap();
        let verdict = classifier
            .classify(&PathBuf::from("/tmp/whatever.gif"), "bird")
            .await;
        assert_eq!(verdict, Verdict::NoMatch);
    }

    #[tokio::test]
    async fn unreadable_file_is_per_item_error() {
        let classifier = OpenAiCompatClassifier::openai("key".to_string()).unwrap();
        let verdict = classifier
            .classify(&PathBuf::from("/nonexistent/a.jpg"), "bird")
            .await;
        assert!(matches!(verdict, Verdict::Error(_)));
    }

    #[test]
    fn gemini_payload_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text("prompt".to_string()),
                    GeminiPart::InlineData {
                        mime_type: "image/png".to_string(),
                        data: "AAAA".to_string(),
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
    }

    #[test]
    fn chat_payload_shape() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![ChatPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".to_string(),
                    },
                }],
            }],
            max_tokens: 10,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "image_url");
        assert_eq!(json["max_tokens"], 10);
    }
}
