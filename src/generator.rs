//! Generation client for the external completion endpoint
//!
//! Calls an Ollama-style `/api/generate` endpoint and sanitizes the raw
//! model output: reasoning tags and control characters are stripped, and
//! answers that match a configured hallucination blacklist without citing
//! any source are replaced with the canonical no-information message.

use crate::config::GeneratorConfig;
use crate::error::{GenerationError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Canonical answer when the model output was filtered as ungrounded
pub const NO_RELEVANT_INFORMATION: &str =
    "No relevant information found in the provided parliamentary records.";

/// Canonical answer when generation failed outright
pub const GENERATION_ERROR_ANSWER: &str =
    "Sorry, I encountered an error generating the response.";

/// Canonical answer when the model timed out
pub const SLOW_MODEL_ANSWER: &str =
    "The AI model is responding slowly. Please try a simpler question or try again later.";

/// Footer appended to substantive answers that cite no source
pub const VERIFICATION_FOOTER: &str =
    "\n\n[Note: Please refer to the source excerpts for verification]";

/// Result of one generation call
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub text: String,
    pub model: String,
}

/// Trait for the generative model service
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate and sanitize an answer for the prompt
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<GenerationOutput>;

    /// Whether the service is reachable and the configured model present
    async fn health(&self) -> bool;

    /// List models available at the service
    async fn list_models(&self) -> Result<Vec<String>>;

    /// The configured model name
    fn model_name(&self) -> &str;
}

/// Ollama generation client
pub struct OllamaGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
    suspicious: Vec<Regex>,
}

/// Ollama API request for generation
#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
    stop: Vec<String>,
}

/// Ollama API response for generation
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    model: Option<String>,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModelInfo>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelInfo {
    name: String,
}

fn think_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>|<thinking>.*?</thinking>").expect("static regex"))
}

fn cjk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{4e00}-\u{9fff}]+").expect("static regex"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("static regex"))
}

impl OllamaGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to create HTTP client");

        let suspicious = config
            .suspicious_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid suspicious pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();

        Self {
            client,
            config,
            suspicious,
        }
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/{}",
            self.config.url.trim_end_matches('/'),
            endpoint
        )
    }

    /// Post-process raw model output.
    ///
    /// Strips reasoning tags, control characters and (optionally) CJK
    /// blocks, collapses blank-line runs, applies the hallucination
    /// filter, and appends the verification footer to substantive
    /// uncited answers.
    pub fn sanitize(&self, raw: &str) -> String {
        let answer = think_tag_re().replace_all(raw, "");

        let answer = if self.config.strip_cjk {
            cjk_re().replace_all(&answer, "").into_owned()
        } else {
            answer.into_owned()
        };

        let answer: String = answer
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();

        let answer = blank_lines_re().replace_all(&answer, "\n\n");
        let answer = answer.trim();

        let has_citation = answer.contains("[#");

        if !has_citation {
            let answer_lower = answer.to_lowercase();
            let suspicious = self
                .suspicious
                .iter()
                .any(|pattern| pattern.is_match(&answer_lower));
            if suspicious {
                warn!("Model response appears to ignore provided context");
                return NO_RELEVANT_INFORMATION.to_string();
            }
        }

        if !has_citation && answer.len() > 50 {
            return format!("{}{}", answer, VERIFICATION_FOOTER);
        }

        answer.to_string()
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<GenerationOutput> {
        debug!("Generating answer, prompt length {}", prompt.len());

        let request = OllamaGenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature,
                top_p: self.config.top_p,
                repeat_penalty: self.config.repeat_penalty,
                stop: self.config.stop.clone(),
            },
        };

        let response = timeout(
            Duration::from_secs(self.config.timeout),
            self.client
                .post(self.api_url("generate"))
                .json(&request)
                .send(),
        )
        .await
        .map_err(|_| GenerationError::Timeout)?
        .map_err(|e| GenerationError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Generation API error: {}", error_text);
            return Err(GenerationError::GenerationFailed(error_text).into());
        }

        let body: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let text = self.sanitize(&body.response);
        info!("Generated answer of {} chars", text.len());

        Ok(GenerationOutput {
            text,
            model: body.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    async fn health(&self) -> bool {
        match self.list_models().await {
            Ok(models) => {
                let available = models
                    .iter()
                    .any(|model| model.contains(&self.config.model));
                if !available {
                    warn!(
                        "Generator reachable but model {} not found",
                        self.config.model
                    );
                }
                available
            }
            Err(e) => {
                error!("Cannot connect to generator: {}", e);
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = timeout(
            Duration::from_secs(self.config.timeout),
            self.client.get(self.api_url("tags")).send(),
        )
        .await
        .map_err(|_| GenerationError::Timeout)?
        .map_err(|e| GenerationError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::GenerationFailed(error_text).into());
        }

        let body: OllamaModelsResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        Ok(body.models.into_iter().map(|m| m.name).collect())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
