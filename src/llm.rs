//! Language-model hotel ranking
//!
//! Sends a numbered hotel list and the user's preferences to an
//! OpenAI-compatible chat completions endpoint and asks for the best three
//! zero-based indices. Any failure falls back to local rating order.

use crate::config::{OpenAiConfig, RankingConfig};
use crate::ranking::{HotelRanker, PreferenceRanker, Ranking, RankingMethod, ScoredHotel};
use crate::HotelRecord;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const SYSTEM_PROMPT: &str = "You are a helpful travel assistant.";

/// Language-model specific error types
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Completion request failed with status {status}: {body}")]
    StatusError { status: u16, body: String },

    #[error("Completion response had no content")]
    EmptyReply,

    #[error("Could not parse hotel indices from reply: {0:?}")]
    UnparseableReply(String),

    #[error("Reply contained no usable hotel index: {0:?}")]
    NoValidIndices(String),

    #[error("Invalid reply pattern: {0}")]
    PatternError(#[from] regex::Error),
}

/// Text-generation service used by [`LlmRanker`]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client
pub struct OpenAiChat {
    http_client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(config: &OpenAiConfig) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiChat {
    #[instrument(level = "debug", skip_all)]
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
        });

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        debug!(
            model = %self.model,
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Completion request finished"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::StatusError {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyReply)
    }
}

/// Ranker that asks a language model for the best matches
pub struct LlmRanker {
    backend: Box<dyn ChatBackend>,
    fallback: PreferenceRanker,
    index_pattern: Regex,
}

impl LlmRanker {
    pub fn new(backend: Box<dyn ChatBackend>, config: RankingConfig) -> Result<Self, LlmError> {
        Ok(Self {
            backend,
            fallback: PreferenceRanker::new(config),
            index_pattern: Regex::new(r"\d+(?:\s*,\s*\d+)*")?,
        })
    }

    pub fn build_prompt(&self, hotels: &[HotelRecord], preferences: &str) -> String {
        let top_n = self.fallback.config().top_n;
        let listing = hotels
            .iter()
            .enumerate()
            .map(|(i, hotel)| {
                let rating = hotel
                    .review
                    .score
                    .map(|s| format!("{:.1}", s))
                    .unwrap_or_else(|| crate::UNKNOWN.to_string());
                let facilities = hotel.facility_set().into_iter().collect::<Vec<_>>().join(", ");
                format!("{}: {} | rating {} | facilities: {}", i, hotel.name, rating, facilities)
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "User preferences: \"{preferences}\"\n\n\
             Hotels:\n{listing}\n\n\
             Pick the {top_n} hotels that best match the preferences, best first. \
             Reply with only their zero-based indices as a comma-separated list \
             (for example: 2,0,1) and nothing else."
        )
    }

    /// Indices from the first comma-separated run of integers in `reply`.
    ///
    /// Out-of-range and repeated indices are dropped.
    pub fn parse_indices(&self, reply: &str, len: usize) -> Result<Vec<usize>, LlmError> {
        let run = self
            .index_pattern
            .find(reply)
            .ok_or_else(|| LlmError::UnparseableReply(reply.to_string()))?;

        let mut seen = HashSet::new();
        let indices: Vec<usize> = run
            .as_str()
            .split(',')
            .filter_map(|token| token.trim().parse::<usize>().ok())
            .filter(|&i| i < len && seen.insert(i))
            .collect();

        if indices.is_empty() {
            return Err(LlmError::NoValidIndices(reply.to_string()));
        }
        Ok(indices)
    }

    async fn request_order(
        &self,
        hotels: &[HotelRecord],
        preferences: &str,
    ) -> Result<Vec<usize>, LlmError> {
        let prompt = self.build_prompt(hotels, preferences);
        let reply = self.backend.complete(SYSTEM_PROMPT, &prompt).await?;
        debug!(reply = %reply, "Language model replied");
        self.parse_indices(&reply, hotels.len())
    }
}

#[async_trait]
impl HotelRanker for LlmRanker {
    async fn rank(&self, hotels: Vec<HotelRecord>, preferences: Option<&str>) -> Ranking {
        let preferences = match preferences.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) if !hotels.is_empty() => p,
            _ => return self.fallback.rank(hotels, preferences).await,
        };

        let config = self.fallback.config();
        let candidates = &hotels[..hotels.len().min(config.max_candidates)];

        match self.request_order(candidates, preferences).await {
            Ok(indices) => {
                info!(order = ?indices, "Ranked hotels with language model");
                let ranked = indices
                    .into_iter()
                    .take(config.top_n)
                    .map(|i| {
                        let hotel = candidates[i].clone();
                        let score = self.fallback.score(&hotel, Some(preferences));
                        ScoredHotel { hotel, score }
                    })
                    .collect();
                Ranking {
                    method: RankingMethod::LanguageModel,
                    hotels: ranked,
                }
            }
            Err(e) => {
                warn!(error = %e, "Language model ranking failed, falling back to rating order");
                self.fallback.rank(hotels, None).await
            }
        }
    }
}
