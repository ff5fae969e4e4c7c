//! Gemini `generateContent` client with backoff and model fallback
//!
//! Each model in the configured chain gets `max_retries` attempts. Rate
//! limits (429) and overload (503) back off exponentially up to a larger cap,
//! other server and network failures up to a smaller one; both add jitter.
//! Any other 4xx is returned at once: retrying or switching models would
//! not change the answer.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info, warn};
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use super::{Oracle, OracleError, OracleReply, TokenUsage};
use crate::config::OracleConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

impl From<UsageMetadata> for TokenUsage {
    fn from(meta: UsageMetadata) -> Self {
        Self {
            prompt_tokens: meta.prompt_token_count,
            candidates_tokens: meta.candidates_token_count,
            total_tokens: meta.total_token_count,
        }
    }
}

/// What one attempt ended in
enum Attempt {
    Done(OracleReply),
    /// Retry with the overload cap
    Overloaded(String),
    /// Retry with the general cap
    Transient(String),
    /// Give up immediately
    Fatal(OracleError),
}

/// Gemini's schema dialect wants upper-case type names
fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = match (k.as_str(), v) {
                        ("type", Value::String(t)) => Value::String(t.to_uppercase()),
                        _ => to_gemini_schema(v),
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

pub struct GeminiOracle {
    client: Client,
    config: OracleConfig,
}

impl std::fmt::Debug for GeminiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiOracle")
            .field("models", &self.config.models)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiOracle {
    /// # Errors
    ///
    /// Fails on an empty model chain, a blank key or when the HTTP client
    /// cannot be built.
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        if config.api_key.trim().is_empty() {
            return Err(OracleError::Config("API key is empty".into()));
        }
        if config.models.is_empty() {
            return Err(OracleError::Config("no model configured".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OracleError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.config.models
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// `min(cap, 2^(attempt-1))` seconds plus jitter
    fn backoff(&self, attempt: u32, cap_secs: f64) -> Duration {
        let exp = 2f64.powi(attempt.saturating_sub(1).min(30) as i32);
        let jitter = if self.config.jitter_secs > 0.0 {
            rand::rng().random_range(0.0..=self.config.jitter_secs)
        } else {
            0.0
        };
        Duration::from_secs_f64((exp.min(cap_secs) + jitter).max(0.0))
    }

    async fn attempt(&self, model: &str, body: &Value) -> Attempt {
        let response = match self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Attempt::Transient(format!("request failed: {e}")),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<GenerateResponse>().await {
                Ok(parsed) => {
                    let text = parsed
                        .candidates
                        .into_iter()
                        .next()
                        .and_then(|c| c.content)
                        .map(|c| {
                            c.parts
                                .into_iter()
                                .filter_map(|p| p.text)
                                .collect::<Vec<_>>()
                                .join("")
                        })
                        .unwrap_or_default();
                    Attempt::Done(OracleReply {
                        text: text.trim().to_string(),
                        usage: parsed.usage_metadata.map(TokenUsage::from).unwrap_or_default(),
                        model: model.to_string(),
                    })
                }
                Err(e) => Attempt::Transient(format!("unreadable response body: {e}")),
            };
        }

        let message = response.text().await.unwrap_or_default();
        let message = crate::utils::safe_truncate_chars(message.trim(), 300).to_string();

        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                Attempt::Overloaded(format!("HTTP {}: {message}", status.as_u16()))
            }
            s if s.is_server_error() => Attempt::Transient(format!("HTTP {}: {message}", s.as_u16())),
            s => Attempt::Fatal(OracleError::Rejected {
                status: s.as_u16(),
                message,
            }),
        }
    }

    async fn run(&self, parts: Vec<Value>, schema: Option<&Value>) -> Result<OracleReply, OracleError> {
        let mut generation = json!({ "temperature": 0.0 });
        if let Some(schema) = schema {
            generation["responseMimeType"] = json!("application/json");
            generation["responseSchema"] = to_gemini_schema(schema);
        }
        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": generation,
        });

        let retries = self.config.max_retries.max(1);
        let mut last_error = String::new();
        let mut last_was_overload = false;

        for (index, model) in self.config.models.iter().enumerate() {
            for attempt in 1..=retries {
                let (cap, reason) = match self.attempt(model, &body).await {
                    Attempt::Done(reply) => {
                        debug!(
                            target: "campusscrape::oracle",
                            "{model}: {} tokens",
                            reply.usage.total_tokens
                        );
                        return Ok(reply);
                    }
                    Attempt::Fatal(err) => {
                        warn!(target: "campusscrape::oracle", "{model}: not retrying: {err}");
                        return Err(err);
                    }
                    Attempt::Overloaded(reason) => {
                        last_was_overload = true;
                        (self.config.max_sleep_overloaded_secs, reason)
                    }
                    Attempt::Transient(reason) => {
                        last_was_overload = false;
                        (self.config.max_sleep_secs, reason)
                    }
                };

                if attempt < retries {
                    let sleep = self.backoff(attempt, cap);
                    info!(
                        target: "campusscrape::oracle",
                        "{model}: {reason} | retry {attempt}/{retries} in {:.1}s",
                        sleep.as_secs_f64()
                    );
                    tokio::time::sleep(sleep).await;
                }
                last_error = reason;
            }

            if let Some(next) = self.config.models.get(index + 1) {
                info!(target: "campusscrape::oracle", "switching model {model} -> {next}");
            }
        }

        warn!(target: "campusscrape::oracle", "all models failed: {last_error}");
        if last_was_overload {
            Err(OracleError::RateLimited(last_error))
        } else if last_error.starts_with("request failed") {
            Err(OracleError::Network(last_error))
        } else {
            Err(OracleError::Server(last_error))
        }
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn generate(&self, prompt: &str, schema: Option<&Value>) -> Result<OracleReply, OracleError> {
        self.run(vec![json!({ "text": prompt })], schema).await
    }

    async fn generate_with_bytes(
        &self,
        prompt: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<OracleReply, OracleError> {
        let parts = vec![
            json!({ "text": prompt }),
            json!({ "inlineData": { "mimeType": mime, "data": BASE64.encode(bytes) } }),
        ];
        self.run(parts, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_types_are_upper_cased() {
        let schema = json!({
            "type": "object",
            "properties": { "type": { "type": "string" } },
            "required": ["type"]
        });
        let converted = to_gemini_schema(&schema);
        assert_eq!(converted["type"], "OBJECT");
        assert_eq!(converted["properties"]["type"]["type"], "STRING");
        assert_eq!(converted["required"][0], "type");
    }

    #[test]
    fn backoff_is_capped() {
        let mut config = OracleConfig::new("key");
        config.jitter_secs = 0.0;
        let oracle = GeminiOracle::new(config).expect("oracle");
        assert_eq!(oracle.backoff(1, 60.0), Duration::from_secs(1));
        assert_eq!(oracle.backoff(4, 60.0), Duration::from_secs(8));
        assert_eq!(oracle.backoff(9, 30.0), Duration::from_secs(30));
    }
}
