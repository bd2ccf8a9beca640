use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn, error};

use crate::config::{Lang, ProviderConfig};
use crate::error::{Error, Result};
use super::traits::{ProviderInfo, TranslationProvider};
use super::types::{ProviderTranslation, UNKNOWN_LANG};

/// Confidence reported when source and target are the same language
const PASSTHROUGH_CONFIDENCE: f32 = 1.0;

/// OpenAI-compatible chat API provider
/// Works with: llama.cpp server, Ollama, DeepSeek, OpenAI, etc.
///
/// Chat models do not report a quality estimate, so every answer carries the
/// configured confidence.
pub struct OpenAiProvider {
    client: Client,
    /// Base URL for the API (e.g., "http://localhost:8080/v1")
    pub api_base: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Confidence attached to every translation
    pub confidence: f32,
    /// Number of attempts per translation
    pub retry_count: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::provider(&config.name, format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            confidence: config.confidence,
            retry_count: config.retry_count.max(1),
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    /// Create translation prompt
    fn create_prompt(text: &str, source: Option<&Lang>, target: &Lang) -> String {
        let source_hint = match source {
            Some(lang) if !lang.is_auto() => format!(" from {}", language_name(lang)),
            _ => String::new(),
        };
        format!(
            "Translate the following subtitle line{} into {}. Output only the translation, no explanations.\n\nText: \"{}\"",
            source_hint,
            language_name(target),
            text
        )
    }

    /// Make API request with retry logic
    async fn request_with_retry(&self, text: &str, source: Option<&Lang>, target: &Lang) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let prompt = Self::create_prompt(text, source, target);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: Some(0.2),
            max_tokens: Some(256),
        };

        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!(
                "Translation request attempt {}/{} to {}",
                attempt + 1,
                self.retry_count,
                url
            );

            let mut req = self.client.post(&url).json(&request);

            if let Some(ref key) = self.api_key {
                req = req.header("Authorization", format!("Bearer {key}"));
            }

            match req.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.json::<ChatResponse>().await {
                            Ok(chat_response) => {
                                if let Some(choice) = chat_response.choices.first() {
                                    let translated = choice.message.content.trim();
                                    // Remove quotes if the model wrapped the response
                                    let translated = translated
                                        .trim_start_matches('"')
                                        .trim_end_matches('"')
                                        .to_string();
                                    return Ok(translated);
                                }
                                last_error = Some(Error::ProviderInvalidResponse(
                                    "No choices in response".to_string(),
                                ));
                            }
                            Err(e) => {
                                warn!("Failed to parse response: {}", e);
                                last_error = Some(Error::ProviderInvalidResponse(e.to_string()));
                            }
                        }
                    } else if response.status().as_u16() == 429 {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse().ok());

                        // No retry here; the dispatcher moves on to the next provider
                        warn!("Rate limited, retry after {:?}s", retry_after);
                        return Err(Error::ProviderRateLimited { retry_after });
                    } else {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        warn!("API error: {} - {}", status, body);
                        last_error = Some(Error::ProviderInvalidResponse(format!(
                            "HTTP {status}: {body}"
                        )));
                    }
                }
                Err(e) => {
                    warn!("Request failed: {}", e);
                    last_error = Some(Error::provider(&self.model, e));
                }
            }

            if attempt + 1 < self.retry_count {
                tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
            }
        }

        error!("Translation failed after {} attempts", self.retry_count);
        Err(last_error.unwrap_or_else(|| Error::provider(&self.model, "no attempt was made")))
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    fn info(&self) -> ProviderInfo {
        let is_local = self.api_base.contains("localhost") || self.api_base.contains("127.0.0.1");
        ProviderInfo {
            kind: "OpenAI Compatible",
            requires_api_key: !is_local,
            is_local,
        }
    }

    async fn translate(
        &self,
        text: &str,
        source: Option<&Lang>,
        target: &Lang,
    ) -> Result<ProviderTranslation> {
        let detected_lang = source
            .filter(|lang| !lang.is_auto())
            .cloned()
            .unwrap_or_else(|| Lang::new(UNKNOWN_LANG));

        // Nothing to do when the languages already match
        if text.trim().is_empty() || source.is_some_and(|s| s == target) {
            return Ok(ProviderTranslation {
                translated_text: text.to_string(),
                confidence: PASSTHROUGH_CONFIDENCE,
                detected_lang,
            });
        }

        let translated_text = self.request_with_retry(text, source, target).await?;
        Ok(ProviderTranslation {
            translated_text,
            confidence: self.confidence,
            detected_lang,
        })
    }

    async fn initialize(&self) -> Result<()> {
        if self.info().requires_api_key && self.api_key.is_none() {
            return Err(Error::ProviderMissingApiKey);
        }
        debug!("Provider for model {} ready at {}", self.model, self.api_base);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some() || self.info().is_local
    }
}

/// Convert language code to human-readable name for prompts
fn language_name(lang: &Lang) -> &'static str {
    match lang.as_str() {
        "en" => "English",
        "zh-CN" => "Simplified Chinese",
        "zh-TW" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "th" => "Thai",
        "vi" => "Vietnamese",
        // For unknown languages, the LLM should still understand most ISO codes
        _ => "the specified language",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(api_base: &str, api_key: Option<&str>) -> OpenAiProvider {
        let config = ProviderConfig::new("test", api_base, api_key.map(str::to_string), "tiny");
        OpenAiProvider::new(&config).unwrap()
    }

    #[test]
    fn test_language_name() {
        assert_eq!(language_name(&Lang::new("en")), "English");
        assert_eq!(language_name(&Lang::new("zh-CN")), "Simplified Chinese");
        assert_eq!(language_name(&Lang::new("unknown")), "the specified language");
    }

    #[test]
    fn test_prompt_mentions_source_only_when_known() {
        let target = Lang::new("en");
        let with_source = OpenAiProvider::create_prompt("Bonjour", Some(&Lang::new("fr")), &target);
        assert!(with_source.contains("from French"));

        let auto = OpenAiProvider::create_prompt("Bonjour", Some(&Lang::auto()), &target);
        assert!(!auto.contains(" from "));
        assert!(OpenAiProvider::create_prompt("Bonjour", None, &target).contains("into English"));
    }

    #[test]
    fn test_local_endpoint_needs_no_key() {
        assert!(provider("http://localhost:8080/v1", None).is_available());
        assert!(!provider("https://api.openai.com/v1", None).is_available());
        assert!(provider("https://api.openai.com/v1", Some("sk-test")).is_available());
    }

    #[tokio::test]
    async fn test_initialize_requires_key_for_remote_endpoint() {
        let remote = provider("https://api.openai.com/v1", None);
        assert!(matches!(remote.initialize().await, Err(Error::ProviderMissingApiKey)));

        assert!(provider("https://api.openai.com/v1", Some("sk-test")).initialize().await.is_ok());
        assert!(provider("http://127.0.0.1:8080/v1", None).initialize().await.is_ok());
    }

    #[tokio::test]
    async fn test_same_language_passes_through() {
        let p = provider("http://localhost:1/v1", None);
        let lang = Lang::new("en");
        let out = p.translate("Hello.", Some(&lang), &lang).await.unwrap();
        assert_eq!(out.translated_text, "Hello.");
        assert_eq!(out.detected_lang, lang);
        assert!((out.confidence - 1.0).abs() < f32::EPSILON);
    }
}
