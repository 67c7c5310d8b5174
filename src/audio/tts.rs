//! Speech synthesis client
//!
//! `SpeechSynthesizer` is the seam the pipeline depends on; the production
//! implementation talks to a Google Cloud TTS-style JSON endpoint and the
//! tests substitute an in-process mock.
//!
//! Each request is retried with exponential backoff. Client errors other
//! than 429 are not retried: the request will not get better by repeating
//! it.

use async_trait::async_trait;
use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::AudioError;
use crate::config::TtsConfig;

/// Synthesizes one chunk of text into a PCM WAV buffer
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AudioError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// HTTP synthesis client against a Google-style `text:synthesize` endpoint.
///
/// The response carries base64-encoded LINEAR16 audio, which decodes to a
/// complete PCM WAV buffer per chunk.
pub struct HttpTtsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    voice: String,
    language_code: String,
    max_retries: u32,
    retry_base: Duration,
}

impl HttpTtsClient {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            voice: config.voice.clone(),
            language_code: config.language_code.clone(),
            max_retries: config.max_retries,
            retry_base: Duration::from_millis(config.retry_base_ms),
        }
    }

    async fn request_once(&self, text: &str) -> Result<Vec<u8>, AudioError> {
        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language_code,
                name: &self.voice,
            },
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AudioError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AudioError::SynthesisRejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| AudioError::DecodeFailed(e.to_string()))?;

        BASE64
            .decode(parsed.audio_content.as_bytes())
            .map_err(|e| AudioError::DecodeFailed(format!("invalid base64 audio: {}", e)))
    }
}

/// True for failures worth retrying: transport errors always, rejected
/// requests only for 429 and server errors.
fn is_retryable(error: &AudioError) -> bool {
    match error {
        AudioError::Transport(_) => true,
        AudioError::SynthesisRejected { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpTtsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AudioError> {
        let attempts = self.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry_base * 2u32.pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            match self.request_once(text).await {
                Ok(audio) => return Ok(audio),
                Err(e) if is_retryable(&e) => {
                    warn!(attempt = attempt + 1, error = %e, "speech synthesis attempt failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AudioError::RetriesExhausted {
            attempts,
            source: match last_error {
                Some(e) => anyhow::Error::new(e),
                None => anyhow::anyhow!("no attempts made"),
            },
        })
    }
}
