//! **Speech-to-Text (STT)**: diarized transcription of a loaded [`AudioClip`].
//!
//! Implement `TranscriptionProvider` for any backend. The transcript is returned exactly as
//! the backend produced it: no trimming, no speaker-label rewriting.

use crate::audio::AudioClip;
use crate::error::{VoiceError, VoiceResult};
use std::time::Duration;
use tracing::debug;

/// Backend that turns a whole audio clip into transcript text.
#[async_trait::async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe(&self, clip: &AudioClip) -> VoiceResult<String>;
}

/// Placeholder STT: returns a fixed string. Use for wiring tests without an API key.
#[derive(Debug, Default)]
pub struct PlaceholderTranscriber {
    /// If set, return this instead of the default message.
    pub response: Option<String>,
}

impl PlaceholderTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(s: impl Into<String>) -> Self {
        Self {
            response: Some(s.into()),
        }
    }
}

#[async_trait::async_trait]
impl TranscriptionProvider for PlaceholderTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> VoiceResult<String> {
        if let Some(ref r) = self.response {
            return Ok(r.clone());
        }
        Ok(format!(
            "[STT placeholder: {} ({} bytes); configure an API key for real transcription]",
            clip.file_name,
            clip.len()
        ))
    }
}

/// OpenAI-compatible `/audio/transcriptions` backend (diarizing model by default).
#[derive(Debug, Clone)]
pub struct OpenAiTranscriber {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Model: gpt-4o-transcribe-diarize, whisper-1, etc.
    pub model: String,
    client: reqwest::Client,
}

impl OpenAiTranscriber {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> VoiceResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(VoiceError::Config("transcription requires an API key".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            model: model.into(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }

    /// Diarizing models reject clips over 30 seconds unless a chunking strategy is sent.
    fn requires_chunking(&self) -> bool {
        self.model.contains("diarize")
    }
}

#[async_trait::async_trait]
impl TranscriptionProvider for OpenAiTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> VoiceResult<String> {
        let part = reqwest::multipart::Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str(clip.mime)
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "text");
        if self.requires_chunking() {
            form = form.text("chunking_strategy", "auto");
        }

        debug!(model = %self.model, file = %clip.file_name, bytes = clip.len(), "transcription request");
        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {}: {}", status, body)));
        }
        res.text().await.map_err(|e| VoiceError::Stt(e.to_string()))
    }
}
