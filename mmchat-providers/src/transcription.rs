//! Voice transcription using a Whisper-compatible API (Groq by default)

use async_trait::async_trait;
use mmchat_core::services::Transcriber;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-large-v3";

/// Transcription errors
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Audio clip is empty")]
    EmptyAudio,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),
}

impl From<TranscriptionError> for mmchat_core::Error {
    fn from(e: TranscriptionError) -> Self {
        mmchat_core::Error::Collaborator(format!("transcription failed: {}", e))
    }
}

/// Whisper API response
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Voice transcription service
#[derive(Clone)]
pub struct TranscriptionService {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
}

impl TranscriptionService {
    /// Create a new transcription service
    ///
    /// # Arguments
    ///
    /// * `api_key` - Optional Groq API key. If None, will try to read from GROQ_API_KEY env var
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_settings(api_key, DEFAULT_API_URL.to_string(), DEFAULT_MODEL.to_string())
    }

    /// Create a new transcription service with custom settings
    pub fn with_settings(api_key: Option<String>, api_url: String, model: String) -> Self {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GROQ_API_KEY").ok());

        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url,
            model,
        }
    }

    /// Check if the service is configured
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Transcribe an in-memory audio clip
    ///
    /// # Supported formats
    ///
    /// - MP3
    /// - WAV
    /// - OGG
    pub async fn transcribe_bytes(
        &self,
        audio: &[u8],
        file_name: &str,
    ) -> Result<String, TranscriptionError> {
        let api_key = self.api_key.as_ref().ok_or(TranscriptionError::NoApiKey)?;
        if audio.is_empty() {
            return Err(TranscriptionError::EmptyAudio);
        }

        let file_part = Part::bytes(audio.to_vec()).file_name(file_name.to_string());
        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Transcription failed: {} - {}", status, error_text);
            return Err(TranscriptionError::ApiError(format!(
                "{}: {}",
                status, error_text
            )));
        }

        let data: WhisperResponse = response.json().await?;
        Ok(data.text)
    }
}

impl Default for TranscriptionService {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Transcriber for TranscriptionService {
    async fn transcribe(&self, audio: &[u8]) -> mmchat_core::Result<String> {
        let file_name = format!("audio.{}", sniff_audio_extension(audio));
        Ok(self.transcribe_bytes(audio, &file_name).await?)
    }
}

/// File extension for an audio clip, judged by its header bytes
fn sniff_audio_extension(audio: &[u8]) -> &'static str {
    if audio.starts_with(b"RIFF") {
        "wav"
    } else if audio.starts_with(b"OggS") {
        "ogg"
    } else {
        "mp3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_service() {
        let service = TranscriptionService::new(Some("test_key".to_string()));
        assert!(service.is_configured());
        assert_eq!(service.model, "whisper-large-v3");
    }

    #[test]
    fn test_with_settings() {
        let service = TranscriptionService::with_settings(
            Some("test_key".to_string()),
            "https://custom.api.com/v1/audio/transcriptions".to_string(),
            "custom-model".to_string(),
        );
        assert!(service.is_configured());
        assert_eq!(
            service.api_url,
            "https://custom.api.com/v1/audio/transcriptions"
        );
        assert_eq!(service.model, "custom-model");
    }

    #[test]
    fn test_sniff_audio_extension() {
        assert_eq!(sniff_audio_extension(b"RIFF....WAVE"), "wav");
        assert_eq!(sniff_audio_extension(b"OggS\0"), "ogg");
        assert_eq!(sniff_audio_extension(b"ID3\x03"), "mp3");
    }

    #[tokio::test]
    async fn test_transcribe_empty_audio() {
        let service = TranscriptionService::new(Some("test_key".to_string()));
        let result = service.transcribe_bytes(&[], "audio.mp3").await;
        assert!(matches!(result, Err(TranscriptionError::EmptyAudio)));
    }

    #[tokio::test]
    async fn test_transcribe_posts_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/audio/transcriptions")
            .match_header("authorization", "Bearer test_key")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"text":"hello from audio"}"#)
            .create_async()
            .await;

        let service = TranscriptionService::with_settings(
            Some("test_key".to_string()),
            format!("{}/audio/transcriptions", server.url()),
            "whisper-large-v3".to_string(),
        );
        let text = service.transcribe(b"RIFF0000WAVEfmt ").await.unwrap();
        assert_eq!(text, "hello from audio");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transcribe_api_error_is_collaborator_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/audio/transcriptions")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let service = TranscriptionService::with_settings(
            Some("test_key".to_string()),
            format!("{}/audio/transcriptions", server.url()),
            "whisper-large-v3".to_string(),
        );
        let err = service.transcribe(b"ID3").await.unwrap_err();
        assert!(matches!(err, mmchat_core::Error::Collaborator(_)));
    }
}
