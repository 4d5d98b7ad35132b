use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::TransportError;

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for a Whisper-compatible transcription endpoint. Voice capture
/// posts its WAV here and gets text back.
#[derive(Clone)]
pub struct TranscribeClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl TranscribeClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub async fn transcribe(&self, wav_data: Vec<u8>) -> Result<String, TransportError> {
        let file_part = Part::bytes(wav_data)
            .file_name("capture.wav")
            .mime_str("audio/wav")?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json")
            .text("temperature", "0");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // The endpoint wraps failures in an error object; fall back to
            // the raw body when it doesn't.
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(TransportError::Status {
                status,
                body: message,
            });
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(parsed.text)
    }
}
