//! Image generation client

use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Fixed style wrapper applied to every user prompt
pub const STYLE_PREAMBLE: &str = "A visually stunning, high-resolution background image \
     for a countdown timer app. Style: cinematic, serene.";

/// Wrap a user prompt in the fixed style preamble
pub fn styled_prompt(user_prompt: &str) -> String {
    format!("{} Prompt: {}", STYLE_PREAMBLE, user_prompt)
}

/// Errors from the image generation collaborator
///
/// All of these surface to the caller as a retryable failure; none of them
/// change timer or background state.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key configured for image generation")]
    MissingApiKey,
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation service returned status {0}: {1}")]
    Status(u16, String),
    #[error("generation service returned no image")]
    EmptyResponse,
    #[error("failed to decode generated image: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// One inline image payload returned by the generation service
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl GeneratedImage {
    /// Render the payload as an inline data URL
    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.data);
        format!("data:{};base64,{}", self.mime_type, encoded)
    }
}

/// Seam for the external image generation service
///
/// The production implementation talks to a remote HTTP API; tests
/// substitute a mock so generation flows can run without a network.
#[async_trait]
pub trait ImageGenerator: Send + Sync + fmt::Debug {
    /// Request exactly one 16:9 JPEG for the given (already styled) prompt
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PromptInstance<'a>>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PromptInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: &'static str,
    output_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: String,
    #[serde(default = "default_mime_type")]
    mime_type: String,
}

fn default_mime_type() -> String {
    "image/jpeg".to_string()
}

fn image_from_response(response: PredictResponse) -> Result<GeneratedImage, GenerationError> {
    let prediction = response
        .predictions
        .into_iter()
        .next()
        .ok_or(GenerationError::EmptyResponse)?;

    let data =
        base64::engine::general_purpose::STANDARD.decode(prediction.bytes_base64_encoded)?;
    Ok(GeneratedImage {
        mime_type: prediction.mime_type,
        data,
    })
}

/// HTTP client for an Imagen-style prediction endpoint
#[derive(Debug, Clone)]
pub struct ImagenClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ImagenClient {
    pub fn new(endpoint: String, model: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
            api_key,
        }
    }

    fn predict_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:predict",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ImageGenerator for ImagenClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(GenerationError::MissingApiKey),
        };

        let request = PredictRequest {
            instances: vec![PromptInstance { prompt }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "16:9",
                output_mime_type: "image/jpeg",
            },
        };

        debug!("Requesting generated image from {}", self.predict_url());
        let response = self
            .client
            .post(self.predict_url())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status(status.as_u16(), body));
        }

        let parsed: PredictResponse = response.json().await?;
        let image = image_from_response(parsed)?;
        info!(
            "Generated image received ({} bytes, {})",
            image.data.len(),
            image.mime_type
        );
        Ok(image)
    }
}

/// Scripted generator for tests
#[cfg(test)]
#[derive(Debug)]
pub struct MockImageGenerator {
    image: Option<GeneratedImage>,
    stall: bool,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockImageGenerator {
    /// Generator that always succeeds with the given payload
    pub fn success(mime_type: &str, data: Vec<u8>) -> Self {
        Self {
            image: Some(GeneratedImage {
                mime_type: mime_type.to_string(),
                data,
            }),
            stall: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Generator that always fails with a retryable error
    pub fn failure() -> Self {
        Self {
            image: None,
            stall: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Generator whose request never resolves
    pub fn stalled() -> Self {
        Self {
            image: None,
            stall: true,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate(&self, _prompt: &str) -> Result<GeneratedImage, GenerationError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.stall {
            futures::future::pending::<()>().await;
        }
        match &self.image {
            Some(image) => Ok(image.clone()),
            None => Err(GenerationError::Status(429, "quota exceeded".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styled_prompt_wraps_user_text() {
        let prompt = styled_prompt("a calm beach at sunset");
        assert!(prompt.starts_with(STYLE_PREAMBLE));
        assert!(prompt.ends_with("Prompt: a calm beach at sunset"));
    }

    #[test]
    fn data_url_encodes_payload() {
        let image = GeneratedImage {
            mime_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8, 0xFF],
        };
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn response_parsing_takes_the_first_prediction() {
        let raw = r#"{
            "predictions": [
                {"bytesBase64Encoded": "AQID", "mimeType": "image/jpeg"},
                {"bytesBase64Encoded": "BAUG"}
            ]
        }"#;
        let parsed: PredictResponse = serde_json::from_str(raw).unwrap();
        let image = image_from_response(parsed).unwrap();
        assert_eq!(image.data, vec![1, 2, 3]);
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn empty_response_is_an_error() {
        let parsed: PredictResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            image_from_response(parsed),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let client = ImagenClient::new(
            "https://example.invalid".to_string(),
            "imagen-4.0-generate-001".to_string(),
            None,
        );
        assert!(matches!(
            client.generate("anything").await,
            Err(GenerationError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn mock_generator_counts_calls() {
        let generator = MockImageGenerator::success("image/jpeg", vec![1]);
        generator.generate("x").await.unwrap();
        generator.generate("y").await.unwrap();
        assert_eq!(generator.call_count(), 2);

        let failing = MockImageGenerator::failure();
        assert!(matches!(
            failing.generate("z").await,
            Err(GenerationError::Status(429, _))
        ));
    }
}
