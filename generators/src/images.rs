//! OpenAI-compatible image generation client.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "dall-e-3";
const API_KEY_VAR: &str = "OPENAI_API_KEY";
const BASE_URL_VAR: &str = "IMAGE_API_URL";

/// Output dimensions supported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Landscape,
    Square,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Landscape => "1792x1024",
            ImageSize::Square => "1024x1024",
        }
    }
}

/// A rendered image as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    /// Hosted image; the URL is typically short-lived.
    Url(String),
    /// Inline base64 payload.
    Base64 { media_type: String, data: String },
}

/// Client for `{base_url}/images/generations`.
#[derive(Clone)]
pub struct ImageClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ImageClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(180))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Build from `OPENAI_API_KEY`, honoring `IMAGE_API_URL` when set.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var(API_KEY_VAR).map_err(|_| Error::NoApiKey(API_KEY_VAR))?;
        let client = Self::new(api_key);
        Ok(match std::env::var(BASE_URL_VAR) {
            Ok(url) if !url.trim().is_empty() => client.with_base_url(url),
            _ => client,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Render a single image for `prompt`.
    pub async fn generate(&self, prompt: &str, size: ImageSize) -> Result<GeneratedImage, Error> {
        let body = ApiImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: size.as_str(),
        };

        debug!(model = %self.model, size = size.as_str(), "requesting image");

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }

        let api_response: ApiImageResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        api_response.into_image()
    }
}

#[derive(Debug, Serialize)]
struct ApiImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiImageResponse {
    #[serde(default)]
    data: Vec<ApiImageData>,
}

#[derive(Debug, Deserialize)]
struct ApiImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

impl ApiImageResponse {
    fn into_image(self) -> Result<GeneratedImage, Error> {
        let Some(first) = self.data.into_iter().next() else {
            return Err(Error::Empty("image response contained no data".to_string()));
        };

        match (first.b64_json, first.url) {
            (Some(data), _) if !data.is_empty() => Ok(GeneratedImage::Base64 {
                media_type: "image/png".to_string(),
                data,
            }),
            (_, Some(url)) if !url.is_empty() => Ok(GeneratedImage::Url(url)),
            _ => Err(Error::Empty("image entry had neither url nor b64_json".to_string())),
        }
    }
}
