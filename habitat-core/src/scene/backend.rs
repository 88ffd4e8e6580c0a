//! Seams to the generation services.
//!
//! The pipeline only sees these traits. Live adapters wrap the
//! `generators` clients; scripted ones live in [`crate::testing`].

use crate::error::GenerationError;
use crate::scene::ImageRef;
use async_trait::async_trait;
use generators::{Claude, ImageClient, ImageSize, OutputTool, Request};

/// A request for the next scene's narrative.
#[derive(Debug, Clone)]
pub struct NarrativeRequest {
    pub system: String,
    pub prompt: String,
    /// Name the structured reply is recorded under.
    pub schema_name: String,
    pub schema_description: String,
    /// JSON schema the reply must satisfy.
    pub schema: serde_json::Value,
    pub temperature: f32,
}

/// Shape of a requested image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Wide,
    Square,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect: AspectRatio,
}

/// Produces raw structured text for a narrative request.
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    async fn generate(&self, request: NarrativeRequest) -> Result<String, GenerationError>;
}

/// Renders one image for a prompt.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn render(&self, request: ImageRequest) -> Result<ImageRef, GenerationError>;
}

/// Narrative backend over the Claude Messages API.
///
/// The reply is forced through a single tool whose input schema is the
/// requested shape.
#[derive(Clone)]
pub struct ClaudeNarrator {
    client: Claude,
    max_tokens: usize,
}

impl ClaudeNarrator {
    pub fn new(client: Claude, max_tokens: usize) -> Self {
        Self { client, max_tokens }
    }
}

#[async_trait]
impl NarrativeBackend for ClaudeNarrator {
    async fn generate(&self, request: NarrativeRequest) -> Result<String, GenerationError> {
        let tool = OutputTool {
            name: request.schema_name,
            description: request.schema_description,
            input_schema: request.schema,
        };

        let api_request = Request::new(request.prompt)
            .with_system(request.system)
            .with_max_tokens(self.max_tokens)
            .with_temperature(request.temperature)
            .with_output(tool);

        let response = self
            .client
            .complete(api_request)
            .await
            .map_err(|e| GenerationError::Narrative(e.to_string()))?;

        Ok(response.structured_text())
    }
}

#[async_trait]
impl ImageBackend for ImageClient {
    async fn render(&self, request: ImageRequest) -> Result<ImageRef, GenerationError> {
        let size = match request.aspect {
            AspectRatio::Wide => ImageSize::Landscape,
            AspectRatio::Square => ImageSize::Square,
        };

        self.generate(&request.prompt, size)
            .await
            .map(ImageRef::from)
            .map_err(|e| GenerationError::Image(e.to_string()))
    }
}
