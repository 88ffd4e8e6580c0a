//! Turns (history, action) into a validated, illustrated scene.

use super::backend::{
    AspectRatio, ClaudeNarrator, ImageBackend, ImageRequest, NarrativeBackend, NarrativeRequest,
};
use super::payload::{parse_payload, ScenePayload};
use super::{prompt, Scene, SceneImages};
use crate::config::{CapabilityProfile, SessionConfig};
use crate::error::{GenerationError, SceneError};
use generators::{Claude, ImageClient};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Sequences the narrative call, payload validation and image calls.
///
/// Holds no session state. A call either returns a complete [`Scene`] or an
/// error; nothing is retried here.
#[derive(Clone)]
pub struct ScenePipeline {
    narrator: Arc<dyn NarrativeBackend>,
    images: Arc<dyn ImageBackend>,
    profile: CapabilityProfile,
    temperature: f32,
}

impl ScenePipeline {
    pub fn new(
        narrator: Arc<dyn NarrativeBackend>,
        images: Arc<dyn ImageBackend>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            narrator,
            images,
            profile: config.profile,
            temperature: config.temperature,
        }
    }

    /// Build live backends from `ANTHROPIC_API_KEY` and `OPENAI_API_KEY`.
    pub fn from_env(config: &SessionConfig) -> Result<Self, generators::Error> {
        let mut claude = Claude::from_env()?;
        if let Some(model) = &config.model {
            claude = claude.with_model(model);
        }

        let mut images = ImageClient::from_env()?;
        if let Some(model) = &config.image_model {
            images = images.with_model(model);
        }
        if let Some(url) = &config.image_base_url {
            images = images.with_base_url(url);
        }

        Ok(Self::new(
            Arc::new(ClaudeNarrator::new(claude, config.max_tokens)),
            Arc::new(images),
            config,
        ))
    }

    pub fn profile(&self) -> CapabilityProfile {
        self.profile
    }

    /// The request sent to the narrative service for one turn.
    pub fn narrative_request(&self, history: &str, action: &str) -> NarrativeRequest {
        NarrativeRequest {
            system: prompt::system_prompt(self.profile),
            prompt: prompt::turn_prompt(history, action),
            schema_name: ScenePayload::schema_name().to_string(),
            schema_description: ScenePayload::schema_description().to_string(),
            schema: ScenePayload::schema_for(self.profile),
            temperature: self.temperature,
        }
    }

    /// Generate the scene that follows `action`.
    ///
    /// The narrative call always completes before any image is requested,
    /// since image prompts come from its reply.
    pub async fn fetch_next_scene(&self, history: &str, action: &str) -> Result<Scene, SceneError> {
        let started = Instant::now();
        let request = self.narrative_request(history, action);

        let raw = self.narrator.generate(request).await?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = raw.len(),
            "narrative reply received"
        );

        let payload = parse_payload(&raw, self.profile)?;
        let images = self.render_images(&payload).await?;

        info!(
            profile = %self.profile,
            elapsed_ms = started.elapsed().as_millis() as u64,
            choices = payload.choices.len(),
            modules = payload.habitat_modules.len(),
            game_over = payload.game_over,
            "scene ready"
        );

        Ok(Scene { payload, images })
    }

    async fn render_images(&self, payload: &ScenePayload) -> Result<SceneImages, GenerationError> {
        let primary = self.images.render(ImageRequest {
            prompt: payload.image_prompt.clone(),
            aspect: AspectRatio::Wide,
        });

        if !self.profile.renders_habitat() {
            return Ok(SceneImages {
                primary: primary.await?,
                habitat_render: None,
            });
        }

        let habitat = self.images.render(ImageRequest {
            prompt: prompt::habitat_render_prompt(&payload.habitat_status, &payload.habitat_modules),
            aspect: AspectRatio::Square,
        });

        let (primary, habitat) = futures::try_join!(primary, habitat)?;
        Ok(SceneImages {
            primary,
            habitat_render: Some(habitat),
        })
    }
}
