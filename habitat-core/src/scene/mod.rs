//! Scene generation: prompts, backends, payload validation and the pipeline
//! that sequences them.

mod backend;
mod payload;
mod pipeline;
pub mod prompt;

pub use backend::{AspectRatio, ClaudeNarrator, ImageBackend, ImageRequest, NarrativeBackend, NarrativeRequest};
pub use payload::{parse_payload, strip_code_fence, ScenePayload};
pub use pipeline::ScenePipeline;

use generators::GeneratedImage;
use serde::Serialize;

/// A rendered image, as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageRef {
    Url { url: String },
    Inline { media_type: String, data: String },
}

impl From<GeneratedImage> for ImageRef {
    fn from(image: GeneratedImage) -> Self {
        match image {
            GeneratedImage::Url(url) => ImageRef::Url { url },
            GeneratedImage::Base64 { media_type, data } => ImageRef::Inline { media_type, data },
        }
    }
}

/// What an image illustrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImagePurpose {
    Primary,
    HabitatRender,
}

/// Images resolved for one scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneImages {
    pub primary: ImageRef,
    pub habitat_render: Option<ImageRef>,
}

impl SceneImages {
    pub fn get(&self, purpose: ImagePurpose) -> Option<&ImageRef> {
        match purpose {
            ImagePurpose::Primary => Some(&self.primary),
            ImagePurpose::HabitatRender => self.habitat_render.as_ref(),
        }
    }
}

/// A validated, fully resolved turn result.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub payload: ScenePayload,
    pub images: SceneImages,
}

impl Scene {
    pub fn story(&self) -> &str {
        &self.payload.story
    }

    pub fn choices(&self) -> &[String] {
        &self.payload.choices
    }

    pub fn is_game_over(&self) -> bool {
        self.payload.game_over
    }

    pub fn image(&self, purpose: ImagePurpose) -> Option<&ImageRef> {
        self.images.get(purpose)
    }
}
