//! Session configuration.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Sampling temperature for narrative requests.
pub const NARRATIVE_TEMPERATURE: f32 = 0.9;

/// Which generation contract a deployment uses.
///
/// Chosen once at configuration time; a session never mixes profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapabilityProfile {
    /// One illustration per turn, no habitat tracking.
    StoryOnly,
    /// One illustration per turn, habitat modules tracked.
    Habitat,
    /// Illustration plus a habitat render per turn, habitat modules tracked.
    #[default]
    HabitatRendered,
}

impl CapabilityProfile {
    pub fn tracks_habitat(self) -> bool {
        !matches!(self, CapabilityProfile::StoryOnly)
    }

    pub fn renders_habitat(self) -> bool {
        matches!(self, CapabilityProfile::HabitatRendered)
    }

    pub fn name(self) -> &'static str {
        match self {
            CapabilityProfile::StoryOnly => "story-only",
            CapabilityProfile::Habitat => "habitat",
            CapabilityProfile::HabitatRendered => "habitat-rendered",
        }
    }
}

impl fmt::Display for CapabilityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CapabilityProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "story-only" | "story" => Ok(CapabilityProfile::StoryOnly),
            "habitat" => Ok(CapabilityProfile::Habitat),
            "habitat-rendered" | "rendered" => Ok(CapabilityProfile::HabitatRendered),
            _ => Err(ConfigError::UnknownProfile(s.trim().to_string())),
        }
    }
}

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Generation contract in use.
    pub profile: CapabilityProfile,

    /// Narrative model; the client default when unset.
    pub model: Option<String>,

    /// Maximum tokens for a narrative reply.
    pub max_tokens: usize,

    /// Temperature for narrative generation.
    pub temperature: f32,

    /// Image model; the client default when unset.
    pub image_model: Option<String>,

    /// Base URL of the image API; the client default when unset.
    pub image_base_url: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile: CapabilityProfile::default(),
            model: None,
            max_tokens: 2048,
            temperature: NARRATIVE_TEMPERATURE,
            image_model: None,
            image_base_url: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `HABITAT_PROFILE`, `HABITAT_MODEL` and
    /// `HABITAT_IMAGE_MODEL` when they are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(profile) = std::env::var("HABITAT_PROFILE") {
            config.profile = profile.parse()?;
        }
        if let Ok(model) = std::env::var("HABITAT_MODEL") {
            config.model = Some(model);
        }
        if let Ok(model) = std::env::var("HABITAT_IMAGE_MODEL") {
            config.image_model = Some(model);
        }
        Ok(config)
    }

    pub fn with_profile(mut self, profile: CapabilityProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    pub fn with_image_base_url(mut self, url: impl Into<String>) -> Self {
        self.image_base_url = Some(url.into());
        self
    }
}
