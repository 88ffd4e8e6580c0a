//! The narrative reply shape and the gate every reply passes through.

use crate::config::CapabilityProfile;
use crate::error::FormatError;
use crate::habitat::HabitatModule;
use habitat_macros::OutputSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Record the next scene of the story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, OutputSchema)]
#[serde(rename_all = "camelCase")]
#[schema(name = "record_scene", rename_all = "camelCase")]
pub struct ScenePayload {
    /// Narrative for this turn in second person, two or three short paragraphs
    pub story: String,
    /// A vivid visual description of this moment for an illustrator
    pub image_prompt: String,
    /// Two to four short actions the player can take next; empty only when the game is over
    pub choices: Vec<String>,
    /// Name of an item the player picked up this turn, or null
    #[serde(default)]
    pub new_item: Option<String>,
    /// True once the story has reached an ending
    pub game_over: bool,
    /// One or two sentences on the state of the habitat
    #[serde(default)]
    pub habitat_status: String,
    /// Every habitat module so far: earlier modules repeated unchanged, new ones appended
    #[serde(default)]
    pub habitat_modules: Vec<HabitatModule>,
}

const HABITAT_FIELDS: [&str; 2] = ["habitatStatus", "habitatModules"];

impl ScenePayload {
    /// Schema the narrative reply is constrained to under `profile`.
    pub fn schema_for(profile: CapabilityProfile) -> serde_json::Value {
        let mut schema = Self::output_schema();
        if !profile.tracks_habitat() {
            if let Some(properties) = schema["properties"].as_object_mut() {
                for field in HABITAT_FIELDS {
                    properties.remove(field);
                }
            }
            if let Some(required) = schema["required"].as_array_mut() {
                required.retain(|f| !HABITAT_FIELDS.iter().any(|h| f == h));
            }
        }
        schema
    }
}

/// Remove an incidental markdown fence around a reply.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.split_once('\n') {
            Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
            _ => {
                // A tag glued to the JSON on the fence line, as in ```json{...}```.
                let tag_len = rest
                    .find(|c: char| !c.is_ascii_alphanumeric())
                    .unwrap_or(rest.len());
                let after = &rest[tag_len..];
                if after.starts_with(|c: char| c == '{' || c == '[') {
                    after
                } else {
                    rest
                }
            }
        };
    }
    if let Some(body) = text.trim_end().strip_suffix("```") {
        text = body;
    }
    text.trim()
}

/// Parse and validate a raw narrative reply.
///
/// Nothing is coerced: a reply that does not match the payload shape, or
/// violates its structural rules, is rejected with the raw text attached.
pub fn parse_payload(raw: &str, profile: CapabilityProfile) -> Result<ScenePayload, FormatError> {
    let text = strip_code_fence(raw);

    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        warn!(error = %e, raw_response = raw, "narrative reply is not JSON");
        FormatError::Parse {
            message: e.to_string(),
            raw: raw.to_string(),
        }
    })?;

    if !value.is_object() {
        return Err(FormatError::invalid("reply is not a JSON object", raw));
    }

    if profile.tracks_habitat() {
        if let Some(field) = HABITAT_FIELDS.iter().find(|f| value.get(**f).is_none()) {
            return Err(FormatError::invalid(format!("missing field `{field}`"), raw));
        }
    }

    let mut payload: ScenePayload =
        serde_json::from_value(value).map_err(|e| FormatError::Parse {
            message: e.to_string(),
            raw: raw.to_string(),
        })?;

    payload.new_item = payload
        .new_item
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty());

    if payload.story.trim().is_empty() {
        return Err(FormatError::invalid("story is empty", raw));
    }
    if payload.image_prompt.trim().is_empty() {
        return Err(FormatError::invalid("imagePrompt is empty", raw));
    }
    if payload.choices.iter().any(|c| c.trim().is_empty()) {
        return Err(FormatError::invalid("a choice is empty", raw));
    }
    if payload.choices.is_empty() && !payload.game_over {
        return Err(FormatError::invalid("no choices offered and the game is not over", raw));
    }

    Ok(payload)
}
