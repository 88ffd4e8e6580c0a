//! Prompt text for the narrative and image services.

use crate::config::CapabilityProfile;
use crate::habitat::{HabitatKind, HabitatModule};

const STORY_RULES: &str = r#"You are the narrator of a survival story set on Mars. The player is the lone survivor of a shuttle crash on the red planet and must find a way to live there.

## Each turn
1. Continue the story from the player's chosen action, in second person and present tense.
2. Keep it to two or three short paragraphs.
3. Offer two to four distinct, concrete next actions.
4. Write an image prompt describing this exact moment for an illustrator.
5. Award at most one new item, and only when the player actually obtains something.
6. Set gameOver to true when the player dies, escapes Mars, or the colony is secure. Offer no choices then."#;

const HABITAT_RULES: &str = r#"

## The habitat
The player slowly builds a base out of modules. Track it in habitatModules:
- The crashed shuttle is the first module: id "shuttle-1", kind "shuttle", parentId null.
- Repeat every module from earlier turns exactly, with the same id, kind and parentId, in the same order.
- Append a module only when the player builds one. Use kind "biodome" or "tunnel" and ids like "biodome-1" or "tunnel-2".
- A new module attaches to a module that already exists. Never change or remove a module.
- Describe the base as a whole in habitatStatus."#;

/// System prompt for `profile`.
pub fn system_prompt(profile: CapabilityProfile) -> String {
    if profile.tracks_habitat() {
        format!("{STORY_RULES}{HABITAT_RULES}")
    } else {
        STORY_RULES.to_string()
    }
}

/// Opening used when there is no history yet.
pub const OPENING_PROMPT: &str = "The game begins. The player wakes strapped into the wreck of their shuttle on the Martian surface, alarms fading. Open the story and offer the first choices.";

/// The user prompt for one turn.
pub fn turn_prompt(history: &str, action: &str) -> String {
    if history.is_empty() {
        return OPENING_PROMPT.to_string();
    }
    format!(
        "## Story so far\n{history}\n\n## The player chooses\n{action}\n\nContinue the story from this choice."
    )
}

/// Prompt for the square render of the habitat.
pub fn habitat_render_prompt(status: &str, modules: &[HabitatModule]) -> String {
    let mut parts = Vec::new();
    for kind in HabitatKind::ALL {
        let count = modules.iter().filter(|m| m.kind == kind).count();
        match count {
            0 => {}
            1 => parts.push(format!("1 {kind}")),
            n => parts.push(format!("{n} {kind}s")),
        }
    }

    let structures = if parts.is_empty() {
        "a lone crashed shuttle".to_string()
    } else {
        parts.join(", ")
    };

    format!(
        "Isometric 3D render of a small Mars habitat on rust-red terrain: {structures}, joined by pressurized walkways. {status} Clean lighting, square composition, no text."
    )
}
