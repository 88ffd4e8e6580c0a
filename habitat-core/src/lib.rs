//! Turn-based Mars habitat story with AI narration.
//!
//! This crate provides:
//! - A turn state machine that owns all session state
//! - A scene pipeline that requests, validates and illustrates each turn
//! - An append-only habitat graph with deterministic spatial layout
//! - Inventory and story history tracking
//!
//! # Quick Start
//!
//! ```ignore
//! use habitat_core::{GameHandle, ScenePipeline, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::from_env()?;
//!     let game = GameHandle::new(ScenePipeline::from_env(&config)?);
//!
//!     if let Some(turn) = game.start() {
//!         turn.await?;
//!     }
//!     let session = game.snapshot();
//!     if let Some(scene) = session.current_scene() {
//!         println!("{}", scene.story());
//!         for choice in scene.choices() {
//!             println!("  - {choice}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod habitat;
pub mod handle;
pub mod inventory;
pub mod scene;
pub mod session;
pub mod story_log;
pub mod testing;

// Re-export for convenience
pub use habitat_macros::OutputSchema;

// Primary public API
pub use config::{CapabilityProfile, SessionConfig};
pub use error::{ConfigError, FormatError, GenerationError, SceneError};
pub use habitat::{HabitatGraph, HabitatIntegrityError, HabitatKind, HabitatModule, Layout, Position};
pub use handle::GameHandle;
pub use inventory::InventoryTracker;
pub use scene::{ImagePurpose, ImageRef, Scene, ScenePayload, ScenePipeline};
pub use session::{GameState, Session, SessionController, TurnOutcome, TurnTicket};
pub use story_log::StoryLog;
pub use testing::{PayloadBuilder, ScriptedNarrator, StaticImages, TestHarness};

#[cfg(test)]
mod tests {
    use super::*;

    /// Report the colony's oxygen reserve
    #[derive(OutputSchema)]
    #[schema(name = "oxygen_report")]
    #[allow(dead_code)]
    struct OxygenReport {
        /// Hours of oxygen left
        hours: u32,
        /// Optional warning for the player
        warning: Option<String>,
    }

    #[test]
    fn test_output_schema_derive() {
        assert_eq!(OxygenReport::schema_name(), "oxygen_report");
        assert_eq!(OxygenReport::schema_description(), "Report the colony's oxygen reserve");
    }

    #[test]
    fn test_output_schema_fields() {
        let schema = OxygenReport::output_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["hours"]["type"], "integer");

        // Option fields are nullable and not required
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "hours"));
        assert!(!required.iter().any(|v| v == "warning"));
    }
}
