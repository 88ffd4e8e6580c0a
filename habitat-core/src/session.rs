//! SessionController - the turn state machine.
//!
//! The controller owns the single [`Session`] aggregate and is the only
//! thing that mutates it. A turn is split in two: `start`/`choose` issue a
//! [`TurnTicket`] and enter `Loading`; `resolve` applies the pipeline result
//! for that ticket. Tickets carry the generation they were issued under so a
//! result that arrives after `reset` or a fresh `start` is dropped.

use crate::config::CapabilityProfile;
use crate::error::SceneError;
use crate::habitat::HabitatGraph;
use crate::inventory::InventoryTracker;
use crate::scene::{Scene, ScenePipeline};
use crate::story_log::StoryLog;
use tracing::{debug, info, warn};

/// Action sent for the opening turn.
pub const BEGIN_ACTION: &str = "Start the game";

/// Where the session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    Start,
    Loading,
    Playing,
    GameOver,
    Error,
}

impl GameState {
    /// States left only through `reset` or a fresh `start`.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameState::GameOver | GameState::Error)
    }
}

/// Everything a session knows. Callers only ever see clones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    state: GameState,
    current_scene: Option<Scene>,
    story_log: StoryLog,
    inventory: InventoryTracker,
    habitat: HabitatGraph,
    last_error: Option<String>,
}

impl Session {
    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current_scene.as_ref()
    }

    pub fn story_log(&self) -> &StoryLog {
        &self.story_log
    }

    pub fn inventory(&self) -> &InventoryTracker {
        &self.inventory
    }

    pub fn habitat(&self) -> &HabitatGraph {
        &self.habitat
    }

    /// Message describing why the last turn failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Permission to run one turn, issued by `start` or `choose`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTicket {
    generation: u64,
    history: String,
    action: String,
    /// Story text committed to the log when this turn succeeds.
    pending_story: Option<String>,
}

impl TurnTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

/// What resolving a ticket did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The result was applied and the session moved to this state.
    Applied(GameState),
    /// The ticket was stale; nothing changed.
    Discarded,
}

/// Drives one session through its turns.
#[derive(Debug, Clone, Default)]
pub struct SessionController {
    profile: CapabilityProfile,
    session: Session,
    generation: u64,
}

impl SessionController {
    pub fn new(profile: CapabilityProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    pub fn profile(&self) -> CapabilityProfile {
        self.profile
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> GameState {
        self.session.state
    }

    /// Begin a new game, discarding the current one.
    ///
    /// Ignored while a turn is in flight.
    pub fn start(&mut self) -> Option<TurnTicket> {
        if self.session.state == GameState::Loading {
            debug!("start ignored while loading");
            return None;
        }

        self.generation += 1;
        self.session = Session {
            state: GameState::Loading,
            ..Session::default()
        };
        info!(generation = self.generation, "session started");

        Some(TurnTicket {
            generation: self.generation,
            history: String::new(),
            action: BEGIN_ACTION.to_string(),
            pending_story: None,
        })
    }

    /// Take `action` from the current scene. Only accepted while playing.
    pub fn choose(&mut self, action: &str) -> Option<TurnTicket> {
        if self.session.state != GameState::Playing {
            debug!(state = ?self.session.state, "choice ignored");
            return None;
        }

        let story = self
            .session
            .current_scene
            .as_ref()
            .map(|scene| scene.story().to_string());
        let history = match &story {
            Some(text) => self.session.story_log.history_with(text),
            None => self.session.story_log.history(),
        };

        self.session.state = GameState::Loading;
        info!(generation = self.generation, action, "turn issued");

        Some(TurnTicket {
            generation: self.generation,
            history,
            action: action.to_string(),
            pending_story: story,
        })
    }

    /// Return to `Start` with an empty session. Any turn in flight goes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.session = Session::default();
        info!(generation = self.generation, "session reset");
    }

    /// Apply a pipeline result for `ticket`.
    pub fn resolve(&mut self, ticket: TurnTicket, result: Result<Scene, SceneError>) -> TurnOutcome {
        if ticket.generation != self.generation || self.session.state != GameState::Loading {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                state = ?self.session.state,
                "stale turn result discarded"
            );
            return TurnOutcome::Discarded;
        }

        match result.and_then(|scene| self.apply(ticket, scene)) {
            Ok(state) => TurnOutcome::Applied(state),
            Err(err) => {
                warn!(error = %err, "turn failed");
                self.session.last_error = Some(err.to_string());
                self.session.state = GameState::Error;
                TurnOutcome::Applied(GameState::Error)
            }
        }
    }

    fn apply(&mut self, ticket: TurnTicket, scene: Scene) -> Result<GameState, SceneError> {
        // Validate before touching anything so a rejected turn leaves no trace.
        let habitat = if self.profile.tracks_habitat() {
            Some(self.session.habitat.merge(&scene.payload.habitat_modules)?)
        } else {
            None
        };

        let session = &mut self.session;
        if let Some(habitat) = habitat {
            session.habitat = habitat;
        }
        if let Some(story) = ticket.pending_story {
            session.story_log.append(story);
        }
        let added = session.inventory.record(scene.payload.new_item.as_deref());

        let state = if scene.is_game_over() {
            GameState::GameOver
        } else {
            GameState::Playing
        };
        session.current_scene = Some(scene);
        session.last_error = None;
        session.state = state;

        info!(
            generation = ticket.generation,
            ?state,
            modules = session.habitat.len(),
            item_added = added,
            "turn applied"
        );
        Ok(state)
    }

    /// Fetch the scene for `ticket` and resolve it.
    pub async fn run_turn(&mut self, pipeline: &ScenePipeline, ticket: TurnTicket) -> TurnOutcome {
        let result = pipeline.fetch_next_scene(&ticket.history, &ticket.action).await;
        self.resolve(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FormatError, GenerationError};
    use crate::habitat::{HabitatIntegrityError, HabitatKind};
    use crate::scene::parse_payload;
    use crate::scene::{ImageRef, SceneImages};
    use crate::testing::PayloadBuilder;

    fn scene(payload: PayloadBuilder) -> Scene {
        Scene {
            payload: parse_payload(&payload.raw(), CapabilityProfile::Habitat).unwrap(),
            images: SceneImages {
                primary: ImageRef::Url {
                    url: "https://images.test/1.png".to_string(),
                },
                habitat_render: None,
            },
        }
    }

    fn playing() -> SessionController {
        let mut controller = SessionController::new(CapabilityProfile::Habitat);
        let ticket = controller.start().unwrap();
        controller.resolve(ticket, Ok(scene(PayloadBuilder::opening())));
        controller
    }

    #[test]
    fn test_start_issues_opening_ticket() {
        let mut controller = SessionController::new(CapabilityProfile::Habitat);
        let ticket = controller.start().unwrap();
        assert_eq!(ticket.history(), "");
        assert_eq!(ticket.action(), BEGIN_ACTION);
        assert_eq!(controller.state(), GameState::Loading);

        // A second start while loading is ignored.
        assert!(controller.start().is_none());
    }

    #[test]
    fn test_opening_applied() {
        let controller = playing();
        let session = controller.session();
        assert_eq!(session.state(), GameState::Playing);
        assert_eq!(session.habitat().len(), 1);
        assert!(session.story_log().is_empty());
        assert!(session.current_scene().is_some());
    }

    #[test]
    fn test_choose_builds_history_from_current_story() {
        let mut controller = playing();
        let ticket = controller.choose("Open the hatch").unwrap();
        assert_eq!(
            ticket.history(),
            "You wake strapped into the wreck of your shuttle."
        );
        assert_eq!(ticket.action(), "Open the hatch");
        assert_eq!(controller.state(), GameState::Loading);

        let next = PayloadBuilder::new("Cold air rushes in.").module("shuttle-1", "shuttle", None);
        controller.resolve(ticket, Ok(scene(next)));
        assert_eq!(controller.session().story_log().len(), 1);

        let ticket = controller.choose("Step outside").unwrap();
        assert_eq!(
            ticket.history(),
            "You wake strapped into the wreck of your shuttle.\n\nCold air rushes in."
        );
    }

    #[test]
    fn test_choose_ignored_outside_playing() {
        let mut controller = SessionController::new(CapabilityProfile::Habitat);
        assert!(controller.choose("Look around").is_none());
        assert_eq!(controller.state(), GameState::Start);

        controller.start();
        assert!(controller.choose("Look around").is_none());
        assert_eq!(controller.state(), GameState::Loading);
    }

    #[test]
    fn test_failure_enters_error_without_mutation() {
        let mut controller = playing();
        let before = controller.session().clone();

        let ticket = controller.choose("Open the hatch").unwrap();
        let outcome = controller.resolve(
            ticket,
            Err(GenerationError::Narrative("timeout".to_string()).into()),
        );

        assert_eq!(outcome, TurnOutcome::Applied(GameState::Error));
        let session = controller.session();
        assert_eq!(session.last_error(), Some("narrative generation failed: timeout"));
        assert_eq!(session.story_log(), before.story_log());
        assert_eq!(session.habitat(), before.habitat());
        assert_eq!(session.current_scene(), before.current_scene());
    }

    #[test]
    fn test_integrity_failure_keeps_graph() {
        let mut controller = playing();
        let ticket = controller.choose("Build a dome").unwrap();
        let bad = PayloadBuilder::new("A dome rises.").module("biodome-1", "biodome", Some("shuttle-1"));

        controller.resolve(ticket, Ok(scene(bad)));

        let session = controller.session();
        assert_eq!(session.state(), GameState::Error);
        assert_eq!(session.habitat().modules().len(), 1);
        assert_eq!(session.habitat().modules()[0].kind, HabitatKind::Shuttle);
        assert!(session.story_log().is_empty());
        assert!(session.last_error().unwrap().contains("shuttle-1"));
    }

    #[test]
    fn test_integrity_error_is_format_error() {
        let mut controller = playing();
        let ticket = controller.choose("Build a dome").unwrap();
        let bad = PayloadBuilder::new("A dome rises.").module("biodome-1", "biodome", Some("shuttle-1"));
        let err = controller.apply(ticket, scene(bad)).unwrap_err();
        assert_eq!(
            err,
            SceneError::Format(FormatError::Habitat(HabitatIntegrityError::MissingModule {
                id: "shuttle-1".to_string()
            }))
        );
    }

    #[test]
    fn test_game_over_is_terminal() {
        let mut controller = playing();
        let ticket = controller.choose("Launch").unwrap();
        let ending = PayloadBuilder::new("You escape.").module("shuttle-1", "shuttle", None).game_over();
        controller.resolve(ticket, Ok(scene(ending)));

        assert_eq!(controller.state(), GameState::GameOver);
        assert!(controller.state().is_terminal());
        assert!(controller.choose("Anything").is_none());

        controller.reset();
        assert_eq!(controller.state(), GameState::Start);
        assert_eq!(controller.session(), &Session::default());
    }

    #[test]
    fn test_stale_ticket_discarded() {
        let mut controller = SessionController::new(CapabilityProfile::Habitat);
        let ticket = controller.start().unwrap();
        controller.reset();

        let outcome = controller.resolve(ticket, Ok(scene(PayloadBuilder::opening())));
        assert_eq!(outcome, TurnOutcome::Discarded);
        assert_eq!(controller.state(), GameState::Start);
        assert!(controller.session().current_scene().is_none());
    }

    #[test]
    fn test_ticket_from_previous_game_discarded() {
        let mut controller = playing();
        let old = controller.choose("Wait").unwrap();

        // Restarting from an error clears the old turn's claim.
        controller.resolve(old.clone(), Err(GenerationError::Image("down".to_string()).into()));
        let fresh = controller.start().unwrap();
        assert_eq!(controller.resolve(old, Ok(scene(PayloadBuilder::opening()))), TurnOutcome::Discarded);
        assert_eq!(
            controller.resolve(fresh, Ok(scene(PayloadBuilder::opening()))),
            TurnOutcome::Applied(GameState::Playing)
        );
    }

    #[test]
    fn test_start_restarts_from_playing() {
        let mut controller = playing();
        let ticket = controller.start().unwrap();
        assert_eq!(ticket.history(), "");
        assert!(controller.session().habitat().is_empty());
        assert!(controller.session().current_scene().is_none());
    }

    #[test]
    fn test_story_only_ignores_habitat() {
        let mut controller = SessionController::new(CapabilityProfile::StoryOnly);
        let ticket = controller.start().unwrap();
        controller.resolve(ticket, Ok(scene(PayloadBuilder::new("Dust."))));
        assert_eq!(controller.state(), GameState::Playing);
        assert!(controller.session().habitat().is_empty());
    }

    #[test]
    fn test_inventory_recorded() {
        let mut controller = playing();
        let ticket = controller.choose("Search").unwrap();
        let found = PayloadBuilder::new("A cell.").module("shuttle-1", "shuttle", None).item("Power Cell");
        controller.resolve(ticket, Ok(scene(found)));

        let inventory = controller.session().inventory();
        assert_eq!(inventory.items(), ["Power Cell"]);
        assert_eq!(inventory.last_added(), Some("Power Cell"));
    }
}
