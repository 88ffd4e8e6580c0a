//! Session flow tests with scripted backends.
//!
//! These drive the controller and the async handle through whole games
//! without network access.

use habitat_core::config::{CapabilityProfile, SessionConfig};
use habitat_core::habitat::{HabitatIntegrityError, Position, PLACEMENT_RADIUS};
use habitat_core::scene::AspectRatio;
use habitat_core::testing::{
    assert_habitat, assert_inventory, assert_state, assert_story_len, PayloadBuilder, ScriptedNarrator,
    StaticImages, TestHarness,
};
use habitat_core::{GameHandle, GameState, ScenePipeline, TurnOutcome};
use std::sync::Arc;

fn shuttle_turn(story: &str) -> PayloadBuilder {
    PayloadBuilder::new(story).module("shuttle-1", "shuttle", None)
}

fn dome_turn(story: &str) -> PayloadBuilder {
    shuttle_turn(story).module("biodome-1", "biodome", Some("shuttle-1"))
}

// =============================================================================
// TURN SCENARIOS
// =============================================================================

#[tokio::test]
async fn test_opening_turn_builds_root_only_habitat() {
    let mut harness = TestHarness::new();
    harness.expect(PayloadBuilder::opening());

    let outcome = harness.start().await;

    assert_eq!(outcome, Some(TurnOutcome::Applied(GameState::Playing)));
    assert_state(&harness, GameState::Playing);
    assert_habitat(&harness, &["shuttle-1"]);
    assert_story_len(&harness, 0);

    let sent = harness.narrator.requests();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].prompt.contains("## Story so far"));
}

#[tokio::test]
async fn test_second_turn_adds_biodome_at_radius() {
    let mut harness = TestHarness::new();
    harness
        .expect(PayloadBuilder::opening())
        .expect(dome_turn("You inflate the first dome."));

    harness.start().await;
    harness.choose("Build a biodome").await;

    assert_state(&harness, GameState::Playing);
    assert_habitat(&harness, &["shuttle-1", "biodome-1"]);

    let layout = harness.session().habitat().layout();
    assert_eq!(layout.len(), 2);
    assert_eq!(layout.position("shuttle-1"), Some(Position::ORIGIN));
    let dome = layout.position("biodome-1").unwrap();
    assert!((dome.distance(&Position::ORIGIN) - PLACEMENT_RADIUS).abs() < 1e-4);
    assert_eq!(dome.y, 0.0);

    // Same graph, same placement.
    assert_eq!(harness.session().habitat().layout(), layout);
}

#[tokio::test]
async fn test_omitted_module_keeps_previous_graph() {
    let mut harness = TestHarness::new();
    harness
        .expect(PayloadBuilder::opening())
        .expect(PayloadBuilder::new("The wreck is gone?").module("biodome-1", "biodome", None));

    harness.start().await;
    let before = harness.session().clone();
    harness.choose("Look back").await;

    assert_state(&harness, GameState::Error);
    assert_habitat(&harness, &["shuttle-1"]);
    assert_eq!(harness.session().habitat(), before.habitat());
    assert_eq!(harness.session().current_scene(), before.current_scene());
    assert_story_len(&harness, 0);

    let message = harness.session().last_error().unwrap();
    assert!(message.contains("habitat integrity violated"));
}

#[tokio::test]
async fn test_omitted_root_reported_by_id() {
    let mut harness = TestHarness::with_profile(CapabilityProfile::Habitat);
    harness
        .expect(PayloadBuilder::opening())
        .expect(PayloadBuilder::new("Silence.").status("Nothing stands."));

    harness.start().await;
    harness.choose("Wait").await;

    assert_state(&harness, GameState::Error);
    let expected = HabitatIntegrityError::MissingModule {
        id: "shuttle-1".to_string(),
    };
    assert!(harness.session().last_error().unwrap().contains(&expected.to_string()));
}

#[tokio::test]
async fn test_power_cell_collected_once() {
    let mut harness = TestHarness::new();
    harness
        .expect(PayloadBuilder::opening())
        .expect(shuttle_turn("A cell glints in the sand.").item("Power Cell"))
        .expect(shuttle_turn("Another cell, identical.").item("Power Cell"));

    harness.start().await;
    assert_inventory(&harness, &[], None);

    harness.choose("Search the crash site").await;
    assert_inventory(&harness, &["Power Cell"], Some("Power Cell"));

    harness.choose("Keep searching").await;
    assert_inventory(&harness, &["Power Cell"], None);
}

#[tokio::test]
async fn test_game_over_blocks_choices_until_reset() {
    let mut harness = TestHarness::new();
    harness
        .expect(PayloadBuilder::opening())
        .expect(shuttle_turn("The rescue ship lands.").game_over());

    harness.start().await;
    harness.choose("Signal the orbiter").await;
    assert_state(&harness, GameState::GameOver);
    assert!(harness.story().is_some());

    assert_eq!(harness.choose("Wave").await, None);
    assert_state(&harness, GameState::GameOver);
    assert_eq!(harness.narrator.requests().len(), 2);

    harness.reset();
    assert_state(&harness, GameState::Start);
    assert_habitat(&harness, &[]);
    assert!(harness.story().is_none());
}

#[tokio::test]
async fn test_start_from_game_over_begins_new_game() {
    let mut harness = TestHarness::new();
    harness
        .expect(PayloadBuilder::opening())
        .expect(dome_turn("The dome cracks and the air rushes out.").item("Helmet").game_over())
        .expect(PayloadBuilder::opening());

    harness.start().await;
    harness.choose("Seal the dome").await;
    assert_state(&harness, GameState::GameOver);
    assert_habitat(&harness, &["shuttle-1", "biodome-1"]);

    let outcome = harness.start().await;

    assert_eq!(outcome, Some(TurnOutcome::Applied(GameState::Playing)));
    assert_habitat(&harness, &["shuttle-1"]);
    assert_inventory(&harness, &[], None);
    assert_story_len(&harness, 0);
    assert!(!harness.narrator.requests()[2].prompt.contains("## Story so far"));
}

#[tokio::test]
async fn test_offered_choice_is_sent_as_action() {
    let mut harness = TestHarness::new();
    harness
        .expect(PayloadBuilder::opening().choices(&["Repair the antenna", "Ration the water", "Walk to the ridge"]))
        .expect(shuttle_turn("Static crackles, then a voice."));

    harness.start().await;
    let choices = harness.session().current_scene().unwrap().choices().to_vec();
    assert_eq!(choices, ["Repair the antenna", "Ration the water", "Walk to the ridge"]);

    harness.choose(&choices[0]).await;

    assert_state(&harness, GameState::Playing);
    let sent = harness.narrator.requests();
    assert!(sent[1].prompt.contains("## The player chooses\nRepair the antenna"));
}

#[tokio::test]
async fn test_history_accumulates_story_entries() {
    let mut harness = TestHarness::new();
    harness
        .expect(PayloadBuilder::opening())
        .expect(shuttle_turn("You climb out."))
        .expect(shuttle_turn("The sun is low."));

    harness.start().await;
    harness.choose("Climb out").await;
    harness.choose("Look west").await;

    assert_story_len(&harness, 2);
    let sent = harness.narrator.requests();
    assert!(sent[2]
        .prompt
        .contains("You wake strapped into the wreck of your shuttle.\n\nYou climb out."));
    assert!(sent[2].prompt.contains("Look west"));
}

#[tokio::test]
async fn test_error_recovers_with_start() {
    let mut harness = TestHarness::new();
    harness
        .expect_failure("503 overloaded")
        .expect(PayloadBuilder::opening());

    harness.start().await;
    assert_state(&harness, GameState::Error);
    assert_eq!(
        harness.session().last_error(),
        Some("narrative generation failed: 503 overloaded")
    );
    assert_eq!(harness.choose("Retry").await, None);

    harness.start().await;
    assert_state(&harness, GameState::Playing);
    assert_eq!(harness.session().last_error(), None);
}

#[tokio::test]
async fn test_malformed_reply_is_error() {
    let mut harness = TestHarness::new();
    harness.expect_raw("Once upon a time on Mars...");

    harness.start().await;

    assert_state(&harness, GameState::Error);
    assert!(harness.session().current_scene().is_none());
    assert!(harness.images.requests().is_empty());
}

#[tokio::test]
async fn test_rendered_profile_requests_both_images() {
    let mut harness = TestHarness::with_profile(CapabilityProfile::HabitatRendered);
    harness.expect(PayloadBuilder::opening());
    harness.start().await;

    let aspects: Vec<AspectRatio> = harness.images.requests().iter().map(|r| r.aspect).collect();
    assert_eq!(aspects.len(), 2);
    assert!(aspects.contains(&AspectRatio::Wide));
    assert!(aspects.contains(&AspectRatio::Square));
}

#[tokio::test]
async fn test_story_only_profile() {
    let mut harness = TestHarness::with_profile(CapabilityProfile::StoryOnly);
    harness
        .expect(PayloadBuilder::new("Dust, and nothing else."))
        .expect(PayloadBuilder::new("Still dust."));

    harness.start().await;
    harness.choose("Walk").await;

    assert_state(&harness, GameState::Playing);
    assert_habitat(&harness, &[]);
    assert_eq!(harness.images.requests().len(), 2);
}

// =============================================================================
// ASYNC HANDLE
// =============================================================================

fn game(narrator: Arc<ScriptedNarrator>) -> GameHandle {
    let config = SessionConfig::new();
    GameHandle::new(ScenePipeline::new(narrator, Arc::new(StaticImages::new()), &config))
}

#[tokio::test]
async fn test_handle_plays_turns() {
    let narrator = Arc::new(ScriptedNarrator::new());
    narrator.push_payload(PayloadBuilder::opening());
    narrator.push_payload(dome_turn("The dome holds pressure.").item("Seed Pack"));
    let game = game(narrator);

    game.start().unwrap().await.unwrap();
    let outcome = game.choose("Build a biodome").unwrap().await.unwrap();

    assert_eq!(outcome, TurnOutcome::Applied(GameState::Playing));
    let snapshot = game.snapshot();
    assert_eq!(snapshot.habitat().len(), 2);
    assert_eq!(snapshot.inventory().items(), ["Seed Pack"]);
    assert!(game.layout().contains("biodome-1"));
}

#[tokio::test]
async fn test_handle_discards_turn_after_reset() {
    let (narrator, gate) = ScriptedNarrator::gated();
    let narrator = Arc::new(narrator);
    narrator.push_payload(PayloadBuilder::opening());
    let game = game(narrator.clone());

    let turn = game.start().unwrap();
    assert_eq!(game.state(), GameState::Loading);

    game.reset();
    gate.add_permits(1);

    assert_eq!(turn.await.unwrap(), TurnOutcome::Discarded);
    assert_eq!(game.state(), GameState::Start);
    assert!(game.snapshot().current_scene().is_none());
    assert_eq!(narrator.remaining(), 0);
}

#[tokio::test]
async fn test_handle_restart_discards_old_turn() {
    let (narrator, gate) = ScriptedNarrator::gated();
    let narrator = Arc::new(narrator);
    narrator.push_payload(PayloadBuilder::opening());
    narrator.push_payload(PayloadBuilder::opening());
    let game = game(narrator);

    let first = game.start().unwrap();
    game.reset();
    let second = game.start().unwrap();

    gate.add_permits(2);

    let mut outcomes = vec![first.await.unwrap(), second.await.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, TurnOutcome::Applied(_)));
    assert_eq!(
        outcomes,
        vec![TurnOutcome::Discarded, TurnOutcome::Applied(GameState::Playing)]
    );
    assert_eq!(game.state(), GameState::Playing);
}
