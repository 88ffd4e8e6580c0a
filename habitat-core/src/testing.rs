//! Testing utilities for habitat sessions.
//!
//! This module provides tools for integration testing:
//! - `ScriptedNarrator` and `StaticImages` for deterministic turns without API calls
//! - `PayloadBuilder` for narrative replies
//! - `TestHarness` for scripted session scenarios
//! - Assertion helpers for verifying session state

use crate::config::{CapabilityProfile, SessionConfig};
use crate::error::GenerationError;
use crate::scene::{ImageBackend, ImageRef, ImageRequest, NarrativeBackend, NarrativeRequest, ScenePipeline};
use crate::session::{GameState, Session, SessionController, TurnOutcome};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for a raw narrative reply.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    story: String,
    image_prompt: String,
    choices: Vec<String>,
    new_item: Option<String>,
    game_over: bool,
    status: String,
    modules: Vec<Value>,
}

impl PayloadBuilder {
    /// A continuing scene with two choices and no habitat modules.
    pub fn new(story: impl Into<String>) -> Self {
        Self {
            story: story.into(),
            image_prompt: "A lone figure on a rust-red plain".to_string(),
            choices: vec!["Look around".to_string(), "Check the shuttle".to_string()],
            new_item: None,
            game_over: false,
            status: "The shuttle is all there is.".to_string(),
            modules: Vec::new(),
        }
    }

    /// The usual first scene: the crashed shuttle as the only module.
    pub fn opening() -> Self {
        Self::new("You wake strapped into the wreck of your shuttle.").module("shuttle-1", "shuttle", None)
    }

    /// Append a module. `kind` is written as-is so invalid kinds can be sent.
    pub fn module(mut self, id: &str, kind: &str, parent: Option<&str>) -> Self {
        self.modules.push(json!({ "id": id, "kind": kind, "parentId": parent }));
        self
    }

    pub fn item(mut self, name: &str) -> Self {
        self.new_item = Some(name.to_string());
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Mark the scene as an ending with no choices.
    pub fn game_over(mut self) -> Self {
        self.game_over = true;
        self.choices.clear();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn build(&self) -> Value {
        json!({
            "story": self.story,
            "imagePrompt": self.image_prompt,
            "choices": self.choices,
            "newItem": self.new_item,
            "gameOver": self.game_over,
            "habitatStatus": self.status,
            "habitatModules": self.modules,
        })
    }

    pub fn raw(&self) -> String {
        self.build().to_string()
    }
}

/// Narrative backend that replays queued replies in order.
#[derive(Default)]
pub struct ScriptedNarrator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<NarrativeRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A narrator that takes one permit from the returned gate before
    /// answering each request. Release replies with `add_permits`.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let narrator = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (narrator, gate)
    }

    pub fn push_payload(&self, payload: PayloadBuilder) {
        self.push_raw(payload.raw());
    }

    pub fn push_raw(&self, raw: impl Into<String>) {
        lock(&self.replies).push_back(Ok(raw.into()));
    }

    pub fn push_failure(&self, message: &str) {
        lock(&self.replies).push_back(Err(GenerationError::Narrative(message.to_string())));
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<NarrativeRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl NarrativeBackend for ScriptedNarrator {
    async fn generate(&self, request: NarrativeRequest) -> Result<String, GenerationError> {
        lock(&self.requests).push(request);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Narrative("no scripted replies left".to_string())))
    }
}

/// Image backend that answers every request with a fixed URL.
#[derive(Default)]
pub struct StaticImages {
    requests: Mutex<Vec<ImageRequest>>,
}

impl StaticImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ImageRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ImageBackend for StaticImages {
    async fn render(&self, request: ImageRequest) -> Result<ImageRef, GenerationError> {
        let mut requests = lock(&self.requests);
        requests.push(request);
        Ok(ImageRef::Url {
            url: format!("https://images.test/{}.png", requests.len()),
        })
    }
}

/// Image backend that always fails.
pub struct FailingImages;

#[async_trait]
impl ImageBackend for FailingImages {
    async fn render(&self, _request: ImageRequest) -> Result<ImageRef, GenerationError> {
        Err(GenerationError::Image("image service unavailable".to_string()))
    }
}

/// Test harness for running session scenarios.
pub struct TestHarness {
    /// The session under test.
    pub controller: SessionController,
    pub pipeline: ScenePipeline,
    pub narrator: Arc<ScriptedNarrator>,
    pub images: Arc<StaticImages>,
}

impl TestHarness {
    /// A harness with the default profile.
    pub fn new() -> Self {
        Self::with_profile(CapabilityProfile::default())
    }

    pub fn with_profile(profile: CapabilityProfile) -> Self {
        let narrator = Arc::new(ScriptedNarrator::new());
        let images = Arc::new(StaticImages::new());
        let config = SessionConfig::new().with_profile(profile);
        let pipeline = ScenePipeline::new(narrator.clone(), images.clone(), &config);

        Self {
            controller: SessionController::new(profile),
            pipeline,
            narrator,
            images,
        }
    }

    /// Queue a narrative reply.
    pub fn expect(&mut self, payload: PayloadBuilder) -> &mut Self {
        self.narrator.push_payload(payload);
        self
    }

    pub fn expect_raw(&mut self, raw: impl Into<String>) -> &mut Self {
        self.narrator.push_raw(raw);
        self
    }

    pub fn expect_failure(&mut self, message: &str) -> &mut Self {
        self.narrator.push_failure(message);
        self
    }

    /// Start a session and run the opening turn. `None` if the start was ignored.
    pub async fn start(&mut self) -> Option<TurnOutcome> {
        let ticket = self.controller.start()?;
        Some(self.controller.run_turn(&self.pipeline, ticket).await)
    }

    /// Choose an action and run the turn. `None` if the choice was ignored.
    pub async fn choose(&mut self, action: &str) -> Option<TurnOutcome> {
        let ticket = self.controller.choose(action)?;
        Some(self.controller.run_turn(&self.pipeline, ticket).await)
    }

    pub fn reset(&mut self) {
        self.controller.reset();
    }

    pub fn state(&self) -> GameState {
        self.controller.state()
    }

    pub fn session(&self) -> &Session {
        self.controller.session()
    }

    /// Habitat module ids in graph order.
    pub fn habitat_ids(&self) -> Vec<&str> {
        self.session().habitat().modules().iter().map(|m| m.id.as_str()).collect()
    }

    /// The story text of the current scene.
    pub fn story(&self) -> Option<&str> {
        self.session().current_scene().map(|s| s.story())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

#[track_caller]
pub fn assert_state(harness: &TestHarness, expected: GameState) {
    let actual = harness.state();
    assert_eq!(
        actual,
        expected,
        "Expected state {expected:?}, got {actual:?} (last error: {:?})",
        harness.session().last_error()
    );
}

/// Assert the habitat holds exactly `ids`, in order.
#[track_caller]
pub fn assert_habitat(harness: &TestHarness, ids: &[&str]) {
    assert_eq!(harness.habitat_ids(), ids, "Unexpected habitat modules");
}

#[track_caller]
pub fn assert_inventory(harness: &TestHarness, items: &[&str], last_added: Option<&str>) {
    let inventory = harness.session().inventory();
    assert_eq!(inventory.items(), items, "Unexpected inventory items");
    assert_eq!(inventory.last_added(), last_added, "Unexpected last added item");
}

/// Assert the story log holds `count` entries.
#[track_caller]
pub fn assert_story_len(harness: &TestHarness, count: usize) {
    let actual = harness.session().story_log().len();
    assert_eq!(actual, count, "Expected {count} story entries, got {actual}");
}
