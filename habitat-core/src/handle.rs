//! GameHandle - a cloneable async front end over one session.

use crate::habitat::Layout;
use crate::scene::ScenePipeline;
use crate::session::{GameState, Session, SessionController, TurnOutcome, TurnTicket};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Shares a [`SessionController`] between a presentation layer and the turns
/// it spawns.
///
/// `start` and `choose` spawn the turn on the current tokio runtime and hand
/// back its `JoinHandle`; everything else is synchronous. The controller lock
/// is only taken for issuing and resolving tickets, never across an await.
#[derive(Clone)]
pub struct GameHandle {
    controller: Arc<Mutex<SessionController>>,
    pipeline: Arc<ScenePipeline>,
}

impl GameHandle {
    pub fn new(pipeline: ScenePipeline) -> Self {
        let controller = SessionController::new(pipeline.profile());
        Self {
            controller: Arc::new(Mutex::new(controller)),
            pipeline: Arc::new(pipeline),
        }
    }

    fn controller(&self) -> MutexGuard<'_, SessionController> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new game. `None` while a turn is already in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Option<JoinHandle<TurnOutcome>> {
        let ticket = self.controller().start()?;
        Some(self.spawn_turn(ticket))
    }

    /// Take `action`. `None` unless the session is playing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn choose(&self, action: &str) -> Option<JoinHandle<TurnOutcome>> {
        let ticket = self.controller().choose(action)?;
        Some(self.spawn_turn(ticket))
    }

    /// Return to the start screen. A turn still in flight will be discarded.
    pub fn reset(&self) {
        self.controller().reset();
    }

    /// A copy of the session as it stands.
    pub fn snapshot(&self) -> Session {
        self.controller().session().clone()
    }

    pub fn state(&self) -> GameState {
        self.controller().state()
    }

    /// Placement of the current habitat.
    pub fn layout(&self) -> Layout {
        self.controller().session().habitat().layout()
    }

    fn spawn_turn(&self, ticket: TurnTicket) -> JoinHandle<TurnOutcome> {
        let controller = Arc::clone(&self.controller);
        let pipeline = Arc::clone(&self.pipeline);

        tokio::spawn(async move {
            let result = pipeline.fetch_next_scene(ticket.history(), ticket.action()).await;
            let mut controller = controller.lock().unwrap_or_else(PoisonError::into_inner);
            controller.resolve(ticket, result)
        })
    }
}
