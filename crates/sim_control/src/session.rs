//! The session controller: sole owner of a `GameState` and the only thing
//! that mutates it.

use std::sync::Arc;

use sim_core::{
    apply_command, snapshot, Command, CommandOutcome, EventEnvelope, GameContent, GameState,
    RandomSource, Snapshot,
};

/// Gate for the fixed-interval cycle driver.
///
/// The session flips it after every turn so that it runs exactly while the
/// simulation phase is active and the run is not over.
pub trait TickScheduler {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Scheduler for tests and batch runners: records the gate, and the caller
/// single-steps with [`Session::step`].
#[derive(Debug, Default)]
pub struct ManualScheduler {
    running: bool,
}

impl TickScheduler for ManualScheduler {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

pub struct Session<R, S = ManualScheduler> {
    state: GameState,
    content: Arc<GameContent>,
    rng: R,
    scheduler: S,
}

impl<R: RandomSource> Session<R, ManualScheduler> {
    pub fn manual(state: GameState, content: Arc<GameContent>, rng: R) -> Self {
        Self::new(state, content, rng, ManualScheduler::default())
    }
}

impl<R: RandomSource, S: TickScheduler> Session<R, S> {
    pub fn new(state: GameState, content: Arc<GameContent>, rng: R, scheduler: S) -> Self {
        let mut session = Self {
            state,
            content,
            rng,
            scheduler,
        };
        session.sync_scheduler();
        session
    }

    /// Applies one player action as an atomic turn.
    pub fn execute(&mut self, command: &Command) -> (CommandOutcome, Vec<EventEnvelope>) {
        let mut events = Vec::new();
        let outcome = apply_command(
            &mut self.state,
            &self.content,
            command,
            &mut self.rng,
            &mut events,
        );
        self.sync_scheduler();
        (outcome, events)
    }

    /// Runs one cycle. A no-op once the scheduler gate is closed.
    pub fn step(&mut self) -> Vec<EventEnvelope> {
        let events = sim_core::tick(&mut self.state, &self.content, &mut self.rng);
        self.sync_scheduler();
        events
    }

    pub fn snapshot(&self) -> Snapshot {
        snapshot(&self.state, &self.content)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn content(&self) -> &Arc<GameContent> {
        &self.content
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn is_ticking(&self) -> bool {
        self.scheduler.is_running()
    }

    fn sync_scheduler(&mut self) {
        let should_run = self.state.is_running();
        match (should_run, self.scheduler.is_running()) {
            (true, false) => self.scheduler.start(),
            (false, true) => self.scheduler.stop(),
            _ => {}
        }
    }
}
