//! A deterministic, tick driven kart race engine.
//!
//! The engine advances a fixed point world at 60 Hz: kart physics, items,
//! bots and the peer to peer synchronization of kart state. Renderers and
//! UI read the world through [`RaceEngine::state`], which always observes
//! a coherent snapshot between two ticks.

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock, RwLockReadGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

pub mod bot;
pub mod engine;
pub mod input;
pub mod items;
pub mod kart;
pub mod math;
pub mod net;
pub mod race;
pub mod track;

pub use engine::EngineConfig;
pub use input::Buttons;
pub use input::InputSnapshot;
pub use race::RaceEvent;
pub use race::RaceMode;
pub use race::RacePhase;
pub use race::RaceState;
pub use track::Map;

/// The deterministic PRNG used wherever the engine needs randomness.
pub type StdRng = rand_pcg::Pcg64;

/// A fatal engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("track error: {0}")]
    Track(#[from] track::TrackError),
    #[error("connection error: {0}")]
    Connection(#[from] net::ConnectionError),
}

/// The result of the engine thread after it has finished.
pub type EngineResult = Result<(), EngineError>;

/// Commands for the engine to execute.
pub enum EngineCommand {
    /// Replace the pending input snapshot.
    Input(InputSnapshot),
    /// Toggle the pause flag; physics and chronometer both suspend.
    PauseToggle,
    /// Set our ready flag in the lobby.
    SetReady(bool),
    /// Put every kart back on its grid slot.
    Reset,
    /// Clear the accumulated race events.
    ClearEvents,
    /// Shut the engine down.
    Close,
}

/// A running race engine.
///
/// Starting the engine spawns a driver thread that owns the physics and
/// chronometer clocks. This handle is the window to interact with it.
pub struct RaceEngine {
    /// The race state shared with the engine thread.
    pub state: ReadOnlyState,
    join_handle: Option<JoinHandle<EngineResult>>,
    command_tx: Sender<EngineCommand>,
    tick_signal: TickSignal,
}

impl RaceEngine {
    /// Load the configured track, open the peer socket (in multiplayer)
    /// and start the engine thread.
    ///
    /// The only fatal start errors are an unknown map and, when
    /// multiplayer was requested, an unavailable socket.
    pub fn start(config: EngineConfig) -> Result<RaceEngine, EngineError> {
        let track = match &config.track {
            Some(track) => track.clone(),
            None => track::TrackData::for_map(config.map)?,
        };
        let self_id = net::PeerId::from_hardware(&config.hardware_addr);
        let player_index = match config.mode {
            RaceMode::SinglePlayer => 0,
            RaceMode::MultiPlayer => self_id.slot(),
        };
        let netplay = match config.mode {
            RaceMode::SinglePlayer => None,
            RaceMode::MultiPlayer => Some(engine::Netplay::open(config.port, self_id)?),
        };

        let state = Arc::new(RwLock::new(RaceState::new(
            track,
            config.mode,
            player_index,
            &config.player_name,
        )));
        let (command_tx, command_rx) = mpsc::channel();
        let tick_signal = TickSignal::new();

        let join_handle = {
            let state = state.clone();
            let signal = tick_signal.clone();
            signal.enable();
            thread::Builder::new()
                .name("race engine".into())
                .spawn(move || {
                    let result = engine::run(config, state, command_rx, &signal, netplay);
                    signal.disable();
                    result
                })
                .expect("should be able to spawn the engine thread")
        };

        Ok(RaceEngine {
            state: ReadOnlyState::new(state),
            join_handle: Some(join_handle),
            command_tx,
            tick_signal,
        })
    }

    /// Returns `true` once the engine thread has finished.
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Joins the engine thread and returns its result.
    ///
    /// The result is only returned the first time this is called after
    /// the thread finished.
    pub fn join(&mut self) -> Option<EngineResult> {
        self.join_handle.take().map(|handle| {
            handle
                .join()
                .expect("should be able to join the engine thread")
        })
    }

    /// Send a command to the engine. Sends after shutdown are dropped.
    pub fn send(&self, command: EngineCommand) {
        if !self.is_finished() {
            _ = self.command_tx.send(command);
        }
    }

    /// Hand the engine the freshest input snapshot.
    pub fn set_input(&self, input: InputSnapshot) {
        self.send(EngineCommand::Input(input));
    }

    pub fn pause_toggle(&self) {
        self.send(EngineCommand::PauseToggle);
    }

    pub fn set_ready(&self, ready: bool) {
        self.send(EngineCommand::SetReady(ready));
    }

    pub fn reset(&self) {
        self.send(EngineCommand::Reset);
    }

    pub fn clear_events(&self) {
        self.send(EngineCommand::ClearEvents);
    }

    /// Ask the engine to shut down. It broadcasts its goodbye, cancels
    /// both clocks and ends the thread.
    pub fn stop(&self) {
        self.send(EngineCommand::Close);
    }

    /// Block until the next executed tick.
    pub fn wait_for_update(&self) -> Result<(), WaitError> {
        self.tick_signal.wait()
    }

    /// Block until the next executed tick or until the timeout expires.
    pub fn wait_for_update_timeout(&self, duration: Duration) -> Result<(), WaitError> {
        self.tick_signal.wait_timeout(duration)
    }
}

/// A read only view of the race state.
///
/// Reading locks out the tick for the duration of the guard, which is
/// what guarantees the renderer a coherent snapshot. Hold the guard
/// briefly; [`ReadOnlyState::snapshot`] clones the whole state for
/// anyone who wants to keep it.
#[derive(Clone)]
pub struct ReadOnlyState {
    state: Arc<RwLock<RaceState>>,
}

impl ReadOnlyState {
    fn new(state: Arc<RwLock<RaceState>>) -> ReadOnlyState {
        ReadOnlyState { state }
    }

    /// Lock and read the current state.
    pub fn read(
        &self,
    ) -> Result<RwLockReadGuard<'_, RaceState>, PoisonError<RwLockReadGuard<'_, RaceState>>> {
        self.state.read()
    }

    /// A clone of the current state, detached from the lock.
    pub fn snapshot(&self) -> Result<RaceState, PoisonError<RwLockReadGuard<'_, RaceState>>> {
        Ok(self.read()?.clone())
    }
}

/// An error that can occur when waiting for a tick.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("the engine is not running")]
    EngineStopped,
    #[error("wait timeout expired")]
    TimeoutExpired,
}

/// A signal that fires after every executed tick.
///
/// A wrapper around a condvar; the engine enables it on start, triggers
/// it per tick and disables it on shutdown, waking every waiter.
#[derive(Clone)]
pub struct TickSignal {
    pair: Arc<(Mutex<SignalState>, Condvar)>,
}

struct SignalState {
    enabled: bool,
    counter: usize,
}

impl TickSignal {
    fn new() -> TickSignal {
        TickSignal {
            pair: Arc::new((
                Mutex::new(SignalState {
                    enabled: false,
                    counter: 0,
                }),
                Condvar::new(),
            )),
        }
    }

    fn enable(&self) {
        let (state, _) = &*self.pair;
        state
            .lock()
            .expect("tick signal lock should not be poisoned")
            .enabled = true;
    }

    fn disable(&self) {
        let (state, var) = &*self.pair;
        state
            .lock()
            .expect("tick signal lock should not be poisoned")
            .enabled = false;
        var.notify_all();
    }

    /// Wake every waiter. Does nothing while disabled.
    pub fn trigger(&self) {
        let (state_mutex, var) = &*self.pair;
        let mut state = state_mutex
            .lock()
            .expect("tick signal lock should not be poisoned");
        if !state.enabled {
            return;
        }
        state.counter = state.counter.wrapping_add(1);
        var.notify_all();
    }

    /// Block until the next trigger. Errors when the engine stops.
    pub fn wait(&self) -> Result<(), WaitError> {
        let (state_mutex, var) = &*self.pair;
        let mut state = state_mutex
            .lock()
            .expect("tick signal lock should not be poisoned");
        if !state.enabled {
            return Err(WaitError::EngineStopped);
        }
        let seen = state.counter;
        while state.enabled && state.counter == seen {
            state = var
                .wait(state)
                .expect("tick signal lock should not be poisoned");
        }
        if !state.enabled {
            return Err(WaitError::EngineStopped);
        }
        Ok(())
    }

    /// Block until the next trigger or until the timeout expires.
    pub fn wait_timeout(&self, duration: Duration) -> Result<(), WaitError> {
        let (state_mutex, var) = &*self.pair;
        let mut state = state_mutex
            .lock()
            .expect("tick signal lock should not be poisoned");
        if !state.enabled {
            return Err(WaitError::EngineStopped);
        }
        let seen = state.counter;
        while state.enabled && state.counter == seen {
            let (next_state, result) = var
                .wait_timeout(state, duration)
                .expect("tick signal lock should not be poisoned");
            state = next_state;
            if result.timed_out() && state.enabled && state.counter == seen {
                return Err(WaitError::TimeoutExpired);
            }
        }
        if !state.enabled {
            return Err(WaitError::EngineStopped);
        }
        Ok(())
    }
}
