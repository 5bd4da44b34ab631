//! The tick driver: a 60 Hz physics clock and a millisecond chronometer,
//! both suspended by pause and cancelled by stop.
//!
//! The driver runs on its own thread, owns the pending input snapshot,
//! the bot drivers and the network connection, and is the only writer of
//! the shared race state besides the packets it applies.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::bot::BotDriver;
use crate::input::InputSnapshot;
use crate::net::{
    broadcast_car, broadcast_events, ConnectionError, Lobby, Message, Packet, PeerId, PeerSocket,
    RACE_PORT,
};
use crate::race::{RaceMode, RacePhase, RaceState, MAX_CARS, RACE_TICK_FREQ};
use crate::track::{Map, TrackData};
use crate::{EngineCommand, EngineError, StdRng, TickSignal};

/// Configuration for [`crate::RaceEngine::start`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The built in map to race on.
    pub map: Map,
    /// Explicit track data; overrides `map` when set.
    pub track: Option<TrackData>,
    pub mode: RaceMode,
    pub player_name: String,
    /// Hardware address the peer identity derives from.
    pub hardware_addr: [u8; 6],
    /// UDP port for peer traffic.
    pub port: u16,
    /// Seed of the deterministic PRNG.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            map: Map::ScorchingSands,
            track: None,
            mode: RaceMode::SinglePlayer,
            player_name: "Player".to_string(),
            hardware_addr: [0x02, 0, 0, 0, 0, 0],
            port: RACE_PORT,
            seed: 0x6b61_7274_5f64_6873,
        }
    }
}

/// The network side of a multiplayer session.
pub(crate) struct Netplay {
    socket: PeerSocket,
    lobby: Lobby,
    /// Index into the state's event list up to which events went out.
    events_cursor: usize,
}

impl Netplay {
    pub(crate) fn open(port: u16, self_id: PeerId) -> Result<Netplay, ConnectionError> {
        let socket = PeerSocket::open(port, self_id)?;
        Ok(Netplay {
            socket,
            lobby: Lobby::new(self_id),
            events_cursor: 0,
        })
    }
}

/// The engine thread body.
pub(crate) fn run(
    config: EngineConfig,
    state: Arc<RwLock<RaceState>>,
    command_rx: Receiver<EngineCommand>,
    tick_signal: &TickSignal,
    mut netplay: Option<Netplay>,
) -> Result<(), EngineError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut input = InputSnapshot::default();
    let mut pause_button_down = false;

    let mut bots: Vec<BotDriver> = match state.read() {
        Ok(state) => state
            .local_slots
            .iter()
            .enumerate()
            .take(state.car_count)
            .filter(|(slot, local)| **local && *slot != state.player_index)
            .map(|(slot, _)| BotDriver::new(slot, config.seed))
            .collect(),
        Err(_) => {
            error!("race state was poisoned before the first tick");
            return Ok(());
        }
    };

    // A single player race starts its countdown right away; a multiplayer
    // race first gathers peers in the lobby.
    if let Ok(mut state) = state.write() {
        match netplay.as_mut() {
            None => state.start_countdown(),
            Some(np) => {
                if let Err(e) = np.lobby.join(&np.socket) {
                    warn!("lobby join failed: {e}");
                }
            }
        }
    }

    let tick_period = Duration::from_micros(1_000_000 / RACE_TICK_FREQ as u64);
    let mut next_tick = Instant::now();
    let mut chrono_mark = Instant::now();

    loop {
        let mut close = false;
        loop {
            match command_rx.try_recv() {
                Ok(command) => {
                    if handle_command(command, &state, &mut netplay, &mut input) {
                        close = true;
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Every handle is gone; nobody can talk to this engine
                    // any more, so quit instead of leaking the thread.
                    error!("every engine handle was dropped, shutting down");
                    close = true;
                    break;
                }
            }
        }
        if close {
            break;
        }

        // The pause button is edge triggered.
        if input.pause() != pause_button_down {
            pause_button_down = input.pause();
            if pause_button_down {
                toggle_pause(&state);
            }
        }

        let now = Instant::now();
        if now < next_tick {
            thread::sleep((next_tick - now).min(Duration::from_millis(1)));
            continue;
        }
        next_tick += tick_period;
        if now > next_tick + tick_period * 30 {
            // Fell way behind (debugger, suspend); do not spiral.
            next_tick = now;
        }

        let Ok(mut state) = state.write() else {
            error!("race state was poisoned");
            break;
        };

        // The chronometer counts whole milliseconds while the race runs;
        // pausing suspends it along with the physics.
        let ms = chrono_mark.elapsed().as_millis() as u64;
        if ms > 0 {
            chrono_mark += Duration::from_millis(ms);
            if state.phase == RacePhase::Running && !state.paused {
                state.elapsed_ms += ms;
            }
        }

        match state.phase {
            RacePhase::Ready => {
                if let Some(np) = netplay.as_mut() {
                    if let Err(e) = np.lobby.update(&mut np.socket) {
                        warn!("lobby update failed: {e}");
                    }
                    if np.lobby.all_ready() {
                        state.start_countdown();
                    }
                }
            }
            RacePhase::Countdown | RacePhase::Running | RacePhase::Finished => {
                // Drained packets are handed to the tick, which applies
                // them at the start of its item stage.
                let mut packets: Vec<Packet> = Vec::new();
                if let Some(np) = netplay.as_mut() {
                    loop {
                        match np.socket.poll() {
                            Ok(Some(packet)) => packets.push(packet),
                            Ok(None) => break,
                            Err(e) => {
                                warn!("receive failed: {e}");
                                break;
                            }
                        }
                    }
                }

                let mut inputs: [Option<InputSnapshot>; MAX_CARS] = [None; MAX_CARS];
                inputs[state.player_index] = Some(input);
                if state.phase == RacePhase::Running && !state.paused {
                    for bot in bots.iter_mut() {
                        inputs[bot.slot()] = Some(bot.drive(&state));
                    }
                }

                state.tick(&inputs, &packets, &mut rng);

                if let Some(np) = netplay.as_mut() {
                    if state.phase == RacePhase::Running && !state.paused {
                        if let Err(e) = broadcast_car(&np.socket, &state) {
                            warn!("car update broadcast failed: {e}");
                        }
                    }
                    match broadcast_events(&np.socket, &state, np.events_cursor) {
                        Ok(cursor) => np.events_cursor = cursor,
                        Err(e) => warn!("event broadcast failed: {e}"),
                    }
                }
            }
        }

        drop(state);
        tick_signal.trigger();
    }

    if let Some(np) = netplay.as_ref() {
        // Best effort goodbye so peers do not wait out the timeout.
        if let Err(e) = np.socket.broadcast(&Message::Disconnect) {
            debug!("disconnect broadcast failed: {e}");
        }
        info!("left the session");
    }
    info!("engine stopped");
    Ok(())
}

/// Returns true when the engine should shut down.
fn handle_command(
    command: EngineCommand,
    state: &Arc<RwLock<RaceState>>,
    netplay: &mut Option<Netplay>,
    input: &mut InputSnapshot,
) -> bool {
    match command {
        EngineCommand::Close => return true,
        EngineCommand::Input(snapshot) => *input = snapshot,
        EngineCommand::PauseToggle => toggle_pause(state),
        EngineCommand::SetReady(ready) => match netplay.as_mut() {
            Some(np) => {
                if let Err(e) = np.lobby.set_ready(ready, &np.socket) {
                    warn!("ready broadcast failed: {e}");
                }
            }
            None => debug!("ready flag outside of multiplayer"),
        },
        EngineCommand::Reset => {
            if let Ok(mut state) = state.write() {
                state.reset();
                if netplay.is_none() {
                    state.start_countdown();
                }
            }
            if let Some(np) = netplay.as_mut() {
                np.events_cursor = 0;
            }
        }
        EngineCommand::ClearEvents => {
            if let Ok(mut state) = state.write() {
                state.events.clear();
            }
            if let Some(np) = netplay.as_mut() {
                np.events_cursor = 0;
            }
        }
    }
    false
}

fn toggle_pause(state: &Arc<RwLock<RaceState>>) {
    if let Ok(mut state) = state.write() {
        state.paused = !state.paused;
        info!(
            "race {}",
            if state.paused { "paused" } else { "resumed" }
        );
    }
}
