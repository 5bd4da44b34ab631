//! The race itself: the kart array, the phase machine and the physics
//! tick that advances the whole world at a fixed rate.

use tracing::{debug, info};

use crate::input::InputSnapshot;
use crate::items::{ItemKind, ItemSystem};
use crate::kart::{Kart, KART_SIZE};
use crate::math::{Angle, Fixed, Vec2};
use crate::net::{Message, Packet};
use crate::track::{Rect, TrackData, WORLD_SIZE};
use crate::StdRng;

/// Physics ticks per second.
pub const RACE_TICK_FREQ: u32 = 60;

/// Size of the kart array; also the participant cap.
pub const MAX_CARS: usize = 8;

/// Countdown length before the lights go green (3 s).
pub const COUNTDOWN_TICKS: u32 = 180;

/// Angle units a kart turns per tick of held steering.
pub const STEER_RATE: i32 = 4;

const DEFAULT_MAX_SPEED: Fixed = Fixed::from_int(4);
const DEFAULT_ACCEL_RATE: Fixed = Fixed::from_raw(48);
const DEFAULT_FRICTION: Fixed = Fixed::from_raw(250);

/// The lifecycle of a race.
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum RacePhase {
    /// Karts are on the grid, waiting for the countdown.
    #[default]
    Ready,
    /// The countdown is running.
    Countdown,
    /// The race is on.
    Running,
    /// Someone completed the final lap.
    Finished,
}

impl RacePhase {
    /// Returns the next phase in order. A finished race does not advance
    /// further.
    pub fn next(&self) -> RacePhase {
        use RacePhase::*;
        match self {
            Ready => Countdown,
            Countdown => Running,
            Running => Finished,
            Finished => Finished,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum RaceMode {
    #[default]
    SinglePlayer,
    MultiPlayer,
}

/// Events emitted by the tick for collaborators (audio, UI, the network
/// layer). Cleared on request through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceEvent {
    CountdownStarted,
    RaceStarted,
    BoxPickup {
        box_index: usize,
        slot: usize,
    },
    ItemPlaced {
        slot: usize,
        kind: ItemKind,
        pos: Vec2,
        angle: Angle,
        speed: Fixed,
    },
    EffectStarted {
        slot: usize,
        kind: ItemKind,
    },
    KartHit {
        slot: usize,
        kind: ItemKind,
    },
    LapCompleted {
        slot: usize,
        lap: u32,
        time_ms: u64,
    },
    RaceFinished {
        winner: usize,
    },
}

/// The whole mutable world of one race.
///
/// Created once per race, advanced only by [`RaceState::tick`] and by the
/// network receive path, and read by the renderer through the engine's
/// shared handle.
#[derive(Debug, Clone)]
pub struct RaceState {
    pub phase: RacePhase,
    pub mode: RaceMode,
    pub track: TrackData,
    pub karts: [Kart; MAX_CARS],
    /// Participating slots; slots beyond this are unused.
    pub car_count: usize,
    /// The slot the local input controls.
    pub player_index: usize,
    pub total_laps: u32,
    pub paused: bool,
    pub finished: bool,
    pub countdown_ticks: u32,
    /// Physics ticks since the green light.
    pub tick_count: u64,
    /// Chronometer milliseconds, advanced by the tick driver.
    pub elapsed_ms: u64,
    /// Slots simulated on this machine (the player and its bots). Remote
    /// slots are written by the network receive path instead.
    pub local_slots: [bool; MAX_CARS],
    pub items: ItemSystem,
    pub events: Vec<RaceEvent>,
}

impl RaceState {
    pub fn new(
        track: TrackData,
        mode: RaceMode,
        player_index: usize,
        player_name: &str,
    ) -> RaceState {
        let car_count = MAX_CARS.min(track.spawns.len());
        let karts: [Kart; MAX_CARS] = std::array::from_fn(|i| {
            let spawn = track.spawns.get(i).copied().unwrap_or(Vec2::ZERO);
            let name = if i == player_index {
                player_name.to_string()
            } else {
                format!("Racer {}", i + 1)
            };
            let mut kart = Kart::new(
                spawn,
                name,
                DEFAULT_MAX_SPEED,
                DEFAULT_ACCEL_RATE,
                DEFAULT_FRICTION,
            );
            kart.set_angle(track.spawn_angle);
            kart.display_handle = i as u32;
            kart
        });

        let mut local_slots = [false; MAX_CARS];
        match mode {
            RaceMode::SinglePlayer => {
                for slot in local_slots.iter_mut().take(car_count) {
                    *slot = true;
                }
            }
            RaceMode::MultiPlayer => {
                local_slots[player_index] = true;
            }
        }

        RaceState {
            phase: RacePhase::Ready,
            mode,
            items: ItemSystem::new(&track),
            total_laps: track.laps,
            karts,
            car_count,
            player_index,
            paused: false,
            finished: false,
            countdown_ticks: 0,
            tick_count: 0,
            elapsed_ms: 0,
            local_slots,
            events: Vec::new(),
            track,
        }
    }

    /// Begin the countdown. Only meaningful while on the grid.
    pub fn start_countdown(&mut self) {
        if self.phase != RacePhase::Ready {
            return;
        }
        self.countdown_ticks = COUNTDOWN_TICKS;
        self.phase = RacePhase::Countdown;
        self.events.push(RaceEvent::CountdownStarted);
        info!("countdown started on {:?}", self.track.map);
    }

    /// Return every kart to its grid slot, from any phase.
    pub fn reset(&mut self) {
        for (i, kart) in self.karts.iter_mut().enumerate() {
            let spawn = self.track.spawns.get(i).copied().unwrap_or(Vec2::ZERO);
            kart.reset(spawn, self.track.spawn_angle);
        }
        self.items.reset(&self.track);
        self.phase = RacePhase::Ready;
        self.paused = false;
        self.finished = false;
        self.countdown_ticks = 0;
        self.tick_count = 0;
        self.elapsed_ms = 0;
        self.events.clear();
        info!("race reset on {:?}", self.track.map);
    }

    /// Whole seconds left on the countdown clock, rounded up.
    pub fn countdown_seconds_left(&self) -> u32 {
        (self.countdown_ticks + RACE_TICK_FREQ - 1) / RACE_TICK_FREQ
    }

    /// The participating karts.
    pub fn karts(&self) -> &[Kart] {
        &self.karts[..self.car_count]
    }

    /// Advance the world by one physics tick.
    ///
    /// `inputs` holds one entry per slot: the player's snapshot, a bot
    /// decision, or `None` for slots driven by the network. `packets` are
    /// the datagrams received since the last tick; while running they are
    /// applied at the start of the item stage.
    pub fn tick(
        &mut self,
        inputs: &[Option<InputSnapshot>; MAX_CARS],
        packets: &[Packet],
        rng: &mut StdRng,
    ) {
        if self.paused {
            // A local pause does not stop the other peers; their state
            // still lands.
            self.apply_packets(packets);
            return;
        }
        match self.phase {
            RacePhase::Countdown => {
                self.apply_packets(packets);
                self.countdown_ticks = self.countdown_ticks.saturating_sub(1);
                if self.countdown_ticks == 0 {
                    self.phase = RacePhase::Running;
                    self.events.push(RaceEvent::RaceStarted);
                    info!("race started on {:?}", self.track.map);
                }
            }
            RacePhase::Running => self.run_tick(inputs, packets, rng),
            RacePhase::Ready | RacePhase::Finished => self.apply_packets(packets),
        }
    }

    /// Apply one received packet. Later packets for the same slot simply
    /// overwrite earlier ones.
    pub fn apply_packet(&mut self, packet: Packet) {
        let slot = packet.sender.slot();
        match packet.message {
            Message::CarUpdate(update) => {
                if slot == self.player_index || slot >= MAX_CARS {
                    return;
                }
                let kart = &mut self.karts[slot];
                kart.set_position(update.pos);
                kart.speed = update.speed.clamp(Fixed::ZERO, kart.max_speed);
                kart.set_angle(update.angle);
                kart.lap = update.lap;
                kart.item = update.item;
            }
            Message::ItemPlacement(placement) => {
                self.items.place_remote(
                    placement.kind,
                    placement.pos,
                    placement.angle,
                    placement.speed,
                );
            }
            Message::BoxPickup { index } => {
                self.items.box_pickup_remote(index as usize);
            }
            Message::Disconnect => {
                debug!("{} left the race", packet.sender);
            }
            // Lobby chatter during a race only refreshes liveness, which
            // the lobby tracks; the race itself ignores it.
            _ => {}
        }
    }

    fn apply_packets(&mut self, packets: &[Packet]) {
        for packet in packets {
            self.apply_packet(*packet);
        }
    }

    fn run_tick(
        &mut self,
        inputs: &[Option<InputSnapshot>; MAX_CARS],
        packets: &[Packet],
        rng: &mut StdRng,
    ) {
        self.tick_count += 1;

        // Inputs: the local kart first, then every other locally driven
        // slot. Confusion inverts the player's steering.
        for slot in 0..self.car_count {
            let Some(input) = inputs[slot] else {
                continue;
            };
            let inverted = slot == self.player_index && self.items.effects.confusion_active();
            let steer = if inverted { -input.steer() } else { input.steer() };
            self.karts[slot].steer(steer * STEER_RATE);
            if input.accelerate() {
                self.karts[slot].accelerate();
            }
            if input.brake() {
                self.karts[slot].brake();
            }
            if input.use_item() {
                self.items.use_item(
                    &mut self.karts[..self.car_count],
                    slot,
                    self.player_index,
                    input.fire_forward(),
                    &mut self.events,
                );
            }
        }

        // Integrate every kart, remembering where it came from for the
        // wall response.
        let prev: [Vec2; MAX_CARS] = std::array::from_fn(|i| self.karts[i].pos);
        for kart in self.karts[..self.car_count].iter_mut() {
            kart.tick_update();
        }

        // Network receive lands at the start of the item stage: received
        // positions are already integrated on the sending side, and
        // received placements take effect this very tick.
        self.apply_packets(packets);

        self.items.tick(
            &mut self.karts[..self.car_count],
            self.player_index,
            &self.local_slots,
            &self.track,
            rng,
            &mut self.events,
        );

        for slot in 0..self.car_count {
            clamp_to_world(&mut self.karts[slot]);
            collide_with_walls(&self.track, &mut self.karts[slot], prev[slot]);
        }

        self.cross_checkpoints();
        self.recompute_ranks();

        if !self.finished {
            if let Some(winner) = self
                .karts()
                .iter()
                .position(|kart| kart.lap >= self.total_laps)
            {
                self.finished = true;
                self.phase = RacePhase::Finished;
                self.events.push(RaceEvent::RaceFinished { winner });
                info!("race finished, winner {}", self.karts[winner].name);
            }
        }
    }

    fn cross_checkpoints(&mut self) {
        let checkpoints = &self.track.checkpoints;
        let final_index = checkpoints.len() as i32 - 1;
        let now_ms = self.elapsed_ms;
        for (slot, kart) in self.karts[..self.car_count].iter_mut().enumerate() {
            let next = kart.last_checkpoint + 1;
            if next > final_index {
                continue;
            }
            if !checkpoints[next as usize].contains(kart.pos) {
                continue;
            }
            kart.last_checkpoint = next;
            if next == final_index {
                kart.lap_complete();
                kart.last_checkpoint = 0;
                let time_ms = kart.record_lap_time(now_ms);
                self.events.push(RaceEvent::LapCompleted {
                    slot,
                    lap: kart.lap,
                    time_ms,
                });
            }
        }
    }

    /// Deterministic ranking: most laps first, then the furthest
    /// checkpoint, then whoever is closest to the next one.
    fn recompute_ranks(&mut self) {
        let mut order: Vec<usize> = (0..self.car_count).collect();
        {
            let karts = &self.karts;
            let track = &self.track;
            order.sort_by(|&a, &b| {
                let (ka, kb) = (&karts[a], &karts[b]);
                kb.lap
                    .cmp(&ka.lap)
                    .then(kb.last_checkpoint.cmp(&ka.last_checkpoint))
                    .then_with(|| {
                        let da = ka
                            .pos
                            .distance_squared(track.next_checkpoint(ka.last_checkpoint).center());
                        let db = kb
                            .pos
                            .distance_squared(track.next_checkpoint(kb.last_checkpoint).center());
                        da.cmp(&db)
                    })
            });
        }
        for (position, slot) in order.into_iter().enumerate() {
            self.karts[slot].rank = (position + 1) as u8;
        }
    }
}

/// Keep the kart inside `[0, WORLD_SIZE - KART_SIZE]` on both axes.
fn clamp_to_world(kart: &mut Kart) {
    let max = Fixed::from_int(WORLD_SIZE) - KART_SIZE;
    let clamped = Vec2::new(
        kart.pos.x.clamp(Fixed::ZERO, max),
        kart.pos.y.clamp(Fixed::ZERO, max),
    );
    kart.set_position(clamped);
}

/// On wall contact, restore the pre step position and zero the velocity
/// component along the wall normal.
fn collide_with_walls(track: &TrackData, kart: &mut Kart, prev: Vec2) {
    let half = KART_SIZE.div(Fixed::from_int(2));
    let area = Rect::new(
        Vec2::new(kart.pos.x - half, kart.pos.y - half),
        Vec2::new(kart.pos.x + half, kart.pos.y + half),
    );
    for wall in track.walls_near(&area) {
        if !wall.overlaps(&area) {
            continue;
        }
        let prev_area = Rect::new(
            Vec2::new(prev.x - half, prev.y - half),
            Vec2::new(prev.x + half, prev.y + half),
        );
        let mut velocity = kart.velocity();
        let separated_x = prev_area.max.x < wall.min.x || prev_area.min.x > wall.max.x;
        let separated_y = prev_area.max.y < wall.min.y || prev_area.min.y > wall.max.y;
        if separated_x {
            velocity.x = Fixed::ZERO;
        }
        if separated_y {
            velocity.y = Fixed::ZERO;
        }
        if !separated_x && !separated_y {
            // Already inside somehow; stop outright.
            velocity = Vec2::ZERO;
        }
        kart.set_position(prev);
        kart.set_velocity(velocity);
        break;
    }
}
