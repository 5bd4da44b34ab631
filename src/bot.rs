//! Bot drivers for slots without a human or a remote peer behind them.
//!
//! A bot produces the same per tick [`InputSnapshot`] the local player
//! produces, so it occupies the exact data contract of any other kart.

use rand::Rng;
use rand::SeedableRng;

use crate::input::{Buttons, InputSnapshot};
use crate::items::ItemKind;
use crate::kart::Kart;
use crate::race::RaceState;
use crate::StdRng;

/// Steering slack in angle units before a bot bothers correcting.
const STEER_DEADZONE: i32 = 3;

/// One in this many ticks a bot fumbles and steers off line.
const MISTAKE_CHANCE: u32 = 240;

/// How long a fumble lasts.
const MISTAKE_TICKS: u32 = 20;

/// Ticks a bot sits on an item before using it.
const ITEM_DELAY_TICKS: u32 = 30;

/// Progress lead (in checkpoints) over the player at which a bot eases
/// off to keep the race close.
const RUBBER_BAND_LEAD: i64 = 2;

/// A waypoint following driver for one kart slot.
#[derive(Debug)]
pub struct BotDriver {
    slot: usize,
    rng: StdRng,
    mistake_ticks: u32,
    mistake_steer: i32,
    item_held_ticks: u32,
}

impl BotDriver {
    pub fn new(slot: usize, seed: u64) -> BotDriver {
        BotDriver {
            slot,
            rng: StdRng::seed_from_u64(seed.wrapping_add(slot as u64)),
            mistake_ticks: 0,
            mistake_steer: 0,
            item_held_ticks: 0,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Decide the inputs for this tick.
    pub fn drive(&mut self, state: &RaceState) -> InputSnapshot {
        let kart = &state.karts[self.slot];
        let mut buttons = Buttons::empty();

        // Aim at the middle of the next checkpoint.
        let target = state.track.next_checkpoint(kart.last_checkpoint).center();
        let desired = (target - kart.pos).to_angle();
        let mut arc = kart.angle.arc_to(desired);

        if self.mistake_ticks > 0 {
            self.mistake_ticks -= 1;
            arc += self.mistake_steer * 16;
        } else if self.rng.gen_range(0..MISTAKE_CHANCE) == 0 {
            self.mistake_ticks = MISTAKE_TICKS;
            self.mistake_steer = if self.rng.gen_bool(0.5) { 1 } else { -1 };
        }

        if arc > STEER_DEADZONE {
            buttons |= Buttons::STEER_RIGHT;
        } else if arc < -STEER_DEADZONE {
            buttons |= Buttons::STEER_LEFT;
        }

        // Rubber band: full throttle unless comfortably ahead of the
        // player, then coast back into reach.
        let player = &state.karts[state.player_index];
        let lead = progress(kart) - progress(player);
        if lead < RUBBER_BAND_LEAD || kart.speed < kart.max_speed.div(crate::math::Fixed::from_int(2))
        {
            buttons |= Buttons::ACCELERATE;
        }

        if kart.item != ItemKind::None {
            self.item_held_ticks += 1;
            if self.item_held_ticks >= ITEM_DELAY_TICKS && self.wants_to_use(kart) {
                buttons |= Buttons::USE_ITEM;
                self.item_held_ticks = 0;
            }
        } else {
            self.item_held_ticks = 0;
        }

        InputSnapshot::new(buttons)
    }

    fn wants_to_use(&mut self, kart: &Kart) -> bool {
        match kart.item {
            ItemKind::GreenShell | ItemKind::RedShell | ItemKind::Missile => true,
            // Hazards pay off at the front of the field.
            ItemKind::Banana | ItemKind::Bomb | ItemKind::Oil => kart.rank <= 2,
            // Boost style items help the trailing half.
            ItemKind::Mushroom | ItemKind::SpeedBoost => kart.rank >= 4,
            _ => false,
        }
    }
}

/// Coarse race progress: laps weigh heavier than checkpoints.
fn progress(kart: &Kart) -> i64 {
    kart.lap as i64 * 64 + (kart.last_checkpoint as i64 + 1)
}
