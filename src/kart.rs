use crate::items::ItemKind;
use crate::math::{Angle, Fixed, Vec2};

/// The "diameter" of a kart in world units.
pub const KART_SIZE: Fixed = Fixed::from_int(16);

/// Below this speed a kart snaps to a standstill.
pub const MIN_SPEED_THRESHOLD: Fixed = Fixed::from_raw(32);

/// State for one racer.
///
/// Movement always follows the facing angle; the speed is a non negative
/// scalar that never exceeds `max_speed`.
#[derive(Debug, Clone)]
pub struct Kart {
    /// Display name of the racer.
    pub name: String,
    /// Absolute position in world coordinates.
    pub pos: Vec2,
    /// Scalar speed in units per tick.
    pub speed: Fixed,
    /// Top speed in units per tick.
    pub max_speed: Fixed,
    /// Speed gained per accelerate call.
    pub accel_rate: Fixed,
    /// Multiplicative friction applied every tick, in `[0, 1]`.
    pub friction: Fixed,
    /// Facing angle.
    pub angle: Angle,
    /// Completed laps.
    pub lap: u32,
    /// 1 based race position; zero until the first rank pass.
    pub rank: u8,
    /// Index of the last crossed checkpoint, -1 before the first.
    pub last_checkpoint: i32,
    /// The held inventory item.
    pub item: ItemKind,
    /// Chronometer reading at the start of the current lap.
    pub lap_start_ms: u64,
    /// Completed lap times in chronometer milliseconds.
    pub lap_times_ms: Vec<u64>,
    /// Opaque sprite slot owned by the renderer.
    pub display_handle: u32,
}

impl Kart {
    pub fn new(
        pos: Vec2,
        name: impl Into<String>,
        max_speed: Fixed,
        accel_rate: Fixed,
        friction: Fixed,
    ) -> Kart {
        Kart {
            name: name.into(),
            pos,
            speed: Fixed::ZERO,
            max_speed,
            accel_rate,
            friction: friction.clamp(Fixed::ZERO, Fixed::ONE),
            angle: Angle::ZERO,
            lap: 0,
            rank: 0,
            last_checkpoint: -1,
            item: ItemKind::None,
            lap_start_ms: 0,
            lap_times_ms: Vec::new(),
            display_handle: 0,
        }
    }

    /// Reset race state but keep the name and the physics tuning.
    pub fn reset(&mut self, spawn: Vec2, angle: Angle) {
        self.pos = spawn;
        self.speed = Fixed::ZERO;
        self.angle = angle;
        self.lap = 0;
        self.rank = 0;
        self.last_checkpoint = -1;
        self.item = ItemKind::None;
        self.lap_start_ms = 0;
        self.lap_times_ms.clear();
    }

    pub fn accelerate(&mut self) {
        self.speed = (self.speed + self.accel_rate).min(self.max_speed);
    }

    /// Slow down by one acceleration step. Overshoot snaps to zero.
    pub fn brake(&mut self) {
        self.speed = (self.speed - self.accel_rate).max(Fixed::ZERO);
    }

    /// Turn by an angle delta. Steering is permitted at any speed.
    pub fn steer(&mut self, delta: i32) {
        self.angle = self.angle.wrapping_add(delta);
    }

    /// Advance one physics tick: friction, standstill snap, clamp and
    /// position integration.
    pub fn tick_update(&mut self) {
        self.speed = self.speed.mul(self.friction);
        if self.speed <= MIN_SPEED_THRESHOLD {
            self.speed = Fixed::ZERO;
        }
        self.speed = self.speed.clamp(Fixed::ZERO, self.max_speed);
        self.pos += Vec2::from_angle(self.angle).scale(self.speed);
    }

    /// The current velocity vector.
    pub fn velocity(&self) -> Vec2 {
        Vec2::from_angle(self.angle).scale(self.speed)
    }

    /// Add a velocity to the current one and re-decompose the result into
    /// speed and facing. A zero result keeps the prior facing.
    pub fn apply_impulse(&mut self, v: Vec2) {
        self.set_velocity(self.velocity() + v);
    }

    /// Replace the velocity outright; same decomposition as an impulse.
    /// The magnitude is capped to `max_speed`.
    pub fn set_velocity(&mut self, v: Vec2) {
        if v.is_zero() {
            self.speed = Fixed::ZERO;
            return;
        }
        self.speed = v.len().min(self.max_speed);
        self.angle = v.to_angle();
    }

    /// Direct facing write; reserved for respawn and teleport paths.
    pub fn set_angle(&mut self, angle: Angle) {
        self.angle = angle;
    }

    /// Direct position write; reserved for respawn and teleport paths.
    pub fn set_position(&mut self, pos: Vec2) {
        self.pos = pos;
    }

    pub fn lap_complete(&mut self) {
        self.lap += 1;
    }

    /// Close the current lap on the chronometer and return its time.
    pub fn record_lap_time(&mut self, now_ms: u64) -> u64 {
        let time = now_ms.saturating_sub(self.lap_start_ms);
        self.lap_times_ms.push(time);
        self.lap_start_ms = now_ms;
        time
    }

    /// The fastest completed lap, if any.
    pub fn best_lap_ms(&self) -> Option<u64> {
        self.lap_times_ms.iter().copied().min()
    }
}
