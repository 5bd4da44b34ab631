use tracing::debug;

use crate::math::{Angle, Fixed, Vec2};

use super::ItemKind;

/// Capacity of the track item pool.
pub const TRACK_ITEM_POOL_SIZE: usize = 32;

/// Ticks until a consumed item box reappears.
pub const ITEM_BOX_RESPAWN_TICKS: u32 = 300;

/// Hitbox "diameter" of an item box.
pub const ITEM_BOX_HITBOX: Fixed = Fixed::from_int(16);

/// Infinite lifetime sentinel.
pub const LIFETIME_INFINITE: i32 = -1;

/// No homing target sentinel.
pub const NO_TARGET: i32 = -1;

/// One element of the track item pool: a hazard lying on the track or a
/// projectile in flight.
#[derive(Debug, Clone, Copy)]
pub struct TrackItem {
    pub kind: ItemKind,
    pub pos: Vec2,
    /// Where the item was spawned.
    pub start_pos: Vec2,
    /// Units per tick; zero for hazards.
    pub speed: Fixed,
    pub angle: Angle,
    /// Hitbox width ("diameter" for collision tests).
    pub width: Fixed,
    pub height: Fixed,
    /// Remaining lifetime in ticks, [`LIFETIME_INFINITE`] for none.
    pub lifetime: i32,
    /// Kart index a homing projectile steers toward, [`NO_TARGET`] for none.
    pub target: i32,
    pub active: bool,
}

impl Default for TrackItem {
    fn default() -> TrackItem {
        TrackItem {
            kind: ItemKind::None,
            pos: Vec2::ZERO,
            start_pos: Vec2::ZERO,
            speed: Fixed::ZERO,
            angle: Angle::ZERO,
            width: Fixed::ZERO,
            height: Fixed::ZERO,
            lifetime: 0,
            target: NO_TARGET,
            active: false,
        }
    }
}

impl TrackItem {
    /// A stationary hazard.
    pub fn hazard(kind: ItemKind, pos: Vec2, angle: Angle) -> TrackItem {
        let hitbox = kind.hitbox();
        TrackItem {
            kind,
            pos,
            start_pos: pos,
            speed: Fixed::ZERO,
            angle,
            width: hitbox,
            height: hitbox,
            lifetime: kind.lifetime(),
            target: NO_TARGET,
            active: true,
        }
    }

    /// A projectile in flight.
    pub fn projectile(
        kind: ItemKind,
        pos: Vec2,
        angle: Angle,
        speed: Fixed,
        target: i32,
    ) -> TrackItem {
        let hitbox = kind.hitbox();
        TrackItem {
            kind,
            pos,
            start_pos: pos,
            speed,
            angle,
            width: hitbox,
            height: hitbox,
            lifetime: kind.lifetime(),
            target,
            active: true,
        }
    }
}

/// Fixed capacity pool of track items.
///
/// Allocation scans for the first inactive slot; when every slot is taken
/// the spawn is silently dropped.
#[derive(Debug, Clone)]
pub struct TrackItemPool {
    slots: [TrackItem; TRACK_ITEM_POOL_SIZE],
}

impl Default for TrackItemPool {
    fn default() -> TrackItemPool {
        TrackItemPool {
            slots: [TrackItem::default(); TRACK_ITEM_POOL_SIZE],
        }
    }
}

impl TrackItemPool {
    /// Place an item into the first free slot. Returns the slot index, or
    /// `None` when the pool is exhausted and the spawn was dropped.
    pub fn spawn(&mut self, item: TrackItem) -> Option<usize> {
        match self.slots.iter().position(|slot| !slot.active) {
            Some(index) => {
                self.slots[index] = item;
                Some(index)
            }
            None => {
                debug!("track item pool exhausted, dropping {:?}", item.kind);
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots = [TrackItem::default(); TRACK_ITEM_POOL_SIZE];
    }

    pub fn slots(&self) -> &[TrackItem] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [TrackItem] {
        &mut self.slots
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &TrackItem> {
        self.slots.iter().filter(|item| item.active)
    }

    pub fn active_count(&self) -> usize {
        self.iter_active().count()
    }
}

/// An item box spawn point.
///
/// Either the box is on the track (`active`, timer zero) or it was picked
/// up and the respawn timer counts down to its return.
#[derive(Debug, Clone, Copy)]
pub struct ItemBoxSpawn {
    pub pos: Vec2,
    pub active: bool,
    pub respawn_ticks: u32,
}

impl ItemBoxSpawn {
    pub fn new(pos: Vec2) -> ItemBoxSpawn {
        ItemBoxSpawn {
            pos,
            active: true,
            respawn_ticks: 0,
        }
    }

    /// Consume the box and start the respawn countdown.
    pub fn take(&mut self) {
        self.active = false;
        self.respawn_ticks = ITEM_BOX_RESPAWN_TICKS;
    }

    /// Count down toward the respawn; the box returns at zero.
    pub fn tick(&mut self) {
        if self.active {
            return;
        }
        self.respawn_ticks = self.respawn_ticks.saturating_sub(1);
        if self.respawn_ticks == 0 {
            self.active = true;
        }
    }
}
