//! The item subsystem: inventory draws, pooled hazards and projectiles,
//! homing, explosions and the local player's status effects.

use rand::Rng;
use tracing::debug;

use crate::kart::{Kart, KART_SIZE};
use crate::math::{Angle, Fixed, Vec2};
use crate::race::RaceEvent;
use crate::track::{Rect, TrackData};
use crate::StdRng;

mod effects;
mod pool;

pub use effects::PlayerItemEffects;
pub use effects::BOOST_TICKS;
pub use effects::CONFUSION_TICKS;
pub use effects::OIL_SLOW_DISTANCE;
pub use pool::ItemBoxSpawn;
pub use pool::TrackItem;
pub use pool::TrackItemPool;
pub use pool::ITEM_BOX_HITBOX;
pub use pool::ITEM_BOX_RESPAWN_TICKS;
pub use pool::LIFETIME_INFINITE;
pub use pool::NO_TARGET;
pub use pool::TRACK_ITEM_POOL_SIZE;

/// Distance behind (or ahead of) the kart at which hazards are placed.
pub const HAZARD_DROP_OFFSET: Fixed = Fixed::from_int(40);

/// Distance ahead of the kart at which projectiles spawn, outside the
/// firing kart's own hitbox.
pub const PROJECTILE_SPAWN_OFFSET: Fixed = Fixed::from_int(24);

/// Maximum angle units a homing projectile may turn per tick.
pub const HOMING_TURN_RATE: i32 = 5;

pub const BOMB_EXPLOSION_RADIUS: Fixed = Fixed::from_int(64);

/// Magnitude of the radial shove an explosion gives nearby karts.
pub const BOMB_IMPULSE: Fixed = Fixed::from_int(4);

/// Facing kick of a shell hit: a quarter of a half turn, either way.
const SHELL_SPIN: i32 = 64;

/// Everything a kart can hold or that can lie on the track.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    #[default]
    None,
    Box,
    Oil,
    Bomb,
    Banana,
    GreenShell,
    RedShell,
    Missile,
    Mushroom,
    SpeedBoost,
}

impl ItemKind {
    /// Hitbox "diameter" when lying on the track or in flight.
    pub fn hitbox(self) -> Fixed {
        match self {
            ItemKind::Banana => Fixed::from_int(12),
            ItemKind::Oil => Fixed::from_int(24),
            ItemKind::Bomb => Fixed::from_int(16),
            ItemKind::GreenShell | ItemKind::RedShell | ItemKind::Missile => Fixed::from_int(12),
            _ => Fixed::ZERO,
        }
    }

    /// Lifetime in ticks once on the track; [`LIFETIME_INFINITE`] never
    /// expires.
    pub fn lifetime(self) -> i32 {
        match self {
            ItemKind::Banana => LIFETIME_INFINITE,
            ItemKind::Bomb => 300,
            ItemKind::Oil => 600,
            ItemKind::GreenShell | ItemKind::RedShell | ItemKind::Missile => 600,
            _ => 0,
        }
    }

    /// Projectile speed as a multiple of the firing kart's top speed.
    pub fn projectile_multiplier(self) -> Fixed {
        match self {
            ItemKind::GreenShell | ItemKind::RedShell => Fixed::from_raw(384),
            ItemKind::Missile => Fixed::from_raw(435),
            _ => Fixed::ZERO,
        }
    }

    pub fn is_hazard(self) -> bool {
        matches!(self, ItemKind::Banana | ItemKind::Bomb | ItemKind::Oil)
    }

    pub fn is_projectile(self) -> bool {
        matches!(
            self,
            ItemKind::GreenShell | ItemKind::RedShell | ItemKind::Missile
        )
    }

    /// The wire tag used in packets.
    pub fn to_wire(self) -> u32 {
        match self {
            ItemKind::None => 0,
            ItemKind::Box => 1,
            ItemKind::Oil => 2,
            ItemKind::Bomb => 3,
            ItemKind::Banana => 4,
            ItemKind::GreenShell => 5,
            ItemKind::RedShell => 6,
            ItemKind::Missile => 7,
            ItemKind::Mushroom => 8,
            ItemKind::SpeedBoost => 9,
        }
    }

    pub fn from_wire(tag: u32) -> Option<ItemKind> {
        Some(match tag {
            0 => ItemKind::None,
            1 => ItemKind::Box,
            2 => ItemKind::Oil,
            3 => ItemKind::Bomb,
            4 => ItemKind::Banana,
            5 => ItemKind::GreenShell,
            6 => ItemKind::RedShell,
            7 => ItemKind::Missile,
            8 => ItemKind::Mushroom,
            9 => ItemKind::SpeedBoost,
            _ => return None,
        })
    }
}

/// The order in which the probability rows are laid out.
pub const DRAW_ORDER: [ItemKind; 8] = [
    ItemKind::Banana,
    ItemKind::Oil,
    ItemKind::Bomb,
    ItemKind::GreenShell,
    ItemKind::RedShell,
    ItemKind::Missile,
    ItemKind::Mushroom,
    ItemKind::SpeedBoost,
];

/// Draw weights per item, one row per rank. Leaders get hazards, the tail
/// of the field gets missiles and boosts.
pub const DRAW_TABLE: [[u32; 8]; 8] = [
    [30, 30, 10, 10, 0, 0, 10, 10],
    [25, 25, 10, 10, 5, 0, 10, 15],
    [20, 20, 10, 10, 10, 0, 10, 20],
    [15, 15, 10, 10, 10, 5, 15, 20],
    [10, 10, 10, 15, 10, 10, 15, 20],
    [5, 10, 5, 15, 15, 15, 15, 20],
    [5, 5, 5, 10, 15, 20, 15, 25],
    [0, 5, 0, 10, 15, 25, 15, 30],
];

/// Resolve a draw value against a weight row by scanning the cumulative
/// sums in [`DRAW_ORDER`].
pub fn pick_from_row(row: &[u32; 8], draw: u32) -> ItemKind {
    let mut cumulative = 0;
    for (kind, weight) in DRAW_ORDER.iter().zip(row) {
        cumulative += weight;
        if draw < cumulative {
            return *kind;
        }
    }
    ItemKind::SpeedBoost
}

/// Draw a random inventory item for a kart at the given 1 based rank.
pub fn draw_item(rank: u8, rng: &mut StdRng) -> ItemKind {
    let row = &DRAW_TABLE[(rank.max(1) as usize - 1).min(DRAW_TABLE.len() - 1)];
    let sum: u32 = row.iter().sum();
    if sum == 0 {
        return ItemKind::SpeedBoost;
    }
    pick_from_row(row, rng.gen_range(0..sum))
}

/// Index of the kart holding the given 1 based rank.
fn find_by_rank(karts: &[Kart], rank: u8) -> Option<usize> {
    karts.iter().position(|kart| kart.rank == rank)
}

/// Owns the track item pool, the item boxes of the current map and the
/// local player's status effects.
#[derive(Debug, Clone, Default)]
pub struct ItemSystem {
    pub pool: TrackItemPool,
    pub boxes: Vec<ItemBoxSpawn>,
    pub effects: PlayerItemEffects,
}

impl ItemSystem {
    pub fn new(track: &TrackData) -> ItemSystem {
        ItemSystem {
            pool: TrackItemPool::default(),
            boxes: track.item_boxes.iter().map(|p| ItemBoxSpawn::new(*p)).collect(),
            effects: PlayerItemEffects::default(),
        }
    }

    /// Clear all pools and effects back to the start of a race.
    pub fn reset(&mut self, track: &TrackData) {
        *self = ItemSystem::new(track);
    }

    /// Use the inventory item of `user`. Hazards and projectiles enter the
    /// pool and emit an [`RaceEvent::ItemPlaced`]; self effects only apply
    /// to the local player.
    pub fn use_item(
        &mut self,
        karts: &mut [Kart],
        user: usize,
        player_index: usize,
        fire_forward: bool,
        events: &mut Vec<RaceEvent>,
    ) {
        let Some(kart) = karts.get(user) else {
            return;
        };
        let kind = kart.item;
        if kind == ItemKind::None {
            return;
        }
        let (pos, angle, max_speed, rank) = (kart.pos, kart.angle, kart.max_speed, kart.rank);
        karts[user].item = ItemKind::None;

        if kind.is_hazard() {
            let drop_dir = if fire_forward { angle } else { angle.opposite() };
            let drop_pos = pos + Vec2::from_angle(drop_dir).scale(HAZARD_DROP_OFFSET);
            self.pool.spawn(TrackItem::hazard(kind, drop_pos, angle));
            events.push(RaceEvent::ItemPlaced {
                slot: user,
                kind,
                pos: drop_pos,
                angle,
                speed: Fixed::ZERO,
            });
            return;
        }

        if kind.is_projectile() {
            let speed = max_speed.mul(kind.projectile_multiplier());
            let spawn_pos = pos + Vec2::from_angle(angle).scale(PROJECTILE_SPAWN_OFFSET);
            let target = match kind {
                ItemKind::RedShell if rank > 1 => find_by_rank(karts, rank - 1),
                ItemKind::Missile => find_by_rank(karts, 1).filter(|leader| *leader != user),
                _ => None,
            };
            let target = target.map(|t| t as i32).unwrap_or(NO_TARGET);
            self.pool
                .spawn(TrackItem::projectile(kind, spawn_pos, angle, speed, target));
            events.push(RaceEvent::ItemPlaced {
                slot: user,
                kind,
                pos: spawn_pos,
                angle,
                speed,
            });
            return;
        }

        match kind {
            ItemKind::Mushroom => {
                if user == player_index {
                    self.effects.start_confusion();
                }
                events.push(RaceEvent::EffectStarted { slot: user, kind });
            }
            ItemKind::SpeedBoost => {
                if user == player_index {
                    self.effects.start_boost(&mut karts[user]);
                }
                events.push(RaceEvent::EffectStarted { slot: user, kind });
            }
            _ => {}
        }
    }

    /// Create a track item announced by a remote peer. A zero speed is a
    /// hazard placement, anything else a projectile. Remote projectiles
    /// fly straight; their homing happens on the owning peer.
    pub fn place_remote(&mut self, kind: ItemKind, pos: Vec2, angle: Angle, speed: Fixed) {
        if !kind.is_hazard() && !kind.is_projectile() {
            debug!("ignoring remote placement of {kind:?}");
            return;
        }
        let item = if speed.is_zero() {
            TrackItem::hazard(kind, pos, angle)
        } else {
            TrackItem::projectile(kind, pos, angle, speed, NO_TARGET)
        };
        self.pool.spawn(item);
    }

    /// Deactivate a box announced by a remote peer and start its respawn.
    pub fn box_pickup_remote(&mut self, index: usize) {
        if let Some(item_box) = self.boxes.get_mut(index) {
            if item_box.active {
                item_box.take();
            }
        }
    }

    /// Advance the item subsystem one physics tick.
    ///
    /// `local_slots` marks the kart indices simulated on this machine; only
    /// those pick up boxes (remote pickups arrive as events).
    pub fn tick(
        &mut self,
        karts: &mut [Kart],
        player_index: usize,
        local_slots: &[bool],
        track: &TrackData,
        rng: &mut StdRng,
        events: &mut Vec<RaceEvent>,
    ) {
        self.tick_boxes(karts, player_index, local_slots, rng, events);
        self.tick_track_items(karts, player_index, track, rng, events);
        if let Some(kart) = karts.get_mut(player_index) {
            self.effects.tick(kart);
        }
    }

    fn tick_boxes(
        &mut self,
        karts: &mut [Kart],
        player_index: usize,
        local_slots: &[bool],
        rng: &mut StdRng,
        events: &mut Vec<RaceEvent>,
    ) {
        let pickup_radius = (KART_SIZE + ITEM_BOX_HITBOX).div(Fixed::from_int(2));
        let radius_sq = pickup_radius.raw() as i64 * pickup_radius.raw() as i64;

        for (index, item_box) in self.boxes.iter_mut().enumerate() {
            item_box.tick();
            if !item_box.active {
                continue;
            }
            for (slot, kart) in karts.iter_mut().enumerate() {
                if !local_slots.get(slot).copied().unwrap_or(false) {
                    continue;
                }
                if kart.pos.distance_squared(item_box.pos) > radius_sq {
                    continue;
                }
                item_box.take();
                if kart.item == ItemKind::None {
                    // Remote peers draw their own item and broadcast it
                    // with their next car update.
                    kart.item = draw_item(kart.rank, rng);
                    if slot == player_index {
                        debug!("player drew {:?}", kart.item);
                    }
                }
                events.push(RaceEvent::BoxPickup {
                    box_index: index,
                    slot,
                });
                break;
            }
        }
    }

    fn tick_track_items(
        &mut self,
        karts: &mut [Kart],
        player_index: usize,
        track: &TrackData,
        rng: &mut StdRng,
        events: &mut Vec<RaceEvent>,
    ) {
        for index in 0..self.pool.slots().len() {
            let mut item = self.pool.slots()[index];
            if !item.active {
                continue;
            }

            if item.lifetime > 0 {
                item.lifetime -= 1;
                if item.lifetime == 0 {
                    if item.kind == ItemKind::Bomb {
                        explode(karts, item.pos, events);
                    }
                    item.active = false;
                    self.pool.slots_mut()[index] = item;
                    continue;
                }
            }

            if !item.speed.is_zero() {
                home_toward_target(&mut item, karts);
                item.pos += Vec2::from_angle(item.angle).scale(item.speed);

                if hits_wall(&item, track) {
                    item.active = false;
                    self.pool.slots_mut()[index] = item;
                    continue;
                }
            }

            self.resolve_kart_contacts(&mut item, karts, player_index, rng, events);
            self.pool.slots_mut()[index] = item;
        }
    }

    fn resolve_kart_contacts(
        &mut self,
        item: &mut TrackItem,
        karts: &mut [Kart],
        player_index: usize,
        rng: &mut StdRng,
        events: &mut Vec<RaceEvent>,
    ) {
        let radius = (item.width + KART_SIZE).div(Fixed::from_int(2));
        let radius_sq = radius.raw() as i64 * radius.raw() as i64;

        for slot in 0..karts.len() {
            if !item.active {
                return;
            }
            if karts[slot].pos.distance_squared(item.pos) > radius_sq {
                continue;
            }
            match item.kind {
                ItemKind::GreenShell | ItemKind::RedShell => {
                    let kart = &mut karts[slot];
                    kart.speed = Fixed::ZERO;
                    let spin = if rng.gen_bool(0.5) { SHELL_SPIN } else { -SHELL_SPIN };
                    kart.steer(spin);
                    item.active = false;
                    events.push(RaceEvent::KartHit {
                        slot,
                        kind: item.kind,
                    });
                }
                ItemKind::Missile => {
                    karts[slot].speed = Fixed::ZERO;
                    item.active = false;
                    events.push(RaceEvent::KartHit {
                        slot,
                        kind: item.kind,
                    });
                }
                ItemKind::Banana => {
                    let kart = &mut karts[slot];
                    kart.speed = kart.speed.div(Fixed::from_int(3));
                    kart.set_angle(kart.angle.opposite());
                    item.active = false;
                    events.push(RaceEvent::KartHit {
                        slot,
                        kind: item.kind,
                    });
                }
                ItemKind::Oil => {
                    // The slick stays on the track.
                    if slot == player_index {
                        self.effects.start_oil_slow(&mut karts[slot]);
                    } else {
                        karts[slot].speed = karts[slot].speed.div(Fixed::from_int(2));
                    }
                }
                ItemKind::Bomb => {
                    explode(karts, item.pos, events);
                    item.active = false;
                }
                _ => {}
            }
        }
    }
}

/// Turn a homing projectile toward its target, bounded per tick. An
/// invalid target demotes the projectile to straight flight.
fn home_toward_target(item: &mut TrackItem, karts: &[Kart]) {
    if item.target == NO_TARGET {
        return;
    }
    let Some(target) = karts.get(item.target as usize) else {
        item.target = NO_TARGET;
        return;
    };
    let desired = (target.pos - item.pos).to_angle();
    let arc = item.angle.arc_to(desired);
    item.angle = item
        .angle
        .wrapping_add(arc.clamp(-HOMING_TURN_RATE, HOMING_TURN_RATE));
}

/// True when the item's hitbox overlaps a wall or left the world.
fn hits_wall(item: &TrackItem, track: &TrackData) -> bool {
    let half = item.width.div(Fixed::from_int(2));
    let area = Rect::new(
        Vec2::new(item.pos.x - half, item.pos.y - half),
        Vec2::new(item.pos.x + half, item.pos.y + half),
    );
    let world = Rect::from_int(0, 0, crate::track::WORLD_SIZE, crate::track::WORLD_SIZE);
    if !world.contains(item.pos) {
        return true;
    }
    track.walls_near(&area).iter().any(|wall| wall.overlaps(&area))
}

/// Stop and shove every kart within the blast radius.
fn explode(karts: &mut [Kart], center: Vec2, events: &mut Vec<RaceEvent>) {
    let radius_sq = BOMB_EXPLOSION_RADIUS.raw() as i64 * BOMB_EXPLOSION_RADIUS.raw() as i64;
    for (slot, kart) in karts.iter_mut().enumerate() {
        if kart.pos.distance_squared(center) > radius_sq {
            continue;
        }
        kart.speed = Fixed::ZERO;
        let away = (kart.pos - center).normalized();
        if !away.is_zero() {
            kart.apply_impulse(away.scale(BOMB_IMPULSE));
        }
        events.push(RaceEvent::KartHit {
            slot,
            kind: ItemKind::Bomb,
        });
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::track::Map;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn test_kart(x: i32, y: i32) -> Kart {
        Kart::new(
            Vec2::from_int(x, y),
            "test",
            Fixed::from_int(4),
            Fixed::from_int(1),
            Fixed::ONE,
        )
    }

    #[test]
    fn draw_boundaries_at_rank_one() {
        let row = &DRAW_TABLE[0];
        assert_eq!(row.iter().sum::<u32>(), 100);
        assert_eq!(pick_from_row(row, 0), ItemKind::Banana);
        assert_eq!(pick_from_row(row, 29), ItemKind::Banana);
        assert_eq!(pick_from_row(row, 30), ItemKind::Oil);
        assert_eq!(pick_from_row(row, 70), ItemKind::GreenShell);
        assert_eq!(pick_from_row(row, 80), ItemKind::Mushroom);
        assert_eq!(pick_from_row(row, 99), ItemKind::SpeedBoost);
    }

    #[test]
    fn every_row_sums_to_one_hundred() {
        for row in &DRAW_TABLE {
            assert_eq!(row.iter().sum::<u32>(), 100);
        }
    }

    #[test]
    fn out_of_range_ranks_clamp_to_the_table() {
        let mut rng = rng();
        // Rank 0 and rank 200 still draw from the first and last row.
        for _ in 0..32 {
            assert_ne!(draw_item(0, &mut rng), ItemKind::None);
            assert_ne!(draw_item(200, &mut rng), ItemKind::None);
        }
    }

    #[test]
    fn hazards_drop_behind_the_kart() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        let mut karts = vec![test_kart(500, 500)];
        karts[0].item = ItemKind::Banana;
        let mut events = Vec::new();

        items.use_item(&mut karts, 0, 0, false, &mut events);

        assert_eq!(karts[0].item, ItemKind::None);
        let banana = items.pool.iter_active().next().unwrap();
        assert_eq!(banana.kind, ItemKind::Banana);
        assert_eq!(banana.pos, Vec2::from_int(460, 500));
        assert_eq!(banana.lifetime, LIFETIME_INFINITE);
        assert!(matches!(events[0], RaceEvent::ItemPlaced { .. }));
    }

    #[test]
    fn red_shell_targets_the_kart_ahead() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        let mut karts = vec![test_kart(400, 500), test_kart(600, 500)];
        karts[0].rank = 2;
        karts[1].rank = 1;
        karts[0].item = ItemKind::RedShell;
        let mut events = Vec::new();

        items.use_item(&mut karts, 0, 0, false, &mut events);

        let shell = items.pool.iter_active().next().unwrap();
        assert_eq!(shell.kind, ItemKind::RedShell);
        assert_eq!(shell.target, 1);
        // 1.5 times the top speed of 4.
        assert_eq!(shell.speed, Fixed::from_int(6));
    }

    #[test]
    fn red_shell_from_the_lead_flies_straight() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        let mut karts = vec![test_kart(400, 500), test_kart(600, 500)];
        karts[0].rank = 1;
        karts[1].rank = 2;
        karts[0].item = ItemKind::RedShell;
        let mut events = Vec::new();

        items.use_item(&mut karts, 0, 0, false, &mut events);

        assert_eq!(items.pool.iter_active().next().unwrap().target, NO_TARGET);
    }

    #[test]
    fn box_pickup_grants_an_item_and_respawns() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        let box_pos = items.boxes[0].pos;
        let mut karts = vec![test_kart(box_pos.x.to_int(), box_pos.y.to_int())];
        karts[0].rank = 1;
        let local = [true];
        let mut events = Vec::new();
        let mut rng = rng();

        items.tick(&mut karts, 0, &local, &track, &mut rng, &mut events);

        assert!(!items.boxes[0].active);
        assert_eq!(items.boxes[0].respawn_ticks, ITEM_BOX_RESPAWN_TICKS);
        assert_ne!(karts[0].item, ItemKind::None);
        assert!(matches!(
            events[0],
            RaceEvent::BoxPickup {
                box_index: 0,
                slot: 0
            }
        ));

        // Move the kart away and let the timer run out.
        karts[0].pos = Vec2::from_int(500, 500);
        for _ in 0..ITEM_BOX_RESPAWN_TICKS {
            events.clear();
            items.tick(&mut karts, 0, &local, &track, &mut rng, &mut events);
        }
        assert!(items.boxes[0].active);
        assert_eq!(items.boxes[0].respawn_ticks, 0);
    }

    #[test]
    fn remote_karts_do_not_consume_boxes() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        let box_pos = items.boxes[0].pos;
        let mut karts = vec![test_kart(box_pos.x.to_int(), box_pos.y.to_int())];
        let local = [false];
        let mut events = Vec::new();
        let mut rng = rng();

        items.tick(&mut karts, 0, &local, &track, &mut rng, &mut events);

        assert!(items.boxes[0].active);
        assert!(events.is_empty());
    }

    #[test]
    fn bomb_in_an_empty_world_does_nothing() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        items
            .pool
            .spawn(TrackItem::hazard(
                ItemKind::Bomb,
                Vec2::from_int(512, 512),
                Angle::ZERO,
            ))
            .unwrap();
        let mut karts: Vec<Kart> = Vec::new();
        let mut events = Vec::new();
        let mut rng = rng();

        for _ in 0..ItemKind::Bomb.lifetime() {
            items.tick(&mut karts, 0, &[], &track, &mut rng, &mut events);
        }

        assert_eq!(items.pool.active_count(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn bomb_contact_stops_and_shoves_nearby_karts() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        items
            .pool
            .spawn(TrackItem::hazard(
                ItemKind::Bomb,
                Vec2::from_int(500, 500),
                Angle::ZERO,
            ))
            .unwrap();
        // One kart on the bomb, one within the blast, one far away.
        let mut karts = vec![
            test_kart(504, 500),
            test_kart(540, 500),
            test_kart(700, 500),
        ];
        karts[1].speed = Fixed::from_int(3);
        karts[2].speed = Fixed::from_int(3);
        let mut events = Vec::new();
        let mut rng = rng();

        items.tick(&mut karts, 0, &[true, true, true], &track, &mut rng, &mut events);

        assert_eq!(items.pool.active_count(), 0);
        // The shoved kart faces away from the blast at the impulse speed.
        assert_eq!(karts[1].speed, BOMB_IMPULSE);
        assert_eq!(karts[1].angle, Angle::ZERO);
        assert_eq!(karts[2].speed, Fixed::from_int(3));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn banana_hit_slows_and_turns_the_kart() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        items
            .pool
            .spawn(TrackItem::hazard(
                ItemKind::Banana,
                Vec2::from_int(500, 500),
                Angle::ZERO,
            ))
            .unwrap();
        let mut karts = vec![test_kart(505, 500)];
        karts[0].speed = Fixed::from_int(3);
        let mut events = Vec::new();
        let mut rng = rng();

        items.tick(&mut karts, 0, &[true], &track, &mut rng, &mut events);

        assert_eq!(items.pool.active_count(), 0);
        assert_eq!(karts[0].speed, Fixed::from_int(1));
        assert_eq!(karts[0].angle.raw(), 256);
    }

    #[test]
    fn oil_applies_the_player_effect_and_persists() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        items
            .pool
            .spawn(TrackItem::hazard(
                ItemKind::Oil,
                Vec2::from_int(500, 500),
                Angle::ZERO,
            ))
            .unwrap();
        let mut karts = vec![test_kart(505, 500), test_kart(495, 500)];
        karts[0].speed = Fixed::from_int(4);
        karts[1].speed = Fixed::from_int(4);
        let mut events = Vec::new();
        let mut rng = rng();

        items.tick(&mut karts, 0, &[true, true], &track, &mut rng, &mut events);

        assert!(items.effects.oil_slow_active());
        assert_eq!(karts[0].speed, Fixed::from_int(2));
        // The remote kart is halved directly.
        assert_eq!(karts[1].speed, Fixed::from_int(2));
        // The slick stays.
        assert_eq!(items.pool.active_count(), 1);
    }

    #[test]
    fn homing_projectile_turns_toward_its_target() {
        let mut karts = vec![test_kart(500, 700)];
        let mut item = TrackItem::projectile(
            ItemKind::Missile,
            Vec2::from_int(500, 500),
            Angle::ZERO,
            Fixed::from_int(6),
            0,
        );

        home_toward_target(&mut item, &karts);
        // The target sits a quarter turn away; only the clamped step is taken.
        assert_eq!(item.angle.raw(), HOMING_TURN_RATE);

        // An invalid target demotes the projectile to straight flight.
        item.target = 5;
        karts.clear();
        let before = item.angle;
        home_toward_target(&mut item, &karts);
        assert_eq!(item.target, NO_TARGET);
        assert_eq!(item.angle, before);
    }

    #[test]
    fn effect_items_only_apply_to_the_local_player() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        let mut items = ItemSystem::new(&track);
        let mut karts = vec![test_kart(400, 500), test_kart(600, 500)];
        karts[1].item = ItemKind::SpeedBoost;
        let mut events = Vec::new();

        items.use_item(&mut karts, 1, 0, false, &mut events);

        assert_eq!(karts[1].item, ItemKind::None);
        assert_eq!(karts[1].max_speed, Fixed::from_int(4));
        assert!(!items.effects.boost_active());
    }
}
