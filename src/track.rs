//! Static map data: checkpoints, walls, spawn positions and item box
//! locations, plus the quadrant partitioning used by wall lookups.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{Angle, Fixed, Vec2};

/// Edge length of the square world in whole units.
pub const WORLD_SIZE: i32 = 1024;

/// Number of quadrant cells along each world axis.
pub const QUADRANT_GRID: usize = 3;

/// The selectable maps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
pub enum Map {
    #[default]
    NoneMap,
    ScorchingSands,
    AlpineRush,
    NeonCircuit,
}

/// An error with the track data.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("map {0:?} has no track data")]
    UnknownMap(Map),
    #[error("cannot parse track file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("track has no {0}")]
    Missing(&'static str),
}

/// An axis aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub const fn new(min: Vec2, max: Vec2) -> Rect {
        Rect { min, max }
    }

    /// A rectangle from whole world units.
    pub const fn from_int(x0: i32, y0: i32, x1: i32, y1: i32) -> Rect {
        Rect {
            min: Vec2::from_int(x0, y0),
            max: Vec2::from_int(x1, y1),
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            Fixed::from_raw((self.min.x.raw() + self.max.x.raw()) / 2),
            Fixed::from_raw((self.min.y.raw() + self.max.y.raw()) / 2),
        )
    }
}

/// The quadrant cell indices covering a point. Out of bounds positions
/// clamp to the border cells.
pub fn quadrant_of(p: Vec2) -> (usize, usize) {
    (quadrant_index(p.x.to_int()), quadrant_index(p.y.to_int()))
}

fn quadrant_index(v: i32) -> usize {
    ((v.clamp(0, WORLD_SIZE - 1) * QUADRANT_GRID as i32) / WORLD_SIZE) as usize
}

/// Wall indices bucketed per quadrant cell.
#[derive(Debug, Default, Clone)]
struct WallGrid {
    cells: [Vec<u16>; QUADRANT_GRID * QUADRANT_GRID],
}

impl WallGrid {
    fn build(walls: &[Rect]) -> WallGrid {
        let mut cells: [Vec<u16>; QUADRANT_GRID * QUADRANT_GRID] = Default::default();
        for (i, wall) in walls.iter().enumerate() {
            let (qx0, qy0) = quadrant_of(wall.min);
            let (qx1, qy1) = quadrant_of(wall.max);
            for qy in qy0..=qy1 {
                for qx in qx0..=qx1 {
                    cells[qy * QUADRANT_GRID + qx].push(i as u16);
                }
            }
        }
        WallGrid { cells }
    }
}

/// Static data for one map.
///
/// Built in maps come from [`TrackData::for_map`]; external tracks load
/// from YAML with the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackData {
    pub map: Map,
    /// Laps required to finish a race.
    pub laps: u32,
    /// Spawn positions; slot N is the spawn of peer N.
    pub spawns: Vec<Vec2>,
    /// Facing angle at the spawn line.
    pub spawn_angle: Angle,
    /// Ordered checkpoint boxes; the last one is the finish line.
    pub checkpoints: Vec<Rect>,
    pub walls: Vec<Rect>,
    /// Item box spawn positions.
    pub item_boxes: Vec<Vec2>,
    #[serde(skip)]
    wall_grid: WallGrid,
}

impl TrackData {
    /// Assemble track data from its parts, validating it the same way an
    /// external track file is validated.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        map: Map,
        laps: u32,
        spawns: Vec<Vec2>,
        spawn_angle: Angle,
        checkpoints: Vec<Rect>,
        walls: Vec<Rect>,
        item_boxes: Vec<Vec2>,
    ) -> Result<TrackData, TrackError> {
        TrackData {
            map,
            laps,
            spawns,
            spawn_angle,
            checkpoints,
            walls,
            item_boxes,
            wall_grid: WallGrid::default(),
        }
        .validated()
    }

    /// The track data of a built in map.
    ///
    /// `NoneMap` is the only map without data; asking for it is the one
    /// fatal error of race initialization.
    pub fn for_map(map: Map) -> Result<TrackData, TrackError> {
        match map {
            Map::NoneMap => Err(TrackError::UnknownMap(map)),
            Map::ScorchingSands => Ok(scorching_sands()),
            Map::AlpineRush => Ok(alpine_rush()),
            Map::NeonCircuit => Ok(neon_circuit()),
        }
    }

    /// Load an external track from YAML.
    pub fn from_yaml(text: &str) -> Result<TrackData, TrackError> {
        let track: TrackData = serde_yaml::from_str(text)?;
        track.validated()
    }

    fn validated(mut self) -> Result<TrackData, TrackError> {
        if self.checkpoints.is_empty() {
            return Err(TrackError::Missing("checkpoints"));
        }
        if self.spawns.len() < 2 {
            return Err(TrackError::Missing("spawn positions"));
        }
        if self.laps == 0 {
            return Err(TrackError::Missing("lap count"));
        }
        self.wall_grid = WallGrid::build(&self.walls);
        Ok(self)
    }

    /// The walls registered in the quadrants covered by `area`.
    pub fn walls_near(&self, area: &Rect) -> Vec<&Rect> {
        let (qx0, qy0) = quadrant_of(area.min);
        let (qx1, qy1) = quadrant_of(area.max);
        let mut indices: Vec<u16> = Vec::new();
        for qy in qy0..=qy1 {
            for qx in qx0..=qx1 {
                indices.extend_from_slice(&self.wall_grid.cells[qy * QUADRANT_GRID + qx]);
            }
        }
        indices.sort_unstable();
        indices.dedup();
        indices
            .into_iter()
            .map(|i| &self.walls[i as usize])
            .collect()
    }

    /// The checkpoint a kart that last crossed `last_checkpoint` is
    /// heading for.
    pub fn next_checkpoint(&self, last_checkpoint: i32) -> &Rect {
        let next = (last_checkpoint + 1).max(0) as usize % self.checkpoints.len();
        &self.checkpoints[next]
    }
}

/// A desert oval: a wide ring around a central mesa.
fn scorching_sands() -> TrackData {
    TrackData {
        map: Map::ScorchingSands,
        laps: 3,
        spawns: vec![
            Vec2::from_int(400, 784),
            Vec2::from_int(360, 812),
            Vec2::from_int(400, 840),
            Vec2::from_int(360, 868),
            Vec2::from_int(400, 896),
            Vec2::from_int(360, 924),
            Vec2::from_int(400, 952),
            Vec2::from_int(360, 980),
        ],
        spawn_angle: Angle::ZERO,
        checkpoints: vec![
            Rect::from_int(736, 448, 1008, 576),
            Rect::from_int(448, 16, 576, 288),
            Rect::from_int(16, 448, 288, 576),
            Rect::from_int(448, 736, 576, 1008),
        ],
        walls: vec![
            Rect::from_int(0, 0, 16, 1024),
            Rect::from_int(1008, 0, 1024, 1024),
            Rect::from_int(0, 0, 1024, 16),
            Rect::from_int(0, 1008, 1024, 1024),
            Rect::from_int(288, 288, 736, 736),
        ],
        item_boxes: vec![
            Vec2::from_int(850, 480),
            Vec2::from_int(850, 544),
            Vec2::from_int(480, 170),
            Vec2::from_int(544, 170),
            Vec2::from_int(170, 480),
            Vec2::from_int(170, 544),
            Vec2::from_int(480, 870),
            Vec2::from_int(544, 870),
        ],
        wall_grid: WallGrid::default(),
    }
    .validated()
    .expect("built in track data should be valid")
}

/// A mountain circuit with a chicane on the back straight.
fn alpine_rush() -> TrackData {
    TrackData {
        map: Map::AlpineRush,
        laps: 4,
        spawns: vec![
            Vec2::from_int(416, 800),
            Vec2::from_int(376, 828),
            Vec2::from_int(416, 856),
            Vec2::from_int(376, 884),
            Vec2::from_int(416, 912),
            Vec2::from_int(376, 940),
            Vec2::from_int(416, 968),
            Vec2::from_int(376, 772),
        ],
        spawn_angle: Angle::ZERO,
        checkpoints: vec![
            Rect::from_int(768, 448, 1008, 576),
            Rect::from_int(448, 16, 576, 256),
            Rect::from_int(16, 448, 256, 576),
            Rect::from_int(448, 768, 576, 1008),
        ],
        walls: vec![
            Rect::from_int(0, 0, 16, 1024),
            Rect::from_int(1008, 0, 1024, 1024),
            Rect::from_int(0, 0, 1024, 16),
            Rect::from_int(0, 1008, 1024, 1024),
            Rect::from_int(256, 256, 768, 768),
            // Chicane blocks pinching the top straight.
            Rect::from_int(592, 16, 640, 128),
            Rect::from_int(704, 160, 752, 256),
        ],
        item_boxes: vec![
            Vec2::from_int(880, 480),
            Vec2::from_int(880, 544),
            Vec2::from_int(480, 140),
            Vec2::from_int(544, 140),
            Vec2::from_int(140, 480),
            Vec2::from_int(140, 544),
            Vec2::from_int(480, 880),
            Vec2::from_int(544, 880),
        ],
        wall_grid: WallGrid::default(),
    }
    .validated()
    .expect("built in track data should be valid")
}

/// A tight city loop with a narrow racing lane.
fn neon_circuit() -> TrackData {
    TrackData {
        map: Map::NeonCircuit,
        laps: 5,
        spawns: vec![
            Vec2::from_int(392, 848),
            Vec2::from_int(356, 872),
            Vec2::from_int(392, 896),
            Vec2::from_int(356, 920),
            Vec2::from_int(392, 944),
            Vec2::from_int(356, 968),
            Vec2::from_int(392, 824),
            Vec2::from_int(356, 800),
        ],
        spawn_angle: Angle::ZERO,
        checkpoints: vec![
            Rect::from_int(816, 448, 1008, 576),
            Rect::from_int(448, 16, 576, 208),
            Rect::from_int(16, 448, 208, 576),
            Rect::from_int(448, 816, 576, 1008),
        ],
        walls: vec![
            Rect::from_int(0, 0, 16, 1024),
            Rect::from_int(1008, 0, 1024, 1024),
            Rect::from_int(0, 0, 1024, 16),
            Rect::from_int(0, 1008, 1024, 1024),
            Rect::from_int(208, 208, 816, 816),
        ],
        item_boxes: vec![
            Vec2::from_int(912, 488),
            Vec2::from_int(912, 536),
            Vec2::from_int(488, 112),
            Vec2::from_int(536, 112),
            Vec2::from_int(112, 488),
            Vec2::from_int(112, 536),
            Vec2::from_int(488, 912),
            Vec2::from_int(536, 912),
        ],
        wall_grid: WallGrid::default(),
    }
    .validated()
    .expect("built in track data should be valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    #[test]
    fn every_built_in_map_loads() {
        for map in [Map::ScorchingSands, Map::AlpineRush, Map::NeonCircuit] {
            let track = TrackData::for_map(map).unwrap();
            assert_eq!(track.spawns.len(), 8);
            assert!(!track.checkpoints.is_empty());
            assert!(track.laps > 0);
        }
    }

    #[test]
    fn none_map_is_unknown() {
        assert!(matches!(
            TrackData::for_map(Map::NoneMap),
            Err(TrackError::UnknownMap(Map::NoneMap))
        ));
    }

    #[test]
    fn quadrants_partition_the_world() {
        assert_eq!(quadrant_of(Vec2::from_int(0, 0)), (0, 0));
        assert_eq!(quadrant_of(Vec2::from_int(512, 512)), (1, 1));
        assert_eq!(quadrant_of(Vec2::from_int(1023, 1023)), (2, 2));
        // Out of bounds clamps to the border cells.
        assert_eq!(quadrant_of(Vec2::from_int(-50, 2000)), (0, 2));
    }

    #[test]
    fn walls_near_only_returns_nearby_quadrants() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        // The world center only sees the mesa block and whatever border
        // walls span the middle row and column.
        let probe = Rect::from_int(500, 500, 524, 524);
        let walls = track.walls_near(&probe);
        assert!(walls.contains(&&track.walls[4]));
        // A corner probe must see both border walls meeting there.
        let corner = Rect::from_int(20, 20, 40, 40);
        let walls = track.walls_near(&corner);
        assert!(walls.contains(&&track.walls[0]));
        assert!(walls.contains(&&track.walls[2]));
    }

    #[test]
    fn rect_contains_and_overlaps() {
        let r = Rect::from_int(10, 10, 20, 20);
        assert!(r.contains(Vec2::from_int(10, 10)));
        assert!(r.contains(Vec2::from_int(15, 18)));
        assert!(!r.contains(Vec2::from_int(21, 15)));
        assert!(r.overlaps(&Rect::from_int(19, 19, 30, 30)));
        assert!(!r.overlaps(&Rect::from_int(21, 21, 30, 30)));
        assert_eq!(r.center(), Vec2::from_int(15, 15));
        assert_eq!(r.center().x, Fixed::from_int(15));
    }

    #[test]
    fn next_checkpoint_wraps_after_the_finish_line() {
        let track = TrackData::for_map(Map::ScorchingSands).unwrap();
        assert_eq!(track.next_checkpoint(-1), &track.checkpoints[0]);
        assert_eq!(track.next_checkpoint(1), &track.checkpoints[2]);
        assert_eq!(track.next_checkpoint(3), &track.checkpoints[0]);
    }

    #[test]
    fn yaml_track_round_trip() {
        let track = TrackData::for_map(Map::AlpineRush).unwrap();
        let text = serde_yaml::to_string(&track).unwrap();
        let loaded = TrackData::from_yaml(&text).unwrap();
        assert_eq!(loaded.map, track.map);
        assert_eq!(loaded.laps, track.laps);
        assert_eq!(loaded.walls, track.walls);
    }

    #[test]
    fn yaml_track_without_checkpoints_is_rejected() {
        let text = "map: NoneMap\nlaps: 3\nspawns:\n- x: 256\n  y: 256\n- x: 512\n  y: 512\nspawn_angle: 0\ncheckpoints: []\nwalls: []\nitem_boxes: []\n";
        assert!(matches!(
            TrackData::from_yaml(text),
            Err(TrackError::Missing("checkpoints"))
        ));
    }
}
