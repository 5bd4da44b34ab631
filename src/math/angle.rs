use std::fmt::Display;
use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize};

use super::fixed::Fixed;

/// A full turn in angle units.
pub const ANGLE_FULL: i32 = 512;
/// Half a turn.
pub const ANGLE_HALF: i32 = ANGLE_FULL / 2;
/// Mask isolating the low nine bits of an angle value.
pub const ANGLE_MASK: i32 = ANGLE_FULL - 1;

/// A quarter turn. `sin(a + QUARTER) == cos(a)`.
const ANGLE_QUARTER: i32 = ANGLE_FULL / 4;

/// A binary angle: an integer in `[0, 512)` representing a full turn.
///
/// Angle zero points along positive x; the angle grows toward positive y.
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[derive(Serialize)]
#[serde(transparent)]
pub struct Angle(i32);

/// Deserialized angles wrap into `[0, 512)` like any other input.
impl<'de> Deserialize<'de> for Angle {
    fn deserialize<D>(deserializer: D) -> Result<Angle, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Angle::new(i32::deserialize(deserializer)?))
    }
}

impl Angle {
    pub const ZERO: Angle = Angle(0);

    /// Create an angle from any integer, wrapped into `[0, 512)`.
    pub const fn new(value: i32) -> Angle {
        // Two's complement makes the mask a correct mod 512 for negatives.
        Angle(value & ANGLE_MASK)
    }

    /// The angle value in `[0, 512)`.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Add a (possibly negative) angle delta, wrapping around the full turn.
    pub const fn wrapping_add(self, delta: i32) -> Angle {
        Angle(self.0.wrapping_add(delta) & ANGLE_MASK)
    }

    /// The angle pointing the opposite way.
    pub const fn opposite(self) -> Angle {
        self.wrapping_add(ANGLE_HALF)
    }

    /// Signed minimum arc from `self` to `target`, in `[-256, 255]`.
    pub const fn arc_to(self, target: Angle) -> i32 {
        let d = (target.0 - self.0) & ANGLE_MASK;
        if d >= ANGLE_HALF {
            d - ANGLE_FULL
        } else {
            d
        }
    }

    /// Sine of the angle as a table lookup.
    pub fn sin(self) -> Fixed {
        sin_table()[self.0 as usize]
    }

    /// Cosine of the angle as a table lookup.
    pub fn cos(self) -> Fixed {
        sin_table()[((self.0 + ANGLE_QUARTER) & ANGLE_MASK) as usize]
    }
}

impl Display for Angle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/512", self.0)
    }
}

/// The 512 entry sine table, precomputed once.
fn sin_table() -> &'static [Fixed; ANGLE_FULL as usize] {
    static TABLE: OnceLock<[Fixed; ANGLE_FULL as usize]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [Fixed::ZERO; ANGLE_FULL as usize];
        for (i, entry) in table.iter_mut().enumerate() {
            let radians = i as f64 * std::f64::consts::TAU / ANGLE_FULL as f64;
            *entry = Fixed::from_raw((radians.sin() * 256.0).round() as i32);
        }
        table
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wraps_into_range() {
        assert_eq!(Angle::new(512), Angle::ZERO);
        assert_eq!(Angle::new(513).raw(), 1);
        assert_eq!(Angle::new(-1).raw(), 511);
        assert_eq!(Angle::new(-512), Angle::ZERO);
    }

    #[test]
    fn wrapping_add_stays_in_range() {
        assert_eq!(Angle::new(500).wrapping_add(20).raw(), 8);
        assert_eq!(Angle::new(10).wrapping_add(-20).raw(), 502);
        for a in 0..ANGLE_FULL {
            let wrapped = Angle::new(a).wrapping_add(a).raw();
            assert!((0..ANGLE_FULL).contains(&wrapped));
        }
    }

    #[test]
    fn opposite_is_half_turn() {
        assert_eq!(Angle::ZERO.opposite().raw(), 256);
        assert_eq!(Angle::new(300).opposite().raw(), 44);
    }

    #[test]
    fn arc_is_minimal_and_signed() {
        assert_eq!(Angle::new(10).arc_to(Angle::new(20)), 10);
        assert_eq!(Angle::new(20).arc_to(Angle::new(10)), -10);
        assert_eq!(Angle::new(500).arc_to(Angle::new(10)), 22);
        assert_eq!(Angle::new(10).arc_to(Angle::new(500)), -22);
        assert_eq!(Angle::ZERO.arc_to(Angle::new(256)), -256);
    }

    #[test]
    fn table_cardinal_directions() {
        assert_eq!(Angle::ZERO.cos(), Fixed::ONE);
        assert_eq!(Angle::ZERO.sin(), Fixed::ZERO);
        assert_eq!(Angle::new(128).sin(), Fixed::ONE);
        assert_eq!(Angle::new(128).cos(), Fixed::ZERO);
        assert_eq!(Angle::new(256).cos(), -Fixed::ONE);
        assert_eq!(Angle::new(384).sin(), -Fixed::ONE);
    }
}
