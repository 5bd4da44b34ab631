use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use super::angle::{Angle, ANGLE_FULL};
use super::fixed::{isqrt, Fixed};

/// A 2D vector of fixed point components.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Vec2 {
    pub x: Fixed,
    pub y: Fixed,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    pub const fn new(x: Fixed, y: Fixed) -> Vec2 {
        Vec2 { x, y }
    }

    /// A vector from whole world units.
    pub const fn from_int(x: i32, y: i32) -> Vec2 {
        Vec2 {
            x: Fixed::from_int(x),
            y: Fixed::from_int(y),
        }
    }

    /// Scale both components by a fixed point factor.
    pub fn scale(self, factor: Fixed) -> Vec2 {
        Vec2 {
            x: self.x.mul(factor),
            y: self.y.mul(factor),
        }
    }

    /// Euclidean length, computed with a 64 bit integer square root.
    pub fn len(self) -> Fixed {
        let x = self.x.raw() as i64;
        let y = self.y.raw() as i64;
        Fixed::from_raw(isqrt((x * x + y * y) as u64) as i32)
    }

    /// The unit vector pointing the same way. The zero vector stays zero.
    pub fn normalized(self) -> Vec2 {
        let len = self.len();
        if len.is_zero() {
            return Vec2::ZERO;
        }
        Vec2 {
            x: self.x.div(len),
            y: self.y.div(len),
        }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Vec2) -> Fixed {
        (other - self).len()
    }

    /// Squared distance in raw units. Avoids the square root on hot paths;
    /// compare against a squared raw radius.
    pub fn distance_squared(self, other: Vec2) -> i64 {
        let dx = (other.x.raw() - self.x.raw()) as i64;
        let dy = (other.y.raw() - self.y.raw()) as i64;
        dx * dx + dy * dy
    }

    /// The unit vector for an angle, from the sine table.
    pub fn from_angle(angle: Angle) -> Vec2 {
        Vec2 {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    /// The nearest angle index of a non zero vector. Ties resolve toward the
    /// lower index. The zero vector maps to angle zero.
    pub fn to_angle(self) -> Angle {
        if self.is_zero() {
            return Angle::ZERO;
        }
        let radians = (self.y.raw() as f64).atan2(self.x.raw() as f64);
        let scaled = radians * ANGLE_FULL as f64 / std::f64::consts::TAU;
        Angle::new((scaled - 0.5).ceil() as i32)
    }

    /// True when both components are exactly zero.
    pub fn is_zero(self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        *self = *self + rhs;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_four_five_length() {
        let v = Vec2::from_int(3, 4);
        assert_eq!(v.len(), Fixed::from_int(5));
    }

    #[test]
    fn scaled_unit_vector_along_x() {
        let v = Vec2::from_angle(Angle::ZERO).scale(Fixed::from_int(10));
        assert_eq!(v.x, Fixed::from_int(10));
        assert_eq!(v.y, Fixed::ZERO);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
    }

    #[test]
    fn normalize_has_unit_length() {
        let v = Vec2::from_int(3, 4).normalized();
        let len = v.len();
        assert!((len.raw() - Fixed::ONE.raw()).abs() <= 2, "len was {len}");
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Vec2::from_int(1, 1);
        let b = Vec2::from_int(4, 5);
        assert_eq!(a.distance(b), Fixed::from_int(5));
        assert_eq!(a.distance_squared(b), {
            let d = Fixed::from_int(5).raw() as i64;
            d * d
        });
    }

    #[test]
    fn angle_round_trip_for_every_index() {
        for a in 0..ANGLE_FULL {
            let angle = Angle::new(a);
            assert_eq!(
                Vec2::from_angle(angle).to_angle(),
                angle,
                "round trip failed at {a}"
            );
        }
    }

    #[test]
    fn zero_vector_maps_to_angle_zero() {
        assert_eq!(Vec2::ZERO.to_angle(), Angle::ZERO);
    }
}
