use crate::kart::Kart;
use crate::math::{Fixed, Vec2};

/// Steering inversion duration (3.5 s at 60 Hz).
pub const CONFUSION_TICKS: u32 = 210;

/// Speed boost duration (2.5 s at 60 Hz).
pub const BOOST_TICKS: u32 = 150;

/// Distance a kart must travel before an oil slick wears off.
pub const OIL_SLOW_DISTANCE: Fixed = Fixed::from_int(120);

const HALF: Fixed = Fixed::from_raw(128);

/// Timed status effects of the local player.
///
/// All timers are integer tick countdowns; an effect is active while its
/// timer is above zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlayerItemEffects {
    confusion_ticks: u32,
    boost_ticks: u32,
    boost_original_max: Fixed,
    oil_slow: bool,
    oil_start: Vec2,
}

impl PlayerItemEffects {
    /// Steering is inverted while confusion is active.
    pub fn confusion_active(&self) -> bool {
        self.confusion_ticks > 0
    }

    pub fn boost_active(&self) -> bool {
        self.boost_ticks > 0
    }

    pub fn oil_slow_active(&self) -> bool {
        self.oil_slow
    }

    pub fn start_confusion(&mut self) {
        self.confusion_ticks = CONFUSION_TICKS;
    }

    /// Double the kart's top speed for the boost duration. The original
    /// maximum is snapshotted once; re-triggering extends the timer
    /// without stacking.
    pub fn start_boost(&mut self, kart: &mut Kart) {
        if self.boost_ticks == 0 {
            self.boost_original_max = kart.max_speed;
        }
        kart.max_speed = self.boost_original_max.mul(Fixed::from_int(2));
        self.boost_ticks = BOOST_TICKS;
    }

    /// Halve the kart's speed and start tracking the traveled distance.
    /// Already sliding on oil keeps the current slide.
    pub fn start_oil_slow(&mut self, kart: &mut Kart) {
        if self.oil_slow {
            return;
        }
        kart.speed = kart.speed.mul(HALF);
        self.oil_slow = true;
        self.oil_start = kart.pos;
    }

    pub fn clear(&mut self) {
        *self = PlayerItemEffects::default();
    }

    /// Advance all timers by one tick and apply their per tick effect to
    /// the kart.
    pub fn tick(&mut self, kart: &mut Kart) {
        if self.confusion_ticks > 0 {
            self.confusion_ticks -= 1;
        }

        if self.boost_ticks > 0 {
            self.boost_ticks -= 1;
            if self.boost_ticks == 0 {
                kart.max_speed = self.boost_original_max;
                kart.speed = kart.speed.min(kart.max_speed);
            }
        }

        if self.oil_slow {
            let traveled = kart.pos.distance(self.oil_start);
            if traveled >= OIL_SLOW_DISTANCE {
                self.oil_slow = false;
            } else {
                // The cap fades from half speed back to full over the
                // slide distance.
                let half = kart.max_speed.mul(HALF);
                let recovered = half.mul(traveled.div(OIL_SLOW_DISTANCE));
                kart.speed = kart.speed.min(half + recovered);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_kart() -> Kart {
        Kart::new(
            Vec2::from_int(100, 100),
            "test",
            Fixed::from_int(4),
            Fixed::from_int(1),
            Fixed::ONE,
        )
    }

    #[test]
    fn confusion_counts_down() {
        let mut effects = PlayerItemEffects::default();
        let mut kart = test_kart();
        effects.start_confusion();
        assert!(effects.confusion_active());
        for _ in 0..CONFUSION_TICKS {
            effects.tick(&mut kart);
        }
        assert!(!effects.confusion_active());
    }

    #[test]
    fn boost_restores_the_original_max_speed() {
        let mut effects = PlayerItemEffects::default();
        let mut kart = test_kart();
        kart.speed = Fixed::from_int(4);

        effects.start_boost(&mut kart);
        assert_eq!(kart.max_speed, Fixed::from_int(8));

        // Re-triggering must not stack on the boosted maximum.
        effects.start_boost(&mut kart);
        assert_eq!(kart.max_speed, Fixed::from_int(8));

        kart.speed = Fixed::from_int(8);
        for _ in 0..BOOST_TICKS {
            effects.tick(&mut kart);
        }
        assert!(!effects.boost_active());
        assert_eq!(kart.max_speed, Fixed::from_int(4));
        assert_eq!(kart.speed, Fixed::from_int(4));
    }

    #[test]
    fn oil_halves_and_fades_with_distance() {
        let mut effects = PlayerItemEffects::default();
        let mut kart = test_kart();
        kart.speed = Fixed::from_int(4);

        effects.start_oil_slow(&mut kart);
        assert_eq!(kart.speed, Fixed::from_int(2));
        assert!(effects.oil_slow_active());

        // A second slick while sliding does not halve again.
        effects.start_oil_slow(&mut kart);
        assert_eq!(kart.speed, Fixed::from_int(2));

        // Right on the slick the cap holds at half the maximum.
        effects.tick(&mut kart);
        assert_eq!(kart.speed, Fixed::from_int(2));

        // After sliding the full distance the effect wears off.
        kart.pos = Vec2::from_int(100 + 120, 100);
        effects.tick(&mut kart);
        assert!(!effects.oil_slow_active());
    }
}
