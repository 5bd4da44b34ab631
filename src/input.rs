use bitflags::bitflags;

bitflags! {
    /// Button states sampled once per physics tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const ACCELERATE = 1 << 0;
        const BRAKE = 1 << 1;
        const STEER_LEFT = 1 << 2;
        const STEER_RIGHT = 1 << 3;
        const USE_ITEM = 1 << 4;
        const FIRE_FORWARD = 1 << 5;
        const PAUSE = 1 << 6;
    }
}

impl Default for Buttons {
    fn default() -> Buttons {
        Buttons::empty()
    }
}

/// A read only snapshot of the controls, consumed by the race tick.
///
/// The pause button is edge triggered by the tick driver; every other
/// button is level triggered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InputSnapshot {
    pub buttons: Buttons,
}

impl InputSnapshot {
    pub fn new(buttons: Buttons) -> InputSnapshot {
        InputSnapshot { buttons }
    }

    pub fn accelerate(&self) -> bool {
        self.buttons.contains(Buttons::ACCELERATE)
    }

    pub fn brake(&self) -> bool {
        self.buttons.contains(Buttons::BRAKE)
    }

    /// Steering direction: -1 left, +1 right, 0 for neutral or both held.
    pub fn steer(&self) -> i32 {
        let mut dir = 0;
        if self.buttons.contains(Buttons::STEER_LEFT) {
            dir -= 1;
        }
        if self.buttons.contains(Buttons::STEER_RIGHT) {
            dir += 1;
        }
        dir
    }

    pub fn use_item(&self) -> bool {
        self.buttons.contains(Buttons::USE_ITEM)
    }

    pub fn fire_forward(&self) -> bool {
        self.buttons.contains(Buttons::FIRE_FORWARD)
    }

    pub fn pause(&self) -> bool {
        self.buttons.contains(Buttons::PAUSE)
    }
}
