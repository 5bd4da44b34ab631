mod angle;
mod fixed;
mod vec2;

pub use angle::Angle;
pub use angle::ANGLE_FULL;
pub use angle::ANGLE_HALF;
pub use angle::ANGLE_MASK;
pub use fixed::Fixed;
pub use fixed::FRACTION_BITS;
pub use vec2::Vec2;
