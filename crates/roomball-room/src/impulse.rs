//! Per-player pending impulse.

use roomball_physics::Vec2;

/// A pair of signed intensities waiting to be applied at the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Impulse {
    pub x: i32,
    pub y: i32,
}

impl Impulse {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Accumulates `incoming` onto this pending impulse.
    ///
    /// Per axis: when both components are strictly positive or strictly
    /// negative the axis is already saturated and stays as is; otherwise
    /// the incoming component is added. Repeated presses therefore never
    /// grow the impulse, while a reversal lands immediately.
    pub fn merge(self, incoming: Self) -> Self {
        Self {
            x: merge_axis(self.x, incoming.x),
            y: merge_axis(self.y, incoming.y),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

fn merge_axis(pending: i32, incoming: i32) -> i32 {
    if pending.signum() * incoming.signum() > 0 {
        pending
    } else {
        pending.saturating_add(incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: i32 = 150;

    #[test]
    fn test_same_direction_does_not_grow() {
        let pending = Impulse::new(S, 0);
        assert_eq!(pending.merge(Impulse::new(S, 0)), Impulse::new(S, 0));
        let up = Impulse::new(0, -S);
        assert_eq!(up.merge(up).merge(up), up);
    }

    #[test]
    fn test_reversal_cancels() {
        let pending = Impulse::new(S, 0);
        assert_eq!(pending.merge(Impulse::new(-S, 0)), Impulse::ZERO);
    }

    #[test]
    fn test_zero_axis_takes_incoming() {
        let pending = Impulse::new(S, 0);
        assert_eq!(pending.merge(Impulse::new(0, S)), Impulse::new(S, S));
        assert_eq!(Impulse::ZERO.merge(Impulse::new(-S, 0)), Impulse::new(-S, 0));
    }

    #[test]
    fn test_to_vec2() {
        assert_eq!(Impulse::new(3, -4).to_vec2(), Vec2::new(3.0, -4.0));
        assert!(Impulse::default().is_zero());
    }
}
