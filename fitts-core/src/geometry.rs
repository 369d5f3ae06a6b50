use serde::{Deserialize, Serialize};

/// A point in canvas pixels, y growing downwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

pub fn distance(a: Position, b: Position) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Center of target `index` on a ring of diameter `amplitude` around `center`.
///
/// Targets are spaced `360 / target_count` degrees apart, target 0 sitting to
/// the right of the center. Indices past `target_count` wrap through the
/// periodicity of the angle.
pub fn target_position(
    center: Position,
    amplitude: f64,
    target_count: usize,
    index: usize,
) -> Position {
    let step = 360.0 / target_count as f64;
    let theta = (index as f64 * step).to_radians();
    let radius = amplitude / 2.0;
    Position::new(
        center.x + theta.cos() * radius,
        center.y + theta.sin() * radius,
    )
}

/// A click hits when it lands strictly inside the circle of diameter `width`.
pub fn is_hit(click: Position, target: Position, width: f64) -> bool {
    distance(click, target) < width / 2.0
}

/// Index of the target expected at `click_number` for a ring of `n` targets.
///
/// Two markers walk the ring half a turn apart; even clicks advance the first,
/// odd clicks the second, which produces the back-and-forth crossing pattern.
pub fn target_sequence(click_number: usize, n: usize) -> usize {
    debug_assert!(n > 0, "target ring must not be empty");
    let n = n as isize;
    let mut marker1: isize = -1;
    // floor(n / 2) equals (n - 1) / 2 for odd n
    let mut marker2: isize = n / 2;
    let mut target = 0;

    for i in 0..=click_number {
        if i % 2 == 0 {
            marker1 = (marker1 + 1) % n;
            target = marker1;
        } else {
            marker2 = (marker2 + 1) % n;
            target = marker2;
        }
    }

    target as usize
}
