//! 2D vector math and deterministic randomness for the simulation.
//!
//! The playfield is a small float plane (roughly `[-1, 1] x [-0.75, 0.75]`
//! on screen). Every helper here guards degenerate geometry explicitly:
//! normalizing a zero vector yields [`Vec2::ZERO`] instead of NaN.

use serde::{Deserialize, Serialize};

/// 2D vector in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Vec2 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Unit vector along +Y (heading 0).
    pub const UP: Self = Self { x: 0.0, y: 1.0 };

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        let d = other - self;
        d.dot(d)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// Unit direction from `self` toward `to`, or zero if the points coincide.
    #[must_use]
    pub fn direction_to(self, to: Self) -> Self {
        (to - self).normalize_or_zero()
    }

    /// Whether both components are exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Heading of this direction in degrees.
    ///
    /// 0 points along +Y and angles increase clockwise, so +X is 90.
    #[must_use]
    pub fn heading_degrees(self) -> f32 {
        self.x.atan2(self.y).to_degrees()
    }

    /// Unit vector for a heading in degrees (inverse of [`heading_degrees`](Self::heading_degrees)).
    #[must_use]
    pub fn from_heading_degrees(degrees: f32) -> Self {
        let radians = degrees.to_radians();
        Self::new(radians.sin(), radians.cos())
    }

    /// Point at `radius` from `self` along the angle `radians` (counter-clockwise from +X).
    #[must_use]
    pub fn offset_polar(self, radians: f32, radius: f32) -> Self {
        Self::new(self.x + radians.cos() * radius, self.y + radians.sin() * radius)
    }

    /// Centroid of a set of points, or `None` for an empty set.
    #[must_use]
    pub fn centroid<I: IntoIterator<Item = Self>>(points: I) -> Option<Self> {
        let mut sum = Self::ZERO;
        let mut count = 0u32;
        for p in points {
            sum = sum + p;
            count += 1;
        }
        (count > 0).then(|| sum * (1.0 / count as f32))
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned playfield limits used to clamp every AI destination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBounds {
    /// Half width and half height of the visible field.
    pub half_extents: Vec2,
    /// Distance kept from each edge.
    pub margin: f32,
}

impl ScreenBounds {
    /// Clamp a point into the field, `margin` away from each edge.
    #[must_use]
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        let max_x = (self.half_extents.x - self.margin).max(0.0);
        let max_y = (self.half_extents.y - self.margin).max(0.0);
        Vec2::new(point.x.clamp(-max_x, max_x), point.y.clamp(-max_y, max_y))
    }

    /// Whether a point lies inside the clamped area.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        self.clamp(point) == point
    }
}

impl Default for ScreenBounds {
    fn default() -> Self {
        Self {
            half_extents: Vec2::new(1.0, 0.75),
            margin: 0.05,
        }
    }
}

/// Small seeded RNG so that "random" spawns and nudges replay identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Next raw value (64-bit LCG step).
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.state
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        ((self.next_u64() >> 40) as f32) / ((1u64 << 24) as f32)
    }

    /// Uniform angle in radians, `[0, 2π)`.
    pub fn next_angle(&mut self) -> f32 {
        self.next_f32() * std::f32::consts::TAU
    }

    /// Random unit vector.
    pub fn next_direction(&mut self) -> Vec2 {
        Vec2::ZERO.offset_polar(self.next_angle(), 1.0)
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(3.0, 0.0);
        let b = Vec2::new(0.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < EPS);
        assert!((a.distance_squared(b) - 25.0).abs() < EPS);
    }

    #[test]
    fn test_normalize_zero_is_zero() {
        assert_eq!(Vec2::ZERO.normalize_or_zero(), Vec2::ZERO);
        assert_eq!(Vec2::new(0.2, 0.2).direction_to(Vec2::new(0.2, 0.2)), Vec2::ZERO);
    }

    #[test]
    fn test_normalize_preserves_direction() {
        let n = Vec2::new(3.0, 4.0).normalize_or_zero();
        assert!((n.length() - 1.0).abs() < EPS);
        assert!((n.x * 4.0 - n.y * 3.0).abs() < EPS);
    }

    #[test]
    fn test_heading_is_clockwise_from_up() {
        assert!(Vec2::UP.heading_degrees().abs() < EPS);
        assert!((Vec2::new(1.0, 0.0).heading_degrees() - 90.0).abs() < EPS);
        assert!((Vec2::new(-1.0, 0.0).heading_degrees() + 90.0).abs() < EPS);

        let back = Vec2::from_heading_degrees(90.0);
        assert!((back.x - 1.0).abs() < EPS);
        assert!(back.y.abs() < EPS);
    }

    #[test]
    fn test_centroid() {
        assert_eq!(Vec2::centroid(std::iter::empty()), None);
        let c = Vec2::centroid([Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.5)]).unwrap();
        assert!((c.x - 0.5).abs() < EPS);
        assert!((c.y - 0.25).abs() < EPS);
    }

    #[test]
    fn test_screen_bounds_clamp() {
        let bounds = ScreenBounds::default();
        let clamped = bounds.clamp(Vec2::new(3.0, -2.0));
        assert!((clamped.x - 0.95).abs() < EPS);
        assert!((clamped.y + 0.70).abs() < EPS);
        assert!(bounds.contains(Vec2::new(0.1, 0.1)));
    }

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = SimRng::new(42);
        let mut b = SimRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let f = a.next_f32();
        assert!((0.0..1.0).contains(&f));
    }
}
