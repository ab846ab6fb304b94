use serde::{Deserialize, Serialize};

use crate::IndexError;

const FULL_TURN: f64 = std::f64::consts::TAU;
const HALF_TURN: f64 = std::f64::consts::PI;

/// Convert radians to degrees.
#[must_use]
pub fn rtod(radians: f64) -> f64 {
    radians.to_degrees()
}

/// Convert degrees to radians.
#[must_use]
pub fn dtor(degrees: f64) -> f64 {
    degrees.to_radians()
}

/// Wrap an angle into `(-π, π]`. `NaN` and infinities map to zero.
#[must_use]
pub fn angle_normalize(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut wrapped = (angle + HALF_TURN).rem_euclid(FULL_TURN) - HALF_TURN;
    // rem_euclid yields [-π, π); move the closed end to +π
    if wrapped <= -HALF_TURN {
        wrapped += FULL_TURN;
    }
    if wrapped > HALF_TURN {
        wrapped -= FULL_TURN;
    }
    wrapped
}

/// Square toroidal world with side length `size`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Torus {
    size: f64,
}

impl Torus {
    /// Construct a torus, rejecting non-finite or non-positive sizes.
    pub fn new(size: f64) -> Result<Self, IndexError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(IndexError::InvalidConfig(
                "world size must be finite and positive",
            ));
        }
        Ok(Self { size })
    }

    /// Side length (the period on both axes).
    #[must_use]
    pub const fn size(&self) -> f64 {
        self.size
    }

    /// Wrap a coordinate into `[0, size)`.
    #[must_use]
    pub fn distance_normalize(&self, d: f64) -> f64 {
        if !d.is_finite() {
            return 0.0;
        }
        let wrapped = d.rem_euclid(self.size);
        // tiny negative inputs round up to exactly `size`
        if wrapped >= self.size { 0.0 } else { wrapped }
    }

    /// Wrap an angle into `(-π, π]`.
    #[must_use]
    pub fn angle_normalize(&self, a: f64) -> f64 {
        angle_normalize(a)
    }

    /// Shortest signed displacement congruent to `d` modulo the world size.
    #[must_use]
    pub fn wrap_distance(&self, d: f64) -> f64 {
        let half = self.size * 0.5;
        let mut wrapped = d;
        if wrapped > half || wrapped < -half {
            wrapped = self.distance_normalize(d);
            if wrapped > half {
                wrapped -= self.size;
            }
        }
        wrapped
    }

    /// Wrapped `(dx, dy)` pointing from `from` to `to`.
    #[must_use]
    pub fn delta(&self, from: (f64, f64), to: (f64, f64)) -> (f64, f64) {
        (
            self.wrap_distance(to.0 - from.0),
            self.wrap_distance(to.1 - from.1),
        )
    }

    /// Euclidean distance along the shortest wrapped path.
    #[must_use]
    pub fn distance(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        let (dx, dy) = self.delta(a, b);
        dx.hypot(dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn unit() -> Torus {
        Torus::new(1.0).expect("torus")
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(Torus::new(0.0).is_err());
        assert!(Torus::new(-2.0).is_err());
        assert!(Torus::new(f64::NAN).is_err());
        assert!(Torus::new(f64::INFINITY).is_err());
    }

    #[test]
    fn distance_normalize_wraps_both_directions() {
        let torus = unit();
        assert!((torus.distance_normalize(1.009) - 0.009).abs() < 1e-12);
        assert!((torus.distance_normalize(-0.25) - 0.75).abs() < 1e-12);
        assert!((torus.distance_normalize(3.5) - 0.5).abs() < 1e-12);
        assert_eq!(torus.distance_normalize(1.0), 0.0);
        assert_eq!(torus.distance_normalize(-1e-20), 0.0);
        assert_eq!(torus.distance_normalize(f64::NAN), 0.0);
    }

    #[test]
    fn angle_normalize_keeps_pi_and_maps_minus_pi() {
        assert_eq!(angle_normalize(PI), PI);
        assert!((angle_normalize(-PI) - PI).abs() < 1e-12);
        assert!((angle_normalize(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((angle_normalize(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert_eq!(angle_normalize(f64::NAN), 0.0);
    }

    #[test]
    fn wrap_distance_takes_the_short_way_round() {
        let torus = unit();
        assert!((torus.wrap_distance(0.9) + 0.1).abs() < 1e-12);
        assert!((torus.wrap_distance(-0.9) - 0.1).abs() < 1e-12);
        assert_eq!(torus.wrap_distance(0.3), 0.3);
        assert_eq!(torus.wrap_distance(0.5), 0.5);
        assert!((torus.wrap_distance(2.2) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn delta_and_distance_cross_the_seam() {
        let torus = unit();
        let (dx, dy) = torus.delta((0.95, 0.05), (0.05, 0.95));
        assert!((dx - 0.1).abs() < 1e-12);
        assert!((dy + 0.1).abs() < 1e-12);
        assert!((torus.distance((0.95, 0.5), (0.05, 0.5)) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn degree_helpers_round_trip() {
        assert!((dtor(90.0) - PI / 2.0).abs() < 1e-12);
        assert!((rtod(PI) - 180.0).abs() < 1e-12);
    }
}
