use std::f64::consts::{PI, TAU};

use super::Vec2;

/// A geographic coordinate on some surface, in radians.
///
/// `phi` is the latitude-like parameter and `lambda` the longitude-like one.
/// On periodic surfaces `lambda` is only meaningful modulo 2π.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Place {
    pub phi: f64,
    pub lambda: f64,
}

impl Place {
    pub fn new(phi: f64, lambda: f64) -> Self {
        Self { phi, lambda }
    }

    pub fn from_degrees(phi_deg: f64, lambda_deg: f64) -> Self {
        Self::new(phi_deg.to_radians(), lambda_deg.to_radians())
    }

    /// Parameter-space layout used by geographic paths: `x = λ`, `y = φ`.
    pub fn to_coord(self) -> Vec2 {
        Vec2::new(self.lambda, self.phi)
    }

    pub fn from_coord(coord: Vec2) -> Self {
        Self::new(coord.y, coord.x)
    }
}

impl From<Place> for Vec2 {
    fn from(place: Place) -> Self {
        place.to_coord()
    }
}

/// Wraps an angle into `[-π, π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid can round up to TAU for inputs a hair below a multiple of it.
    if wrapped >= PI { wrapped - TAU } else { wrapped }
}

/// Signed angular difference `to - from`, taken the short way round.
pub fn angle_delta(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

/// Shifts `angle` by whole turns so that it lies within π of `reference`.
pub fn unwrap_near(angle: f64, reference: f64) -> f64 {
    reference + angle_delta(reference, angle)
}

/// Whether two longitudes name the same meridian modulo 2π.
pub fn same_longitude(a: f64, b: f64) -> bool {
    a == b || angle_delta(a, b).abs() <= 1e-12
}
