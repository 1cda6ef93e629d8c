//! The small slice of each surface type that the projection and clipping
//! layers consume: periodicity, parameter bounds and the natural frame.

use std::f64::consts::{FRAC_PI_2, PI};

use foundation::math::{Place, Vec2};

use crate::frame::Frame;
use crate::path::PathSegment;

pub trait Surface {
    /// Whether λ wraps modulo 2π.
    fn is_periodic(&self) -> bool;

    /// `(φ_min, φ_max)` of the parameter domain.
    fn phi_bounds(&self) -> (f64, f64);

    fn lambda_bounds(&self) -> (f64, f64) {
        (-PI, PI)
    }

    /// Map units per radian along the equator.
    fn length_scale(&self) -> f64;

    /// Meridional over equatorial length per radian.
    fn aspect(&self) -> f64 {
        1.0
    }

    /// The surface's natural frame, one counter-clockwise loop in (λ, φ).
    fn geo_edges(&self) -> Frame {
        let (l0, l1) = self.lambda_bounds();
        let (p0, p1) = self.phi_bounds();
        Frame::geographic(l0, l1, p0, p1)
    }

    /// Segments that leave the domain after `from`, go around outside its
    /// rim counter-clockwise and stop short of `to`.
    ///
    /// The default drops below the φ floor and follows a parallel eastward.
    fn exterior_path(&self, from: Place, to: Place) -> Vec<PathSegment> {
        let (p0, p1) = self.phi_bounds();
        let floor = p0 - 0.05 * (p1 - p0);
        let lambda_to = from.lambda + (to.lambda - from.lambda).rem_euclid(std::f64::consts::TAU);
        vec![
            PathSegment::MeridianTo(Vec2::new(from.lambda, floor)),
            PathSegment::ParallelTo(Vec2::new(lambda_to, floor)),
            PathSegment::MeridianTo(Vec2::new(lambda_to, to.phi)),
        ]
    }
}

/// Oblate spheroid; poles at φ = ±π/2.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Spheroid {
    pub radius: f64,
    pub flattening: f64,
}

impl Surface for Spheroid {
    fn is_periodic(&self) -> bool {
        true
    }

    fn phi_bounds(&self) -> (f64, f64) {
        (-FRAC_PI_2, FRAC_PI_2)
    }

    fn length_scale(&self) -> f64 {
        self.radius
    }

    fn aspect(&self) -> f64 {
        1.0 - self.flattening
    }
}

/// Torus parameterized by the angle around the hole (λ) and around the tube (φ).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Toroid {
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl Surface for Toroid {
    fn is_periodic(&self) -> bool {
        true
    }

    fn phi_bounds(&self) -> (f64, f64) {
        (-PI, PI)
    }

    fn length_scale(&self) -> f64 {
        self.major_radius
    }

    fn aspect(&self) -> f64 {
        self.minor_radius / self.major_radius
    }
}

/// Flat disc: the center sits at φ = π/2 and the rim at φ = 0.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Disc {
    pub radius: f64,
}

impl Surface for Disc {
    fn is_periodic(&self) -> bool {
        true
    }

    fn phi_bounds(&self) -> (f64, f64) {
        (0.0, FRAC_PI_2)
    }

    fn length_scale(&self) -> f64 {
        self.radius / FRAC_PI_2
    }
}

/// Bounded rectangle of the plane, with `x = λ` and `y = φ` taken directly.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    pub width: f64,
    pub height: f64,
}

impl Plane {
    fn margin(&self) -> f64 {
        0.05 * self.width.max(self.height)
    }

    /// Position along the perimeter of the box grown by `margin`, counter-
    /// clockwise from its south-west corner, of the side point nearest `p`.
    fn perimeter_position(&self, p: Vec2) -> f64 {
        let (hw, hh) = (0.5 * self.width + self.margin(), 0.5 * self.height + self.margin());
        let (w, h) = (2.0 * hw, 2.0 * hh);
        let to_south = p.y + hh;
        let to_east = hw - p.x;
        let to_north = hh - p.y;
        let to_west = p.x + hw;
        let nearest = to_south.min(to_east).min(to_north).min(to_west);
        if nearest == to_south {
            (p.x + hw).clamp(0.0, w)
        } else if nearest == to_east {
            w + (p.y + hh).clamp(0.0, h)
        } else if nearest == to_north {
            w + h + (hw - p.x).clamp(0.0, w)
        } else {
            2.0 * w + h + (hh - p.y).clamp(0.0, h)
        }
    }

    fn perimeter_point(&self, s: f64) -> Vec2 {
        let (hw, hh) = (0.5 * self.width + self.margin(), 0.5 * self.height + self.margin());
        let (w, h) = (2.0 * hw, 2.0 * hh);
        if s <= w {
            Vec2::new(-hw + s, -hh)
        } else if s <= w + h {
            Vec2::new(hw, -hh + (s - w))
        } else if s <= 2.0 * w + h {
            Vec2::new(hw - (s - w - h), hh)
        } else {
            Vec2::new(-hw, hh - (s - 2.0 * w - h))
        }
    }
}

impl Surface for Plane {
    fn is_periodic(&self) -> bool {
        false
    }

    fn phi_bounds(&self) -> (f64, f64) {
        (-0.5 * self.height, 0.5 * self.height)
    }

    fn lambda_bounds(&self) -> (f64, f64) {
        (-0.5 * self.width, 0.5 * self.width)
    }

    fn length_scale(&self) -> f64 {
        1.0
    }

    fn geo_edges(&self) -> Frame {
        let (x0, x1) = self.lambda_bounds();
        let (y0, y1) = self.phi_bounds();
        Frame::rectangle(Vec2::new(x0, y0), Vec2::new(x1, y1))
    }

    /// Walks the margin box counter-clockwise between the sides nearest the
    /// two endpoints.
    fn exterior_path(&self, from: Place, to: Place) -> Vec<PathSegment> {
        let margin = self.margin();
        let perimeter = 2.0 * (self.width + self.height) + 8.0 * margin;
        let corners = [
            self.width + 2.0 * margin,
            self.width + self.height + 4.0 * margin,
            2.0 * self.width + self.height + 6.0 * margin,
            perimeter,
        ];
        let s0 = self.perimeter_position(from.to_coord());
        let s1 = self.perimeter_position(to.to_coord());
        let span = (s1 - s0).rem_euclid(perimeter);

        let mut out = vec![PathSegment::LineTo(self.perimeter_point(s0))];
        let mut passed: Vec<f64> = corners
            .iter()
            .flat_map(|&c| [c, c + perimeter])
            .filter(|&c| c > s0 && c < s0 + span)
            .collect();
        passed.sort_by(f64::total_cmp);
        out.extend(
            passed
                .into_iter()
                .map(|c| PathSegment::LineTo(self.perimeter_point(c.rem_euclid(perimeter)))),
        );
        out.push(PathSegment::LineTo(self.perimeter_point(s1)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn natural_frames_match_bounds() {
        let globe = Spheroid {
            radius: 1.0,
            flattening: 0.0,
        };
        assert_eq!(
            globe.geo_edges(),
            Frame::geographic(-PI, PI, -FRAC_PI_2, FRAC_PI_2)
        );
        let plane = Plane {
            width: 4.0,
            height: 2.0,
        };
        assert_eq!(
            plane.geo_edges(),
            Frame::rectangle(Vec2::new(-2.0, -1.0), Vec2::new(2.0, 1.0))
        );
    }

    #[test]
    fn disc_exterior_runs_east_below_the_rim() {
        let disc = Disc { radius: 1.0 };
        let path = disc.exterior_path(Place::new(0.1, 3.0), Place::new(0.1, -3.0));
        let PathSegment::ParallelTo(end) = path[1] else {
            panic!("expected a parallel, got {path:?}");
        };
        assert!(end.y < 0.0);
        assert!(end.x > 3.0);
    }

    #[test]
    fn plane_exterior_turns_the_corner() {
        let plane = Plane {
            width: 10.0,
            height: 10.0,
        };
        // From near the south side to near the east side, passing the SE corner.
        let path = plane.exterior_path(Place::new(-4.9, 2.0), Place::new(1.0, 4.9));
        let ends: Vec<Vec2> = path.iter().map(PathSegment::end).collect();
        assert_eq!(
            ends,
            vec![
                Vec2::new(2.0, -5.5),
                Vec2::new(5.5, -5.5),
                Vec2::new(5.5, 1.0),
            ]
        );
    }
}
