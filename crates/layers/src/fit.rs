use std::f64::consts::PI;

use foundation::math::{Vec2, wrap_angle};

use crate::polygon::LabelPolygon;

/// Spines whose points stray less than this fraction of their extent from
/// their principal line are treated as straight.
const STRAIGHT_TOLERANCE: f64 = 1e-3;
/// Circles flatter than this many spine extents are treated as straight.
const MAX_RADIUS_RATIO: f64 = 50.0;
const BISECTION_STEPS: usize = 48;
/// Angular length of the chords a polygon edge is cut into before it is
/// re-expressed around a circular axis.
const CHORD_ANGLE: f64 = 0.05;

/// The baseline a label is laid along.
///
/// Local coordinates `(u, v)`: `u` is arc length along the axis (counter-
/// clockwise for circles), `v` is the offset to its left.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Axis {
    Line {
        origin: Vec2,
        /// Unit length.
        direction: Vec2,
    },
    Circle {
        center: Vec2,
        radius: f64,
        /// Angle at which `u = 0`.
        reference: f64,
    },
}

impl Axis {
    /// Axes worth trying along spine points: the total-least-squares line,
    /// plus a Kåsa circle when it follows the points more closely.
    pub fn candidates(points: &[Vec2]) -> Vec<Axis> {
        let Some(line) = Axis::line_through(points) else {
            return Vec::new();
        };
        let mut out = vec![line];
        if let Some(circle) = Axis::circle_through(points)
            && circle.residual(points) < line.residual(points)
        {
            out.push(circle);
        }
        out
    }

    /// Principal line through the points.
    pub fn line_through(points: &[Vec2]) -> Option<Axis> {
        let first = *points.first()?;
        let (mean, sxx, sxy, syy) = moments(points);
        if sxx + syy == 0.0 {
            return Some(Axis::Line {
                origin: first,
                direction: Vec2::new(1.0, 0.0),
            });
        }
        Some(Axis::Line {
            origin: mean,
            direction: Vec2::from_angle(0.5 * (2.0 * sxy).atan2(sxx - syy)),
        })
    }

    /// Kåsa least-squares circle through the points. `None` when they are
    /// (nearly) collinear or the circle is too flat to differ from a line.
    pub fn circle_through(points: &[Vec2]) -> Option<Axis> {
        if points.len() < 3 {
            return None;
        }
        let (mean, sxx, sxy, syy) = moments(points);
        let direction = Vec2::from_angle(0.5 * (2.0 * sxy).atan2(sxx - syy));
        let extent = 2.0
            * points
                .iter()
                .map(|&p| (p - mean).dot(direction).abs())
                .fold(0.0, f64::max);
        let deviation = points
            .iter()
            .map(|&p| direction.cross(p - mean).abs())
            .fold(0.0, f64::max);
        if extent == 0.0 || deviation <= STRAIGHT_TOLERANCE * extent {
            return None;
        }

        // Centered Kåsa normal equations; the sums of x and y vanish.
        let (mut sxz, mut syz, mut sz) = (0.0, 0.0, 0.0);
        for &p in points {
            let d = p - mean;
            let z = d.length_sq();
            sxz += d.x * z;
            syz += d.y * z;
            sz += z;
        }
        let det = sxx * syy - sxy * sxy;
        if det.abs() <= 1e-12 * (sxx + syy) * (sxx + syy) {
            return None;
        }
        let d = (-sxz * syy + syz * sxy) / det;
        let e = (-syz * sxx + sxz * sxy) / det;
        let f = -sz / points.len() as f64;
        let r2 = 0.25 * (d * d + e * e) - f;
        if r2 <= 0.0 {
            return None;
        }
        let radius = r2.sqrt();
        if radius > MAX_RADIUS_RATIO * extent {
            return None;
        }
        let center = mean + Vec2::new(-0.5 * d, -0.5 * e);
        Some(Axis::Circle {
            center,
            radius,
            reference: (mean - center).angle(),
        })
    }

    /// Root-mean-square offset of the points from the axis.
    pub fn residual(&self, points: &[Vec2]) -> f64 {
        if points.is_empty() {
            return 0.0;
        }
        let sum: f64 = points.iter().map(|&p| self.to_local(p).y.powi(2)).sum();
        (sum / points.len() as f64).sqrt()
    }

    /// Moves the axis into the middle of the polygon around `spine`.
    ///
    /// A line is re-aimed through the cross-section midpoints at the spine's
    /// quarter points; a circle keeps its center and takes the radius of the
    /// midpoint at the spine's middle. Returns the moved axis and the `u` of
    /// the middle spine point.
    pub fn centered(self, polygon: &LabelPolygon, spine: &[Vec2]) -> (Axis, f64) {
        let n = spine.len();
        let Some(&mid) = spine.get(n / 2) else {
            return (self, 0.0);
        };
        if let Axis::Line { direction, .. } = self
            && let (Some(a), Some(b)) = (
                self.section_midpoint(polygon, spine[n / 4]),
                self.section_midpoint(polygon, spine[3 * n / 4]),
            )
            && let Some(along) = (b - a).normalize()
        {
            let axis = Axis::Line {
                origin: a,
                direction: if along.dot(direction) < 0.0 { -along } else { along },
            };
            return (axis, axis.to_local(mid).x);
        }
        let u = self.to_local(mid).x;
        let Some(shift) = self.section_shift(polygon, u) else {
            return (self, u);
        };
        match self {
            Axis::Line { direction, .. } => (
                Axis::Line {
                    origin: self.to_world(u, shift),
                    direction,
                },
                0.0,
            ),
            Axis::Circle {
                center,
                radius,
                reference,
            } if shift < radius => (
                Axis::Circle {
                    center,
                    radius: radius - shift,
                    reference,
                },
                u * (radius - shift) / radius,
            ),
            Axis::Circle { .. } => (self, u),
        }
    }

    /// Offset across the axis at `u` to the middle of the polygon's
    /// cross-section there.
    fn section_shift(&self, polygon: &LabelPolygon, u: f64) -> Option<f64> {
        let foot = self.to_world(u, 0.0);
        if !polygon.contains(foot) {
            return None;
        }
        let normal = self.to_world(u, 1.0) - foot;
        let left = ray_exit(polygon, foot, normal)?;
        let right = ray_exit(polygon, foot, -normal)?;
        Some(0.5 * (left - right))
    }

    fn section_midpoint(&self, polygon: &LabelPolygon, p: Vec2) -> Option<Vec2> {
        let u = self.to_local(p).x;
        Some(self.to_world(u, self.section_shift(polygon, u)?))
    }

    pub fn radius(&self) -> f64 {
        match *self {
            Axis::Line { .. } => f64::INFINITY,
            Axis::Circle { radius, .. } => radius,
        }
    }

    pub fn to_local(&self, p: Vec2) -> Vec2 {
        match *self {
            Axis::Line { origin, direction } => {
                let d = p - origin;
                Vec2::new(d.dot(direction), direction.cross(d))
            }
            Axis::Circle {
                center,
                radius,
                reference,
            } => {
                let d = p - center;
                Vec2::new(radius * wrap_angle(d.angle() - reference), radius - d.length())
            }
        }
    }

    pub fn to_world(&self, u: f64, v: f64) -> Vec2 {
        match *self {
            Axis::Line { origin, direction } => origin + direction * u + direction.perp() * v,
            Axis::Circle {
                center,
                radius,
                reference,
            } => center + Vec2::from_angle(reference + u / radius) * (radius - v),
        }
    }

    /// Unit direction of increasing `u`.
    pub fn tangent(&self, u: f64) -> Vec2 {
        match *self {
            Axis::Line { direction, .. } => direction,
            Axis::Circle {
                radius, reference, ..
            } => Vec2::from_angle(reference + u / radius).perp(),
        }
    }
}

/// A label band: `u_center ± width / 2` along the axis, `± half_height`
/// across it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Band {
    pub u_center: f64,
    pub half_height: f64,
    pub width: f64,
}

/// The polygon boundary re-expressed in an axis' local coordinates.
pub struct BandFitter<'a> {
    axis: Axis,
    polygon: &'a LabelPolygon,
    pieces: Vec<(Vec2, Vec2)>,
    domain: (f64, f64),
}

impl<'a> BandFitter<'a> {
    pub fn new(axis: Axis, polygon: &'a LabelPolygon) -> Self {
        let mut pieces = Vec::new();
        match axis {
            Axis::Line { .. } => {
                pieces.extend(polygon.edges().map(|(a, b)| (axis.to_local(a), axis.to_local(b))));
            }
            Axis::Circle { radius, .. } => {
                let chord = radius * CHORD_ANGLE;
                for (a, b) in polygon.edges() {
                    let steps = ((a.distance(b) / chord).ceil() as usize).clamp(1, 64);
                    let mut prev = axis.to_local(a);
                    for k in 1..=steps {
                        let next = axis.to_local(a.lerp(b, k as f64 / steps as f64));
                        // Pieces behind the center straddle the angular cut.
                        if (next.x - prev.x).abs() < PI * radius {
                            pieces.push((prev, next));
                        }
                        prev = next;
                    }
                }
            }
        }
        let domain = match axis {
            Axis::Line { .. } => pieces.iter().flat_map(|&(a, b)| [a.x, b.x]).fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), u| (lo.min(u), hi.max(u)),
            ),
            Axis::Circle { radius, .. } => (-PI * radius, PI * radius),
        };
        Self {
            axis,
            polygon,
            pieces,
            domain,
        }
    }

    /// Stretches of the axis over which a band of half-height `h` meets no
    /// boundary piece. The set only erodes as `h` grows.
    pub fn free_intervals(&self, h: f64) -> Vec<(f64, f64)> {
        let mut blocked: Vec<(f64, f64)> = self
            .pieces
            .iter()
            .filter_map(|&(a, b)| slab_shadow(a, b, h))
            .collect();
        blocked.sort_by(|x, y| x.0.total_cmp(&y.0));
        let (start, end) = self.domain;
        let mut free = Vec::new();
        let mut cursor = start;
        for (lo, hi) in blocked {
            if lo > cursor {
                free.push((cursor, lo.min(end)));
            }
            cursor = cursor.max(hi);
            if cursor >= end {
                break;
            }
        }
        if cursor < end {
            free.push((cursor, end));
        }
        free.retain(|&(a, b)| b > a);
        free
    }

    /// A free interval long enough for `width` whose middle lies inside the
    /// polygon, preferring the one containing `u_hint`, then the longest.
    fn admissible(&self, h: f64, width: f64, u_hint: f64) -> Option<(f64, f64)> {
        if let Axis::Circle { radius, .. } = self.axis
            && (width > PI * radius || h >= radius)
        {
            return None;
        }
        let mut best: Option<(f64, f64)> = None;
        for (a, b) in self.free_intervals(h) {
            if b - a < width || !self.polygon.contains(self.axis.to_world(0.5 * (a + b), 0.0)) {
                continue;
            }
            if a <= u_hint && u_hint <= b {
                return Some((a, b));
            }
            if best.is_none_or(|(x, y)| b - a > y - x) {
                best = Some((a, b));
            }
        }
        best
    }

    /// Tallest band whose width is `width_per_height` times its half-height,
    /// searched by bisection up to `h_max`.
    pub fn fit(&self, width_per_height: f64, h_max: f64, u_hint: f64) -> Option<Band> {
        let (mut lo, mut hi) = (0.0, h_max);
        let mut best = None;
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            match self.admissible(mid, width_per_height * mid, u_hint) {
                Some(interval) => {
                    lo = mid;
                    best = Some((mid, interval));
                }
                None => hi = mid,
            }
        }
        let (h, (a, b)) = best?;
        let width = width_per_height * h;
        Some(Band {
            u_center: u_hint.max(a + 0.5 * width).min(b - 0.5 * width),
            half_height: h,
            width,
        })
    }
}

fn moments(points: &[Vec2]) -> (Vec2, f64, f64, f64) {
    let n = points.len().max(1) as f64;
    let mean = points.iter().fold(Vec2::ZERO, |acc, &p| acc + p) * (1.0 / n);
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &p in points {
        let d = p - mean;
        sxx += d.x * d.x;
        sxy += d.x * d.y;
        syy += d.y * d.y;
    }
    (mean, sxx, sxy, syy)
}

/// Distance from `p` along `direction` to the nearest polygon edge.
fn ray_exit(polygon: &LabelPolygon, p: Vec2, direction: Vec2) -> Option<f64> {
    polygon
        .edges()
        .filter_map(|(a, b)| {
            let edge = b - a;
            let denom = direction.cross(edge);
            if denom == 0.0 {
                return None;
            }
            let w = a - p;
            let t = w.cross(edge) / denom;
            let s = w.cross(direction) / denom;
            (t > 0.0 && (0.0..=1.0).contains(&s)).then_some(t)
        })
        .min_by(f64::total_cmp)
}

/// The `u` range a local-coordinate piece covers inside `|v| <= h`.
fn slab_shadow(a: Vec2, b: Vec2, h: f64) -> Option<(f64, f64)> {
    let dv = b.y - a.y;
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    if dv == 0.0 {
        if a.y.abs() > h {
            return None;
        }
    } else {
        let ta = (-h - a.y) / dv;
        let tb = (h - a.y) / dv;
        t0 = t0.max(ta.min(tb));
        t1 = t1.min(ta.max(tb));
        if t0 > t1 {
            return None;
        }
    }
    let ua = a.x + (b.x - a.x) * t0;
    let ub = a.x + (b.x - a.x) * t1;
    Some((ua.min(ub), ua.max(ub)))
}
