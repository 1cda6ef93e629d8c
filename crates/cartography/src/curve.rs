//! Parametric edge geometry shared by the crossing engine and containment.
//!
//! Every non-move [`PathSegment`] becomes a [`Curve`]: geographic lines,
//! meridians and parallels are straight in (λ, φ) parameter space, and planar
//! arcs are circular. Parameters run from 0 at the start to 1 at the end.

use std::f64::consts::{PI, TAU};

use foundation::bounds::Aabb2;
use foundation::math::{Vec2, unwrap_near};

use crate::error::GeometryError;
use crate::path::PathSegment;

/// Angular step used when arcs are replaced by chords.
pub const ARC_FLATTENING_STEP: f64 = PI / 36.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Curve {
    Line {
        start: Vec2,
        end: Vec2,
    },
    Arc {
        center: Vec2,
        radius: f64,
        start_angle: f64,
        /// Signed; positive is counter-clockwise.
        sweep_angle: f64,
        start: Vec2,
        end: Vec2,
    },
}

/// Unit tangents of the neighbouring boundary edges where they meet an edge.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub(crate) struct Corners {
    /// Direction of travel arriving at the edge's start.
    pub before: Vec2,
    /// Direction of travel along the edge itself.
    pub along: Vec2,
    /// Direction of travel leaving the edge's end.
    pub after: Vec2,
}

/// Corner tangents for every edge of a closed loop. Zero-length neighbours
/// are skipped. Translated copies of an edge must reuse these values so that
/// both edges meeting at a vertex see the same corner.
pub(crate) fn loop_corners(curves: &[Curve]) -> Vec<Corners> {
    let n = curves.len();
    (0..n)
        .map(|i| Corners {
            along: curves[i].unit_tangent(0.0),
            before: (1..=n)
                .map(|k| curves[(i + n - k) % n].unit_tangent(1.0))
                .find(|t| *t != Vec2::ZERO)
                .unwrap_or_default(),
            after: (1..=n)
                .map(|k| curves[(i + k) % n].unit_tangent(0.0))
                .find(|t| *t != Vec2::ZERO)
                .unwrap_or_default(),
        })
        .collect()
}

/// A transversal intersection between a tested curve and an edge curve.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Hit {
    pub segment_t: f64,
    pub edge_t: f64,
    pub point: Vec2,
    pub entering: bool,
}

impl Curve {
    /// Converts the segment that starts at `start` into a curve.
    ///
    /// Returns `Ok(None)` for `MoveTo`. In periodic (geographic) space a
    /// `LineTo` takes the short way round in `x`, a `MeridianTo` keeps the
    /// start's `x`, and a `ParallelTo` is taken literally so that it can span
    /// the full turn. Arcs only exist in planar space.
    pub fn from_segment(
        start: Vec2,
        segment: &PathSegment,
        periodic: bool,
    ) -> Result<Option<Self>, GeometryError> {
        let curve = match *segment {
            PathSegment::MoveTo(_) => return Ok(None),
            PathSegment::LineTo(end) => {
                let end = if periodic {
                    Vec2::new(unwrap_near(end.x, start.x), end.y)
                } else {
                    end
                };
                Curve::Line { start, end }
            }
            PathSegment::MeridianTo(end) => Curve::Line {
                start,
                end: Vec2::new(start.x, end.y),
            },
            PathSegment::ParallelTo(end) => Curve::Line {
                start,
                end: Vec2::new(end.x, start.y),
            },
            PathSegment::ArcTo {
                radius_x,
                radius_y,
                large_arc,
                sweep,
                end,
                ..
            } => {
                if periodic {
                    return Err(GeometryError::UnrecognizedSegment {
                        context: "geographic path",
                        segment: segment.describe(),
                    });
                }
                if (radius_x - radius_y).abs() > 1e-9 * radius_x.abs().max(1.0) {
                    return Err(GeometryError::UnrecognizedSegment {
                        context: "elliptical arc",
                        segment: segment.describe(),
                    });
                }
                Curve::arc_from_endpoints(start, end, radius_x.abs(), large_arc, sweep)
            }
        };
        Ok(Some(curve))
    }

    /// Center parameterization of an SVG endpoint arc with a circular radius.
    ///
    /// A radius too small to reach both endpoints is scaled up, as SVG does.
    pub fn arc_from_endpoints(
        start: Vec2,
        end: Vec2,
        radius: f64,
        large_arc: bool,
        sweep: bool,
    ) -> Self {
        let chord = end - start;
        let half = 0.5 * chord.length();
        if half == 0.0 || radius == 0.0 {
            return Curve::Line { start, end };
        }
        let radius = radius.max(half);
        let offset = (radius * radius - half * half).max(0.0).sqrt();
        let side = if sweep != large_arc { 1.0 } else { -1.0 };
        let normal = chord.perp() * (1.0 / chord.length());
        let center = start.midpoint(end) + normal * (offset * side);
        let start_angle = (start - center).angle();
        let end_angle = (end - center).angle();
        let sweep_angle = if sweep {
            (end_angle - start_angle).rem_euclid(TAU)
        } else {
            -(start_angle - end_angle).rem_euclid(TAU)
        };
        Curve::Arc {
            center,
            radius,
            start_angle,
            sweep_angle,
            start,
            end,
        }
    }

    pub fn start(&self) -> Vec2 {
        match *self {
            Curve::Line { start, .. } | Curve::Arc { start, .. } => start,
        }
    }

    pub fn end(&self) -> Vec2 {
        match *self {
            Curve::Line { end, .. } | Curve::Arc { end, .. } => end,
        }
    }

    pub fn point_at(&self, t: f64) -> Vec2 {
        match *self {
            Curve::Line { start, end } => {
                if t == 1.0 {
                    end
                } else {
                    start.lerp(end, t)
                }
            }
            Curve::Arc {
                center,
                radius,
                start_angle,
                sweep_angle,
                end,
                start,
            } => {
                if t == 0.0 {
                    start
                } else if t == 1.0 {
                    end
                } else {
                    center + Vec2::from_angle(start_angle + sweep_angle * t) * radius
                }
            }
        }
    }

    /// Direction of travel at `t` (not normalized).
    pub fn tangent_at(&self, t: f64) -> Vec2 {
        match *self {
            Curve::Line { start, end } => end - start,
            Curve::Arc {
                start_angle,
                sweep_angle,
                radius,
                ..
            } => Vec2::from_angle(start_angle + sweep_angle * t).perp() * (radius * sweep_angle),
        }
    }

    /// Normalized [`Curve::tangent_at`]; zero for a degenerate curve.
    pub fn unit_tangent(&self, t: f64) -> Vec2 {
        self.tangent_at(t).normalize().unwrap_or_default()
    }

    /// Parameter of a point known to lie on the curve's carrier line or circle.
    pub fn param_of(&self, p: Vec2) -> f64 {
        match *self {
            Curve::Line { start, end } => {
                let u = end - start;
                let len_sq = u.length_sq();
                if len_sq == 0.0 {
                    0.0
                } else {
                    (p - start).dot(u) / len_sq
                }
            }
            Curve::Arc {
                center,
                start_angle,
                sweep_angle,
                ..
            } => {
                if sweep_angle == 0.0 {
                    return 0.0;
                }
                let theta = (p - center).angle();
                let mut along = if sweep_angle > 0.0 {
                    (theta - start_angle).rem_euclid(TAU)
                } else {
                    (start_angle - theta).rem_euclid(TAU)
                };
                if along > TAU - 1e-12 {
                    along = 0.0;
                }
                along / sweep_angle.abs()
            }
        }
    }

    /// Signed angle swept between two parameters of an arc; zero for lines.
    pub fn sweep_between(&self, t0: f64, t1: f64) -> f64 {
        match *self {
            Curve::Line { .. } => 0.0,
            Curve::Arc { sweep_angle, .. } => sweep_angle * (t1 - t0),
        }
    }

    pub fn translated(&self, dx: f64) -> Self {
        let shift = Vec2::new(dx, 0.0);
        match *self {
            Curve::Line { start, end } => Curve::Line {
                start: start + shift,
                end: end + shift,
            },
            Curve::Arc {
                center,
                radius,
                start_angle,
                sweep_angle,
                start,
                end,
            } => Curve::Arc {
                center: center + shift,
                radius,
                start_angle,
                sweep_angle,
                start: start + shift,
                end: end + shift,
            },
        }
    }

    /// Conservative bounding box.
    pub fn bounds(&self) -> Aabb2 {
        match *self {
            Curve::Line { start, end } => Aabb2::new(
                [start.x.min(end.x), start.y.min(end.y)],
                [start.x.max(end.x), start.y.max(end.y)],
            ),
            Curve::Arc { center, radius, .. } => Aabb2::new(
                [center.x - radius, center.y - radius],
                [center.x + radius, center.y + radius],
            ),
        }
    }

    pub fn length(&self) -> f64 {
        match *self {
            Curve::Line { start, end } => start.distance(end),
            Curve::Arc {
                radius,
                sweep_angle,
                ..
            } => radius * sweep_angle.abs(),
        }
    }

    /// Replaces arcs by chords no longer than `max_step` radians each.
    pub fn flatten(&self, max_step: f64) -> Vec<Curve> {
        match *self {
            Curve::Line { .. } => vec![*self],
            Curve::Arc { sweep_angle, .. } => {
                let n = ((sweep_angle.abs() / max_step - 1e-9).ceil() as usize).max(1);
                let mut out = Vec::with_capacity(n);
                let mut prev = self.start();
                for i in 1..=n {
                    let next = self.point_at(i as f64 / n as f64);
                    out.push(Curve::Line {
                        start: prev,
                        end: next,
                    });
                    prev = next;
                }
                out
            }
        }
    }

    pub fn distance_to(&self, p: Vec2) -> f64 {
        match *self {
            Curve::Line { start, end } => {
                let u = end - start;
                let len_sq = u.length_sq();
                if len_sq == 0.0 {
                    return start.distance(p);
                }
                let t = ((p - start).dot(u) / len_sq).clamp(0.0, 1.0);
                start.lerp(end, t).distance(p)
            }
            Curve::Arc { center, radius, .. } => {
                let t = self.param_of(p);
                if (0.0..=1.0).contains(&t) {
                    (center.distance(p) - radius).abs()
                } else {
                    self.start().distance(p).min(self.end().distance(p))
                }
            }
        }
    }

    /// Exact on-curve test for straight curves; arcs use a relative tolerance.
    pub fn passes_through(&self, p: Vec2) -> bool {
        match *self {
            Curve::Line { start, end } => {
                let u = end - start;
                if u.cross(p - start) != 0.0 {
                    return false;
                }
                let lo_x = start.x.min(end.x);
                let hi_x = start.x.max(end.x);
                let lo_y = start.y.min(end.y);
                let hi_y = start.y.max(end.y);
                p.x >= lo_x && p.x <= hi_x && p.y >= lo_y && p.y <= hi_y
            }
            Curve::Arc { radius, .. } => self.distance_to(p) <= 1e-12 * radius.max(1.0),
        }
    }
}

/// Transversal intersections of `segment` with `edge`.
///
/// Straight pairs are decided against the boundary shrunk inward by an
/// infinitesimal amount, one consistent perturbation for every edge of a
/// loop: a point on an edge's carrier line counts as outside it, and a
/// boundary vertex on the segment's carrier line sits on the side its
/// inward corner offset points to. `corners` supplies the neighbouring edge
/// tangents that offset depends on. A crossing through a shared vertex
/// therefore counts once, a run along an edge counts nothing, and leaving
/// such a run through a corner is seen on the adjacent edge.
///
/// Pairs involving an arc use half-open parameter ranges instead
/// (`segment_t` in `(0, 1]`, `edge_t` in `[0, 1)`) and skip tangencies.
pub(crate) fn intersect(segment: &Curve, edge: &Curve, corners: &Corners) -> Vec<Hit> {
    if !segment.bounds().intersects(&edge.bounds()) {
        return Vec::new();
    }
    match (segment, edge) {
        (Curve::Line { start: a, end: b }, Curve::Line { start: c, end: d }) => {
            intersect_lines(*a, *b, *c, *d, corners)
                .into_iter()
                .collect()
        }
        _ => intersect_with_arcs(segment, edge),
    }
}

/// Side of a shrunk boundary vertex relative to a segment's carrier line.
/// `cross` is the unperturbed orientation; `incoming` and `outgoing` are the
/// unit tangents meeting at the vertex.
fn vertex_on_left(cross: f64, seg_dir: Vec2, incoming: Vec2, outgoing: Vec2) -> bool {
    if cross != 0.0 {
        return cross > 0.0;
    }
    seg_dir.dot(incoming + outgoing) >= 0.0
}

fn intersect_lines(
    a: Vec2,
    b: Vec2,
    c: Vec2,
    d: Vec2,
    corners: &Corners,
) -> Option<Hit> {
    let seg_dir = b - a;
    let edge_dir = d - c;
    let sa = edge_dir.cross(a - c);
    let sb = edge_dir.cross(b - c);
    if (sa > 0.0) == (sb > 0.0) {
        return None;
    }
    let sc = seg_dir.cross(c - a);
    let sd = seg_dir.cross(d - a);
    let c_left = vertex_on_left(sc, seg_dir, corners.before, corners.along);
    let d_left = vertex_on_left(sd, seg_dir, corners.along, corners.after);
    if c_left == d_left {
        return None;
    }
    let segment_t = if sa == 0.0 { 0.0 } else { sa / (sa - sb) };
    let edge_t = if sc == 0.0 { 0.0 } else { sc / (sc - sd) };
    let point = if sa == 0.0 {
        a
    } else if sb == 0.0 {
        b
    } else if sc == 0.0 {
        c
    } else if sd == 0.0 {
        d
    } else {
        c + edge_dir * edge_t
    };
    Some(Hit {
        segment_t,
        edge_t,
        point,
        entering: sa <= 0.0,
    })
}

fn intersect_with_arcs(segment: &Curve, edge: &Curve) -> Vec<Hit> {
    let candidates = match (segment, edge) {
        (Curve::Line { start, end }, Curve::Arc { center, radius, .. })
        | (Curve::Arc { center, radius, .. }, Curve::Line { start, end }) => {
            line_circle(*start, *end, *center, *radius)
        }
        (
            Curve::Arc {
                center: c1,
                radius: r1,
                ..
            },
            Curve::Arc {
                center: c2,
                radius: r2,
                ..
            },
        ) => circle_circle(*c1, *r1, *c2, *r2),
        (Curve::Line { .. }, Curve::Line { .. }) => Vec::new(),
    };

    let mut hits = Vec::new();
    for point in candidates {
        let segment_t = segment.param_of(point);
        let edge_t = edge.param_of(point);
        if !(segment_t > 0.0 && segment_t <= 1.0 && (0.0..1.0).contains(&edge_t)) {
            continue;
        }
        let inward = segment
            .tangent_at(segment_t)
            .dot(edge.tangent_at(edge_t).perp());
        if inward == 0.0 {
            continue;
        }
        hits.push(Hit {
            segment_t,
            edge_t,
            point,
            entering: inward > 0.0,
        });
    }
    hits
}

fn line_circle(a: Vec2, b: Vec2, center: Vec2, radius: f64) -> Vec<Vec2> {
    let u = b - a;
    let f = a - center;
    let qa = u.dot(u);
    if qa == 0.0 {
        return Vec::new();
    }
    let qb = 2.0 * f.dot(u);
    let qc = f.dot(f) - radius * radius;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc <= 0.0 {
        return Vec::new();
    }
    let root = disc.sqrt();
    [(-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)]
        .into_iter()
        .map(|t| a + u * t)
        .collect()
}

fn circle_circle(c1: Vec2, r1: f64, c2: Vec2, r2: f64) -> Vec<Vec2> {
    let between = c2 - c1;
    let d = between.length();
    if d == 0.0 || d > r1 + r2 || d < (r1 - r2).abs() {
        return Vec::new();
    }
    let along = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h_sq = r1 * r1 - along * along;
    if h_sq <= 0.0 {
        return Vec::new();
    }
    let h = h_sq.sqrt();
    let base = c1 + between * (along / d);
    let offset = between.perp() * (h / d);
    vec![base - offset, base + offset]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn line(ax: f64, ay: f64, bx: f64, by: f64) -> Curve {
        Curve::Line {
            start: Vec2::new(ax, ay),
            end: Vec2::new(bx, by),
        }
    }

    #[test]
    fn straight_crossing_reports_both_parameters() {
        let hits = intersect(
            &line(0.0, -1.0, 0.0, 1.0),
            &line(-1.0, 0.0, 1.0, 0.0),
            &Corners::default(),
        );
        assert_eq!(hits.len(), 1);
        assert_close(hits[0].segment_t, 0.5, 1e-15);
        assert_close(hits[0].edge_t, 0.5, 1e-15);
        // Moving from y<0 (right of a +x edge) to y>0 (its left) enters.
        assert!(hits[0].entering);
    }

    fn hits_on_loop(segment: &Curve, edges: &[Curve]) -> Vec<Hit> {
        edges
            .iter()
            .zip(loop_corners(edges))
            .flat_map(|(edge, corners)| intersect(segment, edge, &corners))
            .collect()
    }

    fn square() -> Vec<Curve> {
        vec![
            line(0.0, 0.0, 10.0, 0.0),
            line(10.0, 0.0, 10.0, 10.0),
            line(10.0, 10.0, 0.0, 10.0),
            line(0.0, 10.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn crossing_through_shared_vertex_counts_once() {
        let seg = line(0.0, -1.0, 0.0, 1.0);
        let edges = [line(-1.0, 0.0, 0.0, 0.0), line(0.0, 0.0, 1.0, 0.0)];
        assert_eq!(hits_on_loop(&seg, &edges).len(), 1);
    }

    #[test]
    fn touch_at_convex_corner_is_not_a_crossing() {
        // Corner at the origin, segment grazing it from below.
        let seg = line(-1.0, -1.0, 1.0, 1.0);
        let edges = [line(-1.0, 1.0, 0.0, 0.0), line(0.0, 0.0, 1.0, 2.0)];
        assert_eq!(hits_on_loop(&seg, &edges).len() % 2, 0);
    }

    #[test]
    fn collinear_overlap_contributes_nothing() {
        let hits = intersect(
            &line(0.0, 0.0, 2.0, 0.0),
            &line(1.0, 0.0, 3.0, 0.0),
            &Corners::default(),
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn run_along_an_edge_lies_outside() {
        let edges = square();
        // Down onto the bottom edge: leaves at the touch point.
        let hits = hits_on_loop(&line(8.0, 4.0, 8.0, 0.0), &edges);
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].entering);
        assert_eq!(hits[0].point, Vec2::new(8.0, 0.0));
        assert_close(hits[0].segment_t, 1.0, 0.0);
        // Along the edge and out past the corner: nothing.
        assert!(hits_on_loop(&line(8.0, 0.0, 12.0, 0.0), &edges).is_empty());
        assert!(hits_on_loop(&line(12.0, 0.0, 12.0, 4.0), &edges).is_empty());
        // Back in through the right edge.
        let hits = hits_on_loop(&line(12.0, 4.0, 8.0, 4.0), &edges);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].entering);
        assert_close(hits[0].point.x, 10.0, 1e-12);
        assert_close(hits[0].edge_t, 0.4, 1e-12);
    }

    #[test]
    fn leaving_a_corner_along_the_next_edge_is_not_a_crossing() {
        let edges = square();
        let hits = hits_on_loop(&line(10.0, -5.0, 10.0, 5.0), &edges);
        assert!(hits.is_empty());
        let hits = hits_on_loop(&line(5.0, 0.0, 5.0, -5.0), &edges);
        assert!(hits.is_empty());
    }

    #[test]
    fn arc_from_endpoints_recovers_quarter_circle() {
        let arc = Curve::arc_from_endpoints(
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            1.0,
            false,
            true,
        );
        let Curve::Arc {
            center,
            sweep_angle,
            ..
        } = arc
        else {
            panic!("expected an arc");
        };
        assert_close(center.x, 0.0, 1e-12);
        assert_close(center.y, 0.0, 1e-12);
        assert_close(sweep_angle, PI / 2.0, 1e-12);
        let mid = arc.point_at(0.5);
        assert_close(mid.x, (PI / 4.0).cos(), 1e-12);
    }

    #[test]
    fn line_crosses_arc_once() {
        let arc = Curve::arc_from_endpoints(
            Vec2::new(1.0, 0.0),
            Vec2::new(-1.0, 0.0),
            1.0,
            false,
            true,
        );
        let hits = intersect(&line(0.0, 0.0, 0.0, 2.0), &arc, &Corners::default());
        assert_eq!(hits.len(), 1);
        assert_close(hits[0].point.y, 1.0, 1e-12);
        assert_close(hits[0].edge_t, 0.5, 1e-12);
        // Counter-clockwise arc has its center on the left: leaving it exits.
        assert!(!hits[0].entering);
    }

    #[test]
    fn flattening_keeps_endpoints() {
        let arc = Curve::arc_from_endpoints(
            Vec2::new(1.0, 0.0),
            Vec2::new(-1.0, 0.0),
            1.0,
            false,
            true,
        );
        let chords = arc.flatten(ARC_FLATTENING_STEP);
        assert_eq!(chords.len(), 36);
        assert_eq!(chords[0].start(), arc.start());
        assert_eq!(chords[35].end(), arc.end());
    }
}
