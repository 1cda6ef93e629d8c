//! Edge-crossing engine.
//!
//! Finds every place where one path segment passes through a closed, possibly
//! multi-loop boundary, ordered along the segment. In periodic (geographic)
//! space, longitude wraps: boundary edges are also tested at whole-turn
//! offsets so that a segment taking the short way across the seam meets the
//! edges it actually passes.

use std::f64::consts::TAU;

use foundation::bounds::Aabb2;
use foundation::math::{Vec2, stable_total_cmp_f64};

use crate::curve::{ARC_FLATTENING_STEP, Corners, Curve, intersect, loop_corners};
use crate::error::GeometryError;
use crate::frame::Frame;
use crate::path::{PathSegment, same_location, split_loops, validate_closed};

/// Where a segment passes through a boundary.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Crossing {
    /// Location on the boundary, in the boundary's own (unshifted) coordinates.
    pub point: Vec2,
    /// Position along the tested segment, in `[0, 1]`.
    pub segment_t: f64,
    pub loop_index: usize,
    pub edge_index: usize,
    /// Position along the boundary edge, in `[0, 1)`.
    pub edge_t: f64,
    /// True when the segment moves from outside to inside.
    pub entering: bool,
}

impl Crossing {
    /// Arc position along its boundary loop: edge index plus fraction.
    pub fn arc_position(&self) -> f64 {
        self.edge_index as f64 + self.edge_t
    }
}

/// A closed boundary made of one or more loops of curves.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    loops: Vec<Vec<Curve>>,
    corners: Vec<Vec<Corners>>,
    periodic: bool,
}

impl Boundary {
    fn new(loops: Vec<Vec<Curve>>, periodic: bool) -> Self {
        let corners = loops.iter().map(|curves| loop_corners(curves)).collect();
        Self {
            loops,
            corners,
            periodic,
        }
    }

    /// Builds a boundary from closed path loops.
    pub fn from_path(path: &[PathSegment], periodic: bool) -> Result<Self, GeometryError> {
        validate_closed(path, periodic)?;
        let mut loops = Vec::new();
        for path_loop in split_loops(path)? {
            let mut curves = Vec::with_capacity(path_loop.len());
            let mut cursor = path_loop[0].end();
            for segment in &path_loop[1..] {
                if let Some(curve) = Curve::from_segment(cursor, segment, periodic)? {
                    curves.push(curve);
                }
                cursor = segment.end();
            }
            loops.push(curves);
        }
        Ok(Self::new(loops, periodic))
    }

    pub fn from_frame(frame: &Frame, periodic: bool) -> Result<Self, GeometryError> {
        let loops = frame
            .loops()
            .iter()
            .map(|edges| {
                edges
                    .iter()
                    .map(|edge| edge.to_curve(periodic))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(loops, periodic))
    }

    /// The same boundary with arcs replaced by chords.
    pub fn flattened(&self) -> Self {
        let loops = self
            .loops
            .iter()
            .map(|curves| {
                curves
                    .iter()
                    .flat_map(|c| c.flatten(ARC_FLATTENING_STEP))
                    .collect()
            })
            .collect();
        Self::new(loops, self.periodic)
    }

    pub fn loops(&self) -> &[Vec<Curve>] {
        &self.loops
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn is_empty(&self) -> bool {
        self.loops.iter().all(Vec::is_empty)
    }

    pub fn bounds(&self) -> Option<Aabb2> {
        let mut out: Option<Aabb2> = None;
        for curve in self.loops.iter().flatten() {
            let b = curve.bounds();
            match out.as_mut() {
                None => out = Some(b),
                Some(acc) => {
                    acc.include(Vec2::new(b.min[0], b.min[1]));
                    acc.include(Vec2::new(b.max[0], b.max[1]));
                }
            }
        }
        out
    }

    /// Every crossing of `segment` with this boundary, ordered along the
    /// segment. Where two crossings share a position, exits come first.
    pub fn crossings(&self, segment: &Curve) -> Vec<Crossing> {
        let mut out = Vec::new();
        let seg_bounds = segment.bounds();
        for (loop_index, (curves, loop_ends)) in self.loops.iter().zip(&self.corners).enumerate() {
            for (edge_index, (edge, corners)) in curves.iter().zip(loop_ends).enumerate() {
                for shift in self.shifts_between(&seg_bounds, &edge.bounds()) {
                    let shifted = if shift == 0.0 {
                        *edge
                    } else {
                        edge.translated(shift)
                    };
                    for hit in intersect(segment, &shifted, corners) {
                        // A hit at an edge's far end belongs to the next edge.
                        let (edge_index, edge_t) = if hit.edge_t >= 1.0 {
                            ((edge_index + 1) % curves.len(), 0.0)
                        } else {
                            (edge_index, hit.edge_t)
                        };
                        out.push(Crossing {
                            point: Vec2::new(hit.point.x - shift, hit.point.y),
                            segment_t: hit.segment_t,
                            loop_index,
                            edge_index,
                            edge_t,
                            entering: hit.entering,
                        });
                    }
                }
            }
        }
        out.sort_by(|a, b| {
            stable_total_cmp_f64(a.segment_t, b.segment_t).then(a.entering.cmp(&b.entering))
        });
        // Seam corners can surface the same crossing from two shifted copies.
        out.dedup_by(|later, earlier| {
            later.segment_t == earlier.segment_t
                && later.entering == earlier.entering
                && same_location(later.point, earlier.point, self.periodic)
        });
        out
    }

    /// Whole-turn offsets at which `edge` may meet `segment`.
    fn shifts_between(&self, segment: &Aabb2, edge: &Aabb2) -> Vec<f64> {
        if !self.periodic {
            return vec![0.0];
        }
        let lo = ((segment.min[0] - edge.max[0]) / TAU - 1e-12).ceil() as i64;
        let hi = ((segment.max[0] - edge.min[0]) / TAU + 1e-12).floor() as i64;
        (lo.max(-4)..=hi.min(4)).map(|k| k as f64 * TAU).collect()
    }

    /// Whether `p` lies exactly on some edge.
    pub fn passes_through(&self, p: Vec2) -> bool {
        self.loops.iter().flatten().any(|curve| {
            self.point_shifts(p)
                .into_iter()
                .any(|shift| curve.passes_through(Vec2::new(p.x + shift, p.y)))
        })
    }

    /// Distance from `p` to the nearest edge.
    pub fn distance_to(&self, p: Vec2) -> f64 {
        let mut best = f64::INFINITY;
        for curve in self.loops.iter().flatten() {
            for shift in self.point_shifts(p) {
                best = best.min(curve.distance_to(Vec2::new(p.x + shift, p.y)));
            }
        }
        best
    }

    fn point_shifts(&self, _p: Vec2) -> Vec<f64> {
        if self.periodic {
            vec![0.0, -TAU, TAU]
        } else {
            vec![0.0]
        }
    }
}

/// Crossings of the segment that starts at `start` with `boundary`.
pub fn segment_crossings(
    start: Vec2,
    segment: &PathSegment,
    boundary: &Boundary,
) -> Result<Vec<Crossing>, GeometryError> {
    match Curve::from_segment(start, segment, boundary.is_periodic())? {
        Some(curve) => Ok(boundary.crossings(&curve)),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::polygon;
    use std::f64::consts::PI;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn square() -> Boundary {
        Boundary::from_path(
            &polygon(&[
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ]),
            false,
        )
        .unwrap()
    }

    #[test]
    fn crossings_are_ordered_and_tagged() {
        let hits = segment_crossings(
            Vec2::new(-1.0, 0.5),
            &PathSegment::LineTo(Vec2::new(2.0, 0.5)),
            &square(),
        )
        .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].entering);
        assert!(!hits[1].entering);
        assert_close(hits[0].point.x, 0.0, 0.0);
        assert_close(hits[1].point.x, 1.0, 0.0);
        assert_eq!(hits[0].edge_index, 3);
        assert_eq!(hits[1].edge_index, 1);
    }

    #[test]
    fn crossing_through_corner_is_reported_once() {
        let hits = segment_crossings(
            Vec2::new(-1.0, -1.0),
            &PathSegment::LineTo(Vec2::new(0.5, 0.5)),
            &square(),
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].entering);
        assert_eq!(hits[0].point, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn crossing_at_an_edge_end_is_reported_on_the_next_edge() {
        let hits = segment_crossings(
            Vec2::new(2.0, -0.5),
            &PathSegment::LineTo(Vec2::new(0.0, 0.5)),
            &square(),
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].entering);
        assert_eq!(hits[0].point, Vec2::new(1.0, 0.0));
        assert_eq!((hits[0].edge_index, hits[0].edge_t), (1, 0.0));
    }

    #[test]
    fn running_along_an_edge_is_not_a_crossing() {
        let hits = segment_crossings(
            Vec2::new(0.25, 0.0),
            &PathSegment::LineTo(Vec2::new(0.75, 0.0)),
            &square(),
        )
        .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn wrapped_segment_meets_both_seam_edges() {
        let frame = Frame::geographic(-PI, PI, -PI / 2.0, PI / 2.0);
        let boundary = Boundary::from_frame(&frame, true).unwrap();
        let hits = segment_crossings(
            Vec2::new(3.0, 0.1),
            &PathSegment::LineTo(Vec2::new(-3.0, 0.1)),
            &boundary,
        )
        .unwrap();
        assert_eq!(hits.len(), 2);
        // Leaves through the eastern meridian first, then re-enters from the west.
        assert!(!hits[0].entering);
        assert!(hits[1].entering);
        assert_close(hits[0].point.x, PI, 1e-12);
        assert_close(hits[1].point.x, -PI, 1e-12);
        assert_close(hits[0].segment_t, hits[1].segment_t, 1e-9);
    }

    #[test]
    fn unwrapped_segment_ignores_the_seam() {
        let frame = Frame::geographic(-PI, PI, -PI / 2.0, PI / 2.0);
        let boundary = Boundary::from_frame(&frame, true).unwrap();
        let hits = segment_crossings(
            Vec2::new(-1.0, 0.1),
            &PathSegment::LineTo(Vec2::new(1.0, 0.2)),
            &boundary,
        )
        .unwrap();
        assert!(hits.is_empty());
    }
}
