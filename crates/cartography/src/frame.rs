use foundation::math::Vec2;

use crate::curve::Curve;
use crate::error::GeometryError;
use crate::path::{PathSegment, same_location, split_loops};

/// How a frame edge travels between its endpoints.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum EdgeKind {
    Line,
    Meridian,
    Parallel,
    Arc {
        radius: f64,
        large_arc: bool,
        sweep: bool,
    },
}

/// One directed edge of the visible map frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameEdge {
    pub kind: EdgeKind,
    pub start: Vec2,
    pub end: Vec2,
}

impl FrameEdge {
    pub fn new(kind: EdgeKind, start: Vec2, end: Vec2) -> Self {
        Self { kind, start, end }
    }

    /// The path segment that draws this edge from `start`.
    pub fn to_segment(&self) -> PathSegment {
        let large_arc = match self.kind {
            EdgeKind::Arc { large_arc, .. } => large_arc,
            _ => false,
        };
        self.segment_to(self.end, large_arc)
    }

    pub fn to_curve(&self, periodic: bool) -> Result<Curve, GeometryError> {
        Curve::from_segment(self.start, &self.to_segment(), periodic)?.ok_or_else(|| {
            GeometryError::DegenerateGeometry("frame edge produced no curve".to_string())
        })
    }

    /// Segment along this edge ending at `end`. For arcs the caller supplies
    /// whether the covered part spans more than half a turn.
    pub(crate) fn segment_to(&self, end: Vec2, large_arc: bool) -> PathSegment {
        match self.kind {
            EdgeKind::Line => PathSegment::LineTo(end),
            EdgeKind::Meridian => PathSegment::MeridianTo(end),
            EdgeKind::Parallel => PathSegment::ParallelTo(end),
            EdgeKind::Arc { radius, sweep, .. } => PathSegment::ArcTo {
                radius_x: radius,
                radius_y: radius,
                rotation: 0.0,
                large_arc,
                sweep,
                end,
            },
        }
    }
}

/// The visible boundary of a map: one or more closed loops of edges, each
/// with the visible area on its left.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    loops: Vec<Vec<FrameEdge>>,
}

impl Frame {
    /// Builds a frame, checking that every loop is closed and non-empty.
    pub fn new(loops: Vec<Vec<FrameEdge>>, periodic: bool) -> Result<Self, GeometryError> {
        for (loop_index, edges) in loops.iter().enumerate() {
            let (Some(first), Some(last)) = (edges.first(), edges.last()) else {
                return Err(GeometryError::OpenFrame { loop_index });
            };
            let chained = edges
                .windows(2)
                .all(|w| same_location(w[0].end, w[1].start, periodic));
            if !chained || !same_location(last.end, first.start, periodic) {
                return Err(GeometryError::OpenFrame { loop_index });
            }
        }
        Ok(Self { loops })
    }

    /// Axis-aligned planar rectangle, counter-clockwise from `min`.
    pub fn rectangle(min: Vec2, max: Vec2) -> Self {
        let corners = [
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ];
        let edges = (0..4)
            .map(|i| FrameEdge::new(EdgeKind::Line, corners[i], corners[(i + 1) % 4]))
            .collect();
        Self { loops: vec![edges] }
    }

    /// Parameter-space rectangle bounded by two parallels and two meridians,
    /// counter-clockwise in (λ, φ).
    pub fn geographic(lambda_min: f64, lambda_max: f64, phi_min: f64, phi_max: f64) -> Self {
        let sw = Vec2::new(lambda_min, phi_min);
        let se = Vec2::new(lambda_max, phi_min);
        let ne = Vec2::new(lambda_max, phi_max);
        let nw = Vec2::new(lambda_min, phi_max);
        Self {
            loops: vec![vec![
                FrameEdge::new(EdgeKind::Parallel, sw, se),
                FrameEdge::new(EdgeKind::Meridian, se, ne),
                FrameEdge::new(EdgeKind::Parallel, ne, nw),
                FrameEdge::new(EdgeKind::Meridian, nw, sw),
            ]],
        }
    }

    /// Reads frame loops from a segment list.
    pub fn from_path(path: &[PathSegment], periodic: bool) -> Result<Self, GeometryError> {
        let mut loops = Vec::new();
        for path_loop in split_loops(path)? {
            let mut edges = Vec::with_capacity(path_loop.len().saturating_sub(1));
            let mut cursor = path_loop[0].end();
            for segment in &path_loop[1..] {
                let kind = match *segment {
                    PathSegment::LineTo(_) => EdgeKind::Line,
                    PathSegment::MeridianTo(_) => EdgeKind::Meridian,
                    PathSegment::ParallelTo(_) => EdgeKind::Parallel,
                    PathSegment::ArcTo {
                        radius_x,
                        large_arc,
                        sweep,
                        ..
                    } => EdgeKind::Arc {
                        radius: radius_x,
                        large_arc,
                        sweep,
                    },
                    PathSegment::MoveTo(_) => {
                        return Err(GeometryError::UnrecognizedSegment {
                            context: "frame loop",
                            segment: segment.describe(),
                        });
                    }
                };
                edges.push(FrameEdge::new(kind, cursor, segment.end()));
                cursor = segment.end();
            }
            loops.push(edges);
        }
        Self::new(loops, periodic)
    }

    pub fn to_path(&self) -> Vec<PathSegment> {
        let mut out = Vec::new();
        for edges in &self.loops {
            let Some(first) = edges.first() else {
                continue;
            };
            out.push(PathSegment::MoveTo(first.start));
            out.extend(edges.iter().map(FrameEdge::to_segment));
        }
        out
    }

    pub fn loops(&self) -> &[Vec<FrameEdge>] {
        &self.loops
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::polygon;
    use pretty_assertions::assert_eq;

    #[test]
    fn path_round_trip_keeps_edge_kinds() {
        let frame = Frame::geographic(-1.0, 1.0, -0.5, 0.5);
        let back = Frame::from_path(&frame.to_path(), true).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn open_frame_is_rejected() {
        let mut path = polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
        ]);
        path.pop();
        assert_eq!(
            Frame::from_path(&path, false),
            Err(GeometryError::OpenFrame { loop_index: 0 })
        );
        assert_eq!(
            Frame::new(vec![Vec::new()], false),
            Err(GeometryError::OpenFrame { loop_index: 0 })
        );
    }

    #[test]
    fn rectangle_is_counter_clockwise() {
        let frame = Frame::rectangle(Vec2::new(0.0, 0.0), Vec2::new(2.0, 1.0));
        let edges = &frame.loops()[0];
        let mut twice_area = 0.0;
        for e in edges {
            twice_area += e.start.cross(e.end);
        }
        assert_eq!(twice_area, 4.0);
    }
}
