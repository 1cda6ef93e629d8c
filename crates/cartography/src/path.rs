use foundation::math::{Vec2, same_longitude};

use crate::curve::Curve;
use crate::error::GeometryError;

/// One command of a path.
///
/// A sequence of segments describes one or more loops; every `MoveTo` starts
/// a new one. `MeridianTo` and `ParallelTo` only have meaning in geographic
/// space, where they follow a line of constant λ or constant φ to the endpoint.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PathSegment {
    MoveTo(Vec2),
    LineTo(Vec2),
    /// SVG-style elliptical arc. `sweep` is the positive-angle (counter-clockwise)
    /// direction in a y-up plane; `rotation` is in radians.
    ArcTo {
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        large_arc: bool,
        sweep: bool,
        end: Vec2,
    },
    MeridianTo(Vec2),
    ParallelTo(Vec2),
}

impl PathSegment {
    pub fn end(&self) -> Vec2 {
        match *self {
            PathSegment::MoveTo(p)
            | PathSegment::LineTo(p)
            | PathSegment::MeridianTo(p)
            | PathSegment::ParallelTo(p) => p,
            PathSegment::ArcTo { end, .. } => end,
        }
    }

    /// The same kind of segment, ending somewhere else.
    pub fn with_end(&self, end: Vec2) -> Self {
        match *self {
            PathSegment::MoveTo(_) => PathSegment::MoveTo(end),
            PathSegment::LineTo(_) => PathSegment::LineTo(end),
            PathSegment::MeridianTo(_) => PathSegment::MeridianTo(end),
            PathSegment::ParallelTo(_) => PathSegment::ParallelTo(end),
            PathSegment::ArcTo {
                radius_x,
                radius_y,
                rotation,
                large_arc,
                sweep,
                ..
            } => PathSegment::ArcTo {
                radius_x,
                radius_y,
                rotation,
                large_arc,
                sweep,
                end,
            },
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, PathSegment::MoveTo(_))
    }

    /// Short command letter, as used in SVG where one exists.
    pub fn tag(&self) -> &'static str {
        match self {
            PathSegment::MoveTo(_) => "M",
            PathSegment::LineTo(_) => "L",
            PathSegment::ArcTo { .. } => "A",
            PathSegment::MeridianTo(_) => "Φ",
            PathSegment::ParallelTo(_) => "Λ",
        }
    }

    pub(crate) fn describe(&self) -> String {
        let end = self.end();
        format!("{} {} {}", self.tag(), end.x, end.y)
    }
}

/// Tri-state answer of an inclusion test.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    In,
    Out,
    Borderline,
}

/// Whether two coordinates name the same location, treating `x` as periodic
/// longitude when `periodic` is set.
pub fn same_location(a: Vec2, b: Vec2, periodic: bool) -> bool {
    if periodic {
        a.y == b.y && same_longitude(a.x, b.x)
    } else {
        a == b
    }
}

/// Splits a path into its loops, each beginning with its `MoveTo`.
///
/// A path that does not start with `MoveTo` is malformed.
pub fn split_loops(path: &[PathSegment]) -> Result<Vec<&[PathSegment]>, GeometryError> {
    let mut loops = Vec::new();
    let mut start: Option<usize> = None;
    for (i, segment) in path.iter().enumerate() {
        if segment.is_move() {
            if let Some(s) = start {
                loops.push(&path[s..i]);
            }
            start = Some(i);
        } else if start.is_none() {
            return Err(GeometryError::UnrecognizedSegment {
                context: "path start",
                segment: segment.describe(),
            });
        }
    }
    if let Some(s) = start {
        loops.push(&path[s..]);
    }
    Ok(loops)
}

/// Whether a loop (starting with `MoveTo`) returns to where it began.
pub fn is_closed(path_loop: &[PathSegment], periodic: bool) -> bool {
    match (path_loop.first(), path_loop.last()) {
        (Some(first), Some(last)) if path_loop.len() >= 2 => {
            same_location(first.end(), last.end(), periodic)
        }
        _ => false,
    }
}

/// Checks that every loop of `path` is closed and has some extent.
pub fn validate_closed(path: &[PathSegment], periodic: bool) -> Result<(), GeometryError> {
    for (loop_index, path_loop) in split_loops(path)?.into_iter().enumerate() {
        if path_loop.len() < 2 {
            return Err(GeometryError::DegenerateGeometry(format!(
                "loop {loop_index} has no segments"
            )));
        }
        if !is_closed(path_loop, periodic) {
            return Err(GeometryError::OpenRegion { loop_index });
        }
        if !has_extent(path_loop, periodic)? {
            return Err(GeometryError::DegenerateGeometry(format!(
                "loop {loop_index} has zero length"
            )));
        }
    }
    Ok(())
}

fn has_extent(path_loop: &[PathSegment], periodic: bool) -> Result<bool, GeometryError> {
    let mut cursor = path_loop[0].end();
    for segment in &path_loop[1..] {
        if let Some(curve) = Curve::from_segment(cursor, segment, periodic)? {
            if curve.bounds().extent() > 0.0 {
                return Ok(true);
            }
        }
        cursor = segment.end();
    }
    Ok(false)
}

/// Reverses the direction of every loop, turning solid area into holes and back.
pub fn reverse_loops(path: &[PathSegment]) -> Result<Vec<PathSegment>, GeometryError> {
    let mut out = Vec::with_capacity(path.len());
    for path_loop in split_loops(path)? {
        let Some(last) = path_loop.last() else {
            continue;
        };
        out.push(PathSegment::MoveTo(last.end()));
        for i in (1..path_loop.len()).rev() {
            let target = path_loop[i - 1].end();
            let reversed = match path_loop[i] {
                PathSegment::ArcTo {
                    radius_x,
                    radius_y,
                    rotation,
                    large_arc,
                    sweep,
                    ..
                } => PathSegment::ArcTo {
                    radius_x,
                    radius_y,
                    rotation,
                    large_arc,
                    sweep: !sweep,
                    end: target,
                },
                other => other.with_end(target),
            };
            out.push(reversed);
        }
    }
    Ok(out)
}

/// Builds a closed polygon loop from vertices (the first vertex is repeated at the end).
pub fn polygon(vertices: &[Vec2]) -> Vec<PathSegment> {
    let mut out = Vec::with_capacity(vertices.len() + 1);
    let Some(&first) = vertices.first() else {
        return out;
    };
    out.push(PathSegment::MoveTo(first));
    for &v in &vertices[1..] {
        out.push(PathSegment::LineTo(v));
    }
    out.push(PathSegment::LineTo(first));
    out
}

/// Vertices of each loop, closing vertex excluded.
pub fn loop_vertices(path: &[PathSegment]) -> Result<Vec<Vec<Vec2>>, GeometryError> {
    Ok(split_loops(path)?
        .into_iter()
        .map(|l| {
            let mut pts: Vec<Vec2> = l.iter().map(PathSegment::end).collect();
            if pts.len() >= 2 && pts.first() == pts.last() {
                pts.pop();
            }
            pts
        })
        .collect())
}
