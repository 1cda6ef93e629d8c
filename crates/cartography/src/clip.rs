//! Region clipper: cuts island loops down to a frame.
//!
//! Each island loop is split at its crossings with the frame into fragments
//! that run from an entry to the following exit. Fragments live in an index
//! arena; stitching walks forward along the frame from every exit to the
//! nearest entry and splices in the frame edges it passes, so islands that
//! share stretches of frame end up on one connected boundary.

use std::f64::consts::PI;

use foundation::math::Vec2;
use foundation::{Arena, Handle, StepBudget};
use tracing::{debug, trace};

use crate::config::IterationCaps;
use crate::containment::Classifier;
use crate::crossing::{Boundary, Crossing};
use crate::curve::Curve;
use crate::error::GeometryError;
use crate::frame::Frame;
use crate::path::{PathSegment, Side, split_loops, validate_closed};

#[derive(Debug, Clone)]
struct IslandSegment {
    start: Vec2,
    segment: PathSegment,
    curve: Curve,
}

/// A crossing together with the island segment that produced it.
#[derive(Debug, Copy, Clone)]
struct LoopCrossing {
    segment_index: usize,
    crossing: Crossing,
}

#[derive(Debug, Copy, Clone)]
struct FramePos {
    loop_index: usize,
    edge_index: usize,
    edge_t: f64,
    point: Vec2,
}

impl FramePos {
    fn from_crossing(c: &Crossing) -> Self {
        Self {
            loop_index: c.loop_index,
            edge_index: c.edge_index,
            edge_t: c.edge_t,
            point: c.point,
        }
    }

    fn arc_position(&self) -> f64 {
        self.edge_index as f64 + self.edge_t
    }
}

#[derive(Debug, Clone)]
struct Fragment {
    island_loop: usize,
    entry: FramePos,
    exit: FramePos,
    segments: Vec<PathSegment>,
    used: bool,
}

/// Portion of `islands` inside `frame`, as closed loops that may include
/// stretches of the frame boundary.
///
/// An empty island list stands for the whole domain and yields the frame
/// itself. Island loops that never cross the frame are kept or dropped whole;
/// frame loops that no island crosses are appended whole when they lie inside
/// the island region, which is how inverted islands get their outer bound.
pub fn cut_to_size(
    islands: &[PathSegment],
    frame: &Frame,
    periodic: bool,
    caps: &IterationCaps,
) -> Result<Vec<PathSegment>, GeometryError> {
    if islands.is_empty() {
        return Ok(frame.to_path());
    }
    validate_closed(islands, periodic)?;
    if frame.is_empty() {
        return Ok(islands.to_vec());
    }

    let frame_boundary = Boundary::from_frame(frame, periodic)?;
    let frame_side = Classifier::new(frame_boundary.clone(), true);
    let island_side = Classifier::new(Boundary::from_path(islands, periodic)?, true);

    let mut kept: Vec<PathSegment> = Vec::new();
    let mut fragments: Arena<Fragment> = Arena::new();
    let mut crossed_frame_loops = vec![false; frame.loops().len()];

    for (loop_index, path_loop) in split_loops(islands)?.into_iter().enumerate() {
        let segments = island_segments(path_loop, periodic)?;
        let mut crossings: Vec<LoopCrossing> = Vec::new();
        for (segment_index, s) in segments.iter().enumerate() {
            crossings.extend(
                frame_boundary
                    .crossings(&s.curve)
                    .into_iter()
                    .map(|crossing| LoopCrossing {
                        segment_index,
                        crossing,
                    }),
            );
        }
        suppress_tangencies(&mut crossings);

        if crossings.is_empty() {
            if loop_side(&segments, &frame_side) == Side::Out {
                trace!(loop_index, "island loop outside frame dropped");
            } else {
                kept.extend_from_slice(path_loop);
            }
            continue;
        }

        let m = crossings.len();
        let alternates =
            (0..m).all(|i| crossings[i].crossing.entering != crossings[(i + 1) % m].crossing.entering);
        if !alternates {
            return Err(GeometryError::InconsistentCrossings { loop_index });
        }
        trace!(loop_index, crossings = m, "island loop crosses frame");

        for i in 0..m {
            let entry = crossings[i];
            if !entry.crossing.entering {
                continue;
            }
            crossed_frame_loops[entry.crossing.loop_index] = true;
            let j = (i + 1) % m;
            let exit = crossings[j];
            crossed_frame_loops[exit.crossing.loop_index] = true;
            fragments.alloc(Fragment {
                island_loop: loop_index,
                entry: FramePos::from_crossing(&entry.crossing),
                exit: FramePos::from_crossing(&exit.crossing),
                segments: fragment_segments(&entry, &exit, j <= i, &segments),
                used: false,
            });
        }
    }

    let mut budget = StepBudget::new(caps.clip_walk);
    let stitched = stitch(&mut fragments, frame, &frame_boundary, &mut budget)?;

    let mut out = kept;
    out.extend(stitched);
    let mut appended = 0usize;
    for (loop_index, edges) in frame.loops().iter().enumerate() {
        if crossed_frame_loops[loop_index] {
            continue;
        }
        let sample = frame_boundary.loops()[loop_index]
            .iter()
            .map(|curve| island_side.side(curve.point_at(0.5)))
            .find(|side| *side != Side::Borderline);
        if sample == Some(Side::In) {
            if let Some(first) = edges.first() {
                out.push(PathSegment::MoveTo(first.start));
                out.extend(edges.iter().map(|e| e.to_segment()));
                appended += 1;
            }
        }
    }

    debug!(
        fragments = fragments.len(),
        frame_loops_appended = appended,
        inverted = island_side.is_inverted(),
        segments = out.len(),
        "clipped islands to frame"
    );
    Ok(out)
}

fn island_segments(
    path_loop: &[PathSegment],
    periodic: bool,
) -> Result<Vec<IslandSegment>, GeometryError> {
    let mut out = Vec::with_capacity(path_loop.len());
    let mut cursor = path_loop[0].end();
    for segment in &path_loop[1..] {
        if let Some(curve) = Curve::from_segment(cursor, segment, periodic)? {
            out.push(IslandSegment {
                start: cursor,
                segment: *segment,
                curve,
            });
        }
        cursor = segment.end();
    }
    Ok(out)
}

/// Pieces `(segment, t0, t1)` covering a loop from one parameter position to
/// another, going forward. `wrap` means the walk passes the loop's start.
fn pieces_between(
    from: (usize, f64),
    to: (usize, f64),
    wrap: bool,
    n: usize,
) -> Vec<(usize, f64, f64)> {
    let (sa, ta) = from;
    let (sb, tb) = to;
    if !wrap && sa == sb {
        return vec![(sa, ta, tb)];
    }
    let mut steps = (sb + n - sa) % n;
    if steps == 0 {
        steps = n;
    }
    let mut out = Vec::with_capacity(steps + 1);
    out.push((sa, ta, 1.0));
    for k in 1..steps {
        out.push(((sa + k) % n, 0.0, 1.0));
    }
    out.push((sb, 0.0, tb));
    out
}

/// The same kind of segment covering `t0..t1` of `curve` and ending at `end`.
fn partial_segment(segment: &PathSegment, curve: &Curve, t0: f64, t1: f64, end: Vec2) -> PathSegment {
    match *segment {
        PathSegment::ArcTo {
            radius_x,
            radius_y,
            rotation,
            sweep,
            ..
        } => PathSegment::ArcTo {
            radius_x,
            radius_y,
            rotation,
            large_arc: curve.sweep_between(t0, t1).abs() > PI,
            sweep,
            end,
        },
        other => other.with_end(end),
    }
}

fn fragment_segments(
    entry: &LoopCrossing,
    exit: &LoopCrossing,
    wrap: bool,
    segments: &[IslandSegment],
) -> Vec<PathSegment> {
    let pieces = pieces_between(
        (entry.segment_index, entry.crossing.segment_t),
        (exit.segment_index, exit.crossing.segment_t),
        wrap,
        segments.len(),
    );
    let last = pieces.len() - 1;
    let mut out = Vec::with_capacity(pieces.len());
    for (k, (s, t0, t1)) in pieces.into_iter().enumerate() {
        if t1 <= t0 {
            continue;
        }
        let seg = &segments[s];
        if k == last {
            out.push(partial_segment(&seg.segment, &seg.curve, t0, t1, exit.crossing.point));
        } else if t0 == 0.0 {
            out.push(seg.segment);
        } else {
            out.push(partial_segment(&seg.segment, &seg.curve, t0, t1, seg.segment.end()));
        }
    }
    out
}

/// Drops adjacent entry/exit pairs at the same point, where an island vertex
/// only touches the frame. A stretch running along the frame counts as
/// outside it, so the pair around one is a real exit and entry and the frame
/// walk between them reproduces the stretch.
fn suppress_tangencies(crossings: &mut Vec<LoopCrossing>) {
    loop {
        let m = crossings.len();
        if m < 2 {
            return;
        }
        let touching = (0..m).find(|&i| {
            let (a, b) = (&crossings[i], &crossings[(i + 1) % m]);
            a.crossing.entering != b.crossing.entering && a.crossing.point == b.crossing.point
        });
        let Some(i) = touching else {
            return;
        };
        let j = (i + 1) % m;
        crossings.remove(i.max(j));
        crossings.remove(i.min(j));
    }
}

/// Side of an uncrossed loop: its first vertex off the frame boundary
/// decides, then its first segment midpoint off the boundary.
fn loop_side(segments: &[IslandSegment], frame_side: &Classifier) -> Side {
    segments
        .iter()
        .map(|s| frame_side.side(s.start))
        .find(|side| *side != Side::Borderline)
        .or_else(|| {
            segments
                .iter()
                .map(|s| frame_side.side(s.curve.point_at(0.5)))
                .find(|side| *side != Side::Borderline)
        })
        .unwrap_or(Side::Borderline)
}

/// Entry nearest to `exit` going forward along its frame loop. Ties go to
/// the lower frame loop, then the lower arc position, so the walk does not
/// depend on fragment allocation order.
fn nearest_entry(fragments: &Arena<Fragment>, exit: &FramePos, n_edges: usize) -> Option<Handle<Fragment>> {
    let key = |entry: &FramePos| {
        let d = (entry.arc_position() - exit.arc_position()).rem_euclid(n_edges as f64);
        (d, entry.loop_index, entry.arc_position())
    };
    fragments
        .iter()
        .filter(|(_, fragment)| fragment.entry.loop_index == exit.loop_index)
        .min_by(|(_, a), (_, b)| {
            let (da, la, pa) = key(&a.entry);
            let (db, lb, pb) = key(&b.entry);
            da.total_cmp(&db).then(la.cmp(&lb)).then(pa.total_cmp(&pb))
        })
        .map(|(handle, _)| handle)
}

fn stitch(
    fragments: &mut Arena<Fragment>,
    frame: &Frame,
    frame_boundary: &Boundary,
    budget: &mut StepBudget,
) -> Result<Vec<PathSegment>, GeometryError> {
    let mut out = Vec::new();
    let handles: Vec<Handle<Fragment>> = fragments.handles().collect();
    for start in handles {
        let Some(first) = fragments.get(start) else {
            continue;
        };
        if first.used {
            continue;
        }
        out.push(PathSegment::MoveTo(first.entry.point));
        let mut current = start;
        loop {
            if !budget.try_consume(1) {
                return Err(runaway(budget, "fragment"));
            }
            let Some(fragment) = fragments.get_mut(current) else {
                return Err(GeometryError::DegenerateGeometry(format!(
                    "missing clip fragment {}",
                    current.index()
                )));
            };
            fragment.used = true;
            out.extend_from_slice(&fragment.segments);
            let exit = fragment.exit;
            let island_loop = fragment.island_loop;

            let edges = &frame.loops()[exit.loop_index];
            let next = nearest_entry(fragments, &exit, edges.len())
                .ok_or(GeometryError::InconsistentCrossings { loop_index: island_loop })?;
            let entry = fragments
                .get(next)
                .map(|f| (f.entry, f.used))
                .ok_or(GeometryError::InconsistentCrossings { loop_index: island_loop })?;
            walk_frame(&exit, &entry.0, frame, frame_boundary, budget, &mut out)?;

            if next == start {
                break;
            }
            if entry.1 {
                return Err(GeometryError::InconsistentCrossings { loop_index: island_loop });
            }
            current = next;
        }
    }
    Ok(out)
}

/// Emits frame edges from an exit forward to an entry on the same loop.
fn walk_frame(
    exit: &FramePos,
    entry: &FramePos,
    frame: &Frame,
    frame_boundary: &Boundary,
    budget: &mut StepBudget,
    out: &mut Vec<PathSegment>,
) -> Result<(), GeometryError> {
    let edges = &frame.loops()[exit.loop_index];
    let curves = &frame_boundary.loops()[exit.loop_index];
    let wrap = (entry.edge_index, entry.edge_t) < (exit.edge_index, exit.edge_t);
    let pieces = pieces_between(
        (exit.edge_index, exit.edge_t),
        (entry.edge_index, entry.edge_t),
        wrap,
        edges.len(),
    );
    let last = pieces.len() - 1;
    for (k, (e, t0, t1)) in pieces.into_iter().enumerate() {
        if t1 <= t0 {
            continue;
        }
        if !budget.try_consume(1) {
            return Err(runaway(budget, "frame edge"));
        }
        let edge = &edges[e];
        let end = if k == last { entry.point } else { edge.end };
        let large_arc = curves[e].sweep_between(t0, t1).abs() > PI;
        out.push(edge.segment_to(end, large_arc));
    }
    Ok(())
}

fn runaway(budget: &StepBudget, at: &str) -> GeometryError {
    GeometryError::runaway(
        "clip walk",
        budget.limit(),
        format!("ran out while stitching at a {at}"),
    )
}
