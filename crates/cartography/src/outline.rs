//! Outline tracer: boundary loops between included and excluded mesh tiles.
//!
//! The walk state is a directed pair of tiles `(inside, outside)` whose shared
//! edge the boundary crosses. Each step moves into the triangle on the left of
//! that pair, emits its circumcenter and swaps whichever of the two tiles the
//! triangle's third tile replaces, so the included tiles always stay on the
//! left and loops come out counter-clockwise.

use std::collections::BTreeSet;

use foundation::StepBudget;
use foundation::math::{Place, Vec2};
use tracing::{debug, trace};

use crate::config::IterationCaps;
use crate::error::GeometryError;
use crate::mesh::Mesh;
use crate::path::PathSegment;
use crate::surface::Surface;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BoundaryVertex {
    Finite(Place),
    /// The walk left the mesh across its rim.
    Infinity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    pub loops: Vec<Vec<BoundaryVertex>>,
}

impl Outline {
    /// Geographic region for these loops. Runs of [`BoundaryVertex::Infinity`]
    /// become detours outside the surface rim, so the frame clip later cuts
    /// them back to the visible edge.
    pub fn into_region(self, surface: &dyn Surface) -> Vec<PathSegment> {
        let mut out = Vec::new();
        for vertices in self.loops {
            let Some(first_finite) = vertices
                .iter()
                .position(|v| matches!(v, BoundaryVertex::Finite(_)))
            else {
                continue;
            };
            let n = vertices.len();
            let rotated: Vec<BoundaryVertex> = (0..n)
                .map(|k| vertices[(first_finite + k) % n])
                .collect();

            let BoundaryVertex::Finite(start) = rotated[0] else {
                continue;
            };
            out.push(PathSegment::MoveTo(start.to_coord()));
            let mut previous = start;
            let mut outside = false;
            for vertex in rotated[1..].iter().chain(std::iter::once(&rotated[0])) {
                match *vertex {
                    BoundaryVertex::Infinity => outside = true,
                    BoundaryVertex::Finite(place) => {
                        if outside {
                            out.extend(surface.exterior_path(previous, place));
                            outside = false;
                        }
                        out.push(PathSegment::LineTo(place.to_coord()));
                        previous = place;
                    }
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }
}

/// Traces every boundary loop around the tiles flagged in `included`.
///
/// Starting pairs are tried in tile order, so the result does not depend on
/// anything but the mesh and the selection.
pub fn trace_outline<M: Mesh + ?Sized>(
    mesh: &M,
    included: &[bool],
    caps: &IterationCaps,
) -> Result<Outline, GeometryError> {
    check_selection(mesh, included)?;
    let mut visited = BTreeSet::new();
    let mut loops = Vec::new();
    for tile in (0..mesh.tile_count()).filter(|&t| included[t]) {
        for &other in mesh.neighbors(tile) {
            if included[other] || visited.contains(&(tile, other)) {
                continue;
            }
            let vertices = walk(mesh, included, (tile, other), &mut visited, caps)?;
            trace!(tile, other, vertices = vertices.len(), "traced outline loop");
            loops.push(vertices);
        }
    }
    debug!(loops = loops.len(), "traced outline");
    Ok(Outline { loops })
}

/// Traces the single loop through the boundary pair `start`.
pub fn trace_loop<M: Mesh + ?Sized>(
    mesh: &M,
    included: &[bool],
    start: (usize, usize),
    caps: &IterationCaps,
) -> Result<Vec<BoundaryVertex>, GeometryError> {
    check_selection(mesh, included)?;
    let (inside, outside) = start;
    if inside >= included.len() || outside >= included.len() || !included[inside] || included[outside] {
        return Err(GeometryError::DegenerateGeometry(format!(
            "tile pair {start:?} does not straddle the selection"
        )));
    }
    walk(mesh, included, start, &mut BTreeSet::new(), caps)
}

fn check_selection<M: Mesh + ?Sized>(mesh: &M, included: &[bool]) -> Result<(), GeometryError> {
    if included.len() != mesh.tile_count() {
        return Err(GeometryError::DegenerateGeometry(format!(
            "selection covers {} tiles, mesh has {}",
            included.len(),
            mesh.tile_count()
        )));
    }
    Ok(())
}

fn walk<M: Mesh + ?Sized>(
    mesh: &M,
    included: &[bool],
    start: (usize, usize),
    visited: &mut BTreeSet<(usize, usize)>,
    caps: &IterationCaps,
) -> Result<Vec<BoundaryVertex>, GeometryError> {
    let mut budget = StepBudget::new(caps.outline_walk);
    let mut vertices = Vec::new();
    let (mut inside, mut outside) = start;
    loop {
        if !budget.try_consume(1) {
            return Err(GeometryError::runaway(
                "outline walk",
                budget.limit(),
                format!("loop starting at tiles {start:?} never closed"),
            ));
        }
        visited.insert((inside, outside));
        match mesh.left_of(inside, outside) {
            Some(triangle) => {
                vertices.push(BoundaryVertex::Finite(mesh.circumcenter(triangle)));
                let third = mesh
                    .triangle_tiles(triangle)
                    .into_iter()
                    .find(|&t| t != inside && t != outside)
                    .ok_or_else(|| {
                        GeometryError::DegenerateGeometry(format!("triangle {triangle} repeats a tile"))
                    })?;
                if included[third] {
                    inside = third;
                } else {
                    outside = third;
                }
            }
            None => {
                if vertices.last() != Some(&BoundaryVertex::Infinity) {
                    vertices.push(BoundaryVertex::Infinity);
                }
                (inside, outside) = around_rim(mesh, included, inside, &mut budget)?;
            }
        }
        if (inside, outside) == start {
            break;
        }
    }
    Ok(vertices)
}

/// From an included rim tile, follows the hull counter-clockwise until the
/// next rim tile is excluded; returns the pair to re-enter the mesh through.
fn around_rim<M: Mesh + ?Sized>(
    mesh: &M,
    included: &[bool],
    from: usize,
    budget: &mut StepBudget,
) -> Result<(usize, usize), GeometryError> {
    let mut current = from;
    loop {
        if !budget.try_consume(1) {
            return Err(GeometryError::runaway(
                "outline walk",
                budget.limit(),
                format!("rim walk from tile {from} never left the selection"),
            ));
        }
        let next = mesh
            .neighbors(current)
            .iter()
            .copied()
            .find(|&n| mesh.left_of(current, n).is_some() && mesh.left_of(n, current).is_none())
            .ok_or_else(|| {
                GeometryError::DegenerateGeometry(format!("tile {current} has no rim successor"))
            })?;
        if !included[next] {
            return Ok((current, next));
        }
        current = next;
    }
}

/// Total signed turning of a closed polyline, in radians. Repeated points
/// are skipped.
pub fn total_turning(points: &[Vec2]) -> f64 {
    let mut distinct: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if distinct.last() != Some(&p) {
            distinct.push(p);
        }
    }
    while distinct.len() > 1 && distinct.first() == distinct.last() {
        distinct.pop();
    }
    let n = distinct.len();
    let mut total = 0.0;
    for i in 0..n {
        let a = distinct[i];
        let b = distinct[(i + 1) % n];
        let c = distinct[(i + 2) % n];
        let (u, v) = (b - a, c - b);
        total += u.cross(v).atan2(u.dot(v));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TriangleMesh;
    use crate::surface::Disc;
    use std::f64::consts::TAU;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    /// `size x size` triangular lattice of tiles 0.1 rad apart; odd rows are
    /// shifted half a step east. Tile `(i, j)` has index `j * size + i`.
    fn grid(size: usize) -> TriangleMesh {
        let row_height = 0.1 * 3f64.sqrt() / 2.0;
        let mut places = Vec::new();
        for j in 0..size {
            let shift = if j % 2 == 1 { 0.05 } else { 0.0 };
            for i in 0..size {
                places.push(Place::new(row_height * j as f64, 0.1 * i as f64 + shift));
            }
        }
        let id = |i: usize, j: usize| j * size + i;
        let mut triangles = Vec::new();
        for j in 0..size - 1 {
            for i in 0..size - 1 {
                let (a, b, c, d) = (id(i, j), id(i + 1, j), id(i, j + 1), id(i + 1, j + 1));
                if j % 2 == 0 {
                    triangles.push([a, b, c]);
                    triangles.push([b, d, c]);
                } else {
                    triangles.push([a, d, c]);
                    triangles.push([a, b, d]);
                }
            }
        }
        TriangleMesh::new(places, triangles, false).unwrap()
    }

    fn finite(vertices: &[BoundaryVertex]) -> Vec<Vec2> {
        vertices
            .iter()
            .filter_map(|v| match v {
                BoundaryVertex::Finite(p) => Some(p.to_coord()),
                BoundaryVertex::Infinity => None,
            })
            .collect()
    }

    fn selection(size: usize, picked: &[(usize, usize)]) -> Vec<bool> {
        let mut included = vec![false; size * size];
        for &(i, j) in picked {
            included[j * size + i] = true;
        }
        included
    }

    #[test]
    fn interior_blob_gives_one_counter_clockwise_loop() {
        let mesh = grid(6);
        let included = selection(6, &[(2, 2), (3, 2), (2, 3), (3, 3), (3, 1)]);
        let outline = trace_outline(&mesh, &included, &IterationCaps::default()).unwrap();
        assert_eq!(outline.loops.len(), 1);
        let points = finite(&outline.loops[0]);
        assert_eq!(points.len(), outline.loops[0].len());
        assert_close(total_turning(&points), TAU, 1e-9);
    }

    #[test]
    fn trace_is_independent_of_the_starting_pair() {
        let mesh = grid(6);
        let included = selection(6, &[(2, 2), (3, 2), (2, 3), (3, 3)]);
        let caps = IterationCaps::default();
        let reference = trace_loop(&mesh, &included, (14, 8), &caps).unwrap();
        let other = trace_loop(&mesh, &included, (21, 27), &caps).unwrap();
        assert_eq!(reference.len(), other.len());
        let offset = other
            .iter()
            .position(|v| *v == reference[0])
            .expect("loops share vertices");
        let n = other.len();
        for k in 0..n {
            assert_eq!(reference[k], other[(offset + k) % n]);
        }
    }

    #[test]
    fn separate_blobs_give_separate_loops() {
        let mesh = grid(7);
        let included = selection(7, &[(1, 1), (5, 5)]);
        let outline = trace_outline(&mesh, &included, &IterationCaps::default()).unwrap();
        assert_eq!(outline.loops.len(), 2);
        for vertices in &outline.loops {
            assert_close(total_turning(&finite(vertices)), TAU, 1e-9);
        }
    }

    #[test]
    fn selection_touching_the_rim_passes_through_infinity() {
        let mesh = grid(5);
        let included = selection(5, &[(0, 2), (1, 2), (0, 1), (1, 1)]);
        let outline = trace_outline(&mesh, &included, &IterationCaps::default()).unwrap();
        assert_eq!(outline.loops.len(), 1);
        let vertices = &outline.loops[0];
        assert_eq!(
            vertices
                .iter()
                .filter(|v| **v == BoundaryVertex::Infinity)
                .count(),
            1
        );
        let region = outline.clone().into_region(&Disc { radius: 1.0 });
        assert!(region[0].is_move());
        assert!(region.iter().any(|s| matches!(s, PathSegment::ParallelTo(_))));
    }

    #[test]
    fn tight_cap_is_a_runaway() {
        let mesh = grid(6);
        let included = selection(6, &[(2, 2), (3, 3)]);
        let caps = IterationCaps {
            outline_walk: 2,
            ..IterationCaps::default()
        };
        assert!(matches!(
            trace_outline(&mesh, &included, &caps),
            Err(GeometryError::RunawayIteration { .. })
        ));
    }
}
