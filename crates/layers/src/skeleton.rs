//! Approximate medial axis of a label polygon.
//!
//! The polygon is ear-clipped, then made Delaunay by Lawson flips of every
//! edge that is not part of a ring. Circumcenters of triangles that fall
//! inside the polygon become skeleton nodes; triangles sharing an edge are
//! connected, and each connection carries the clearance a label crossing it
//! can rely on.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use cartography::GeometryError;
use earcutr::earcut;
use foundation::StepBudget;
use foundation::math::{StableF64, Vec2};
use tracing::trace;

use crate::error::LabelError;
use crate::polygon::LabelPolygon;

#[derive(Debug, Clone, PartialEq)]
pub struct Triangulation {
    pub points: Vec<Vec2>,
    /// Counter-clockwise index triples into `points`.
    pub triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    pub fn new(polygon: &LabelPolygon, budget: &mut StepBudget) -> Result<Self, LabelError> {
        let mut points = Vec::with_capacity(polygon.vertex_count());
        let mut hole_indices = Vec::with_capacity(polygon.holes.len());
        let mut constrained = BTreeSet::new();
        for (ring_index, ring) in polygon.rings().enumerate() {
            if ring_index > 0 {
                hole_indices.push(points.len());
            }
            let base = points.len();
            let n = ring.len();
            for i in 0..n {
                constrained.insert(edge_key(base + i, base + (i + 1) % n));
            }
            points.extend_from_slice(ring);
        }
        let coords: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
        let indices = match earcut(&coords, &hole_indices, 2) {
            Ok(ix) => ix,
            Err(_) => return Err(LabelError::Degenerate("triangulation failed".to_string())),
        };

        let mut triangles: Vec<[usize; 3]> = indices
            .chunks_exact(3)
            .filter_map(|c| {
                let turn = orient(points[c[0]], points[c[1]], points[c[2]]);
                if turn > 0.0 {
                    Some([c[0], c[1], c[2]])
                } else if turn < 0.0 {
                    Some([c[0], c[2], c[1]])
                } else {
                    None
                }
            })
            .collect();
        if triangles.is_empty() {
            return Err(LabelError::Degenerate(format!(
                "no triangles from {} vertices",
                points.len()
            )));
        }
        let flips = lawson_flips(&points, &mut triangles, &constrained, budget)?;
        trace!(triangles = triangles.len(), flips, "label triangulation");
        Ok(Self { points, triangles })
    }
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

fn orient(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    (b - a).cross(c - a)
}

/// Whether `d` lies strictly inside the circumcircle of counter-clockwise
/// `a, b, c`, beyond a relative tolerance so cocircular quads never flip back
/// and forth.
fn in_circle(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let (ad, bd, cd) = (a - d, b - d, c - d);
    let det = ad.length_sq() * bd.cross(cd) - bd.length_sq() * ad.cross(cd)
        + cd.length_sq() * ad.cross(bd);
    let scale = ad.length_sq().max(bd.length_sq()).max(cd.length_sq());
    det > 1e-10 * scale * scale
}

fn lawson_flips(
    points: &[Vec2],
    triangles: &mut [[usize; 3]],
    constrained: &BTreeSet<(usize, usize)>,
    budget: &mut StepBudget,
) -> Result<usize, GeometryError> {
    let mut flips = 0;
    while let Some((t, u, first, second)) = find_flip(points, triangles, constrained) {
        if !budget.try_consume(1) {
            return Err(GeometryError::RunawayIteration {
                operation: "delaunay flips",
                limit: budget.limit(),
                detail: format!("{} triangles after {flips} flips", triangles.len()),
            });
        }
        triangles[t] = first;
        triangles[u] = second;
        flips += 1;
    }
    Ok(flips)
}

fn find_flip(
    points: &[Vec2],
    triangles: &[[usize; 3]],
    constrained: &BTreeSet<(usize, usize)>,
) -> Option<(usize, usize, [usize; 3], [usize; 3])> {
    let mut owner = BTreeMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            owner.insert((tri[k], tri[(k + 1) % 3]), t);
        }
    }
    for (t, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            let (a, b, c) = (tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]);
            if constrained.contains(&edge_key(a, b)) {
                continue;
            }
            let Some(&u) = owner.get(&(b, a)) else {
                continue;
            };
            let Some(d) = triangles[u].into_iter().find(|&v| v != a && v != b) else {
                continue;
            };
            let (pa, pb, pc, pd) = (points[a], points[b], points[c], points[d]);
            if in_circle(pa, pb, pc, pd) && orient(pa, pd, pc) > 0.0 && orient(pd, pb, pc) > 0.0 {
                return Some((t, u, [a, d, c], [d, b, c]));
            }
        }
    }
    None
}

fn circumcircle(a: Vec2, b: Vec2, c: Vec2) -> Option<(Vec2, f64)> {
    let ab = b - a;
    let ac = c - a;
    let d = 2.0 * ab.cross(ac);
    if d == 0.0 {
        return None;
    }
    let (ab2, ac2) = (ab.length_sq(), ac.length_sq());
    let offset = Vec2::new((ac.y * ab2 - ab.y * ac2) / d, (ab.x * ac2 - ac.x * ab2) / d);
    Some((a + offset, offset.length()))
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SkeletonNode {
    pub position: Vec2,
    /// Circumradius of the triangle the node came from.
    pub clearance: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct SkeletonEdge {
    to: usize,
    length: f64,
    clearance: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    nodes: Vec<SkeletonNode>,
    adjacency: Vec<Vec<SkeletonEdge>>,
}

impl Skeleton {
    pub fn new(triangulation: &Triangulation, polygon: &LabelPolygon) -> Self {
        let points = &triangulation.points;
        let mut skeleton = Skeleton::default();
        let mut node_of = vec![None; triangulation.triangles.len()];
        for (t, tri) in triangulation.triangles.iter().enumerate() {
            let Some((center, radius)) = circumcircle(points[tri[0]], points[tri[1]], points[tri[2]])
            else {
                continue;
            };
            if polygon.contains(center) {
                node_of[t] = Some(skeleton.nodes.len());
                skeleton.nodes.push(SkeletonNode {
                    position: center,
                    clearance: radius,
                });
                skeleton.adjacency.push(Vec::new());
            }
        }

        let mut owner = BTreeMap::new();
        for (t, tri) in triangulation.triangles.iter().enumerate() {
            for k in 0..3 {
                owner.insert((tri[k], tri[(k + 1) % 3]), t);
            }
        }
        for (&(a, b), &t) in &owner {
            let Some(&u) = owner.get(&(b, a)) else {
                continue;
            };
            if u < t {
                continue;
            }
            let (Some(i), Some(j)) = (node_of[t], node_of[u]) else {
                continue;
            };
            let half_width = 0.5 * points[a].distance(points[b]);
            let clearance = skeleton.nodes[i]
                .clearance
                .min(skeleton.nodes[j].clearance)
                .min(half_width);
            skeleton.connect(i, j, clearance);
        }
        skeleton
    }

    fn connect(&mut self, i: usize, j: usize, clearance: f64) {
        let length = self.nodes[i].position.distance(self.nodes[j].position);
        self.adjacency[i].push(SkeletonEdge {
            to: j,
            length,
            clearance,
        });
        self.adjacency[j].push(SkeletonEdge {
            to: i,
            length,
            clearance,
        });
    }

    pub fn nodes(&self) -> &[SkeletonNode] {
        &self.nodes
    }

    pub fn max_edge_clearance(&self) -> Option<f64> {
        self.adjacency
            .iter()
            .flatten()
            .map(|e| e.clearance)
            .max_by(f64::total_cmp)
    }

    /// The longest shortest path of every component of the graph restricted
    /// to edges with at least `threshold` clearance, found by double sweep.
    ///
    /// Components are visited from their widest node. Spines run from the
    /// first sweep's far end to the second's.
    pub fn spines(
        &self,
        threshold: f64,
        budget: &mut StepBudget,
    ) -> Result<Vec<Vec<usize>>, GeometryError> {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by(|&a, &b| {
            self.nodes[b]
                .clearance
                .total_cmp(&self.nodes[a].clearance)
                .then(a.cmp(&b))
        });
        let mut seen = vec![false; self.nodes.len()];
        let mut spines = Vec::new();
        for start in order {
            if seen[start] {
                continue;
            }
            let (dist, _) = self.shortest_paths(start, threshold, budget)?;
            let mut reached = 0;
            for (i, d) in dist.iter().enumerate() {
                if d.is_some() {
                    seen[i] = true;
                    reached += 1;
                }
            }
            if reached < 2 {
                continue;
            }
            let Some(far) = farthest(&dist) else { continue };
            let (dist, prev) = self.shortest_paths(far, threshold, budget)?;
            let Some(other) = farthest(&dist) else { continue };
            let mut spine = vec![other];
            let mut cursor = other;
            while let Some(p) = prev[cursor] {
                spine.push(p);
                cursor = p;
                if spine.len() > self.nodes.len() {
                    break;
                }
            }
            spine.reverse();
            spines.push(spine);
        }
        Ok(spines)
    }

    fn shortest_paths(
        &self,
        source: usize,
        threshold: f64,
        budget: &mut StepBudget,
    ) -> Result<(Vec<Option<f64>>, Vec<Option<usize>>), GeometryError> {
        let n = self.nodes.len();
        let mut best: Vec<Option<f64>> = vec![None; n];
        let mut prev = vec![None; n];
        let mut heap = BinaryHeap::new();
        best[source] = Some(0.0);
        heap.push(Reverse((StableF64(0.0), source)));
        while let Some(Reverse((StableF64(d), u))) = heap.pop() {
            if best[u].is_some_and(|b| d > b) {
                continue;
            }
            for edge in &self.adjacency[u] {
                if edge.clearance < threshold {
                    continue;
                }
                if !budget.try_consume(1) {
                    return Err(GeometryError::RunawayIteration {
                        operation: "skeleton search",
                        limit: budget.limit(),
                        detail: format!("{n} skeleton nodes"),
                    });
                }
                let next = d + edge.length;
                if best[edge.to].is_none_or(|b| next < b) {
                    best[edge.to] = Some(next);
                    prev[edge.to] = Some(u);
                    heap.push(Reverse((StableF64(next), edge.to)));
                }
            }
        }
        Ok((best, prev))
    }
}

fn farthest(dist: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, d) in dist.iter().enumerate() {
        if let Some(d) = *d
            && best.is_none_or(|(_, b)| d > b)
        {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sorted(mut tris: Vec<[usize; 3]>) -> Vec<[usize; 3]> {
        for t in &mut tris {
            t.sort_unstable();
        }
        tris.sort_unstable();
        tris
    }

    #[test]
    fn long_diagonal_is_flipped() {
        let points = vec![
            Vec2::new(-3.0, 0.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        let constrained: BTreeSet<_> = [(0, 1), (1, 2), (2, 3), (0, 3)].into_iter().collect();
        let mut triangles = vec![[0, 1, 2], [0, 2, 3]];
        let mut budget = StepBudget::new(10);
        let flips = lawson_flips(&points, &mut triangles, &constrained, &mut budget).unwrap();
        assert_eq!(flips, 1);
        assert_eq!(sorted(triangles), vec![[0, 1, 3], [1, 2, 3]]);
    }

    #[test]
    fn ring_edges_are_never_flipped() {
        let points = vec![
            Vec2::new(-3.0, 0.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        let constrained: BTreeSet<_> = [(0, 1), (1, 2), (2, 3), (0, 3), (0, 2)].into_iter().collect();
        let mut triangles = vec![[0, 1, 2], [0, 2, 3]];
        let mut budget = StepBudget::new(10);
        assert_eq!(
            lawson_flips(&points, &mut triangles, &constrained, &mut budget).unwrap(),
            0
        );
    }

    #[test]
    fn circumcircle_of_right_triangle() {
        let (center, radius) =
            circumcircle(Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), Vec2::new(0.0, 2.0)).unwrap();
        assert_eq!(center, Vec2::new(2.0, 1.0));
        assert!((radius - 5.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(
            circumcircle(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)),
            None
        );
    }

    fn chain() -> Skeleton {
        let positions = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(1.0, 0.5),
        ];
        let mut skeleton = Skeleton::default();
        for (i, &position) in positions.iter().enumerate() {
            skeleton.nodes.push(SkeletonNode {
                position,
                clearance: if i == 1 { 6.0 } else { 5.0 },
            });
            skeleton.adjacency.push(Vec::new());
        }
        skeleton.connect(0, 1, 5.0);
        skeleton.connect(1, 2, 5.0);
        skeleton.connect(2, 3, 1.0);
        skeleton.connect(1, 4, 5.0);
        skeleton
    }

    #[test]
    fn double_sweep_respects_the_clearance_threshold() {
        let skeleton = chain();
        let mut budget = StepBudget::new(1_000);
        assert_eq!(skeleton.spines(2.0, &mut budget).unwrap(), vec![vec![0, 1, 2]]);
        assert_eq!(
            skeleton.spines(0.5, &mut budget).unwrap(),
            vec![vec![3, 2, 1, 0]]
        );
        assert_eq!(skeleton.max_edge_clearance(), Some(5.0));
    }

    #[test]
    fn convex_polygon_skeleton_stays_inside() {
        let ring: Vec<Vec2> = (0..16)
            .map(|k| {
                let a = std::f64::consts::TAU * k as f64 / 16.0;
                Vec2::new(40.0 * a.cos(), 10.0 * a.sin())
            })
            .collect();
        let polygon = LabelPolygon {
            outer: ring,
            holes: Vec::new(),
        };
        let mut budget = StepBudget::new(10_000);
        let tri = Triangulation::new(&polygon, &mut budget).unwrap();
        assert_eq!(tri.triangles.len(), 14);
        let skeleton = Skeleton::new(&tri, &polygon);
        assert!(!skeleton.nodes().is_empty());
        for node in skeleton.nodes() {
            assert!(polygon.contains(node.position));
            assert!(node.position.y.abs() < 1e-6, "{node:?}");
        }
    }
}
