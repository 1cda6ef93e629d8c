//! Turns a projected region outline into the polygon the label placer works
//! on: arcs flattened, the largest loop as the outer ring, loops inside it as
//! holes, and vertex counts held within the configured band.

use cartography::curve::{ARC_FLATTENING_STEP, Curve};
use cartography::{GeometryError, PathSegment, split_loops};
use foundation::StepBudget;
use foundation::math::Vec2;
use tracing::warn;

use crate::error::LabelError;

/// One counter-clockwise outer ring and its clockwise holes. Rings are open
/// (the first vertex is not repeated).
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPolygon {
    pub outer: Vec<Vec2>,
    pub holes: Vec<Vec<Vec2>>,
}

impl LabelPolygon {
    /// Builds the polygon from a planar outline.
    ///
    /// Returns `Ok(None)` when every loop is too small to enclose anything.
    /// Loops outside the largest one belong to other islands and are ignored.
    pub fn from_outline(outline: &[PathSegment]) -> Result<Option<Self>, LabelError> {
        let mut rings = Vec::new();
        let mut vertex_total = 0;
        for (index, path_loop) in split_loops(outline)?.into_iter().enumerate() {
            let ring = flatten_loop(path_loop)?;
            vertex_total += ring.len();
            if ring.len() < 3 || signed_area(&ring) == 0.0 {
                warn!(loop_index = index, vertices = ring.len(), "dropping degenerate label loop");
                continue;
            }
            rings.push(ring);
        }
        if vertex_total == 0 {
            return Err(LabelError::Degenerate("outline has no vertices".to_string()));
        }

        let Some(outer_index) = (0..rings.len())
            .max_by(|&a, &b| signed_area(&rings[a]).abs().total_cmp(&signed_area(&rings[b]).abs()))
        else {
            return Ok(None);
        };
        let mut outer = rings.swap_remove(outer_index);
        if signed_area(&outer) < 0.0 {
            outer.reverse();
        }
        let holes = rings
            .into_iter()
            .filter(|ring| ring_contains(&outer, ring[0]))
            .map(|mut ring| {
                if signed_area(&ring) > 0.0 {
                    ring.reverse();
                }
                ring
            })
            .collect();
        Ok(Some(Self { outer, holes }))
    }

    /// Brings the outer ring within `[min, max]` vertices and each hole
    /// within a quarter of that.
    pub fn normalized(
        self,
        min: usize,
        max: usize,
        budget: &mut StepBudget,
    ) -> Result<Self, GeometryError> {
        let outer = normalize_ring(self.outer, min, max, budget)?;
        let hole_max = (max / 4).max(3);
        let holes = self
            .holes
            .into_iter()
            .map(|h| normalize_ring(h, 3, hole_max, budget))
            .collect::<Result<_, _>>()?;
        Ok(Self { outer, holes })
    }

    pub fn rings(&self) -> impl Iterator<Item = &[Vec2]> {
        std::iter::once(self.outer.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }

    /// Every boundary edge, holes included.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.rings().flat_map(|ring| {
            let n = ring.len();
            (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.rings().map(<[Vec2]>::len).sum()
    }

    /// Even-odd inclusion over all rings.
    pub fn contains(&self, p: Vec2) -> bool {
        self.rings().filter(|ring| ring_contains(ring, p)).count() % 2 == 1
    }
}

/// Twice-signed area would do for orientation; this is the true area.
pub fn signed_area(ring: &[Vec2]) -> f64 {
    let n = ring.len();
    0.5 * (0..n).map(|i| ring[i].cross(ring[(i + 1) % n])).sum::<f64>()
}

fn ring_contains(ring: &[Vec2], p: Vec2) -> bool {
    let n = ring.len();
    let mut inside = false;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

fn flatten_loop(path_loop: &[PathSegment]) -> Result<Vec<Vec2>, GeometryError> {
    let Some((first, rest)) = path_loop.split_first() else {
        return Ok(Vec::new());
    };
    let mut cursor = first.end();
    let mut points = vec![cursor];
    for segment in rest {
        if let Some(curve) = Curve::from_segment(cursor, segment, false)? {
            points.extend(curve.flatten(ARC_FLATTENING_STEP).iter().map(Curve::end));
        }
        cursor = segment.end();
    }
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Ok(points)
}

fn spend(budget: &mut StepBudget) -> Result<(), GeometryError> {
    if budget.try_consume(1) {
        Ok(())
    } else {
        Err(GeometryError::RunawayIteration {
            operation: "label simplification",
            limit: budget.limit(),
            detail: "vertex band not reached".to_string(),
        })
    }
}

/// Removes the vertex whose removal shortens the perimeter least until at
/// most `max` remain, then splits the longest edge until `min` are present.
fn normalize_ring(
    mut ring: Vec<Vec2>,
    min: usize,
    max: usize,
    budget: &mut StepBudget,
) -> Result<Vec<Vec2>, GeometryError> {
    let min = min.max(3);
    let max = max.max(min);
    while ring.len() > max {
        spend(budget)?;
        let n = ring.len();
        let cheapest = (0..n)
            .map(|i| {
                let (a, v, b) = (ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]);
                (i, a.distance(v) + v.distance(b) - a.distance(b))
            })
            .min_by(|x, y| x.1.total_cmp(&y.1));
        let Some((i, _)) = cheapest else { break };
        ring.remove(i);
    }
    while ring.len() < min {
        spend(budget)?;
        let n = ring.len();
        let longest = (0..n)
            .map(|i| (i, ring[i].distance(ring[(i + 1) % n])))
            .max_by(|x, y| x.1.total_cmp(&y.1));
        let Some((i, _)) = longest else { break };
        let mid = ring[i].midpoint(ring[(i + 1) % n]);
        ring.insert(i + 1, mid);
    }
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartography::polygon;
    use pretty_assertions::assert_eq;

    fn square(x0: f64, y0: f64, side: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x0 + side, y0),
            Vec2::new(x0 + side, y0 + side),
            Vec2::new(x0, y0 + side),
        ]
    }

    #[test]
    fn largest_loop_is_outer_and_inner_loops_are_holes() {
        let mut outer_cw = square(0.0, 0.0, 10.0);
        outer_cw.reverse();
        let mut path = polygon(&square(2.0, 2.0, 2.0));
        path.extend(polygon(&outer_cw));
        path.extend(polygon(&square(20.0, 0.0, 3.0)));

        let poly = LabelPolygon::from_outline(&path).unwrap().unwrap();
        assert_eq!(signed_area(&poly.outer), 100.0);
        assert_eq!(poly.holes.len(), 1);
        assert_eq!(signed_area(&poly.holes[0]), -4.0);
        assert!(poly.contains(Vec2::new(1.0, 1.0)));
        assert!(!poly.contains(Vec2::new(3.0, 3.0)));
        assert!(!poly.contains(Vec2::new(21.0, 1.0)));
    }

    #[test]
    fn empty_outline_is_degenerate() {
        assert!(matches!(
            LabelPolygon::from_outline(&[]),
            Err(LabelError::Degenerate(_))
        ));
    }

    #[test]
    fn sliver_outline_has_no_polygon() {
        let path = polygon(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
        assert_eq!(LabelPolygon::from_outline(&path).unwrap(), None);
    }

    #[test]
    fn simplification_drops_collinear_vertices_first() {
        let ring = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let mut budget = StepBudget::new(10);
        let out = normalize_ring(ring, 3, 4, &mut budget).unwrap();
        assert_eq!(out, square(0.0, 0.0, 2.0));
    }

    #[test]
    fn sparse_rings_gain_midpoints_on_long_edges() {
        let ring = vec![Vec2::new(0.0, 0.0), Vec2::new(8.0, 0.0), Vec2::new(0.0, 1.0)];
        let mut budget = StepBudget::new(10);
        let out = normalize_ring(ring, 4, 10, &mut budget).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[2], Vec2::new(4.0, 0.5));
    }

    #[test]
    fn band_overflow_is_a_runaway() {
        let ring = square(0.0, 0.0, 1.0);
        let mut budget = StepBudget::new(2);
        assert!(matches!(
            normalize_ring(ring, 10, 20, &mut budget),
            Err(GeometryError::RunawayIteration { .. })
        ));
    }
}
