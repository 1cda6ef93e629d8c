//! Inclusion tests for points and paths against multi-loop regions.
//!
//! Planar regions use plain even-odd parity: the area far from every loop is
//! outside. A periodic domain has no such far area, so the state above the
//! highest loop comes from the loops' orientation ([`is_inside_out`]) and
//! parity is counted from there. The clipper always uses the oriented form.

use std::f64::consts::TAU;

use foundation::math::{Vec2, stable_total_cmp_f64, wrap_angle};

use crate::crossing::Boundary;
use crate::curve::Curve;
use crate::error::GeometryError;
use crate::path::{PathSegment, Side, split_loops};

/// Point classifier over one boundary, with its arc-free copy and orientation
/// computed once.
#[derive(Debug, Clone)]
pub(crate) struct Classifier {
    exact: Boundary,
    flat: Boundary,
    inverted: bool,
    tolerance: f64,
}

impl Classifier {
    pub(crate) fn new(exact: Boundary, oriented: bool) -> Self {
        let flat = exact.flattened();
        let inverted = oriented && boundary_inside_out(&flat);
        let tolerance = exact
            .bounds()
            .map(|b| 1e-12 * b.extent().max(1.0))
            .unwrap_or(0.0);
        Self {
            exact,
            flat,
            inverted,
            tolerance,
        }
    }

    pub(crate) fn boundary(&self) -> &Boundary {
        &self.exact
    }

    pub(crate) fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub(crate) fn side(&self, point: Vec2) -> Side {
        if self.exact.is_empty() {
            return Side::In;
        }
        if self.exact.passes_through(point) || self.exact.distance_to(point) <= self.tolerance {
            return Side::Borderline;
        }
        let Some(bounds) = self.flat.bounds() else {
            return Side::In;
        };
        let top = bounds.max[1].max(point.y) + 1.0;
        let ray = Curve::Line {
            start: point,
            end: Vec2::new(point.x, top),
        };
        let odd = self.flat.crossings(&ray).len() % 2 == 1;
        if odd != self.inverted {
            Side::In
        } else {
            Side::Out
        }
    }
}

/// Classifies `point` against `loops`.
///
/// An empty loop list is the entire domain. A point exactly on an edge is
/// [`Side::Borderline`].
pub fn contains(loops: &[PathSegment], point: Vec2, periodic: bool) -> Result<Side, GeometryError> {
    if loops.is_empty() {
        return Ok(Side::In);
    }
    let classifier = Classifier::new(Boundary::from_path(loops, periodic)?, periodic);
    Ok(classifier.side(point))
}

/// Whether the region bounded by `loops` contains everything beyond its
/// highest edge, i.e. the loops are wound as holes in the whole domain.
pub fn is_inside_out(loops: &[PathSegment], periodic: bool) -> Result<bool, GeometryError> {
    if loops.is_empty() {
        return Ok(false);
    }
    let flat = Boundary::from_path(loops, periodic)?.flattened();
    Ok(boundary_inside_out(&flat))
}

/// Reads orientation off the topmost crossing of a vertical test column.
///
/// The column sits in the middle of the widest gap between distinct vertex
/// x values, widest first, so it never passes through a vertex and needs no
/// perturbation or retry. Ties between equally wide gaps go to the lower x.
pub(crate) fn boundary_inside_out(flat: &Boundary) -> bool {
    let Some(bounds) = flat.bounds() else {
        return false;
    };
    let periodic = flat.is_periodic();
    let mut xs: Vec<f64> = flat
        .loops()
        .iter()
        .flatten()
        .map(|c| {
            let x = c.start().x;
            if periodic { wrap_angle(x) } else { x }
        })
        .collect();
    xs.sort_by(|a, b| stable_total_cmp_f64(*a, *b));
    xs.dedup();

    let mut gaps: Vec<(f64, f64)> = xs
        .windows(2)
        .map(|w| (w[1] - w[0], 0.5 * (w[0] + w[1])))
        .collect();
    if periodic {
        if let (Some(&first), Some(&last)) = (xs.first(), xs.last()) {
            let width = first + TAU - last;
            gaps.push((width, wrap_angle(last + 0.5 * width)));
        }
    }
    gaps.sort_by(|a, b| stable_total_cmp_f64(b.0, a.0).then(stable_total_cmp_f64(a.1, b.1)));

    for (width, x) in gaps {
        if width <= 0.0 {
            continue;
        }
        let column = Curve::Line {
            start: Vec2::new(x, bounds.min[1] - 1.0),
            end: Vec2::new(x, bounds.max[1] + 1.0),
        };
        if let Some(top) = flat.crossings(&column).last() {
            return top.entering;
        }
    }
    false
}

/// Whether all of `other` lies inside, outside, or on the boundary of `loops`.
///
/// Any transversal crossing makes the answer [`Side::Out`], unless every
/// sample of `other` lies on the boundary, in which case the two coincide
/// and the answer is [`Side::Borderline`].
pub fn encompasses(
    loops: &[PathSegment],
    other: &[PathSegment],
    periodic: bool,
) -> Result<Side, GeometryError> {
    if loops.is_empty() {
        return Ok(Side::In);
    }
    let classifier = Classifier::new(Boundary::from_path(loops, periodic)?, periodic);
    classify_path(&classifier, other, periodic)
}

/// Samples every vertex of `other` and the middle of each stretch between
/// consecutive boundary crossings. A crossing that merely touches the
/// boundary yields no sample on the far side, so only real crossings can
/// mix [`Side::In`] with [`Side::Out`].
pub(crate) fn classify_path(
    classifier: &Classifier,
    other: &[PathSegment],
    periodic: bool,
) -> Result<Side, GeometryError> {
    let mut samples = Vec::new();
    for path_loop in split_loops(other)? {
        let mut cursor = path_loop[0].end();
        samples.push(cursor);
        for segment in &path_loop[1..] {
            if let Some(curve) = Curve::from_segment(cursor, segment, periodic)? {
                let mut ts = vec![0.0];
                ts.extend(
                    classifier
                        .boundary()
                        .crossings(&curve)
                        .iter()
                        .map(|c| c.segment_t),
                );
                ts.push(1.0);
                ts.dedup();
                samples.extend(ts.windows(2).map(|w| curve.point_at(0.5 * (w[0] + w[1]))));
            }
            cursor = segment.end();
            samples.push(cursor);
        }
    }

    let mut seen_in = false;
    let mut seen_out = false;
    for sample in samples {
        match classifier.side(sample) {
            Side::In => seen_in = true,
            Side::Out => seen_out = true,
            Side::Borderline => {}
        }
    }
    Ok(match (seen_in, seen_out) {
        (_, true) => Side::Out,
        (true, false) => Side::In,
        (false, false) => Side::Borderline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{polygon, reverse_loops};
    use std::f64::consts::PI;

    fn unit_square() -> Vec<PathSegment> {
        polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
        ])
    }

    #[test]
    fn unit_square_sides() {
        let square = unit_square();
        assert_eq!(contains(&square, Vec2::new(0.5, 0.5), false).unwrap(), Side::In);
        assert_eq!(contains(&square, Vec2::new(2.0, 2.0), false).unwrap(), Side::Out);
        assert_eq!(
            contains(&square, Vec2::new(0.0, 0.5), false).unwrap(),
            Side::Borderline
        );
        assert_eq!(
            contains(&square, Vec2::new(1.0, 1.0), false).unwrap(),
            Side::Borderline
        );
    }

    #[test]
    fn empty_region_is_everything() {
        assert_eq!(contains(&[], Vec2::new(9.0, 9.0), false).unwrap(), Side::In);
        assert_eq!(contains(&[], Vec2::new(9.0, 9.0), true).unwrap(), Side::In);
    }

    #[test]
    fn loop_composed_with_its_reverse_flips_interior() {
        let square = unit_square();
        let mut both = square.clone();
        both.extend(reverse_loops(&square).unwrap());
        assert_eq!(contains(&square, Vec2::new(0.25, 0.75), false).unwrap(), Side::In);
        assert_eq!(contains(&both, Vec2::new(0.25, 0.75), false).unwrap(), Side::Out);
        assert_eq!(contains(&both, Vec2::new(3.0, 0.5), false).unwrap(), Side::Out);
    }

    #[test]
    fn ray_through_a_vertex_counts_once() {
        let diamond = polygon(&[
            Vec2::new(0.0, -1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(-1.0, 0.0),
        ]);
        assert_eq!(contains(&diamond, Vec2::new(0.0, 0.0), false).unwrap(), Side::In);
        assert_eq!(contains(&diamond, Vec2::new(0.0, -2.0), false).unwrap(), Side::Out);
    }

    #[test]
    fn hole_reduces_parity() {
        let mut ring = polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 4.0),
            Vec2::new(0.0, 4.0),
        ]);
        ring.extend(polygon(&[
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 3.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(3.0, 1.0),
        ]));
        assert_eq!(contains(&ring, Vec2::new(2.0, 2.0), false).unwrap(), Side::Out);
        assert_eq!(contains(&ring, Vec2::new(0.5, 2.0), false).unwrap(), Side::In);
    }

    #[test]
    fn orientation_decides_inside_out() {
        let ccw = polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]);
        assert!(!is_inside_out(&ccw, false).unwrap());
        assert!(is_inside_out(&reverse_loops(&ccw).unwrap(), false).unwrap());
    }

    #[test]
    fn eastward_parallel_encloses_the_north_cap() {
        let cap = vec![
            PathSegment::MoveTo(Vec2::new(-PI, 1.0)),
            PathSegment::ParallelTo(Vec2::new(PI, 1.0)),
        ];
        assert!(is_inside_out(&cap, true).unwrap());
        assert_eq!(contains(&cap, Vec2::new(0.3, 1.2), true).unwrap(), Side::In);
        assert_eq!(contains(&cap, Vec2::new(0.3, 0.5), true).unwrap(), Side::Out);
    }

    #[test]
    fn seam_straddling_loop_contains_points_on_both_sides() {
        let patch = polygon(&[
            Vec2::new(3.0, -0.2),
            Vec2::new(-3.0, -0.2),
            Vec2::new(-3.0, 0.2),
            Vec2::new(3.0, 0.2),
        ]);
        assert!(!is_inside_out(&patch, true).unwrap());
        assert_eq!(contains(&patch, Vec2::new(3.1, 0.0), true).unwrap(), Side::In);
        assert_eq!(contains(&patch, Vec2::new(-3.1, 0.0), true).unwrap(), Side::In);
        assert_eq!(contains(&patch, Vec2::new(0.0, 0.0), true).unwrap(), Side::Out);
    }

    #[test]
    fn region_encompasses_itself_exactly() {
        let square = unit_square();
        assert_eq!(encompasses(&square, &square, false).unwrap(), Side::Borderline);
        let notched = polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 2.0),
        ]);
        assert_eq!(encompasses(&notched, &notched, false).unwrap(), Side::Borderline);
    }

    #[test]
    fn encompasses_inner_outer_and_crossing_paths() {
        let big = polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 4.0),
            Vec2::new(0.0, 4.0),
        ]);
        let inner = polygon(&[
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(2.0, 2.0),
        ]);
        let far = polygon(&[
            Vec2::new(10.0, 10.0),
            Vec2::new(11.0, 10.0),
            Vec2::new(11.0, 11.0),
        ]);
        let straddling = polygon(&[
            Vec2::new(3.0, 1.0),
            Vec2::new(5.0, 1.0),
            Vec2::new(5.0, 2.0),
            Vec2::new(3.0, 2.0),
        ]);
        assert_eq!(encompasses(&big, &inner, false).unwrap(), Side::In);
        assert_eq!(encompasses(&big, &far, false).unwrap(), Side::Out);
        assert_eq!(encompasses(&big, &straddling, false).unwrap(), Side::Out);
    }

    #[test]
    fn path_touching_the_boundary_from_inside_is_encompassed() {
        let big = polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 4.0),
            Vec2::new(0.0, 4.0),
        ]);
        let flush = polygon(&[
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
        ]);
        let outside_flush = polygon(&[
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(2.0, -1.0),
            Vec2::new(2.0, 0.0),
        ]);
        assert_eq!(encompasses(&big, &flush, false).unwrap(), Side::In);
        assert_eq!(encompasses(&big, &outside_flush, false).unwrap(), Side::Out);
    }
}
