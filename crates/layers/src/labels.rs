//! Curved region labels.
//!
//! A label is a band laid along a circular (or straight) axis fitted to the
//! region's approximate medial axis. Candidate axes come from skeleton
//! spines found at decreasing clearance thresholds, and from the straight
//! runs of those spines between sharp bends; each is widened into the
//! tallest band that fits the text, and the best-scoring band wins.

use std::collections::BTreeSet;

use cartography::{IterationCaps, LabelConfig, PathSegment};
use foundation::StepBudget;
use foundation::math::Vec2;
use tracing::{debug, trace};

use crate::error::LabelError;
use crate::fit::{Axis, Band, BandFitter};
use crate::polygon::LabelPolygon;
use crate::skeleton::{Skeleton, Triangulation};

/// The text baseline, through the middle of the band, in reading order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelArc {
    pub start: Vec2,
    pub end: Vec2,
    /// `None` for a straight baseline.
    pub center: Option<Vec2>,
    /// Infinite for a straight baseline.
    pub radius: f64,
    /// Angle of `start` about `center`; the direction of travel when straight.
    pub start_angle: f64,
    /// Signed, counter-clockwise positive; zero when straight.
    pub angular_span: f64,
}

impl LabelArc {
    fn along(axis: &Axis, band: &Band) -> Self {
        let half = 0.5 * band.width;
        match *axis {
            Axis::Line { .. } => {
                let (mut start, mut end) = (
                    axis.to_world(band.u_center - half, 0.0),
                    axis.to_world(band.u_center + half, 0.0),
                );
                if reads_backwards(end - start) {
                    std::mem::swap(&mut start, &mut end);
                }
                Self {
                    start,
                    end,
                    center: None,
                    radius: f64::INFINITY,
                    start_angle: (end - start).angle(),
                    angular_span: 0.0,
                }
            }
            Axis::Circle {
                center,
                radius,
                reference,
            } => {
                let mid_angle = reference + band.u_center / radius;
                let span = band.width / radius;
                let (start_angle, angular_span) = if reads_backwards(axis.tangent(band.u_center)) {
                    (mid_angle + 0.5 * span, -span)
                } else {
                    (mid_angle - 0.5 * span, span)
                };
                Self {
                    start: center + Vec2::from_angle(start_angle) * radius,
                    end: center + Vec2::from_angle(start_angle + angular_span) * radius,
                    center: Some(center),
                    radius,
                    start_angle,
                    angular_span,
                }
            }
        }
    }

    /// The baseline as a planar path.
    pub fn to_path(&self) -> Vec<PathSegment> {
        let draw = match self.center {
            None => PathSegment::LineTo(self.end),
            Some(_) => PathSegment::ArcTo {
                radius_x: self.radius,
                radius_y: self.radius,
                rotation: 0.0,
                large_arc: self.angular_span.abs() > std::f64::consts::PI,
                sweep: self.angular_span > 0.0,
                end: self.end,
            },
        };
        vec![PathSegment::MoveTo(self.start), draw]
    }

    /// Point on the baseline `offset` to the left of travel, at fraction `t`.
    pub fn point_at(&self, t: f64, offset: f64) -> Vec2 {
        match self.center {
            None => {
                let d = self.end - self.start;
                let normal = d.perp() * (1.0 / d.length());
                self.start.lerp(self.end, t) + normal * offset
            }
            Some(center) => {
                let angle = self.start_angle + self.angular_span * t;
                let inward = if self.angular_span > 0.0 { -offset } else { offset };
                center + Vec2::from_angle(angle) * (self.radius + inward)
            }
        }
    }
}

/// Text reads left to right; straight up when vertical, rounding included.
fn reads_backwards(direction: Vec2) -> bool {
    if direction.x.abs() <= 1e-9 * direction.y.abs() {
        direction.y < 0.0
    } else {
        direction.x < 0.0
    }
}

/// A spine bends sharply where some node strays from the chord between its
/// ends by more than this fraction of the chord.
const BEND_SPLIT: f64 = 0.2;

/// A placement before it is given an identity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelFit {
    pub arc: LabelArc,
    pub font_size: f64,
    pub half_height: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlacement {
    /// Unique per renderer, `label-N`.
    pub id: String,
    pub text: String,
    pub arc: LabelArc,
    pub font_size: f64,
    pub half_height: f64,
    pub score: f64,
}

impl LabelPlacement {
    pub fn new(id: String, text: &str, fit: LabelFit) -> Self {
        Self {
            id,
            text: text.to_string(),
            arc: fit.arc,
            font_size: fit.font_size,
            half_height: fit.half_height,
            score: fit.score,
        }
    }
}

/// Places `text` inside the planar `outline`.
///
/// Returns `Ok(None)` when no band reaches `config.min_font_size`.
pub fn place_label(
    outline: &[PathSegment],
    text: &str,
    config: &LabelConfig,
    caps: &IterationCaps,
) -> Result<Option<LabelFit>, LabelError> {
    let chars = text.chars().count();
    if chars == 0 {
        return Ok(None);
    }
    let Some(polygon) = LabelPolygon::from_outline(outline)? else {
        return Ok(None);
    };
    let mut simplify_budget = StepBudget::new(caps.simplify);
    let polygon = polygon.normalized(config.min_vertices, config.max_vertices, &mut simplify_budget)?;

    let mut budget = StepBudget::new(caps.skeleton);
    let triangulation = Triangulation::new(&polygon, &mut budget)?;
    let skeleton = Skeleton::new(&triangulation, &polygon);
    let spines = candidate_spines(&skeleton, config, &mut budget)?;
    let h_cap = skeleton
        .nodes()
        .iter()
        .map(|n| n.clearance)
        .fold(0.0, f64::max);
    let width_per_height = 2.0 * config.char_aspect * chars as f64 / (1.0 + config.line_padding);

    let mut best: Option<LabelFit> = None;
    for spine in &spines {
        let points: Vec<Vec2> = spine.iter().map(|&i| skeleton.nodes()[i].position).collect();
        for axis in Axis::candidates(&points) {
            let (axis, hint) = axis.centered(&polygon, &points);
            let h_max = h_cap.min(config.max_bend_ratio * axis.radius());
            let Some(band) = BandFitter::new(axis, &polygon).fit(width_per_height, h_max, hint)
            else {
                continue;
            };
            let fit = score(&axis, &band, config);
            trace!(
                nodes = spine.len(),
                radius = axis.radius(),
                half_height = band.half_height,
                score = fit.score,
                "label candidate"
            );
            if best.is_none_or(|b| fit.score > b.score) {
                best = Some(fit);
            }
        }
    }

    let placed = best.filter(|fit| fit.font_size >= config.min_font_size);
    debug!(
        text,
        candidates = spines.len(),
        font_size = placed.map(|f| f.font_size),
        "label placement"
    );
    Ok(placed)
}

/// Diverse skeleton spines, widest first.
///
/// The clearance threshold starts at the widest skeleton edge and decays
/// geometrically; a spine is kept when at least half of its nodes are not on
/// an earlier one. A kept spine that bends sharply is followed by its
/// straight runs.
fn candidate_spines(
    skeleton: &Skeleton,
    config: &LabelConfig,
    budget: &mut StepBudget,
) -> Result<Vec<Vec<usize>>, LabelError> {
    let min_half_height = 0.5 * config.min_font_size * (1.0 + config.line_padding);
    let decay = config.threshold_decay.clamp(0.05, 0.95);
    let mut used = BTreeSet::new();
    let mut spines = Vec::new();
    let Some(mut threshold) = skeleton.max_edge_clearance() else {
        return Ok(spines);
    };
    while threshold >= min_half_height && spines.len() < config.max_candidates {
        for spine in skeleton.spines(threshold, budget)? {
            if spines.len() >= config.max_candidates {
                break;
            }
            let fresh = spine.iter().filter(|n| !used.contains(*n)).count();
            if 2 * fresh < spine.len() {
                continue;
            }
            used.extend(spine.iter().copied());
            let mut runs = Vec::new();
            straight_runs(&spine, skeleton, &mut runs);
            spines.push(spine);
            if runs.len() > 1 {
                let room = config.max_candidates - spines.len();
                spines.extend(runs.into_iter().take(room));
            }
        }
        threshold *= decay;
    }
    Ok(spines)
}

/// Splits `spine` at its farthest node from the chord while that node strays
/// more than [`BEND_SPLIT`] of the chord, keeping runs of three nodes or more.
fn straight_runs(spine: &[usize], skeleton: &Skeleton, out: &mut Vec<Vec<usize>>) {
    let nodes = skeleton.nodes();
    let (Some(&first), Some(&last)) = (spine.first(), spine.last()) else {
        return;
    };
    let a = nodes[first].position;
    let chord = nodes[last].position - a;
    let length = chord.length();
    let bend = (1..spine.len().saturating_sub(1))
        .map(|k| (k, chord.cross(nodes[spine[k]].position - a).abs()))
        .max_by(|x, y| x.1.total_cmp(&y.1));
    match bend {
        Some((k, offset)) if offset > BEND_SPLIT * length * length => {
            straight_runs(&spine[..=k], skeleton, out);
            straight_runs(&spine[k..], skeleton, out);
        }
        _ if spine.len() >= 3 => out.push(spine.to_vec()),
        _ => {}
    }
}

fn score(axis: &Axis, band: &Band, config: &LabelConfig) -> LabelFit {
    let h = band.half_height;
    let bend = h / axis.radius();
    let tangent = axis.tangent(band.u_center);
    let area = 2.0 * h * band.width;
    let curvature = 1.0 / (1.0 + config.curvature_penalty * bend);
    let vertical = (1.0 - config.vertical_penalty * tangent.y * tangent.y).max(0.0);
    LabelFit {
        arc: LabelArc::along(axis, band),
        font_size: 2.0 * h / (1.0 + config.line_padding),
        half_height: h,
        score: area * curvature * vertical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartography::{Side, contains, polygon};
    use std::f64::consts::TAU;

    fn ellipse(a: f64, b: f64, n: usize) -> Vec<PathSegment> {
        let ring: Vec<Vec2> = (0..n)
            .map(|k| {
                let t = TAU * k as f64 / n as f64;
                Vec2::new(a * t.cos(), b * t.sin())
            })
            .collect();
        polygon(&ring)
    }

    fn place(outline: &[PathSegment], text: &str) -> Option<LabelFit> {
        place_label(outline, text, &LabelConfig::default(), &IterationCaps::default()).unwrap()
    }

    #[test]
    fn small_region_has_no_label() {
        assert_eq!(place(&ellipse(2.0, 2.0, 12), "Tiny"), None);
    }

    #[test]
    fn empty_text_has_no_label() {
        assert_eq!(place(&ellipse(200.0, 60.0, 48), ""), None);
    }

    #[test]
    fn wide_convex_region_gets_a_level_label_that_fits() {
        let outline = ellipse(200.0, 60.0, 48);
        let fit = place(&outline, "Label").expect("label fits");
        let run = fit.arc.end - fit.arc.start;
        assert!(run.x > 0.0, "reads left to right: {:?}", fit.arc);
        assert!(run.y.abs() < 0.05 * run.x, "near horizontal: {:?}", fit.arc);
        assert!(fit.font_size >= LabelConfig::default().min_font_size);
        assert!(fit.half_height > 30.0, "band uses the room: {}", fit.half_height);

        let h = 0.99 * fit.half_height;
        for i in 0..=10 {
            let t = 0.005 + 0.099 * i as f64;
            for offset in [-h, 0.0, h] {
                let p = fit.arc.point_at(t, offset);
                assert_eq!(contains(&outline, p, false).unwrap(), Side::In, "{p:?}");
            }
        }
    }

    #[test]
    fn rectangle_label_is_bounded_by_its_height() {
        let outline = polygon(&[
            Vec2::new(-20.0, -20.0),
            Vec2::new(20.0, -20.0),
            Vec2::new(20.0, 20.0),
            Vec2::new(-20.0, 20.0),
        ]);
        let fit = place(&outline, "Ab").expect("label fits");
        assert!((fit.half_height - 20.0).abs() < 1e-6, "{fit:?}");
        assert!((fit.arc.start.x + 20.0).abs() < 1e-5, "{fit:?}");
        assert!((fit.arc.end.x - 20.0).abs() < 1e-5, "{fit:?}");
    }

    #[test]
    fn bent_region_is_labelled_along_one_straight_arm() {
        let outline = polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(300.0, 0.0),
            Vec2::new(300.0, 40.0),
            Vec2::new(40.0, 40.0),
            Vec2::new(40.0, 300.0),
            Vec2::new(0.0, 300.0),
        ]);
        let fit = place(&outline, "Ell").expect("label fits");
        assert!(fit.half_height > 19.9, "{fit:?}");
        assert!(fit.half_height <= 20.0 + 1e-9, "{fit:?}");
        assert_eq!(fit.arc.center, None);
        let run = fit.arc.end - fit.arc.start;
        assert!(run.x > 0.0 && run.y.abs() < 1e-3 * run.x, "{fit:?}");
        assert!(fit.arc.start.x > 40.0, "clear of the corner: {fit:?}");
    }

    #[test]
    fn long_strip_gets_a_straight_axis_along_its_length() {
        let outline = polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(30.0, 0.0),
            Vec2::new(30.0, 400.0),
            Vec2::new(0.0, 400.0),
        ]);
        let fit = place(&outline, "Tall").expect("label fits");
        assert_eq!(fit.arc.center, None);
        assert!(fit.half_height > 14.9, "{fit:?}");
        let run = fit.arc.end - fit.arc.start;
        // Vertical text reads upwards.
        assert!(run.y > 0.0 && run.x.abs() < 1e-3 * run.y, "{fit:?}");
        assert!((fit.arc.start.x - 15.0).abs() < 1e-6, "{fit:?}");
    }

    #[test]
    fn arcs_read_left_to_right_on_either_side_of_the_center() {
        let band = Band {
            u_center: 0.0,
            half_height: 1.0,
            width: 10.0,
        };
        let below = Axis::Circle {
            center: Vec2::new(0.0, 100.0),
            radius: 100.0,
            reference: -std::f64::consts::FRAC_PI_2,
        };
        let above = Axis::Circle {
            center: Vec2::new(0.0, -100.0),
            radius: 100.0,
            reference: std::f64::consts::FRAC_PI_2,
        };
        for axis in [below, above] {
            let arc = LabelArc::along(&axis, &band);
            assert!(arc.end.x > arc.start.x, "{arc:?}");
            let mid = arc.point_at(0.5, 0.0);
            assert!(mid.x.abs() < 1e-9, "{arc:?}");
        }
    }
}
