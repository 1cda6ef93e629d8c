use std::f64::consts::{FRAC_PI_2, PI};

use foundation::StepBudget;
use foundation::math::{Place, Vec2, unwrap_near};
use tracing::trace;

use crate::config::RenderConfig;
use crate::error::GeometryError;
use crate::path::PathSegment;
use crate::surface::Surface;

/// Subdivision depth at which a projected chord is accepted regardless of
/// its deviation.
const MAX_SUBDIVISION_DEPTH: u32 = 24;

/// Maps geographic places into the drawing plane.
///
/// `draw_meridian` and `draw_parallel` return planar segments that continue
/// from the projection of the curve's start, which the caller has already
/// emitted.
pub trait Projection {
    fn project_point(&self, place: Place) -> Vec2;
    fn draw_meridian(&self, phi0: f64, phi1: f64, lambda: f64) -> Vec<PathSegment>;
    fn draw_parallel(&self, lambda0: f64, lambda1: f64, phi: f64) -> Vec<PathSegment>;

    /// Parameter-space midpoint. On periodic surfaces `b` is already
    /// unwrapped to within π of `a`.
    fn midpoint(&self, a: Place, b: Place) -> Place {
        Place::new(0.5 * (a.phi + b.phi), 0.5 * (a.lambda + b.lambda))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Equirectangular {
    /// Map units per radian of λ.
    pub scale: f64,
    /// Extra vertical factor for φ.
    pub aspect: f64,
    pub central_lambda: f64,
}

impl Equirectangular {
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            aspect: 1.0,
            central_lambda: 0.0,
        }
    }

    pub fn for_surface(surface: &dyn Surface) -> Self {
        Self {
            scale: surface.length_scale(),
            aspect: surface.aspect(),
            central_lambda: 0.0,
        }
    }
}

impl Projection for Equirectangular {
    fn project_point(&self, place: Place) -> Vec2 {
        Vec2::new(
            self.scale * (place.lambda - self.central_lambda),
            self.scale * self.aspect * place.phi,
        )
    }

    fn draw_meridian(&self, _phi0: f64, phi1: f64, lambda: f64) -> Vec<PathSegment> {
        vec![PathSegment::LineTo(self.project_point(Place::new(phi1, lambda)))]
    }

    fn draw_parallel(&self, _lambda0: f64, lambda1: f64, phi: f64) -> Vec<PathSegment> {
        vec![PathSegment::LineTo(self.project_point(Place::new(phi, lambda1)))]
    }
}

/// North-pole-centred azimuthal equidistant projection: radius grows
/// linearly from the pole, λ = 0 points down the page.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AzimuthalEquidistant {
    pub scale: f64,
}

impl AzimuthalEquidistant {
    pub fn for_surface(surface: &dyn Surface) -> Self {
        Self {
            scale: surface.length_scale(),
        }
    }

    fn radius_at(&self, phi: f64) -> f64 {
        (FRAC_PI_2 - phi) * self.scale
    }
}

impl Projection for AzimuthalEquidistant {
    fn project_point(&self, place: Place) -> Vec2 {
        let r = self.radius_at(place.phi);
        Vec2::new(r * place.lambda.sin(), -r * place.lambda.cos())
    }

    fn draw_meridian(&self, _phi0: f64, phi1: f64, lambda: f64) -> Vec<PathSegment> {
        vec![PathSegment::LineTo(self.project_point(Place::new(phi1, lambda)))]
    }

    /// Parallels are circles about the pole, drawn as arcs of at most half a
    /// turn so the large-arc flag is never ambiguous.
    fn draw_parallel(&self, lambda0: f64, lambda1: f64, phi: f64) -> Vec<PathSegment> {
        let r = self.radius_at(phi);
        let span = lambda1 - lambda0;
        if r <= 0.0 || span == 0.0 {
            return Vec::new();
        }
        let pieces = ((span.abs() / PI - 1e-9).ceil() as usize).max(1);
        (1..=pieces)
            .map(|k| {
                let lambda = if k == pieces {
                    lambda1
                } else {
                    lambda0 + span * k as f64 / pieces as f64
                };
                PathSegment::ArcTo {
                    radius_x: r,
                    radius_y: r,
                    rotation: 0.0,
                    large_arc: false,
                    sweep: span > 0.0,
                    end: self.project_point(Place::new(phi, lambda)),
                }
            })
            .collect()
    }
}

/// Projects a geographic path into the plane.
///
/// `LineTo` is straight in parameter space, so it is bisected until each
/// projected midpoint lies within `config.frame_precision` of its chord.
/// Meridians and parallels are delegated to the projection.
pub fn project_region(
    path: &[PathSegment],
    projection: &dyn Projection,
    periodic: bool,
    config: &RenderConfig,
) -> Result<Vec<PathSegment>, GeometryError> {
    let mut budget = StepBudget::new(config.caps.subdivision);
    let mut out = Vec::with_capacity(path.len());
    let mut cursor: Option<Place> = None;
    for segment in path {
        let target = Place::from_coord(segment.end());
        let from = match (segment, cursor) {
            (PathSegment::MoveTo(_), _) => {
                out.push(PathSegment::MoveTo(projection.project_point(target)));
                cursor = Some(target);
                continue;
            }
            (_, Some(from)) => from,
            (_, None) => {
                return Err(GeometryError::UnrecognizedSegment {
                    context: "path start",
                    segment: segment.describe(),
                });
            }
        };
        cursor = Some(match *segment {
            PathSegment::LineTo(_) => {
                let to = if periodic {
                    Place::new(target.phi, unwrap_near(target.lambda, from.lambda))
                } else {
                    target
                };
                subdivide(from, to, projection, config.frame_precision, &mut budget, &mut out)?;
                to
            }
            PathSegment::MeridianTo(_) => {
                out.extend(projection.draw_meridian(from.phi, target.phi, from.lambda));
                Place::new(target.phi, from.lambda)
            }
            PathSegment::ParallelTo(_) => {
                out.extend(projection.draw_parallel(from.lambda, target.lambda, from.phi));
                Place::new(from.phi, target.lambda)
            }
            PathSegment::ArcTo { .. } | PathSegment::MoveTo(_) => {
                return Err(GeometryError::UnrecognizedSegment {
                    context: "geographic path",
                    segment: segment.describe(),
                });
            }
        });
    }
    trace!(
        input = path.len(),
        output = out.len(),
        bisections = budget.consumed_units(),
        "projected region"
    );
    Ok(out)
}

fn subdivide(
    a: Place,
    b: Place,
    projection: &dyn Projection,
    precision: f64,
    budget: &mut StepBudget,
    out: &mut Vec<PathSegment>,
) -> Result<(), GeometryError> {
    let mut stack = vec![(a, b, 0u32)];
    while let Some((p, q, depth)) = stack.pop() {
        let pq = projection.project_point(q);
        let m = projection.midpoint(p, q);
        let chord_mid = projection.project_point(p).midpoint(pq);
        if depth >= MAX_SUBDIVISION_DEPTH
            || projection.project_point(m).distance(chord_mid) <= precision
        {
            out.push(PathSegment::LineTo(pq));
            continue;
        }
        if !budget.try_consume(1) {
            return Err(GeometryError::runaway(
                "projection subdivision",
                budget.limit(),
                format!(
                    "line from ({}, {}) to ({}, {}) did not converge",
                    a.phi, a.lambda, b.phi, b.lambda
                ),
            ));
        }
        stack.push((m, q, depth + 1));
        stack.push((p, m, depth + 1));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IterationCaps;
    use pretty_assertions::assert_eq;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn equirectangular_lines_stay_single() {
        let proj = Equirectangular::new(10.0);
        let path = vec![
            PathSegment::MoveTo(Vec2::new(0.0, 0.0)),
            PathSegment::LineTo(Vec2::new(1.0, 0.5)),
            PathSegment::MeridianTo(Vec2::new(1.0, -0.5)),
        ];
        let out = project_region(&path, &proj, true, &RenderConfig::default()).unwrap();
        assert_eq!(
            out,
            vec![
                PathSegment::MoveTo(Vec2::new(0.0, 0.0)),
                PathSegment::LineTo(Vec2::new(10.0, 5.0)),
                PathSegment::LineTo(Vec2::new(10.0, -5.0)),
            ]
        );
    }

    #[test]
    fn full_parallel_becomes_two_half_arcs() {
        let proj = AzimuthalEquidistant { scale: 1.0 };
        let arcs = proj.draw_parallel(-PI, PI, 0.0);
        assert_eq!(arcs.len(), 2);
        let start = proj.project_point(Place::new(0.0, -PI));
        let end = arcs[1].end();
        assert_close(end.x, start.x, 1e-12);
        assert_close(end.y, start.y, 1e-12);
        assert!(matches!(arcs[0], PathSegment::ArcTo { sweep: true, large_arc: false, .. }));
    }

    #[test]
    fn curved_lines_are_bisected_within_precision() {
        let proj = AzimuthalEquidistant { scale: 100.0 };
        let path = vec![
            PathSegment::MoveTo(Vec2::new(0.0, 0.0)),
            PathSegment::LineTo(Vec2::new(FRAC_PI_2, 0.0)),
        ];
        let out = project_region(&path, &proj, true, &RenderConfig::default()).unwrap();
        assert!(out.len() > 4, "only {} segments", out.len());
        let rim = FRAC_PI_2 * 100.0;
        for segment in &out {
            assert_close(segment.end().length(), rim, 1e-9);
        }
    }

    #[test]
    fn geographic_arc_is_rejected() {
        let path = vec![
            PathSegment::MoveTo(Vec2::new(0.0, 0.0)),
            PathSegment::ArcTo {
                radius_x: 1.0,
                radius_y: 1.0,
                rotation: 0.0,
                large_arc: false,
                sweep: true,
                end: Vec2::new(1.0, 0.0),
            },
        ];
        assert!(matches!(
            project_region(&path, &Equirectangular::new(1.0), true, &RenderConfig::default()),
            Err(GeometryError::UnrecognizedSegment { .. })
        ));
    }

    #[test]
    fn subdivision_cap_is_enforced() {
        let config = RenderConfig {
            caps: IterationCaps {
                subdivision: 0,
                ..IterationCaps::default()
            },
            ..RenderConfig::default()
        };
        let path = vec![
            PathSegment::MoveTo(Vec2::new(0.0, 0.0)),
            PathSegment::LineTo(Vec2::new(FRAC_PI_2, 0.0)),
        ];
        assert!(matches!(
            project_region(&path, &AzimuthalEquidistant { scale: 100.0 }, true, &config),
            Err(GeometryError::RunawayIteration { .. })
        ));
    }
}
