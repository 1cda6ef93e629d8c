//! SVG path-data output for planar paths.
//!
//! Map space is y-up and SVG is y-down, so `y` is negated and every arc's
//! sweep flag inverted on the way out.

use foundation::math::Vec2;

use crate::error::GeometryError;
use crate::path::PathSegment;

/// Formats a planar path as an SVG `d` attribute.
///
/// Loops that return to their `MoveTo` point are closed with `Z`. Meridian
/// and parallel segments have no planar meaning and are rejected.
pub fn path_data(path: &[PathSegment]) -> Result<String, GeometryError> {
    let mut parts: Vec<String> = Vec::with_capacity(path.len() + 1);
    let mut loop_start: Option<Vec2> = None;
    let mut last: Option<Vec2> = None;
    for segment in path {
        let part = match *segment {
            PathSegment::MoveTo(p) => {
                close_loop(&mut parts, loop_start, last);
                loop_start = Some(p);
                format!("M{} {}", format_number(p.x), format_number(-p.y))
            }
            PathSegment::LineTo(p) => format!("L{} {}", format_number(p.x), format_number(-p.y)),
            PathSegment::ArcTo {
                radius_x,
                radius_y,
                rotation,
                large_arc,
                sweep,
                end,
            } => format!(
                "A{} {} {} {} {} {} {}",
                format_number(radius_x),
                format_number(radius_y),
                format_number(-rotation.to_degrees()),
                u8::from(large_arc),
                u8::from(!sweep),
                format_number(end.x),
                format_number(-end.y)
            ),
            PathSegment::MeridianTo(_) | PathSegment::ParallelTo(_) => {
                return Err(GeometryError::UnrecognizedSegment {
                    context: "planar path",
                    segment: segment.describe(),
                });
            }
        };
        parts.push(part);
        last = Some(segment.end());
    }
    close_loop(&mut parts, loop_start, last);
    Ok(parts.join(" "))
}

fn close_loop(parts: &mut Vec<String>, start: Option<Vec2>, last: Option<Vec2>) {
    if let (Some(start), Some(last)) = (start, last)
        && start == last
    {
        parts.push("Z".to_string());
    }
}

/// Three decimals, trailing zeros dropped, never `-0`.
pub fn format_number(v: f64) -> String {
    let r = (v * 1000.0).round() / 1000.0;
    if r == 0.0 {
        "0".to_string()
    } else {
        format!("{r}")
    }
}
