use std::fmt::Write as _;

use cartography::curve::Curve;
use cartography::projection::{Projection, project_region};
use cartography::surface::Surface;
use cartography::{GeometryError, PathSegment, RenderConfig, cut_to_size, format_number, path_data};
use foundation::bounds::Aabb2;
use tracing::debug;

use crate::error::RenderError;
use crate::labels::{LabelPlacement, place_label};

/// One region ready for output: its planar outline, the SVG path data for
/// it and, when the text fits, its label.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRegion {
    pub name: String,
    pub path: Vec<PathSegment>,
    pub path_data: String,
    pub label: Option<LabelPlacement>,
}

/// Rendering entry point. Owns the configuration and the label id counter.
#[derive(Debug, Clone)]
pub struct MapRenderer {
    config: RenderConfig,
    next_label: u64,
}

impl MapRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            next_label: 0,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Clips `islands` (geographic) to the surface's frame, projects them and
    /// places `name` inside the result.
    pub fn render_region(
        &mut self,
        name: &str,
        islands: &[PathSegment],
        surface: &dyn Surface,
        projection: &dyn Projection,
    ) -> Result<RenderedRegion, RenderError> {
        let periodic = surface.is_periodic();
        let frame = surface.geo_edges();
        let clipped = cut_to_size(islands, &frame, periodic, &self.config.caps)?;
        let path = project_region(&clipped, projection, periodic, &self.config)?;
        let data = path_data(&path)?;
        let label = if path.is_empty() {
            None
        } else {
            place_label(&path, name, &self.config.labels, &self.config.caps)?
                .map(|fit| LabelPlacement::new(self.next_label_id(), name, fit))
        };
        debug!(
            name,
            segments = path.len(),
            label = label.as_ref().map(|l| l.id.as_str()),
            "rendered region"
        );
        Ok(RenderedRegion {
            name: name.to_string(),
            path,
            path_data: data,
            label,
        })
    }

    fn next_label_id(&mut self) -> String {
        let id = format!("label-{}", self.next_label);
        self.next_label += 1;
        id
    }
}

/// A standalone SVG document: region outlines, then label baselines as
/// `<defs>` paths referenced by `<textPath>`.
pub fn to_svg_document(regions: &[RenderedRegion]) -> Result<String, GeometryError> {
    let mut bounds: Option<Aabb2> = None;
    for region in regions {
        if let Some(b) = planar_bounds(&region.path)? {
            bounds = Some(bounds.map_or(b, |acc| acc.union(b)));
        }
    }
    let (min_x, min_y, width, height) = match bounds {
        Some(b) => {
            let pad = 0.02 * b.extent().max(1.0);
            (
                b.min[0] - pad,
                -b.max[1] - pad,
                b.width() + 2.0 * pad,
                b.height() + 2.0 * pad,
            )
        }
        None => (0.0, 0.0, 1.0, 1.0),
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
        format_number(min_x),
        format_number(min_y),
        format_number(width),
        format_number(height)
    );
    out.push_str("  <defs>\n");
    for label in regions.iter().filter_map(|r| r.label.as_ref()) {
        let _ = writeln!(
            out,
            r#"    <path id="{}" d="{}"/>"#,
            label.id,
            path_data(&label.arc.to_path())?
        );
    }
    out.push_str("  </defs>\n  <g class=\"regions\">\n");
    for region in regions.iter().filter(|r| !r.path.is_empty()) {
        let _ = writeln!(
            out,
            r#"    <path class="region" data-name="{}" d="{}"/>"#,
            escape(&region.name),
            region.path_data
        );
    }
    out.push_str("  </g>\n  <g class=\"labels\">\n");
    for label in regions.iter().filter_map(|r| r.label.as_ref()) {
        let _ = writeln!(
            out,
            r##"    <text font-size="{}" dominant-baseline="central" text-anchor="middle"><textPath href="#{}" startOffset="50%">{}</textPath></text>"##,
            format_number(label.font_size),
            label.id,
            escape(&label.text)
        );
    }
    out.push_str("  </g>\n</svg>\n");
    Ok(out)
}

fn planar_bounds(path: &[PathSegment]) -> Result<Option<Aabb2>, GeometryError> {
    let mut bounds: Option<Aabb2> = None;
    let mut cursor = None;
    for segment in path {
        let start = cursor.unwrap_or(segment.end());
        let b = match Curve::from_segment(start, segment, false)? {
            Some(curve) => curve.bounds(),
            None => {
                let p = segment.end();
                Aabb2::new([p.x, p.y], [p.x, p.y])
            }
        };
        bounds = Some(bounds.map_or(b, |acc| acc.union(b)));
        cursor = Some(segment.end());
    }
    Ok(bounds)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartography::projection::Equirectangular;
    use cartography::surface::Plane;
    use cartography::polygon;
    use foundation::math::Vec2;
    use pretty_assertions::assert_eq;

    fn square(cx: f64, cy: f64, half: f64) -> Vec<PathSegment> {
        polygon(&[
            Vec2::new(cx - half, cy - half),
            Vec2::new(cx + half, cy - half),
            Vec2::new(cx + half, cy + half),
            Vec2::new(cx - half, cy + half),
        ])
    }

    #[test]
    fn regions_get_sequential_label_ids() {
        let plane = Plane {
            width: 200.0,
            height: 200.0,
        };
        let projection = Equirectangular::for_surface(&plane);
        let mut renderer = MapRenderer::new(RenderConfig::default());

        let first = renderer
            .render_region("Ab", &square(-40.0, 0.0, 20.0), &plane, &projection)
            .unwrap();
        assert_eq!(first.path_data, "M-60 20 L-20 20 L-20 -20 L-60 -20 L-60 20 Z");
        assert_eq!(first.label.as_ref().map(|l| l.id.as_str()), Some("label-0"));

        let outside = renderer
            .render_region("Gone", &square(400.0, 0.0, 20.0), &plane, &projection)
            .unwrap();
        assert!(outside.path.is_empty());
        assert_eq!(outside.label, None);

        let second = renderer
            .render_region("Cd", &square(40.0, 0.0, 20.0), &plane, &projection)
            .unwrap();
        assert_eq!(second.label.as_ref().map(|l| l.id.as_str()), Some("label-1"));
    }

    #[test]
    fn document_references_label_paths_and_escapes_names() {
        let plane = Plane {
            width: 200.0,
            height: 200.0,
        };
        let projection = Equirectangular::for_surface(&plane);
        let mut renderer = MapRenderer::new(RenderConfig::default());
        let region = renderer
            .render_region("A&B", &square(0.0, 0.0, 50.0), &plane, &projection)
            .unwrap();
        let doc = to_svg_document(&[region]).unwrap();
        assert!(doc.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="-52 -52 104 104">"#));
        assert!(doc.contains(r#"<path id="label-0" d="M"#));
        assert!(doc.contains(r##"<textPath href="#label-0" startOffset="50%">A&amp;B</textPath>"##));
        assert!(doc.contains(r#"data-name="A&amp;B""#));
    }
}
