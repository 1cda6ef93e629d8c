//! Region rendering above the geometry engine: label placement and the map
//! renderer that drives clipping, projection and SVG output.

pub mod error;
pub mod fit;
pub mod labels;
pub mod map;
pub mod polygon;
pub mod skeleton;

pub use error::{LabelError, RenderError};
pub use labels::{LabelArc, LabelFit, LabelPlacement, place_label};
pub use map::{MapRenderer, RenderedRegion, to_svg_document};
