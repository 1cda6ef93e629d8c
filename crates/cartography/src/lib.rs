//! Geometry core for turning geographic regions into drawable planar paths.
//!
//! Data flow: [`outline`] extracts boundary loops from a tile mesh, [`clip`]
//! cuts them to a [`frame::Frame`], [`crossing`] and [`containment`] answer
//! the intersection and inclusion questions the clipper (and hit-testing)
//! needs, and [`projection`] maps the result into the drawing plane.

pub mod clip;
pub mod config;
pub mod containment;
pub mod crossing;
pub mod curve;
pub mod error;
pub mod frame;
pub mod mesh;
pub mod outline;
pub mod path;
pub mod projection;
pub mod surface;
pub mod svg;

pub use clip::cut_to_size;
pub use config::*;
pub use containment::{contains, encompasses, is_inside_out};
pub use error::*;
pub use frame::*;
pub use mesh::{Mesh, TriangleMesh};
pub use outline::{BoundaryVertex, Outline, trace_outline};
pub use path::*;
pub use projection::{AzimuthalEquidistant, Equirectangular, Projection, project_region};
pub use surface::{Disc, Plane, Spheroid, Surface, Toroid};
pub use svg::{format_number, path_data};
