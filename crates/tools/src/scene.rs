//! JSON inputs for the `chart` binary.
//!
//! Angular surfaces take `[lon, lat]` pairs in degrees; a plane takes its
//! coordinates as given.

use cartography::projection::{AzimuthalEquidistant, Equirectangular, Projection};
use cartography::surface::{Disc, Plane, Spheroid, Surface, Toroid};
use cartography::{PathSegment, TriangleMesh, polygon};
use foundation::math::{Place, Vec2};
use serde::Deserialize;

#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceSpec {
    Spheroid {
        radius: f64,
        #[serde(default)]
        flattening: f64,
    },
    Toroid {
        major_radius: f64,
        minor_radius: f64,
    },
    Disc {
        radius: f64,
    },
    Plane {
        width: f64,
        height: f64,
    },
}

impl SurfaceSpec {
    pub fn build(&self) -> Box<dyn Surface> {
        match *self {
            SurfaceSpec::Spheroid { radius, flattening } => Box::new(Spheroid { radius, flattening }),
            SurfaceSpec::Toroid {
                major_radius,
                minor_radius,
            } => Box::new(Toroid {
                major_radius,
                minor_radius,
            }),
            SurfaceSpec::Disc { radius } => Box::new(Disc { radius }),
            SurfaceSpec::Plane { width, height } => Box::new(Plane { width, height }),
        }
    }

    /// Input pair to a surface coordinate (`x = λ`, `y = φ`).
    pub fn coord(&self, [x, y]: [f64; 2]) -> Vec2 {
        match self {
            SurfaceSpec::Plane { .. } => Vec2::new(x, y),
            _ => Vec2::new(x.to_radians(), y.to_radians()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionSpec {
    #[default]
    Equirectangular,
    Azimuthal,
}

impl ProjectionSpec {
    pub fn build(&self, surface: &dyn Surface) -> Box<dyn Projection> {
        match self {
            ProjectionSpec::Equirectangular => Box::new(Equirectangular::for_surface(surface)),
            ProjectionSpec::Azimuthal => Box::new(AzimuthalEquidistant::for_surface(surface)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub loops: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SceneSpec {
    pub surface: SurfaceSpec,
    #[serde(default)]
    pub projection: ProjectionSpec,
    pub regions: Vec<RegionSpec>,
}

impl SceneSpec {
    pub fn from_json_str(payload: &str) -> Result<Self, String> {
        serde_json::from_str(payload).map_err(|e| format!("scene json: {e}"))
    }

    /// Closed island loops for `region` in surface coordinates.
    pub fn islands(&self, region: &RegionSpec) -> Vec<PathSegment> {
        region
            .loops
            .iter()
            .flat_map(|ring| {
                let ring: Vec<Vec2> = ring.iter().map(|&p| self.surface.coord(p)).collect();
                polygon(&ring)
            })
            .collect()
    }
}

/// A tile mesh plus the tiles that make up one region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeshSpec {
    pub surface: SurfaceSpec,
    #[serde(default)]
    pub projection: ProjectionSpec,
    #[serde(default = "default_mesh_name")]
    pub name: String,
    pub tiles: Vec<[f64; 2]>,
    pub triangles: Vec<[usize; 3]>,
    pub included: Vec<bool>,
}

fn default_mesh_name() -> String {
    "region".to_string()
}

impl MeshSpec {
    pub fn from_json_str(payload: &str) -> Result<Self, String> {
        serde_json::from_str(payload).map_err(|e| format!("mesh json: {e}"))
    }

    pub fn mesh(&self, periodic: bool) -> Result<TriangleMesh, String> {
        let places = self
            .tiles
            .iter()
            .map(|&p| Place::from_coord(self.surface.coord(p)))
            .collect();
        TriangleMesh::new(places, self.triangles.clone(), periodic).map_err(|e| format!("mesh: {e}"))
    }
}
