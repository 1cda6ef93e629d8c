use std::collections::BTreeMap;

use foundation::math::{Place, Vec2, unwrap_near};

use crate::error::GeometryError;

/// Navigation the outline tracer needs from a tile mesh.
///
/// Tiles are the mesh's vertices; triangles are counter-clockwise triples of
/// tiles. `left_of(a, b)` is the triangle that has the directed edge `a -> b`
/// on its boundary, i.e. lies to the left of it. On a surface with a true edge
/// the hull edges have no triangle on one side.
pub trait Mesh {
    fn tile_count(&self) -> usize;
    fn neighbors(&self, tile: usize) -> &[usize];
    fn left_of(&self, from: usize, to: usize) -> Option<usize>;
    fn triangle_tiles(&self, triangle: usize) -> [usize; 3];
    fn circumcenter(&self, triangle: usize) -> Place;
}

/// Arena-backed triangle mesh with explicit adjacency tables.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    places: Vec<Place>,
    triangles: Vec<[usize; 3]>,
    centers: Vec<Place>,
    neighbors: Vec<Vec<usize>>,
    left: BTreeMap<(usize, usize), usize>,
}

impl TriangleMesh {
    /// Builds the mesh from tile places and counter-clockwise triangles.
    ///
    /// Circumcenters are computed in (λ, φ) parameter space, with λ taken the
    /// short way round when `periodic` is set.
    pub fn new(
        places: Vec<Place>,
        triangles: Vec<[usize; 3]>,
        periodic: bool,
    ) -> Result<Self, GeometryError> {
        let n = places.len();
        let mut neighbors = vec![Vec::new(); n];
        let mut left = BTreeMap::new();
        for (t, tri) in triangles.iter().enumerate() {
            let [a, b, c] = *tri;
            if a >= n || b >= n || c >= n || a == b || b == c || c == a {
                return Err(GeometryError::DegenerateGeometry(format!(
                    "triangle {t} has invalid tiles {tri:?}"
                )));
            }
            for (from, to) in [(a, b), (b, c), (c, a)] {
                if left.insert((from, to), t).is_some() {
                    return Err(GeometryError::DegenerateGeometry(format!(
                        "directed edge {from}->{to} belongs to two triangles"
                    )));
                }
                neighbors[from].push(to);
                neighbors[to].push(from);
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }
        let centers = triangles
            .iter()
            .map(|tri| circumcenter_of(tri.map(|i| places[i]), periodic))
            .collect();
        Ok(Self {
            places,
            triangles,
            centers,
            neighbors,
            left,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

impl Mesh for TriangleMesh {
    fn tile_count(&self) -> usize {
        self.places.len()
    }

    fn neighbors(&self, tile: usize) -> &[usize] {
        self.neighbors.get(tile).map_or(&[], Vec::as_slice)
    }

    fn left_of(&self, from: usize, to: usize) -> Option<usize> {
        self.left.get(&(from, to)).copied()
    }

    fn triangle_tiles(&self, triangle: usize) -> [usize; 3] {
        self.triangles[triangle]
    }

    fn circumcenter(&self, triangle: usize) -> Place {
        self.centers[triangle]
    }
}

fn circumcenter_of(corners: [Place; 3], periodic: bool) -> Place {
    let a = corners[0].to_coord();
    let mut b = corners[1].to_coord();
    let mut c = corners[2].to_coord();
    if periodic {
        b.x = unwrap_near(b.x, a.x);
        c.x = unwrap_near(c.x, a.x);
    }
    let ab = b - a;
    let ac = c - a;
    let d = 2.0 * ab.cross(ac);
    if d == 0.0 {
        let centroid = Vec2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
        return Place::from_coord(centroid);
    }
    let ab2 = ab.length_sq();
    let ac2 = ac.length_sq();
    let offset = Vec2::new(
        (ac.y * ab2 - ab.y * ac2) / d,
        (ab.x * ac2 - ac.x * ab2) / d,
    );
    Place::from_coord(a + offset)
}
