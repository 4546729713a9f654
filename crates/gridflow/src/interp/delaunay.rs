//! Delaunay triangulation of scattered 2D points.
//!
//! Incremental Bowyer-Watson insertion in coordinates normalized to the unit
//! box. Points are inserted in a serpentine bucket order and located by walking
//! the mesh from the previous insertion; the cavity of each new point is grown
//! through triangle adjacency, so construction stays close to linear for
//! gridded donors. The order depends only on the input, so the same donors
//! always yield the same triangulation. Duplicate points are skipped.
use glam::DVec2;
use tracing::debug;

use crate::error::{Error, Result};
use crate::interp::index::{bounding_box, BucketGrid};

/// Relative slack on the empty-circumcircle test; cocircular points are kept out.
const INCIRCLE_EPS: f64 = 1e-12;

/// Barycentric slack accepted when locating a point on a triangle edge.
const LOCATE_EPS: f64 = 1e-10;

#[derive(Clone, Copy, Debug)]
struct Tri {
    v: [usize; 3],
    center: DVec2,
    radius2: f64,
}

impl Tri {
    fn new(v: [usize; 3], pts: &[DVec2]) -> Self {
        let (center, radius2) = circumcircle(pts[v[0]], pts[v[1]], pts[v[2]]);
        Self { v, center, radius2 }
    }

    #[inline]
    fn circumcircle_contains(&self, p: DVec2) -> bool {
        (p - self.center).length_squared() < self.radius2 * (1.0 - INCIRCLE_EPS)
    }
}

fn circumcircle(a: DVec2, b: DVec2, c: DVec2) -> (DVec2, f64) {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-18 {
        return (a, f64::INFINITY);
    }
    let (a2, b2, c2) = (a.length_squared(), b.length_squared(), c.length_squared());
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let center = DVec2::new(ux, uy);
    (center, (a - center).length_squared())
}

/// A Delaunay triangulation with a bucket locator for point queries.
#[derive(Clone, Debug)]
pub struct Triangulation {
    points: Vec<DVec2>,
    normalized: Vec<DVec2>,
    triangles: Vec<[usize; 3]>,
    origin: DVec2,
    scale: f64,
    locator: BucketGrid,
}

impl Triangulation {
    /// Triangulates `points`.
    ///
    /// Fails with [`Error::DegenerateInterpolation`] for fewer than three points
    /// or when all points are collinear.
    pub fn new(points: &[DVec2]) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::DegenerateInterpolation(format!(
                "triangulation needs at least 3 points, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidArgument(
                "triangulation points must be finite".into(),
            ));
        }

        let (lo, hi) = bounding_box(points);
        let scale = (hi - lo).max_element();
        if scale <= 0.0 {
            return Err(Error::DegenerateInterpolation(
                "all donor points coincide".into(),
            ));
        }
        let normalized: Vec<DVec2> = points.iter().map(|p| (*p - lo) / scale).collect();

        let triangles = bowyer_watson(&normalized);
        if triangles.is_empty() {
            return Err(Error::DegenerateInterpolation(
                "donor points are collinear".into(),
            ));
        }
        debug!(
            "Triangulated {} points into {} triangles.",
            points.len(),
            triangles.len()
        );

        let mut locator = BucketGrid::new(DVec2::ZERO, (hi - lo) / scale, triangles.len());
        for (id, t) in triangles.iter().enumerate() {
            let (a, b, c) = (normalized[t[0]], normalized[t[1]], normalized[t[2]]);
            locator.insert_box(id, a.min(b).min(c), a.max(b).max(c));
        }

        Ok(Self {
            points: points.to_vec(),
            normalized,
            triangles,
            origin: lo,
            scale,
            locator,
        })
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    /// Vertex indices of each triangle, counter-clockwise.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Triangle containing `p` and the barycentric weights of its vertices.
    pub fn locate(&self, p: DVec2) -> Option<(usize, [f64; 3])> {
        let q = (p - self.origin) / self.scale;
        let (bx, by) = self.locator.bucket_of(q);
        for &id in self.locator.bucket(bx, by) {
            let t = self.triangles[id];
            let w = barycentric(
                q,
                self.normalized[t[0]],
                self.normalized[t[1]],
                self.normalized[t[2]],
            );
            if w.iter().all(|&c| c >= -LOCATE_EPS) {
                return Some((id, w));
            }
        }
        None
    }

    /// Sorted, de-duplicated neighbour lists of every vertex.
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.points.len()];
        for t in &self.triangles {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                out[a].push(b);
                out[b].push(a);
            }
        }
        for list in &mut out {
            list.sort_unstable();
            list.dedup();
        }
        out
    }
}

fn barycentric(p: DVec2, a: DVec2, b: DVec2, c: DVec2) -> [f64; 3] {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let den = v0.perp_dot(v1);
    if den.abs() < f64::MIN_POSITIVE {
        return [-1.0; 3];
    }
    let wb = v2.perp_dot(v1) / den;
    let wc = v0.perp_dot(v2) / den;
    [1.0 - wb - wc, wb, wc]
}

/// Marks a missing neighbour across a hull edge.
const NONE: usize = usize::MAX;

/// Triangle of the working mesh. `n[k]` is the neighbour across the edge
/// opposite `v[k]`; vertices are counter-clockwise.
#[derive(Clone, Copy, Debug)]
struct MeshTri {
    tri: Tri,
    n: [usize; 3],
    alive: bool,
}

/// Twice the signed area of `(a, b, p)`; positive when `p` lies left of `a -> b`.
#[inline]
fn orient(a: DVec2, b: DVec2, p: DVec2) -> f64 {
    (b - a).perp_dot(p - a)
}

/// Incremental Delaunay mesh with triangle adjacency.
struct Mesh {
    pts: Vec<DVec2>,
    tris: Vec<MeshTri>,
    free: Vec<usize>,
    /// Triangle the next point location starts from.
    last: usize,
    bad: Vec<usize>,
    in_cavity: Vec<bool>,
}

impl Mesh {
    /// Mesh holding only a triangle that encloses the unit box.
    fn new(points: &[DVec2]) -> Self {
        let n = points.len();
        let mut pts = points.to_vec();
        pts.push(DVec2::new(-19.5, -10.0));
        pts.push(DVec2::new(20.5, -10.0));
        pts.push(DVec2::new(0.5, 20.0));
        let root = MeshTri {
            tri: Tri::new([n, n + 1, n + 2], &pts),
            n: [NONE; 3],
            alive: true,
        };
        Self {
            pts,
            tris: vec![root],
            free: Vec::new(),
            last: 0,
            bad: Vec::new(),
            in_cavity: vec![false],
        }
    }

    /// Triangle containing `p`, found by walking from the last inserted triangle.
    fn locate(&self, p: DVec2) -> Option<usize> {
        let mut t = self.last;
        for step in 0..self.tris.len() {
            let mt = &self.tris[t];
            let mut next = None;
            for r in 0..3 {
                // Rotate the first tested edge so walks cannot cycle.
                let k = (r + step) % 3;
                let a = self.pts[mt.tri.v[(k + 1) % 3]];
                let b = self.pts[mt.tri.v[(k + 2) % 3]];
                if orient(a, b, p) < 0.0 {
                    next = Some(mt.n[k]);
                    break;
                }
            }
            match next {
                None => return Some(t),
                Some(NONE) => break,
                Some(nb) => t = nb,
            }
        }
        self.tris.iter().position(|mt| {
            let [a, b, c] = mt.tri.v.map(|v| self.pts[v]);
            mt.alive
                && orient(a, b, p) >= 0.0
                && orient(b, c, p) >= 0.0
                && orient(c, a, p) >= 0.0
        })
    }

    /// Inserts vertex `i`; returns `false` when it duplicates an existing vertex.
    fn insert(&mut self, i: usize) -> bool {
        let p = self.pts[i];
        let Some(start) = self.locate(p) else {
            return false;
        };
        if !self.tris[start].tri.circumcircle_contains(p) {
            return false;
        }

        // Flood the cavity of triangles whose circumcircle holds `p`.
        self.bad.clear();
        self.bad.push(start);
        self.in_cavity[start] = true;
        let mut k = 0;
        while k < self.bad.len() {
            let t = self.bad[k];
            k += 1;
            for nb in self.tris[t].n {
                if nb != NONE
                    && !self.in_cavity[nb]
                    && self.tris[nb].tri.circumcircle_contains(p)
                {
                    self.in_cavity[nb] = true;
                    self.bad.push(nb);
                }
            }
        }

        // Cavity boundary as (a, b, outer neighbour), counter-clockwise around `p`.
        let mut boundary = Vec::new();
        for &t in &self.bad {
            let mt = self.tris[t];
            for e in 0..3 {
                let nb = mt.n[e];
                if nb == NONE || !self.in_cavity[nb] {
                    boundary.push((mt.tri.v[(e + 1) % 3], mt.tri.v[(e + 2) % 3], nb));
                }
            }
        }

        for &t in &self.bad {
            self.in_cavity[t] = false;
            self.tris[t].alive = false;
            self.free.push(t);
        }

        let mut created = Vec::with_capacity(boundary.len());
        for &(a, b, outer) in &boundary {
            let mesh_tri = MeshTri {
                tri: Tri::new([a, b, i], &self.pts),
                n: [NONE, NONE, outer],
                alive: true,
            };
            let id = match self.free.pop() {
                Some(id) => {
                    self.tris[id] = mesh_tri;
                    id
                }
                None => {
                    self.tris.push(mesh_tri);
                    self.in_cavity.push(false);
                    self.tris.len() - 1
                }
            };
            if outer != NONE {
                let back = &mut self.tris[outer];
                for e in 0..3 {
                    let (u, w) = (back.tri.v[(e + 1) % 3], back.tri.v[(e + 2) % 3]);
                    if u == b && w == a {
                        back.n[e] = id;
                    }
                }
            }
            created.push((a, b, id));
        }

        // New triangles [a, b, i] meet along the spokes (b, i) and (i, a).
        for &(a, b, id) in &created {
            let across_bi = created.iter().find(|c| c.0 == b).map_or(NONE, |c| c.2);
            let across_ia = created.iter().find(|c| c.1 == a).map_or(NONE, |c| c.2);
            self.tris[id].n[0] = across_bi;
            self.tris[id].n[1] = across_ia;
        }
        if let Some(&(_, _, id)) = created.last() {
            self.last = id;
        }
        true
    }
}

/// Serpentine order over a bucket grid, keeping consecutive points close.
///
/// Ties keep input order, so the first of duplicate points is the one kept.
fn insertion_order(points: &[DVec2]) -> Vec<usize> {
    let side = ((points.len() as f64).sqrt().ceil() as usize).max(1);
    let cell = |v: f64| ((v * side as f64).max(0.0) as usize).min(side - 1);
    let key = |p: DVec2| {
        let (row, col) = (cell(p.y), cell(p.x));
        let col = if row % 2 == 1 { side - 1 - col } else { col };
        row * side + col
    };
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| key(points[i]));
    order
}

/// Triangulates points normalized to the unit box; returns CCW triangles.
fn bowyer_watson(points: &[DVec2]) -> Vec<[usize; 3]> {
    let n = points.len();
    let mut mesh = Mesh::new(points);
    let mut skipped = 0usize;
    for i in insertion_order(points) {
        if !mesh.insert(i) {
            skipped += 1;
        }
    }
    if skipped > 0 {
        debug!("Skipped {skipped} duplicate points.");
    }

    let pts = &mesh.pts;
    mesh.tris
        .iter()
        .filter(|mt| mt.alive && mt.tri.v.iter().all(|&v| v < n))
        .filter(|mt| {
            let [a, b, c] = mt.tri.v.map(|v| pts[v]);
            orient(a, b, c) > 0.0
        })
        .map(|mt| mt.tri.v)
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::flow::seeding::rand01;

    fn lattice(nx: usize, ny: usize) -> Vec<DVec2> {
        (0..ny)
            .flat_map(|j| (0..nx).map(move |i| DVec2::new(i as f64, j as f64)))
            .collect()
    }

    fn total_area(tri: &Triangulation) -> f64 {
        tri.triangles()
            .iter()
            .map(|t| {
                let p = tri.points();
                0.5 * (p[t[1]] - p[t[0]]).perp_dot(p[t[2]] - p[t[0]])
            })
            .sum()
    }

    #[test]
    fn lattice_triangulation_covers_hull() {
        let tri = Triangulation::new(&lattice(4, 3)).unwrap();
        assert_eq!(tri.triangles().len(), 2 * 3 * 2);
        assert!((total_area(&tri) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn triangles_are_counter_clockwise() {
        let pts = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.1),
            DVec2::new(0.3, 1.2),
            DVec2::new(1.4, 1.0),
            DVec2::new(0.7, 0.5),
        ];
        let tri = Triangulation::new(&pts).unwrap();
        for t in tri.triangles() {
            let p = tri.points();
            assert!((p[t[1]] - p[t[0]]).perp_dot(p[t[2]] - p[t[0]]) > 0.0);
        }
    }

    #[test]
    fn empty_circumcircle_property_holds() {
        let pts: Vec<DVec2> = (0..40)
            .map(|k| {
                let k = k as f64;
                DVec2::new((k * 0.618).fract() * 10.0, (k * 0.414 + 0.1).fract() * 10.0)
            })
            .collect();
        let tri = Triangulation::new(&pts).unwrap();
        for t in tri.triangles() {
            let (c, r2) = circumcircle(pts[t[0]], pts[t[1]], pts[t[2]]);
            for (k, p) in pts.iter().enumerate() {
                if t.contains(&k) {
                    continue;
                }
                assert!((*p - c).length_squared() >= r2 * (1.0 - 1e-9));
            }
        }
    }

    #[test]
    fn locate_returns_barycentric_weights() {
        let tri = Triangulation::new(&lattice(3, 3)).unwrap();
        let (id, w) = tri.locate(DVec2::new(0.25, 0.5)).unwrap();
        let t = tri.triangles()[id];
        let p: DVec2 = (0..3).map(|k| tri.points()[t[k]] * w[k]).sum();
        assert!((p - DVec2::new(0.25, 0.5)).length() < 1e-12);
        assert!(tri.locate(DVec2::new(3.0, 0.5)).is_none());
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let pts: Vec<DVec2> = (0..5).map(|k| DVec2::new(k as f64, 2.0 * k as f64)).collect();
        assert!(matches!(
            Triangulation::new(&pts),
            Err(Error::DegenerateInterpolation(_))
        ));
        assert!(matches!(
            Triangulation::new(&pts[..2]),
            Err(Error::DegenerateInterpolation(_))
        ));
    }

    #[test]
    fn duplicates_are_skipped() {
        let mut pts = lattice(3, 3);
        pts.push(DVec2::new(1.0, 1.0));
        let tri = Triangulation::new(&pts).unwrap();
        assert!((total_area(&tri) - 4.0).abs() < 1e-9);
        assert!(tri.triangles().iter().all(|t| !t.contains(&9)));
    }

    #[test]
    fn ten_thousand_random_points_stay_delaunay() {
        let mut rng = StdRng::seed_from_u64(11);
        let pts: Vec<DVec2> = (0..10_000)
            .map(|_| DVec2::new(rand01(&mut rng) * 40.0, rand01(&mut rng) * 25.0))
            .collect();
        let tri = Triangulation::new(&pts).unwrap();
        let triangles = tri.triangles();

        // Euler: a triangulation of n points with h hull vertices has 2n - 2 - h faces.
        let mut edges: Vec<(usize, usize)> = triangles
            .iter()
            .flat_map(|t| (0..3).map(move |k| (t[k], t[(k + 1) % 3])))
            .collect();
        edges.sort_unstable();
        let hull = edges
            .iter()
            .filter(|&&(a, b)| edges.binary_search(&(b, a)).is_err())
            .count();
        assert_eq!(triangles.len(), 2 * pts.len() - 2 - hull);

        let mut used = vec![false; pts.len()];
        triangles.iter().flatten().for_each(|&v| used[v] = true);
        assert!(used.iter().all(|&u| u));

        for t in triangles.iter().step_by(53) {
            let (c, r2) = circumcircle(pts[t[0]], pts[t[1]], pts[t[2]]);
            for (k, p) in pts.iter().enumerate() {
                if !t.contains(&k) {
                    assert!((*p - c).length_squared() >= r2 * (1.0 - 1e-9));
                }
            }
        }
    }

    #[test]
    fn large_lattice_is_fully_triangulated() {
        let tri = Triangulation::new(&lattice(100, 100)).unwrap();
        assert_eq!(tri.triangles().len(), 2 * 99 * 99);
        assert!((total_area(&tri) - 99.0 * 99.0).abs() < 1e-6);
    }
}
