//! Interpolation over unordered donor points.
//!
//! The triangulation is built once at construction; queries locate the
//! containing triangle through a bucket grid. Points outside the convex hull
//! have no triangle, and [`ScatteredInterpolant::sample_or_nearest`] falls
//! back to the nearest donor for them.
use glam::{DMat2, DVec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interp::delaunay::Triangulation;
use crate::interp::index::PointIndex;

/// Scattered interpolation scheme.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScatteredMethod {
    /// Value of the closest donor.
    Nearest,
    /// Barycentric interpolation on the Delaunay triangle.
    #[default]
    Linear,
    /// Cubic Bézier triangle built from estimated vertex gradients.
    Cubic,
}

/// Interpolant over `N` channels attached to scattered donor points.
#[derive(Clone, Debug)]
pub struct ScatteredInterpolant<const N: usize> {
    values: Vec<[f64; N]>,
    method: ScatteredMethod,
    index: PointIndex,
    triangulation: Option<Triangulation>,
    gradients: Vec<[DVec2; N]>,
}

impl<const N: usize> ScatteredInterpolant<N> {
    /// Builds the interpolant from donor points and their values.
    ///
    /// `Linear` and `Cubic` need at least three non-collinear donors and fail
    /// with [`Error::DegenerateInterpolation`] otherwise; `Nearest` needs one.
    pub fn new(points: Vec<DVec2>, values: Vec<[f64; N]>, method: ScatteredMethod) -> Result<Self> {
        if points.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "{} donor points but {} donor values",
                points.len(),
                values.len()
            )));
        }
        if points.is_empty() {
            return Err(Error::DegenerateInterpolation("no donor points".into()));
        }
        if values.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument("donor values must be finite".into()));
        }

        let triangulation = match method {
            ScatteredMethod::Nearest => None,
            ScatteredMethod::Linear | ScatteredMethod::Cubic => Some(Triangulation::new(&points)?),
        };
        let gradients = match (&triangulation, method) {
            (Some(tri), ScatteredMethod::Cubic) => estimate_gradients(tri, &values),
            _ => Vec::new(),
        };

        Ok(Self {
            index: PointIndex::new(&points),
            values,
            method,
            triangulation,
            gradients,
        })
    }

    pub fn method(&self) -> ScatteredMethod {
        self.method
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `p`, or `None` outside the convex hull for triangulated methods.
    pub fn sample(&self, p: DVec2) -> Option<[f64; N]> {
        match self.method {
            ScatteredMethod::Nearest => self.nearest(p),
            ScatteredMethod::Linear => {
                let tri = self.triangulation.as_ref()?;
                let (id, w) = tri.locate(p)?;
                let t = tri.triangles()[id];
                let mut out = [0.0; N];
                for (k, &v) in t.iter().enumerate() {
                    for (o, c) in out.iter_mut().zip(&self.values[v]) {
                        *o += w[k] * c;
                    }
                }
                Some(out)
            }
            ScatteredMethod::Cubic => {
                let tri = self.triangulation.as_ref()?;
                let (id, w) = tri.locate(p)?;
                Some(self.bezier(tri, id, w))
            }
        }
    }

    /// Value of the donor closest to `p`.
    pub fn nearest(&self, p: DVec2) -> Option<[f64; N]> {
        self.index.nearest(p).map(|id| self.values[id])
    }

    /// [`Self::sample`], falling back to [`Self::nearest`] outside the hull.
    pub fn sample_or_nearest(&self, p: DVec2) -> [f64; N] {
        self.sample(p)
            .or_else(|| self.nearest(p))
            .unwrap_or([f64::NAN; N])
    }

    fn bezier(&self, tri: &Triangulation, id: usize, w: [f64; 3]) -> [f64; N] {
        let t = tri.triangles()[id];
        let pts = tri.points();
        let p = [pts[t[0]], pts[t[1]], pts[t[2]]];
        let w = w.map(|c| c.max(0.0));
        let norm = w[0] + w[1] + w[2];
        let w = w.map(|c| c / norm);

        let mut out = [0.0; N];
        for (c, o) in out.iter_mut().enumerate() {
            let f = [
                self.values[t[0]][c],
                self.values[t[1]][c],
                self.values[t[2]][c],
            ];
            let g = [
                self.gradients[t[0]][c],
                self.gradients[t[1]][c],
                self.gradients[t[2]][c],
            ];
            // Edge control points, `edge(i, j)` sits next to vertex i towards vertex j.
            let edge = |i: usize, j: usize| f[i] + g[i].dot(p[j] - p[i]) / 3.0;
            let e = [
                edge(0, 1),
                edge(1, 0),
                edge(1, 2),
                edge(2, 1),
                edge(2, 0),
                edge(0, 2),
            ];
            let e_mean = e.iter().sum::<f64>() / 6.0;
            let v_mean = (f[0] + f[1] + f[2]) / 3.0;
            let center = e_mean + (e_mean - v_mean) / 2.0;

            let (a, b, d) = (w[0], w[1], w[2]);
            *o = f[0] * a * a * a
                + f[1] * b * b * b
                + f[2] * d * d * d
                + 3.0 * (e[0] * a * a * b + e[1] * a * b * b)
                + 3.0 * (e[2] * b * b * d + e[3] * b * d * d)
                + 3.0 * (e[4] * d * d * a + e[5] * d * a * a)
                + 6.0 * center * a * b * d;
        }
        out
    }
}

/// Least-squares vertex gradients from the triangulation neighbourhood,
/// weighted by inverse squared distance. Underdetermined vertices get zero.
fn estimate_gradients<const N: usize>(tri: &Triangulation, values: &[[f64; N]]) -> Vec<[DVec2; N]> {
    let pts = tri.points();
    tri.vertex_neighbors()
        .iter()
        .enumerate()
        .map(|(i, neighbors)| {
            let mut normal = DMat2::ZERO;
            let mut rhs = [DVec2::ZERO; N];
            for &j in neighbors {
                let d = pts[j] - pts[i];
                let w = 1.0 / d.length_squared().max(f64::MIN_POSITIVE);
                normal += DMat2::from_cols(d * d.x, d * d.y) * w;
                for (r, (vj, vi)) in rhs.iter_mut().zip(values[j].iter().zip(&values[i])) {
                    *r += d * ((vj - vi) * w);
                }
            }
            let det = normal.determinant();
            let scale = normal.x_axis.x.abs() + normal.y_axis.y.abs();
            if neighbors.len() < 2 || det.abs() <= 1e-12 * scale * scale {
                return [DVec2::ZERO; N];
            }
            let inv = normal.inverse();
            rhs.map(|r| inv * r)
        })
        .collect()
}
