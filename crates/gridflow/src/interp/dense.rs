//! Continuous sampling over a dense rectilinear grid.
//!
//! [`DenseInterpolant`] evaluates `N` channels at once (one for scalar fields,
//! two for vector fields) so that every channel shares the same node lookup and
//! mask test. A query whose stencil touches a masked node yields `None`.
use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::Axis;

/// Interpolation scheme used between grid nodes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DenseMethod {
    /// Bilinear between the (up to) four surrounding nodes.
    #[default]
    Linear,
    /// Catmull-Rom cubic convolution over a 4x4 node stencil in index space.
    Cubic,
}

/// Interpolant over `N` channels sampled on a rectilinear grid.
#[derive(Clone, Debug)]
pub struct DenseInterpolant<const N: usize> {
    x: Axis,
    y: Axis,
    values: Vec<[f64; N]>,
    mask: Vec<bool>,
    method: DenseMethod,
}

impl<const N: usize> DenseInterpolant<N> {
    /// Builds an interpolant; non-finite samples are treated as masked.
    pub fn new(
        x: Axis,
        y: Axis,
        values: Vec<[f64; N]>,
        mask: Option<Vec<bool>>,
        method: DenseMethod,
    ) -> Result<Self> {
        let len = x.len() * y.len();
        if values.len() != len {
            return Err(Error::InvalidArgument(format!(
                "expected {} samples for a {}x{} grid, got {}",
                len,
                x.len(),
                y.len(),
                values.len()
            )));
        }
        let mut mask = match mask {
            Some(m) if m.len() != len => {
                return Err(Error::InvalidArgument(format!(
                    "mask has {} cells, grid has {}",
                    m.len(),
                    len
                )))
            }
            Some(m) => m,
            None => vec![false; len],
        };
        for (m, v) in mask.iter_mut().zip(&values) {
            if v.iter().any(|c| !c.is_finite()) {
                *m = true;
            }
        }
        Ok(Self {
            x,
            y,
            values,
            mask,
            method,
        })
    }

    pub fn method(&self) -> DenseMethod {
        self.method
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn y(&self) -> &Axis {
        &self.y
    }

    pub fn contains(&self, p: DVec2) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y)
    }

    /// Samples all channels at `p`.
    ///
    /// Fails with [`Error::OutOfRange`] outside the grid; returns `Ok(None)` when
    /// the value is unknown because the stencil touches a masked node.
    pub fn sample(&self, p: DVec2) -> Result<Option<[f64; N]>> {
        self.nodes().sample(self.method, p)
    }

    fn nodes(&self) -> Nodes<'_, N> {
        Nodes {
            x: &self.x,
            y: &self.y,
            values: &self.values,
            mask: &self.mask,
        }
    }
}

/// Borrowed view of gridded samples, shared by interpolants and field lookups.
#[derive(Clone, Copy)]
pub(crate) struct Nodes<'a, const N: usize> {
    pub x: &'a Axis,
    pub y: &'a Axis,
    pub values: &'a [[f64; N]],
    pub mask: &'a [bool],
}

impl<const N: usize> Nodes<'_, N> {
    pub fn sample(&self, method: DenseMethod, p: DVec2) -> Result<Option<[f64; N]>> {
        match method {
            DenseMethod::Linear => self.sample_linear(p),
            DenseMethod::Cubic => self.sample_cubic(p),
        }
    }

    #[inline]
    fn node(&self, ix: usize, iy: usize) -> Option<&[f64; N]> {
        let idx = iy * self.x.len() + ix;
        if self.mask[idx] {
            None
        } else {
            Some(&self.values[idx])
        }
    }

    fn sample_linear(&self, p: DVec2) -> Result<Option<[f64; N]>> {
        let (i0, i1) = self.x.bounds(p.x)?;
        let (j0, j1) = self.y.bounds(p.y)?;
        let xs = self.x.values();
        let ys = self.y.values();
        let tx = if i0 == i1 {
            0.0
        } else {
            ((p.x - xs[i0]) / (xs[i1] - xs[i0])).clamp(0.0, 1.0)
        };
        let ty = if j0 == j1 {
            0.0
        } else {
            ((p.y - ys[j0]) / (ys[j1] - ys[j0])).clamp(0.0, 1.0)
        };

        let (Some(v00), Some(v10), Some(v01), Some(v11)) = (
            self.node(i0, j0),
            self.node(i1, j0),
            self.node(i0, j1),
            self.node(i1, j1),
        ) else {
            return Ok(None);
        };

        if i0 == i1 && j0 == j1 {
            return Ok(Some(*v00));
        }

        let mut out = [0.0; N];
        for (c, o) in out.iter_mut().enumerate() {
            let vx0 = v00[c] * (1.0 - tx) + v10[c] * tx;
            let vx1 = v01[c] * (1.0 - tx) + v11[c] * tx;
            *o = vx0 * (1.0 - ty) + vx1 * ty;
        }
        Ok(Some(out))
    }

    fn sample_cubic(&self, p: DVec2) -> Result<Option<[f64; N]>> {
        let fx = self.x.decimal(p.x)?;
        let fy = self.y.decimal(p.y)?;
        let (ix, tx) = split_index(fx, self.x.len());
        let (iy, ty) = split_index(fy, self.y.len());
        let wx = catmull_rom_weights(tx);
        let wy = catmull_rom_weights(ty);

        let mut out = [0.0; N];
        for (b, wyb) in wy.iter().enumerate() {
            if *wyb == 0.0 {
                continue;
            }
            let jy = clamp_index(iy as isize + b as isize - 1, self.y.len());
            for (a, wxa) in wx.iter().enumerate() {
                if *wxa == 0.0 {
                    continue;
                }
                let jx = clamp_index(ix as isize + a as isize - 1, self.x.len());
                let Some(v) = self.node(jx, jy) else {
                    return Ok(None);
                };
                let w = wxa * wyb;
                for (o, vc) in out.iter_mut().zip(v) {
                    *o += w * vc;
                }
            }
        }
        Ok(Some(out))
    }
}

/// Splits a fractional index into a base node in `[0, n - 2]` and an offset in `[0, 1]`.
fn split_index(f: f64, n: usize) -> (usize, f64) {
    let base = (f.floor() as usize).min(n - 2);
    (base, f - base as f64)
}

fn clamp_index(i: isize, n: usize) -> usize {
    i.clamp(0, n as isize - 1) as usize
}

/// Catmull-Rom weights for nodes `-1, 0, 1, 2` at offset `t`.
fn catmull_rom_weights(t: f64) -> [f64; 4] {
    if t == 0.0 {
        return [0.0, 1.0, 0.0, 0.0];
    }
    if t == 1.0 {
        return [0.0, 0.0, 1.0, 0.0];
    }
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}
