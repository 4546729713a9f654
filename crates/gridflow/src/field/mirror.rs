//! Reflection of a band of cells across a symmetry plane.
//!
//! The plane `direction = position` may lie inside the grid, on its edge or
//! beyond it. The band is taken from the side holding data (inside the grid,
//! the side with more cells) and written to the other side at
//! `2 * position - x`, extending the grid with its boundary spacing where
//! needed. Destination nodes that do not coincide with a reflected node are
//! interpolated linearly along the mirror direction.
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::data::FieldData;
use crate::field::{Dtype, FillKind, FillOptions};
use crate::grid::{array, AxisDirection, Padding};

/// Fractional offset below which a reflected coordinate snaps onto a node.
const SNAP: f64 = 1e-9;

/// Options of [`crate::field::GriddedQuantity::mirror`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MirrorOptions {
    /// Axis normal to the mirror plane.
    pub direction: AxisDirection,
    /// Plane coordinate along `direction`.
    pub position: f64,
    /// Number of source cells reflected.
    pub inds_to_mirror: usize,
    /// Factor applied to the reflected values.
    pub coefficient: f64,
    /// Fill for cells left empty between the plane and the reflected band.
    pub seam_fill: Option<FillKind>,
}

impl MirrorOptions {
    pub fn new(direction: AxisDirection, position: f64, inds_to_mirror: usize) -> Self {
        Self {
            direction,
            position,
            inds_to_mirror,
            coefficient: 1.0,
            seam_fill: None,
        }
    }

    pub fn with_coefficient(mut self, coefficient: f64) -> Self {
        self.coefficient = coefficient;
        self
    }

    pub fn with_seam_fill(mut self, kind: FillKind) -> Self {
        self.seam_fill = Some(kind);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.inds_to_mirror == 0 {
            return Err(Error::InvalidArgument(
                "inds_to_mirror must be at least 1".into(),
            ));
        }
        if !self.position.is_finite() || !self.coefficient.is_finite() {
            return Err(Error::InvalidArgument(
                "mirror position and coefficient must be finite".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    /// Data above the plane is reflected downwards.
    Upper,
    /// Data below the plane is reflected upwards.
    Lower,
}

impl<const N: usize> FieldData<N> {
    /// Reflects `inds_to_mirror` cells across the plane, scaling channel `c` by `coefficients[c]`.
    pub fn mirror(&self, options: &MirrorOptions, coefficients: [f64; N]) -> Result<Self> {
        options.validate()?;
        let dir = options.direction;
        let p = options.position;
        let axis = self.grid.axis(dir);
        let v = axis.values();
        let eps = axis.span() * SNAP;

        let source = if p <= axis.first() + eps {
            Source::Upper
        } else if p >= axis.last() - eps {
            Source::Lower
        } else {
            let below = v.iter().filter(|&&c| c < p - eps).count();
            let above = v.iter().filter(|&&c| c > p + eps).count();
            if above >= below {
                Source::Upper
            } else {
                Source::Lower
            }
        };

        let band: Vec<usize> = match source {
            Source::Upper => (0..v.len())
                .filter(|&i| v[i] > p + eps)
                .take(options.inds_to_mirror)
                .collect(),
            Source::Lower => (0..v.len())
                .rev()
                .filter(|&i| v[i] < p - eps)
                .take(options.inds_to_mirror)
                .collect(),
        };
        if band.len() < options.inds_to_mirror {
            return Err(Error::InvalidArgument(format!(
                "only {} cells available to mirror, {} requested",
                band.len(),
                options.inds_to_mirror
            )));
        }
        let near = 2.0 * p - v[band[0]];
        let far = 2.0 * p - v[band[band.len() - 1]];

        let extra = match source {
            Source::Upper if far < axis.first() - eps => {
                ((axis.first() - far) / (v[1] - v[0]) - SNAP).ceil() as usize
            }
            Source::Lower if far > axis.last() + eps => {
                let n = v.len();
                ((far - axis.last()) / (v[n - 1] - v[n - 2]) - SNAP).ceil() as usize
            }
            _ => 0,
        };
        let pad = match (dir, source) {
            (AxisDirection::X, Source::Upper) => Padding::new(extra, 0, 0, 0),
            (AxisDirection::X, Source::Lower) => Padding::new(0, extra, 0, 0),
            (AxisDirection::Y, Source::Upper) => Padding::new(0, 0, extra, 0),
            (AxisDirection::Y, Source::Lower) => Padding::new(0, 0, 0, extra),
        };

        let (nx, ny) = self.grid.shape();
        let mut out = self.extend(pad, None)?;
        let mut gap = array::pad(&vec![false; self.grid.len()], nx, ny, pad, true);
        let (out_nx, _) = out.grid.shape();
        let out_axis = out.grid.axis(dir).clone();
        let other_len = self.grid.axis(dir.other()).len();
        let index = |a: usize, b: usize, width: usize| match dir {
            AxisDirection::X => b * width + a,
            AxisDirection::Y => a * width + b,
        };

        let (lo, hi) = (near.min(far) - eps, near.max(far) + eps);
        let mut written = 0usize;
        for (a, &c) in out_axis.values().iter().enumerate() {
            if c < lo || c > hi {
                continue;
            }
            let (mut i0, mut i1) = axis.bounds(2.0 * p - c)?;
            let t = if i0 == i1 {
                0.0
            } else {
                (2.0 * p - c - v[i0]) / (v[i1] - v[i0])
            };
            let t = if t < SNAP {
                i1 = i0;
                0.0
            } else if t > 1.0 - SNAP {
                i0 = i1;
                0.0
            } else {
                t
            };

            for b in 0..other_len {
                let s0 = index(i0, b, nx);
                let s1 = index(i1, b, nx);
                let dst = index(a, b, out_nx);
                gap[dst] = false;
                written += 1;
                if self.mask[s0] || self.mask[s1] {
                    out.mask[dst] = true;
                    out.values[dst] = [f64::NAN; N];
                    continue;
                }
                let mut value = [0.0; N];
                for (k, out_c) in value.iter_mut().enumerate() {
                    let lerp = self.values[s0][k] * (1.0 - t) + self.values[s1][k] * t;
                    *out_c = lerp * coefficients[k];
                }
                out.values[dst] = value;
                out.mask[dst] = false;
            }
        }
        debug!("Mirrored {written} cells across {dir:?} = {p}.");
        if out.dtype.is_integer() && coefficients.iter().any(|c| c.fract() != 0.0) {
            out.dtype = Dtype::Float64;
        } else if out.dtype.is_unsigned() && coefficients.iter().any(|&c| c < 0.0) {
            out.dtype = Dtype::Int64;
        }

        if let Some(kind) = options.seam_fill {
            if gap.iter().any(|&g| g) {
                let filled = out.fill(&FillOptions::new(kind))?;
                for (idx, is_gap) in gap.iter().enumerate() {
                    if *is_gap {
                        out.values[idx] = filled.values[idx];
                        out.mask[idx] = false;
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ImportOptions;

    /// `value = x + 10 y` on integer coordinates `x in [x0, x0 + nx)`, `y in [0, ny)`.
    fn ramp(x0: f64, nx: usize, ny: usize) -> FieldData<1> {
        let x: Vec<f64> = (0..nx).map(|i| x0 + i as f64).collect();
        let y: Vec<f64> = (0..ny).map(|j| j as f64).collect();
        let mut values = Vec::new();
        for yv in &y {
            for xv in &x {
                values.push([xv + 10.0 * yv]);
            }
        }
        FieldData::import(x, y, values, None, &ImportOptions::default()).unwrap()
    }

    #[test]
    fn mirror_at_edge_reflects_outer_rows() {
        let data = ramp(0.0, 5, 3);
        for coefficient in [1.0, -2.0, 0.5] {
            let options =
                MirrorOptions::new(AxisDirection::X, 0.0, 2).with_coefficient(coefficient);
            let out = data.mirror(&options, [coefficient]).unwrap();
            assert_eq!(out.grid.x().values(), &[-2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
            for iy in 0..3 {
                for k in 1..=2 {
                    let mirrored = out.value_at_index(2 - k, iy).unwrap().unwrap()[0];
                    let source = data.value_at_index(k, iy).unwrap().unwrap()[0];
                    assert_eq!(mirrored, source * coefficient);
                }
                assert_eq!(
                    out.value_at_index(2, iy).unwrap(),
                    data.value_at_index(0, iy).unwrap()
                );
            }
        }
    }

    #[test]
    fn mirror_along_y_at_top_edge() {
        let data = ramp(0.0, 3, 4);
        let options = MirrorOptions::new(AxisDirection::Y, 3.0, 1);
        let out = data.mirror(&options, [1.0]).unwrap();
        assert_eq!(out.grid.y().values(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        for ix in 0..3 {
            assert_eq!(
                out.value_at_index(ix, 4).unwrap(),
                data.value_at_index(ix, 2).unwrap()
            );
        }
    }

    #[test]
    fn plane_inside_grid_overwrites_smaller_side() {
        let data = ramp(0.0, 10, 2);
        let options = MirrorOptions::new(AxisDirection::X, 7.5, 2);
        let out = data.mirror(&options, [1.0]).unwrap();
        assert_eq!(out.grid.shape(), (10, 2));
        assert_eq!(out.value_at_index(8, 0).unwrap(), Some([7.0]));
        assert_eq!(out.value_at_index(9, 1).unwrap(), Some([16.0]));
        assert_eq!(out.value_at_index(5, 0).unwrap(), Some([5.0]));
    }

    #[test]
    fn plane_beyond_grid_leaves_seam_masked_unless_filled() {
        let data = ramp(0.0, 5, 2);
        let options = MirrorOptions::new(AxisDirection::X, -1.5, 2);
        let out = data.mirror(&options, [1.0]).unwrap();
        assert_eq!(out.grid.x().values()[0], -4.0);
        assert_eq!(out.value_at_index(0, 0).unwrap(), Some([1.0]));
        assert_eq!(out.value_at_index(1, 0).unwrap(), Some([0.0]));
        assert_eq!(out.value_at_index(2, 0).unwrap(), None);
        assert_eq!(out.value_at_index(3, 1).unwrap(), None);

        let filled = data
            .mirror(&options.with_seam_fill(FillKind::Value(-7.0)), [1.0])
            .unwrap();
        assert_eq!(filled.value_at_index(2, 0).unwrap(), Some([-7.0]));
        assert_eq!(filled.value_at_index(3, 1).unwrap(), Some([-7.0]));
    }

    #[test]
    fn reflected_coordinates_between_nodes_are_interpolated() {
        let data = ramp(0.0, 4, 2);
        let options = MirrorOptions::new(AxisDirection::X, 3.25, 2);
        let out = data.mirror(&options, [1.0]).unwrap();
        // Reflected band spans [3.5, 4.5]; node 4 reflects onto 2.5.
        assert_eq!(out.grid.x().values(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let v = out.value_at_index(4, 0).unwrap().unwrap()[0];
        assert!((v - 2.5).abs() < 1e-12);
        assert_eq!(out.value_at_index(5, 0).unwrap(), None);
        assert_eq!(out.value_at_index(3, 1).unwrap(), Some([13.0]));
    }

    #[test]
    fn masked_sources_stay_masked() {
        let mut data = ramp(0.0, 4, 2);
        data.mask[1] = true;
        let options = MirrorOptions::new(AxisDirection::X, 0.0, 2);
        let out = data.mirror(&options, [1.0]).unwrap();
        assert_eq!(out.value_at_index(1, 0).unwrap(), None);
        assert!(out.value_at_index(0, 0).unwrap().is_some());
    }

    #[test]
    fn too_many_cells_requested() {
        let data = ramp(0.0, 3, 2);
        let options = MirrorOptions::new(AxisDirection::X, 0.0, 3);
        assert!(matches!(
            data.mirror(&options, [1.0]),
            Err(Error::InvalidArgument(_))
        ));
    }
}
