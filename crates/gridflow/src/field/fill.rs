//! Gap filling of masked cells.
//!
//! Interpolating fills build a [`ScatteredInterpolant`] from donor cells and
//! evaluate it at every masked node. Nodes outside the donors' convex hull are
//! backfilled with the nearest donor, so a successful fill never leaves a
//! masked cell behind.
use glam::DVec2;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::data::FieldData;
use crate::grid::array;
use crate::interp::{ScatteredInterpolant, ScatteredMethod};

/// Default half-width, in cells, of the donor band used by reduced fills.
pub const DEFAULT_DONOR_DILATION: usize = 4;

/// How masked cells get their values.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FillKind {
    /// Constant applied to every channel.
    Value(f64),
    Nearest,
    Linear,
    Cubic,
}

/// Options of [`crate::field::GriddedQuantity::fill`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillOptions {
    pub kind: FillKind,
    /// Restrict donors to a band of cells around the masked region.
    pub reduce_triangulation: bool,
    /// Half-width of that band in cells.
    pub dilation: usize,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            kind: FillKind::Linear,
            reduce_triangulation: false,
            dilation: DEFAULT_DONOR_DILATION,
        }
    }
}

impl FillOptions {
    pub fn new(kind: FillKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn value(value: f64) -> Self {
        Self::new(FillKind::Value(value))
    }

    pub fn with_reduce_triangulation(mut self, reduce: bool) -> Self {
        self.reduce_triangulation = reduce;
        self
    }

    pub fn with_dilation(mut self, dilation: usize) -> Self {
        self.dilation = dilation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let FillKind::Value(v) = self.kind {
            if !v.is_finite() {
                return Err(Error::InvalidArgument(format!(
                    "fill value must be finite, got {v}"
                )));
            }
        }
        if self.reduce_triangulation && self.dilation == 0 {
            return Err(Error::InvalidArgument(
                "reduced triangulation needs a dilation of at least 1 cell".into(),
            ));
        }
        Ok(())
    }
}

impl<const N: usize> FieldData<N> {
    /// Copy of the field with every masked cell filled.
    pub fn fill(&self, options: &FillOptions) -> Result<Self> {
        options.validate()?;
        if !self.has_masked() {
            return Ok(self.clone());
        }

        let mut out = self.clone();
        let method = match options.kind {
            FillKind::Value(v) => {
                let v = self.dtype.coerce(v)?;
                for (value, m) in out.values.iter_mut().zip(out.mask.iter_mut()) {
                    if *m {
                        *value = [v; N];
                        *m = false;
                    }
                }
                return Ok(out);
            }
            FillKind::Nearest => ScatteredMethod::Nearest,
            FillKind::Linear => ScatteredMethod::Linear,
            FillKind::Cubic => ScatteredMethod::Cubic,
        };

        let interpolant = self.donor_interpolant(method, options)?;
        let mut residual = 0usize;
        for idx in 0..self.grid.len() {
            if !self.mask[idx] {
                continue;
            }
            let (ix, iy) = self.grid.cell(idx);
            let p = self.grid.point(ix, iy);
            let value = match interpolant.sample(p) {
                Some(v) => v,
                None => {
                    residual += 1;
                    interpolant.sample_or_nearest(p)
                }
            };
            out.values[idx] = value.map(|c| self.dtype.coerce(c).unwrap_or(0.0));
            out.mask[idx] = false;
        }
        if residual > 0 {
            warn!("Filled {residual} cells outside the donor hull with nearest values.");
        }
        Ok(out)
    }

    fn donor_interpolant(
        &self,
        method: ScatteredMethod,
        options: &FillOptions,
    ) -> Result<ScatteredInterpolant<N>> {
        let (nx, ny) = self.grid.shape();
        if options.reduce_triangulation {
            let band = array::dilate(&self.mask, nx, ny, options.dilation);
            let donors: Vec<usize> = (0..self.grid.len())
                .filter(|&idx| band[idx] && !self.mask[idx])
                .collect();
            match self.scattered(&donors, method) {
                Ok(interp) => return Ok(interp),
                Err(Error::DegenerateInterpolation(msg)) => {
                    debug!("Reduced donor set unusable ({msg}), using all donors.");
                }
                Err(e) => return Err(e),
            }
        }
        let donors: Vec<usize> = (0..self.grid.len())
            .filter(|&idx| !self.mask[idx])
            .collect();
        self.scattered(&donors, method)
    }

    fn scattered(
        &self,
        donors: &[usize],
        method: ScatteredMethod,
    ) -> Result<ScatteredInterpolant<N>> {
        let points: Vec<DVec2> = donors
            .iter()
            .map(|&idx| {
                let (ix, iy) = self.grid.cell(idx);
                self.grid.point(ix, iy)
            })
            .collect();
        let values = donors.iter().map(|&idx| self.values[idx]).collect();
        ScatteredInterpolant::new(points, values, method)
    }
}
