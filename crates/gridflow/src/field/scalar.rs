//! Masked scalar fields.
use glam::DVec2;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::data::FieldData;
use crate::field::gradient::gradient;
use crate::field::{
    Dtype, FillOptions, GriddedQuantity, ImportOptions, MirrorOptions, VectorField,
};
use crate::grid::{AxisDirection, Grid, Padding};
use crate::interp::{DenseInterpolant, DenseMethod};
use crate::units::{Quantity, Unit};

/// Kernel shape used by [`ScalarField::smooth`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SmoothKind {
    /// Box of `2 * size + 1` cells.
    Uniform,
    /// Gaussian with `sigma = size` cells, truncated at three sigma.
    #[default]
    Gaussian,
}

impl SmoothKind {
    /// Normalized, symmetric, odd-length 1D kernel.
    pub(crate) fn kernel(self, size: usize) -> Vec<f64> {
        let weights: Vec<f64> = match self {
            SmoothKind::Uniform => vec![1.0; 2 * size + 1],
            SmoothKind::Gaussian => {
                let sigma = size as f64;
                let radius = (3.0 * sigma).ceil() as i64;
                (-radius..=radius)
                    .map(|k| (-((k * k) as f64) / (2.0 * sigma * sigma)).exp())
                    .collect()
            }
        };
        let total: f64 = weights.iter().sum();
        weights.into_iter().map(|w| w / total).collect()
    }
}

/// Samples along one grid line.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    /// Coordinate of the grid line actually used (the node nearest to the request).
    pub position: f64,
    /// Coordinates along the line.
    pub coords: Vec<f64>,
    /// Values, `None` where masked.
    pub values: Vec<Option<f64>>,
    pub coord_unit: Unit,
    pub unit: Unit,
}

/// A scalar field on a rectilinear grid with a mask and a value unit.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
    pub(crate) data: FieldData<1>,
}

impl ScalarField {
    pub(crate) fn from_data(data: FieldData<1>) -> Self {
        Self { data }
    }

    /// Creates a field on `grid` from row-major `values` (`idx = iy * nx + ix`).
    pub fn new(
        grid: Grid,
        values: Vec<f64>,
        mask: Option<Vec<bool>>,
        unit: Unit,
        dtype: Dtype,
    ) -> Result<Self> {
        let values = values.into_iter().map(|v| [v]).collect();
        FieldData::new(grid, values, mask, unit, dtype).map(Self::from_data)
    }

    /// Bulk import from raw axes; decreasing axes are flipped along with the values.
    pub fn import(
        x: Vec<f64>,
        y: Vec<f64>,
        values: Vec<f64>,
        mask: Option<Vec<bool>>,
        options: &ImportOptions,
    ) -> Result<Self> {
        let values = values.into_iter().map(|v| [v]).collect();
        FieldData::import(x, y, values, mask, options).map(Self::from_data)
    }

    /// Evaluates `f` at every node of `grid`.
    pub fn from_fn(grid: Grid, unit: Unit, f: impl Fn(DVec2) -> f64) -> Result<Self> {
        let values = (0..grid.len())
            .map(|idx| {
                let (ix, iy) = grid.cell(idx);
                f(grid.point(ix, iy))
            })
            .collect();
        Self::new(grid, values, None, unit, Dtype::Float64)
    }

    /// Row-major values; only meaningful where the mask is `false`.
    pub fn values(&self) -> &[f64] {
        self.data.values.as_flattened()
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype
    }

    /// Replaces the values and recomputes the mask from non-finite entries.
    pub fn set_values(&mut self, values: Vec<f64>) -> Result<()> {
        self.data.set_values(values.into_iter().map(|v| [v]).collect())
    }

    /// Replaces the mask without touching the values.
    pub fn set_mask(&mut self, mask: Vec<bool>) -> Result<()> {
        self.data.set_mask(mask)
    }

    /// Bilinear value at `p` with the field unit attached.
    pub fn quantity_at(&self, p: DVec2) -> Result<Option<Quantity>> {
        Ok(self
            .value_at(p)?
            .map(|v| Quantity::new(v, self.data.unit.clone())))
    }

    /// Value at `p` with an explicit interpolation method.
    pub fn value_at_with(&self, p: DVec2, method: DenseMethod) -> Result<Option<f64>> {
        Ok(self.data.value_at(p, method)?.map(|[v]| v))
    }

    fn unmasked(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .values
            .iter()
            .zip(&self.data.mask)
            .filter(|(_, &m)| !m)
            .map(|(v, _)| v[0])
    }

    pub fn min(&self) -> Option<f64> {
        self.unmasked().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.unmasked().reduce(f64::max)
    }

    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .unmasked()
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Surface integral over the unmasked nodes, each weighted by its cell area.
    ///
    /// The unit is `value * x * y * xy_scale` with its magnitude folded into the value.
    pub fn integral(&self) -> Quantity {
        let grid = &self.data.grid;
        let sum: f64 = (0..grid.len())
            .filter(|&idx| !self.data.mask[idx])
            .map(|idx| {
                let (ix, iy) = grid.cell(idx);
                self.data.values[idx][0] * grid.cell_area(ix, iy)
            })
            .sum();
        let area = &(grid.x().unit() * grid.y().unit()) * grid.xy_scale();
        let (magnitude, unit) = (&self.data.unit * &area).normalized();
        Quantity::new(sum * magnitude, unit)
    }

    /// Samples along the grid line nearest to `position` on `direction`.
    ///
    /// `ScalarField::profile(AxisDirection::X, 2.0)` returns the column closest
    /// to `x = 2`, running along y.
    pub fn profile(&self, direction: AxisDirection, position: f64) -> Result<Profile> {
        let grid = &self.data.grid;
        let k = grid.axis(direction).nearest(position)?;
        let along = grid.axis(direction.other());
        let values = (0..along.len())
            .map(|i| {
                let (ix, iy) = match direction {
                    AxisDirection::X => (k, i),
                    AxisDirection::Y => (i, k),
                };
                self.value_at_index(ix, iy)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Profile {
            position: grid.axis(direction).values()[k],
            coords: along.values().to_vec(),
            values,
            coord_unit: along.unit().clone(),
            unit: self.data.unit.clone(),
        })
    }

    /// Unmasked nodes within `radius` of `center`, with their values.
    pub fn points_around(&self, center: DVec2, radius: f64) -> Vec<(DVec2, f64)> {
        let grid = &self.data.grid;
        let (Ok(xr), Ok(yr)) = (
            grid.x().index_range(center.x - radius, center.x + radius),
            grid.y().index_range(center.y - radius, center.y + radius),
        ) else {
            return Vec::new();
        };
        (yr.0..=yr.1)
            .into_par_iter()
            .flat_map_iter(|iy| {
                (xr.0..=xr.1).filter_map(move |ix| {
                    let idx = grid.index(ix, iy);
                    let p = grid.point(ix, iy);
                    (!self.data.mask[idx] && p.distance(center) <= radius)
                        .then(|| (p, self.data.values[idx][0]))
                })
            })
            .collect()
    }

    /// Mask-aware smoothing; `size` is the kernel half-width (uniform) or sigma (gaussian) in cells.
    pub fn smooth(&self, kind: SmoothKind, size: usize) -> Result<Self> {
        self.data.smooth(kind, size).map(Self::from_data)
    }

    /// Multiplies the x coordinates; a negative factor reverses the axis and the data.
    pub fn scale_x(&self, factor: f64) -> Result<Self> {
        self.data
            .scale_axis(AxisDirection::X, factor)
            .map(Self::from_data)
    }

    pub fn scale_y(&self, factor: f64) -> Result<Self> {
        self.data
            .scale_axis(AxisDirection::Y, factor)
            .map(Self::from_data)
    }

    /// Multiplies the x coordinates by a quantity such as `0.05 mm/px`.
    ///
    /// The x axis takes the product unit; a negative factor reverses axis and data.
    pub fn scale_x_by(&self, factor: &Quantity) -> Result<Self> {
        self.data
            .scale_axis_by(AxisDirection::X, factor)
            .map(Self::from_data)
    }

    pub fn scale_y_by(&self, factor: &Quantity) -> Result<Self> {
        self.data
            .scale_axis_by(AxisDirection::Y, factor)
            .map(Self::from_data)
    }

    /// Multiplies the values; same as `self * factor`.
    pub fn scale_values(&self, factor: f64) -> Self {
        self * factor
    }

    /// Expresses the values in another compatible unit.
    pub fn change_unit(&self, unit: &Unit) -> Result<Self> {
        self.data.change_unit(unit).map(Self::from_data)
    }

    pub fn change_axis_unit(&self, direction: AxisDirection, unit: &Unit) -> Result<Self> {
        self.data
            .change_axis_unit(direction, unit)
            .map(Self::from_data)
    }

    /// Rotates the field counter-clockwise about the origin.
    ///
    /// Fails with [`crate::Error::InvalidArgument`] unless `angle_deg` is a multiple of 90.
    pub fn rotate(&self, angle_deg: f64) -> Result<Self> {
        let turns = FieldData::<1>::quarter_turns(angle_deg)?;
        Ok(Self::from_data(self.data.rotate_quarter(turns)))
    }

    /// Centered-difference gradient, in value unit per x-axis unit.
    pub fn gradient(&self) -> Result<VectorField> {
        let g = gradient(&self.data, 0)?;
        let values = g.dx.iter().zip(&g.dy).map(|(&x, &y)| [x, y]).collect();
        Ok(VectorField::from_data(FieldData::from_parts(
            self.data.grid.clone(),
            values,
            g.mask,
            g.unit,
            Dtype::Float64,
        )))
    }

    pub fn interpolant(&self, method: DenseMethod) -> Result<DenseInterpolant<1>> {
        self.data.interpolant(method)
    }
}

impl GriddedQuantity for ScalarField {
    type Sample = f64;

    fn grid(&self) -> &Grid {
        &self.data.grid
    }

    fn mask(&self) -> &[bool] {
        &self.data.mask
    }

    fn unit(&self) -> &Unit {
        &self.data.unit
    }

    fn value_at_index(&self, ix: usize, iy: usize) -> Result<Option<f64>> {
        Ok(self.data.value_at_index(ix, iy)?.map(|[v]| v))
    }

    fn value_at(&self, p: DVec2) -> Result<Option<f64>> {
        self.value_at_with(p, DenseMethod::Linear)
    }

    fn crop(&self, x: (f64, f64), y: (f64, f64)) -> Result<Self> {
        self.data.crop(x, y).map(Self::from_data)
    }

    fn crop_indices(&self, x: (usize, usize), y: (usize, usize)) -> Result<Self> {
        self.data.crop_indices(x, y).map(Self::from_data)
    }

    fn extend(&self, pad: Padding, fill: Option<f64>) -> Result<Self> {
        self.data.extend(pad, fill.map(|v| [v])).map(Self::from_data)
    }

    fn mirror(&self, options: &MirrorOptions) -> Result<Self> {
        self.data
            .mirror(options, [options.coefficient])
            .map(Self::from_data)
    }

    fn fill(&self, options: &FillOptions) -> Result<Self> {
        self.data.fill(options).map(Self::from_data)
    }

    fn crop_masked_border(&self, hard: bool) -> Result<Self> {
        self.data.crop_masked_border(hard).map(Self::from_data)
    }
}
