//! Storage shared by scalar (`N = 1`) and vector (`N = 2`) fields.
use glam::DVec2;
use tracing::warn;

use crate::error::{Error, Result};
use crate::field::scalar::SmoothKind;
use crate::field::{Dtype, ImportOptions};
use crate::grid::{array, Axis, AxisDirection, Grid, Padding};
use crate::interp::dense::Nodes;
use crate::interp::{DenseInterpolant, DenseMethod};
use crate::units::{Quantity, Unit};

/// Grid, row-major channel values, mask, unit and storage type.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FieldData<const N: usize> {
    pub grid: Grid,
    pub values: Vec<[f64; N]>,
    pub mask: Vec<bool>,
    pub unit: Unit,
    pub dtype: Dtype,
}

impl<const N: usize> FieldData<N> {
    /// Folds the unit magnitude into `values`, coerces them to `dtype` and
    /// masks non-finite entries.
    pub fn new(
        grid: Grid,
        values: Vec<[f64; N]>,
        mask: Option<Vec<bool>>,
        unit: Unit,
        dtype: Dtype,
    ) -> Result<Self> {
        let len = grid.len();
        if values.len() != len {
            return Err(Error::InvalidArgument(format!(
                "expected {} values for a {}x{} grid, got {}",
                len,
                grid.nx(),
                grid.ny(),
                values.len()
            )));
        }
        let mask = match mask {
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

        let (magnitude, unit) = unit.normalized();
        let mut data = Self {
            grid,
            values,
            mask,
            unit,
            dtype,
        };
        if magnitude != 1.0 {
            for v in data.values.iter_mut().flatten() {
                *v *= magnitude;
            }
        }
        data.coerce_values()?;
        data.mask_non_finite();
        Ok(data)
    }

    /// Builds a field from raw axes; decreasing axes are flipped together with the data.
    pub fn import(
        mut x: Vec<f64>,
        mut y: Vec<f64>,
        mut values: Vec<[f64; N]>,
        mut mask: Option<Vec<bool>>,
        options: &ImportOptions,
    ) -> Result<Self> {
        let (nx, ny) = (x.len(), y.len());
        if values.len() != nx * ny {
            return Err(Error::InvalidArgument(format!(
                "expected {} values for {} x and {} y coordinates, got {}",
                nx * ny,
                nx,
                ny,
                values.len()
            )));
        }
        if is_decreasing(&x) {
            x.reverse();
            array::flip_x(&mut values, nx);
            if let Some(m) = mask.as_mut() {
                array::flip_x(m, nx);
            }
        }
        if is_decreasing(&y) {
            y.reverse();
            array::flip_y(&mut values, nx, ny);
            if let Some(m) = mask.as_mut() {
                array::flip_y(m, nx, ny);
            }
        }
        let grid = Grid::new(
            Axis::new(x, options.unit_x.clone())?,
            Axis::new(y, options.unit_y.clone())?,
        )
        .with_xy_scale(options.xy_scale.clone());
        Self::new(
            grid,
            values,
            mask,
            options.unit_values.clone(),
            options.dtype,
        )
    }

    fn coerce_values(&mut self) -> Result<()> {
        if self.dtype == Dtype::Float64 {
            return Ok(());
        }
        for v in self.values.iter_mut().flatten() {
            *v = self.dtype.coerce(*v)?;
        }
        Ok(())
    }

    fn mask_non_finite(&mut self) {
        for (m, v) in self.mask.iter_mut().zip(&self.values) {
            if v.iter().any(|c| !c.is_finite()) {
                *m = true;
            }
        }
    }

    /// Replaces the values; the mask becomes exactly the set of non-finite entries.
    pub fn set_values(&mut self, values: Vec<[f64; N]>) -> Result<()> {
        if values.len() != self.grid.len() {
            return Err(Error::InvalidArgument(format!(
                "expected {} values, got {}",
                self.grid.len(),
                values.len()
            )));
        }
        let mut next = Self {
            grid: self.grid.clone(),
            values,
            mask: vec![false; self.grid.len()],
            unit: self.unit.clone(),
            dtype: self.dtype,
        };
        next.coerce_values()?;
        next.mask_non_finite();
        *self = next;
        Ok(())
    }

    /// Replaces the mask; values are left untouched.
    pub fn set_mask(&mut self, mask: Vec<bool>) -> Result<()> {
        if mask.len() != self.grid.len() {
            return Err(Error::InvalidArgument(format!(
                "mask has {} cells, grid has {}",
                mask.len(),
                self.grid.len()
            )));
        }
        self.mask = mask;
        Ok(())
    }

    /// Assembles a field from parts that already agree in shape.
    ///
    /// Float32 storage is rounded and non-finite values are masked; integer
    /// storage is trusted to hold integral values.
    pub fn from_parts(
        grid: Grid,
        values: Vec<[f64; N]>,
        mask: Vec<bool>,
        unit: Unit,
        dtype: Dtype,
    ) -> Self {
        debug_assert_eq!(values.len(), grid.len());
        debug_assert_eq!(mask.len(), grid.len());
        let mut out = Self {
            grid,
            values,
            mask,
            unit,
            dtype,
        };
        if dtype == Dtype::Float32 {
            for v in out.values.iter_mut().flatten() {
                *v = *v as f32 as f64;
            }
        }
        out.mask_non_finite();
        out
    }

    pub fn with_values(
        &self,
        values: Vec<[f64; N]>,
        mask: Vec<bool>,
        unit: Unit,
        dtype: Dtype,
    ) -> Self {
        Self::from_parts(self.grid.clone(), values, mask, unit, dtype)
    }

    pub fn has_masked(&self) -> bool {
        self.mask.iter().any(|&m| m)
    }

    pub fn nodes(&self) -> Nodes<'_, N> {
        Nodes {
            x: self.grid.x(),
            y: self.grid.y(),
            values: &self.values,
            mask: &self.mask,
        }
    }

    pub fn value_at_index(&self, ix: usize, iy: usize) -> Result<Option<[f64; N]>> {
        if ix >= self.grid.nx() || iy >= self.grid.ny() {
            return Err(Error::OutOfRange(format!(
                "index ({ix}, {iy}) outside a {}x{} grid",
                self.grid.nx(),
                self.grid.ny()
            )));
        }
        let idx = self.grid.index(ix, iy);
        Ok((!self.mask[idx]).then_some(self.values[idx]))
    }

    pub fn value_at(&self, p: DVec2, method: DenseMethod) -> Result<Option<[f64; N]>> {
        self.nodes().sample(method, p)
    }

    pub fn interpolant(&self, method: DenseMethod) -> Result<DenseInterpolant<N>> {
        DenseInterpolant::new(
            self.grid.x().clone(),
            self.grid.y().clone(),
            self.values.clone(),
            Some(self.mask.clone()),
            method,
        )
    }

    pub fn crop_indices(&self, xr: (usize, usize), yr: (usize, usize)) -> Result<Self> {
        let grid = self.grid.crop(xr, yr)?;
        let nx = self.grid.nx();
        Ok(Self {
            grid,
            values: array::crop(&self.values, nx, xr, yr),
            mask: array::crop(&self.mask, nx, xr, yr),
            unit: self.unit.clone(),
            dtype: self.dtype,
        })
    }

    pub fn crop(&self, x: (f64, f64), y: (f64, f64)) -> Result<Self> {
        let xr = self.grid.x().index_range(x.0, x.1)?;
        let yr = self.grid.y().index_range(y.0, y.1)?;
        self.crop_indices(xr, yr)
    }

    /// Pads the grid; `fill` is coerced to the storage type like assigned values.
    pub fn extend(&self, pad: Padding, fill: Option<[f64; N]>) -> Result<Self> {
        if pad.is_zero() {
            return Ok(self.clone());
        }
        let fill = match fill {
            Some(mut f) => {
                for v in &mut f {
                    *v = self.dtype.coerce(*v)?;
                }
                Some(f)
            }
            None => None,
        };
        let (nx, ny) = self.grid.shape();
        let masked = fill.is_none_or(|f| f.iter().any(|v| !v.is_finite()));
        let fill = fill.unwrap_or([f64::NAN; N]);
        Ok(Self {
            grid: self.grid.extend(pad),
            values: array::pad(&self.values, nx, ny, pad, fill),
            mask: array::pad(&self.mask, nx, ny, pad, masked),
            unit: self.unit.clone(),
            dtype: self.dtype,
        })
    }

    pub fn crop_masked_border(&self, hard: bool) -> Result<Self> {
        let (nx, ny) = self.grid.shape();
        let masked = |ix: usize, iy: usize| self.mask[iy * nx + ix];
        let col_has_data = |ix: usize| (0..ny).any(|iy| !masked(ix, iy));
        let row_has_data = |iy: usize| (0..nx).any(|ix| !masked(ix, iy));

        let (Some(x0), Some(x1)) = (
            (0..nx).find(|&ix| col_has_data(ix)),
            (0..nx).rev().find(|&ix| col_has_data(ix)),
        ) else {
            return Err(Error::InvalidArgument(
                "cannot crop the border of a fully masked field".into(),
            ));
        };
        let y0 = (0..ny).find(|&iy| row_has_data(iy)).unwrap_or(0);
        let y1 = (0..ny).rev().find(|&iy| row_has_data(iy)).unwrap_or(ny - 1);
        if !hard {
            return self.crop_indices((x0, x1), (y0, y1));
        }

        let (mut x0, mut x1, mut y0, mut y1) = (x0, x1, y0, y1);
        // Every pass removes one row or column, so this runs at most nx + ny times.
        loop {
            let inside = (y0..=y1)
                .flat_map(|iy| (x0..=x1).map(move |ix| (ix, iy)))
                .filter(|&(ix, iy)| masked(ix, iy))
                .count();
            if inside == 0 {
                break;
            }
            let count_col = |ix: usize| (y0..=y1).filter(|&iy| masked(ix, iy)).count();
            let count_row = |iy: usize| (x0..=x1).filter(|&ix| masked(ix, iy)).count();
            let can_cols = x1 - x0 >= 2;
            let can_rows = y1 - y0 >= 2;
            let candidates = [
                (Border::Left, count_col(x0), can_cols),
                (Border::Right, count_col(x1), can_cols),
                (Border::Bottom, count_row(y0), can_rows),
                (Border::Top, count_row(y1), can_rows),
            ];
            let mut best: Option<(Border, usize)> = None;
            for (border, count, allowed) in candidates {
                if allowed && best.is_none_or(|(_, c)| count > c) {
                    best = Some((border, count));
                }
            }
            match best {
                Some((Border::Left, _)) => x0 += 1,
                Some((Border::Right, _)) => x1 -= 1,
                Some((Border::Bottom, _)) => y0 += 1,
                Some((Border::Top, _)) => y1 -= 1,
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "{inside} masked cells remain and the grid cannot shrink below 2x2"
                    )))
                }
            }
        }
        self.crop_indices((x0, x1), (y0, y1))
    }

    /// Rotates counter-clockwise by `quarter_turns * 90` degrees about the origin.
    pub fn rotate_quarter(&self, quarter_turns: u8) -> Self {
        let (nx, ny) = self.grid.shape();
        let (values, _, _) = array::rotate_quarter(&self.values, nx, ny, quarter_turns);
        let (mask, _, _) = array::rotate_quarter(&self.mask, nx, ny, quarter_turns);
        Self {
            grid: self.grid.rotate_quarter(quarter_turns),
            values,
            mask,
            unit: self.unit.clone(),
            dtype: self.dtype,
        }
    }

    /// Multiplies one axis by `factor`; a negative factor reverses axis and data.
    pub fn scale_axis(&self, direction: AxisDirection, factor: f64) -> Result<Self> {
        let scaled = self.grid.axis(direction).scale(factor)?;
        Ok(self.with_scaled_axis(direction, scaled))
    }

    /// Multiplies one axis by a quantity; the axis takes the product unit.
    pub fn scale_axis_by(&self, direction: AxisDirection, factor: &Quantity) -> Result<Self> {
        let scaled = self.grid.axis(direction).scale_by(factor)?;
        Ok(self.with_scaled_axis(direction, scaled))
    }

    fn with_scaled_axis(&self, direction: AxisDirection, (axis, reversed): (Axis, bool)) -> Self {
        let mut out = self.clone();
        out.grid = self.grid.with_axis(direction, axis);
        if reversed {
            let (nx, ny) = self.grid.shape();
            match direction {
                AxisDirection::X => {
                    array::flip_x(&mut out.values, nx);
                    array::flip_x(&mut out.mask, nx);
                }
                AxisDirection::Y => {
                    array::flip_y(&mut out.values, nx, ny);
                    array::flip_y(&mut out.mask, nx, ny);
                }
            }
        }
        out
    }

    pub fn change_axis_unit(&self, direction: AxisDirection, unit: &Unit) -> Result<Self> {
        let axis = self.grid.axis(direction).change_unit(unit)?;
        let mut out = self.clone();
        out.grid = self.grid.with_axis(direction, axis);
        Ok(out)
    }

    /// Converts the values to `unit`, keeping a unit of magnitude one.
    pub fn change_unit(&self, unit: &Unit) -> Result<Self> {
        let factor = self.unit.conversion_factor(unit)?;
        let (magnitude, target) = unit.normalized();
        let scale = factor * magnitude;
        let values = self.values.iter().map(|v| v.map(|c| c * scale)).collect();
        let dtype = if self.dtype.is_integer() && scale.fract() != 0.0 {
            Dtype::Float64
        } else {
            self.dtype
        };
        let mut out = self.with_values(values, self.mask.clone(), target, dtype);
        out.coerce_values()?;
        Ok(out)
    }

    /// Mask-aware smoothing by normalized convolution with a separable kernel.
    ///
    /// Masked cells neither contribute nor receive values.
    pub fn smooth(&self, kind: SmoothKind, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidArgument("smoothing size must be >= 1".into()));
        }
        let kernel = kind.kernel(size);
        let (nx, ny) = self.grid.shape();
        let weight: Vec<f64> = self.mask.iter().map(|&m| if m { 0.0 } else { 1.0 }).collect();
        let den = convolve_separable(&weight, nx, ny, &kernel);

        let mut values = self.values.clone();
        for c in 0..N {
            let channel: Vec<f64> = self
                .values
                .iter()
                .zip(&weight)
                .map(|(v, w)| if *w > 0.0 { v[c] } else { 0.0 })
                .collect();
            let num = convolve_separable(&channel, nx, ny, &kernel);
            for (idx, out) in values.iter_mut().enumerate() {
                if !self.mask[idx] {
                    out[c] = num[idx] / den[idx];
                }
            }
        }
        let dtype = if self.dtype.is_integer() {
            Dtype::Float64
        } else {
            self.dtype
        };
        Ok(self.with_values(values, self.mask.clone(), self.unit.clone(), dtype))
    }

    /// Parses a rotation angle in degrees into counter-clockwise quarter turns.
    pub fn quarter_turns(angle_deg: f64) -> Result<u8> {
        let turns = angle_deg / 90.0;
        if !turns.is_finite() || (turns - turns.round()).abs() > 1e-9 {
            warn!("Rejected rotation by {angle_deg} degrees.");
            return Err(Error::InvalidArgument(format!(
                "rotation angle must be a multiple of 90 degrees, got {angle_deg}"
            )));
        }
        Ok((turns.round() as i64).rem_euclid(4) as u8)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Border {
    Left,
    Right,
    Bottom,
    Top,
}

fn is_decreasing(values: &[f64]) -> bool {
    values.len() >= 2 && values.windows(2).all(|w| w[1] < w[0])
}

/// Row pass followed by a column pass with a symmetric kernel, zero outside the grid.
fn convolve_separable(data: &[f64], nx: usize, ny: usize, kernel: &[f64]) -> Vec<f64> {
    let r = kernel.len() / 2;
    let mut rows = vec![0.0; data.len()];
    for iy in 0..ny {
        for ix in 0..nx {
            let lo = ix.saturating_sub(r);
            let hi = (ix + r).min(nx - 1);
            rows[iy * nx + ix] = (lo..=hi)
                .map(|k| data[iy * nx + k] * kernel[k + r - ix])
                .sum();
        }
    }
    let mut out = vec![0.0; data.len()];
    for ix in 0..nx {
        for iy in 0..ny {
            let lo = iy.saturating_sub(r);
            let hi = (iy + r).min(ny - 1);
            out[iy * nx + ix] = (lo..=hi)
                .map(|k| rows[k * nx + ix] * kernel[k + r - iy])
                .sum();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(nx: usize, ny: usize, mask: Option<Vec<bool>>) -> FieldData<1> {
        let x: Vec<f64> = (0..nx).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..ny).map(|j| j as f64).collect();
        let values = (0..nx * ny).map(|k| [k as f64]).collect();
        FieldData::import(x, y, values, mask, &ImportOptions::default()).unwrap()
    }

    #[test]
    fn import_flips_decreasing_axes_with_data() {
        let values = vec![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let data = FieldData::import(
            vec![2.0, 1.0, 0.0],
            vec![0.0, 1.0],
            values,
            None,
            &ImportOptions::default(),
        )
        .unwrap();
        assert_eq!(data.grid.x().values(), &[0.0, 1.0, 2.0]);
        assert_eq!(data.value_at_index(0, 0).unwrap(), Some([2.0]));
        assert_eq!(data.value_at_index(2, 1).unwrap(), Some([3.0]));
    }

    #[test]
    fn unit_magnitude_and_dtype_are_applied() {
        let options = ImportOptions::default()
            .with_unit_values(Unit::parse("0.5*m/s").unwrap())
            .with_dtype(Dtype::Int64);
        let data = FieldData::import(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![[3.0], [5.0], [-3.0], [1.0]],
            None,
            &options,
        )
        .unwrap();
        assert_eq!(data.unit, Unit::parse("m/s").unwrap());
        let v: Vec<f64> = data.values.iter().map(|v| v[0]).collect();
        assert_eq!(v, vec![1.0, 2.0, -1.0, 0.0]);
    }

    #[test]
    fn unsigned_storage_rejects_negatives() {
        let options = ImportOptions::default().with_dtype(Dtype::UInt64);
        let err = FieldData::import(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![[1.0], [-1.0], [0.0], [2.0]],
            None,
            &options,
        );
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn set_values_recomputes_mask_and_set_mask_keeps_values() {
        let mut data = field(2, 2, Some(vec![true, false, false, false]));
        data.set_values(vec![[1.0], [f64::NAN], [3.0], [4.0]]).unwrap();
        assert_eq!(data.mask, vec![false, true, false, false]);

        data.set_mask(vec![true, true, true, false]).unwrap();
        assert_eq!(data.values[0], [1.0]);
        assert_eq!(data.value_at_index(0, 0).unwrap(), None);
        assert!(data.set_mask(vec![false; 3]).is_err());
    }

    #[test]
    fn value_at_index_is_exact_and_checks_bounds() {
        let data = field(4, 3, None);
        assert_eq!(data.value_at_index(3, 2).unwrap(), Some([11.0]));
        assert!(matches!(
            data.value_at_index(4, 0),
            Err(Error::OutOfRange(_))
        ));
    }

    #[test]
    fn crop_then_extend_restores_extent() {
        let data = field(6, 5, None);
        let cropped = data.crop_indices((1, 4), (2, 3)).unwrap();
        assert_eq!(cropped.grid.shape(), (4, 2));
        let restored = cropped.extend(Padding::new(1, 1, 2, 1), None).unwrap();
        assert!(restored.grid.approx_eq(&data.grid));
        assert!(restored.mask[0]);
        assert_eq!(restored.value_at_index(1, 2).unwrap(), Some([13.0]));
    }

    #[test]
    fn extend_fill_follows_the_storage_type() {
        let grid = field(2, 2, None).grid;
        let values = vec![[1.0], [2.0], [3.0], [4.0]];
        let unit = Unit::dimensionless();
        let ints =
            FieldData::new(grid.clone(), values.clone(), None, unit.clone(), Dtype::Int64).unwrap();
        let padded = ints.extend(Padding::new(1, 0, 0, 0), Some([0.5])).unwrap();
        assert_eq!(padded.value_at_index(0, 0).unwrap(), Some([0.0]));
        assert_eq!(padded.value_at_index(0, 1).unwrap(), Some([0.0]));

        let unsigned = FieldData::new(grid, values, None, unit, Dtype::UInt64).unwrap();
        assert!(matches!(
            unsigned.extend(Padding::new(0, 1, 0, 0), Some([-2.0])),
            Err(Error::InvalidArgument(_))
        ));
        assert!(unsigned.extend(Padding::new(0, 1, 0, 0), None).unwrap().mask[2]);
    }

    #[test]
    fn crop_by_coordinates_is_inclusive() {
        let data = field(6, 5, None);
        let cropped = data.crop((1.0, 3.0), (0.5, 4.0)).unwrap();
        assert_eq!(cropped.grid.x().values(), &[1.0, 2.0, 3.0]);
        assert_eq!(cropped.grid.y().values(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn soft_border_crop_trims_fully_masked_edges() {
        let mut mask = vec![false; 16];
        for iy in 0..4 {
            mask[iy * 4] = true;
        }
        mask[15] = true;
        let data = field(4, 4, Some(mask));
        let soft = data.crop_masked_border(false).unwrap();
        assert_eq!(soft.grid.shape(), (3, 4));
        assert!(soft.has_masked());

        let hard = data.crop_masked_border(true).unwrap();
        assert!(!hard.has_masked());
        assert_eq!(hard.grid.shape(), (2, 4));
    }

    #[test]
    fn hard_border_crop_refuses_to_collapse() {
        let mut mask = vec![false; 9];
        mask[4] = true;
        let data = field(3, 3, Some(mask));
        assert!(matches!(
            data.crop_masked_border(true),
            Err(Error::InvalidArgument(_))
        ));
        let all = field(2, 2, Some(vec![true; 4]));
        assert!(all.crop_masked_border(false).is_err());
    }

    #[test]
    fn smoothing_keeps_constants_and_mask() {
        let mut mask = vec![false; 25];
        mask[12] = true;
        let mut data = field(5, 5, Some(mask));
        data.values = vec![[2.0]; 25];
        let smoothed = data.smooth(SmoothKind::Gaussian, 1).unwrap();
        assert_eq!(smoothed.mask, data.mask);
        for (v, m) in smoothed.values.iter().zip(&smoothed.mask) {
            if !m {
                assert!((v[0] - 2.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn rotation_angle_must_be_a_quarter_turn() {
        assert_eq!(FieldData::<1>::quarter_turns(-90.0).unwrap(), 3);
        assert_eq!(FieldData::<1>::quarter_turns(450.0).unwrap(), 1);
        assert!(FieldData::<1>::quarter_turns(45.0).is_err());
    }
}
