//! Masked two-component vector fields.
//!
//! Components share one grid, one mask and one unit. Derived views
//! (magnitude, angle, components) and kinematic diagnostics (Jacobian,
//! divergence, vorticity, shear) are returned as [`ScalarField`]s.
use glam::DVec2;

use crate::error::Result;
use crate::field::data::FieldData;
use crate::field::gradient::{gradient, Gradient};
use crate::field::ops::align;
use crate::field::{
    Dtype, FillOptions, GriddedQuantity, ImportOptions, MirrorOptions, ScalarField, SmoothKind,
};
use crate::grid::{AxisDirection, Grid, Padding};
use crate::interp::{DenseInterpolant, DenseMethod};
use crate::units::{Quantity, Unit};

/// The four partial derivatives of a vector field.
#[derive(Clone, Debug, PartialEq)]
pub struct Jacobian {
    pub du_dx: ScalarField,
    pub du_dy: ScalarField,
    pub dv_dx: ScalarField,
    pub dv_dy: ScalarField,
}

/// A vector field `(u, v)` on a rectilinear grid.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorField {
    pub(crate) data: FieldData<2>,
}

impl VectorField {
    pub(crate) fn from_data(data: FieldData<2>) -> Self {
        Self { data }
    }

    pub fn new(
        grid: Grid,
        values: Vec<DVec2>,
        mask: Option<Vec<bool>>,
        unit: Unit,
        dtype: Dtype,
    ) -> Result<Self> {
        let values = values.into_iter().map(|v| v.to_array()).collect();
        FieldData::new(grid, values, mask, unit, dtype).map(Self::from_data)
    }

    /// Bulk import from raw axes and row-major component arrays.
    pub fn import(
        x: Vec<f64>,
        y: Vec<f64>,
        u: Vec<f64>,
        v: Vec<f64>,
        mask: Option<Vec<bool>>,
        options: &ImportOptions,
    ) -> Result<Self> {
        if u.len() != v.len() {
            return Err(crate::Error::InvalidArgument(format!(
                "component lengths differ: {} and {}",
                u.len(),
                v.len()
            )));
        }
        let values = u.into_iter().zip(v).map(|(a, b)| [a, b]).collect();
        FieldData::import(x, y, values, mask, options).map(Self::from_data)
    }

    /// Joins two scalar fields; `v` is converted to the unit of `u` and both
    /// are intersected onto a common grid.
    pub fn from_components(u: &ScalarField, v: &ScalarField) -> Result<Self> {
        let factor = v.data.unit.conversion_factor(&u.data.unit)?;
        let (a, b) = align(&u.data, &v.data)?;
        let values = a
            .values
            .iter()
            .zip(&b.values)
            .map(|(x, y)| [x[0], y[0] * factor])
            .collect();
        let mask = a.mask.iter().zip(&b.mask).map(|(p, q)| *p || *q).collect();
        let dtype = a.dtype.combine(b.dtype, factor == 1.0);
        Ok(Self::from_data(FieldData::from_parts(
            a.grid.clone(),
            values,
            mask,
            a.unit.clone(),
            dtype,
        )))
    }

    /// Evaluates `f` at every node of `grid`.
    pub fn from_fn(grid: Grid, unit: Unit, f: impl Fn(DVec2) -> DVec2) -> Result<Self> {
        let values = (0..grid.len())
            .map(|idx| {
                let (ix, iy) = grid.cell(idx);
                f(grid.point(ix, iy))
            })
            .collect();
        Self::new(grid, values, None, unit, Dtype::Float64)
    }

    /// Row-major `[u, v]` pairs; only meaningful where the mask is `false`.
    pub fn values(&self) -> &[[f64; 2]] {
        &self.data.values
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype
    }

    pub fn set_values(&mut self, values: Vec<DVec2>) -> Result<()> {
        self.data
            .set_values(values.into_iter().map(|v| v.to_array()).collect())
    }

    pub fn set_mask(&mut self, mask: Vec<bool>) -> Result<()> {
        self.data.set_mask(mask)
    }

    pub fn value_at_with(&self, p: DVec2, method: DenseMethod) -> Result<Option<DVec2>> {
        Ok(self.data.value_at(p, method)?.map(DVec2::from_array))
    }

    fn channel(&self, f: impl Fn(&[f64; 2]) -> f64, unit: Unit, dtype: Dtype) -> ScalarField {
        let values = self.data.values.iter().map(|v| [f(v)]).collect();
        ScalarField::from_data(FieldData::from_parts(
            self.data.grid.clone(),
            values,
            self.data.mask.clone(),
            unit,
            dtype,
        ))
    }

    fn float_dtype(&self) -> Dtype {
        match self.data.dtype {
            Dtype::Float32 => Dtype::Float32,
            _ => Dtype::Float64,
        }
    }

    pub fn component_x(&self) -> ScalarField {
        self.channel(|v| v[0], self.data.unit.clone(), self.data.dtype)
    }

    pub fn component_y(&self) -> ScalarField {
        self.channel(|v| v[1], self.data.unit.clone(), self.data.dtype)
    }

    pub fn magnitude(&self) -> ScalarField {
        self.channel(|v| v[0].hypot(v[1]), self.data.unit.clone(), self.float_dtype())
    }

    /// Direction of the vectors in radians, counter-clockwise from +x.
    pub fn angle(&self) -> Result<ScalarField> {
        let rad = Unit::parse("rad")?;
        Ok(self.channel(|v| v[1].atan2(v[0]), rad, self.float_dtype()))
    }

    pub fn jacobian(&self) -> Result<Jacobian> {
        let gu = gradient(&self.data, 0)?;
        let gv = gradient(&self.data, 1)?;
        let part = |g: &Gradient, dy: bool| {
            let values = if dy { &g.dy } else { &g.dx };
            ScalarField::from_data(FieldData::from_parts(
                self.data.grid.clone(),
                values.iter().map(|&d| [d]).collect(),
                g.mask.clone(),
                g.unit.clone(),
                Dtype::Float64,
            ))
        };
        Ok(Jacobian {
            du_dx: part(&gu, false),
            du_dy: part(&gu, true),
            dv_dx: part(&gv, false),
            dv_dy: part(&gv, true),
        })
    }

    /// `du/dx + dv/dy`.
    pub fn divergence(&self) -> Result<ScalarField> {
        let j = self.jacobian()?;
        &j.du_dx + &j.dv_dy
    }

    /// `dv/dx - du/dy`.
    pub fn vorticity(&self) -> Result<ScalarField> {
        let j = self.jacobian()?;
        &j.dv_dx - &j.du_dy
    }

    /// Shear strain `du/dy + dv/dx`.
    pub fn shear(&self) -> Result<ScalarField> {
        let j = self.jacobian()?;
        &j.du_dy + &j.dv_dx
    }

    pub fn smooth(&self, kind: SmoothKind, size: usize) -> Result<Self> {
        self.data.smooth(kind, size).map(Self::from_data)
    }

    /// Multiplies the x coordinates; components keep their sign.
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

    pub fn scale_values(&self, factor: f64) -> Self {
        self * factor
    }

    pub fn change_unit(&self, unit: &Unit) -> Result<Self> {
        self.data.change_unit(unit).map(Self::from_data)
    }

    pub fn change_axis_unit(&self, direction: AxisDirection, unit: &Unit) -> Result<Self> {
        self.data
            .change_axis_unit(direction, unit)
            .map(Self::from_data)
    }

    /// Rotates grid and vectors counter-clockwise about the origin.
    ///
    /// Fails with [`crate::Error::InvalidArgument`] unless `angle_deg` is a multiple of 90.
    pub fn rotate(&self, angle_deg: f64) -> Result<Self> {
        let turns = FieldData::<2>::quarter_turns(angle_deg)?;
        let mut out = self.data.rotate_quarter(turns);
        let unsigned = out.dtype.is_unsigned();
        for v in out.values.iter_mut() {
            *v = match turns {
                1 => [-v[1], v[0]],
                2 => [-v[0], -v[1]],
                3 => [v[1], -v[0]],
                _ => *v,
            };
        }
        if unsigned && turns != 0 {
            out.dtype = Dtype::Int64;
        }
        Ok(Self::from_data(out))
    }

    /// The field rotated pointwise by 90 degrees, `(u, v) -> (-v, u)`, on the same grid.
    pub(crate) fn perpendicular(&self, sign: f64) -> Self {
        let mut out = self.data.clone();
        for v in out.values.iter_mut() {
            *v = [-sign * v[1], sign * v[0]];
        }
        if out.dtype.is_unsigned() {
            out.dtype = Dtype::Int64;
        }
        Self::from_data(out)
    }

    pub fn interpolant(&self, method: DenseMethod) -> Result<DenseInterpolant<2>> {
        self.data.interpolant(method)
    }
}

impl GriddedQuantity for VectorField {
    type Sample = DVec2;

    fn grid(&self) -> &Grid {
        &self.data.grid
    }

    fn mask(&self) -> &[bool] {
        &self.data.mask
    }

    fn unit(&self) -> &Unit {
        &self.data.unit
    }

    fn value_at_index(&self, ix: usize, iy: usize) -> Result<Option<DVec2>> {
        Ok(self
            .data
            .value_at_index(ix, iy)?
            .map(DVec2::from_array))
    }

    fn value_at(&self, p: DVec2) -> Result<Option<DVec2>> {
        self.value_at_with(p, DenseMethod::Linear)
    }

    fn crop(&self, x: (f64, f64), y: (f64, f64)) -> Result<Self> {
        self.data.crop(x, y).map(Self::from_data)
    }

    fn crop_indices(&self, x: (usize, usize), y: (usize, usize)) -> Result<Self> {
        self.data.crop_indices(x, y).map(Self::from_data)
    }

    fn extend(&self, pad: Padding, fill: Option<DVec2>) -> Result<Self> {
        self.data
            .extend(pad, fill.map(|v| v.to_array()))
            .map(Self::from_data)
    }

    /// Mirrors both components; the component normal to the plane changes sign.
    fn mirror(&self, options: &MirrorOptions) -> Result<Self> {
        let c = options.coefficient;
        let coefficients = match options.direction {
            AxisDirection::X => [-c, c],
            AxisDirection::Y => [c, -c],
        };
        self.data.mirror(options, coefficients).map(Self::from_data)
    }

    fn fill(&self, options: &FillOptions) -> Result<Self> {
        self.data.fill(options).map(Self::from_data)
    }

    fn crop_masked_border(&self, hard: bool) -> Result<Self> {
        self.data.crop_masked_border(hard).map(Self::from_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Axis;
    use crate::Error;

    fn grid(n: usize) -> Grid {
        let m = Unit::parse("m").unwrap();
        Grid::new(
            Axis::linspace(-1.0, 1.0, n, m.clone()).unwrap(),
            Axis::linspace(-1.0, 1.0, n, m).unwrap(),
        )
    }

    fn field(f: impl Fn(DVec2) -> DVec2) -> VectorField {
        VectorField::from_fn(grid(9), Unit::parse("m/s").unwrap(), f).unwrap()
    }

    fn assert_uniform(field: &ScalarField, expected: f64) {
        for (v, m) in field.values().iter().zip(field.mask()) {
            if !m {
                assert!((v - expected).abs() < 1e-9, "{v} != {expected}");
            }
        }
    }

    #[test]
    fn rotation_field_has_vorticity_and_no_divergence() {
        let rotation = field(|p| DVec2::new(-p.y, p.x));
        assert_uniform(&rotation.vorticity().unwrap(), 2.0);
        assert_uniform(&rotation.divergence().unwrap(), 0.0);
        assert_uniform(&rotation.shear().unwrap(), 0.0);
        assert_eq!(
            rotation.vorticity().unwrap().unit(),
            &Unit::parse("1/s").unwrap()
        );
    }

    #[test]
    fn strain_field_has_shear() {
        let strain = field(|p| DVec2::new(p.y, p.x));
        assert_uniform(&strain.shear().unwrap(), 2.0);
        assert_uniform(&strain.vorticity().unwrap(), 0.0);
        let j = strain.jacobian().unwrap();
        assert_uniform(&j.du_dx, 0.0);
        assert_uniform(&j.du_dy, 1.0);
    }

    #[test]
    fn derived_views() {
        let f = field(|_| DVec2::new(3.0, -4.0));
        assert_uniform(&f.magnitude(), 5.0);
        let angle = f.angle().unwrap();
        assert_uniform(&angle, (-4.0f64).atan2(3.0));
        assert_uniform(&f.component_y(), -4.0);
        assert_eq!(angle.unit(), &Unit::parse("rad").unwrap());
    }

    #[test]
    fn components_round_trip_through_scalars() {
        let f = field(|p| DVec2::new(p.x, 2.0 * p.y));
        let u = f.component_x();
        let v = f
            .component_y()
            .change_unit(&Unit::parse("mm/s").unwrap())
            .unwrap();
        let joined = VectorField::from_components(&u, &v).unwrap();
        for (a, b) in joined.values().iter().zip(f.values()) {
            assert!((a[0] - b[0]).abs() < 1e-12 && (a[1] - b[1]).abs() < 1e-12);
        }
    }

    #[test]
    fn mirror_flips_the_normal_component() {
        let f = field(|_| DVec2::new(1.0, 2.0));
        let out = f
            .mirror(&MirrorOptions::new(AxisDirection::X, -1.0, 2))
            .unwrap();
        assert_eq!(out.grid().nx(), 11);
        assert_eq!(out.value_at_index(0, 4).unwrap(), Some(DVec2::new(-1.0, 2.0)));
        assert_eq!(out.value_at_index(2, 4).unwrap(), Some(DVec2::new(1.0, 2.0)));

        let out = f
            .mirror(&MirrorOptions::new(AxisDirection::Y, 1.0, 1).with_coefficient(-1.0))
            .unwrap();
        assert_eq!(out.value_at_index(3, 9).unwrap(), Some(DVec2::new(-1.0, 2.0)));
    }

    #[test]
    fn rotation_turns_vectors_with_the_grid() {
        let f = field(|_| DVec2::X);
        let r = f.rotate(90.0).unwrap();
        assert_eq!(r.value_at_index(0, 0).unwrap(), Some(DVec2::Y));
        let r = f.rotate(270.0).unwrap();
        assert_eq!(r.value_at_index(0, 0).unwrap(), Some(DVec2::new(0.0, -1.0)));
        assert!(matches!(f.rotate(10.0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn import_checks_component_lengths() {
        let err = VectorField::import(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0; 4],
            vec![0.0; 3],
            None,
            &ImportOptions::default(),
        );
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }
}
