//! Arithmetic between fields, plain numbers and quantities.
//!
//! Binary field operations first bring both operands onto one grid: axis
//! units are converted, and grids that differ are intersected along their
//! shared coordinates. The result mask is the union of the operand masks.
use std::borrow::Cow;
use std::ops::{Add, Div, Mul, Neg, Sub};

use tracing::debug;

use crate::error::{Error, Result};
use crate::field::data::FieldData;
use crate::field::{Dtype, ScalarField, VectorField};
use crate::grid::{Axis, AxisDirection};
use crate::units::{Quantity, Unit};

/// Puts `b` on the grid of `a`.
///
/// Fails with [`Error::IncompatibleGrids`] when the axes share fewer than two
/// contiguous coordinates.
pub(crate) fn align<'a, const A: usize, const B: usize>(
    a: &'a FieldData<A>,
    b: &'a FieldData<B>,
) -> Result<(Cow<'a, FieldData<A>>, Cow<'a, FieldData<B>>)> {
    let mut b = Cow::Borrowed(b);
    for dir in [AxisDirection::X, AxisDirection::Y] {
        let unit = a.grid.axis(dir).unit();
        if b.grid.axis(dir).unit() != unit {
            b = Cow::Owned(b.change_axis_unit(dir, unit)?);
        }
    }
    if a.grid.approx_eq(&b.grid) {
        return Ok((Cow::Borrowed(a), b));
    }

    let (ax, bx) = overlap(a.grid.x(), b.grid.x(), "x")?;
    let (ay, by) = overlap(a.grid.y(), b.grid.y(), "y")?;
    debug!(
        "Intersecting grids {:?} and {:?} to x{:?} y{:?}.",
        a.grid.shape(),
        b.grid.shape(),
        ax,
        ay
    );
    let a = a.crop_indices(ax, ay)?;
    let mut b = b.crop_indices(bx, by)?;
    b.grid = a.grid.clone();
    Ok((Cow::Owned(a), Cow::Owned(b)))
}

type IndexRange = (usize, usize);

fn overlap(a: &Axis, b: &Axis, name: &str) -> Result<(IndexRange, IndexRange)> {
    let shared = a.shared_indices(b);
    let contiguous = shared
        .windows(2)
        .all(|w| w[1].0 == w[0].0 + 1 && w[1].1 == w[0].1 + 1);
    match (shared.first(), shared.last()) {
        (Some(&(a0, b0)), Some(&(a1, b1))) if shared.len() >= 2 && contiguous => {
            Ok(((a0, a1), (b0, b1)))
        }
        _ => Err(Error::IncompatibleGrids(format!(
            "{name} axes [{}, {}] and [{}, {}] share no common sub-axis",
            a.first(),
            a.last(),
            b.first(),
            b.last()
        ))),
    }
}

/// Cell-wise combination of two aligned fields; masked in either operand means masked.
fn zip_with<const A: usize, const B: usize, const R: usize>(
    a: &FieldData<A>,
    b: &FieldData<B>,
    unit: Unit,
    dtype: Dtype,
    f: impl Fn(&[f64; A], &[f64; B]) -> [f64; R],
) -> FieldData<R> {
    let len = a.grid.len();
    let mut values = Vec::with_capacity(len);
    let mut mask = Vec::with_capacity(len);
    for i in 0..len {
        let masked = a.mask[i] || b.mask[i];
        mask.push(masked);
        values.push(if masked {
            [f64::NAN; R]
        } else {
            f(&a.values[i], &b.values[i])
        });
    }
    FieldData::from_parts(a.grid.clone(), values, mask, unit, dtype)
}

/// Applies `f` to every unmasked value, keeping the storage type when the results fit it.
fn map_values<const N: usize>(
    data: &FieldData<N>,
    unit: Unit,
    f: impl Fn(f64) -> f64,
) -> FieldData<N> {
    let values: Vec<[f64; N]> = data
        .values
        .iter()
        .zip(&data.mask)
        .map(|(v, &m)| if m { *v } else { v.map(&f) })
        .collect();
    let dtype = fitted(data.dtype, &values, &data.mask);
    data.with_values(values, data.mask.clone(), unit, dtype)
}

fn fitted<const N: usize>(dtype: Dtype, values: &[[f64; N]], mask: &[bool]) -> Dtype {
    let mut unmasked = values
        .iter()
        .zip(mask)
        .filter(|(_, &m)| !m)
        .flat_map(|(v, _)| v.iter().copied());
    let fits = match dtype {
        Dtype::Float64 | Dtype::Float32 => true,
        Dtype::Int64 => unmasked.all(|c| c.fract() == 0.0),
        Dtype::UInt64 => unmasked.all(|c| c.fract() == 0.0 && c >= 0.0),
    };
    if fits {
        dtype
    } else {
        Dtype::Float64
    }
}

fn negate<const N: usize>(data: &FieldData<N>) -> Result<FieldData<N>> {
    if data.dtype.is_unsigned() {
        return Err(Error::InvalidArgument(
            "cannot negate a field stored as UInt64".into(),
        ));
    }
    Ok(map_values(data, data.unit.clone(), |v| -v))
}

fn additive(a: &ScalarField, b: &ScalarField, sign: f64) -> Result<ScalarField> {
    let factor = b.data.unit.conversion_factor(&a.data.unit)?;
    let (a, b) = align(&a.data, &b.data)?;
    let closed = sign > 0.0 && factor == 1.0;
    let dtype = a.dtype.combine(b.dtype, closed);
    Ok(ScalarField::from_data(zip_with(
        &a,
        &b,
        a.unit.clone(),
        dtype,
        |x, y| [x[0] + sign * factor * y[0]],
    )))
}

impl Add for &ScalarField {
    type Output = Result<ScalarField>;

    fn add(self, rhs: &ScalarField) -> Result<ScalarField> {
        additive(self, rhs, 1.0)
    }
}

impl Sub for &ScalarField {
    type Output = Result<ScalarField>;

    fn sub(self, rhs: &ScalarField) -> Result<ScalarField> {
        additive(self, rhs, -1.0)
    }
}

impl Mul for &ScalarField {
    type Output = Result<ScalarField>;

    fn mul(self, rhs: &ScalarField) -> Result<ScalarField> {
        let (a, b) = align(&self.data, &rhs.data)?;
        let dtype = a.dtype.combine(b.dtype, true);
        Ok(ScalarField::from_data(zip_with(
            &a,
            &b,
            &a.unit * &b.unit,
            dtype,
            |x, y| [x[0] * y[0]],
        )))
    }
}

impl Div for &ScalarField {
    type Output = Result<ScalarField>;

    /// Cells divided by zero end up masked.
    fn div(self, rhs: &ScalarField) -> Result<ScalarField> {
        let (a, b) = align(&self.data, &rhs.data)?;
        let dtype = a.dtype.combine(b.dtype, false);
        Ok(ScalarField::from_data(zip_with(
            &a,
            &b,
            &a.unit / &b.unit,
            dtype,
            |x, y| [x[0] / y[0]],
        )))
    }
}

impl Neg for &ScalarField {
    type Output = Result<ScalarField>;

    fn neg(self) -> Result<ScalarField> {
        negate(&self.data).map(ScalarField::from_data)
    }
}

macro_rules! scalar_number_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<f64> for &ScalarField {
            type Output = ScalarField;

            fn $method(self, rhs: f64) -> ScalarField {
                ScalarField::from_data(map_values(&self.data, self.data.unit.clone(), |v| v $op rhs))
            }
        }

        impl $trait<f64> for ScalarField {
            type Output = ScalarField;

            fn $method(self, rhs: f64) -> ScalarField {
                &self $op rhs
            }
        }
    };
}

scalar_number_op!(Add, add, +);
scalar_number_op!(Sub, sub, -);
scalar_number_op!(Mul, mul, *);
scalar_number_op!(Div, div, /);

impl Mul<&Quantity> for &ScalarField {
    type Output = ScalarField;

    fn mul(self, rhs: &Quantity) -> ScalarField {
        let (magnitude, unit) = rhs.unit.normalized();
        let k = rhs.value * magnitude;
        ScalarField::from_data(map_values(&self.data, &self.data.unit * &unit, |v| v * k))
    }
}

impl Div<&Quantity> for &ScalarField {
    type Output = ScalarField;

    fn div(self, rhs: &Quantity) -> ScalarField {
        let (magnitude, unit) = rhs.unit.normalized();
        let k = rhs.value * magnitude;
        ScalarField::from_data(map_values(&self.data, &self.data.unit / &unit, |v| v / k))
    }
}

impl Add<&Quantity> for &ScalarField {
    type Output = Result<ScalarField>;

    fn add(self, rhs: &Quantity) -> Result<ScalarField> {
        let k = rhs.to(&self.data.unit)?.value;
        Ok(self + k)
    }
}

impl Sub<&Quantity> for &ScalarField {
    type Output = Result<ScalarField>;

    fn sub(self, rhs: &Quantity) -> Result<ScalarField> {
        let k = rhs.to(&self.data.unit)?.value;
        Ok(self - k)
    }
}

impl ScalarField {
    /// Raises every value to `p`; the unit is raised accordingly.
    pub fn pow(&self, p: f64) -> Result<ScalarField> {
        let unit = self.data.unit.powf(p)?;
        Ok(ScalarField::from_data(map_values(&self.data, unit, |v| {
            v.powf(p)
        })))
    }
}

fn vector_additive(a: &VectorField, b: &VectorField, sign: f64) -> Result<VectorField> {
    let factor = b.data.unit.conversion_factor(&a.data.unit)?;
    let (a, b) = align(&a.data, &b.data)?;
    let closed = sign > 0.0 && factor == 1.0;
    let dtype = a.dtype.combine(b.dtype, closed);
    let k = sign * factor;
    Ok(VectorField::from_data(zip_with(
        &a,
        &b,
        a.unit.clone(),
        dtype,
        |x, y| [x[0] + k * y[0], x[1] + k * y[1]],
    )))
}

impl Add for &VectorField {
    type Output = Result<VectorField>;

    fn add(self, rhs: &VectorField) -> Result<VectorField> {
        vector_additive(self, rhs, 1.0)
    }
}

impl Sub for &VectorField {
    type Output = Result<VectorField>;

    fn sub(self, rhs: &VectorField) -> Result<VectorField> {
        vector_additive(self, rhs, -1.0)
    }
}

impl Mul<&ScalarField> for &VectorField {
    type Output = Result<VectorField>;

    fn mul(self, rhs: &ScalarField) -> Result<VectorField> {
        let (a, b) = align(&self.data, &rhs.data)?;
        let dtype = a.dtype.combine(b.dtype, true);
        Ok(VectorField::from_data(zip_with(
            &a,
            &b,
            &a.unit * &b.unit,
            dtype,
            |v, s| [v[0] * s[0], v[1] * s[0]],
        )))
    }
}

impl Div<&ScalarField> for &VectorField {
    type Output = Result<VectorField>;

    fn div(self, rhs: &ScalarField) -> Result<VectorField> {
        let (a, b) = align(&self.data, &rhs.data)?;
        let dtype = a.dtype.combine(b.dtype, false);
        Ok(VectorField::from_data(zip_with(
            &a,
            &b,
            &a.unit / &b.unit,
            dtype,
            |v, s| [v[0] / s[0], v[1] / s[0]],
        )))
    }
}

impl Mul<f64> for &VectorField {
    type Output = VectorField;

    fn mul(self, rhs: f64) -> VectorField {
        VectorField::from_data(map_values(&self.data, self.data.unit.clone(), |v| v * rhs))
    }
}

impl Div<f64> for &VectorField {
    type Output = VectorField;

    fn div(self, rhs: f64) -> VectorField {
        VectorField::from_data(map_values(&self.data, self.data.unit.clone(), |v| v / rhs))
    }
}

impl Neg for &VectorField {
    type Output = Result<VectorField>;

    fn neg(self) -> Result<VectorField> {
        negate(&self.data).map(VectorField::from_data)
    }
}
