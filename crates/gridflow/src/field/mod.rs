//! Masked scalar and vector fields on rectilinear grids.
//!
//! Both field types own a [`Grid`], a row-major value array, a mask of the
//! same shape (`true` = unknown) and a value [`Unit`]. Non-finite values are
//! always folded into the mask. Operations shared by both types are exposed
//! through [`GriddedQuantity`].
use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{Grid, Padding};
use crate::units::Unit;

pub(crate) mod data;
pub mod fill;
pub(crate) mod gradient;
pub mod mirror;
mod ops;
pub mod scalar;
pub mod vector;

pub use fill::{FillKind, FillOptions};
pub use mirror::MirrorOptions;
pub use scalar::{Profile, SmoothKind, ScalarField};
pub use vector::{Jacobian, VectorField};

/// Numeric storage type of a field's values.
///
/// Values are held as `f64` and coerced to the representable set of the
/// storage type whenever they are assigned.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Dtype {
    #[default]
    Float64,
    Float32,
    Int64,
    UInt64,
}

impl Dtype {
    pub fn is_integer(self) -> bool {
        matches!(self, Dtype::Int64 | Dtype::UInt64)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, Dtype::UInt64)
    }

    /// Rounds `v` into the storage type. Non-finite values pass through.
    pub fn coerce(self, v: f64) -> Result<f64> {
        if !v.is_finite() {
            return Ok(v);
        }
        match self {
            Dtype::Float64 => Ok(v),
            Dtype::Float32 => Ok(v as f32 as f64),
            Dtype::Int64 => Ok(v.trunc()),
            Dtype::UInt64 if v < 0.0 => Err(Error::InvalidArgument(format!(
                "negative value {v} cannot be stored as UInt64"
            ))),
            Dtype::UInt64 => Ok(v.trunc()),
        }
    }

    /// Storage type of the result of combining two fields.
    ///
    /// Sums and products of equal types keep the type; everything else is `Float64`.
    pub(crate) fn combine(self, other: Dtype, closed: bool) -> Dtype {
        if closed && self == other {
            self
        } else if self == Dtype::Float32 && other == Dtype::Float32 {
            Dtype::Float32
        } else {
            Dtype::Float64
        }
    }
}

/// Units and storage type applied when importing raw arrays into a field.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportOptions {
    pub unit_x: Unit,
    pub unit_y: Unit,
    pub unit_values: Unit,
    pub dtype: Dtype,
    /// Physical size of one y unit in x units, see [`Grid::y_to_x`].
    pub xy_scale: Unit,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the same unit on both axes.
    pub fn with_axis_unit(mut self, unit: Unit) -> Self {
        self.unit_x = unit.clone();
        self.unit_y = unit;
        self
    }

    pub fn with_unit_x(mut self, unit: Unit) -> Self {
        self.unit_x = unit;
        self
    }

    pub fn with_unit_y(mut self, unit: Unit) -> Self {
        self.unit_y = unit;
        self
    }

    pub fn with_unit_values(mut self, unit: Unit) -> Self {
        self.unit_values = unit;
        self
    }

    pub fn with_dtype(mut self, dtype: Dtype) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn with_xy_scale(mut self, xy_scale: Unit) -> Self {
        self.xy_scale = xy_scale;
        self
    }

    /// Parses unit strings, e.g. `ImportOptions::parse("mm", "mm", "m/s")`.
    pub fn parse(unit_x: &str, unit_y: &str, unit_values: &str) -> Result<Self> {
        Ok(Self {
            unit_x: Unit::parse(unit_x)?,
            unit_y: Unit::parse(unit_y)?,
            unit_values: Unit::parse(unit_values)?,
            ..Self::default()
        })
    }
}

/// Operations shared by every masked gridded quantity.
pub trait GriddedQuantity: Sized {
    /// Value held by one grid cell.
    type Sample;

    fn grid(&self) -> &Grid;

    /// Row-major mask, `true` where the value is unknown.
    fn mask(&self) -> &[bool];

    fn unit(&self) -> &Unit;

    /// Stored value at node `(ix, iy)`; `None` when the cell is masked.
    ///
    /// Fails with [`Error::OutOfRange`] for indices outside the grid.
    fn value_at_index(&self, ix: usize, iy: usize) -> Result<Option<Self::Sample>>;

    /// Bilinear value at `p`; `None` when any surrounding node is masked.
    ///
    /// Fails with [`Error::OutOfRange`] outside the grid.
    fn value_at(&self, p: DVec2) -> Result<Option<Self::Sample>>;

    /// Sub-field between inclusive coordinate bounds.
    fn crop(&self, x: (f64, f64), y: (f64, f64)) -> Result<Self>;

    /// Sub-field between inclusive index bounds.
    fn crop_indices(&self, x: (usize, usize), y: (usize, usize)) -> Result<Self>;

    /// Pads the grid; new cells hold `fill`, or are masked when `fill` is `None`.
    ///
    /// `fill` is coerced to the field's [`Dtype`]; fails with
    /// [`Error::InvalidArgument`] when the storage type cannot hold it.
    fn extend(&self, pad: Padding, fill: Option<Self::Sample>) -> Result<Self>;

    fn mirror(&self, options: &MirrorOptions) -> Result<Self>;

    fn fill(&self, options: &FillOptions) -> Result<Self>;

    /// Trims masked borders.
    ///
    /// Soft mode removes outer rows and columns that are entirely masked. Hard
    /// mode then keeps removing the border with the most masked cells until no
    /// masked cell remains, failing with [`Error::InvalidArgument`] if the grid
    /// would shrink below 2 x 2.
    fn crop_masked_border(&self, hard: bool) -> Result<Self>;

    fn masked_count(&self) -> usize {
        self.mask().iter().filter(|&&m| m).count()
    }

    fn is_fully_masked(&self) -> bool {
        self.mask().iter().all(|&m| m)
    }
}
