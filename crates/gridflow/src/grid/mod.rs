//! Rectilinear grids shared by scalar and vector fields.
//!
//! A [`Grid`] pairs an x and a y [`Axis`] and an `xy_scale` unit factor used
//! when the physical x/y scales differ from the stored coordinates (for
//! example optical versus real distances). Samples are stored row-major with
//! `idx = iy * nx + ix`.
use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::units::Unit;

pub(crate) mod array;
pub mod axis;

pub use array::Padding;
pub use axis::{Axis, Locate, Location};

/// One of the two grid directions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisDirection {
    X,
    Y,
}

impl AxisDirection {
    pub fn other(self) -> Self {
        match self {
            AxisDirection::X => AxisDirection::Y,
            AxisDirection::Y => AxisDirection::X,
        }
    }
}

/// Two coordinate axes and the x/y scale factor.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    x: Axis,
    y: Axis,
    xy_scale: Unit,
}

impl Grid {
    pub fn new(x: Axis, y: Axis) -> Self {
        Self {
            x,
            y,
            xy_scale: Unit::dimensionless(),
        }
    }

    pub fn with_xy_scale(mut self, xy_scale: Unit) -> Self {
        self.xy_scale = xy_scale;
        self
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn y(&self) -> &Axis {
        &self.y
    }

    pub fn axis(&self, direction: AxisDirection) -> &Axis {
        match direction {
            AxisDirection::X => &self.x,
            AxisDirection::Y => &self.y,
        }
    }

    pub fn xy_scale(&self) -> &Unit {
        &self.xy_scale
    }

    /// Factor converting a y-axis distance into x-axis units, `xy_scale` included.
    ///
    /// With y in `px`, x in `mm` and `xy_scale = 0.05 mm/px` this is `0.05`.
    /// Fails with [`crate::Error::IncompatibleUnits`] when `y unit * xy_scale`
    /// and the x unit measure different dimensions.
    pub fn y_to_x(&self) -> Result<f64> {
        (self.y.unit() * &self.xy_scale).conversion_factor(self.x.unit())
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn ny(&self) -> usize {
        self.y.len()
    }

    /// `(nx, ny)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nx(), self.ny())
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.nx() * self.ny()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn index(&self, ix: usize, iy: usize) -> usize {
        iy * self.nx() + ix
    }

    #[inline]
    pub fn cell(&self, idx: usize) -> (usize, usize) {
        (idx % self.nx(), idx / self.nx())
    }

    /// Coordinates of the node at `(ix, iy)`.
    #[inline]
    pub fn point(&self, ix: usize, iy: usize) -> DVec2 {
        DVec2::new(self.x.values()[ix], self.y.values()[iy])
    }

    /// Lower-left corner of the domain.
    pub fn min(&self) -> DVec2 {
        DVec2::new(self.x.first(), self.y.first())
    }

    /// Upper-right corner of the domain.
    pub fn max(&self) -> DVec2 {
        DVec2::new(self.x.last(), self.y.last())
    }

    pub fn extent(&self) -> DVec2 {
        self.max() - self.min()
    }

    pub fn contains(&self, p: DVec2) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y)
    }

    /// Indices of the node nearest to `p`.
    pub fn nearest_cell(&self, p: DVec2) -> Result<(usize, usize)> {
        Ok((self.x.nearest(p.x)?, self.y.nearest(p.y)?))
    }

    /// Area attributed to a node: half the spacing to each neighbour in both directions.
    ///
    /// Measured in x unit times y unit, without `xy_scale`.
    pub fn cell_area(&self, ix: usize, iy: usize) -> f64 {
        half_spacing_width(self.x.values(), ix) * half_spacing_width(self.y.values(), iy)
    }

    pub(crate) fn with_axis(&self, direction: AxisDirection, axis: Axis) -> Grid {
        let mut out = self.clone();
        match direction {
            AxisDirection::X => out.x = axis,
            AxisDirection::Y => out.y = axis,
        }
        out
    }

    pub(crate) fn crop(&self, xr: (usize, usize), yr: (usize, usize)) -> Result<Grid> {
        Ok(Grid {
            x: self.x.crop(xr.0, xr.1)?,
            y: self.y.crop(yr.0, yr.1)?,
            xy_scale: self.xy_scale.clone(),
        })
    }

    pub(crate) fn extend(&self, pad: Padding) -> Grid {
        Grid {
            x: self.x.extend(pad.left, pad.right),
            y: self.y.extend(pad.down, pad.up),
            xy_scale: self.xy_scale.clone(),
        }
    }

    /// Axes of the grid rotated counter-clockwise about the origin.
    pub(crate) fn rotate_quarter(&self, quarter_turns: u8) -> Grid {
        let (x, y) = match quarter_turns % 4 {
            0 => (self.x.clone(), self.y.clone()),
            1 => (self.y.mirrored(), self.x.clone()),
            2 => (self.x.mirrored(), self.y.mirrored()),
            _ => (self.y.clone(), self.x.mirrored()),
        };
        // Odd turns swap the axes, so one y unit becomes one old x unit.
        let xy_scale = if quarter_turns % 2 == 1 {
            self.xy_scale.recip()
        } else {
            self.xy_scale.clone()
        };
        Grid { x, y, xy_scale }
    }

    pub fn approx_eq(&self, other: &Grid) -> bool {
        self.x.approx_eq(&other.x) && self.y.approx_eq(&other.y)
    }
}

fn half_spacing_width(values: &[f64], i: usize) -> f64 {
    let lo = if i > 0 { values[i] - values[i - 1] } else { 0.0 };
    let hi = if i + 1 < values.len() {
        values[i + 1] - values[i]
    } else {
        0.0
    };
    0.5 * (lo + hi)
}
