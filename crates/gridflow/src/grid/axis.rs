//! One-dimensional coordinate axes.
//!
//! An [`Axis`] is a strictly increasing sequence of coordinates with a unit of
//! magnitude one. Lookups return bounding, nearest or fractional indices via
//! binary search and fail with [`Error::OutOfRange`] outside `[first, last]`.
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::units::{Quantity, Unit};

/// Relative spacing deviation above which an axis is reported as uneven.
const UNEVEN_SPACING_TOLERANCE: f64 = 1e-2;

/// Relative tolerance used to accept coordinates sitting on an axis node or edge.
const EDGE_TOLERANCE: f64 = 1e-12;

/// Kind of index lookup performed by [`Axis::locate`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Locate {
    Bounds,
    Nearest,
    Decimal,
}

/// Result of [`Axis::locate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Location {
    /// Indices of the nodes around the value; equal when the value is a node.
    Bounds(usize, usize),
    Nearest(usize),
    /// Fractional index, linear between bounding nodes.
    Decimal(f64),
}

/// A strictly increasing coordinate axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    values: Vec<f64>,
    unit: Unit,
}

impl Axis {
    /// Creates an axis; the unit magnitude is folded into the coordinates.
    pub fn new(values: Vec<f64>, unit: Unit) -> Result<Self> {
        if values.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "an axis needs at least 2 values, got {}",
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument(
                "axis values must be finite".into(),
            ));
        }
        if values.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidArgument(
                "axis values must be strictly increasing".into(),
            ));
        }

        let (magnitude, unit) = unit.normalized();
        let values = if magnitude != 1.0 {
            if magnitude < 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "axis unit magnitude must be positive, got {magnitude}"
                )));
            }
            values.into_iter().map(|v| v * magnitude).collect()
        } else {
            values
        };

        let axis = Self { values, unit };
        if !axis.is_evenly_spaced(UNEVEN_SPACING_TOLERANCE) {
            warn!(
                "Axis of {} values in '{}' is not evenly spaced.",
                axis.len(),
                axis.unit
            );
        }
        Ok(axis)
    }

    /// Builds an axis from values already known to be valid.
    pub(crate) fn from_sorted(values: Vec<f64>, unit: Unit) -> Self {
        debug_assert!(values.len() >= 2);
        debug_assert!(values.windows(2).all(|w| w[1] > w[0]));
        Self { values, unit }
    }

    /// Evenly spaced axis of `n` values from `start` to `end`.
    pub fn linspace(start: f64, end: f64, n: usize, unit: Unit) -> Result<Self> {
        if n < 2 {
            return Err(Error::InvalidArgument(format!(
                "linspace needs at least 2 values, got {n}"
            )));
        }
        let step = (end - start) / (n - 1) as f64;
        let values = (0..n).map(|i| start + step * i as f64).collect();
        Self::new(values, unit)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; axes hold at least two values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn first(&self) -> f64 {
        self.values[0]
    }

    pub fn last(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn span(&self) -> f64 {
        self.last() - self.first()
    }

    /// Mean spacing between consecutive values.
    pub fn spacing(&self) -> f64 {
        self.span() / (self.len() - 1) as f64
    }

    pub fn is_evenly_spaced(&self, rel_tol: f64) -> bool {
        let mean = self.spacing();
        self.values
            .windows(2)
            .all(|w| ((w[1] - w[0]) - mean).abs() <= rel_tol * mean)
    }

    fn tolerance(&self) -> f64 {
        self.span() * EDGE_TOLERANCE
    }

    pub fn contains(&self, v: f64) -> bool {
        let eps = self.tolerance();
        v.is_finite() && v >= self.first() - eps && v <= self.last() + eps
    }

    fn checked(&self, v: f64) -> Result<f64> {
        if !self.contains(v) {
            return Err(Error::OutOfRange(format!(
                "{v} is outside [{}, {}]",
                self.first(),
                self.last()
            )));
        }
        Ok(v.clamp(self.first(), self.last()))
    }

    /// Indices of the nodes surrounding `v`; `(k, k)` when `v` sits on node `k`.
    pub fn bounds(&self, v: f64) -> Result<(usize, usize)> {
        let v = self.checked(v)?;
        let eps = self.tolerance();
        let idx = self.values.partition_point(|&a| a < v);
        if idx < self.len() && (self.values[idx] - v).abs() <= eps {
            return Ok((idx, idx));
        }
        if idx > 0 && (v - self.values[idx - 1]).abs() <= eps {
            return Ok((idx - 1, idx - 1));
        }
        Ok((idx - 1, idx))
    }

    pub fn nearest(&self, v: f64) -> Result<usize> {
        let (lo, hi) = self.bounds(v)?;
        if v - self.values[lo] <= self.values[hi] - v {
            Ok(lo)
        } else {
            Ok(hi)
        }
    }

    /// Fractional index of `v`, linear between the bounding nodes.
    pub fn decimal(&self, v: f64) -> Result<f64> {
        let (lo, hi) = self.bounds(v)?;
        if lo == hi {
            return Ok(lo as f64);
        }
        let v = v.clamp(self.first(), self.last());
        Ok(lo as f64 + (v - self.values[lo]) / (self.values[hi] - self.values[lo]))
    }

    pub fn locate(&self, v: f64, kind: Locate) -> Result<Location> {
        Ok(match kind {
            Locate::Bounds => {
                let (lo, hi) = self.bounds(v)?;
                Location::Bounds(lo, hi)
            }
            Locate::Nearest => Location::Nearest(self.nearest(v)?),
            Locate::Decimal => Location::Decimal(self.decimal(v)?),
        })
    }

    /// Inclusive index range of the values lying in `[lo, hi]`.
    pub fn index_range(&self, lo: f64, hi: f64) -> Result<(usize, usize)> {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let eps = self.tolerance();
        let start = self.values.partition_point(|&a| a < lo - eps);
        let end = self.values.partition_point(|&a| a <= hi + eps);
        if start >= end {
            return Err(Error::OutOfRange(format!(
                "no axis value in [{lo}, {hi}]"
            )));
        }
        Ok((start, end - 1))
    }

    /// Sub-axis between inclusive indices.
    pub fn crop(&self, start: usize, end: usize) -> Result<Axis> {
        if start > end || end >= self.len() {
            return Err(Error::OutOfRange(format!(
                "crop indices [{start}, {end}] invalid for an axis of {} values",
                self.len()
            )));
        }
        if end - start < 1 {
            return Err(Error::InvalidArgument(
                "a cropped axis must keep at least 2 values".into(),
            ));
        }
        Ok(Self::from_sorted(
            self.values[start..=end].to_vec(),
            self.unit.clone(),
        ))
    }

    /// Adds `before` and `after` values, extrapolated with the boundary spacings.
    pub fn extend(&self, before: usize, after: usize) -> Axis {
        let n = self.len();
        let d0 = self.values[1] - self.values[0];
        let d1 = self.values[n - 1] - self.values[n - 2];
        let mut values = Vec::with_capacity(n + before + after);
        values.extend((1..=before).rev().map(|k| self.first() - d0 * k as f64));
        values.extend_from_slice(&self.values);
        values.extend((1..=after).map(|k| self.last() + d1 * k as f64));
        Self::from_sorted(values, self.unit.clone())
    }

    /// Multiplies the coordinates by `factor`.
    ///
    /// Returns the new axis and whether it had to be reversed to stay increasing;
    /// callers own the coupled data and must flip it when this is `true`.
    pub fn scale(&self, factor: f64) -> Result<(Axis, bool)> {
        if !factor.is_finite() || factor == 0.0 {
            return Err(Error::InvalidArgument(format!(
                "axis scale factor must be finite and non-zero, got {factor}"
            )));
        }
        let mut values: Vec<f64> = self.values.iter().map(|v| v * factor).collect();
        let reversed = factor < 0.0;
        if reversed {
            values.reverse();
        }
        Ok((Self::from_sorted(values, self.unit.clone()), reversed))
    }

    /// Multiplies the coordinates by a quantity, e.g. `-0.5 mm/px` on a `px` axis.
    ///
    /// The axis takes the normalized product unit and the magnitude of the
    /// quantity unit is folded into the coordinates. A negative combined
    /// factor reverses the axis as in [`Axis::scale`].
    pub fn scale_by(&self, factor: &Quantity) -> Result<(Axis, bool)> {
        let (magnitude, unit) = (&self.unit * &factor.unit).normalized();
        let (axis, reversed) = self.scale(factor.value * magnitude)?;
        Ok((Axis { unit, ..axis }, reversed))
    }

    /// Negated and reversed copy (the image of the axis under `v -> -v`).
    pub fn mirrored(&self) -> Axis {
        let values = self.values.iter().rev().map(|v| -v).collect();
        Self::from_sorted(values, self.unit.clone())
    }

    /// Expresses the coordinates in another compatible unit.
    pub fn change_unit(&self, unit: &Unit) -> Result<Axis> {
        let (_, target) = unit.normalized();
        let factor = self.unit.conversion_factor(&target)?;
        let values = self.values.iter().map(|v| v * factor).collect();
        Ok(Self::from_sorted(values, target))
    }

    /// Replaces the unit, folding its magnitude into the coordinates.
    pub(crate) fn with_unit(&self, unit: &Unit) -> Result<Axis> {
        Axis::new(self.values.clone(), unit.clone())
    }

    pub(crate) fn approx_eq(&self, other: &Axis) -> bool {
        let eps = self.tolerance().max(other.tolerance()) * 1e3;
        self.len() == other.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Pairs of indices `(i_self, i_other)` whose coordinates coincide.
    pub(crate) fn shared_indices(&self, other: &Axis) -> Vec<(usize, usize)> {
        let eps = self.tolerance().max(other.tolerance()) * 1e3;
        let mut pairs = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            let (a, b) = (self.values[i], other.values[j]);
            if (a - b).abs() <= eps {
                pairs.push((i, j));
                i += 1;
                j += 1;
            } else if a < b {
                i += 1;
            } else {
                j += 1;
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(values: &[f64]) -> Axis {
        Axis::new(values.to_vec(), Unit::dimensionless()).expect("valid axis")
    }

    #[test]
    fn rejects_short_or_unsorted_values() {
        assert!(Axis::new(vec![1.0], Unit::dimensionless()).is_err());
        assert!(Axis::new(vec![0.0, 2.0, 1.0], Unit::dimensionless()).is_err());
        assert!(Axis::new(vec![0.0, f64::NAN], Unit::dimensionless()).is_err());
    }

    #[test]
    fn unit_magnitude_is_folded_into_values() {
        let a = Axis::new(vec![0.0, 1.0, 2.0], Unit::parse("2*mm").unwrap()).unwrap();
        assert_eq!(a.values(), &[0.0, 2.0, 4.0]);
        assert_eq!(a.unit(), &Unit::parse("mm").unwrap());
    }

    #[test]
    fn locate_variants() {
        let a = axis(&[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(a.bounds(1.25).unwrap(), (1, 2));
        assert_eq!(a.bounds(2.0).unwrap(), (2, 2));
        assert_eq!(a.bounds(0.0).unwrap(), (0, 0));
        assert_eq!(a.bounds(3.0).unwrap(), (3, 3));
        assert_eq!(a.nearest(1.6).unwrap(), 2);
        assert_eq!(a.nearest(1.4).unwrap(), 1);
        assert!((a.decimal(2.5).unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(
            a.locate(0.5, Locate::Bounds).unwrap(),
            Location::Bounds(0, 1)
        );
    }

    #[test]
    fn locate_outside_fails_with_out_of_range() {
        let a = axis(&[0.0, 1.0]);
        assert!(matches!(a.bounds(-0.1), Err(Error::OutOfRange(_))));
        assert!(matches!(a.nearest(1.1), Err(Error::OutOfRange(_))));
        assert!(matches!(a.decimal(f64::NAN), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn crop_then_extend_restores_extent() {
        let a = axis(&[0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
        let cropped = a.crop(1, 3).unwrap();
        assert_eq!(cropped.values(), &[0.5, 1.0, 1.5]);
        let restored = cropped.extend(1, 2);
        assert!(restored.approx_eq(&a));
    }

    #[test]
    fn crop_rejects_single_value() {
        let a = axis(&[0.0, 1.0, 2.0]);
        assert!(a.crop(1, 1).is_err());
        assert!(a.crop(1, 5).is_err());
    }

    #[test]
    fn negative_scale_reverses() {
        let a = axis(&[0.0, 1.0, 3.0]);
        let (scaled, reversed) = a.scale(-2.0).unwrap();
        assert!(reversed);
        assert_eq!(scaled.values(), &[-6.0, -2.0, 0.0]);
        assert!(a.scale(0.0).is_err());
    }

    #[test]
    fn scale_by_quantity_changes_unit_and_reverses() {
        let px = Axis::new(vec![0.0, 10.0, 20.0], Unit::parse("px").unwrap()).unwrap();
        let factor = Quantity::new(-0.5, Unit::parse("mm/px").unwrap());
        let (scaled, reversed) = px.scale_by(&factor).unwrap();
        assert!(reversed);
        assert_eq!(scaled.values(), &[-10.0, -5.0, 0.0]);
        assert_eq!(scaled.unit(), &Unit::parse("mm").unwrap());

        // Magnitudes of the quantity unit end up in the coordinates.
        let factor = Quantity::new(2.0, Unit::parse("0.1*m/px").unwrap());
        let (scaled, reversed) = px.scale_by(&factor).unwrap();
        assert!(!reversed);
        assert!(scaled.unit().is_normalized());
        assert!((scaled.last() - 4.0).abs() < 1e-12);
        assert!(px.scale_by(&Quantity::new(0.0, Unit::parse("mm/px").unwrap())).is_err());
    }

    #[test]
    fn index_range_is_inclusive() {
        let a = axis(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.index_range(1.0, 3.0).unwrap(), (1, 3));
        assert_eq!(a.index_range(0.5, 2.5).unwrap(), (1, 2));
        assert!(a.index_range(4.5, 6.0).is_err());
    }

    #[test]
    fn shared_indices_match_common_coordinates() {
        let a = axis(&[0.0, 1.0, 2.0, 3.0]);
        let b = axis(&[2.0, 3.0, 4.0]);
        assert_eq!(a.shared_indices(&b), vec![(2, 0), (3, 1)]);
    }

    #[test]
    fn change_unit_converts_values() {
        let a = Axis::new(vec![0.0, 1000.0], Unit::parse("mm").unwrap()).unwrap();
        let m = a.change_unit(&Unit::parse("m").unwrap()).unwrap();
        assert_eq!(m.values(), &[0.0, 1.0]);
    }
}
