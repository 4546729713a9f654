//! Streamlines, fieldlines and tracklines.
//!
//! All three are paths of the same integrator; they differ only by a pointwise
//! rotation applied to the field before integration.
use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::VectorField;
use crate::flow::integrator::{FlowIntegrator, IntegratorConfig};
use crate::flow::trajectory::Trajectory;

/// Which family of lines to trace.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineKind {
    /// Tangent to the field.
    #[default]
    Streamline,
    /// Tangent to the field rotated by +90 degrees, `(u, v) -> (-v, u)`.
    Fieldline,
    /// Tangent to the field rotated by -90 degrees, `(u, v) -> (v, -u)`.
    Trackline,
}

impl LineKind {
    /// The field whose streamlines are lines of this kind.
    pub fn transform(self, field: &VectorField) -> VectorField {
        match self {
            LineKind::Streamline => field.clone(),
            LineKind::Fieldline => field.perpendicular(1.0),
            LineKind::Trackline => field.perpendicular(-1.0),
        }
    }
}

/// Traces lines of `kind` from every seed, in parallel.
pub fn trace_lines(
    field: &VectorField,
    kind: LineKind,
    seeds: &[DVec2],
    config: IntegratorConfig,
) -> Result<Vec<Trajectory>> {
    let integrator = FlowIntegrator::new(&kind.transform(field), config)?;
    Ok(integrator.integrate_many(seeds))
}

pub fn streamlines(
    field: &VectorField,
    seeds: &[DVec2],
    config: IntegratorConfig,
) -> Result<Vec<Trajectory>> {
    trace_lines(field, LineKind::Streamline, seeds, config)
}

pub fn fieldlines(
    field: &VectorField,
    seeds: &[DVec2],
    config: IntegratorConfig,
) -> Result<Vec<Trajectory>> {
    trace_lines(field, LineKind::Fieldline, seeds, config)
}

pub fn tracklines(
    field: &VectorField,
    seeds: &[DVec2],
    config: IntegratorConfig,
) -> Result<Vec<Trajectory>> {
    trace_lines(field, LineKind::Trackline, seeds, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Axis, Grid};
    use crate::units::Unit;

    fn east() -> VectorField {
        let unit = Unit::parse("m").unwrap();
        let grid = Grid::new(
            Axis::linspace(0.0, 10.0, 11, unit.clone()).unwrap(),
            Axis::linspace(0.0, 10.0, 11, unit).unwrap(),
        );
        VectorField::from_fn(grid, Unit::parse("m/s").unwrap(), |_| DVec2::X).unwrap()
    }

    fn end(kind: LineKind) -> DVec2 {
        let config = IntegratorConfig::default().with_horizon(2.0);
        let lines = trace_lines(&east(), kind, &[DVec2::new(5.0, 5.0)], config).unwrap();
        lines[0].last().unwrap()
    }

    #[test]
    fn streamlines_follow_the_field() {
        assert!((end(LineKind::Streamline) - DVec2::new(7.0, 5.0)).length() < 1e-9);
    }

    #[test]
    fn fieldlines_turn_left() {
        assert!((end(LineKind::Fieldline) - DVec2::new(5.0, 7.0)).length() < 1e-9);
    }

    #[test]
    fn tracklines_turn_right() {
        assert!((end(LineKind::Trackline) - DVec2::new(5.0, 3.0)).length() < 1e-9);
    }

    #[test]
    fn wrappers_keep_seed_order() {
        let seeds = [DVec2::new(1.0, 1.0), DVec2::new(2.0, 8.0)];
        let config = IntegratorConfig::default().with_horizon(1.0);
        let lines = streamlines(&east(), &seeds, config.clone()).unwrap();
        assert_eq!(lines[1].seed(), seeds[1]);
        assert_eq!(fieldlines(&east(), &seeds, config.clone()).unwrap().len(), 2);
        assert_eq!(tracklines(&east(), &seeds, config).unwrap().len(), 2);
    }
}
