//! Finite-time Lyapunov exponents.
//!
//! Every seed of a regular seed grid is advected for the horizon. The flow map
//! is differentiated with the masked finite differences used for field
//! gradients, and each seed gets
//!
//! ```text
//! ftle = ln(sqrt(lambda_max(F^T F))) / |T|
//! ```
//!
//! where `F` is the deformation gradient. Seeds whose path stops early, and
//! seeds next to them, are masked in the result.
use glam::{DMat2, DVec2};
use tracing::{info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::data::FieldData;
use crate::field::gradient::gradient;
use crate::field::{Dtype, GriddedQuantity, ScalarField, VectorField};
use crate::flow::events::{EventSink, FlowEvent, FlowEventKind, RunSummary};
use crate::flow::integrator::{Direction, FlowIntegrator, IntegratorConfig, Resolution};
use crate::grid::{Axis, Grid};
use crate::interp::DenseMethod;

/// Upper bound on the seeds of one FTLE run.
const MAX_SEEDS: usize = 1 << 24;

/// Configuration of an FTLE computation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct FtleConfig {
    /// Signed integration time; negative values give backward FTLE.
    ///
    /// Measured in x-axis unit per velocity unit: `s` for a grid in `mm`
    /// carrying `mm/s`, `ms` for a grid in `px` carrying `px/ms`.
    pub horizon: f64,
    /// Distance between seeds along both axes. `None` seeds at the field's own nodes.
    pub seed_spacing: Option<f64>,
    pub tolerance: f64,
    pub max_steps: usize,
    pub method: DenseMethod,
}

impl Default for FtleConfig {
    fn default() -> Self {
        Self {
            horizon: 1.0,
            seed_spacing: None,
            tolerance: 1e-6,
            max_steps: 10_000,
            method: DenseMethod::Linear,
        }
    }
}

impl FtleConfig {
    pub fn new(horizon: f64) -> Self {
        Self {
            horizon,
            ..Default::default()
        }
    }

    /// Sets the seed spacing.
    pub fn with_seed_spacing(mut self, spacing: f64) -> Self {
        self.seed_spacing = Some(spacing);
        self
    }

    /// Sets the relative error tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the ceiling on accepted steps per seed.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the interpolation method for the field.
    pub fn with_method(mut self, method: DenseMethod) -> Self {
        self.method = method;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.horizon.is_finite() && self.horizon != 0.0) {
            return Err(Error::InvalidArgument(format!(
                "horizon must be finite and non-zero, got {}",
                self.horizon
            )));
        }
        if let Some(spacing) = self.seed_spacing {
            if !(spacing.is_finite() && spacing > 0.0) {
                return Err(Error::InvalidArgument(format!(
                    "seed spacing must be positive, got {spacing}"
                )));
            }
        }
        self.integrator_config().validate()
    }

    fn integrator_config(&self) -> IntegratorConfig {
        let direction = if self.horizon < 0.0 {
            Direction::Reverse
        } else {
            Direction::Forward
        };
        let span = self.horizon.abs();
        IntegratorConfig::default()
            .with_resolution(Resolution::Time)
            .with_output_step(span)
            .with_horizon(span)
            .with_direction(direction)
            .with_max_steps(self.max_steps)
            .with_tolerance(self.tolerance)
            .with_method(self.method)
    }
}

/// Computes FTLE fields.
#[derive(Clone, Debug, Default)]
pub struct FtleEngine {
    config: FtleConfig,
}

impl FtleEngine {
    /// Creates an engine, validating the configuration.
    pub fn try_new(config: FtleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates an engine; the configuration is validated on every run.
    pub fn new(config: FtleConfig) -> Self {
        debug_assert!(
            config.horizon.is_finite() && config.horizon != 0.0,
            "horizon must be finite and non-zero"
        );
        Self { config }
    }

    pub fn config(&self) -> &FtleConfig {
        &self.config
    }

    pub fn compute(&self, field: &VectorField) -> Result<ScalarField> {
        self.compute_with_events(field, &mut ())
    }

    /// Computes the FTLE field of `field`, reporting per-seed progress to `sink`.
    ///
    /// The result lives on the seed grid and has the unit of inverse time,
    /// `field unit / x-axis unit`.
    pub fn compute_with_events(
        &self,
        field: &VectorField,
        sink: &mut dyn EventSink,
    ) -> Result<ScalarField> {
        self.config.validate()?;
        let seed_grid = self.seed_grid(field.grid())?;
        let y_to_x = seed_grid.y_to_x()?;
        let integrator = FlowIntegrator::new(field, self.config.integrator_config())?;

        let seeds: Vec<DVec2> = (0..seed_grid.len())
            .map(|idx| {
                let (ix, iy) = seed_grid.cell(idx);
                seed_grid.point(ix, iy)
            })
            .collect();

        if sink.wants(FlowEventKind::RunStarted) {
            sink.send(FlowEvent::RunStarted {
                seed_count: seeds.len(),
                horizon: Some(self.config.horizon),
            });
        }

        let trajectories = integrator.integrate_many(&seeds);

        let mut flow_map = Vec::with_capacity(seeds.len());
        let mut stopped = Vec::with_capacity(seeds.len());
        for (index, t) in trajectories.iter().enumerate() {
            if sink.wants(FlowEventKind::SeedFinished) {
                sink.send(FlowEvent::SeedFinished {
                    index,
                    seed: t.seed(),
                    outcome: t.outcome(),
                    points: t.len(),
                });
            }
            match t.last().filter(|_| t.is_completed()) {
                Some(end) => {
                    flow_map.push([end.x, end.y * y_to_x]);
                    stopped.push(false);
                }
                None => {
                    flow_map.push([f64::NAN; 2]);
                    stopped.push(true);
                }
            }
        }
        let summary = RunSummary::from_trajectories(&trajectories, Some(self.config.horizon));

        let map = FieldData::from_parts(
            seed_grid.clone(),
            flow_map,
            stopped,
            seed_grid.x().unit().clone(),
            Dtype::Float64,
        );
        let gx = gradient(&map, 0)?;
        let gy = gradient(&map, 1)?;

        let inv_t = 1.0 / self.config.horizon.abs();
        let mut values = vec![f64::NAN; seed_grid.len()];
        let mut mask = gx.mask.clone();
        for idx in 0..values.len() {
            if mask[idx] {
                continue;
            }
            let f = DMat2::from_cols(
                DVec2::new(gx.dx[idx], gy.dx[idx]),
                DVec2::new(gx.dy[idx], gy.dy[idx]),
            );
            match largest_eigenvalue(f.transpose() * f) {
                Some(lambda) if lambda > 0.0 => values[idx] = 0.5 * lambda.ln() * inv_t,
                _ => mask[idx] = true,
            }
        }

        let valid = mask.iter().filter(|&&m| !m).count();
        info!(
            seeds = summary.seed_count,
            completed = summary.completed,
            boundary = summary.boundary,
            max_steps = summary.max_steps,
            stalled = summary.stalled,
            valid,
            horizon = self.config.horizon,
            "ftle computed"
        );
        if valid == 0 {
            warn!("no seed produced a usable flow map");
            if sink.wants(FlowEventKind::Warning) {
                sink.send(FlowEvent::Warning {
                    context: "ftle".into(),
                    message: "every FTLE cell is masked".into(),
                });
            }
        }
        if sink.wants(FlowEventKind::RunFinished) {
            sink.send(FlowEvent::RunFinished {
                completed: summary.completed,
                terminated: summary.terminated(),
            });
        }

        let unit = field.unit() / seed_grid.x().unit();
        ScalarField::new(seed_grid, values, Some(mask), unit, Dtype::Float64)
    }

    fn seed_grid(&self, grid: &Grid) -> Result<Grid> {
        let Some(spacing) = self.config.seed_spacing else {
            return Ok(grid.clone());
        };
        let count = |a: &Axis| ((a.span() / spacing).round() + 1.0).max(2.0);
        let (nx, ny) = (count(grid.x()), count(grid.y()));
        if nx * ny > MAX_SEEDS as f64 {
            return Err(Error::InvalidArgument(format!(
                "seed spacing {spacing} gives {nx} x {ny} seeds, the limit is {MAX_SEEDS}"
            )));
        }
        let axis =
            |a: &Axis, n: f64| Axis::linspace(a.first(), a.last(), n as usize, a.unit().clone());
        Ok(Grid::new(axis(grid.x(), nx)?, axis(grid.y(), ny)?)
            .with_xy_scale(grid.xy_scale().clone()))
    }
}

/// Largest eigenvalue of a symmetric 2x2 matrix.
fn largest_eigenvalue(c: DMat2) -> Option<f64> {
    let (a, b, d) = (c.x_axis.x, c.y_axis.x, c.y_axis.y);
    let half_trace = 0.5 * (a + d);
    let radius = (0.5 * (a - d)).hypot(b);
    let lambda = half_trace + radius;
    lambda.is_finite().then_some(lambda)
}
