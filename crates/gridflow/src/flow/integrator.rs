//! Adaptive integration of paths through a vector field.
//!
//! Positions are advanced in coordinates normalized to the unit square, which
//! keeps the stepper's error control independent of the grid's extent and
//! units. Output points are emitted at exact multiples of the output step in
//! the integration parameter (arc length or time); the adaptive stepper may
//! take several internal steps between two output points.
//!
//! Integration parameters are expressed in x-axis units: arc length is
//! measured in the x-axis unit after converting y distances through the
//! grid's `xy_scale`, and time is in x-axis unit per velocity unit.
use glam::DVec2;
use rayon::prelude::*;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{GriddedQuantity, VectorField};
use crate::flow::events::{EventSink, FlowEvent, FlowEventKind, RunSummary};
use crate::flow::rkf45::{self, Slope, Step, StepControl};
use crate::flow::trajectory::{Outcome, Termination, TracePoint, Trajectory};
use crate::interp::{DenseInterpolant, DenseMethod};

/// What the integration parameter measures.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resolution {
    /// Arc length; output points are equidistant along the path.
    #[default]
    Length,
    /// Time; output points are equally spaced in time.
    Time,
}

/// Sense of integration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    /// Integrates the negated field.
    Reverse,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

/// What batch integration does with paths that reach the boundary.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Keep the path, truncated at the boundary.
    #[default]
    Stop,
    /// Drop seeds whose path ever reaches the boundary.
    Hide,
}

/// Configuration of a [`FlowIntegrator`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct IntegratorConfig {
    pub resolution: Resolution,
    /// Distance between output points in the integration parameter.
    /// `None` derives it from the grid spacing.
    pub output_step: Option<f64>,
    /// Total parameter span to integrate. `None` runs until the path stops.
    pub horizon: Option<f64>,
    pub direction: Direction,
    pub boundary: BoundaryPolicy,
    /// Ceiling on accepted adaptive steps per path.
    pub max_steps: usize,
    /// Relative error tolerance of the adaptive stepper.
    pub tolerance: f64,
    pub method: DenseMethod,
    pub control: StepControl,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Length,
            output_step: None,
            horizon: None,
            direction: Direction::Forward,
            boundary: BoundaryPolicy::Stop,
            max_steps: 10_000,
            tolerance: 1e-6,
            method: DenseMethod::Linear,
            control: StepControl::default(),
        }
    }
}

impl IntegratorConfig {
    /// Sets the resolution policy.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the distance between output points.
    pub fn with_output_step(mut self, step: f64) -> Self {
        self.output_step = Some(step);
        self
    }

    /// Sets the parameter span to integrate.
    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Sets the direction of integration.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the boundary policy.
    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    /// Sets the ceiling on accepted steps.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the relative error tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the interpolation method for the field.
    pub fn with_method(mut self, method: DenseMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the adaptive step control.
    pub fn with_control(mut self, control: StepControl) -> Self {
        self.control = control;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(step) = self.output_step {
            if !(step.is_finite() && step > 0.0) {
                return Err(Error::InvalidArgument(format!(
                    "output step must be positive, got {step}"
                )));
            }
        }
        if let Some(horizon) = self.horizon {
            if !(horizon.is_finite() && horizon > 0.0) {
                return Err(Error::InvalidArgument(format!(
                    "horizon must be positive, got {horizon}"
                )));
            }
        }
        if self.max_steps == 0 {
            return Err(Error::InvalidArgument("max_steps must be >= 1".into()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        self.control.validate()
    }
}

/// Integrates paths through one vector field.
///
/// Construction builds the interpolant once; every call to
/// [`FlowIntegrator::integrate`] is independent, so one integrator can be
/// shared across threads.
#[derive(Clone, Debug)]
pub struct FlowIntegrator {
    config: IntegratorConfig,
    interpolant: DenseInterpolant<2>,
    origin: DVec2,
    extent: DVec2,
    /// Maps a velocity to normalized coordinates per parameter unit.
    scale: DVec2,
    step: f64,
}

impl FlowIntegrator {
    pub fn new(field: &VectorField, config: IntegratorConfig) -> Result<Self> {
        config.validate()?;
        let grid = field.grid();
        let y_to_x = match grid.y_to_x() {
            Ok(f) => f,
            Err(_) => {
                warn!(
                    x = %grid.x().unit(),
                    y = %grid.y().unit(),
                    xy_scale = %grid.xy_scale(),
                    "axis units are not convertible; treating them as equal"
                );
                1.0
            }
        };
        let origin = grid.min();
        let extent = grid.extent();
        let scale = DVec2::new(1.0 / extent.x, 1.0 / (y_to_x * extent.y));

        let step = match config.output_step {
            Some(step) => step,
            None => {
                let length = grid.x().spacing().min(grid.y().spacing() * y_to_x);
                match config.resolution {
                    Resolution::Length => length,
                    Resolution::Time => {
                        let max_speed = field
                            .values()
                            .iter()
                            .zip(field.mask())
                            .filter(|(_, &m)| !m)
                            .map(|(v, _)| v[0].hypot(v[1]))
                            .fold(0.0_f64, f64::max);
                        if max_speed <= 0.0 {
                            return Err(Error::InvalidArgument(
                                "cannot derive a time step from a field without motion".into(),
                            ));
                        }
                        length / max_speed
                    }
                }
            }
        };

        Ok(Self {
            interpolant: field.interpolant(config.method)?,
            config,
            origin,
            extent,
            scale,
            step,
        })
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Distance between output points in the integration parameter.
    pub fn step_size(&self) -> f64 {
        self.step
    }

    /// Lazily traces the path from `seed`, one output point at a time.
    pub fn tracer(&self, seed: DVec2) -> Tracer<'_> {
        Tracer {
            integrator: self,
            seed,
            state: TraceState::Seeded,
            y: (seed - self.origin) / self.extent,
            param: 0.0,
            emitted: f64::NEG_INFINITY,
            outputs: 0,
            h: self.step,
            after_reject: false,
            steps: 0,
        }
    }

    /// Traces the full path from `seed`.
    ///
    /// A seed outside the grid or on an unknown value yields an empty
    /// trajectory that ended at the boundary.
    pub fn integrate(&self, seed: DVec2) -> Trajectory {
        let mut tracer = self.tracer(seed);
        let points: Vec<TracePoint> = tracer.by_ref().collect();
        let outcome = tracer.outcome().unwrap_or(Outcome::Completed);
        debug!(
            x = seed.x,
            y = seed.y,
            points = points.len(),
            steps = tracer.steps,
            ?outcome,
            "trajectory finished"
        );
        Trajectory::new(seed, points, outcome, tracer.steps)
    }

    /// Traces all seeds in parallel.
    ///
    /// Results are in seed order; with [`BoundaryPolicy::Hide`] the seeds
    /// that reached the boundary are left out.
    pub fn integrate_many(&self, seeds: &[DVec2]) -> Vec<Trajectory> {
        self.integrate_many_with_events(seeds, &mut ())
    }

    /// Like [`FlowIntegrator::integrate_many`] but reports progress to `sink`.
    pub fn integrate_many_with_events(
        &self,
        seeds: &[DVec2],
        sink: &mut dyn EventSink,
    ) -> Vec<Trajectory> {
        if sink.wants(FlowEventKind::RunStarted) {
            sink.send(FlowEvent::RunStarted {
                seed_count: seeds.len(),
                horizon: self.config.horizon,
            });
        }

        let trajectories: Vec<Trajectory> =
            seeds.par_iter().map(|&seed| self.integrate(seed)).collect();

        if sink.wants(FlowEventKind::SeedFinished) {
            for (index, t) in trajectories.iter().enumerate() {
                sink.send(FlowEvent::SeedFinished {
                    index,
                    seed: t.seed(),
                    outcome: t.outcome(),
                    points: t.len(),
                });
            }
        }

        let summary = RunSummary::from_trajectories(&trajectories, self.config.horizon);
        debug!(
            seeds = summary.seed_count,
            completed = summary.completed,
            boundary = summary.boundary,
            max_steps = summary.max_steps,
            stalled = summary.stalled,
            "integrated seeds"
        );
        let kept: Vec<Trajectory> = match self.config.boundary {
            BoundaryPolicy::Stop => trajectories,
            BoundaryPolicy::Hide => {
                let total = trajectories.len();
                let kept: Vec<Trajectory> = trajectories
                    .into_iter()
                    .filter(|t| !t.hit_boundary())
                    .collect();
                let hidden = total - kept.len();
                if hidden > 0 {
                    debug!(hidden, total, "hid seeds that reached the boundary");
                    if sink.wants(FlowEventKind::Warning) {
                        sink.send(FlowEvent::Warning {
                            context: "integrate".into(),
                            message: format!("{hidden} of {total} seeds reached the boundary"),
                        });
                    }
                }
                kept
            }
        };

        if sink.wants(FlowEventKind::RunFinished) {
            sink.send(FlowEvent::RunFinished {
                completed: summary.completed,
                terminated: summary.terminated(),
            });
        }
        kept
    }

    fn position(&self, y: DVec2) -> DVec2 {
        self.origin + y * self.extent
    }

    /// Derivative of the normalized state with respect to the parameter.
    fn slope(&self, y: DVec2) -> Slope {
        let p = self.position(y);
        if !self.interpolant.contains(p) {
            return Slope::Outside;
        }
        let v = match self.interpolant.sample(p) {
            Ok(Some([u, v])) => DVec2::new(u, v) * self.config.direction.sign(),
            Ok(None) | Err(_) => return Slope::Outside,
        };
        if !v.is_finite() {
            return Slope::Stalled;
        }
        match self.config.resolution {
            Resolution::Time => Slope::Value(v * self.scale),
            Resolution::Length => {
                let speed = v.length();
                if speed <= f64::MIN_POSITIVE {
                    Slope::Stalled
                } else {
                    Slope::Value(v * self.scale / speed)
                }
            }
        }
    }
}

/// Lifecycle of one trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceState {
    /// Nothing emitted yet.
    Seeded,
    Integrating,
    Finished(Outcome),
}

/// Iterator over the output points of one path.
///
/// Obtained from [`FlowIntegrator::tracer`]. Once the iterator is exhausted,
/// [`Tracer::outcome`] tells why it stopped.
pub struct Tracer<'a> {
    integrator: &'a FlowIntegrator,
    seed: DVec2,
    state: TraceState,
    y: DVec2,
    param: f64,
    emitted: f64,
    outputs: usize,
    h: f64,
    after_reject: bool,
    steps: usize,
}

impl Tracer<'_> {
    pub fn state(&self) -> TraceState {
        self.state
    }

    /// `None` while the trace is still running.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            TraceState::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Accepted adaptive steps so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn emit(&mut self) -> TracePoint {
        self.emitted = self.param;
        self.outputs += 1;
        TracePoint {
            position: self.integrator.position(self.y),
            param: self.param,
        }
    }

    /// Stops the trace, emitting the last reached position if it is new.
    fn finish(&mut self, outcome: Outcome) -> Option<TracePoint> {
        self.state = TraceState::Finished(outcome);
        (self.param > self.emitted).then(|| self.emit())
    }

    fn start(&mut self) -> Option<TracePoint> {
        match self.integrator.slope(self.y) {
            Slope::Outside => {
                self.state = TraceState::Finished(Outcome::Terminated(Termination::Boundary));
                None
            }
            _ => {
                self.state = TraceState::Integrating;
                Some(self.emit())
            }
        }
    }

    fn advance(&mut self) -> Option<TracePoint> {
        let it = self.integrator;
        let config = &it.config;
        let floor = config.control.min_step * it.step;

        let mut target = self.outputs as f64 * it.step;
        if let Some(horizon) = config.horizon {
            if self.param >= horizon {
                return self.finish(Outcome::Completed);
            }
            target = target.min(horizon);
        }

        loop {
            if self.steps >= config.max_steps {
                return self.finish(Outcome::Terminated(Termination::MaxSteps));
            }
            let remaining = target - self.param;
            let capped = self.h >= remaining;
            let h = if capped { remaining } else { self.h };

            match rkf45::step(
                |y| it.slope(y),
                self.y,
                h,
                config.tolerance,
                &config.control,
                self.after_reject,
            ) {
                Step::Accepted { y, next_h } => {
                    self.y = y;
                    self.steps += 1;
                    self.after_reject = false;
                    if capped {
                        self.param = target;
                        self.h = self.h.max(next_h);
                        return Some(self.emit());
                    }
                    self.param += h;
                    self.h = next_h;
                }
                Step::Rejected { next_h } => {
                    self.h = next_h;
                    self.after_reject = true;
                    if self.h < floor {
                        return self.finish(Outcome::Terminated(Termination::Stalled));
                    }
                }
                Step::Outside => {
                    self.h = 0.5 * h;
                    self.after_reject = true;
                    if self.h < floor {
                        return self.finish(Outcome::Terminated(Termination::Boundary));
                    }
                }
                Step::Stalled => {
                    return self.finish(Outcome::Terminated(Termination::Stalled));
                }
            }
        }
    }
}

impl Iterator for Tracer<'_> {
    type Item = TracePoint;

    fn next(&mut self) -> Option<TracePoint> {
        match self.state {
            TraceState::Seeded => self.start(),
            TraceState::Integrating => self.advance(),
            TraceState::Finished(_) => None,
        }
    }
}

impl std::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("seed", &self.seed)
            .field("state", &self.state)
            .field("param", &self.param)
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Axis, Grid};
    use crate::units::Unit;

    fn grid(nx: usize, ny: usize, w: f64, h: f64) -> Grid {
        let m = Unit::parse("m").unwrap();
        Grid::new(
            Axis::linspace(0.0, w, nx, m.clone()).unwrap(),
            Axis::linspace(0.0, h, ny, m).unwrap(),
        )
    }

    fn uniform(u: f64, v: f64) -> VectorField {
        VectorField::from_fn(grid(11, 6, 10.0, 5.0), Unit::parse("m/s").unwrap(), |_| {
            DVec2::new(u, v)
        })
        .unwrap()
    }

    #[test]
    fn uniform_flow_completes_the_horizon() {
        let field = uniform(1.0, 0.0);
        let integrator =
            FlowIntegrator::new(&field, IntegratorConfig::default().with_horizon(3.0)).unwrap();
        assert!((integrator.step_size() - 1.0).abs() < 1e-12);
        let t = integrator.integrate(DVec2::new(2.0, 2.5));
        assert!(t.is_completed());
        assert_eq!(t.len(), 4);
        let last = t.last().unwrap();
        assert!((last.x - 5.0).abs() < 1e-9);
        assert!((last.y - 2.5).abs() < 1e-9);
        assert_eq!(t.params(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn arc_length_measures_y_through_xy_scale() {
        // One y unit spans two x units, so two units of path cover one y unit.
        let grid = grid(11, 6, 10.0, 5.0).with_xy_scale(Unit::parse("2").unwrap());
        let field =
            VectorField::from_fn(grid, Unit::parse("m/s").unwrap(), |_| DVec2::Y).unwrap();
        let config = IntegratorConfig::default().with_horizon(2.0);
        let t = FlowIntegrator::new(&field, config.clone())
            .unwrap()
            .integrate(DVec2::new(5.0, 1.0));
        assert!(t.is_completed());
        assert!((t.last().unwrap().y - 2.0).abs() < 1e-9);
        assert!((t.params().last().unwrap() - 2.0).abs() < 1e-12);

        let timed = FlowIntegrator::new(&field, config.with_resolution(Resolution::Time))
            .unwrap()
            .integrate(DVec2::new(5.0, 1.0));
        assert!((timed.last().unwrap().y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn path_stops_at_the_grid_edge() {
        let field = uniform(1.0, 0.0);
        let integrator =
            FlowIntegrator::new(&field, IntegratorConfig::default().with_horizon(5.0)).unwrap();
        let t = integrator.integrate(DVec2::new(8.0, 2.5));
        assert!(t.hit_boundary());
        assert!((t.last().unwrap().x - 10.0).abs() < 1e-6);
    }

    #[test]
    fn seeds_outside_or_masked_give_empty_paths() {
        let mut field = uniform(1.0, 0.0);
        let mut mask = vec![false; field.grid().len()];
        let idx = field.grid().index(3, 3);
        mask[idx] = true;
        field.set_mask(mask).unwrap();
        let integrator = FlowIntegrator::new(&field, IntegratorConfig::default()).unwrap();

        let outside = integrator.integrate(DVec2::new(-1.0, 1.0));
        assert!(outside.is_empty());
        assert!(outside.hit_boundary());

        let masked = integrator.integrate(DVec2::new(3.0, 3.0));
        assert!(masked.is_empty());
    }

    #[test]
    fn reverse_direction_follows_the_negated_field() {
        let field = uniform(1.0, 0.0);
        let config = IntegratorConfig::default()
            .with_horizon(2.0)
            .with_direction(Direction::Reverse);
        let integrator = FlowIntegrator::new(&field, config).unwrap();
        let t = integrator.integrate(DVec2::new(5.0, 1.0));
        assert!(t.is_completed());
        assert!((t.last().unwrap().x - 3.0).abs() < 1e-9);
    }

    #[test]
    fn path_into_a_masked_region_stops_before_it() {
        let mut field = uniform(1.0, 0.0);
        let g = field.grid().clone();
        let mask = (0..g.len()).map(|i| g.cell(i).0 >= 7).collect();
        field.set_mask(mask).unwrap();
        let integrator = FlowIntegrator::new(&field, IntegratorConfig::default()).unwrap();
        let t = integrator.integrate(DVec2::new(1.0, 2.0));
        assert!(t.hit_boundary());
        let x = t.last().unwrap().x;
        assert!(x <= 6.0 + 1e-6 && x > 5.9, "stopped at {x}");
    }

    #[test]
    fn time_resolution_spaces_points_by_speed() {
        let field = uniform(2.0, 0.0);
        let config = IntegratorConfig::default()
            .with_resolution(Resolution::Time)
            .with_output_step(0.5)
            .with_horizon(2.0);
        let integrator = FlowIntegrator::new(&field, config).unwrap();
        let t = integrator.integrate(DVec2::new(1.0, 1.0));
        assert_eq!(t.len(), 5);
        assert!((t.last().unwrap().x - 5.0).abs() < 1e-9);
        assert!((t.length() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn step_ceiling_ends_the_trace() {
        let field = uniform(1.0, 0.0);
        let config = IntegratorConfig::default()
            .with_output_step(0.5)
            .with_max_steps(3);
        let integrator = FlowIntegrator::new(&field, config).unwrap();
        let t = integrator.integrate(DVec2::new(1.0, 1.0));
        assert_eq!(t.outcome(), Outcome::Terminated(Termination::MaxSteps));
        assert_eq!(t.len(), 4);
        assert_eq!(t.steps(), 3);
    }

    #[test]
    fn zero_speed_stalls_under_length_resolution() {
        let field = uniform(0.0, 0.0);
        let integrator =
            FlowIntegrator::new(&field, IntegratorConfig::default().with_horizon(1.0)).unwrap();
        let t = integrator.integrate(DVec2::new(1.0, 1.0));
        assert_eq!(t.outcome(), Outcome::Terminated(Termination::Stalled));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn time_step_needs_motion() {
        let field = uniform(0.0, 0.0);
        let config = IntegratorConfig::default().with_resolution(Resolution::Time);
        assert!(FlowIntegrator::new(&field, config).is_err());
    }

    #[test]
    fn hide_policy_drops_boundary_paths() {
        let field = uniform(1.0, 0.0);
        let config = IntegratorConfig::default()
            .with_horizon(3.0)
            .with_boundary(BoundaryPolicy::Hide);
        let integrator = FlowIntegrator::new(&field, config).unwrap();
        let seeds = [DVec2::new(1.0, 1.0), DVec2::new(9.0, 1.0), DVec2::new(2.0, 4.0)];
        let mut events: Vec<FlowEvent> = Vec::new();
        let kept = integrator.integrate_many_with_events(&seeds, &mut events);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].seed(), seeds[0]);
        assert_eq!(kept[1].seed(), seeds[2]);

        assert!(matches!(events[0], FlowEvent::RunStarted { seed_count: 3, .. }));
        assert!(matches!(
            events.last(),
            Some(FlowEvent::RunFinished {
                completed: 2,
                terminated: 1
            })
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, FlowEvent::Warning { .. })));
    }

    #[test]
    fn summary_sink_sees_every_seed_even_when_hidden() {
        let field = uniform(1.0, 0.0);
        let config = IntegratorConfig::default()
            .with_horizon(3.0)
            .with_boundary(BoundaryPolicy::Hide);
        let integrator = FlowIntegrator::new(&field, config).unwrap();
        let seeds = [DVec2::new(9.0, 1.0), DVec2::new(-1.0, 1.0)];
        let mut summary = RunSummary::new();
        let kept = integrator.integrate_many_with_events(&seeds, &mut summary);
        assert!(kept.is_empty());
        assert_eq!(summary.seed_count, 2);
        assert_eq!(summary.boundary, 2);
        assert_eq!(summary.completion_ratio(), Some(0.0));
        assert_eq!(summary.stopped[1].1, seeds[1]);
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.finished);
    }

    #[test]
    fn tracer_reports_its_state() {
        let field = uniform(0.0, 1.0);
        let integrator =
            FlowIntegrator::new(&field, IntegratorConfig::default().with_horizon(1.0)).unwrap();
        let mut tracer = integrator.tracer(DVec2::new(5.0, 1.0));
        assert_eq!(tracer.state(), TraceState::Seeded);
        assert!(tracer.next().is_some());
        assert_eq!(tracer.state(), TraceState::Integrating);
        let rest: Vec<_> = tracer.by_ref().collect();
        assert_eq!(rest.len(), 1);
        assert!((rest[0].position.y - 2.0).abs() < 1e-9);
        assert_eq!(tracer.outcome(), Some(Outcome::Completed));
    }

    #[test]
    fn config_validation() {
        assert!(IntegratorConfig::default().with_horizon(-1.0).validate().is_err());
        assert!(IntegratorConfig::default().with_tolerance(0.0).validate().is_err());
        assert!(IntegratorConfig::default().with_max_steps(0).validate().is_err());
        assert!(IntegratorConfig::default().validate().is_ok());
    }
}
