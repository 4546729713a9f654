//! Event types and sinks for observing flow runs.
//!
//! Batch integrations ([`crate::flow::FlowIntegrator::integrate_many_with_events`])
//! and FTLE runs ([`crate::flow::FtleEngine::compute_with_events`]) report
//! progress as [`FlowEvent`]s. Seeds are integrated in parallel; events are
//! delivered afterwards, on the calling thread, in seed order.
use glam::DVec2;

use crate::flow::trajectory::{Outcome, Termination, Trajectory};

/// Describes events emitted by flow runs.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// Emitted before any seed is integrated.
    RunStarted {
        /// Number of seeds in the run.
        seed_count: usize,
        /// Signed horizon, if the run has one.
        horizon: Option<f64>,
    },

    /// Emitted once per seed, in seed order.
    SeedFinished {
        /// Index of the seed in the run.
        index: usize,
        /// Starting position.
        seed: DVec2,
        /// How the integration ended.
        outcome: Outcome,
        /// Number of output points produced.
        points: usize,
    },

    /// Emitted when the run is done.
    RunFinished {
        /// Seeds that integrated the whole horizon.
        completed: usize,
        /// Seeds that stopped early.
        terminated: usize,
    },

    /// Non-fatal warning generated during the run.
    Warning {
        /// Context string (e.g. "ftle", "seed:12").
        context: String,
        /// Human-readable message.
        message: String,
    },
}

/// Discriminant of a [`FlowEvent`], used by [`EventSink::wants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowEventKind {
    RunStarted,
    SeedFinished,
    RunFinished,
    Warning,
}

impl FlowEvent {
    pub fn kind(&self) -> FlowEventKind {
        match self {
            FlowEvent::RunStarted { .. } => FlowEventKind::RunStarted,
            FlowEvent::SeedFinished { .. } => FlowEventKind::SeedFinished,
            FlowEvent::RunFinished { .. } => FlowEventKind::RunFinished,
            FlowEvent::Warning { .. } => FlowEventKind::Warning,
        }
    }
}

/// Receives [`FlowEvent`]s from a run.
pub trait EventSink {
    fn send(&mut self, event: FlowEvent);

    /// Whether events of `kind` should be built at all; producers skip the rest.
    fn wants(&self, _kind: FlowEventKind) -> bool {
        true
    }
}

/// Discards every event.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: FlowEvent) {}

    #[inline]
    fn wants(&self, _kind: FlowEventKind) -> bool {
        false
    }
}

/// Keeps the raw event stream.
impl EventSink for Vec<FlowEvent> {
    #[inline]
    fn send(&mut self, event: FlowEvent) {
        self.push(event);
    }
}

/// Tally of how the seeds of one run ended.
///
/// As a sink, `RunStarted` resets the tally, so a summary reused across runs
/// describes the latest one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub seed_count: usize,
    /// Signed horizon of the run, if it had one.
    pub horizon: Option<f64>,
    pub completed: usize,
    pub boundary: usize,
    pub max_steps: usize,
    pub stalled: usize,
    /// Index, seed and reason of every seed that stopped early.
    pub stopped: Vec<(usize, DVec2, Termination)>,
    /// Warnings as `context: message`.
    pub warnings: Vec<String>,
    /// Set once `RunFinished` arrives.
    pub finished: bool,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary of already integrated trajectories, in seed order.
    pub fn from_trajectories(trajectories: &[Trajectory], horizon: Option<f64>) -> Self {
        let mut summary = Self {
            seed_count: trajectories.len(),
            horizon,
            ..Self::default()
        };
        for (index, t) in trajectories.iter().enumerate() {
            summary.record(index, t.seed(), t.outcome());
        }
        summary.finished = true;
        summary
    }

    fn record(&mut self, index: usize, seed: DVec2, outcome: Outcome) {
        let reason = match outcome {
            Outcome::Completed => {
                self.completed += 1;
                return;
            }
            Outcome::Terminated(reason) => reason,
        };
        match reason {
            Termination::Boundary => self.boundary += 1,
            Termination::MaxSteps => self.max_steps += 1,
            Termination::Stalled => self.stalled += 1,
        }
        self.stopped.push((index, seed, reason));
    }

    /// Seeds that stopped before the horizon.
    pub fn terminated(&self) -> usize {
        self.boundary + self.max_steps + self.stalled
    }

    /// Share of recorded seeds that completed; `None` before any seed.
    pub fn completion_ratio(&self) -> Option<f64> {
        let recorded = self.completed + self.terminated();
        (recorded > 0).then(|| self.completed as f64 / recorded as f64)
    }
}

impl EventSink for RunSummary {
    fn send(&mut self, event: FlowEvent) {
        match event {
            FlowEvent::RunStarted {
                seed_count,
                horizon,
            } => {
                *self = Self {
                    seed_count,
                    horizon,
                    ..Self::default()
                };
            }
            FlowEvent::SeedFinished {
                index,
                seed,
                outcome,
                ..
            } => self.record(index, seed, outcome),
            FlowEvent::RunFinished { .. } => self.finished = true,
            FlowEvent::Warning { context, message } => {
                self.warnings.push(format!("{context}: {message}"));
            }
        }
    }
}
