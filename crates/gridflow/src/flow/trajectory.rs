//! Integrated paths and how they ended.
use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why integration stopped before the requested horizon.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Left the grid or entered a masked cell.
    Boundary,
    /// Hit the accepted-step ceiling.
    MaxSteps,
    /// The field gave no usable direction (zero speed, non-finite values or step underflow).
    Stalled,
}

/// Final state of an integration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The whole horizon was integrated.
    Completed,
    Terminated(Termination),
}

/// One output point of a trace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TracePoint {
    pub position: DVec2,
    /// Cumulative arc length or time, depending on the resolution policy.
    pub param: f64,
}

/// Ordered positions with their cumulative parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    seed: DVec2,
    points: Vec<DVec2>,
    params: Vec<f64>,
    outcome: Outcome,
    steps: usize,
}

impl Trajectory {
    pub(crate) fn new(seed: DVec2, trace: Vec<TracePoint>, outcome: Outcome, steps: usize) -> Self {
        let (points, params) = trace.into_iter().map(|p| (p.position, p.param)).unzip();
        Self {
            seed,
            points,
            params,
            outcome,
            steps,
        }
    }

    /// Starting point, even when the trajectory is empty.
    pub fn seed(&self) -> DVec2 {
        self.seed
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Number of accepted adaptive steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn first(&self) -> Option<DVec2> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<DVec2> {
        self.points.last().copied()
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == Outcome::Completed
    }

    pub fn hit_boundary(&self) -> bool {
        self.outcome == Outcome::Terminated(Termination::Boundary)
    }

    /// Polyline length through the points, in grid coordinates.
    ///
    /// The physical arc length, with `xy_scale` applied, is the final parameter
    /// of a path traced by length.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = TracePoint> + '_ {
        self.points
            .iter()
            .zip(&self.params)
            .map(|(&position, &param)| TracePoint { position, param })
    }
}
