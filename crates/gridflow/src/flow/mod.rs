//! Lagrangian analysis of vector fields.
//!
//! - [`FlowIntegrator`]: adaptive RKF45 paths with boundary and mask termination
//! - [`lines`]: streamlines, fieldlines and tracklines
//! - [`seeding`]: seed point strategies for batch runs
//! - [`FtleEngine`]: finite-time Lyapunov exponents
//! - [`events`]: run observation and per-run outcome summaries
pub mod events;
pub mod ftle;
pub mod integrator;
pub mod lines;
pub mod rkf45;
pub mod seeding;
pub mod trajectory;

pub use events::{EventSink, FlowEvent, FlowEventKind, RunSummary};
pub use ftle::{FtleConfig, FtleEngine};
pub use integrator::{
    BoundaryPolicy, Direction, FlowIntegrator, IntegratorConfig, Resolution, TraceState, Tracer,
};
pub use lines::{fieldlines, streamlines, trace_lines, tracklines, LineKind};
pub use rkf45::StepControl;
pub use seeding::{seeds_for, JitterSeeding, LatticeSeeding, SeedSampling, UniformRandomSeeding};
pub use trajectory::{Outcome, Termination, TracePoint, Trajectory};
