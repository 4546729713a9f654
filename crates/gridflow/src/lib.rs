#![forbid(unsafe_code)]
//! gridflow: masked rectilinear scalar and vector fields with flow analysis.
//!
//! Modules:
//! - units: unit expressions, conversion factors and quantities
//! - grid: axes and rectilinear grids
//! - interp: dense and scattered interpolation
//! - field: scalar and vector fields (gap filling, crop/extend/mirror, gradients, arithmetic)
//! - flow: streamline integration, seeding, FTLE and run events
//!
//! For examples, see the `gridflow_examples` crate.
pub mod error;
pub mod field;
pub mod flow;
pub mod grid;
pub mod interp;
pub mod units;

pub use error::{Error, Result};

/// Convenient re-exports for common types. Import with `use gridflow::prelude::*;`.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::field::{
        Dtype, FillKind, FillOptions, GriddedQuantity, ImportOptions, Jacobian, MirrorOptions,
        Profile, ScalarField, SmoothKind, VectorField,
    };
    pub use crate::flow::{
        fieldlines, seeds_for, streamlines, trace_lines, tracklines, BoundaryPolicy, Direction,
        EventSink, FlowEvent, FlowEventKind, FlowIntegrator, FtleConfig, FtleEngine,
        IntegratorConfig, JitterSeeding, LatticeSeeding, LineKind, Outcome, Resolution,
        RunSummary, SeedSampling, StepControl, Termination, Trajectory, UniformRandomSeeding,
    };
    pub use crate::grid::{Axis, AxisDirection, Grid, Padding};
    pub use crate::interp::{
        DenseInterpolant, DenseMethod, ScatteredInterpolant, ScatteredMethod, Triangulation,
    };
    pub use crate::units::{Quantity, Unit};
}
