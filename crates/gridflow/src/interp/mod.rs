//! Continuous sampling over gridded and scattered data.
//!
//! - [`DenseInterpolant`]: bilinear or Catmull-Rom cubic over a rectilinear grid.
//! - [`ScatteredInterpolant`]: nearest, barycentric or cubic over a Delaunay
//!   [`Triangulation`] of unordered donor points.
pub mod delaunay;
pub mod dense;
pub(crate) mod index;
pub mod scattered;

pub use delaunay::Triangulation;
pub use dense::{DenseInterpolant, DenseMethod};
pub use scattered::{ScatteredInterpolant, ScatteredMethod};
