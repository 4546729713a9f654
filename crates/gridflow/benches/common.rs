use std::time::Duration;

use criterion::{Criterion, Throughput};
use glam::DVec2;
use gridflow::prelude::{Axis, Grid, Unit, VectorField};

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(2);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// Square grid on `[0, 2] x [0, 1]` with `n` nodes along each axis.
pub fn grid(n: usize) -> Grid {
    let m = Unit::parse("m").expect("unit");
    Grid::new(
        Axis::linspace(0.0, 2.0, n, m.clone()).expect("x axis"),
        Axis::linspace(0.0, 1.0, n, m).expect("y axis"),
    )
}

/// Steady double gyre on `[0, 2] x [0, 1]`.
pub fn double_gyre(n: usize) -> VectorField {
    use std::f64::consts::PI;
    VectorField::from_fn(grid(n), Unit::parse("m/s").expect("unit"), |p| {
        DVec2::new(
            -PI * 0.1 * (PI * p.x).sin() * (PI * p.y).cos(),
            PI * 0.1 * (PI * p.x).cos() * (PI * p.y).sin(),
        )
    })
    .expect("field")
}
