//! Seed point generation for batch integration.
use glam::DVec2;
use mint::Point2;
use rand::RngCore;

use crate::grid::Grid;

/// Trait for seed sampling over a rectangle.
pub trait SeedSampling: Send + Sync {
    fn generate(&self, min: Point2<f64>, max: Point2<f64>, rng: &mut dyn RngCore)
        -> Vec<Point2<f64>>;
}

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Seeds spanning the domain of `grid`.
pub fn seeds_for(grid: &Grid, sampling: &dyn SeedSampling, rng: &mut dyn RngCore) -> Vec<DVec2> {
    sampling
        .generate(grid.min().into(), grid.max().into(), rng)
        .into_iter()
        .map(DVec2::from)
        .collect()
}

/// Number of cells of roughly `spacing` along a side of length `len`, and their size.
fn cells(len: f64, spacing: f64) -> (usize, f64) {
    let n = if spacing.is_finite() && spacing > 0.0 {
        ((len / spacing).floor() as usize).max(1)
    } else {
        10
    };
    (n, len / n as f64)
}

/// Cell centers of a regular lattice.
#[derive(Debug, Clone)]
pub struct LatticeSeeding {
    pub spacing: f64,
}

impl LatticeSeeding {
    pub fn new(spacing: f64) -> Self {
        Self { spacing }
    }
}

impl SeedSampling for LatticeSeeding {
    fn generate(
        &self,
        min: Point2<f64>,
        max: Point2<f64>,
        rng: &mut dyn RngCore,
    ) -> Vec<Point2<f64>> {
        JitterSeeding::new(self.spacing, 0.0).generate(min, max, rng)
    }
}

/// Lattice cell centers displaced randomly within their cell.
#[derive(Debug, Clone)]
pub struct JitterSeeding {
    pub spacing: f64,
    /// Jitter amount in [0, 1], where 0 is cell centers and 1 spans the whole cell.
    pub jitter: f64,
}

impl JitterSeeding {
    /// Create a new JitterSeeding with specified jitter (0.0 to 1.0).
    pub fn new(spacing: f64, jitter: f64) -> Self {
        Self {
            spacing,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }
}

impl SeedSampling for JitterSeeding {
    fn generate(
        &self,
        min: Point2<f64>,
        max: Point2<f64>,
        rng: &mut dyn RngCore,
    ) -> Vec<Point2<f64>> {
        let min = DVec2::from(min);
        let extent = DVec2::from(max) - min;
        if !(extent.x > 0.0 && extent.y > 0.0) {
            return Vec::new();
        }
        let (cols, cell_w) = cells(extent.x, self.spacing);
        let (rows, cell_h) = cells(extent.y, self.spacing);
        let cell = DVec2::new(cell_w, cell_h);

        let mut points = Vec::with_capacity(cols * rows);
        for j in 0..rows {
            for i in 0..cols {
                let center = min + (DVec2::new(i as f64, j as f64) + 0.5) * cell;
                let offset = if self.jitter > 0.0 {
                    let r = DVec2::new(rand01(rng) - 0.5, rand01(rng) - 0.5);
                    r * self.jitter * cell
                } else {
                    DVec2::ZERO
                };
                points.push((center + offset).into());
            }
        }
        points
    }
}

/// Independent uniform points.
#[derive(Debug, Clone)]
pub struct UniformRandomSeeding {
    pub count: usize,
}

impl UniformRandomSeeding {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl SeedSampling for UniformRandomSeeding {
    fn generate(
        &self,
        min: Point2<f64>,
        max: Point2<f64>,
        rng: &mut dyn RngCore,
    ) -> Vec<Point2<f64>> {
        let min = DVec2::from(min);
        let extent = DVec2::from(max) - min;
        if !(extent.x > 0.0 && extent.y > 0.0) {
            return Vec::new();
        }
        (0..self.count)
            .map(|_| (min + DVec2::new(rand01(rng), rand01(rng)) * extent).into())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::grid::Axis;
    use crate::units::Unit;

    struct FixedRng {
        value: u64,
    }

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            self.value as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.value
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let bytes = self.value.to_le_bytes();
            for (i, b) in dest.iter_mut().enumerate() {
                *b = bytes[i % 8];
            }
        }
    }

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2 { x, y }
    }

    #[test]
    fn rand01_stays_below_one() {
        assert_eq!(rand01(&mut FixedRng { value: 0 }), 0.0);
        let top = rand01(&mut FixedRng { value: u64::MAX });
        assert!(top < 1.0 && top > 0.999_999);
    }

    #[test]
    fn lattice_places_cell_centers() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = LatticeSeeding::new(2.0).generate(p(0.0, 0.0), p(4.0, 2.0), &mut rng);
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].x, points[0].y), (1.0, 1.0));
        assert_eq!((points[1].x, points[1].y), (3.0, 1.0));
    }

    #[test]
    fn jitter_stays_inside_cells() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = JitterSeeding::new(1.0, 1.0).generate(p(0.0, 0.0), p(5.0, 5.0), &mut rng);
        assert_eq!(points.len(), 25);
        for (k, q) in points.iter().enumerate() {
            let (i, j) = ((k % 5) as f64, (k / 5) as f64);
            assert!(q.x >= i && q.x <= i + 1.0);
            assert!(q.y >= j && q.y <= j + 1.0);
        }
    }

    #[test]
    fn uniform_random_is_deterministic_per_seed() {
        let strategy = UniformRandomSeeding::new(16);
        let a = strategy.generate(p(-1.0, -1.0), p(1.0, 1.0), &mut StdRng::seed_from_u64(3));
        let b = strategy.generate(p(-1.0, -1.0), p(1.0, 1.0), &mut StdRng::seed_from_u64(3));
        assert_eq!(a.len(), 16);
        assert!(a.iter().zip(&b).all(|(u, v)| u.x == v.x && u.y == v.y));
        assert!(a.iter().all(|q| (-1.0..1.0).contains(&q.x) && (-1.0..1.0).contains(&q.y)));
    }

    #[test]
    fn empty_rectangle_gives_no_seeds() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(UniformRandomSeeding::new(4)
            .generate(p(0.0, 0.0), p(0.0, 1.0), &mut rng)
            .is_empty());
    }

    #[test]
    fn seeds_for_covers_the_grid() {
        let unit = Unit::dimensionless();
        let grid = Grid::new(
            Axis::linspace(10.0, 20.0, 6, unit.clone()).unwrap(),
            Axis::linspace(0.0, 5.0, 6, unit).unwrap(),
        );
        let mut rng = StdRng::seed_from_u64(0);
        let seeds = seeds_for(&grid, &LatticeSeeding::new(2.5), &mut rng);
        assert_eq!(seeds.len(), 8);
        assert!(seeds.iter().all(|&s| grid.contains(s)));
    }
}
