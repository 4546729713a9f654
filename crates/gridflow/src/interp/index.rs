//! Uniform bucket grids for spatial lookups over scattered points and triangles.
use glam::DVec2;

/// A background grid of buckets holding ids, sized for roughly one entry per bucket.
#[derive(Clone, Debug)]
pub(crate) struct BucketGrid {
    min: DVec2,
    cell_size: f64,
    width: usize,
    height: usize,
    buckets: Vec<Vec<usize>>,
}

impl BucketGrid {
    /// Covers the box `[min, max]` with about `expected` buckets.
    pub fn new(min: DVec2, max: DVec2, expected: usize) -> Self {
        let extent = (max - min).max(DVec2::splat(f64::EPSILON));
        let area = extent.x * extent.y;
        let mut cell_size = (area / expected.max(1) as f64).sqrt();
        if !cell_size.is_finite() || cell_size <= 0.0 {
            cell_size = extent.x.max(extent.y);
        }
        // Keep the bucket count bounded for very elongated boxes.
        let max_side = 4096.0;
        cell_size = cell_size
            .max(extent.x / max_side)
            .max(extent.y / max_side);
        let width = ((extent.x / cell_size).floor() as usize + 1).max(1);
        let height = ((extent.y / cell_size).floor() as usize + 1).max(1);
        Self {
            min,
            cell_size,
            width,
            height,
            buckets: vec![Vec::new(); width * height],
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Bucket coordinates of `p`, clamped into the grid.
    #[inline]
    pub fn bucket_of(&self, p: DVec2) -> (usize, usize) {
        let rel = (p - self.min) / self.cell_size;
        let bx = (rel.x.floor() as isize).clamp(0, self.width as isize - 1) as usize;
        let by = (rel.y.floor() as isize).clamp(0, self.height as isize - 1) as usize;
        (bx, by)
    }

    #[inline]
    pub fn bucket(&self, bx: usize, by: usize) -> &[usize] {
        &self.buckets[by * self.width + bx]
    }

    pub fn insert_point(&mut self, id: usize, p: DVec2) {
        let (bx, by) = self.bucket_of(p);
        self.buckets[by * self.width + bx].push(id);
    }

    /// Registers `id` in every bucket overlapping the box `[lo, hi]`.
    pub fn insert_box(&mut self, id: usize, lo: DVec2, hi: DVec2) {
        let (x0, y0) = self.bucket_of(lo);
        let (x1, y1) = self.bucket_of(hi);
        for by in y0..=y1 {
            for bx in x0..=x1 {
                self.buckets[by * self.width + bx].push(id);
            }
        }
    }
}

/// Nearest-neighbour and radius queries over a fixed point set.
#[derive(Clone, Debug)]
pub(crate) struct PointIndex {
    points: Vec<DVec2>,
    grid: BucketGrid,
}

impl PointIndex {
    pub fn new(points: &[DVec2]) -> Self {
        let (min, max) = bounding_box(points);
        let mut grid = BucketGrid::new(min, max, points.len());
        for (id, p) in points.iter().enumerate() {
            grid.insert_point(id, *p);
        }
        Self {
            points: points.to_vec(),
            grid,
        }
    }

    /// Index of the point closest to `p`; ties resolve to the lowest index.
    pub fn nearest(&self, p: DVec2) -> Option<usize> {
        if self.points.is_empty() {
            return None;
        }
        let (bx, by) = self.grid.bucket_of(p);
        let (w, h) = self.grid.dims();
        let max_ring = w.max(h);
        let mut best: Option<(f64, usize)> = None;

        for ring in 0..=max_ring {
            let x0 = bx as isize - ring as isize;
            let x1 = bx as isize + ring as isize;
            let y0 = by as isize - ring as isize;
            let y1 = by as isize + ring as isize;
            for y in y0..=y1 {
                if y < 0 || y >= h as isize {
                    continue;
                }
                for x in x0..=x1 {
                    if x < 0 || x >= w as isize {
                        continue;
                    }
                    let on_ring = x == x0 || x == x1 || y == y0 || y == y1;
                    if !on_ring {
                        continue;
                    }
                    for &id in self.grid.bucket(x as usize, y as usize) {
                        let d2 = (self.points[id] - p).length_squared();
                        let better = match best {
                            None => true,
                            Some((bd, bid)) => d2 < bd || (d2 == bd && id < bid),
                        };
                        if better {
                            best = Some((d2, id));
                        }
                    }
                }
            }
            if let Some((d2, _)) = best {
                let reach = ring as f64 * self.grid.cell_size();
                if d2 <= reach * reach {
                    break;
                }
            }
        }
        best.map(|(_, id)| id)
    }

    /// Indices of points within `radius` of `p`, in ascending order.
    pub fn within(&self, p: DVec2, radius: f64) -> Vec<usize> {
        let r = DVec2::splat(radius.max(0.0));
        let (x0, y0) = self.grid.bucket_of(p - r);
        let (x1, y1) = self.grid.bucket_of(p + r);
        let r2 = radius * radius;
        let mut out = Vec::new();
        for by in y0..=y1 {
            for bx in x0..=x1 {
                out.extend(
                    self.grid
                        .bucket(bx, by)
                        .iter()
                        .copied()
                        .filter(|&id| (self.points[id] - p).length_squared() <= r2),
                );
            }
        }
        out.sort_unstable();
        out
    }
}

pub(crate) fn bounding_box(points: &[DVec2]) -> (DVec2, DVec2) {
    points.iter().fold(
        (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
        |(lo, hi), p| (lo.min(*p), hi.max(*p)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(n: usize) -> Vec<DVec2> {
        (0..n)
            .flat_map(|j| (0..n).map(move |i| DVec2::new(i as f64, j as f64)))
            .collect()
    }

    #[test]
    fn nearest_matches_brute_force() {
        let points: Vec<DVec2> = lattice(7)
            .into_iter()
            .map(|p| p + DVec2::new((p.y * 0.37).sin() * 0.3, (p.x * 0.91).cos() * 0.3))
            .collect();
        let index = PointIndex::new(&points);
        for q in [
            DVec2::new(0.2, 0.1),
            DVec2::new(3.4, 5.9),
            DVec2::new(-4.0, 2.0),
            DVec2::new(12.0, 12.0),
        ] {
            let brute = (0..points.len())
                .min_by(|&a, &b| {
                    (points[a] - q)
                        .length_squared()
                        .total_cmp(&(points[b] - q).length_squared())
                })
                .unwrap();
            assert_eq!(index.nearest(q), Some(brute));
        }
    }

    #[test]
    fn within_collects_radius_neighbours() {
        let index = PointIndex::new(&lattice(5));
        let found = index.within(DVec2::new(2.0, 2.0), 1.0);
        assert_eq!(found, vec![7, 11, 12, 13, 17]);
    }

    #[test]
    fn empty_index_has_no_nearest() {
        let index = PointIndex::new(&[]);
        assert_eq!(index.nearest(DVec2::ZERO), None);
    }
}
