//! Masked finite differences on rectilinear grids.
//!
//! Interior nodes use centered differences over their two neighbours, border
//! nodes one-sided differences. A node is masked in the result when it or any
//! of its 4-neighbours is masked.
use crate::error::Result;
use crate::field::data::FieldData;
use crate::units::Unit;

/// Partial derivatives of one channel, both expressed per x-axis unit.
#[derive(Clone, Debug)]
pub(crate) struct Gradient {
    pub dx: Vec<f64>,
    pub dy: Vec<f64>,
    pub mask: Vec<bool>,
    pub unit: Unit,
}

/// Differentiates channel `c` of `data`.
///
/// The y derivative is converted to the x-axis unit, through the grid's
/// `xy_scale`, so both components share `value unit / x unit`; fails with [`crate::Error::IncompatibleUnits`] when
/// the axes do not measure the same dimension.
pub(crate) fn gradient<const N: usize>(data: &FieldData<N>, c: usize) -> Result<Gradient> {
    let (nx, ny) = data.grid.shape();
    let ux = data.grid.x().unit();
    let y_to_x = data.grid.y_to_x()?;
    let xs = data.grid.x().values();
    let ys = data.grid.y().values();

    let mask = neighbour_mask(&data.mask, nx, ny);
    let mut dx = vec![f64::NAN; nx * ny];
    let mut dy = vec![f64::NAN; nx * ny];
    let value = |ix: usize, iy: usize| data.values[iy * nx + ix][c];

    for iy in 0..ny {
        for ix in 0..nx {
            let idx = iy * nx + ix;
            if mask[idx] {
                continue;
            }
            let (l, r) = (ix.saturating_sub(1), (ix + 1).min(nx - 1));
            let (d, u) = (iy.saturating_sub(1), (iy + 1).min(ny - 1));
            dx[idx] = (value(r, iy) - value(l, iy)) / (xs[r] - xs[l]);
            dy[idx] = (value(ix, u) - value(ix, d)) / (ys[u] - ys[d]) / y_to_x;
        }
    }
    Ok(Gradient {
        dx,
        dy,
        mask,
        unit: &data.unit / ux,
    })
}

fn neighbour_mask(mask: &[bool], nx: usize, ny: usize) -> Vec<bool> {
    let mut out = mask.to_vec();
    for iy in 0..ny {
        for ix in 0..nx {
            if !mask[iy * nx + ix] {
                continue;
            }
            if ix > 0 {
                out[iy * nx + ix - 1] = true;
            }
            if ix + 1 < nx {
                out[iy * nx + ix + 1] = true;
            }
            if iy > 0 {
                out[(iy - 1) * nx + ix] = true;
            }
            if iy + 1 < ny {
                out[(iy + 1) * nx + ix] = true;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ImportOptions;
    use crate::Error;

    fn plane(options: &ImportOptions, mask: Option<Vec<bool>>) -> FieldData<1> {
        let x: Vec<f64> = vec![0.0, 1.0, 3.0, 4.0, 6.0];
        let y: Vec<f64> = vec![0.0, 0.5, 1.0, 1.5];
        let mut values = Vec::new();
        for yv in &y {
            for xv in &x {
                values.push([2.0 * xv - 4.0 * yv]);
            }
        }
        FieldData::import(x, y, values, mask, options).unwrap()
    }

    #[test]
    fn linear_plane_has_exact_derivatives_on_uneven_axes() {
        let data = plane(&ImportOptions::default(), None);
        let g = gradient(&data, 0).unwrap();
        for idx in 0..data.grid.len() {
            assert!(!g.mask[idx]);
            assert!((g.dx[idx] - 2.0).abs() < 1e-12);
            assert!((g.dy[idx] + 4.0).abs() < 1e-12);
        }
    }

    #[test]
    fn masked_cells_spread_to_direct_neighbours() {
        let mut mask = vec![false; 20];
        mask[7] = true;
        let data = plane(&ImportOptions::default(), Some(mask));
        let g = gradient(&data, 0).unwrap();
        for idx in [7, 6, 8, 2, 12] {
            assert!(g.mask[idx], "cell {idx} should be masked");
        }
        assert!(!g.mask[1]);
        assert!(!g.mask[13]);
    }

    #[test]
    fn units_follow_the_x_axis() {
        let options = ImportOptions::parse("mm", "m", "m/s").unwrap();
        let data = plane(&options, None);
        let g = gradient(&data, 0).unwrap();
        assert_eq!(g.unit, Unit::parse("m/s/mm").unwrap());
        // -4 per metre along y is -0.004 per millimetre.
        assert!((g.dy[0] + 0.004).abs() < 1e-12);

        let bad = ImportOptions::parse("mm", "s", "m").unwrap();
        assert!(matches!(
            gradient(&plane(&bad, None), 0),
            Err(Error::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn xy_scale_converts_the_y_derivative() {
        let options = ImportOptions::parse("mm", "px", "m/s").unwrap();
        let mut data = plane(&options, None);
        assert!(matches!(
            gradient(&data, 0),
            Err(Error::IncompatibleUnits { .. })
        ));
        data.grid = data.grid.clone().with_xy_scale(Unit::parse("0.5*mm/px").unwrap());
        let g = gradient(&data, 0).unwrap();
        assert_eq!(g.unit, Unit::parse("m/s/mm").unwrap());
        // -4 per pixel is -8 per millimetre when a pixel spans half a millimetre.
        assert!((g.dy[0] + 8.0).abs() < 1e-12);
        assert!((g.dx[0] - 2.0).abs() < 1e-12);
    }
}
