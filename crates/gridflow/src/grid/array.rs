//! Helpers for row-major 2D arrays stored as `Vec<T>` with `idx = iy * nx + ix`.
//!
//! Values and masks share these helpers so that every reshaping operation
//! treats both identically.

/// Copies the inclusive sub-rectangle `[x0, x1] x [y0, y1]`.
pub(crate) fn crop<T: Copy>(
    data: &[T],
    nx: usize,
    (x0, x1): (usize, usize),
    (y0, y1): (usize, usize),
) -> Vec<T> {
    let mut out = Vec::with_capacity((x1 - x0 + 1) * (y1 - y0 + 1));
    for iy in y0..=y1 {
        out.extend_from_slice(&data[iy * nx + x0..=iy * nx + x1]);
    }
    out
}

/// Cell counts added on each side of a grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Padding {
    pub left: usize,
    pub right: usize,
    pub down: usize,
    pub up: usize,
}

impl Padding {
    pub fn new(left: usize, right: usize, down: usize, up: usize) -> Self {
        Self {
            left,
            right,
            down,
            up,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.left == 0 && self.right == 0 && self.down == 0 && self.up == 0
    }
}

/// Surrounds the array with `fill` according to `pad`.
pub(crate) fn pad<T: Copy>(data: &[T], nx: usize, ny: usize, pad: Padding, fill: T) -> Vec<T> {
    let new_nx = nx + pad.left + pad.right;
    let new_ny = ny + pad.down + pad.up;
    let mut out = vec![fill; new_nx * new_ny];
    for iy in 0..ny {
        let dst = (iy + pad.down) * new_nx + pad.left;
        out[dst..dst + nx].copy_from_slice(&data[iy * nx..(iy + 1) * nx]);
    }
    out
}

pub(crate) fn flip_x<T: Copy>(data: &mut [T], nx: usize) {
    for row in data.chunks_mut(nx) {
        row.reverse();
    }
}

pub(crate) fn flip_y<T: Copy>(data: &mut [T], nx: usize, ny: usize) {
    for iy in 0..ny / 2 {
        let other = ny - 1 - iy;
        for ix in 0..nx {
            data.swap(iy * nx + ix, other * nx + ix);
        }
    }
}

/// Rotates counter-clockwise by `quarter_turns * 90` degrees.
///
/// Returns the rotated data and its new `(nx, ny)`.
pub(crate) fn rotate_quarter<T: Copy>(
    data: &[T],
    nx: usize,
    ny: usize,
    quarter_turns: u8,
) -> (Vec<T>, usize, usize) {
    match quarter_turns % 4 {
        0 => (data.to_vec(), nx, ny),
        1 => {
            let (new_nx, new_ny) = (ny, nx);
            let mut out = Vec::with_capacity(data.len());
            for jn in 0..new_ny {
                for i_n in 0..new_nx {
                    out.push(data[(ny - 1 - i_n) * nx + jn]);
                }
            }
            (out, new_nx, new_ny)
        }
        2 => {
            let mut out = data.to_vec();
            out.reverse();
            (out, nx, ny)
        }
        _ => {
            let (new_nx, new_ny) = (ny, nx);
            let mut out = Vec::with_capacity(data.len());
            for jn in 0..new_ny {
                for i_n in 0..new_nx {
                    out.push(data[i_n * nx + (nx - 1 - jn)]);
                }
            }
            (out, new_nx, new_ny)
        }
    }
}

/// Binary dilation with a square structuring element of half-width `radius`.
///
/// Separable: a row pass followed by a column pass, as for distance transforms.
pub(crate) fn dilate(mask: &[bool], nx: usize, ny: usize, radius: usize) -> Vec<bool> {
    if radius == 0 {
        return mask.to_vec();
    }
    let mut rows = vec![false; mask.len()];
    for iy in 0..ny {
        let row = &mask[iy * nx..(iy + 1) * nx];
        for ix in 0..nx {
            let lo = ix.saturating_sub(radius);
            let hi = (ix + radius).min(nx - 1);
            rows[iy * nx + ix] = row[lo..=hi].iter().any(|&m| m);
        }
    }
    let mut out = vec![false; mask.len()];
    for ix in 0..nx {
        for iy in 0..ny {
            let lo = iy.saturating_sub(radius);
            let hi = (iy + radius).min(ny - 1);
            out[iy * nx + ix] = (lo..=hi).any(|k| rows[k * nx + ix]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3 x 2 array:
    // y=1: 3 4 5
    // y=0: 0 1 2
    fn sample() -> Vec<i32> {
        vec![0, 1, 2, 3, 4, 5]
    }

    #[test]
    fn crop_selects_inclusive_rectangle() {
        assert_eq!(crop(&sample(), 3, (1, 2), (0, 1)), vec![1, 2, 4, 5]);
    }

    #[test]
    fn pad_surrounds_with_fill() {
        let out = pad(&sample(), 3, 2, Padding::new(1, 0, 0, 1), -1);
        assert_eq!(out, vec![-1, 0, 1, 2, -1, 3, 4, 5, -1, -1, -1, -1]);
    }

    #[test]
    fn flips_reverse_rows_and_columns() {
        let mut a = sample();
        flip_x(&mut a, 3);
        assert_eq!(a, vec![2, 1, 0, 5, 4, 3]);
        let mut b = sample();
        flip_y(&mut b, 3, 2);
        assert_eq!(b, vec![3, 4, 5, 0, 1, 2]);
    }

    #[test]
    fn quarter_rotation_moves_corners() {
        // (x, y) -> (-y, x): the bottom-right corner ends up top-right.
        let (out, nx, ny) = rotate_quarter(&sample(), 3, 2, 1);
        assert_eq!((nx, ny), (2, 3));
        assert_eq!(out, vec![3, 0, 4, 1, 5, 2]);
        let (back, nx, ny) = rotate_quarter(&out, nx, ny, 3);
        assert_eq!((nx, ny), (3, 2));
        assert_eq!(back, sample());
    }

    #[test]
    fn half_turn_reverses() {
        let (out, _, _) = rotate_quarter(&sample(), 3, 2, 2);
        assert_eq!(out, vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn dilation_grows_square() {
        let mut mask = vec![false; 25];
        mask[12] = true;
        let out = dilate(&mask, 5, 5, 1);
        assert_eq!(out.iter().filter(|&&m| m).count(), 9);
        assert!(out[6] && out[18] && !out[0]);
    }
}
