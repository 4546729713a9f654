use std::path::Path;

use glam::DVec2;
use gridflow::prelude::*;
use image::{Rgb, RgbImage};

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Steady double gyre on `[0, 2] x [0, 1]` sampled with `nx x ny` nodes.
pub fn double_gyre(nx: usize, ny: usize, amplitude: f64) -> gridflow::Result<VectorField> {
    use std::f64::consts::PI;
    let m = Unit::parse("m")?;
    let grid = Grid::new(
        Axis::linspace(0.0, 2.0, nx, m.clone())?,
        Axis::linspace(0.0, 1.0, ny, m)?,
    );
    VectorField::from_fn(grid, Unit::parse("m/s")?, |p| {
        DVec2::new(
            -PI * amplitude * (PI * p.x).sin() * (PI * p.y).cos(),
            PI * amplitude * (PI * p.x).cos() * (PI * p.y).sin(),
        )
    })
}

/// Image settings shared by the example binaries.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub image_size: (u32, u32),
    pub background: [u8; 3],
    pub masked: [u8; 3],
    pub line: [u8; 3],
    /// Fixed color range; `None` uses the field's min and max.
    pub range: Option<(f64, f64)>,
}

impl RenderConfig {
    pub fn new(image_size: (u32, u32)) -> Self {
        Self {
            image_size,
            background: [26, 26, 26],
            masked: [90, 20, 20],
            line: [240, 240, 240],
            range: None,
        }
    }

    /// Sets the background color.
    pub fn with_background(mut self, rgb: [u8; 3]) -> Self {
        self.background = rgb;
        self
    }

    /// Sets the line color.
    pub fn with_line(mut self, rgb: [u8; 3]) -> Self {
        self.line = rgb;
        self
    }

    /// Sets a fixed color range.
    pub fn with_range(mut self, lo: f64, hi: f64) -> Self {
        self.range = Some((lo, hi));
        self
    }
}

/// An image mapped onto the domain of a grid, y pointing up.
pub struct Canvas {
    image: RgbImage,
    config: RenderConfig,
    min: DVec2,
    extent: DVec2,
}

impl Canvas {
    pub fn new(grid: &Grid, config: RenderConfig) -> Self {
        let (w, h) = config.image_size;
        Self {
            image: RgbImage::from_pixel(w, h, Rgb(config.background)),
            config,
            min: grid.min(),
            extent: grid.extent(),
        }
    }

    fn to_domain(&self, px: u32, py: u32) -> DVec2 {
        let (w, h) = self.config.image_size;
        let t = DVec2::new(
            (px as f64 + 0.5) / w as f64,
            1.0 - (py as f64 + 0.5) / h as f64,
        );
        self.min + t * self.extent
    }

    fn to_pixel(&self, p: DVec2) -> Option<(u32, u32)> {
        let (w, h) = self.config.image_size;
        let t = (p - self.min) / self.extent;
        let px = (t.x * w as f64).floor();
        let py = ((1.0 - t.y) * h as f64).floor();
        (px >= 0.0 && py >= 0.0 && px < w as f64 && py < h as f64).then(|| (px as u32, py as u32))
    }

    /// Fills the image with a colormapped scalar field.
    pub fn paint_scalar(&mut self, field: &ScalarField) {
        let (lo, hi) = self
            .config
            .range
            .or_else(|| Some((field.min()?, field.max()?)))
            .unwrap_or((0.0, 1.0));
        let span = if hi > lo { hi - lo } else { 1.0 };
        let (w, h) = self.config.image_size;
        for py in 0..h {
            for px in 0..w {
                let p = self.to_domain(px, py);
                let rgb = match field.value_at(p) {
                    Ok(Some(v)) => colormap((v - lo) / span),
                    Ok(None) => self.config.masked,
                    Err(_) => self.config.background,
                };
                self.image.put_pixel(px, py, Rgb(rgb));
            }
        }
    }

    /// Draws a polyline through the trajectory's points.
    pub fn draw_trajectory(&mut self, trajectory: &Trajectory) {
        let color = Rgb(self.config.line);
        let pixel = self.extent.x / self.config.image_size.0 as f64;
        for pair in trajectory.points().windows(2) {
            let n = ((pair[1] - pair[0]).length() / (0.5 * pixel)).ceil().max(1.0) as usize;
            for k in 0..=n {
                let p = pair[0].lerp(pair[1], k as f64 / n as f64);
                if let Some((x, y)) = self.to_pixel(p) {
                    self.image.put_pixel(x, y, color);
                }
            }
        }
    }

    /// Marks a point with a small square.
    pub fn draw_point(&mut self, p: DVec2, rgb: [u8; 3]) {
        let Some((x, y)) = self.to_pixel(p) else {
            return;
        };
        let (w, h) = self.config.image_size;
        for py in y.saturating_sub(1)..=(y + 1).min(h - 1) {
            for px in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                self.image.put_pixel(px, py, Rgb(rgb));
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.image.save(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "wrote image");
        Ok(())
    }
}

/// Dark blue through teal to yellow for `t` in [0, 1].
fn colormap(t: f64) -> [u8; 3] {
    const STOPS: [[f64; 3]; 3] = [[68.0, 1.0, 84.0], [33.0, 145.0, 140.0], [253.0, 231.0, 37.0]];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let s = t * 2.0;
    let i = (s.floor() as usize).min(1);
    let f = s - i as f64;
    let mut out = [0u8; 3];
    for (c, o) in out.iter_mut().enumerate() {
        *o = (STOPS[i][c] + (STOPS[i + 1][c] - STOPS[i][c]) * f).round() as u8;
    }
    out
}
