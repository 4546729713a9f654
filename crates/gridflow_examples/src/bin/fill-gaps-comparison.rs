use glam::DVec2;
use gridflow::prelude::*;
use gridflow_examples::{init_tracing, Canvas, RenderConfig};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let m = Unit::parse("mm")?;
    let grid = Grid::new(
        Axis::linspace(0.0, 40.0, 81, m.clone())?,
        Axis::linspace(0.0, 20.0, 41, m)?,
    );
    let truth = ScalarField::from_fn(grid.clone(), Unit::parse("K")?, |p: DVec2| {
        (p.x / 6.0).sin() * (p.y / 4.0).cos() + 0.02 * p.x
    })?;

    // Knock out 15% of the cells plus a rectangular hole.
    let mut rng = StdRng::seed_from_u64(7);
    let mask: Vec<bool> = (0..grid.len())
        .map(|idx| {
            let p = grid.point(grid.cell(idx).0, grid.cell(idx).1);
            let hole = (18.0..24.0).contains(&p.x) && (6.0..12.0).contains(&p.y);
            hole || rng.next_u32() % 100 < 15
        })
        .collect();
    let mut damaged = truth.clone();
    damaged.set_mask(mask)?;
    tracing::info!(masked = damaged.masked_count(), "damaged field");

    let config = RenderConfig::new((800, 400)).with_range(-1.0, 2.0);
    let mut canvas = Canvas::new(&grid, config.clone());
    canvas.paint_scalar(&damaged);
    canvas.save("fill-damaged.png")?;

    for kind in [FillKind::Nearest, FillKind::Linear, FillKind::Cubic] {
        let filled = damaged.fill(&FillOptions::new(kind))?;
        let error = (&filled - &truth)?;
        let worst = error
            .values()
            .iter()
            .zip(error.mask())
            .filter(|(_, &masked)| !masked)
            .map(|(v, _)| v.abs())
            .fold(0.0, f64::max);
        tracing::info!(?kind, worst, remaining = filled.masked_count(), "filled");

        let mut canvas = Canvas::new(&grid, config.clone());
        canvas.paint_scalar(&filled);
        canvas.save(format!("fill-{kind:?}.png").to_lowercase())?;
    }

    Ok(())
}
