use glam::DVec2;
use gridflow::prelude::*;
use gridflow_examples::{init_tracing, Canvas, RenderConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let m = Unit::parse("m")?;
    let grid = Grid::new(
        Axis::linspace(-1.0, 1.0, 61, m.clone())?,
        Axis::linspace(-1.0, 1.0, 61, m)?,
    );
    // Solid-body rotation inside r = 0.5, decaying outside, plus a weak drift.
    let mut field = VectorField::from_fn(grid.clone(), Unit::parse("m/s")?, |p: DVec2| {
        let r2 = p.length_squared().max(1e-12);
        let swirl = if r2 < 0.25 { 1.0 } else { 0.25 / r2 };
        DVec2::new(-p.y, p.x) * swirl + DVec2::new(0.15, 0.0)
    })?;

    // An obstacle the lines must stop at.
    let mask = (0..grid.len())
        .map(|idx| {
            let p = grid.point(grid.cell(idx).0, grid.cell(idx).1);
            (p - DVec2::new(0.6, 0.0)).length() < 0.12
        })
        .collect();
    field.set_mask(mask)?;

    let seeds: Vec<DVec2> = (1..10).map(|i| DVec2::new(-0.8, -1.0 + 0.2 * i as f64)).collect();
    let base = IntegratorConfig::default().with_horizon(6.0);

    for (policy, kind, out) in [
        (BoundaryPolicy::Stop, LineKind::Streamline, "lines-stop.png"),
        (BoundaryPolicy::Hide, LineKind::Streamline, "lines-hide.png"),
        (BoundaryPolicy::Stop, LineKind::Fieldline, "lines-fieldlines.png"),
        (BoundaryPolicy::Stop, LineKind::Trackline, "lines-tracklines.png"),
    ] {
        let lines = trace_lines(&field, kind, &seeds, base.clone().with_boundary(policy))?;
        tracing::info!(?policy, ?kind, kept = lines.len(), "traced");

        let mut canvas = Canvas::new(&grid, RenderConfig::new((600, 600)));
        canvas.paint_scalar(&field.magnitude());
        for line in &lines {
            canvas.draw_trajectory(line);
        }
        canvas.save(out)?;
    }

    Ok(())
}
