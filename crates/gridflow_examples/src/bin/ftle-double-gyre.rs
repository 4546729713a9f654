use gridflow::prelude::*;
use gridflow_examples::{double_gyre, init_tracing, Canvas, RenderConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let field = double_gyre(101, 51, 0.1)?;

    let mut summary = RunSummary::new();

    // Backward FTLE ridges mark attracting structures.
    for (horizon, out) in [(5.0, "ftle-forward.png"), (-5.0, "ftle-backward.png")] {
        let config = FtleConfig::new(horizon)
            .with_seed_spacing(0.005)
            .with_tolerance(1e-6);
        let engine = FtleEngine::try_new(config)?;
        let ftle = engine.compute_with_events(&field, &mut summary)?;

        tracing::info!(
            horizon,
            unit = %ftle.unit(),
            max = ftle.max().unwrap_or(f64::NAN),
            masked = ftle.masked_count(),
            left_domain = summary.boundary,
            completion = summary.completion_ratio().unwrap_or(0.0),
            "ftle field"
        );

        let mut canvas = Canvas::new(ftle.grid(), RenderConfig::new((1200, 600)));
        canvas.paint_scalar(&ftle);
        canvas.save(out)?;
    }

    Ok(())
}
