use gridflow::prelude::*;
use gridflow_examples::{double_gyre, init_tracing, Canvas, RenderConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let field = double_gyre(81, 41, 0.1)?;

    // Jittered seeds keep the lines from lining up into visible rows.
    let mut rng = StdRng::seed_from_u64(2025);
    let seeds = seeds_for(field.grid(), &JitterSeeding::new(0.1, 0.8), &mut rng);

    let config = IntegratorConfig::default()
        .with_horizon(1.5)
        .with_output_step(0.01)
        .with_tolerance(1e-7);
    let lines = streamlines(&field, &seeds, config)?;

    let completed = lines.iter().filter(|t| t.is_completed()).count();
    let total_length: f64 = lines.iter().map(Trajectory::length).sum();
    tracing::info!(
        seeds = seeds.len(),
        completed,
        total_length,
        "streamlines traced"
    );

    let mut canvas = Canvas::new(field.grid(), RenderConfig::new((1000, 500)));
    canvas.paint_scalar(&field.magnitude());
    for line in &lines {
        canvas.draw_trajectory(line);
    }
    for seed in &seeds {
        canvas.draw_point(*seed, [220, 60, 60]);
    }
    canvas.save("streamlines-double-gyre.png")?;

    Ok(())
}
