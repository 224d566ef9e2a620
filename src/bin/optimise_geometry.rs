//! Search for the strut geometry with the most even force sensing.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use haptick::geometry::GeometryModel;
use haptick::objectives::EvennessError;
use haptick::optimizer;
use haptick::types::{SearchConfig, STANDARD_GRAVITY};

#[derive(Parser, Debug)]
#[command(about = "Particle-swarm search over Haptick strut geometry")]
struct Args {
    /// JSON settings file (`evenness`, `bounds`, `swarm`); flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Swarm size
    #[arg(long)]
    particles: Option<usize>,

    /// Swarm iterations
    #[arg(long)]
    iterations: Option<u64>,

    /// Test directions on the sphere
    #[arg(long)]
    samples: Option<usize>,

    /// Platform height (m)
    #[arg(long)]
    height: Option<f64>,

    /// Test mass (kg) giving the nominal force
    #[arg(long)]
    mass: Option<f64>,

    /// Lever arm (m) giving the nominal torque from the nominal force
    #[arg(long)]
    lever: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            SearchConfig::from_json(&text)?
        }
        None => SearchConfig::default(),
    };

    if let Some(n) = args.particles {
        config.swarm.num_particles = n;
    }
    if let Some(n) = args.iterations {
        config.swarm.max_iterations = n;
    }
    if let Some(n) = args.samples {
        config.evenness.samples = n;
    }
    if let Some(h) = args.height {
        config.evenness.height = h;
    }
    if let Some(m) = args.mass {
        let lever = config.evenness.nominal_torque / config.evenness.nominal_force;
        config.evenness.nominal_force = m * STANDARD_GRAVITY;
        config.evenness.nominal_torque = config.evenness.nominal_force * lever;
    }
    if let Some(l) = args.lever {
        config.evenness.nominal_torque = config.evenness.nominal_force * l;
    }

    let objective = EvennessError::new(config.evenness.clone())?;
    let result = optimizer::optimize(&objective, &config.bounds, &config.swarm)?;
    let p = result.parameters;

    println!("cost                {:.6e}", result.cost);
    println!("iterations          {}", result.iterations);
    println!("top radius          {:.3} mm", p.top_radius * 1e3);
    println!("top separation      {:.3} mm", p.top_separation * 1e3);
    println!("bottom radius       {:.3} mm", p.bottom_radius * 1e3);
    println!("bottom separation   {:.3} mm", p.bottom_separation * 1e3);
    println!("height              {:.3} mm", p.height * 1e3);

    let model = GeometryModel::new(p).context("Best geometry is singular")?;
    for (i, len) in model.strut_lengths().iter().enumerate() {
        println!("strut {i} length      {:.3} mm", len * 1e3);
    }
    Ok(())
}
