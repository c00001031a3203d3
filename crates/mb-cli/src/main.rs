mod mesh;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mb_core::{
    Brush, ContextEvent, Field, KernelModel, KernelRegistry, Manifold, ManifoldBrush,
    ManifoldBrushContext, PaintConfig, TrajectoryBrush, TrajectoryPlayback,
};
use serde::Serialize;

use crate::mesh::MeshSpec;

#[derive(Parser)]
#[command(name = "mb", about = "Paint brush fields on demo manifolds")]
struct Cli {
    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List kernel families and their default parameters
    Kernels {
        /// Mesh whose spectrum the defaults are derived from
        #[arg(long, default_value = "ring:32")]
        mesh: MeshSpec,
    },

    /// Paint one field at a seed vertex
    Paint {
        /// ring:N, path:N, grid:WxH or triangles
        #[arg(long)]
        mesh: MeshSpec,

        /// Paint config (.toml or .json); spectral heat brush if omitted
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 0)]
        seed: usize,

        /// End vertex for trajectory brushes
        #[arg(long)]
        target: Option<usize>,

        /// Print the full field as JSON
        #[arg(long)]
        json: bool,
    },

    /// Step a trajectory from seed to target, one path vertex per tick
    Trajectory {
        #[arg(long)]
        mesh: MeshSpec,

        /// Paint config; a non-trajectory brush becomes the base brush
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 0)]
        seed: usize,

        #[arg(long)]
        target: usize,

        /// Print the path and final field as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Kernels { mesh } => cmd_kernels(mesh),
        Commands::Paint {
            mesh,
            config,
            seed,
            target,
            json,
        } => cmd_paint(mesh, config.as_deref(), *seed, *target, *json),
        Commands::Trajectory {
            mesh,
            config,
            seed,
            target,
            json,
        } => cmd_trajectory(mesh, config.as_deref(), *seed, *target, *json),
    }
}

// ---------------------------------------------------------------------------
// Config and output helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<PaintConfig> {
    let Some(path) = path else {
        return Ok(PaintConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        PaintConfig::from_json(&content).map_err(anyhow::Error::from)
    } else {
        toml::from_str(&content).map_err(anyhow::Error::from)
    };
    parsed.with_context(|| format!("failed to parse {}", path.display()))
}

fn build_brush(
    config: &PaintConfig,
    manifold: &Manifold,
    registry: Arc<KernelRegistry>,
) -> Result<(Brush, Option<KernelModel>)> {
    config
        .build(registry, manifold.dual().map(|d| &d.eigenvalues))
        .context("invalid paint config")
}

#[derive(Serialize)]
struct FieldReport<'a> {
    mesh: String,
    vertices: usize,
    brush: &'a str,
    kernel: Option<&'a str>,
    seed: usize,
    target: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a [usize]>,
    field: &'a [f64],
}

fn print_summary(field: &Field) {
    let support = field.iter().filter(|v| v.abs() > mb_core::EPSILON).count();
    println!("support:    {support}/{}", field.len());
    println!("peak:       {:.4} at {}", field[field.iamax()], field.iamax());
    println!("sum:        {:.4}", field.sum());
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_kernels(mesh: &MeshSpec) -> Result<()> {
    let manifold = mesh.build();
    let dual = manifold
        .dual()
        .with_context(|| format!("mesh {mesh} has no spectral basis"))?;
    let registry = Arc::new(KernelRegistry::with_builtins());

    println!("axis: {mesh}, {} eigenvalues", dual.k());
    for name in registry.names() {
        let model = KernelModel::builder(Arc::clone(&registry))
            .axis(dual.eigenvalues.clone())
            .kernel_type(name)
            .build()
            .with_context(|| format!("failed to build kernel '{name}'"))?;
        let params: Vec<String> = model
            .params()
            .iter()
            .map(|(k, v)| format!("{k}={v:.4}"))
            .collect();
        println!("{name:<12} {}", params.join(" "));
    }
    Ok(())
}

fn cmd_paint(
    mesh: &MeshSpec,
    config: Option<&Path>,
    seed: usize,
    target: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let manifold = Arc::new(mesh.build());
    let registry = Arc::new(KernelRegistry::with_builtins());
    let (brush, kernel) = build_brush(&config, &manifold, registry)?;

    let mut ctx = ManifoldBrushContext::new();
    ctx.subscribe(|event| match event {
        ContextEvent::FieldChanged(field) => {
            tracing::debug!(peak = field.amax(), "field updated");
        }
        other => tracing::debug!(?other, "context changed"),
    });
    ctx.set_manifold(Some(manifold));
    ctx.set_kernel_model(kernel);
    ctx.set_target(target);
    ctx.set_brush(Some(brush));
    ctx.set_seed(seed);

    if let Some(e) = ctx.last_error() {
        bail!("painting failed: {e}");
    }
    let field = ctx.field().context("no field was painted")?;
    let brush = ctx.brush().map(|b| b.kind()).unwrap_or("none");
    let kernel = ctx.kernel_model().map(|k| k.kernel_type());

    if json {
        let report = FieldReport {
            mesh: mesh.to_string(),
            vertices: field.len(),
            brush,
            kernel,
            seed,
            target,
            path: None,
            field: field.as_slice(),
        };
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    println!("mesh:       {mesh} ({} vertices)", field.len());
    println!("brush:      {brush}");
    println!("kernel:     {}", kernel.unwrap_or("-"));
    println!("seed:       {seed}");
    print_summary(field);
    Ok(())
}

fn cmd_trajectory(
    mesh: &MeshSpec,
    config: Option<&Path>,
    seed: usize,
    target: usize,
    json: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let manifold = mesh.build();
    let registry = Arc::new(KernelRegistry::with_builtins());
    let (brush, kernel) = build_brush(&config, &manifold, registry)?;

    let mut brush = match brush {
        Brush::Trajectory(mut t) => {
            t.set_target(Some(target));
            t
        }
        base => TrajectoryBrush::new(Some(target)).with_base(base),
    };

    let mut playback = TrajectoryPlayback::new();
    playback
        .start(&mut brush, &manifold, seed)
        .with_context(|| format!("no trajectory from {seed} to {target}"))?;
    let steps = playback.path().len();

    let mut step = 0;
    while let Some(field) = playback
        .tick(&mut brush, &manifold)
        .context("trajectory step failed")?
    {
        step += 1;
        if !json {
            println!(
                "step {step:>3}/{steps}  progress {:>5.1}%  peak at {}",
                playback.progress() * 100.0,
                field.iamax()
            );
        }
    }
    playback.stop();

    let field = playback.field().context("trajectory produced no field")?;
    let kernel = kernel.as_ref().map(|k| k.kernel_type());

    if json {
        let report = FieldReport {
            mesh: mesh.to_string(),
            vertices: field.len(),
            brush: "trajectory",
            kernel,
            seed,
            target: Some(target),
            path: Some(playback.path()),
            field: field.as_slice(),
        };
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    println!(
        "path:       {}",
        playback
            .path()
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    println!("weight:     {}", brush.weight());
    print_summary(&field);
    Ok(())
}
