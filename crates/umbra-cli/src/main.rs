//! Umbra CLI - Render signed distance field scenes from the command line

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use umbra_core::params::{LightKind, LightParam, ShapeKind};
use umbra_core::scene::{NodeId, SceneGraph};
use umbra_core::surface::ParamSurface;
use umbra_render::{RenderError, Renderer, SceneDescription};

#[derive(Parser)]
#[command(name = "umbra")]
#[command(about = "CPU ray marcher for signed distance field scenes", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a scene description to a PNG
    Render {
        /// Scene description (.json)
        scene: PathBuf,

        /// Output image file (.png)
        #[arg(short, long, default_value = "render.png")]
        output: PathBuf,

        /// Image width, overriding the scene's settings
        #[arg(long)]
        width: Option<u32>,

        /// Image height, overriding the scene's settings
        #[arg(long)]
        height: Option<u32>,

        /// Worker threads, overriding the scene's settings
        #[arg(long)]
        threads: Option<usize>,

        /// Also write a 16-bit depth image
        #[arg(long)]
        depth: Option<PathBuf>,

        /// Also write a 16-bit normal image
        #[arg(long)]
        normals: Option<PathBuf>,

        /// Cancel the render after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Build a scene's graph and report adjusted parameters
    Validate {
        /// Scene description (.json)
        scene: PathBuf,
    },

    /// List the shape registry
    Shapes {
        /// Show the full parameter surface of one shape
        #[arg(long)]
        shape: Option<String>,
    },

    /// Render the built-in demo scene
    Demo {
        /// Output file
        #[arg(short, long, default_value = "demo.png")]
        output: PathBuf,
    },
}

struct Outputs<'a> {
    colour: &'a Path,
    depth: Option<&'a Path>,
    normals: Option<&'a Path>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Render {
            scene,
            output,
            width,
            height,
            threads,
            depth,
            normals,
            timeout_secs,
        } => {
            let mut description = load(&scene)?;
            let settings = &mut description.settings;
            settings.width = width.unwrap_or(settings.width);
            settings.height = height.unwrap_or(settings.height);
            settings.threads = threads.or(settings.threads);

            let outputs = Outputs {
                colour: &output,
                depth: depth.as_deref(),
                normals: normals.as_deref(),
            };
            run_render(&description, &outputs, timeout_secs.map(Duration::from_secs))?;
        }
        Commands::Validate { scene } => {
            run_validate(&scene)?;
        }
        Commands::Shapes { shape } => {
            run_shapes(shape.as_deref())?;
        }
        Commands::Demo { output } => {
            let outputs = Outputs {
                colour: &output,
                depth: None,
                normals: None,
            };
            run_render(&SceneDescription::demo(), &outputs, None)?;
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<SceneDescription> {
    SceneDescription::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn run_render(
    description: &SceneDescription,
    outputs: &Outputs<'_>,
    timeout: Option<Duration>,
) -> Result<()> {
    let (graph, lights) = description.build()?;
    let settings = &description.settings;

    println!(
        "Rendering {} nodes with {} lights at {}x{}...",
        graph.len(),
        lights.len(),
        settings.width,
        settings.height
    );

    let abort = Arc::new(AtomicBool::new(false));
    if let Some(timeout) = timeout {
        let abort = Arc::clone(&abort);
        std::thread::spawn(move || {
            std::thread::sleep(timeout);
            abort.store(true, Ordering::Relaxed);
        });
    }

    let frame = match Renderer::new(settings.clone()).render(
        &graph,
        &lights,
        &description.camera(),
        &abort,
    ) {
        Ok(frame) => frame,
        Err(RenderError::Cancelled) => {
            bail!("Render cancelled after {:?}", timeout.unwrap_or_default())
        }
        Err(e) => return Err(e.into()),
    };

    frame.save_png(outputs.colour)?;
    println!("Saved {}", outputs.colour.display());
    if let Some(path) = outputs.depth {
        frame.depth_image().save(path)?;
        println!("Saved depth to {}", path.display());
    }
    if let Some(path) = outputs.normals {
        frame.normal_image().save(path)?;
        println!("Saved normals to {}", path.display());
    }

    let stats = frame.stats;
    println!(
        "  {} hits, {} misses, {} out of iterations",
        stats.hits, stats.misses, stats.budget_exceeded
    );

    Ok(())
}

fn run_validate(path: &Path) -> Result<()> {
    let description = load(path)?;
    let (graph, lights) = description.build()?;

    println!(
        "{}: {} nodes in {} chains, {} lights",
        path.display(),
        graph.len(),
        graph.roots().len(),
        lights.len()
    );
    for &root in graph.roots() {
        print_chain(&graph, root, 1);
    }

    if graph.normalizations().is_empty() {
        println!("No parameters adjusted");
    } else {
        println!("Adjusted parameters:");
        for normalization in graph.normalizations() {
            println!("  {normalization}");
        }
    }

    Ok(())
}

fn print_chain(graph: &SceneGraph, head: NodeId, depth: usize) {
    for id in graph.chain(head) {
        let node = graph.node(id);
        let role = if node.is_bound {
            "bound".to_string()
        } else if node.has_children() {
            node.blend.name().to_string()
        } else {
            String::new()
        };
        println!(
            "{:indent$}[{id}] {} ({}) {role}",
            "",
            node.name,
            node.shape.kind(),
            indent = depth * 2
        );
        if let Some(child) = node.children {
            print_chain(graph, child, depth + 1);
        }
    }
}

fn run_shapes(shape: Option<&str>) -> Result<()> {
    let Some(name) = shape else {
        println!("Shapes:");
        for kind in ShapeKind::ALL {
            let params: Vec<&str> = kind.params().iter().map(|spec| spec.name).collect();
            println!("  {:<26} {}", kind.name(), params.join(", "));
        }
        println!();
        println!("Lights:");
        for kind in LightKind::ALL {
            let param = match kind.param() {
                Some(LightParam::Vector { name, .. }) => name,
                Some(LightParam::Scalar(spec)) => spec.name,
                None => "",
            };
            println!("  {:<26} {param}", kind.name());
        }
        return Ok(());
    };

    let Some(kind) = ShapeKind::from_name(name) else {
        bail!("Unknown shape '{name}'. Run `umbra shapes` for the list");
    };

    let mut surface = ParamSurface::primitive();
    surface.set("shape", kind.name())?;

    println!("{}", kind.name());
    for spec in kind.params() {
        println!(
            "  {:<28} default {:<8} range [{}, {}]",
            spec.name, spec.default, spec.min, spec.max
        );
        println!("      {}", spec.tooltip);
    }

    println!();
    println!("Parameter surface:");
    for param in surface.params().iter().filter(|param| param.visible) {
        let state = if param.enabled { "" } else { " (disabled)" };
        println!("  {:<28} {}{state}", param.label, param.value);
    }

    Ok(())
}
