use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ossify_core::{ExportConfig, FrameRate};
use ossify_export::{default_output_dir, map_bones, Exporter};
use ossify_ir::validate::validate_project;
use ossify_ir::Project;
use ossify_raster::{PngFootageExporter, StillFrameRasterizer};

#[derive(Parser)]
#[command(
    name = "ossify",
    version,
    about = "Ossify: keyframe-animated scene graphs to skeletal animation",
    long_about = "Ossify flattens nested, keyframe-animated 2D scenes into bones, slots,\nskins and timelines, and writes one skeletal animation document per scene."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export scenes of a project as skeletal animation documents
    Export {
        /// Path to the project .json file
        #[arg()]
        project: PathBuf,

        /// Scene to export, by id or name (repeatable; default: all top-level scenes)
        #[arg(long = "scene")]
        scenes: Vec<String>,

        /// Output directory (default: <project dir>/<project name> [Spine])
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Frame rate: N forces a rate, 0 uses each scene's rate, -1 exports keys only
        #[arg(long, allow_hyphen_values = true)]
        fps: Option<String>,

        /// Sample every property at the frame rate instead of reading its keys
        #[arg(long)]
        sample: bool,

        /// Write every sample instead of dropping redundant keys
        #[arg(long)]
        no_compress: bool,

        /// Do not export mesh-deformation pins
        #[arg(long)]
        no_mesh_pins: bool,
    },

    /// Validate a project without exporting it
    Check {
        /// Path to the project .json file
        #[arg()]
        project: PathBuf,
    },

    /// Print the flattened layer tree and bones of one scene
    Inspect {
        /// Path to the project .json file
        #[arg()]
        project: PathBuf,

        /// Scene to inspect, by id or name
        #[arg(long)]
        scene: String,
    },

    /// Display version and exporter info
    Info,
}

/// Command-line overrides applied on top of `ossify.toml`.
#[derive(Default)]
struct Overrides {
    fps: Option<String>,
    sample: bool,
    no_compress: bool,
    no_mesh_pins: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Export {
            project,
            scenes,
            out,
            fps,
            sample,
            no_compress,
            no_mesh_pins,
        } => {
            let overrides = Overrides {
                fps,
                sample,
                no_compress,
                no_mesh_pins,
            };
            cmd_export(&project, &scenes, out, overrides)
        }
        Commands::Check { project } => cmd_check(&project),
        Commands::Inspect { project, scene } => cmd_inspect(&project, &scene),
        Commands::Info => cmd_info(),
    }
}

fn load_project(path: &Path) -> Result<Project> {
    Project::load_from_file(path)
        .with_context(|| format!("failed to load project: {}", path.display()))
}

fn project_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn load_config(project_path: &Path, overrides: &Overrides) -> Result<ExportConfig> {
    let dir = project_dir(project_path);
    let mut config = ExportConfig::discover(dir)
        .with_context(|| format!("failed to read ossify.toml in {}", dir.display()))?;
    if let Some(fps) = &overrides.fps {
        config.fps = fps.parse::<FrameRate>()?;
    }
    if overrides.sample {
        config.sample_keys = true;
    }
    if overrides.no_compress {
        config.compress = false;
    }
    if overrides.no_mesh_pins {
        config.mesh_pins = false;
    }
    Ok(config)
}

fn cmd_export(
    project_path: &Path,
    scenes: &[String],
    out: Option<PathBuf>,
    overrides: Overrides,
) -> Result<()> {
    let start = Instant::now();
    let project = load_project(project_path)?;
    let config = load_config(project_path, &overrides)?;
    let out_dir = out.unwrap_or_else(|| default_output_dir(project_path, &project, &config));

    println!("🦴 Exporting {}", project_path.display());
    println!("   Frame rate: {}", config.fps);
    println!("   Output:     {}", out_dir.display());

    let base_dir = project_dir(project_path);
    let rasterizer = StillFrameRasterizer::new(base_dir);
    let footage = PngFootageExporter::new(base_dir);
    let exporter = Exporter::new(&project, config, &rasterizer, &footage);
    let report = exporter
        .run(scenes, &out_dir)
        .with_context(|| format!("export of {} aborted", project_path.display()))?;

    println!();
    for scene in &report.scenes {
        match &scene.result {
            Ok(summary) => println!(
                "   ✓ {} ({} bones, {} slots, {}fps) [{}]",
                summary.path.display(),
                summary.bones,
                summary.slots,
                summary.fps,
                summary.hash
            ),
            Err(e) => println!("   ✗ {}: {}", scene.name, e),
        }
    }
    for item in report.footage.iter().filter(|f| f.result.is_err()) {
        if let Err(e) = &item.result {
            println!("   ✗ image {}: {}", item.name, e);
        }
    }
    println!();

    let failures = report.failures();
    if failures > 0 {
        anyhow::bail!("{} item(s) failed to export", failures);
    }
    println!(
        "   ✅ Exported {} scene(s) and {} image(s) in {:.2}s",
        report.scenes.len(),
        report.footage.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn cmd_check(project_path: &Path) -> Result<()> {
    println!("🔍 Checking {}", project_path.display());
    let project = load_project(project_path)?;
    println!("   ✓ Parse OK");

    validate_project(&project).map_err(|errors| {
        let msgs: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
        anyhow::anyhow!("Validation errors:\n  {}", msgs.join("\n  "))
    })?;
    println!("   ✓ Validate OK");

    for scene in &project.scenes {
        let role = if scene.nested { " (nested)" } else { "" };
        println!(
            "   • {}{}: {} layers, {}s @ {}fps",
            scene.name,
            role,
            scene.layers.len(),
            scene.window.duration,
            scene.fps
        );
    }
    println!();
    println!("   ✅ No errors found.");
    Ok(())
}

fn cmd_inspect(project_path: &Path, scene_key: &str) -> Result<()> {
    let project = load_project(project_path)?;
    let config = load_config(project_path, &Overrides::default())?;
    let scene = project
        .find_scene(scene_key)
        .with_context(|| format!("no scene named '{}'", scene_key))?;

    let rasterizer = StillFrameRasterizer::new(project_dir(project_path));
    let footage = PngFootageExporter::new(project_dir(project_path));
    let exporter = Exporter::new(&project, config, &rasterizer, &footage);
    let flat = exporter.flatten(scene)?;

    println!("Scene {} ({} flattened layers)", flat.name, flat.layers.len());
    for layer in &flat.layers {
        let mut flags = Vec::new();
        if layer.anchor {
            flags.push("container");
        } else if !layer.layer.enabled {
            flags.push("disabled");
        }
        if layer.layer.is_distorted() {
            flags.push("distorted");
        }
        if layer.layer.mesh_deform().is_some() {
            flags.push("mesh");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!(
            "  {}{} {}..{}{}",
            "  ".repeat(layer.nesting),
            layer.name,
            layer.layer.in_point,
            layer.layer.out_point,
            flags
        );
    }

    println!();
    println!("Bones");
    for bone in map_bones(&flat) {
        let parent = bone.parent.as_deref().unwrap_or("-");
        println!(
            "  {} <- {}  x={} y={} rotation={} scale=({}, {})",
            bone.name, parent, bone.x, bone.y, bone.rotation, bone.scale_x, bone.scale_y
        );
    }
    Ok(())
}

fn cmd_info() -> Result<()> {
    println!("🦴 Ossify Skeletal Exporter");
    println!("   Version:     {}", env!("CARGO_PKG_VERSION"));
    println!("   Output:      skeleton JSON (bones, slots, skins, animations)");
    println!("   Sampling:    exact keys, fixed-rate fallback for curved segments");
    println!("   Rasterizer:  still frames (effects are not rendered)");
    println!("   Config file: {}", ossify_core::config::CONFIG_FILE_NAME);
    Ok(())
}
