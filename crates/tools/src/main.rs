use std::fs;
use std::path::{Path, PathBuf};

use cartography::{RenderConfig, trace_outline};
use clap::{Parser, Subcommand};
use layers::{MapRenderer, to_svg_document};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod scene;

use scene::{MeshSpec, SceneSpec};

#[derive(Parser, Debug)]
#[command(author, version, about = "Renders region maps of planetary surfaces to SVG")]
struct Args {
    /// Render configuration (JSON); missing fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clip, project and label every region of a scene
    Render {
        /// Scene file (JSON)
        #[arg(long)]
        scene: PathBuf,

        /// Output SVG; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Trace the outline of selected mesh tiles and print its path data
    Trace {
        /// Mesh file (JSON)
        #[arg(long)]
        mesh: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => RenderConfig::from_path(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => RenderConfig::default(),
    };
    match args.command {
        Command::Render { scene, out } => cmd_render(&scene, out.as_deref(), config),
        Command::Trace { mesh } => cmd_trace(&mesh, config),
    }
}

fn cmd_render(scene_path: &Path, out: Option<&Path>, config: RenderConfig) -> Result<(), String> {
    let payload = fs::read_to_string(scene_path).map_err(|e| format!("read {scene_path:?}: {e}"))?;
    let scene = SceneSpec::from_json_str(&payload)?;
    let surface = scene.surface.build();
    let projection = scene.projection.build(surface.as_ref());

    let mut renderer = MapRenderer::new(config);
    let mut rendered = Vec::with_capacity(scene.regions.len());
    for region in &scene.regions {
        let islands = scene.islands(region);
        let result = renderer
            .render_region(&region.name, &islands, surface.as_ref(), projection.as_ref())
            .map_err(|e| format!("region {:?}: {e}", region.name))?;
        rendered.push(result);
    }
    let labelled = rendered.iter().filter(|r| r.label.is_some()).count();
    let document = to_svg_document(&rendered).map_err(|e| format!("svg: {e}"))?;

    match out {
        Some(path) => {
            fs::write(path, document).map_err(|e| format!("write {path:?}: {e}"))?;
            info!(regions = rendered.len(), labelled, out = %path.display(), "wrote map");
        }
        None => print!("{document}"),
    }
    Ok(())
}

fn cmd_trace(mesh_path: &Path, config: RenderConfig) -> Result<(), String> {
    let payload = fs::read_to_string(mesh_path).map_err(|e| format!("read {mesh_path:?}: {e}"))?;
    let spec = MeshSpec::from_json_str(&payload)?;
    let surface = spec.surface.build();
    let projection = spec.projection.build(surface.as_ref());
    let mesh = spec.mesh(surface.is_periodic())?;

    let outline = trace_outline(&mesh, &spec.included, &config.caps).map_err(|e| format!("trace: {e}"))?;
    info!(loops = outline.loops.len(), "traced outline");
    let islands = outline.into_region(surface.as_ref());

    let mut renderer = MapRenderer::new(config);
    let rendered = renderer
        .render_region(&spec.name, &islands, surface.as_ref(), projection.as_ref())
        .map_err(|e| format!("region {:?}: {e}", spec.name))?;
    println!("{}", rendered.path_data);
    Ok(())
}
