use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Orbit a photo as a depth-displaced 3D relief", version)]
pub struct Args {
    /// Photo to reconstruct (PNG or JPEG); drop a new file onto the
    /// window to replace it at runtime
    pub photo: PathBuf,

    /// Initial displacement strength applied to the height texture
    #[arg(long, default_value_t = 0.1)]
    pub depth_intensity: f32,

    /// Start with idle auto-rotation disabled
    #[arg(long)]
    pub no_auto_rotate: bool,

    /// When set, write the synthesized heightmap to disk (PNG) before
    /// launching the viewer
    #[arg(long)]
    pub dump_heightmap: Option<PathBuf>,

    /// Skip creating a winit window/event loop; useful for headless
    /// automation
    #[arg(long)]
    pub headless: bool,
}
