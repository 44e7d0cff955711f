pub mod error;
pub mod heightfield;
pub mod mesh;
pub mod orbit;
pub mod photo;
pub mod warp;

pub use error::ReliefError;
pub use heightfield::{HeightField, LumaStats};
pub use mesh::{GRID_SEGMENTS, SurfaceMesh, initial_camera_distance};
pub use orbit::{DEPTH_INTENSITY_MAX, OrbitController, OrbitPhase, ViewerParameters};
pub use photo::SourcePhoto;
