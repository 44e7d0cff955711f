use glam::Vec3;

use crate::warp::curvature_offset;

/// Subdivision count per plane axis. Constant regardless of photo
/// resolution; only the plane extents scale with aspect ratio, so
/// vertex and index counts never change between photos.
pub const GRID_SEGMENTS: u32 = 256;

const PLANE_WIDTH: f32 = 2.0;

/// Camera distance that frames the whole plane for both portrait and
/// landscape photos.
pub fn initial_camera_distance(plane_height: f32) -> f32 {
    plane_height.max(1.0) * 0.8
}

/// Subdivided plane carrying the photo. Built once per photo: flat
/// grid, then the curvature warp, then a normal recompute (flat-plane
/// normals would light the warped surface incorrectly). Never edited
/// per frame afterward; render-time depth displacement happens in the
/// vertex shader against the height texture.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
    plane_width: f32,
    plane_height: f32,
}

impl SurfaceMesh {
    pub fn build(aspect_ratio: f32) -> Self {
        let plane_width = PLANE_WIDTH;
        let plane_height = PLANE_WIDTH / aspect_ratio;

        let mut mesh = Self::flat_grid(plane_width, plane_height);
        mesh.apply_curvature();
        mesh.recompute_normals();
        mesh
    }

    fn flat_grid(plane_width: f32, plane_height: f32) -> Self {
        let verts_per_axis = GRID_SEGMENTS + 1;
        let vertex_count = (verts_per_axis * verts_per_axis) as usize;

        let mut positions = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);
        for iy in 0..verts_per_axis {
            let fy = iy as f32 / GRID_SEGMENTS as f32;
            let y = plane_height / 2.0 - fy * plane_height;
            for ix in 0..verts_per_axis {
                let fx = ix as f32 / GRID_SEGMENTS as f32;
                let x = fx * plane_width - plane_width / 2.0;
                positions.push([x, y, 0.0]);
                // Texel row 0 is the photo's top row and the grid
                // builds top-down, so v runs with fy directly.
                uvs.push([fx, fy]);
            }
        }

        let mut indices = Vec::with_capacity((GRID_SEGMENTS * GRID_SEGMENTS * 6) as usize);
        for iy in 0..GRID_SEGMENTS {
            for ix in 0..GRID_SEGMENTS {
                let a = iy * verts_per_axis + ix;
                let b = a + 1;
                let c = a + verts_per_axis;
                let d = c + 1;
                // Two counter-clockwise triangles per cell.
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }

        Self {
            normals: vec![[0.0, 0.0, 1.0]; vertex_count],
            positions,
            uvs,
            indices,
            plane_width,
            plane_height,
        }
    }

    /// One-shot smile-arc pass over the flat grid. Compositionally
    /// separate from the render-time displacement: this bakes into
    /// vertex data, the height texture never does.
    fn apply_curvature(&mut self) {
        for position in &mut self.positions {
            position[2] += curvature_offset(
                position[0],
                position[1],
                self.plane_width,
                self.plane_height,
            );
        }
    }

    /// Area-weighted vertex normals accumulated from face cross
    /// products, matching what the warped surface needs for lighting.
    fn recompute_normals(&mut self) {
        let mut accumulated = vec![Vec3::ZERO; self.positions.len()];

        for triangle in self.indices.chunks_exact(3) {
            let a = Vec3::from(self.positions[triangle[0] as usize]);
            let b = Vec3::from(self.positions[triangle[1] as usize]);
            let c = Vec3::from(self.positions[triangle[2] as usize]);
            let face = (b - a).cross(c - a);
            for &index in triangle {
                accumulated[index as usize] += face;
            }
        }

        for (normal, sum) in self.normals.iter_mut().zip(accumulated) {
            *normal = sum.normalize_or_zero().into();
        }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn plane_width(&self) -> f32 {
        self.plane_width
    }

    pub fn plane_height(&self) -> f32 {
        self.plane_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp::CURVE_INTENSITY;

    #[test]
    fn square_photo_yields_square_plane() {
        let mesh = SurfaceMesh::build(1.0);
        assert_eq!(mesh.plane_width(), 2.0);
        assert_eq!(mesh.plane_height(), 2.0);
    }

    #[test]
    fn landscape_photo_shrinks_plane_height_only() {
        let mesh = SurfaceMesh::build(2.0);
        assert_eq!(mesh.plane_width(), 2.0);
        assert_eq!(mesh.plane_height(), 1.0);
    }

    #[test]
    fn vertex_count_ignores_photo_resolution() {
        let expected = ((GRID_SEGMENTS + 1) * (GRID_SEGMENTS + 1)) as usize;
        for aspect in [0.25f32, 1.0, 1.777, 4.0] {
            let mesh = SurfaceMesh::build(aspect);
            assert_eq!(mesh.vertex_count(), expected);
            assert_eq!(
                mesh.indices().len(),
                (GRID_SEGMENTS * GRID_SEGMENTS * 6) as usize
            );
        }
    }

    #[test]
    fn curvature_is_baked_into_the_grid() {
        let mesh = SurfaceMesh::build(1.0);
        let center = mesh
            .positions()
            .iter()
            .find(|p| p[0] == 0.0 && p[1] == 0.0)
            .expect("grid has a center vertex");
        assert!((center[2] - CURVE_INTENSITY).abs() < 1e-6);

        // Edges of the arc bow away from the center.
        let left_edge = mesh
            .positions()
            .iter()
            .find(|p| p[0] == -1.0 && p[1] == 0.0)
            .expect("grid has a left-center vertex");
        assert!(left_edge[2] < center[2]);
    }

    #[test]
    fn uv_origin_sits_at_the_top_left_of_the_plane() {
        let mesh = SurfaceMesh::build(1.0);

        // Top-left vertex of the plane must sample the photo's first
        // texel row, or the image renders vertically mirrored.
        let (index, _) = mesh
            .positions()
            .iter()
            .enumerate()
            .find(|(_, p)| p[0] == -1.0 && p[1] == 1.0)
            .expect("grid has a top-left vertex");
        assert_eq!(mesh.uvs()[index], [0.0, 0.0]);

        let (index, _) = mesh
            .positions()
            .iter()
            .enumerate()
            .find(|(_, p)| p[0] == 1.0 && p[1] == -1.0)
            .expect("grid has a bottom-right vertex");
        assert_eq!(mesh.uvs()[index], [1.0, 1.0]);
    }

    #[test]
    fn normals_are_unit_length_after_warp() {
        let mesh = SurfaceMesh::build(1.5);
        for normal in mesh.normals() {
            let length = Vec3::from(*normal).length();
            assert!((length - 1.0).abs() < 1e-4, "normal length {length}");
        }
    }

    #[test]
    fn indices_stay_in_bounds() {
        let mesh = SurfaceMesh::build(0.5);
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices().iter().all(|&index| index < count));
    }

    #[test]
    fn camera_distance_frames_portrait_and_landscape() {
        // Landscape: plane height under 1 clamps to the width-driven
        // minimum. Portrait: taller planes push the camera back.
        assert_eq!(initial_camera_distance(1.0), 0.8);
        assert_eq!(initial_camera_distance(0.5), 0.8);
        assert_eq!(initial_camera_distance(4.0), 3.2);
    }
}
