use glam::{Mat4, Vec3};
use relief_core::initial_camera_distance;

const FOV_Y_DEGREES: f32 = 75.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 1000.0;

/// Perspective camera fixed on the +z axis looking at the plane
/// origin. Orbiting rotates the surface, not the camera, so only the
/// framing distance and viewport aspect ever change here.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    aspect: f32,
    distance: f32,
}

impl OrbitCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            aspect: aspect.max(f32::EPSILON),
            distance: 1.0,
        }
    }

    /// Back the camera off far enough that the whole plane fits, for
    /// portrait and landscape photos alike.
    pub fn frame_plane(&mut self, plane_height: f32) {
        self.distance = initial_camera_distance(plane_height);
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn view_proj(&self) -> Mat4 {
        let projection =
            Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), self.aspect, Z_NEAR, Z_FAR);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, self.distance), Vec3::ZERO, Vec3::Y);
        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn framing_tracks_plane_height_with_a_floor() {
        let mut camera = OrbitCamera::new(16.0 / 9.0);
        camera.frame_plane(0.5);
        assert_eq!(camera.distance(), 0.8);
        camera.frame_plane(4.0);
        assert_eq!(camera.distance(), 3.2);
    }

    #[test]
    fn plane_center_projects_to_the_viewport_center() {
        let mut camera = OrbitCamera::new(1.0);
        camera.frame_plane(2.0);

        let clip = camera.view_proj() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-6);
        assert!(ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn plane_corners_stay_inside_the_frustum() {
        let mut camera = OrbitCamera::new(1.0);
        camera.frame_plane(2.0);
        let view_proj = camera.view_proj();

        for corner in [
            Vec4::new(-1.0, -1.0, 0.0, 1.0),
            Vec4::new(1.0, 1.0, 0.0, 1.0),
        ] {
            let clip = view_proj * corner;
            let ndc = clip / clip.w;
            assert!(ndc.x.abs() <= 1.0, "corner escapes horizontally: {ndc}");
            assert!(ndc.y.abs() <= 1.0, "corner escapes vertically: {ndc}");
        }
    }
}
