use std::f32::consts::PI;

/// Strength of the procedural smile-arc curvature. Fixed: the live
/// depth slider scales the displacement map at render time instead,
/// never this pass.
pub const CURVE_INTENSITY: f32 = 0.15;

/// Depth offset for a vertex at plane coordinates (x, y). A cosine
/// arc across the width, faded toward the top and bottom edges by a
/// Gaussian so the curvature reads as mouth-region bowing rather
/// than a cylinder.
pub fn curvature_offset(x: f32, y: f32, plane_width: f32, plane_height: f32) -> f32 {
    let horizontal_curve = (x / plane_width * PI).cos();
    let vertical_falloff = (-(y / (plane_height * 0.3)).powi(2)).exp();
    horizontal_curve * vertical_falloff * CURVE_INTENSITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_is_symmetric_in_x() {
        for x in [0.1f32, 0.37, 0.8, 1.0] {
            let positive = curvature_offset(x, 0.2, 2.0, 2.0);
            let negative = curvature_offset(-x, 0.2, 2.0, 2.0);
            assert!((positive - negative).abs() < 1e-7);
        }
    }

    #[test]
    fn falloff_peaks_on_the_horizontal_centerline() {
        let center = curvature_offset(0.5, 0.0, 2.0, 2.0);
        let above = curvature_offset(0.5, 0.4, 2.0, 2.0);
        let below = curvature_offset(0.5, -0.4, 2.0, 2.0);
        assert!(center > above);
        assert!(center > below);

        // At y = 0 the Gaussian term is exactly 1, so the offset is
        // the bare cosine arc times the intensity.
        let expected = (0.5 / 2.0 * PI).cos() * CURVE_INTENSITY;
        assert!((center - expected).abs() < 1e-7);
    }

    #[test]
    fn arc_is_strongest_at_plane_center() {
        let center = curvature_offset(0.0, 0.0, 2.0, 2.0);
        assert!((center - CURVE_INTENSITY).abs() < 1e-7);
        let edge = curvature_offset(1.0, 0.0, 2.0, 2.0);
        assert!(edge < center);
    }
}
