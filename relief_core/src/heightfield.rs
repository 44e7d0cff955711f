use crate::photo::SourcePhoto;

/// Grayscale displacement source derived from a photo. Same pixel
/// dimensions as the photo, RGBA8 layout so it uploads as a texture
/// unchanged: every color channel holds the luminance, alpha is
/// carried over untouched.
#[derive(Debug, Clone)]
pub struct HeightField {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

/// Diagnostic summary of a height field, printed by the viewer at
/// build time and in headless runs.
#[derive(Debug, Clone, Copy)]
pub struct LumaStats {
    pub min: u8,
    pub max: u8,
    pub mean: f32,
    /// TL, TR, BL, BR quadrant means.
    pub quadrant_means: [f32; 4],
}

impl HeightField {
    /// Luminance proxy: 0.299 R + 0.587 G + 0.114 B per pixel. This
    /// is a brightness heuristic standing in for measured depth, not
    /// geometry. One-shot and deterministic per photo.
    pub fn synthesize(photo: &SourcePhoto) -> Self {
        let mut data = photo.rgba().to_vec();
        for pixel in data.chunks_exact_mut(4) {
            let luma = luminance(pixel[0], pixel[1], pixel[2]);
            pixel[0] = luma;
            pixel[1] = luma;
            pixel[2] = luma;
        }
        Self {
            data,
            width: photo.width(),
            height: photo.height(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.data
    }

    pub fn stats(&self) -> LumaStats {
        let mut min = u8::MAX;
        let mut max = u8::MIN;
        let mut sum = 0u64;
        let mut quadrant_sums = [0u64; 4];
        let mut quadrant_counts = [0u64; 4];

        for (idx, pixel) in self.data.chunks_exact(4).enumerate() {
            let luma = pixel[0];
            min = min.min(luma);
            max = max.max(luma);
            sum += luma as u64;

            let x = idx % self.width as usize;
            let y = idx / self.width as usize;
            let quadrant = (y >= self.height as usize / 2) as usize * 2
                + (x >= self.width as usize / 2) as usize;
            quadrant_sums[quadrant] += luma as u64;
            quadrant_counts[quadrant] += 1;
        }

        // Widened before multiplying; u32 * u32 overflows for giant
        // photos.
        let total = self.width as u64 * self.height as u64;
        let mut quadrant_means = [0.0f32; 4];
        for idx in 0..4 {
            if quadrant_counts[idx] > 0 {
                quadrant_means[idx] = quadrant_sums[idx] as f32 / quadrant_counts[idx] as f32;
            }
        }

        LumaStats {
            min,
            max,
            mean: sum as f32 / total as f32,
            quadrant_means,
        }
    }
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (r as f32 * 0.299 + g as f32 * 0.587 + b as f32 * 0.114).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo_from_pixels(pixels: &[u8], width: u32, height: u32) -> SourcePhoto {
        SourcePhoto::from_rgba(pixels.to_vec(), width, height).expect("valid photo")
    }

    #[test]
    fn dimensions_match_the_photo_exactly() {
        let photo = photo_from_pixels(&vec![0u8; 3 * 5 * 4], 3, 5);
        let field = HeightField::synthesize(&photo);
        assert_eq!(field.width(), 3);
        assert_eq!(field.height(), 5);
        assert_eq!(field.rgba().len(), photo.rgba().len());
    }

    #[test]
    fn replaces_channels_with_weighted_luminance() {
        let photo = photo_from_pixels(&[200, 100, 50, 0xAB], 1, 1);
        let field = HeightField::synthesize(&photo);

        let expected = (200.0 * 0.299 + 100.0 * 0.587 + 50.0 * 0.114f32).round() as u8;
        assert_eq!(field.rgba(), &[expected, expected, expected, 0xAB]);
    }

    #[test]
    fn pure_primaries_use_the_standard_weights() {
        let photo = photo_from_pixels(
            &[
                255, 0, 0, 255, // red
                0, 255, 0, 255, // green
                0, 0, 255, 255, // blue
            ],
            3,
            1,
        );
        let field = HeightField::synthesize(&photo);
        assert_eq!(field.rgba()[0], 76); // 0.299 * 255
        assert_eq!(field.rgba()[4], 150); // 0.587 * 255
        assert_eq!(field.rgba()[8], 29); // 0.114 * 255
    }

    #[test]
    fn stats_index_rows_correctly_for_odd_dimensions() {
        // 3x2: only the bottom-right pixel is bright. Row/column
        // indexing is derived from the flat pixel index, so a wrong
        // division puts the pixel in the wrong quadrant.
        let mut pixels = vec![0u8; 3 * 2 * 4];
        pixels[5 * 4] = 255;
        pixels[5 * 4 + 1] = 255;
        pixels[5 * 4 + 2] = 255;
        let photo = photo_from_pixels(&pixels, 3, 2);

        let stats = HeightField::synthesize(&photo).stats();
        assert_eq!(stats.quadrant_means, [0.0, 0.0, 0.0, 127.5]);
        assert!((stats.mean - 255.0 / 6.0).abs() < 0.01);
    }

    #[test]
    fn stats_cover_range_and_quadrants() {
        // 2x2: lumas 0, 255, 0, 255 column-wise.
        let photo = photo_from_pixels(
            &[
                0, 0, 0, 255, 255, 255, 255, 255, //
                0, 0, 0, 255, 255, 255, 255, 255,
            ],
            2,
            2,
        );
        let stats = HeightField::synthesize(&photo).stats();
        assert_eq!(stats.min, 0);
        assert_eq!(stats.max, 255);
        assert!((stats.mean - 127.5).abs() < 0.01);
        assert_eq!(stats.quadrant_means, [0.0, 255.0, 0.0, 255.0]);
    }
}
