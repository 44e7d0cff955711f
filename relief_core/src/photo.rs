use crate::error::ReliefError;

/// A decoded photograph, immutable once constructed. The viewer owns
/// exactly one of these at a time; replacing it tears down every
/// derived resource first.
#[derive(Debug, Clone)]
pub struct SourcePhoto {
    rgba: Vec<u8>,
    width: u32,
    height: u32,
}

impl SourcePhoto {
    /// Decode an encoded image byte stream (PNG, JPEG, ...) into an
    /// RGBA8 pixel buffer. Undecodable bytes abort the whole build
    /// attempt; no partial mesh may be shown downstream.
    pub fn decode(bytes: &[u8]) -> Result<Self, ReliefError> {
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        Self::from_rgba(decoded.into_raw(), width, height)
    }

    /// Wrap an already-decoded RGBA8 buffer. Used by tests and by
    /// callers that synthesize pixels directly.
    pub fn from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Result<Self, ReliefError> {
        if width == 0 || height == 0 {
            return Err(ReliefError::EmptyImage { width, height });
        }
        debug_assert_eq!(rgba.len(), width as usize * height as usize * 4);
        Ok(Self {
            rgba,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Natural width over height; drives the plane dimensions so the
    /// surface never stretches the photo.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_png_byte_stream() {
        // 2x1 PNG: one red pixel, one blue pixel.
        let mut bytes = Vec::new();
        {
            use image::ImageEncoder;
            let encoder = image::codecs::png::PngEncoder::new(&mut bytes);
            encoder
                .write_image(
                    &[0xFF, 0, 0, 0xFF, 0, 0, 0xFF, 0xFF],
                    2,
                    1,
                    image::ColorType::Rgba8,
                )
                .expect("encode test png");
        }

        let photo = SourcePhoto::decode(&bytes).expect("decode succeeds");
        assert_eq!(photo.width(), 2);
        assert_eq!(photo.height(), 1);
        assert_eq!(photo.aspect_ratio(), 2.0);
        assert_eq!(photo.rgba(), &[0xFF, 0, 0, 0xFF, 0, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = SourcePhoto::decode(b"not an image").unwrap_err();
        assert!(matches!(err, ReliefError::Decode(_)));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let err = SourcePhoto::from_rgba(Vec::new(), 0, 4).unwrap_err();
        assert!(matches!(
            err,
            ReliefError::EmptyImage {
                width: 0,
                height: 4
            }
        ));
    }
}
