use std::{borrow::Cow, fs, path::Path};

use anyhow::{Context, Result, anyhow, ensure};
use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use relief_core::HeightField;

/// RGBA pixel rows staged for a wgpu copy. Rows are padded out to
/// `COPY_BYTES_PER_ROW_ALIGNMENT` when the source pitch does not
/// already satisfy it; tightly packed sources borrow instead.
pub struct TextureUpload<'a> {
    data: Cow<'a, [u8]>,
    bytes_per_row: u32,
}

impl<'a> TextureUpload<'a> {
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }
}

pub fn prepare_rgba_upload<'a>(width: u32, height: u32, data: &'a [u8]) -> Result<TextureUpload<'a>> {
    ensure!(width > 0 && height > 0, "texture has no dimensions");
    let row_bytes = 4usize * width as usize;
    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    ensure!(
        data.len() >= row_bytes * height as usize,
        "texture buffer ({}) smaller than {}x{} RGBA ({})",
        data.len(),
        width,
        height,
        row_bytes * height as usize
    );

    if row_bytes % alignment == 0 && data.len() == row_bytes * height as usize {
        return Ok(TextureUpload {
            data: Cow::Borrowed(data),
            bytes_per_row: row_bytes as u32,
        });
    }

    let padded_row_bytes = row_bytes.div_ceil(alignment) * alignment;
    let mut buffer = vec![0u8; padded_row_bytes * height as usize];
    for row in 0..height as usize {
        let src_offset = row * row_bytes;
        let dst_offset = row * padded_row_bytes;
        buffer[dst_offset..dst_offset + row_bytes]
            .copy_from_slice(&data[src_offset..src_offset + row_bytes]);
    }

    Ok(TextureUpload {
        data: Cow::Owned(buffer),
        bytes_per_row: padded_row_bytes as u32,
    })
}

/// Create a 2D texture and upload one RGBA8 mip. The color plate uses
/// an sRGB format; the displacement source stays linear so sampled
/// heights match the synthesized luminance values.
pub fn upload_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
    format: wgpu::TextureFormat,
) -> Result<(wgpu::Texture, wgpu::TextureView)> {
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let upload = prepare_rgba_upload(width, height, pixels)
        .with_context(|| format!("staging {label} pixels"))?;
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        upload.pixels(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(upload.bytes_per_row()),
            rows_per_image: Some(height),
        },
        extent,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok((texture, view))
}

/// Write the synthesized heightmap to disk for inspection.
pub fn dump_heightfield_png(field: &HeightField, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = fs::File::create(destination)
        .with_context(|| format!("creating {}", destination.display()))?;
    PngEncoder::new(file)
        .write_image(field.rgba(), field.width(), field.height(), ColorType::Rgba8)
        .map_err(|err| anyhow!("encoding heightmap PNG: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_core::SourcePhoto;
    use tempfile::tempdir;

    #[test]
    fn aligned_rows_borrow_the_source_buffer() {
        // 64 pixels * 4 bytes = 256, already a multiple of the copy
        // alignment.
        let data = vec![0xAAu8; 64 * 2 * 4];
        let upload = prepare_rgba_upload(64, 2, &data).expect("upload");
        assert_eq!(upload.bytes_per_row(), 256);
        assert_eq!(upload.pixels().len(), data.len());
    }

    #[test]
    fn narrow_rows_pad_to_copy_alignment() {
        let data = vec![0x55u8; 100 * 3 * 4];
        let upload = prepare_rgba_upload(100, 3, &data).expect("upload");
        // 400-byte rows round up to 512.
        assert_eq!(upload.bytes_per_row(), 512);
        assert_eq!(upload.pixels().len(), 512 * 3);
        assert_eq!(&upload.pixels()[..400], &data[..400]);
        assert_eq!(&upload.pixels()[400..512], &[0u8; 112]);
        assert_eq!(&upload.pixels()[512..912], &data[400..800]);
    }

    #[test]
    fn undersized_buffers_are_rejected() {
        let data = vec![0u8; 10];
        assert!(prepare_rgba_upload(100, 100, &data).is_err());
        assert!(prepare_rgba_upload(0, 100, &data).is_err());
    }

    #[test]
    fn heightfield_dump_round_trips_through_png() {
        let photo = SourcePhoto::from_rgba(vec![200, 100, 50, 255], 1, 1).expect("photo");
        let field = HeightField::synthesize(&photo);

        let temp = tempdir().expect("temp dir");
        let destination = temp.path().join("dumps/height.png");
        dump_heightfield_png(&field, &destination).expect("dump png");

        let reloaded = image::open(&destination).expect("reload png").to_rgba8();
        assert_eq!(reloaded.dimensions(), (1, 1));
        assert_eq!(reloaded.into_raw(), field.rgba());
    }
}
