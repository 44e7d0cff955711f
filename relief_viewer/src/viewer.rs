use std::{borrow::Cow, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable, cast_slice};
use glam::{Mat4, Vec3};
use log::info;
use thiserror::Error;
use wgpu::{SurfaceError, util::DeviceExt};
use winit::{dpi::PhysicalSize, window::Window};

use relief_core::{HeightField, OrbitController, SourcePhoto, SurfaceMesh, ViewerParameters};

use crate::camera::OrbitCamera;
use crate::texture::upload_rgba_texture;

/// The render surface or GPU context could not be created. Fatal for
/// this viewer instance; the host falls back, there is no retry.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("render context unavailable: {0}")]
    ResourceContext(String),
}

const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.005,
    g: 0.005,
    b: 0.005,
    a: 1.0,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// Key light direction and intensities matching the fixed two-light
// rig: one white fill, one directional key from (2, 2, 5).
const LIGHT_DIRECTION: [f32; 3] = [2.0, 2.0, 5.0];
const AMBIENT_INTENSITY: f32 = 0.7;
const DIRECTIONAL_INTENSITY: f32 = 1.0;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SurfaceVertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SurfaceUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    light_dir: [f32; 3],
    ambient: f32,
    displacement_scale: f32,
    light_intensity: f32,
    _padding: [f32; 2],
}

/// Everything derived from one photo, bundled so replacement and
/// teardown release it in a single scope. Dropping this frees the
/// geometry buffers, both textures, and the bind group together;
/// nothing GPU-side from a superseded photo can outlive it.
struct PhotoResources {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    _color_texture: wgpu::Texture,
    _height_texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

pub struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    depth_view: wgpu::TextureView,
    camera: OrbitCamera,
    orbit: OrbitController,
    params: ViewerParameters,
    photo: Option<PhotoResources>,
    cursor: (f32, f32),
    last_frame: Instant,
}

impl ViewerState {
    pub async fn new(
        window: Arc<Window>,
        photo: &SourcePhoto,
        params: ViewerParameters,
    ) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .map_err(|err| ViewerError::ResourceContext(err.to_string()))
            .context("creating wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .ok_or_else(|| ViewerError::ResourceContext("no compatible adapter".into()))
            .context("requesting wgpu adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("relief-viewer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|err| ViewerError::ResourceContext(err.to_string()))
            .context("requesting wgpu device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Mailbox)
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("surface-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Displacement texture is sampled from the vertex
                // stage, where it offsets positions along the normal.
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("surface-uniforms"),
            size: std::mem::size_of::<SurfaceUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("surface-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("surface-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHADER_SOURCE)),
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SurfaceVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("surface-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("surface-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[vertex_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // Double-sided: the back of the plane stays visible while
            // orbiting, the shader flips the normal for lighting.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        let depth_view = create_depth_view(&device, &config);

        let mut state = Self {
            camera: OrbitCamera::new(config.width as f32 / config.height as f32),
            window,
            surface,
            device,
            queue,
            config,
            size,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            sampler,
            depth_view,
            orbit: OrbitController::default(),
            params,
            photo: None,
            cursor: (0.0, 0.0),
            last_frame: Instant::now(),
        };

        state.surface.configure(&state.device, &state.config);
        state.install_photo(photo)?;

        Ok(state)
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn params(&self) -> &ViewerParameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ViewerParameters {
        &mut self.params
    }

    /// Atomic photo replacement: the previous geometry, material
    /// bindings and both textures are dropped before any replacement
    /// is created, and the interaction state restarts from rest.
    pub fn install_photo(&mut self, photo: &SourcePhoto) -> Result<()> {
        self.photo = None;

        let field = HeightField::synthesize(photo);
        let stats = field.stats();
        info!(
            "heightfield {}x{} luma mean {:.2} range {}..{}",
            field.width(),
            field.height(),
            stats.mean,
            stats.min,
            stats.max
        );

        let mesh = SurfaceMesh::build(photo.aspect_ratio());
        self.camera.frame_plane(mesh.plane_height());

        let vertices: Vec<SurfaceVertex> = mesh
            .positions()
            .iter()
            .zip(mesh.normals())
            .zip(mesh.uvs())
            .map(|((&position, &normal), &uv)| SurfaceVertex {
                position,
                normal,
                uv,
            })
            .collect();

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("surface-vertex-buffer"),
                contents: cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("surface-index-buffer"),
                contents: cast_slice(mesh.indices()),
                usage: wgpu::BufferUsages::INDEX,
            });

        let (color_texture, color_view) = upload_rgba_texture(
            &self.device,
            &self.queue,
            "photo-color-texture",
            photo.width(),
            photo.height(),
            photo.rgba(),
            wgpu::TextureFormat::Rgba8UnormSrgb,
        )?;
        let (height_texture, height_view) = upload_rgba_texture(
            &self.device,
            &self.queue,
            "photo-height-texture",
            field.width(),
            field.height(),
            field.rgba(),
            wgpu::TextureFormat::Rgba8Unorm,
        )?;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("surface-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&height_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        self.photo = Some(PhotoResources {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices().len() as u32,
            _color_texture: color_texture,
            _height_texture: height_texture,
            bind_group,
        });
        self.orbit.reset();
        self.last_frame = Instant::now();

        info!(
            "surface rebuilt: plane {:.3}x{:.3}, {} vertices, camera distance {:.3}",
            mesh.plane_width(),
            mesh.plane_height(),
            mesh.vertex_count(),
            self.camera.distance()
        );
        Ok(())
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.cursor = (x, y);
        self.orbit.pointer_moved(x, y);
    }

    pub fn pointer_pressed(&mut self) {
        self.orbit.pointer_pressed(self.cursor.0, self.cursor.1);
    }

    pub fn pointer_released(&mut self) {
        self.orbit.pointer_released();
    }

    pub fn pointer_entered(&mut self) {
        self.orbit.pointer_entered();
    }

    pub fn pointer_left(&mut self) {
        self.orbit.pointer_left();
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.camera.set_aspect(new_size.width, new_size.height);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    /// One frame: integrate interaction state by the measured delta,
    /// re-apply the live depth intensity (a uniform write, never a
    /// rebuild), and draw. With no surface built yet this still
    /// clears and presents a background frame.
    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.25);
        self.last_frame = now;
        self.orbit.advance(dt, &self.params);

        if self.photo.is_some() {
            let uniforms = self.build_uniforms();
            self.queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("relief-viewer-encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("relief-viewer-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(photo) = self.photo.as_ref() {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &photo.bind_group, &[]);
                rpass.set_vertex_buffer(0, photo.vertex_buffer.slice(..));
                rpass.set_index_buffer(photo.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..photo.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn build_uniforms(&self) -> SurfaceUniforms {
        let (pitch, yaw) = self.orbit.rotation();
        let model = Mat4::from_rotation_y(yaw) * Mat4::from_rotation_x(pitch);
        SurfaceUniforms {
            view_proj: self.camera.view_proj().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            light_dir: Vec3::from(LIGHT_DIRECTION).normalize().into(),
            ambient: AMBIENT_INTENSITY,
            displacement_scale: self.params.depth_intensity(),
            light_intensity: DIRECTIONAL_INTENSITY,
            _padding: [0.0; 2],
        }
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("relief-depth-buffer"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

const SHADER_SOURCE: &str = r#"
struct SurfaceUniforms {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    light_dir: vec3<f32>,
    ambient: f32,
    displacement_scale: f32,
    light_intensity: f32,
    _padding: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: SurfaceUniforms;
@group(0) @binding(1)
var color_texture: texture_2d<f32>;
@group(0) @binding(2)
var height_texture: texture_2d<f32>;
@group(0) @binding(3)
var surface_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    // Displace along the vertex normal by the sampled luminance; the
    // vertex buffer itself is never rewritten when the depth slider
    // moves.
    let height = textureSampleLevel(height_texture, surface_sampler, input.uv, 0.0).r;
    let displaced = input.position + input.normal * height * uniforms.displacement_scale;

    var out: VertexOutput;
    out.position = uniforms.view_proj * uniforms.model * vec4<f32>(displaced, 1.0);
    out.normal = (uniforms.model * vec4<f32>(input.normal, 0.0)).xyz;
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_main(input: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    var normal = normalize(input.normal);
    if (!front_facing) {
        normal = -normal;
    }
    let diffuse = max(dot(normal, uniforms.light_dir), 0.0) * uniforms.light_intensity;
    let lighting = uniforms.ambient + diffuse;
    let base = textureSample(color_texture, surface_sampler, input.uv);
    return vec4<f32>(base.rgb * lighting, base.a);
}
"#;

#[cfg(test)]
mod uniform_tests {
    use super::*;

    #[test]
    fn uniform_block_is_160_bytes_and_16_aligned() {
        // Must match the WGSL struct layout exactly.
        assert_eq!(std::mem::size_of::<SurfaceUniforms>(), 160);
        assert_eq!(std::mem::size_of::<SurfaceUniforms>() % 16, 0);
    }

    #[test]
    fn vertex_stride_matches_the_attribute_layout() {
        assert_eq!(std::mem::size_of::<SurfaceVertex>(), 32);
    }
}
