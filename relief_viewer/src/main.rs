mod camera;
mod cli;
mod texture;
mod viewer;

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, mpsc},
    thread,
};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use log::{info, warn};
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, Event, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use relief_core::{
    DEPTH_INTENSITY_MAX, HeightField, LumaStats, SourcePhoto, SurfaceMesh, ViewerParameters,
    initial_camera_distance,
};

use crate::cli::Args;
use crate::texture::dump_heightfield_png;
use crate::viewer::ViewerState;

/// Completion of an off-thread photo decode. The generation stamp
/// lets the event loop discard results for photos that were already
/// superseded by a newer drop.
struct DecodedPhoto {
    generation: u64,
    path: PathBuf,
    result: Result<SourcePhoto>,
}

fn spawn_decode(path: PathBuf, generation: u64, tx: mpsc::Sender<DecodedPhoto>) {
    thread::Builder::new()
        .name("relief_decode".to_string())
        .spawn(move || {
            let result = fs::read(&path)
                .with_context(|| format!("reading {}", path.display()))
                .and_then(|bytes| {
                    SourcePhoto::decode(&bytes)
                        .with_context(|| format!("decoding {}", path.display()))
                });
            let _ = tx.send(DecodedPhoto {
                generation,
                path,
                result,
            });
        })
        .expect("spawn decode thread");
}

fn luma_report(stats: &LumaStats) -> [String; 2] {
    [
        format!(
            "  luminance avg {:.2}, min {}, max {}",
            stats.mean, stats.min, stats.max
        ),
        format!(
            "  quadrant luma means (TL, TR, BL, BR): {:.2}, {:.2}, {:.2}, {:.2}",
            stats.quadrant_means[0],
            stats.quadrant_means[1],
            stats.quadrant_means[2],
            stats.quadrant_means[3]
        ),
    ]
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    ensure!(
        (0.0..=DEPTH_INTENSITY_MAX).contains(&args.depth_intensity),
        "depth-intensity must be between 0 and {} (got {})",
        DEPTH_INTENSITY_MAX,
        args.depth_intensity
    );

    let bytes = fs::read(&args.photo)
        .with_context(|| format!("reading {}", args.photo.display()))?;
    let photo = SourcePhoto::decode(&bytes)
        .with_context(|| format!("decoding {}", args.photo.display()))?;
    println!(
        "Loaded {} ({} bytes, {}x{})",
        args.photo.display(),
        bytes.len(),
        photo.width(),
        photo.height()
    );

    // The heightmap stage runs whenever its output is observable:
    // always in headless mode, and for --dump-heightmap exports.
    if args.headless || args.dump_heightmap.is_some() {
        let field = HeightField::synthesize(&photo);
        if let Some(output_path) = args.dump_heightmap.as_ref() {
            dump_heightfield_png(&field, output_path)
                .with_context(|| format!("writing PNG to {}", output_path.display()))?;
            println!(
                "Heightmap exported to {} ({}x{})",
                output_path.display(),
                field.width(),
                field.height()
            );
        }
        println!("Heightfield {}x{}", field.width(), field.height());
        for line in luma_report(&field.stats()) {
            println!("{line}");
        }
    }

    if args.headless {
        let mesh = SurfaceMesh::build(photo.aspect_ratio());
        println!(
            "Surface mesh: plane 2.000x{:.3}, {} vertices, {} triangles, camera distance {:.3}",
            mesh.plane_height(),
            mesh.vertex_count(),
            mesh.indices().len() / 3,
            initial_camera_distance(mesh.plane_height())
        );
        println!("Headless mode requested; viewer window bootstrap skipped.");
        return Ok(());
    }

    let mut params = ViewerParameters::default();
    params.set_depth_intensity(args.depth_intensity);
    params.auto_rotate = !args.no_auto_rotate;

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(format!("Relief Viewer - {}", args.photo.display()))
            .with_inner_size(PhysicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut state = ViewerState::new(window, &photo, params).block_on()?;
    drop(photo);

    let (decode_tx, decode_rx) = mpsc::channel::<DecodedPhoto>();
    let mut decode_generation: u64 = 0;

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Space),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => {
                            let params = state.params_mut();
                            params.auto_rotate = !params.auto_rotate;
                            info!("auto-rotate {}", state.params().auto_rotate);
                        }
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::ArrowUp),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => {
                            state.params_mut().nudge_depth_intensity(0.05);
                            info!("depth intensity {:.2}", state.params().depth_intensity());
                        }
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::ArrowDown),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => {
                            state.params_mut().nudge_depth_intensity(-0.05);
                            info!("depth intensity {:.2}", state.params().depth_intensity());
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            state.pointer_moved(position.x as f32, position.y as f32);
                        }
                        WindowEvent::MouseInput {
                            state: ElementState::Pressed,
                            button: MouseButton::Left,
                            ..
                        } => state.pointer_pressed(),
                        WindowEvent::MouseInput {
                            state: ElementState::Released,
                            button: MouseButton::Left,
                            ..
                        } => state.pointer_released(),
                        WindowEvent::CursorEntered { .. } => state.pointer_entered(),
                        WindowEvent::CursorLeft { .. } => state.pointer_left(),
                        WindowEvent::DroppedFile(path) => {
                            decode_generation += 1;
                            println!("Decoding dropped photo {}", path.display());
                            spawn_decode(path, decode_generation, decode_tx.clone());
                        }
                        WindowEvent::Resized(new_size) => state.resize(new_size),
                        WindowEvent::RedrawRequested => match state.render() {
                            Ok(_) => {}
                            Err(SurfaceError::Lost) => state.resize(state.size()),
                            Err(SurfaceError::OutOfMemory) => target.exit(),
                            Err(err) => eprintln!("[relief_viewer] render error: {err:?}"),
                        },
                        _ => {}
                    }
                }
                // Button release is watched at device level so a drag
                // that leaves the window still ends when the button
                // comes up outside it.
                Event::DeviceEvent {
                    event:
                        DeviceEvent::Button {
                            state: ElementState::Released,
                            ..
                        },
                    ..
                } => state.pointer_released(),
                Event::AboutToWait => {
                    while let Ok(decoded) = decode_rx.try_recv() {
                        if decoded.generation != decode_generation {
                            info!("discarding stale decode of {}", decoded.path.display());
                            continue;
                        }
                        match decoded.result {
                            Ok(photo) => {
                                println!(
                                    "Replaced photo with {} ({}x{})",
                                    decoded.path.display(),
                                    photo.width(),
                                    photo.height()
                                );
                                if let Err(err) = state.install_photo(&photo) {
                                    warn!("rebuilding surface: {err:?}");
                                }
                            }
                            // Keep the current surface; a failed
                            // decode never shows a partial mesh.
                            Err(err) => warn!("photo replacement failed: {err:?}"),
                        }
                    }
                    state.window().request_redraw();
                }
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(())
}

#[cfg(test)]
mod report_tests {
    use super::*;

    #[test]
    fn headless_summary_reports_the_synthesized_heightfield() {
        // 2x2 photo, lumas 0 and 255 column-wise.
        let photo = SourcePhoto::from_rgba(
            vec![
                0, 0, 0, 255, 255, 255, 255, 255, //
                0, 0, 0, 255, 255, 255, 255, 255,
            ],
            2,
            2,
        )
        .expect("photo");
        let field = HeightField::synthesize(&photo);

        let lines = luma_report(&field.stats());
        assert_eq!(lines[0], "  luminance avg 127.50, min 0, max 255");
        assert_eq!(
            lines[1],
            "  quadrant luma means (TL, TR, BL, BR): 0.00, 255.00, 0.00, 255.00"
        );
    }
}
