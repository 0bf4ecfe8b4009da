//! Lumen3D demo - a ring of lit cubes rendered through the deferred pass chain
//!
//! Expects compiled SPIR-V in `./shaders` (see `Config::shader_dir`).

use std::process;
use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Quat, Vec3};
use lumen_3d_engine::lumen3d::{Config, DebugSeverity, Engine, Error, FrameStatus, GraphicsDevice, RenderSystem};
use lumen_3d_engine::lumen3d::device::{DescriptorResource, DescriptorWrite, SamplerKind, TextureFormat};
use lumen_3d_engine::lumen3d::log::{DefaultLogger, LogSeverity};
use lumen_3d_engine::lumen3d::render::{CameraData, FrameScene, LightComponent, Mesh, RenderModel, Shading};
use lumen_3d_engine::{engine_error, engine_info};
use lumen_3d_engine_renderer_vulkan::{print_validation_stats_report, VulkanGraphicsDevice};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

const LOG_SOURCE: &str = "lumen3d::demo";
const CUBE_COUNT: usize = 8;
const RING_RADIUS: f32 = 4.0;

/// Everything that exists once the window is up
///
/// Field order is drop order: scene resources, then the renderer, then the
/// window the surface was created from.
struct Running {
    models: Vec<RenderModel>,
    lights: Vec<LightComponent>,
    render_system: RenderSystem,
    window: Arc<Window>,
    start_time: Instant,
}

struct DemoApp {
    config: Config,
    running: Option<Running>,
}

/// Log a fatal error and leave with a non-zero status
fn fatal(context: &str, error: Error) -> ! {
    engine_error!(LOG_SOURCE, "{}: {}", context, error);
    process::exit(1);
}

/// 2x2 checker albedo in sRGB
fn checker_texture(device: &dyn GraphicsDevice) -> lumen_3d_engine::lumen3d::Result<Arc<dyn lumen_3d_engine::lumen3d::device::Attachment>> {
    let light = [230u8, 225, 210, 255];
    let dark = [90u8, 110, 140, 255];
    let pixels: Vec<u8> = [light, dark, dark, light].concat();
    device.create_texture(TextureFormat::R8G8B8A8_SRGB, 2, 2, &pixels)
}

fn build_scene(render_system: &RenderSystem) -> lumen_3d_engine::lumen3d::Result<(Vec<RenderModel>, Vec<LightComponent>)> {
    let device = render_system.device();
    let cube = Arc::new(Mesh::unit_cube(device.as_ref())?);

    let albedo = checker_texture(device.as_ref())?;
    let material = device
        .allocate_descriptor_sets(render_system.material_set_layout(), 1)?
        .remove(0);
    device.update_descriptor_set(&material, &[DescriptorWrite {
        binding: 0,
        resource: DescriptorResource::SampledImage(albedo, SamplerKind::LinearRepeat),
    }])?;

    let mut models: Vec<RenderModel> = (0..CUBE_COUNT)
        .map(|i| {
            let angle = i as f32 / CUBE_COUNT as f32 * std::f32::consts::TAU;
            // Every fourth cube is see-through and goes through the forward pass
            let shading = if i % 4 == 3 { Shading::Transparent } else { Shading::Deferred };
            RenderModel {
                mesh: Arc::clone(&cube),
                material: Some(Arc::clone(&material)),
                transform: Mat4::from_translation(Vec3::new(angle.cos() * RING_RADIUS, 0.0, angle.sin() * RING_RADIUS)),
                scale: Vec3::splat(0.6),
                shading,
            }
        })
        .collect();

    // Ground slab and an emissive marker in the middle
    models.push(RenderModel {
        mesh: Arc::clone(&cube),
        material: Some(Arc::clone(&material)),
        transform: Mat4::from_translation(Vec3::new(0.0, -1.2, 0.0)),
        scale: Vec3::new(8.0, 0.2, 8.0),
        shading: Shading::Deferred,
    });
    models.push(RenderModel {
        mesh: cube,
        material: Some(material),
        transform: Mat4::IDENTITY,
        scale: Vec3::splat(0.25),
        shading: Shading::Unlit,
    });

    let lights = vec![
        LightComponent { position: Vec3::new(0.0, 2.0, 0.0), color: Vec3::new(6.0, 5.5, 5.0) },
        LightComponent { position: Vec3::new(3.0, 1.0, 3.0), color: Vec3::new(4.0, 1.0, 0.5) },
        LightComponent { position: Vec3::new(-3.0, 1.0, -3.0), color: Vec3::new(0.5, 1.5, 4.0) },
    ];

    Ok((models, lights))
}

/// Orbiting camera with a reversed-Z projection
fn camera(time: f32, width: u32, height: u32) -> CameraData {
    let eye = Vec3::new((time * 0.3).cos() * 9.0, 3.5, (time * 0.3).sin() * 9.0);
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    let aspect = width as f32 / height.max(1) as f32;
    let projection = Mat4::perspective_rh(60f32.to_radians(), aspect, 100.0, 0.1);
    CameraData {
        view_proj: projection * view,
        position: eye,
    }
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, config: &Config) -> Self {
        let window_attrs = Window::default_attributes()
            .with_title("Lumen3D Demo")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                engine_error!(LOG_SOURCE, "Failed to create window: {}", e);
                process::exit(1);
            }
        };

        let device = VulkanGraphicsDevice::new(window.as_ref(), config)
            .unwrap_or_else(|e| fatal("Vulkan initialization failed", e));
        let size = window.inner_size();
        let render_system = RenderSystem::new(Arc::new(device), config, size.width, size.height)
            .unwrap_or_else(|e| fatal("Render system initialization failed", e));
        let (models, lights) = build_scene(&render_system)
            .unwrap_or_else(|e| fatal("Scene setup failed", e));

        engine_info!(LOG_SOURCE, "{} models, {} lights", models.len(), lights.len());

        Self {
            models,
            lights,
            render_system,
            window,
            start_time: Instant::now(),
        }
    }

    fn redraw(&mut self) {
        let time = self.start_time.elapsed().as_secs_f32();
        let spin = Quat::from_rotation_y(time);
        let spinning: Vec<RenderModel> = self
            .models
            .iter()
            .enumerate()
            .map(|(i, model)| {
                let mut model = model.clone();
                if i < CUBE_COUNT {
                    model.transform *= Mat4::from_quat(spin);
                }
                model
            })
            .collect();

        let scene = FrameScene {
            camera: camera(time, self.render_system.width(), self.render_system.height()),
            models: &spinning,
            lights: &self.lights,
            sky: true,
        };

        match self.render_system.render_frame(&scene, None) {
            Ok(FrameStatus::Rendered | FrameStatus::Recreated | FrameStatus::Skipped) => {}
            Err(e) => fatal("Frame failed", e),
        }
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_none() {
            self.running = Some(Running::new(event_loop, &self.config));
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                if let Err(e) = running.render_system.shutdown() {
                    fatal("Shutdown failed", e);
                }
                self.running = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.render_system.set_resized(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                running.redraw();
                running.window.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() {
    Engine::set_logger(DefaultLogger::new(LogSeverity::Info));

    let config = Config {
        app_name: "Lumen3D Demo".to_string(),
        debug_severity: DebugSeverity::ErrorsAndWarnings,
        enable_validation_stats: true,
        ..Config::default()
    };
    let report = config.enable_validation;

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            engine_error!(LOG_SOURCE, "Failed to create event loop: {}", e);
            process::exit(1);
        }
    };

    let mut app = DemoApp { config, running: None };
    if let Err(e) = event_loop.run_app(&mut app) {
        engine_error!(LOG_SOURCE, "Event loop error: {}", e);
        process::exit(1);
    }

    if report {
        print_validation_stats_report();
    }
}
