/// Compose (lighting) pass
///
/// Reads the G-buffer and accumulates every point light additively into the
/// HDR `color` target, mirroring bright output into `bloom`. Also draws the
/// sky where no geometry was written and unlit models on top.
///
/// `bloom` is left in `GENERAL` for the compute blur; `color` ends in
/// `SHADER_READ_ONLY` for the forward and post passes.

use std::mem::size_of;
use std::sync::Arc;
use glam::{Mat4, Vec2, Vec3};
use crate::config::{Config, LightFalloff};
use crate::error::Result;
use crate::graphics_device::{
    Access, Attachment, AttachmentDesc, AttachmentOps, AttachmentUsage, BlendMode, ClearValue,
    CommandList, CompareOp, CullMode, DependencyDirection, DepthState, DescriptorBinding,
    DescriptorResource, DescriptorSet, DescriptorSetLayout, DescriptorType, DescriptorWrite,
    GraphicsDevice, GraphicsPipelineDesc, ImageLayout, LoadOp, Pipeline, PipelineStage,
    PushConstantRange, RenderPassDesc, SampleCount, SamplerKind, ShaderStage, StoreOp,
    SubpassDependency, TextureFormat,
};
use crate::render::{
    draw_mesh, draw_model, fit_descriptor_sets, flipped_viewport, full_scissor, load_shader,
    ComposePush, FrameBufferBundle, FrameScene, GPass, LightBuffers, Mesh, ModelPush,
    PassFrameBuffer, Shading, SkyPush, Vertex,
};

/// Light volume scale when the falloff never reaches the cutoff
const FALLBACK_LIGHT_RADIUS: f32 = 1000.0;

/// Slack around a light volume for the camera's near plane
const NEAR_PLANE_MARGIN: f32 = 0.5;

const COMPOSE_STAGES: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

pub struct ComposePass {
    bundle: FrameBufferBundle,
    set_layout: Arc<dyn DescriptorSetLayout>,
    sets: Vec<Arc<dyn DescriptorSet>>,
    light_pipeline: Arc<dyn Pipeline>,
    light_fullscreen_pipeline: Arc<dyn Pipeline>,
    sky_pipeline: Arc<dyn Pipeline>,
    unlit_pipeline: Arc<dyn Pipeline>,
    light_volume: Mesh,
    lights: LightBuffers,
    clear_color: [f32; 4],
    falloff: LightFalloff,
}

impl ComposePass {
    pub const COLOR_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;
    pub const BLOOM_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;

    pub fn new(
        device: &dyn GraphicsDevice,
        config: &Config,
        width: u32,
        height: u32,
        image_count: usize,
        g_pass: &GPass,
        depth: &Arc<dyn Attachment>,
    ) -> Result<Self> {
        let color_target = |format, final_layout| AttachmentOps {
            format,
            samples: SampleCount::S1,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout,
        };

        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments: vec![
                color_target(Self::COLOR_FORMAT, ImageLayout::ShaderReadOnly),
                color_target(Self::BLOOM_FORMAT, ImageLayout::General),
            ],
            depth_attachment: Some(AttachmentOps {
                format: depth.format(),
                samples: SampleCount::S1,
                load_op: LoadOp::Load,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::DepthStencilAttachment,
                final_layout: ImageLayout::DepthStencilAttachment,
            }),
            dependencies: vec![
                // G-buffer writes, and last frame's bloom/post reads of our targets
                SubpassDependency {
                    direction: DependencyDirection::Incoming,
                    src_stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT
                        | PipelineStage::LATE_FRAGMENT_TESTS
                        | PipelineStage::FRAGMENT_SHADER
                        | PipelineStage::COMPUTE_SHADER,
                    dst_stage: PipelineStage::FRAGMENT_SHADER
                        | PipelineStage::EARLY_FRAGMENT_TESTS
                        | PipelineStage::COLOR_ATTACHMENT_OUTPUT,
                    src_access: Access::COLOR_ATTACHMENT_WRITE | Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    dst_access: Access::SHADER_READ
                        | Access::DEPTH_STENCIL_ATTACHMENT_READ
                        | Access::DEPTH_STENCIL_ATTACHMENT_WRITE
                        | Access::COLOR_ATTACHMENT_WRITE,
                },
                SubpassDependency {
                    direction: DependencyDirection::Outgoing,
                    src_stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT | PipelineStage::LATE_FRAGMENT_TESTS,
                    dst_stage: PipelineStage::FRAGMENT_SHADER
                        | PipelineStage::COMPUTE_SHADER
                        | PipelineStage::COLOR_ATTACHMENT_OUTPUT,
                    src_access: Access::COLOR_ATTACHMENT_WRITE | Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    dst_access: Access::SHADER_READ
                        | Access::COLOR_ATTACHMENT_READ
                        | Access::COLOR_ATTACHMENT_WRITE,
                },
            ],
        })?;

        let sampled = |binding| DescriptorBinding {
            binding,
            descriptor_type: DescriptorType::CombinedImageSampler,
            stages: vec![ShaderStage::Fragment],
        };
        let set_layout = device.create_descriptor_set_layout(&[
            sampled(0),
            sampled(1),
            sampled(2),
            DescriptorBinding {
                binding: 3,
                descriptor_type: DescriptorType::UniformBuffer,
                stages: COMPOSE_STAGES.to_vec(),
            },
        ])?;

        let dir = &config.shader_dir;
        let light_pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            vertex_shader: load_shader(device, dir, "lighting.vert.spv", ShaderStage::Vertex)?,
            fragment_shader: Some(load_shader(device, dir, "lighting.frag.spv", ShaderStage::Fragment)?),
            vertex_layout: Some(Vertex::layout()),
            cull_mode: CullMode::Back,
            depth: DepthState { test: true, write: false, compare: CompareOp::GreaterOrEqual },
            color_targets: vec![BlendMode::Additive; 2],
            descriptor_set_layouts: vec![Arc::clone(&set_layout)],
            push_constants: vec![PushConstantRange {
                stages: COMPOSE_STAGES.to_vec(),
                offset: 0,
                size: size_of::<ComposePush>() as u32,
            }],
            render_pass: Arc::clone(&render_pass),
            samples: SampleCount::S1,
        })?;

        // Lights whose volume contains the eye. Full-screen triangle at depth 0;
        // `Less` passes wherever geometry was written and rejects the sky.
        let light_fullscreen_pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            vertex_shader: load_shader(device, dir, "lighting_fullscreen.vert.spv", ShaderStage::Vertex)?,
            fragment_shader: Some(load_shader(device, dir, "lighting.frag.spv", ShaderStage::Fragment)?),
            vertex_layout: None,
            cull_mode: CullMode::None,
            depth: DepthState { test: true, write: false, compare: CompareOp::Less },
            color_targets: vec![BlendMode::Additive; 2],
            descriptor_set_layouts: vec![Arc::clone(&set_layout)],
            push_constants: vec![PushConstantRange {
                stages: COMPOSE_STAGES.to_vec(),
                offset: 0,
                size: size_of::<ComposePush>() as u32,
            }],
            render_pass: Arc::clone(&render_pass),
            samples: SampleCount::S1,
        })?;

        // Full-screen triangle generated from gl_VertexIndex at depth 0
        let sky_pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            vertex_shader: load_shader(device, dir, "sky.vert.spv", ShaderStage::Vertex)?,
            fragment_shader: Some(load_shader(device, dir, "sky.frag.spv", ShaderStage::Fragment)?),
            vertex_layout: None,
            cull_mode: CullMode::None,
            depth: DepthState { test: true, write: false, compare: CompareOp::GreaterOrEqual },
            color_targets: vec![BlendMode::Opaque; 2],
            descriptor_set_layouts: Vec::new(),
            push_constants: vec![PushConstantRange {
                stages: COMPOSE_STAGES.to_vec(),
                offset: 0,
                size: size_of::<SkyPush>() as u32,
            }],
            render_pass: Arc::clone(&render_pass),
            samples: SampleCount::S1,
        })?;

        let unlit_pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            vertex_shader: load_shader(device, dir, "unlit.vert.spv", ShaderStage::Vertex)?,
            fragment_shader: Some(load_shader(device, dir, "unlit.frag.spv", ShaderStage::Fragment)?),
            vertex_layout: Some(Vertex::layout()),
            cull_mode: CullMode::Back,
            depth: DepthState { test: true, write: true, compare: CompareOp::GreaterOrEqual },
            color_targets: vec![BlendMode::Opaque; 2],
            descriptor_set_layouts: vec![Arc::clone(g_pass.material_set_layout())],
            push_constants: vec![PushConstantRange {
                stages: vec![ShaderStage::Vertex],
                offset: 0,
                size: size_of::<ModelPush>() as u32,
            }],
            render_pass: Arc::clone(&render_pass),
            samples: SampleCount::S1,
        })?;

        let mut pass = Self {
            bundle: FrameBufferBundle::new(render_pass),
            set_layout,
            sets: Vec::new(),
            light_pipeline,
            light_fullscreen_pipeline,
            sky_pipeline,
            unlit_pipeline,
            light_volume: Mesh::unit_cube(device)?,
            lights: LightBuffers::new(device, image_count)?,
            clear_color: config.clear_color,
            falloff: config.falloff,
        };
        pass.recreate_framebuffer(device, width, height, image_count, g_pass, depth)?;
        Ok(pass)
    }

    /// Rebuild `color` and `bloom`, then point every set at the new G-buffer
    pub fn recreate_framebuffer(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
        image_count: usize,
        g_pass: &GPass,
        depth: &Arc<dyn Attachment>,
    ) -> Result<()> {
        self.bundle.destroy();

        let color = device.create_attachment(&AttachmentDesc {
            format: Self::COLOR_FORMAT,
            usage: AttachmentUsage::COLOR,
            samples: SampleCount::S1,
            width,
            height,
        })?;
        let bloom = device.create_attachment(&AttachmentDesc {
            format: Self::BLOOM_FORMAT,
            usage: AttachmentUsage::COLOR | AttachmentUsage::STORAGE,
            samples: SampleCount::S1,
            width,
            height,
        })?;

        let per_image = vec![vec![Arc::clone(&color), Arc::clone(&bloom), Arc::clone(depth)]; image_count];
        self.bundle.build(device, width, height, vec![color, bloom], per_image)?;

        self.lights.resize(device, image_count)?;
        fit_descriptor_sets(device, &self.set_layout, &mut self.sets, image_count)?;
        for (image_index, set) in self.sets.iter().enumerate() {
            device.update_descriptor_set(set, &[
                DescriptorWrite {
                    binding: 0,
                    resource: DescriptorResource::SampledImage(Arc::clone(g_pass.position()), SamplerKind::NearestClamp),
                },
                DescriptorWrite {
                    binding: 1,
                    resource: DescriptorResource::SampledImage(Arc::clone(g_pass.normal()), SamplerKind::NearestClamp),
                },
                DescriptorWrite {
                    binding: 2,
                    resource: DescriptorResource::SampledImage(Arc::clone(g_pass.albedo()), SamplerKind::NearestClamp),
                },
                DescriptorWrite {
                    binding: 3,
                    resource: DescriptorResource::UniformBuffer(Arc::clone(self.lights.buffer(image_index as u32))),
                },
            ])?;
        }
        Ok(())
    }

    /// HDR lit color
    pub fn color(&self) -> &Arc<dyn Attachment> {
        assert!(!self.bundle.is_empty(), "compose pass used after destroy");
        self.bundle.attachment(0)
    }

    /// Bright-pass target blurred by the bloom pass
    pub fn bloom(&self) -> &Arc<dyn Attachment> {
        assert!(!self.bundle.is_empty(), "compose pass used after destroy");
        self.bundle.attachment(1)
    }

    pub fn bundle(&self) -> &FrameBufferBundle {
        &self.bundle
    }

    pub fn descriptor_set(&self, image_index: u32) -> &Arc<dyn DescriptorSet> {
        &self.sets[image_index as usize]
    }

    pub fn light_buffers(&self) -> &LightBuffers {
        &self.lights
    }

    pub fn light_pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.light_pipeline
    }

    pub fn light_fullscreen_pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.light_fullscreen_pipeline
    }

    pub fn sky_pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.sky_pipeline
    }

    pub fn unlit_pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.unlit_pipeline
    }

    pub fn begin_pass(&self, cmd: &mut dyn CommandList, image_index: u32) -> Result<()> {
        cmd.begin_render_pass(
            self.bundle.render_pass(),
            self.bundle.framebuffer(image_index),
            &[
                ClearValue::Color(self.clear_color),
                ClearValue::Color([0.0; 4]),
                ClearValue::DepthStencil { depth: 0.0, stencil: 0 },
            ],
        )?;
        cmd.set_viewport(flipped_viewport(self.bundle.width(), self.bundle.height()))?;
        cmd.set_scissor(full_scissor(self.bundle.width(), self.bundle.height()))
    }

    /// One additive draw per light
    ///
    /// Lights seen from outside draw the front faces of their volume cube.
    /// When the eye sits inside the volume those faces all face away, so the
    /// light is drawn as a full-screen triangle instead. Lights too dim to
    /// reach the cutoff are skipped.
    pub fn draw_lights(&self, cmd: &mut dyn CommandList, image_index: u32, scene: &FrameScene) -> Result<()> {
        let screen_size = Vec2::new(self.bundle.width() as f32, self.bundle.height() as f32);
        let mut bound: Option<&Arc<dyn Pipeline>> = None;

        for (light_index, light) in scene.lights.iter().enumerate() {
            let radius = self
                .falloff
                .cutoff_radius(light.color.max_element())
                .unwrap_or(FALLBACK_LIGHT_RADIUS);
            if radius <= 0.0 {
                continue;
            }

            let inside = camera_inside_volume(scene.camera.position, light.position, radius);
            let pipeline = if inside { &self.light_fullscreen_pipeline } else { &self.light_pipeline };
            if !bound.is_some_and(|current| Arc::ptr_eq(current, pipeline)) {
                cmd.bind_pipeline(pipeline)?;
                cmd.bind_descriptor_sets(pipeline, 0, &[self.descriptor_set(image_index)])?;
                bound = Some(pipeline);
            }

            let volume = Mat4::from_translation(light.position) * Mat4::from_scale(Vec3::splat(radius));
            let push = ComposePush {
                mvp: scene.camera.view_proj * volume,
                camera_position: scene.camera.position.extend(1.0),
                screen_size,
                light_index: light_index as u32,
                _pad: 0,
            };
            cmd.push_constants(pipeline, &COMPOSE_STAGES, 0, bytemuck::bytes_of(&push))?;
            if inside {
                cmd.draw(3, 0)?;
            } else {
                draw_mesh(cmd, &self.light_volume)?;
            }
        }
        Ok(())
    }

    /// Background wherever depth is still at its cleared value
    pub fn draw_sky(&self, cmd: &mut dyn CommandList, scene: &FrameScene) -> Result<()> {
        if !scene.sky {
            return Ok(());
        }

        let push = SkyPush {
            inv_view_proj: scene.camera.view_proj.inverse(),
            camera_position: scene.camera.position.extend(1.0),
        };
        cmd.bind_pipeline(&self.sky_pipeline)?;
        cmd.push_constants(&self.sky_pipeline, &COMPOSE_STAGES, 0, bytemuck::bytes_of(&push))?;
        cmd.draw(3, 0)
    }

    pub fn draw_unlit(&self, cmd: &mut dyn CommandList, scene: &FrameScene) -> Result<()> {
        let mut bound = false;
        for model in scene.models.iter().filter(|m| m.shading == Shading::Unlit) {
            let Some(material) = &model.material else {
                continue;
            };
            if !bound {
                cmd.bind_pipeline(&self.unlit_pipeline)?;
                bound = true;
            }
            cmd.bind_descriptor_sets(&self.unlit_pipeline, 0, &[material])?;
            draw_model(cmd, &self.unlit_pipeline, &scene.camera, model)?;
        }
        Ok(())
    }

    pub fn end_pass(&self, cmd: &mut dyn CommandList) -> Result<()> {
        cmd.end_render_pass()
    }

    /// Upload this image's lights and record the whole pass
    ///
    /// # Panics
    ///
    /// More than `MAX_LIGHTS` lights in `scene`.
    pub fn record(&self, cmd: &mut dyn CommandList, image_index: u32, scene: &FrameScene) -> Result<()> {
        self.lights.write(image_index, scene.lights, self.falloff)?;
        self.begin_pass(cmd, image_index)?;
        self.draw_lights(cmd, image_index, scene)?;
        self.draw_sky(cmd, scene)?;
        self.draw_unlit(cmd, scene)?;
        self.end_pass(cmd)
    }
}

/// Whether the eye (or its near plane) is within the light's volume cube
pub(crate) fn camera_inside_volume(camera: Vec3, center: Vec3, radius: f32) -> bool {
    (camera - center).abs().max_element() <= radius + NEAR_PLANE_MARGIN
}

impl PassFrameBuffer for ComposePass {
    fn destroy(&mut self) {
        self.bundle.destroy();
    }

    fn is_destroyed(&self) -> bool {
        self.bundle.is_empty()
    }
}

#[cfg(test)]
#[path = "compose_pass_tests.rs"]
mod tests;
