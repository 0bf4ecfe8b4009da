/// Forward pass - lit, alpha-blended geometry drawn over the compose result
///
/// Renders into the compose `color` target (loaded, not cleared) and tests
/// against the shared depth without writing it. Models are drawn back to
/// front.

use std::mem::size_of;
use std::sync::Arc;
use crate::config::{Config, LightFalloff};
use crate::error::Result;
use crate::graphics_device::{
    Access, Attachment, AttachmentOps, BlendMode, CommandList, CompareOp, CullMode,
    DependencyDirection, DepthState, DescriptorBinding, DescriptorResource, DescriptorSet,
    DescriptorSetLayout, DescriptorType, DescriptorWrite, GraphicsDevice, GraphicsPipelineDesc,
    ImageLayout, LoadOp, Pipeline, PipelineStage, PushConstantRange, RenderPassDesc, SampleCount,
    ShaderStage, StoreOp, SubpassDependency,
};
use crate::render::{
    draw_model, fit_descriptor_sets, flipped_viewport, full_scissor, load_shader, ComposePass,
    FrameBufferBundle, FrameScene, GPass, LightBuffers, ModelPush, PassFrameBuffer, RenderModel,
    Shading, Vertex,
};

pub struct ForwardPass {
    bundle: FrameBufferBundle,
    light_layout: Arc<dyn DescriptorSetLayout>,
    light_sets: Vec<Arc<dyn DescriptorSet>>,
    pipeline: Arc<dyn Pipeline>,
    lights: LightBuffers,
    falloff: LightFalloff,
}

impl ForwardPass {
    pub fn new(
        device: &dyn GraphicsDevice,
        config: &Config,
        width: u32,
        height: u32,
        image_count: usize,
        g_pass: &GPass,
        compose: &ComposePass,
        depth: &Arc<dyn Attachment>,
    ) -> Result<Self> {
        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments: vec![AttachmentOps {
                format: compose.color().format(),
                samples: SampleCount::S1,
                load_op: LoadOp::Load,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::ShaderReadOnly,
                final_layout: ImageLayout::ShaderReadOnly,
            }],
            depth_attachment: Some(AttachmentOps {
                format: depth.format(),
                samples: SampleCount::S1,
                load_op: LoadOp::Load,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::DepthStencilAttachment,
                final_layout: ImageLayout::DepthStencilAttachment,
            }),
            dependencies: vec![
                SubpassDependency {
                    direction: DependencyDirection::Incoming,
                    src_stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT | PipelineStage::LATE_FRAGMENT_TESTS,
                    dst_stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT | PipelineStage::EARLY_FRAGMENT_TESTS,
                    src_access: Access::COLOR_ATTACHMENT_WRITE | Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    dst_access: Access::COLOR_ATTACHMENT_READ
                        | Access::COLOR_ATTACHMENT_WRITE
                        | Access::DEPTH_STENCIL_ATTACHMENT_READ,
                },
                SubpassDependency {
                    direction: DependencyDirection::Outgoing,
                    src_stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT,
                    dst_stage: PipelineStage::FRAGMENT_SHADER,
                    src_access: Access::COLOR_ATTACHMENT_WRITE,
                    dst_access: Access::SHADER_READ,
                },
            ],
        })?;

        let light_layout = device.create_descriptor_set_layout(&[DescriptorBinding {
            binding: 0,
            descriptor_type: DescriptorType::UniformBuffer,
            stages: vec![ShaderStage::Vertex, ShaderStage::Fragment],
        }])?;

        let pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            vertex_shader: load_shader(device, &config.shader_dir, "forward.vert.spv", ShaderStage::Vertex)?,
            fragment_shader: Some(load_shader(device, &config.shader_dir, "forward.frag.spv", ShaderStage::Fragment)?),
            vertex_layout: Some(Vertex::layout()),
            cull_mode: CullMode::None,
            depth: DepthState { test: true, write: false, compare: CompareOp::GreaterOrEqual },
            color_targets: vec![BlendMode::Alpha],
            descriptor_set_layouts: vec![Arc::clone(&light_layout), Arc::clone(g_pass.material_set_layout())],
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
            light_layout,
            light_sets: Vec::new(),
            pipeline,
            lights: LightBuffers::new(device, image_count)?,
            falloff: config.falloff,
        };
        pass.recreate_framebuffer(device, width, height, image_count, compose, depth)?;
        Ok(pass)
    }

    /// Rebuild framebuffers around the compose color and shared depth
    pub fn recreate_framebuffer(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
        image_count: usize,
        compose: &ComposePass,
        depth: &Arc<dyn Attachment>,
    ) -> Result<()> {
        self.bundle.destroy();

        let per_image = vec![vec![Arc::clone(compose.color()), Arc::clone(depth)]; image_count];
        self.bundle.build(device, width, height, Vec::new(), per_image)?;

        self.lights.resize(device, image_count)?;
        fit_descriptor_sets(device, &self.light_layout, &mut self.light_sets, image_count)?;
        for (image_index, set) in self.light_sets.iter().enumerate() {
            device.update_descriptor_set(set, &[DescriptorWrite {
                binding: 0,
                resource: DescriptorResource::UniformBuffer(Arc::clone(self.lights.buffer(image_index as u32))),
            }])?;
        }
        Ok(())
    }

    pub fn bundle(&self) -> &FrameBufferBundle {
        &self.bundle
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn light_set(&self, image_index: u32) -> &Arc<dyn DescriptorSet> {
        &self.light_sets[image_index as usize]
    }

    pub fn light_buffers(&self) -> &LightBuffers {
        &self.lights
    }

    pub fn begin_pass(&self, cmd: &mut dyn CommandList, image_index: u32) -> Result<()> {
        cmd.begin_render_pass(self.bundle.render_pass(), self.bundle.framebuffer(image_index), &[])?;
        cmd.set_viewport(flipped_viewport(self.bundle.width(), self.bundle.height()))?;
        cmd.set_scissor(full_scissor(self.bundle.width(), self.bundle.height()))?;
        cmd.bind_pipeline(&self.pipeline)?;
        cmd.bind_descriptor_sets(&self.pipeline, 0, &[self.light_set(image_index)])
    }

    /// Transparent models with a material, farthest first
    pub fn draw_models(&self, cmd: &mut dyn CommandList, scene: &FrameScene) -> Result<()> {
        let mut models: Vec<(&RenderModel, &Arc<dyn DescriptorSet>)> = scene
            .models
            .iter()
            .filter(|m| m.shading == Shading::Transparent)
            .filter_map(|m| m.material.as_ref().map(|material| (m, material)))
            .collect();

        let eye = scene.camera.position;
        models.sort_by(|(a, _), (b, _)| {
            let da = a.transform.w_axis.truncate().distance_squared(eye);
            let db = b.transform.w_axis.truncate().distance_squared(eye);
            db.total_cmp(&da)
        });

        for (model, material) in models {
            cmd.bind_descriptor_sets(&self.pipeline, 1, &[material])?;
            draw_model(cmd, &self.pipeline, &scene.camera, model)?;
        }
        Ok(())
    }

    pub fn end_pass(&self, cmd: &mut dyn CommandList) -> Result<()> {
        cmd.end_render_pass()
    }

    pub fn record(&self, cmd: &mut dyn CommandList, image_index: u32, scene: &FrameScene) -> Result<()> {
        self.lights.write(image_index, scene.lights, self.falloff)?;
        self.begin_pass(cmd, image_index)?;
        self.draw_models(cmd, scene)?;
        self.end_pass(cmd)
    }
}

impl PassFrameBuffer for ForwardPass {
    fn destroy(&mut self) {
        self.bundle.destroy();
    }

    fn is_destroyed(&self) -> bool {
        self.bundle.is_empty()
    }
}

#[cfg(test)]
#[path = "forward_pass_tests.rs"]
mod tests;
