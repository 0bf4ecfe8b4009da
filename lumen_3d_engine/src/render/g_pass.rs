/// Geometry pass - writes normal, position and albedo into the G-buffer
///
/// Loads the depth produced by the depth pre-pass and tests against it with
/// `GREATER_OR_EQUAL`, so only the front-most surface is shaded. All three
/// color targets end in `SHADER_READ_ONLY` for the compose pass.

use std::mem::size_of;
use std::sync::Arc;
use crate::config::Config;
use crate::error::Result;
use crate::graphics_device::{
    Access, Attachment, AttachmentDesc, AttachmentOps, AttachmentUsage, BlendMode, ClearValue,
    CommandList, CompareOp, CullMode, DependencyDirection, DepthState, DescriptorBinding,
    DescriptorSetLayout, DescriptorType, GraphicsDevice, GraphicsPipelineDesc, ImageLayout, LoadOp,
    Pipeline, PipelineStage, PushConstantRange, RenderPassDesc, SampleCount, ShaderStage, StoreOp,
    SubpassDependency, TextureFormat,
};
use crate::render::{
    draw_model, flipped_viewport, full_scissor, load_shader, FrameBufferBundle, FrameScene,
    ModelPush, PassFrameBuffer, Shading, Vertex,
};

/// G-buffer targets in framebuffer order
const TARGETS: [TextureFormat; 3] = [
    GPass::NORMAL_FORMAT,
    GPass::POSITION_FORMAT,
    GPass::ALBEDO_FORMAT,
];

pub struct GPass {
    bundle: FrameBufferBundle,
    pipeline: Arc<dyn Pipeline>,
    material_layout: Arc<dyn DescriptorSetLayout>,
}

impl GPass {
    pub const NORMAL_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;
    pub const POSITION_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;
    pub const ALBEDO_FORMAT: TextureFormat = TextureFormat::R8G8B8A8_UNORM;

    pub fn new(
        device: &dyn GraphicsDevice,
        config: &Config,
        width: u32,
        height: u32,
        image_count: usize,
        depth: &Arc<dyn Attachment>,
    ) -> Result<Self> {
        let color_attachments = TARGETS
            .iter()
            .map(|&format| AttachmentOps {
                format,
                samples: SampleCount::S1,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::ShaderReadOnly,
            })
            .collect();

        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments,
            depth_attachment: Some(AttachmentOps {
                format: depth.format(),
                samples: SampleCount::S1,
                load_op: LoadOp::Load,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::DepthStencilAttachment,
                final_layout: ImageLayout::DepthStencilAttachment,
            }),
            dependencies: vec![
                // Depth pre-pass writes, and last frame's compose reads of the targets
                SubpassDependency {
                    direction: DependencyDirection::Incoming,
                    src_stage: PipelineStage::LATE_FRAGMENT_TESTS | PipelineStage::FRAGMENT_SHADER,
                    dst_stage: PipelineStage::EARLY_FRAGMENT_TESTS | PipelineStage::COLOR_ATTACHMENT_OUTPUT,
                    src_access: Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    dst_access: Access::DEPTH_STENCIL_ATTACHMENT_READ
                        | Access::DEPTH_STENCIL_ATTACHMENT_WRITE
                        | Access::COLOR_ATTACHMENT_WRITE,
                },
                SubpassDependency {
                    direction: DependencyDirection::Outgoing,
                    src_stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT | PipelineStage::LATE_FRAGMENT_TESTS,
                    dst_stage: PipelineStage::FRAGMENT_SHADER | PipelineStage::EARLY_FRAGMENT_TESTS,
                    src_access: Access::COLOR_ATTACHMENT_WRITE | Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    dst_access: Access::SHADER_READ | Access::DEPTH_STENCIL_ATTACHMENT_READ,
                },
            ],
        })?;

        let material_layout = device.create_descriptor_set_layout(&[DescriptorBinding {
            binding: 0,
            descriptor_type: DescriptorType::CombinedImageSampler,
            stages: vec![ShaderStage::Fragment],
        }])?;

        let vertex_shader = load_shader(device, &config.shader_dir, "gpass.vert.spv", ShaderStage::Vertex)?;
        let fragment_shader = load_shader(device, &config.shader_dir, "gpass.frag.spv", ShaderStage::Fragment)?;
        let pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            vertex_shader,
            fragment_shader: Some(fragment_shader),
            vertex_layout: Some(Vertex::layout()),
            cull_mode: CullMode::Back,
            depth: DepthState { test: true, write: true, compare: CompareOp::GreaterOrEqual },
            color_targets: vec![BlendMode::Opaque; TARGETS.len()],
            descriptor_set_layouts: vec![Arc::clone(&material_layout)],
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
            pipeline,
            material_layout,
        };
        pass.recreate_framebuffer(device, width, height, image_count, depth)?;
        Ok(pass)
    }

    /// Rebuild the G-buffer targets and framebuffers around the shared depth
    pub fn recreate_framebuffer(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
        image_count: usize,
        depth: &Arc<dyn Attachment>,
    ) -> Result<()> {
        self.bundle.destroy();

        let mut owned = Vec::with_capacity(TARGETS.len());
        for format in TARGETS {
            owned.push(device.create_attachment(&AttachmentDesc {
                format,
                usage: AttachmentUsage::COLOR,
                samples: SampleCount::S1,
                width,
                height,
            })?);
        }

        let mut attachments = owned.clone();
        attachments.push(Arc::clone(depth));
        let per_image = vec![attachments; image_count];
        self.bundle.build(device, width, height, owned, per_image)
    }

    pub fn normal(&self) -> &Arc<dyn Attachment> {
        self.target(0)
    }

    pub fn position(&self) -> &Arc<dyn Attachment> {
        self.target(1)
    }

    pub fn albedo(&self) -> &Arc<dyn Attachment> {
        self.target(2)
    }

    fn target(&self, index: usize) -> &Arc<dyn Attachment> {
        assert!(!self.bundle.is_empty(), "G-pass used after destroy");
        self.bundle.attachment(index)
    }

    /// Layout material sets must be allocated from (binding 0: albedo sampler)
    pub fn material_set_layout(&self) -> &Arc<dyn DescriptorSetLayout> {
        &self.material_layout
    }

    pub fn bundle(&self) -> &FrameBufferBundle {
        &self.bundle
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn begin_pass(&self, cmd: &mut dyn CommandList, image_index: u32) -> Result<()> {
        let mut clear_values = vec![ClearValue::Color([0.0; 4]); TARGETS.len()];
        clear_values.push(ClearValue::DepthStencil { depth: 0.0, stencil: 0 });

        cmd.begin_render_pass(self.bundle.render_pass(), self.bundle.framebuffer(image_index), &clear_values)?;
        cmd.set_viewport(flipped_viewport(self.bundle.width(), self.bundle.height()))?;
        cmd.set_scissor(full_scissor(self.bundle.width(), self.bundle.height()))?;
        cmd.bind_pipeline(&self.pipeline)
    }

    /// Draw deferred-shaded models that carry a material
    pub fn draw_models(&self, cmd: &mut dyn CommandList, scene: &FrameScene) -> Result<()> {
        for model in scene.models.iter().filter(|m| m.shading == Shading::Deferred) {
            let Some(material) = &model.material else {
                continue;
            };
            cmd.bind_descriptor_sets(&self.pipeline, 0, &[material])?;
            draw_model(cmd, &self.pipeline, &scene.camera, model)?;
        }
        Ok(())
    }

    pub fn end_pass(&self, cmd: &mut dyn CommandList) -> Result<()> {
        cmd.end_render_pass()
    }

    pub fn record(&self, cmd: &mut dyn CommandList, image_index: u32, scene: &FrameScene) -> Result<()> {
        self.begin_pass(cmd, image_index)?;
        self.draw_models(cmd, scene)?;
        self.end_pass(cmd)
    }
}

impl PassFrameBuffer for GPass {
    fn destroy(&mut self) {
        self.bundle.destroy();
    }

    fn is_destroyed(&self) -> bool {
        self.bundle.is_empty()
    }
}

#[cfg(test)]
#[path = "g_pass_tests.rs"]
mod tests;
