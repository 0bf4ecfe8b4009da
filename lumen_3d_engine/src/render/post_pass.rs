/// Post pass - composites compose color and blurred bloom onto the swapchain image
///
/// The only pass whose framebuffers reference swapchain images. Two
/// full-screen triangles are blended additively; the overlay hook records
/// into the open render pass before it ends.

use std::sync::Arc;
use crate::config::Config;
use crate::error::Result;
use crate::graphics_device::{
    Access, Attachment, AttachmentOps, BlendMode, ClearValue, CommandList, CullMode,
    DependencyDirection, DepthState, DescriptorBinding, DescriptorResource, DescriptorSet,
    DescriptorSetLayout, DescriptorType, DescriptorWrite, GraphicsDevice, GraphicsPipelineDesc,
    ImageLayout, LoadOp, Pipeline, PipelineStage, RenderPass, RenderPassDesc, SampleCount,
    SamplerKind, ShaderStage, StoreOp, SubpassDependency, TextureFormat,
};
use crate::render::{
    fit_descriptor_sets, flipped_viewport, full_scissor, load_shader, ComposePass,
    FrameBufferBundle, OverlayHook, PassFrameBuffer,
};

const POST_CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

pub struct PostPass {
    bundle: FrameBufferBundle,
    set_layout: Arc<dyn DescriptorSetLayout>,
    base_sets: Vec<Arc<dyn DescriptorSet>>,
    bloom_sets: Vec<Arc<dyn DescriptorSet>>,
    pipeline: Arc<dyn Pipeline>,
}

impl PostPass {
    pub fn new(
        device: &dyn GraphicsDevice,
        config: &Config,
        width: u32,
        height: u32,
        swapchain_format: TextureFormat,
        swapchain_images: &[Arc<dyn Attachment>],
        compose: &ComposePass,
    ) -> Result<Self> {
        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments: vec![AttachmentOps {
                format: swapchain_format,
                samples: SampleCount::S1,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::PresentSrc,
            }],
            depth_attachment: None,
            dependencies: vec![
                // Image-available wait happens at color output
                SubpassDependency {
                    direction: DependencyDirection::Incoming,
                    src_stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT | PipelineStage::COMPUTE_SHADER,
                    dst_stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT | PipelineStage::FRAGMENT_SHADER,
                    src_access: Access::SHADER_WRITE,
                    dst_access: Access::COLOR_ATTACHMENT_WRITE | Access::SHADER_READ,
                },
                SubpassDependency {
                    direction: DependencyDirection::Outgoing,
                    src_stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT,
                    dst_stage: PipelineStage::BOTTOM_OF_PIPE,
                    src_access: Access::COLOR_ATTACHMENT_WRITE,
                    dst_access: Access::MEMORY_READ,
                },
            ],
        })?;

        let set_layout = device.create_descriptor_set_layout(&[DescriptorBinding {
            binding: 0,
            descriptor_type: DescriptorType::CombinedImageSampler,
            stages: vec![ShaderStage::Fragment],
        }])?;

        let pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            vertex_shader: load_shader(device, &config.shader_dir, "post.vert.spv", ShaderStage::Vertex)?,
            fragment_shader: Some(load_shader(device, &config.shader_dir, "post.frag.spv", ShaderStage::Fragment)?),
            vertex_layout: None,
            cull_mode: CullMode::None,
            depth: DepthState::DISABLED,
            color_targets: vec![BlendMode::Additive],
            descriptor_set_layouts: vec![Arc::clone(&set_layout)],
            push_constants: Vec::new(),
            render_pass: Arc::clone(&render_pass),
            samples: SampleCount::S1,
        })?;

        let mut pass = Self {
            bundle: FrameBufferBundle::new(render_pass),
            set_layout,
            base_sets: Vec::new(),
            bloom_sets: Vec::new(),
            pipeline,
        };
        pass.recreate_framebuffer(device, width, height, swapchain_images, compose)?;
        Ok(pass)
    }

    /// One framebuffer per swapchain image; sets point at the new compose targets
    pub fn recreate_framebuffer(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
        swapchain_images: &[Arc<dyn Attachment>],
        compose: &ComposePass,
    ) -> Result<()> {
        self.bundle.destroy();

        let image_count = swapchain_images.len();
        let per_image = swapchain_images.iter().map(|image| vec![Arc::clone(image)]).collect();
        self.bundle.build(device, width, height, Vec::new(), per_image)?;

        fit_descriptor_sets(device, &self.set_layout, &mut self.base_sets, image_count)?;
        fit_descriptor_sets(device, &self.set_layout, &mut self.bloom_sets, image_count)?;
        for (sets, source) in [(&self.base_sets, compose.color()), (&self.bloom_sets, compose.bloom())] {
            for set in sets {
                device.update_descriptor_set(set, &[DescriptorWrite {
                    binding: 0,
                    resource: DescriptorResource::SampledImage(Arc::clone(source), SamplerKind::LinearClamp),
                }])?;
            }
        }
        Ok(())
    }

    /// Render pass the overlay must be created against
    pub fn render_pass(&self) -> &Arc<dyn RenderPass> {
        self.bundle.render_pass()
    }

    pub fn image_count(&self) -> usize {
        self.bundle.framebuffer_count()
    }

    pub fn bundle(&self) -> &FrameBufferBundle {
        &self.bundle
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn base_set(&self, image_index: u32) -> &Arc<dyn DescriptorSet> {
        &self.base_sets[image_index as usize]
    }

    pub fn bloom_set(&self, image_index: u32) -> &Arc<dyn DescriptorSet> {
        &self.bloom_sets[image_index as usize]
    }

    pub fn begin_pass(&self, cmd: &mut dyn CommandList, image_index: u32) -> Result<()> {
        cmd.begin_render_pass(
            self.bundle.render_pass(),
            self.bundle.framebuffer(image_index),
            &[ClearValue::Color(POST_CLEAR)],
        )?;
        cmd.set_viewport(flipped_viewport(self.bundle.width(), self.bundle.height()))?;
        cmd.set_scissor(full_scissor(self.bundle.width(), self.bundle.height()))?;
        cmd.bind_pipeline(&self.pipeline)
    }

    /// Compose color, then bloom on top
    pub fn draw_composite(&self, cmd: &mut dyn CommandList, image_index: u32) -> Result<()> {
        for set in [self.base_set(image_index), self.bloom_set(image_index)] {
            cmd.bind_descriptor_sets(&self.pipeline, 0, &[set])?;
            cmd.draw(3, 0)?;
        }
        Ok(())
    }

    pub fn end_pass(&self, cmd: &mut dyn CommandList) -> Result<()> {
        cmd.end_render_pass()
    }

    pub fn record(
        &self,
        cmd: &mut dyn CommandList,
        image_index: u32,
        overlay: Option<&mut dyn OverlayHook>,
    ) -> Result<()> {
        self.begin_pass(cmd, image_index)?;
        self.draw_composite(cmd, image_index)?;
        if let Some(overlay) = overlay {
            overlay.record(cmd, image_index)?;
        }
        self.end_pass(cmd)
    }
}

impl PassFrameBuffer for PostPass {
    fn destroy(&mut self) {
        self.bundle.destroy();
    }

    fn is_destroyed(&self) -> bool {
        self.bundle.is_empty()
    }
}

#[cfg(test)]
#[path = "post_pass_tests.rs"]
mod tests;
