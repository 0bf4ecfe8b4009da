/// Depth pre-pass
///
/// Owns the single depth attachment every later raster pass loads. Depth is
/// reversed-Z: cleared to 0, nearer fragments win with `GREATER`.

use std::mem::size_of;
use std::sync::Arc;
use crate::config::Config;
use crate::error::Result;
use crate::graphics_device::{
    Access, Attachment, AttachmentDesc, AttachmentOps, AttachmentUsage, ClearValue, CommandList,
    CompareOp, CullMode, DependencyDirection, DepthState, GraphicsDevice, GraphicsPipelineDesc,
    ImageLayout, LoadOp, Pipeline, PipelineStage, PushConstantRange, RenderPassDesc, SampleCount,
    ShaderStage, StoreOp, SubpassDependency, TextureFormat,
};
use crate::render::{
    draw_model, flipped_viewport, full_scissor, load_shader, FrameBufferBundle, FrameScene,
    ModelPush, PassFrameBuffer, Shading, Vertex,
};

pub struct DepthPass {
    bundle: FrameBufferBundle,
    pipeline: Arc<dyn Pipeline>,
}

impl DepthPass {
    pub const DEPTH_FORMAT: TextureFormat = TextureFormat::D32_FLOAT;

    pub fn new(
        device: &dyn GraphicsDevice,
        config: &Config,
        width: u32,
        height: u32,
        image_count: usize,
    ) -> Result<Self> {
        let fragment_tests = PipelineStage::EARLY_FRAGMENT_TESTS | PipelineStage::LATE_FRAGMENT_TESTS;
        let depth_rw = Access::DEPTH_STENCIL_ATTACHMENT_READ | Access::DEPTH_STENCIL_ATTACHMENT_WRITE;

        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments: Vec::new(),
            depth_attachment: Some(AttachmentOps {
                format: Self::DEPTH_FORMAT,
                samples: SampleCount::S1,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::DepthStencilAttachment,
            }),
            dependencies: vec![
                // Previous frame's depth readers finish before the clear
                SubpassDependency {
                    direction: DependencyDirection::Incoming,
                    src_stage: fragment_tests,
                    dst_stage: fragment_tests,
                    src_access: Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    dst_access: depth_rw,
                },
                SubpassDependency {
                    direction: DependencyDirection::Outgoing,
                    src_stage: PipelineStage::LATE_FRAGMENT_TESTS,
                    dst_stage: fragment_tests,
                    src_access: Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    dst_access: depth_rw,
                },
            ],
        })?;

        let vertex_shader = load_shader(device, &config.shader_dir, "depth.vert.spv", ShaderStage::Vertex)?;
        let pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            vertex_shader,
            fragment_shader: None,
            vertex_layout: Some(Vertex::layout()),
            cull_mode: CullMode::Back,
            depth: DepthState { test: true, write: true, compare: CompareOp::Greater },
            color_targets: Vec::new(),
            descriptor_set_layouts: Vec::new(),
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
        };
        pass.recreate_framebuffer(device, width, height, image_count)?;
        Ok(pass)
    }

    /// Rebuild the depth attachment and framebuffers at a new extent
    pub fn recreate_framebuffer(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
        image_count: usize,
    ) -> Result<()> {
        self.bundle.destroy();

        let depth = device.create_attachment(&AttachmentDesc {
            format: Self::DEPTH_FORMAT,
            usage: AttachmentUsage::DEPTH_STENCIL,
            samples: SampleCount::S1,
            width,
            height,
        })?;
        let per_image = vec![vec![Arc::clone(&depth)]; image_count];
        self.bundle.build(device, width, height, vec![depth], per_image)
    }

    /// Shared depth attachment
    pub fn depth_attachment(&self) -> &Arc<dyn Attachment> {
        assert!(!self.bundle.is_empty(), "depth pass used after destroy");
        self.bundle.attachment(0)
    }

    pub fn bundle(&self) -> &FrameBufferBundle {
        &self.bundle
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn begin_pass(&self, cmd: &mut dyn CommandList, image_index: u32) -> Result<()> {
        let framebuffer = self.bundle.framebuffer(image_index);
        cmd.begin_render_pass(
            self.bundle.render_pass(),
            framebuffer,
            &[ClearValue::DepthStencil { depth: 0.0, stencil: 0 }],
        )?;
        cmd.set_viewport(flipped_viewport(self.bundle.width(), self.bundle.height()))?;
        cmd.set_scissor(full_scissor(self.bundle.width(), self.bundle.height()))?;
        cmd.bind_pipeline(&self.pipeline)
    }

    /// Lay down depth for every opaque model the shading passes will draw
    ///
    /// Models without a material are skipped by the G-pass and the unlit
    /// draw, so they get no depth either.
    pub fn draw_models(&self, cmd: &mut dyn CommandList, scene: &FrameScene) -> Result<()> {
        let opaque = scene
            .models
            .iter()
            .filter(|m| m.shading != Shading::Transparent && m.material.is_some());
        for model in opaque {
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

impl PassFrameBuffer for DepthPass {
    fn destroy(&mut self) {
        self.bundle.destroy();
    }

    fn is_destroyed(&self) -> bool {
        self.bundle.is_empty()
    }
}

#[cfg(test)]
#[path = "depth_pass_tests.rs"]
mod tests;
