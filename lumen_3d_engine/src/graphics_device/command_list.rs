/// CommandList trait - for recording rendering and compute commands

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    RenderPass, Framebuffer, Pipeline, Buffer, Attachment, DescriptorSet,
    IndexType, ShaderStage, ImageLayout, PipelineStage, Access, transition_masks,
};

/// Command list for recording rendering commands
///
/// Commands are recorded and later submitted to the GPU via
/// `GraphicsDevice::submit_with_swapchain()`.
pub trait CommandList: Send + Sync {
    /// Begin recording commands (resets previous content)
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Drop everything recorded so far, even mid render pass
    ///
    /// Leaves the list ready for the next `begin`. Used when recording
    /// fails part way through a frame.
    fn reset(&mut self) -> Result<()>;

    /// Begin a render pass
    ///
    /// # Arguments
    ///
    /// * `render_pass` - The render pass to begin
    /// * `framebuffer` - The framebuffer containing the pass attachments
    /// * `clear_values` - One clear value per attachment, in framebuffer order
    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set the dynamic viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the dynamic scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics or compute pipeline
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind consecutive descriptor sets starting at `first_set`
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout the sets are bound against
    /// * `first_set` - Set index of the first element of `sets`
    /// * `sets` - Descriptor sets to bind
    fn bind_descriptor_sets(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        first_set: u32,
        sets: &[&Arc<dyn DescriptorSet>],
    ) -> Result<()>;

    /// Push constants to the pipeline
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout declares the range
    /// * `stages` - Shader stages that will access the push constants
    /// * `offset` - Offset in bytes into push constant range
    /// * `data` - Data to push
    fn push_constants(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        stages: &[ShaderStage],
        offset: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    /// Draw vertices
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Draw indexed vertices
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    /// Dispatch compute workgroups
    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()>;

    /// Record a single image memory barrier (outside render passes)
    fn image_barrier(&mut self, barrier: &ImageBarrier) -> Result<()>;
}

/// Image memory barrier over the whole attachment
#[derive(Clone)]
pub struct ImageBarrier {
    pub attachment: Arc<dyn Attachment>,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_stage: PipelineStage,
    pub dst_stage: PipelineStage,
    pub src_access: Access,
    pub dst_access: Access,
}

impl ImageBarrier {
    /// Layout transition with masks from the transition table
    pub fn transition(
        attachment: &Arc<dyn Attachment>,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) -> Result<Self> {
        let masks = transition_masks(old_layout, new_layout)?;
        Ok(Self {
            attachment: Arc::clone(attachment),
            old_layout,
            new_layout,
            src_stage: masks.src_stage,
            dst_stage: masks.dst_stage,
            src_access: masks.src_access,
            dst_access: masks.dst_access,
        })
    }

    /// Memory dependency on an image that stays in GENERAL
    pub fn general(
        attachment: &Arc<dyn Attachment>,
        src_stage: PipelineStage,
        src_access: Access,
        dst_stage: PipelineStage,
        dst_access: Access,
    ) -> Self {
        Self {
            attachment: Arc::clone(attachment),
            old_layout: ImageLayout::General,
            new_layout: ImageLayout::General,
            src_stage,
            dst_stage,
            src_access,
            dst_access,
        }
    }
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}
