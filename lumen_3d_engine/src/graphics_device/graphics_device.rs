/// GraphicsDevice trait - factory for GPU resources and the submission entry point

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Attachment, AttachmentDesc, TextureFormat, Buffer, BufferUsage, Shader, ShaderDesc,
    RenderPass, RenderPassDesc, Framebuffer, FramebufferDesc,
    DescriptorSetLayout, DescriptorSet, DescriptorBinding, DescriptorWrite,
    Pipeline, GraphicsPipelineDesc, ComputePipelineDesc,
    CommandList, Swapchain, ImageLayout,
};

/// Multisample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SampleCount {
    S1,
    S2,
    S4,
    S8,
    S16,
    S32,
    S64,
}

impl SampleCount {
    /// Number of samples per pixel
    pub fn count(&self) -> u32 {
        match self {
            SampleCount::S1 => 1,
            SampleCount::S2 => 2,
            SampleCount::S4 => 4,
            SampleCount::S8 => 8,
            SampleCount::S16 => 16,
            SampleCount::S32 => 32,
            SampleCount::S64 => 64,
        }
    }

    /// Highest sample count present in both support masks.
    ///
    /// Masks use the Vulkan bit layout (bit N set means 2^N samples). Falls
    /// back to `S1` when the masks share nothing.
    pub fn highest_common(color_mask: u32, depth_mask: u32) -> SampleCount {
        let common = color_mask & depth_mask;
        for candidate in [
            SampleCount::S64,
            SampleCount::S32,
            SampleCount::S16,
            SampleCount::S8,
            SampleCount::S4,
            SampleCount::S2,
        ] {
            if common & candidate.count() != 0 {
                return candidate;
            }
        }
        SampleCount::S1
    }
}

/// Main graphics device trait
///
/// Central factory for GPU resources. Every method takes `&self`: backends keep
/// their mutable state (allocator, descriptor pools) behind interior locks so the
/// device can be shared as `Arc<dyn GraphicsDevice>` between passes.
pub trait GraphicsDevice: Send + Sync {
    /// Create a device-local image + view usable as an attachment
    ///
    /// The image is always created sampleable. The view aspect is derived
    /// from `desc.usage`; an invalid usage combination returns `Error::InvalidResource`.
    fn create_attachment(&self, desc: &AttachmentDesc) -> Result<Arc<dyn Attachment>>;

    /// Create a host-visible, persistently mapped buffer
    fn create_host_buffer(&self, size: u64, usage: BufferUsage) -> Result<Arc<dyn Buffer>>;

    /// Create a GPU-only buffer filled with `data` through a staging copy
    ///
    /// Blocks until the one-shot upload has completed.
    fn create_device_buffer(&self, data: &[u8], usage: BufferUsage) -> Result<Arc<dyn Buffer>>;

    /// Create a sampled 2D color texture from tightly packed texels
    ///
    /// Blocks until the upload has completed; the image is then in
    /// `ShaderReadOnly`. `pixels` must hold exactly
    /// `width * height * format.bytes_per_pixel()` bytes, and depth formats
    /// are rejected with `Error::InvalidResource`.
    fn create_texture(
        &self,
        format: TextureFormat,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Arc<dyn Attachment>>;

    /// Create a shader module from SPIR-V words
    fn create_shader(&self, desc: &ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Create a render pass
    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create a framebuffer for a render pass
    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Create a descriptor set layout from its bindings
    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<Arc<dyn DescriptorSetLayout>>;

    /// Allocate `count` descriptor sets sharing one layout
    fn allocate_descriptor_sets(
        &self,
        layout: &Arc<dyn DescriptorSetLayout>,
        count: usize,
    ) -> Result<Vec<Arc<dyn DescriptorSet>>>;

    /// Point the bindings of an existing set at new resources
    fn update_descriptor_set(
        &self,
        set: &Arc<dyn DescriptorSet>,
        writes: &[DescriptorWrite],
    ) -> Result<()>;

    /// Create a graphics pipeline
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Create a compute pipeline
    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Transition an attachment between layouts with a blocking one-shot submission
    ///
    /// The masks come from [`transition_masks`](crate::graphics_device::transition_masks);
    /// pairs missing from that table return `Error::UnsupportedLayoutTransition`.
    fn transition_image_layout(
        &self,
        attachment: &Arc<dyn Attachment>,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
        mip_levels: u32,
        layer_count: u32,
    ) -> Result<()>;

    /// Create a swapchain for the device's surface
    fn create_swapchain(&self, width: u32, height: u32) -> Result<Box<dyn Swapchain>>;

    /// Create a command list for recording rendering commands
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Submit command lists for the frame slot the swapchain is currently on
    ///
    /// Waits on the slot's image-available semaphore, signals its render-finished
    /// semaphore and resets + signals the slot's in-flight fence.
    fn submit_with_swapchain(
        &self,
        commands: &[&dyn CommandList],
        swapchain: &dyn Swapchain,
        image_index: u32,
    ) -> Result<()>;

    /// Highest sample count supported for both color and depth attachments
    fn msaa_samples(&self) -> SampleCount;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;
}

#[cfg(test)]
#[path = "graphics_device_tests.rs"]
mod tests;
