/// RenderPass - Vulkan implementation of the RenderPass trait

use ash::vk;
use lumen_3d_engine::lumen3d::device::RenderPass as RenderPassTrait;

/// Vulkan render pass implementation
///
/// Single-subpass wrapper around vk::RenderPass
pub struct RenderPass {
    /// Vulkan render pass handle
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) color_attachment_count: usize,
    pub(crate) has_depth: bool,
    /// Vulkan device (for cleanup)
    pub(crate) device: ash::Device,
}

impl RenderPass {
    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(render_pass: &dyn RenderPassTrait) -> &Self {
        unsafe { &*(render_pass as *const dyn RenderPassTrait as *const Self) }
    }
}

impl RenderPassTrait for RenderPass {
    fn color_attachment_count(&self) -> usize {
        self.color_attachment_count
    }

    fn has_depth_attachment(&self) -> bool {
        self.has_depth
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
