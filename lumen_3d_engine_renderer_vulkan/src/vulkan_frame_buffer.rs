/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Wraps a VkFramebuffer that groups color and depth attachments.
/// Created once per swapchain image, rebuilt when the attachments change.

use ash::vk;
use std::sync::Arc;
use lumen_3d_engine::lumen3d::device::{Attachment, Framebuffer as FramebufferTrait};

/// Vulkan framebuffer implementation
///
/// Keeps its attachments alive so the views outlive the framebuffer.
pub struct Framebuffer {
    /// Vulkan framebuffer handle
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
    _attachments: Vec<Arc<dyn Attachment>>,
    /// Vulkan device (for cleanup)
    device: ash::Device,
}

impl Framebuffer {
    pub(crate) fn new(
        framebuffer: vk::Framebuffer,
        width: u32,
        height: u32,
        attachments: Vec<Arc<dyn Attachment>>,
        device: ash::Device,
    ) -> Self {
        Self { framebuffer, width, height, _attachments: attachments, device }
    }

    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(framebuffer: &dyn FramebufferTrait) -> &Self {
        unsafe { &*(framebuffer as *const dyn FramebufferTrait as *const Self) }
    }
}

impl FramebufferTrait for Framebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
