/// Framebuffer trait - groups attachments for a render pass
///
/// Created once per swapchain image and reused each frame. Recreated only
/// when the attachments change (window resize, swapchain recreation).

use std::sync::Arc;
use crate::graphics_device::{RenderPass, Attachment};

/// Framebuffer - the attachment views a render pass renders into
///
/// Created via `GraphicsDevice::create_framebuffer()`.
pub trait Framebuffer: Send + Sync {
    /// Get the width in pixels
    fn width(&self) -> u32;

    /// Get the height in pixels
    fn height(&self) -> u32;
}

/// Descriptor for creating a framebuffer
pub struct FramebufferDesc<'a> {
    /// The render pass this framebuffer is compatible with
    pub render_pass: &'a Arc<dyn RenderPass>,
    /// Attachments in render pass order (colors, then depth)
    pub attachments: Vec<Arc<dyn Attachment>>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}
