/// Framebuffer bundle - one render pass, one framebuffer per swapchain image
///
/// The bundle owns the attachments its pass creates. Attachments borrowed
/// from other passes (shared depth, compose color, swapchain images) appear
/// in the framebuffers but are never listed as owned.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Attachment, Framebuffer, FramebufferDesc, GraphicsDevice, RenderPass,
};

/// Teardown capability shared by every pass
///
/// `destroy` releases the framebuffers and then the attachments the pass
/// owns, and must run before the pass is rebuilt at a new extent. Pipelines
/// and descriptor set allocations survive it.
pub trait PassFrameBuffer {
    fn destroy(&mut self);

    /// True between `destroy` and the next rebuild
    fn is_destroyed(&self) -> bool;
}

pub struct FrameBufferBundle {
    width: u32,
    height: u32,
    render_pass: Arc<dyn RenderPass>,
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    attachments: Vec<Arc<dyn Attachment>>,
}

impl FrameBufferBundle {
    /// Empty bundle around a render pass; call [`build`](Self::build) next
    pub fn new(render_pass: Arc<dyn RenderPass>) -> Self {
        Self {
            width: 0,
            height: 0,
            render_pass,
            framebuffers: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Create one framebuffer per entry of `per_image`
    ///
    /// # Arguments
    ///
    /// * `owned` - Attachments this bundle takes ownership of
    /// * `per_image` - Attachment list of each framebuffer, in render pass order;
    ///   its length is the swapchain image count
    pub fn build(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
        owned: Vec<Arc<dyn Attachment>>,
        per_image: Vec<Vec<Arc<dyn Attachment>>>,
    ) -> Result<()> {
        assert!(
            self.framebuffers.is_empty(),
            "framebuffer bundle rebuilt without destroy"
        );

        let mut framebuffers = Vec::with_capacity(per_image.len());
        for attachments in per_image {
            framebuffers.push(device.create_framebuffer(&FramebufferDesc {
                render_pass: &self.render_pass,
                attachments,
                width,
                height,
            })?);
        }

        self.width = width;
        self.height = height;
        self.framebuffers = framebuffers;
        self.attachments = owned;
        Ok(())
    }

    /// Release framebuffers, then owned attachments, newest first
    pub fn destroy(&mut self) {
        while self.framebuffers.pop().is_some() {}
        while self.attachments.pop().is_some() {}
        self.width = 0;
        self.height = 0;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Framebuffer for a swapchain image
    pub fn framebuffer(&self, image_index: u32) -> &Arc<dyn Framebuffer> {
        assert!(
            (image_index as usize) < self.framebuffers.len(),
            "image index {} out of range ({} framebuffers)",
            image_index,
            self.framebuffers.len()
        );
        &self.framebuffers[image_index as usize]
    }

    /// Owned attachment by creation index
    pub fn attachment(&self, index: usize) -> &Arc<dyn Attachment> {
        &self.attachments[index]
    }

    pub fn owned_attachment_count(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }
}

#[cfg(test)]
#[path = "frame_buffer_bundle_tests.rs"]
mod tests;
