/// Swapchain trait - for window presentation

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Attachment, TextureFormat};

/// Outcome of an acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    /// Index of the image to render into
    Image(u32),
    /// The swapchain no longer matches the surface and must be recreated
    OutOfDate,
}

/// Outcome of a present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    /// Presented normally
    Presented,
    /// Presented, but the swapchain should be recreated
    Suboptimal,
    /// Not presented; the swapchain must be recreated
    OutOfDate,
}

/// Swapchain for presenting rendered images to a window
///
/// Owns the presentable images and the per-frame-slot synchronization. The
/// frame slot advances modulo `MAX_FRAMES_IN_FLIGHT`, independently of the
/// number of images.
pub trait Swapchain: Send + Sync {
    /// Acquire the next image
    ///
    /// Blocks on the current slot's fence first, then, once an image index is
    /// known, on the fence of whichever other slot last rendered to that image.
    fn acquire_next_image(&mut self) -> Result<AcquireResult>;

    /// Present an image and advance to the next frame slot
    ///
    /// # Arguments
    ///
    /// * `image_index` - Index of the image to present (from acquire_next_image)
    fn present(&mut self, image_index: u32) -> Result<PresentResult>;

    /// Recreate the swapchain (e.g., after window resize)
    ///
    /// The old swapchain is handed to the new one and released afterwards.
    /// Image views change, so every framebuffer built on them is stale.
    ///
    /// # Arguments
    ///
    /// * `width` - New width in pixels
    /// * `height` - New height in pixels
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// Get the number of images in the swapchain
    fn image_count(&self) -> usize;

    /// Get the width of the swapchain images in pixels
    fn width(&self) -> u32;

    /// Get the height of the swapchain images in pixels
    fn height(&self) -> u32;

    /// Get the pixel format of the swapchain images
    fn format(&self) -> TextureFormat;

    /// Swapchain images as (non-owning) attachments, indexed by image index
    fn image_attachments(&self) -> Vec<Arc<dyn Attachment>>;

    /// Frame slot the next submission belongs to
    fn current_frame_slot(&self) -> usize;
}
