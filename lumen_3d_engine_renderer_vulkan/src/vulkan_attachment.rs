/// Attachment - Vulkan implementation of the Attachment trait

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;
use lumen_3d_engine::lumen3d::device::{
    Attachment as AttachmentTrait, AttachmentUsage, ImageAspect, SampleCount, TextureFormat,
};

use crate::vulkan_context::GpuContext;

/// Who releases the image and view
enum Ownership {
    /// Device-created attachment: image, view and allocation are freed on drop
    Owned {
        ctx: Arc<GpuContext>,
        allocation: Option<Allocation>,
    },
    /// Swapchain image: the swapchain destroys the view and owns the image
    Borrowed,
}

/// Vulkan attachment implementation
pub struct Attachment {
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view (color or depth aspect, never stencil)
    pub(crate) view: vk::ImageView,
    pub(crate) aspect: ImageAspect,
    format: TextureFormat,
    usage: AttachmentUsage,
    samples: SampleCount,
    width: u32,
    height: u32,
    ownership: Ownership,
}

impl Attachment {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_owned(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        allocation: Allocation,
        aspect: ImageAspect,
        format: TextureFormat,
        usage: AttachmentUsage,
        samples: SampleCount,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            image,
            view,
            aspect,
            format,
            usage,
            samples,
            width,
            height,
            ownership: Ownership::Owned { ctx, allocation: Some(allocation) },
        }
    }

    /// Wrap a swapchain image and its view without taking ownership
    pub(crate) fn new_swapchain_image(
        image: vk::Image,
        view: vk::ImageView,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            image,
            view,
            aspect: ImageAspect::Color,
            format,
            usage: AttachmentUsage::COLOR,
            samples: SampleCount::S1,
            width,
            height,
            ownership: Ownership::Borrowed,
        }
    }

    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(attachment: &dyn AttachmentTrait) -> &Self {
        unsafe { &*(attachment as *const dyn AttachmentTrait as *const Self) }
    }
}

impl AttachmentTrait for Attachment {
    fn format(&self) -> TextureFormat {
        self.format
    }

    fn usage(&self) -> AttachmentUsage {
        self.usage
    }

    fn samples(&self) -> SampleCount {
        self.samples
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        if let Ownership::Owned { ctx, allocation } = &mut self.ownership {
            unsafe {
                ctx.device.destroy_image_view(self.view, None);

                // Don't panic if lock fails - we still need to destroy the image
                if let Some(allocation) = allocation.take() {
                    if let Ok(mut allocator) = ctx.allocator.lock() {
                        allocator.free(allocation).ok();
                    }
                }

                ctx.device.destroy_image(self.image, None);
            }
        }
    }
}
