/// Swapchain - Vulkan implementation of the Swapchain trait

use lumen_3d_engine::lumen3d::{Result, Error, MAX_FRAMES_IN_FLIGHT};
use lumen_3d_engine::lumen3d::device::{
    Swapchain as SwapchainTrait,
    Attachment as AttachmentTrait,
    AcquireResult, PresentResult, FrameSlotTracker, TextureFormat,
};
use lumen_3d_engine::{engine_debug, engine_error, engine_err};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_attachment::Attachment;
use crate::vulkan_context::LOG_SOURCE;
use crate::vulkan_convert::vk_to_texture_format;

/// Vulkan swapchain implementation
///
/// Manages presentation to the window surface owned by the device, plus one
/// image-available semaphore, render-finished semaphore and in-flight fence
/// per frame slot.
pub struct Swapchain {
    /// Vulkan device
    device: ash::Device,
    /// Physical device for capabilities queries
    physical_device: vk::PhysicalDevice,

    /// Present queue
    present_queue: vk::Queue,

    /// Surface (owned by the device)
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    /// Swapchain
    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain_images: Vec<vk::Image>,
    swapchain_image_views: Vec<vk::ImageView>,
    image_attachments: Vec<Arc<dyn AttachmentTrait>>,
    surface_format: vk::SurfaceFormatKHR,
    texture_format: TextureFormat,
    present_mode: vk::PresentModeKHR,
    swapchain_extent: vk::Extent2D,

    /// Synchronization primitives, one of each per frame slot
    image_available_semaphores: Vec<vk::Semaphore>,
    render_finished_semaphores: Vec<vk::Semaphore>,
    in_flight_fences: Vec<vk::Fence>,

    /// Current slot and per-image slot ownership
    tracker: FrameSlotTracker,
}

impl Swapchain {
    /// Create a new swapchain
    ///
    /// # Arguments
    ///
    /// * `device` - Vulkan logical device
    /// * `instance` - Vulkan instance (for the swapchain loader)
    /// * `physical_device` - Vulkan physical device
    /// * `surface` - Window surface
    /// * `surface_loader` - Surface loader
    /// * `present_queue` - Queue for presenting
    /// * `width` - Window width, used when the surface leaves the extent to us
    /// * `height` - Window height
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        device: ash::Device,
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
        present_queue: vk::Queue,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        unsafe {
            let surface_formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?;
            let surface_format = choose_surface_format(&surface_formats).ok_or_else(|| {
                engine_error!(LOG_SOURCE, "Surface reports no formats");
                Error::InitializationFailed("Surface reports no formats".to_string())
            })?;
            let texture_format = vk_to_texture_format(surface_format.format).ok_or_else(|| {
                engine_error!(LOG_SOURCE, "Unsupported swapchain format {:?}", surface_format.format);
                Error::InitializationFailed(format!("Unsupported swapchain format {:?}", surface_format.format))
            })?;

            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to query present modes: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
                })?;
            let present_mode = choose_present_mode(&present_modes);

            let swapchain_loader = ash::khr::swapchain::Device::new(instance, &device);

            let (image_available_semaphores, render_finished_semaphores, in_flight_fences) =
                create_sync_objects(&device)?;

            let mut swapchain = Self {
                device,
                physical_device,
                present_queue,
                surface,
                surface_loader,
                swapchain: vk::SwapchainKHR::null(),
                swapchain_loader,
                swapchain_images: Vec::new(),
                swapchain_image_views: Vec::new(),
                image_attachments: Vec::new(),
                surface_format,
                texture_format,
                present_mode,
                swapchain_extent: vk::Extent2D { width, height },
                image_available_semaphores,
                render_finished_semaphores,
                in_flight_fences,
                tracker: FrameSlotTracker::new(MAX_FRAMES_IN_FLIGHT, 0),
            };

            // On failure, Drop releases whatever was created so far
            swapchain.build(width, height)?;

            engine_debug!(LOG_SOURCE, "Swapchain created: {}x{}, {} images, {:?}, {:?}",
                swapchain.swapchain_extent.width, swapchain.swapchain_extent.height,
                swapchain.swapchain_images.len(), surface_format.format, present_mode);

            Ok(swapchain)
        }
    }

    /// Synchronization info for submitting into the current slot (crate-private)
    ///
    /// Returns (wait_semaphore, signal_semaphore, fence).
    /// This is used internally by VulkanGraphicsDevice::submit_with_swapchain().
    pub(crate) fn sync_info(&self) -> (vk::Semaphore, vk::Semaphore, vk::Fence) {
        let slot = self.tracker.current_slot();
        (
            self.image_available_semaphores[slot],
            self.render_finished_semaphores[slot],
            self.in_flight_fences[slot],
        )
    }

    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(swapchain: &dyn SwapchainTrait) -> &Self {
        unsafe { &*(swapchain as *const dyn SwapchainTrait as *const Self) }
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe {
            self.device.wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to wait for in-flight fence: {:?}", e))
        }
    }

    /// Create the swapchain (handing over the current one, if any), its
    /// image views and attachments, then forget image ownership.
    unsafe fn build(&mut self, width: u32, height: u32) -> Result<()> {
        let capabilities = self.surface_loader
            .get_physical_device_surface_capabilities(self.physical_device, self.surface)
            .map_err(|e| {
                engine_error!(LOG_SOURCE, "Failed to get surface capabilities: {:?}", e);
                Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
            })?;

        let extent = choose_extent(&capabilities, width, height);
        let image_count = choose_image_count(&capabilities);

        let old_swapchain = self.swapchain;
        let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(image_count)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = self.swapchain_loader
            .create_swapchain(&swapchain_create_info, None)
            .map_err(|e| {
                engine_error!(LOG_SOURCE, "Failed to create swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
            })?;

        // Old views and the retired swapchain go once the new one exists
        self.image_attachments.clear();
        for image_view in self.swapchain_image_views.drain(..) {
            self.device.destroy_image_view(image_view, None);
        }
        if old_swapchain != vk::SwapchainKHR::null() {
            self.swapchain_loader.destroy_swapchain(old_swapchain, None);
        }
        self.swapchain = swapchain;
        self.swapchain_extent = extent;

        self.swapchain_images = self.swapchain_loader
            .get_swapchain_images(swapchain)
            .map_err(|e| {
                engine_error!(LOG_SOURCE, "Failed to get swapchain images: {:?}", e);
                Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
            })?;

        for &image in &self.swapchain_images {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.surface_format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let image_view = self.device.create_image_view(&create_info, None)
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to create swapchain image view: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create image view: {:?}", e))
                })?;
            self.swapchain_image_views.push(image_view);
            self.image_attachments.push(Arc::new(Attachment::new_swapchain_image(
                image,
                image_view,
                self.texture_format,
                extent.width,
                extent.height,
            )));
        }

        self.tracker.reset_images(self.swapchain_images.len());
        Ok(())
    }
}

impl SwapchainTrait for Swapchain {
    fn acquire_next_image(&mut self) -> Result<AcquireResult> {
        let slot = self.tracker.current_slot();
        self.wait_for_fence(self.in_flight_fences[slot])?;

        let acquired = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.image_available_semaphores[slot],
                vk::Fence::null(),
            )
        };

        let image_index = match acquired {
            // A suboptimal image is still usable; present reports it
            Ok((image_index, _is_suboptimal)) => image_index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => return Ok(AcquireResult::OutOfDate),
            Err(e) => {
                return Err(engine_err!(LOG_SOURCE, "Failed to acquire next swapchain image: {:?}", e));
            }
        };

        if let Some(previous_slot) = self.tracker.claim_image(image_index as usize) {
            self.wait_for_fence(self.in_flight_fences[previous_slot])?;
        }

        Ok(AcquireResult::Image(image_index))
    }

    fn present(&mut self, image_index: u32) -> Result<PresentResult> {
        let slot = self.tracker.current_slot();
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [self.render_finished_semaphores[slot]];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { self.swapchain_loader.queue_present(self.present_queue, &present_info) };

        // The slot's semaphores are spent whatever the outcome
        self.tracker.advance();

        match result {
            Ok(false) => Ok(PresentResult::Presented),
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(PresentResult::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentResult::OutOfDate),
            Err(e) => Err(engine_err!(LOG_SOURCE, "Failed to present swapchain image: {:?}", e)),
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to wait idle before swapchain recreate: {:?}", e))?;

            self.build(width, height)?;
        }

        engine_debug!(LOG_SOURCE, "Swapchain recreated: {}x{}, {} images",
            self.swapchain_extent.width, self.swapchain_extent.height, self.swapchain_images.len());
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.swapchain_images.len()
    }

    fn width(&self) -> u32 {
        self.swapchain_extent.width
    }

    fn height(&self) -> u32 {
        self.swapchain_extent.height
    }

    fn format(&self) -> TextureFormat {
        self.texture_format
    }

    fn image_attachments(&self) -> Vec<Arc<dyn AttachmentTrait>> {
        self.image_attachments.clone()
    }

    fn current_frame_slot(&self) -> usize {
        self.tracker.current_slot()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            for &semaphore in &self.image_available_semaphores {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &semaphore in &self.render_finished_semaphores {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &fence in &self.in_flight_fences {
                self.device.destroy_fence(fence, None);
            }

            self.image_attachments.clear();
            for &image_view in &self.swapchain_image_views {
                self.device.destroy_image_view(image_view, None);
            }

            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
        }
    }
}

/// One image-available semaphore, render-finished semaphore and signaled
/// fence per frame slot
unsafe fn create_sync_objects(
    device: &ash::Device,
) -> Result<(Vec<vk::Semaphore>, Vec<vk::Semaphore>, Vec<vk::Fence>)> {
    let semaphore_create_info = vk::SemaphoreCreateInfo::default();
    let fence_create_info = vk::FenceCreateInfo::default()
        .flags(vk::FenceCreateFlags::SIGNALED);

    let mut image_available = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
    let mut render_finished = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
    let mut in_flight = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);

    let result = (|| -> std::result::Result<(), vk::Result> {
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            image_available.push(device.create_semaphore(&semaphore_create_info, None)?);
            render_finished.push(device.create_semaphore(&semaphore_create_info, None)?);
            in_flight.push(device.create_fence(&fence_create_info, None)?);
        }
        Ok(())
    })();

    if let Err(e) = result {
        for semaphore in image_available.drain(..).chain(render_finished.drain(..)) {
            device.destroy_semaphore(semaphore, None);
        }
        for fence in in_flight.drain(..) {
            device.destroy_fence(fence, None);
        }
        engine_error!(LOG_SOURCE, "Failed to create frame synchronization objects: {:?}", e);
        return Err(Error::InitializationFailed(format!("Failed to create sync objects: {:?}", e)));
    }

    Ok((image_available, render_finished, in_flight))
}

/// Prefer an sRGB 8-bit BGRA/RGBA format in the sRGB non-linear color space,
/// otherwise take the first format the surface reports
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            (f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when available; FIFO is always supported
pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's extent, unless it reports the `u32::MAX` sentinel that lets
/// the window size decide
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, capped by the maximum (0 means unbounded)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
