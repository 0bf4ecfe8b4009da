/// Physical device selection
///
/// A GPU is usable when it has a graphics+compute queue family, a family
/// that can present to the window surface, `VK_KHR_swapchain`, at least one
/// surface format and present mode, and `samplerAnisotropy`. The first usable
/// device in enumeration order wins.

use ash::vk;
use std::ffi::CStr;
use lumen_3d_engine::lumen3d::{Error, Result};
use lumen_3d_engine::lumen3d::device::SampleCount;
use lumen_3d_engine::{engine_debug, engine_error, engine_info};

use crate::vulkan_context::LOG_SOURCE;

/// Queue family indices used by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueFamilies {
    /// Graphics + compute
    pub graphics: u32,
    /// Presentation (may equal `graphics`)
    pub present: u32,
}

/// Pick the graphics+compute family and a present family.
///
/// The graphics family is preferred for presentation when it supports it.
pub(crate) fn find_queue_families<F>(
    families: &[vk::QueueFamilyProperties],
    supports_present: F,
) -> Option<QueueFamilies>
where
    F: Fn(u32) -> bool,
{
    let graphics = families
        .iter()
        .position(|qf| {
            qf.queue_count > 0
                && qf.queue_flags.contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
        })? as u32;

    let present = if supports_present(graphics) {
        graphics
    } else {
        (0..families.len() as u32).find(|&i| supports_present(i))?
    };

    Some(QueueFamilies { graphics, present })
}

/// Everything the suitability gate looks at for one GPU
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeviceSupport {
    pub queue_families: Option<QueueFamilies>,
    pub has_swapchain_extension: bool,
    pub surface_format_count: usize,
    pub present_mode_count: usize,
    pub sampler_anisotropy: bool,
}

impl DeviceSupport {
    pub(crate) fn is_suitable(&self) -> bool {
        self.queue_families.is_some()
            && self.has_swapchain_extension
            && self.surface_format_count > 0
            && self.present_mode_count > 0
            && self.sampler_anisotropy
    }
}

pub(crate) fn has_extension(available: &[vk::ExtensionProperties], name: &CStr) -> bool {
    available
        .iter()
        .any(|ext| ext.extension_name_as_c_str().map_or(false, |n| n == name))
}

/// Highest sample count usable for both color and depth framebuffer attachments
pub(crate) fn max_usable_sample_count(limits: &vk::PhysicalDeviceLimits) -> SampleCount {
    SampleCount::highest_common(
        limits.framebuffer_color_sample_counts.as_raw(),
        limits.framebuffer_depth_sample_counts.as_raw(),
    )
}

/// Query what `is_suitable` needs for one device
///
/// Query failures count as "not supported" rather than errors, so a broken
/// driver entry just removes that GPU from the candidates.
unsafe fn query_support(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> DeviceSupport {
    let families = instance.get_physical_device_queue_family_properties(physical_device);
    let queue_families = find_queue_families(&families, |i| {
        surface_loader
            .get_physical_device_surface_support(physical_device, i, surface)
            .unwrap_or(false)
    });

    let extensions = instance
        .enumerate_device_extension_properties(physical_device)
        .unwrap_or_default();
    let surface_format_count = surface_loader
        .get_physical_device_surface_formats(physical_device, surface)
        .map_or(0, |f| f.len());
    let present_mode_count = surface_loader
        .get_physical_device_surface_present_modes(physical_device, surface)
        .map_or(0, |m| m.len());
    let features = instance.get_physical_device_features(physical_device);

    DeviceSupport {
        queue_families,
        has_swapchain_extension: has_extension(&extensions, ash::khr::swapchain::NAME),
        surface_format_count,
        present_mode_count,
        sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
    }
}

/// First suitable GPU and its queue families
pub(crate) unsafe fn pick_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
    let physical_devices = instance
        .enumerate_physical_devices()
        .map_err(|e| {
            engine_error!(LOG_SOURCE, "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

    for physical_device in physical_devices {
        let properties = instance.get_physical_device_properties(physical_device);
        let name = properties
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "<unnamed>".to_string());

        let support = query_support(instance, surface_loader, surface, physical_device);
        match support.queue_families {
            Some(families) if support.is_suitable() => {
                engine_info!(LOG_SOURCE, "Selected GPU: {}", name);
                return Ok((physical_device, families));
            }
            _ => engine_debug!(LOG_SOURCE, "Skipping unsuitable GPU {}: {:?}", name, support),
        }
    }

    engine_error!(LOG_SOURCE, "No suitable Vulkan GPU found");
    Err(Error::InitializationFailed("No suitable Vulkan GPU found".to_string()))
}

#[cfg(test)]
#[path = "vulkan_physical_device_tests.rs"]
mod tests;
