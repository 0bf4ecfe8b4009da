/// SamplerCache - internal VkSampler management for the Vulkan backend
///
/// Creates and caches one VkSampler per `SamplerKind` on first use.

use ash::vk;
use rustc_hash::FxHashMap;
use lumen_3d_engine::lumen3d::Result;
use lumen_3d_engine::lumen3d::device::SamplerKind;
use lumen_3d_engine::engine_err;

use crate::vulkan_context::LOG_SOURCE;

/// Internal sampler cache - creates VkSampler on first use, destroys on shutdown/drop
pub(crate) struct SamplerCache {
    device: Option<ash::Device>,
    max_anisotropy: f32,
    cache: FxHashMap<SamplerKind, vk::Sampler>,
}

impl SamplerCache {
    pub(crate) fn new(device: ash::Device, max_anisotropy: f32) -> Self {
        Self {
            device: Some(device),
            max_anisotropy,
            cache: FxHashMap::default(),
        }
    }

    /// Get or create a VkSampler for the given kind
    pub(crate) fn get(&mut self, kind: SamplerKind) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.cache.get(&kind) {
            return Ok(sampler);
        }

        let device = self
            .device
            .as_ref()
            .ok_or_else(|| engine_err!(LOG_SOURCE, "SamplerCache used after shutdown"))?;
        let create_info = sampler_create_info(kind, self.max_anisotropy);
        let sampler = unsafe {
            device.create_sampler(&create_info, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create {:?} sampler: {:?}", kind, e))?
        };
        self.cache.insert(kind, sampler);
        Ok(sampler)
    }

    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }

    /// Destroy all cached VkSamplers and release the device handle.
    /// Must be called during VulkanGraphicsDevice::drop() while the device is still alive.
    pub(crate) fn shutdown(&mut self) {
        if let Some(device) = self.device.take() {
            for (_, sampler) in self.cache.drain() {
                unsafe { device.destroy_sampler(sampler, None); }
            }
        }
    }
}

/// Filter and addressing per sampler kind
pub(crate) fn sampler_create_info(kind: SamplerKind, max_anisotropy: f32) -> vk::SamplerCreateInfo<'static> {
    let (filter, mipmap, address, anisotropy) = match kind {
        SamplerKind::LinearClamp => (
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::LINEAR,
            vk::SamplerAddressMode::CLAMP_TO_EDGE,
            None,
        ),
        SamplerKind::NearestClamp => (
            vk::Filter::NEAREST,
            vk::SamplerMipmapMode::NEAREST,
            vk::SamplerAddressMode::CLAMP_TO_EDGE,
            None,
        ),
        SamplerKind::LinearRepeat => (
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::LINEAR,
            vk::SamplerAddressMode::REPEAT,
            Some(max_anisotropy),
        ),
    };

    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter)
        .min_filter(filter)
        .mipmap_mode(mipmap)
        .address_mode_u(address)
        .address_mode_v(address)
        .address_mode_w(address)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS);

    match anisotropy {
        Some(max) => create_info.anisotropy_enable(true).max_anisotropy(max),
        None => create_info.anisotropy_enable(false).max_anisotropy(1.0),
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "vulkan_sampler_tests.rs"]
mod tests;
