/// Attachment trait, attachment descriptor and texture formats

use bitflags::bitflags;
use crate::error::{Error, Result};
use crate::graphics_device::SampleCount;

/// Pixel format of an attachment or swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Returns true for depth (and depth/stencil) formats
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM | TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT
        )
    }

    /// Returns true when the format carries a stencil component
    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT)
    }

    /// Size of one texel in bytes
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::D16_UNORM => 2,
            TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::D32_FLOAT
            | TextureFormat::D24_UNORM_S8_UINT => 4,
            TextureFormat::R16G16B16A16_SFLOAT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

bitflags! {
    /// How an attachment is used by the pass chain
    ///
    /// `SAMPLED` is always added by the backend so any attachment can be read
    /// by a later pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttachmentUsage: u32 {
        const COLOR = 0x1;
        const DEPTH_STENCIL = 0x2;
        const STORAGE = 0x4;
    }
}

/// Image view aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAspect {
    Color,
    Depth,
}

/// Derive the view aspect from an attachment's usage.
///
/// Color and storage usages map to `Color`, depth/stencil to `Depth` (never
/// the stencil aspect, so the view stays sampleable). Mixing color and depth,
/// an empty usage, or a format that contradicts the usage is rejected.
pub fn aspect_for_usage(usage: AttachmentUsage, format: TextureFormat) -> Result<ImageAspect> {
    let color_like = usage.intersects(AttachmentUsage::COLOR | AttachmentUsage::STORAGE);
    let depth = usage.contains(AttachmentUsage::DEPTH_STENCIL);

    match (color_like, depth) {
        (true, false) if !format.is_depth() => Ok(ImageAspect::Color),
        (false, true) if format.is_depth() => Ok(ImageAspect::Depth),
        _ => Err(Error::InvalidResource(format!(
            "unsupported attachment usage {:?} for format {:?}",
            usage, format
        ))),
    }
}

/// Check texel data handed to `GraphicsDevice::create_texture`
pub fn validate_texture_data(format: TextureFormat, width: u32, height: u32, len: usize) -> Result<()> {
    if format.is_depth() {
        return Err(Error::InvalidResource(format!("{:?} cannot be uploaded as a texture", format)));
    }
    if width == 0 || height == 0 {
        return Err(Error::InvalidResource("zero-sized texture".to_string()));
    }
    let expected = width as u64 * height as u64 * format.bytes_per_pixel() as u64;
    if len as u64 != expected {
        return Err(Error::InvalidResource(format!(
            "texture {}x{} {:?} needs {} bytes, got {}",
            width, height, format, expected, len
        )));
    }
    Ok(())
}

/// Descriptor for creating an attachment
#[derive(Debug, Clone, Copy)]
pub struct AttachmentDesc {
    /// Pixel format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: AttachmentUsage,
    /// Samples per pixel
    pub samples: SampleCount,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Attachment resource trait
///
/// An image, its backing allocation and its view. Implemented by backend
/// types (e.g. VulkanAttachment); destroyed when the last `Arc` drops.
/// Swapchain images are exposed through the same trait but are not owned.
pub trait Attachment: Send + Sync {
    fn format(&self) -> TextureFormat;
    fn usage(&self) -> AttachmentUsage;
    fn samples(&self) -> SampleCount;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

#[cfg(test)]
#[path = "attachment_tests.rs"]
mod tests;
