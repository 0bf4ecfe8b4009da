/// Image layouts, barrier masks and the layout transition table
///
/// Every layout change the renderer performs outside a render pass goes
/// through [`transition_masks`]. The table is closed: a pair that is not
/// listed is an error, and a new transition must be added here rather than
/// worked around at the call site.
///
/// `PipelineStage` and `Access` use the Vulkan bit values so backends can
/// convert them without a lookup.

use bitflags::bitflags;
use crate::error::{Error, Result};

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Contents are discarded
    Undefined,
    /// Storage image access (compute read/write)
    General,
    /// Color attachment
    ColorAttachment,
    /// Depth/stencil attachment
    DepthStencilAttachment,
    /// Depth/stencil read-only (depth test without write)
    DepthStencilReadOnly,
    /// Sampled in shaders
    ShaderReadOnly,
    /// Transfer source
    TransferSrc,
    /// Transfer destination
    TransferDst,
    /// Ready for presentation
    PresentSrc,
}

bitflags! {
    /// Pipeline stages (Vulkan `VkPipelineStageFlagBits` values)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStage: u32 {
        const TOP_OF_PIPE = 0x0000_0001;
        const VERTEX_SHADER = 0x0000_0008;
        const FRAGMENT_SHADER = 0x0000_0080;
        const EARLY_FRAGMENT_TESTS = 0x0000_0100;
        const LATE_FRAGMENT_TESTS = 0x0000_0200;
        const COLOR_ATTACHMENT_OUTPUT = 0x0000_0400;
        const COMPUTE_SHADER = 0x0000_0800;
        const TRANSFER = 0x0000_1000;
        const BOTTOM_OF_PIPE = 0x0000_2000;
    }
}

bitflags! {
    /// Memory access types (Vulkan `VkAccessFlagBits` values)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u32 {
        const UNIFORM_READ = 0x0000_0008;
        const SHADER_READ = 0x0000_0020;
        const SHADER_WRITE = 0x0000_0040;
        const COLOR_ATTACHMENT_READ = 0x0000_0080;
        const COLOR_ATTACHMENT_WRITE = 0x0000_0100;
        const DEPTH_STENCIL_ATTACHMENT_READ = 0x0000_0200;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x0000_0400;
        const TRANSFER_READ = 0x0000_0800;
        const TRANSFER_WRITE = 0x0000_1000;
        const MEMORY_READ = 0x0000_8000;
    }
}

/// Source/destination masks for one layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    pub src_access: Access,
    pub dst_access: Access,
    pub src_stage: PipelineStage,
    pub dst_stage: PipelineStage,
}

/// Look up the barrier masks for an (old, new) layout pair
pub fn transition_masks(old: ImageLayout, new: ImageLayout) -> Result<LayoutTransition> {
    use ImageLayout as L;

    let (src_access, dst_access, src_stage, dst_stage) = match (old, new) {
        (L::Undefined, L::TransferDst) => (
            Access::empty(),
            Access::TRANSFER_WRITE,
            PipelineStage::TOP_OF_PIPE,
            PipelineStage::TRANSFER,
        ),
        (L::TransferDst, L::ShaderReadOnly) => (
            Access::TRANSFER_WRITE,
            Access::SHADER_READ,
            PipelineStage::TRANSFER,
            PipelineStage::FRAGMENT_SHADER,
        ),
        (L::Undefined, L::General) => (
            Access::empty(),
            Access::SHADER_READ | Access::SHADER_WRITE,
            PipelineStage::TOP_OF_PIPE,
            PipelineStage::COMPUTE_SHADER,
        ),
        (L::Undefined, L::ShaderReadOnly) => (
            Access::empty(),
            Access::SHADER_READ,
            PipelineStage::TOP_OF_PIPE,
            PipelineStage::FRAGMENT_SHADER,
        ),
        (L::Undefined, L::ColorAttachment) => (
            Access::empty(),
            Access::COLOR_ATTACHMENT_READ | Access::COLOR_ATTACHMENT_WRITE,
            PipelineStage::TOP_OF_PIPE,
            PipelineStage::COLOR_ATTACHMENT_OUTPUT,
        ),
        (L::Undefined, L::DepthStencilAttachment) => (
            Access::empty(),
            Access::DEPTH_STENCIL_ATTACHMENT_READ | Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
            PipelineStage::TOP_OF_PIPE,
            PipelineStage::EARLY_FRAGMENT_TESTS,
        ),
        // Bloom output handed to the post pass
        (L::General, L::ShaderReadOnly) => (
            Access::SHADER_WRITE,
            Access::SHADER_READ,
            PipelineStage::COMPUTE_SHADER,
            PipelineStage::FRAGMENT_SHADER,
        ),
        (L::ShaderReadOnly, L::General) => (
            Access::SHADER_READ,
            Access::SHADER_READ | Access::SHADER_WRITE,
            PipelineStage::FRAGMENT_SHADER,
            PipelineStage::COMPUTE_SHADER,
        ),
        (L::ColorAttachment, L::ShaderReadOnly) => (
            Access::COLOR_ATTACHMENT_WRITE,
            Access::SHADER_READ,
            PipelineStage::COLOR_ATTACHMENT_OUTPUT,
            PipelineStage::FRAGMENT_SHADER,
        ),
        (L::ColorAttachment, L::General) => (
            Access::COLOR_ATTACHMENT_WRITE,
            Access::SHADER_READ | Access::SHADER_WRITE,
            PipelineStage::COLOR_ATTACHMENT_OUTPUT,
            PipelineStage::COMPUTE_SHADER,
        ),
        _ => return Err(Error::UnsupportedLayoutTransition(old, new)),
    };

    Ok(LayoutTransition { src_access, dst_access, src_stage, dst_stage })
}

#[cfg(test)]
#[path = "image_layout_tests.rs"]
mod tests;
