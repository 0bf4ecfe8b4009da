/// Descriptor set layouts, descriptor sets and the writes that fill them
///
/// Sets are allocated once per swapchain image and rewritten in place
/// whenever the attachments they reference are recreated.

use std::sync::Arc;
use crate::graphics_device::{Attachment, Buffer, ShaderStage};

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorType {
    /// Texture + sampler in one binding
    CombinedImageSampler,
    /// Read/write image for compute shaders (GENERAL layout)
    StorageImage,
    /// Uniform buffer
    UniformBuffer,
}

/// Description of a single binding slot within a layout
#[derive(Debug, Clone)]
pub struct DescriptorBinding {
    /// Binding number (`layout(binding = N)` in GLSL)
    pub binding: u32,
    /// Type of resource at this binding
    pub descriptor_type: DescriptorType,
    /// Shader stages that access this binding
    pub stages: Vec<ShaderStage>,
}

/// Sampler the backend pairs with a sampled image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    /// Linear filtering, clamp to edge
    LinearClamp,
    /// Nearest filtering, clamp to edge (G-buffer reads)
    NearestClamp,
    /// Linear filtering, repeat (material textures)
    LinearRepeat,
}

/// A concrete resource to bind into a descriptor set
#[derive(Clone)]
pub enum DescriptorResource {
    /// Sampled attachment in SHADER_READ_ONLY layout
    SampledImage(Arc<dyn Attachment>, SamplerKind),
    /// Storage attachment in GENERAL layout
    StorageImage(Arc<dyn Attachment>),
    /// Whole-buffer uniform binding
    UniformBuffer(Arc<dyn Buffer>),
}

/// One binding update
#[derive(Clone)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub resource: DescriptorResource,
}

/// Descriptor set layout trait (marker)
pub trait DescriptorSetLayout: Send + Sync {}

/// Descriptor set trait (marker)
///
/// The backend object holds the native handle; binding happens through
/// `CommandList::bind_descriptor_sets`.
pub trait DescriptorSet: Send + Sync {}
