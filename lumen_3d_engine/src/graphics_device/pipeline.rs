/// Pipeline trait and pipeline descriptors

use std::sync::Arc;
use crate::graphics_device::{
    Shader, ShaderStage, RenderPass, DescriptorSetLayout, SampleCount,
};

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum VertexFormat {
    R32G32_SFLOAT,      // vec2 (8 bytes)
    R32G32B32_SFLOAT,   // vec3 (12 bytes)
    R32G32B32A32_SFLOAT, // vec4 (16 bytes)
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Format of the attribute
    pub format: VertexFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Single interleaved per-vertex binding
#[derive(Debug, Clone)]
pub struct VertexLayout {
    /// Stride in bytes between consecutive vertices
    pub stride: u32,
    /// Vertex attributes
    pub attributes: Vec<VertexAttribute>,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

/// Push constant range descriptor
#[derive(Debug, Clone)]
pub struct PushConstantRange {
    /// Shader stages that can access these push constants
    pub stages: Vec<ShaderStage>,
    /// Offset in bytes
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Depth testing state
///
/// The pass chain uses reversed-Z: depth is cleared to 0 and nearer
/// fragments have greater depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
    pub compare: CompareOp,
}

impl DepthState {
    /// No depth attachment interaction
    pub const DISABLED: Self = Self { test: false, write: false, compare: CompareOp::Always };
}

/// Blending applied to one color target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Overwrite
    Opaque,
    /// src * ONE + dst * ONE
    Additive,
    /// src * SRC_ALPHA + dst * (1 - SRC_ALPHA)
    Alpha,
}

/// Pipeline bind point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

/// Descriptor for creating a graphics pipeline
///
/// Viewport and scissor are always dynamic.
#[derive(Clone)]
pub struct GraphicsPipelineDesc {
    /// Vertex shader
    pub vertex_shader: Arc<dyn Shader>,
    /// Fragment shader (None for depth-only pipelines)
    pub fragment_shader: Option<Arc<dyn Shader>>,
    /// Vertex input (None for full-screen triangles generated in the shader)
    pub vertex_layout: Option<VertexLayout>,
    /// Face culling
    pub cull_mode: CullMode,
    /// Depth test/write
    pub depth: DepthState,
    /// One blend mode per color attachment of the subpass
    pub color_targets: Vec<BlendMode>,
    /// Descriptor set layouts, by set index
    pub descriptor_set_layouts: Vec<Arc<dyn DescriptorSetLayout>>,
    /// Push constant ranges
    pub push_constants: Vec<PushConstantRange>,
    /// Render pass the pipeline is compatible with
    pub render_pass: Arc<dyn RenderPass>,
    /// Rasterization samples
    pub samples: SampleCount,
}

/// Descriptor for creating a compute pipeline
#[derive(Clone)]
pub struct ComputePipelineDesc {
    /// Compute shader
    pub shader: Arc<dyn Shader>,
    /// Descriptor set layouts, by set index
    pub descriptor_set_layouts: Vec<Arc<dyn DescriptorSetLayout>>,
    /// Push constant ranges
    pub push_constants: Vec<PushConstantRange>,
}

/// Pipeline resource trait
///
/// Owns the pipeline and its pipeline layout. Implemented by backend
/// types (e.g., VulkanPipeline); destroyed when dropped.
pub trait Pipeline: Send + Sync {
    /// Graphics or compute
    fn bind_point(&self) -> PipelineBindPoint;
}
