/// Shader trait and shader descriptor

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

/// Descriptor for creating a shader module
#[derive(Debug, Clone, Copy)]
pub struct ShaderDesc<'a> {
    /// Pipeline stage the module is used for
    pub stage: ShaderStage,
    /// SPIR-V words
    pub code: &'a [u32],
    /// Entry point name
    pub entry_point: &'a str,
}

/// Shader module trait
///
/// Implemented by backend-specific shader types (e.g., VulkanShader).
pub trait Shader: Send + Sync {
    fn stage(&self) -> ShaderStage;
}
