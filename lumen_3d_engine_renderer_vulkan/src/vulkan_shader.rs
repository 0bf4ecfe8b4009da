/// Shader - Vulkan implementation of the Shader trait

use ash::vk;
use std::ffi::CString;
use lumen_3d_engine::lumen3d::device::{Shader as ShaderTrait, ShaderStage};

/// Vulkan shader implementation
pub struct Shader {
    /// Vulkan shader module
    pub(crate) module: vk::ShaderModule,
    /// Engine stage (the pipeline derives the Vulkan stage from it)
    pub(crate) stage: ShaderStage,
    /// Entry point name
    pub(crate) entry_point: CString,
    /// Vulkan device (for cleanup)
    pub(crate) device: ash::Device,
}

impl Shader {
    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(shader: &dyn ShaderTrait) -> &Self {
        unsafe { &*(shader as *const dyn ShaderTrait as *const Self) }
    }
}

impl ShaderTrait for Shader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
