/// Push-constant payloads
///
/// Layouts match the GLSL `push_constant` blocks of the pass shaders. All
/// stay within the 128 bytes every Vulkan device guarantees.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec4};

/// Per-model transform (depth, G, unlit and forward pipelines)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelPush {
    pub mvp: Mat4,
    pub model: Mat4,
}

/// Per-light volume draw in the compose pass
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ComposePush {
    pub mvp: Mat4,
    pub camera_position: Vec4,
    pub screen_size: Vec2,
    /// Index into the light uniform buffer
    pub light_index: u32,
    pub _pad: u32,
}

/// Sky background (reconstructs view rays from the inverse view-projection)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyPush {
    pub inv_view_proj: Mat4,
    pub camera_position: Vec4,
}

/// Bloom blur direction: 0 horizontal, 1 vertical
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct BloomPush {
    pub direction: u32,
}

impl BloomPush {
    pub const HORIZONTAL: Self = Self { direction: 0 };
    pub const VERTICAL: Self = Self { direction: 1 };
}

#[cfg(test)]
#[path = "push_constants_tests.rs"]
mod tests;
