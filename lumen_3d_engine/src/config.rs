/// Renderer configuration and compile-time capacities

use std::path::PathBuf;

/// Number of frames the CPU may record ahead of the GPU.
///
/// Independent of the swapchain image count. Frame slots advance with
/// `(slot + 1) % MAX_FRAMES_IN_FLIGHT`.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Capacity of the per-image light uniform buffer
pub const MAX_LIGHTS: usize = 32;

/// Descriptor sets per descriptor pool (a new pool is created when one runs dry)
pub const DESCRIPTOR_POOL_MAX_SETS: u32 = 1024;

/// Local workgroup edge of the bloom compute shader
pub const BLOOM_WORKGROUP_SIZE: u32 = 16;

/// Clear color of the compose target: a dark teal.
///
/// With no geometry and no lights this is what reaches the swapchain.
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.18, 0.2, 1.0];

/// Validation message severity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only validation errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything, including info and verbose messages
    All,
}

/// Point-light attenuation: `1 / (constant + linear * d + quadratic * d^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightFalloff {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for LightFalloff {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl LightFalloff {
    /// Distance at which a light of the given peak intensity falls below 1/256.
    ///
    /// Used to scale light volumes. Returns `None` when the attenuation never
    /// drops that low (no quadratic or linear term).
    pub fn cutoff_radius(&self, peak: f32) -> Option<f32> {
        let threshold = 256.0 * peak.max(0.0);
        let c = self.constant - threshold;
        if self.quadratic > 0.0 {
            let disc = self.linear * self.linear - 4.0 * self.quadratic * c;
            Some(((-self.linear + disc.max(0.0).sqrt()) / (2.0 * self.quadratic)).max(0.0))
        } else if self.linear > 0.0 {
            Some((-c / self.linear).max(0.0))
        } else {
            None
        }
    }
}

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation layers and the debug messenger
    pub enable_validation: bool,
    /// Which validation messages are forwarded to the engine logger
    pub debug_severity: DebugSeverity,
    /// Count validation messages by severity
    pub enable_validation_stats: bool,
    /// Application name reported to the driver
    pub app_name: String,
    /// Directory holding the precompiled SPIR-V binaries
    pub shader_dir: PathBuf,
    /// Record the forward (transparent) pass after composition
    pub enable_forward_pass: bool,
    /// Compose target clear color
    pub clear_color: [f32; 4],
    /// Attenuation written into every light buffer
    pub falloff: LightFalloff,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            enable_validation_stats: false,
            app_name: "Lumen3D Application".to_string(),
            shader_dir: PathBuf::from("shaders"),
            enable_forward_pass: true,
            clear_color: CLEAR_COLOR,
            falloff: LightFalloff::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
