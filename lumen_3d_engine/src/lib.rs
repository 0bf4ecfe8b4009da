/*!
# Lumen 3D Engine

Core traits and the deferred pass chain of the Lumen 3D renderer.

The crate is backend-agnostic: every GPU object sits behind a trait
(`GraphicsDevice`, `Swapchain`, `Attachment`, `CommandList`, ...) and a
backend crate provides the concrete implementation. The render module
builds the frame on top of those traits:

- **DepthPass**: depth pre-pass (reversed-Z)
- **GPass**: position, normal and albedo G-buffer
- **ComposePass**: light volumes, sky and unlit models into an HDR target plus a bloom source
- **ForwardPass**: sorted transparent models over the composed image
- **BloomPass**: separable compute blur of the bloom source
- **PostPass**: composite onto the swapchain image, then the overlay hook
- **RenderSystem**: acquire, record, submit, present and recreate
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod render;

// Main lumen3d namespace module
pub mod lumen3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logger)
    pub use crate::engine::Engine;

    // Configuration and limits
    pub use crate::config::*;

    // Device factory trait and the frame orchestrator
    pub use crate::graphics_device::GraphicsDevice;
    pub use crate::render::{FrameStatus, RenderSystem};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend-facing GPU types
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Passes, scene data and push constant layouts
    pub mod render {
        pub use crate::render::*;
    }
}

// Re-export math and POD libraries at crate root
pub use glam;
pub use bytemuck;
