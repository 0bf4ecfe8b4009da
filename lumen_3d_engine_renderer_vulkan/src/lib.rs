/*!
# Lumen 3D Engine - Vulkan Backend

Vulkan implementation of the `lumen_3d_engine` device traits, built on
`ash` for the bindings and `gpu-allocator` for memory.

```no_run
use lumen_3d_engine::lumen3d::{Config, RenderSystem};
use lumen_3d_engine_renderer_vulkan::VulkanGraphicsDevice;
use std::sync::Arc;
# fn run(window: &winit::window::Window) -> lumen_3d_engine::lumen3d::Result<()> {
let config = Config::default();
let device = VulkanGraphicsDevice::new(window, &config)?;
let size = window.inner_size();
let render_system = RenderSystem::new(Arc::new(device), &config, size.width, size.height)?;
# Ok(())
# }
```
*/

// Device and shared context
mod vulkan;
mod vulkan_context;
mod vulkan_physical_device;
mod vulkan_convert;

// GPU objects
mod vulkan_attachment;
mod vulkan_buffer;
mod vulkan_shader;
mod vulkan_sampler;
mod vulkan_render_pass;
mod vulkan_frame_buffer;
mod vulkan_descriptor_set;
mod vulkan_pipeline;

// Recording and presentation
mod vulkan_command_list;
mod vulkan_swapchain;

mod debug;

pub use vulkan::VulkanGraphicsDevice;

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
