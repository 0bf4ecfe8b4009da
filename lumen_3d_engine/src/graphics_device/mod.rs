/// Graphics device module - backend-agnostic GPU types and traits

// Module declarations
pub mod graphics_device;
pub mod attachment;
pub mod buffer;
pub mod shader;
pub mod pipeline;
pub mod render_pass;
pub mod frame_buffer;
pub mod descriptor_set;
pub mod command_list;
pub mod swapchain;

// Synchronization helpers shared by every backend
pub mod image_layout;
pub mod frame_slots;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use attachment::*;
pub use buffer::*;
pub use shader::*;
pub use pipeline::*;
pub use render_pass::*;
pub use frame_buffer::*;
pub use descriptor_set::*;
pub use command_list::*;
pub use swapchain::*;
pub use image_layout::*;
pub use frame_slots::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
