/// GpuContext - Shared GPU resources for all Vulkan objects
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queue for command submission
/// - Command pool for one-shot operations (uploads, layout transitions)

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};
use lumen_3d_engine::lumen3d::Result;
use lumen_3d_engine::engine_err;

pub(crate) const LOG_SOURCE: &str = "lumen3d::vulkan";

/// Shared GPU context for all Vulkan resources.
///
/// This struct is shared (via `Arc`) by all GPU resources (attachments, buffers, etc.)
/// to avoid duplicating device/allocator/queue references in each resource.
///
/// Note: Device and instance destruction is handled by VulkanGraphicsDevice::drop()
/// so the teardown order stays explicit.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics + compute queue
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Reusable command pool for one-shot operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: Mutex<vk::CommandPool>,
}

impl GpuContext {
    pub fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(allocator),
            graphics_queue,
            graphics_queue_family,
            upload_command_pool: Mutex::new(upload_command_pool),
        }
    }

    /// Lock the allocator, turning a poisoned lock into an error
    pub(crate) fn lock_allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| engine_err!(LOG_SOURCE, "GPU allocator lock poisoned"))
    }

    /// Record and run a single command buffer, blocking until the queue is idle
    ///
    /// Used for staging copies and layout transitions outside the frame loop.
    pub(crate) fn submit_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let pool = self
            .upload_command_pool
            .lock()
            .map_err(|_| engine_err!(LOG_SOURCE, "Upload command pool lock poisoned"))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to allocate one-shot command buffer: {:?}", e))?;
            let command_buffer = command_buffers[0];

            let result = (|| -> Result<()> {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                self.device.begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| engine_err!(LOG_SOURCE, "Failed to begin one-shot command buffer: {:?}", e))?;

                record(command_buffer);

                self.device.end_command_buffer(command_buffer)
                    .map_err(|e| engine_err!(LOG_SOURCE, "Failed to end one-shot command buffer: {:?}", e))?;

                let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                self.device.queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| engine_err!(LOG_SOURCE, "Failed to submit one-shot command buffer: {:?}", e))?;
                self.device.queue_wait_idle(self.graphics_queue)
                    .map_err(|e| engine_err!(LOG_SOURCE, "Failed to wait for one-shot submission: {:?}", e))
            })();

            self.device.free_command_buffers(*pool, &command_buffers);
            result
        }
    }
}
