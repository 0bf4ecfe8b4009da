/// Buffer - Vulkan implementation of the Buffer trait

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;
use lumen_3d_engine::lumen3d::{Error, Result};
use lumen_3d_engine::lumen3d::device::Buffer as BufferTrait;
use lumen_3d_engine::engine_error;

use crate::vulkan_context::{GpuContext, LOG_SOURCE};

/// Vulkan buffer implementation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size
    pub(crate) size: u64,
}

impl Buffer {
    pub fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
    ) -> Self {
        Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size,
        }
    }

    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(buffer: &dyn BufferTrait) -> &Self {
        unsafe { &*(buffer as *const dyn BufferTrait as *const Self) }
    }
}

impl BufferTrait for Buffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            engine_error!(LOG_SOURCE, "Buffer update out of range: offset {} + {} bytes > size {}",
                offset, data.len(), self.size);
            return Err(Error::InvalidResource(format!(
                "buffer update of {} bytes at offset {} exceeds size {}",
                data.len(), offset, self.size
            )));
        }

        let mapped_ptr = self.mapped_ptr().ok_or_else(|| {
            engine_error!(LOG_SOURCE, "Buffer update failed: buffer is not CPU-accessible");
            Error::InvalidResource("buffer is not CPU-accessible".to_string())
        })?;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn mapped_ptr(&self) -> Option<*mut u8> {
        self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .map(|ptr| ptr.as_ptr() as *mut u8)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
