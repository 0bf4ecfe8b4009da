/// CommandList - Vulkan implementation of the CommandList trait

use lumen_3d_engine::lumen3d::{Result, Error};
use lumen_3d_engine::lumen3d::device::{
    CommandList as CommandListTrait,
    RenderPass as RenderPassTrait,
    Framebuffer as FramebufferTrait,
    Pipeline as PipelineTrait,
    Buffer as BufferTrait,
    DescriptorSet as DescriptorSetTrait,
    ImageBarrier, IndexType, ShaderStage, Viewport, Rect2D, ClearValue,
};
use lumen_3d_engine::{engine_err, engine_error};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_attachment::Attachment;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::LOG_SOURCE;
use crate::vulkan_convert::{
    access_to_vk, aspect_to_vk, clear_value_to_vk, image_layout_to_vk, index_type_to_vk,
    pipeline_stage_to_vk, shader_stages_to_vk,
};
use crate::vulkan_descriptor_set::DescriptorSet;
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;

/// Vulkan command list implementation
///
/// Records rendering and compute commands for later submission to the GPU.
/// Each list owns its own pool so lists can be recorded independently.
pub struct CommandList {
    /// Vulkan device
    device: ash::Device,
    /// Command pool for allocating command buffers
    command_pool: vk::CommandPool,
    /// Command buffer for recording
    command_buffer: vk::CommandBuffer,
    /// Whether the command list is currently recording
    is_recording: bool,
    /// Whether we're inside a render pass
    in_render_pass: bool,
}

impl CommandList {
    /// Create a new command list
    ///
    /// # Arguments
    ///
    /// * `device` - Vulkan logical device
    /// * `graphics_queue_family` - Graphics queue family index
    pub(crate) fn new(device: ash::Device, graphics_queue_family: u32) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create command pool: {:?}", e))?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = match device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    device.destroy_command_pool(command_pool, None);
                    engine_error!(LOG_SOURCE, "Failed to allocate command buffer: {:?}", e);
                    return Err(Error::BackendError(format!("Failed to allocate command buffer: {:?}", e)));
                }
            };

            Ok(Self {
                device,
                command_pool,
                command_buffer,
                is_recording: false,
                in_render_pass: false,
            })
        }
    }

    /// Get the underlying Vulkan command buffer
    pub(crate) fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(list: &dyn CommandListTrait) -> &Self {
        unsafe { &*(list as *const dyn CommandListTrait as *const Self) }
    }

    fn ensure_recording(&self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }
        Ok(())
    }

    fn ensure_in_render_pass(&self) -> Result<()> {
        self.ensure_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        Ok(())
    }

    fn ensure_outside_render_pass(&self, command: &str) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError(format!("{} is not allowed inside a render pass", command)));
        }
        Ok(())
    }
}

impl CommandListTrait for CommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to begin command buffer: {:?}", e))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ensure_outside_render_pass("end")?;

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to end command buffer: {:?}", e))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to reset command buffer: {:?}", e))?;
        }

        self.is_recording = false;
        self.in_render_pass = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPassTrait>,
        framebuffer: &Arc<dyn FramebufferTrait>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.ensure_outside_render_pass("begin_render_pass")?;

        let vk_render_pass = RenderPass::from_dyn(render_pass.as_ref());
        let vk_framebuffer = Framebuffer::from_dyn(framebuffer.as_ref());

        let vk_clear_values: Vec<vk::ClearValue> = clear_values
            .iter()
            .map(clear_value_to_vk)
            .collect();

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: framebuffer.width(),
                    height: framebuffer.height(),
                },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.ensure_in_render_pass()?;

        unsafe {
            self.device.cmd_end_render_pass(self.command_buffer);
        }

        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording()?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording()?;

        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe {
            self.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn PipelineTrait>) -> Result<()> {
        self.ensure_recording()?;

        let vk_pipeline = Pipeline::from_dyn(pipeline.as_ref());
        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk_pipeline.vk_bind_point(),
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_descriptor_sets(
        &mut self,
        pipeline: &Arc<dyn PipelineTrait>,
        first_set: u32,
        sets: &[&Arc<dyn DescriptorSetTrait>],
    ) -> Result<()> {
        self.ensure_recording()?;

        let vk_pipeline = Pipeline::from_dyn(pipeline.as_ref());
        let vk_descriptor_sets: Vec<vk::DescriptorSet> = sets
            .iter()
            .map(|set| DescriptorSet::from_dyn(set.as_ref()).descriptor_set)
            .collect();

        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk_pipeline.vk_bind_point(),
                vk_pipeline.pipeline_layout,
                first_set,
                &vk_descriptor_sets,
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(
        &mut self,
        pipeline: &Arc<dyn PipelineTrait>,
        stages: &[ShaderStage],
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.ensure_recording()?;

        let vk_pipeline = Pipeline::from_dyn(pipeline.as_ref());
        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                vk_pipeline.pipeline_layout,
                shader_stages_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn BufferTrait>, offset: u64) -> Result<()> {
        self.ensure_recording()?;

        let vk_buffer = Buffer::from_dyn(buffer.as_ref());
        unsafe {
            self.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[vk_buffer.buffer],
                &[offset],
            );
        }
        Ok(())
    }

    fn bind_index_buffer(
        &mut self,
        buffer: &Arc<dyn BufferTrait>,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()> {
        self.ensure_recording()?;

        let vk_buffer = Buffer::from_dyn(buffer.as_ref());
        unsafe {
            self.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.ensure_in_render_pass()?;

        unsafe {
            self.device.cmd_draw(
                self.command_buffer,
                vertex_count,
                1, // instance_count
                first_vertex,
                0, // first_instance
            );
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.ensure_in_render_pass()?;

        unsafe {
            self.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                1, // instance_count
                first_index,
                vertex_offset,
                0, // first_instance
            );
        }
        Ok(())
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        self.ensure_outside_render_pass("dispatch")?;

        unsafe {
            self.device.cmd_dispatch(self.command_buffer, group_count_x, group_count_y, group_count_z);
        }
        Ok(())
    }

    fn image_barrier(&mut self, barrier: &ImageBarrier) -> Result<()> {
        self.ensure_outside_render_pass("image_barrier")?;

        let attachment = Attachment::from_dyn(barrier.attachment.as_ref());
        let vk_barrier = vk::ImageMemoryBarrier::default()
            .old_layout(image_layout_to_vk(barrier.old_layout))
            .new_layout(image_layout_to_vk(barrier.new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(attachment.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_to_vk(attachment.aspect),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(access_to_vk(barrier.src_access))
            .dst_access_mask(access_to_vk(barrier.dst_access));

        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                pipeline_stage_to_vk(barrier.src_stage),
                pipeline_stage_to_vk(barrier.dst_stage),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[vk_barrier],
            );
        }
        Ok(())
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Command buffer is freed with its pool
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
