/// Mock graphics device for unit tests (no GPU required)
///
/// Records every creation, descriptor write, transition and submission, and
/// lets command lists append to a shared log so passes and the frame
/// orchestrator can be checked without a backend. Creation calls validate
/// the same compatibility rules a driver would reject (attachment counts,
/// extents, descriptor types).

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, SampleCount, Attachment, AttachmentDesc, AttachmentUsage, TextureFormat,
    Buffer, BufferUsage, Shader, ShaderDesc, ShaderStage, RenderPass, RenderPassDesc,
    Framebuffer, FramebufferDesc, DescriptorSetLayout, DescriptorSet, DescriptorBinding,
    DescriptorType, DescriptorWrite, DescriptorResource, Pipeline, PipelineBindPoint,
    GraphicsPipelineDesc, ComputePipelineDesc, CommandList, Swapchain, AcquireResult,
    PresentResult, ImageLayout, ImageBarrier, IndexType, Viewport, Rect2D, ClearValue,
    FrameSlotTracker, PipelineStage, Access, aspect_for_usage, transition_masks,
    validate_texture_data,
};
use crate::config::MAX_FRAMES_IN_FLIGHT;

/// Address of the object behind an `Arc`, used as a stable identity
pub fn ptr_id<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as *const () as usize
}

// ============================================================================
// Mock resources
// ============================================================================

#[derive(Debug)]
pub struct MockAttachment {
    pub desc: AttachmentDesc,
    pub swapchain_image: bool,
}

impl Attachment for MockAttachment {
    fn format(&self) -> TextureFormat { self.desc.format }
    fn usage(&self) -> AttachmentUsage { self.desc.usage }
    fn samples(&self) -> SampleCount { self.desc.samples }
    fn width(&self) -> u32 { self.desc.width }
    fn height(&self) -> u32 { self.desc.height }
}

#[derive(Debug)]
pub struct MockBuffer {
    pub usage: BufferUsage,
    pub host_visible: bool,
    data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(data: Vec<u8>, usage: BufferUsage, host_visible: bool) -> Self {
        Self { usage, host_visible, data: Mutex::new(data) }
    }

    /// Snapshot of the buffer contents
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.host_visible {
            return Err(Error::InvalidResource("buffer is not host-visible".to_string()));
        }
        let mut contents = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} exceeds buffer size {}",
                data.len(), offset, contents.len()
            )));
        }
        contents[start..end].copy_from_slice(data);
        Ok(())
    }

    fn mapped_ptr(&self) -> Option<*mut u8> {
        if self.host_visible {
            Some(self.data.lock().unwrap().as_mut_ptr())
        } else {
            None
        }
    }

    fn size(&self) -> u64 {
        self.data.lock().unwrap().len() as u64
    }
}

#[derive(Debug)]
pub struct MockShader {
    pub stage: ShaderStage,
    pub word_count: usize,
}

impl Shader for MockShader {
    fn stage(&self) -> ShaderStage { self.stage }
}

#[derive(Debug)]
pub struct MockRenderPass {
    pub desc: RenderPassDesc,
}

impl RenderPass for MockRenderPass {
    fn color_attachment_count(&self) -> usize { self.desc.color_attachments.len() }
    fn has_depth_attachment(&self) -> bool { self.desc.depth_attachment.is_some() }
}

pub struct MockFramebuffer {
    pub width: u32,
    pub height: u32,
    pub attachments: Vec<Arc<dyn Attachment>>,
}

impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 { self.width }
    fn height(&self) -> u32 { self.height }
}

pub struct MockDescriptorSetLayout {
    pub bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayout for MockDescriptorSetLayout {}

pub struct MockDescriptorSet {
    pub index: usize,
}

impl DescriptorSet for MockDescriptorSet {}

#[derive(Debug)]
pub struct MockPipeline {
    pub bind_point: PipelineBindPoint,
    pub set_layout_count: usize,
}

impl Pipeline for MockPipeline {
    fn bind_point(&self) -> PipelineBindPoint { self.bind_point }
}

// ============================================================================
// Mock command list
// ============================================================================

/// One recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Begin,
    End,
    BeginRenderPass { render_pass: usize, width: u32, height: u32, clear_values: Vec<ClearValue> },
    EndRenderPass,
    Reset,
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindPipeline { pipeline: usize, bind_point: PipelineBindPoint },
    BindDescriptorSets { first_set: u32, sets: Vec<usize> },
    PushConstants { offset: u32, data: Vec<u8> },
    BindVertexBuffer,
    BindIndexBuffer(IndexType),
    Draw { vertex_count: u32 },
    DrawIndexed { index_count: u32 },
    Dispatch(u32, u32, u32),
    ImageBarrier {
        format: TextureFormat,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Access,
        dst_access: Access,
    },
}

pub struct MockCommandList {
    log: Arc<Mutex<Vec<RecordedCommand>>>,
    recording: bool,
    in_render_pass: bool,
}

impl MockCommandList {
    fn push(&self, command: RecordedCommand) -> Result<()> {
        if !self.recording {
            return Err(Error::BackendError(format!("{:?} recorded outside begin/end", command)));
        }
        self.log.lock().unwrap().push(command);
        Ok(())
    }

    fn require_render_pass(&self, inside: bool, what: &str) -> Result<()> {
        if self.in_render_pass != inside {
            return Err(Error::BackendError(format!(
                "{} {} a render pass",
                what,
                if inside { "requires" } else { "is not allowed inside" }
            )));
        }
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            return Err(Error::BackendError("command list already recording".to_string()));
        }
        self.recording = true;
        self.push(RecordedCommand::Begin)
    }

    fn end(&mut self) -> Result<()> {
        self.require_render_pass(false, "end")?;
        self.push(RecordedCommand::End)?;
        self.recording = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.log.lock().unwrap().push(RecordedCommand::Reset);
        self.recording = false;
        self.in_render_pass = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.require_render_pass(false, "begin_render_pass")?;
        self.push(RecordedCommand::BeginRenderPass {
            render_pass: ptr_id(render_pass),
            width: framebuffer.width(),
            height: framebuffer.height(),
            clear_values: clear_values.to_vec(),
        })?;
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.require_render_pass(true, "end_render_pass")?;
        self.push(RecordedCommand::EndRenderPass)?;
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.push(RecordedCommand::SetViewport(viewport))
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.push(RecordedCommand::SetScissor(scissor))
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        let inside = pipeline.bind_point() == PipelineBindPoint::Graphics;
        self.require_render_pass(inside, "bind_pipeline")?;
        self.push(RecordedCommand::BindPipeline {
            pipeline: ptr_id(pipeline),
            bind_point: pipeline.bind_point(),
        })
    }

    fn bind_descriptor_sets(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        first_set: u32,
        sets: &[&Arc<dyn DescriptorSet>],
    ) -> Result<()> {
        self.push(RecordedCommand::BindDescriptorSets {
            first_set,
            sets: sets.iter().map(|s| ptr_id(*s)).collect(),
        })
    }

    fn push_constants(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        _stages: &[ShaderStage],
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.push(RecordedCommand::PushConstants { offset, data: data.to_vec() })
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.push(RecordedCommand::BindVertexBuffer)
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64, index_type: IndexType) -> Result<()> {
        self.push(RecordedCommand::BindIndexBuffer(index_type))
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.require_render_pass(true, "draw")?;
        self.push(RecordedCommand::Draw { vertex_count })
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.require_render_pass(true, "draw_indexed")?;
        self.push(RecordedCommand::DrawIndexed { index_count })
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.require_render_pass(false, "dispatch")?;
        self.push(RecordedCommand::Dispatch(x, y, z))
    }

    fn image_barrier(&mut self, barrier: &ImageBarrier) -> Result<()> {
        self.require_render_pass(false, "image_barrier")?;
        self.push(RecordedCommand::ImageBarrier {
            format: barrier.attachment.format(),
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
            src_stage: barrier.src_stage,
            dst_stage: barrier.dst_stage,
            src_access: barrier.src_access,
            dst_access: barrier.dst_access,
        })
    }
}

// ============================================================================
// Mock swapchain
// ============================================================================

/// Shared swapchain state, inspectable and scriptable from tests
pub struct MockSwapchainState {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub images: Vec<Arc<dyn Attachment>>,
    pub tracker: FrameSlotTracker,
    /// Image indices handed out in order (cycled); empty means 0, 1, 2, ...
    pub acquire_pattern: Vec<u32>,
    acquire_cursor: usize,
    /// Next acquire reports OutOfDate
    pub acquire_out_of_date: bool,
    /// Results returned by upcoming presents (Presented once empty)
    pub present_results: VecDeque<PresentResult>,
    /// Image count used by the next recreate
    pub next_image_count: Option<usize>,
    /// Slot active at every successful acquire
    pub slot_history: Vec<usize>,
    /// Image index of every successful acquire
    pub acquired: Vec<u32>,
    /// Slots waited on because their image was reacquired by another slot
    pub image_fence_waits: Vec<usize>,
    pub presented: Vec<u32>,
    pub recreate_count: usize,
}

fn swapchain_images(count: usize, width: u32, height: u32, format: TextureFormat) -> Vec<Arc<dyn Attachment>> {
    (0..count)
        .map(|_| {
            Arc::new(MockAttachment {
                desc: AttachmentDesc {
                    format,
                    usage: AttachmentUsage::COLOR,
                    samples: SampleCount::S1,
                    width,
                    height,
                },
                swapchain_image: true,
            }) as Arc<dyn Attachment>
        })
        .collect()
}

impl MockSwapchainState {
    fn new(image_count: usize, width: u32, height: u32) -> Self {
        let format = TextureFormat::B8G8R8A8_SRGB;
        Self {
            width,
            height,
            format,
            images: swapchain_images(image_count, width, height, format),
            tracker: FrameSlotTracker::new(MAX_FRAMES_IN_FLIGHT, image_count),
            acquire_pattern: Vec::new(),
            acquire_cursor: 0,
            acquire_out_of_date: false,
            present_results: VecDeque::new(),
            next_image_count: None,
            slot_history: Vec::new(),
            acquired: Vec::new(),
            image_fence_waits: Vec::new(),
            presented: Vec::new(),
            recreate_count: 0,
        }
    }
}

pub struct MockSwapchain {
    pub state: Arc<Mutex<MockSwapchainState>>,
}

impl MockSwapchain {
    pub fn new(image_count: usize, width: u32, height: u32) -> Self {
        Self { state: Arc::new(Mutex::new(MockSwapchainState::new(image_count, width, height))) }
    }
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self) -> Result<AcquireResult> {
        let mut state = self.state.lock().unwrap();
        if state.acquire_out_of_date {
            state.acquire_out_of_date = false;
            return Ok(AcquireResult::OutOfDate);
        }

        let image_count = state.images.len();
        let index = if state.acquire_pattern.is_empty() {
            (state.acquire_cursor % image_count) as u32
        } else {
            state.acquire_pattern[state.acquire_cursor % state.acquire_pattern.len()]
        };
        state.acquire_cursor += 1;

        let slot = state.tracker.current_slot();
        state.slot_history.push(slot);
        state.acquired.push(index);
        if let Some(previous) = state.tracker.claim_image(index as usize) {
            state.image_fence_waits.push(previous);
        }
        Ok(AcquireResult::Image(index))
    }

    fn present(&mut self, image_index: u32) -> Result<PresentResult> {
        let mut state = self.state.lock().unwrap();
        state.presented.push(image_index);
        state.tracker.advance();
        Ok(state.present_results.pop_front().unwrap_or(PresentResult::Presented))
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let image_count = state.next_image_count.take().unwrap_or(state.images.len());
        state.width = width;
        state.height = height;
        state.images = swapchain_images(image_count, width, height, state.format);
        state.tracker.reset_images(image_count);
        state.acquire_cursor = 0;
        state.recreate_count += 1;
        Ok(())
    }

    fn image_count(&self) -> usize { self.state.lock().unwrap().images.len() }
    fn width(&self) -> u32 { self.state.lock().unwrap().width }
    fn height(&self) -> u32 { self.state.lock().unwrap().height }
    fn format(&self) -> TextureFormat { self.state.lock().unwrap().format }

    fn image_attachments(&self) -> Vec<Arc<dyn Attachment>> {
        self.state.lock().unwrap().images.clone()
    }

    fn current_frame_slot(&self) -> usize {
        self.state.lock().unwrap().tracker.current_slot()
    }
}

// ============================================================================
// Mock graphics device
// ============================================================================

/// Slot and image of one `submit_with_swapchain` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitRecord {
    pub slot: usize,
    pub image_index: u32,
    pub command_lists: usize,
}

struct SetRecord {
    layout: Vec<DescriptorBinding>,
    writes: FxHashMap<u32, DescriptorResource>,
}

#[derive(Default)]
pub struct MockDeviceStats {
    pub attachments_created: usize,
    pub buffers_created: usize,
    pub shaders_created: usize,
    pub render_passes_created: usize,
    pub framebuffers_created: usize,
    pub set_layouts_created: usize,
    pub descriptor_sets_allocated: usize,
    pub descriptor_writes: usize,
    pub pipelines_created: usize,
    pub wait_idle_calls: usize,
    pub transitions: Vec<(ImageLayout, ImageLayout)>,
    pub submissions: Vec<SubmitRecord>,
}

pub struct MockGraphicsDevice {
    pub stats: Mutex<MockDeviceStats>,
    pub command_log: Arc<Mutex<Vec<RecordedCommand>>>,
    pub host_buffers: Mutex<Vec<Arc<MockBuffer>>>,
    pub swapchain_image_count: usize,
    pub msaa: SampleCount,
    layouts: Mutex<FxHashMap<usize, Vec<DescriptorBinding>>>,
    sets: Mutex<FxHashMap<usize, SetRecord>>,
    next_set_index: AtomicUsize,
    last_swapchain: Mutex<Option<Arc<Mutex<MockSwapchainState>>>>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self::with_swapchain_images(3)
    }

    pub fn with_swapchain_images(swapchain_image_count: usize) -> Self {
        Self {
            stats: Mutex::new(MockDeviceStats::default()),
            command_log: Arc::new(Mutex::new(Vec::new())),
            host_buffers: Mutex::new(Vec::new()),
            swapchain_image_count,
            msaa: SampleCount::S4,
            layouts: Mutex::new(FxHashMap::default()),
            sets: Mutex::new(FxHashMap::default()),
            next_set_index: AtomicUsize::new(0),
            last_swapchain: Mutex::new(None),
        }
    }

    /// State of the most recently created swapchain
    pub fn swapchain_state(&self) -> Option<Arc<Mutex<MockSwapchainState>>> {
        self.last_swapchain.lock().unwrap().clone()
    }

    /// Resource currently written at `binding` of `set`
    pub fn bound_resource(&self, set: &Arc<dyn DescriptorSet>, binding: u32) -> Option<DescriptorResource> {
        self.sets
            .lock()
            .unwrap()
            .get(&ptr_id(set))
            .and_then(|record| record.writes.get(&binding).cloned())
    }

    /// Commands recorded since the last `Begin`
    pub fn last_frame_commands(&self) -> Vec<RecordedCommand> {
        let log = self.command_log.lock().unwrap();
        let start = log.iter().rposition(|c| *c == RecordedCommand::Begin).unwrap_or(0);
        log[start..].to_vec()
    }

    pub fn clear_command_log(&self) {
        self.command_log.lock().unwrap().clear();
    }
}

fn stages_or_error(stages: &[ShaderStage], what: &str) -> Result<()> {
    if stages.is_empty() {
        return Err(Error::InvalidResource(format!("{} has no shader stages", what)));
    }
    Ok(())
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_attachment(&self, desc: &AttachmentDesc) -> Result<Arc<dyn Attachment>> {
        aspect_for_usage(desc.usage, desc.format)?;
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource("zero-sized attachment".to_string()));
        }
        self.stats.lock().unwrap().attachments_created += 1;
        Ok(Arc::new(MockAttachment { desc: *desc, swapchain_image: false }))
    }

    fn create_host_buffer(&self, size: u64, usage: BufferUsage) -> Result<Arc<dyn Buffer>> {
        let buffer = Arc::new(MockBuffer::new(vec![0; size as usize], usage, true));
        self.host_buffers.lock().unwrap().push(Arc::clone(&buffer));
        self.stats.lock().unwrap().buffers_created += 1;
        Ok(buffer)
    }

    fn create_device_buffer(&self, data: &[u8], usage: BufferUsage) -> Result<Arc<dyn Buffer>> {
        if data.is_empty() {
            return Err(Error::InvalidResource("empty device buffer".to_string()));
        }
        self.stats.lock().unwrap().buffers_created += 1;
        Ok(Arc::new(MockBuffer::new(data.to_vec(), usage, false)))
    }

    fn create_texture(
        &self,
        format: TextureFormat,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Arc<dyn Attachment>> {
        validate_texture_data(format, width, height, pixels.len())?;
        let mut stats = self.stats.lock().unwrap();
        stats.attachments_created += 1;
        stats.transitions.push((ImageLayout::Undefined, ImageLayout::TransferDst));
        stats.transitions.push((ImageLayout::TransferDst, ImageLayout::ShaderReadOnly));
        let desc = AttachmentDesc {
            format,
            usage: AttachmentUsage::COLOR,
            samples: SampleCount::S1,
            width,
            height,
        };
        Ok(Arc::new(MockAttachment { desc, swapchain_image: false }))
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<Arc<dyn Shader>> {
        if desc.code.is_empty() {
            return Err(Error::InvalidResource("empty SPIR-V".to_string()));
        }
        self.stats.lock().unwrap().shaders_created += 1;
        Ok(Arc::new(MockShader { stage: desc.stage, word_count: desc.code.len() }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        if desc.color_attachments.is_empty() && desc.depth_attachment.is_none() {
            return Err(Error::InvalidResource("render pass without attachments".to_string()));
        }
        self.stats.lock().unwrap().render_passes_created += 1;
        Ok(Arc::new(MockRenderPass { desc: desc.clone() }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        let expected = desc.render_pass.color_attachment_count()
            + usize::from(desc.render_pass.has_depth_attachment());
        if desc.attachments.len() != expected {
            return Err(Error::InvalidResource(format!(
                "framebuffer has {} attachments, render pass expects {}",
                desc.attachments.len(), expected
            )));
        }
        if let Some(bad) = desc
            .attachments
            .iter()
            .find(|a| a.width() != desc.width || a.height() != desc.height)
        {
            return Err(Error::InvalidResource(format!(
                "attachment {}x{} does not match framebuffer {}x{}",
                bad.width(), bad.height(), desc.width, desc.height
            )));
        }
        self.stats.lock().unwrap().framebuffers_created += 1;
        Ok(Arc::new(MockFramebuffer {
            width: desc.width,
            height: desc.height,
            attachments: desc.attachments.clone(),
        }))
    }

    fn create_descriptor_set_layout(&self, bindings: &[DescriptorBinding]) -> Result<Arc<dyn DescriptorSetLayout>> {
        for binding in bindings {
            stages_or_error(&binding.stages, "descriptor binding")?;
        }
        self.stats.lock().unwrap().set_layouts_created += 1;
        let layout: Arc<dyn DescriptorSetLayout> =
            Arc::new(MockDescriptorSetLayout { bindings: bindings.to_vec() });
        self.layouts.lock().unwrap().insert(ptr_id(&layout), bindings.to_vec());
        Ok(layout)
    }

    fn allocate_descriptor_sets(
        &self,
        layout: &Arc<dyn DescriptorSetLayout>,
        count: usize,
    ) -> Result<Vec<Arc<dyn DescriptorSet>>> {
        let layout_bindings = self
            .layouts
            .lock()
            .unwrap()
            .get(&ptr_id(layout))
            .cloned()
            .ok_or_else(|| Error::InvalidResource("unknown descriptor set layout".to_string()))?;
        let mut sets = self.sets.lock().unwrap();
        let mut result = Vec::with_capacity(count);
        for _ in 0..count {
            let set: Arc<dyn DescriptorSet> = Arc::new(MockDescriptorSet {
                index: self.next_set_index.fetch_add(1, Ordering::Relaxed),
            });
            sets.insert(ptr_id(&set), SetRecord {
                layout: layout_bindings.clone(),
                writes: FxHashMap::default(),
            });
            result.push(set);
        }
        self.stats.lock().unwrap().descriptor_sets_allocated += count;
        Ok(result)
    }

    fn update_descriptor_set(&self, set: &Arc<dyn DescriptorSet>, writes: &[DescriptorWrite]) -> Result<()> {
        let mut sets = self.sets.lock().unwrap();
        let record = sets
            .get_mut(&ptr_id(set))
            .ok_or_else(|| Error::InvalidResource("unknown descriptor set".to_string()))?;

        for write in writes {
            let binding = record
                .layout
                .iter()
                .find(|b| b.binding == write.binding)
                .ok_or_else(|| Error::InvalidResource(format!("no binding {} in layout", write.binding)))?;
            let matches = matches!(
                (&write.resource, binding.descriptor_type),
                (DescriptorResource::SampledImage(..), DescriptorType::CombinedImageSampler)
                    | (DescriptorResource::StorageImage(_), DescriptorType::StorageImage)
                    | (DescriptorResource::UniformBuffer(_), DescriptorType::UniformBuffer)
            );
            if !matches {
                return Err(Error::InvalidResource(format!(
                    "binding {} is {:?}", write.binding, binding.descriptor_type
                )));
            }
            record.writes.insert(write.binding, write.resource.clone());
        }
        self.stats.lock().unwrap().descriptor_writes += writes.len();
        Ok(())
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn Pipeline>> {
        if desc.color_targets.len() != desc.render_pass.color_attachment_count() {
            return Err(Error::InvalidResource(format!(
                "{} blend targets for {} color attachments",
                desc.color_targets.len(),
                desc.render_pass.color_attachment_count()
            )));
        }
        if desc.depth.test && !desc.render_pass.has_depth_attachment() {
            return Err(Error::InvalidResource("depth test without depth attachment".to_string()));
        }
        for range in &desc.push_constants {
            stages_or_error(&range.stages, "push constant range")?;
        }
        self.stats.lock().unwrap().pipelines_created += 1;
        Ok(Arc::new(MockPipeline {
            bind_point: PipelineBindPoint::Graphics,
            set_layout_count: desc.descriptor_set_layouts.len(),
        }))
    }

    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Result<Arc<dyn Pipeline>> {
        if desc.shader.stage() != ShaderStage::Compute {
            return Err(Error::InvalidResource("compute pipeline needs a compute shader".to_string()));
        }
        self.stats.lock().unwrap().pipelines_created += 1;
        Ok(Arc::new(MockPipeline {
            bind_point: PipelineBindPoint::Compute,
            set_layout_count: desc.descriptor_set_layouts.len(),
        }))
    }

    fn transition_image_layout(
        &self,
        _attachment: &Arc<dyn Attachment>,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
        _mip_levels: u32,
        _layer_count: u32,
    ) -> Result<()> {
        transition_masks(old_layout, new_layout)?;
        self.stats.lock().unwrap().transitions.push((old_layout, new_layout));
        Ok(())
    }

    fn create_swapchain(&self, width: u32, height: u32) -> Result<Box<dyn Swapchain>> {
        let swapchain = MockSwapchain::new(self.swapchain_image_count, width, height);
        *self.last_swapchain.lock().unwrap() = Some(Arc::clone(&swapchain.state));
        Ok(Box::new(swapchain))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            log: Arc::clone(&self.command_log),
            recording: false,
            in_render_pass: false,
        }))
    }

    fn submit_with_swapchain(
        &self,
        commands: &[&dyn CommandList],
        swapchain: &dyn Swapchain,
        image_index: u32,
    ) -> Result<()> {
        self.stats.lock().unwrap().submissions.push(SubmitRecord {
            slot: swapchain.current_frame_slot(),
            image_index,
            command_lists: commands.len(),
        });
        Ok(())
    }

    fn msaa_samples(&self) -> SampleCount {
        self.msaa
    }

    fn wait_idle(&self) -> Result<()> {
        self.stats.lock().unwrap().wait_idle_calls += 1;
        Ok(())
    }
}

// ============================================================================
// Shader fixture
// ============================================================================

const FIXTURE_SHADERS: [&str; 15] = [
    "depth.vert.spv",
    "gpass.vert.spv",
    "gpass.frag.spv",
    "lighting.vert.spv",
    "lighting.frag.spv",
    "lighting_fullscreen.vert.spv",
    "sky.vert.spv",
    "sky.frag.spv",
    "unlit.vert.spv",
    "unlit.frag.spv",
    "forward.vert.spv",
    "forward.frag.spv",
    "bloom.comp.spv",
    "post.vert.spv",
    "post.frag.spv",
];

static FIXTURE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh temp directory holding a minimal SPIR-V file for every pass shader
pub fn shader_fixture_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "lumen3d_shaders_{}_{}",
        std::process::id(),
        FIXTURE_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).unwrap();

    // magic, version 1.0, generator, bound, schema
    let words: [u32; 5] = [0x0723_0203, 0x0001_0000, 0, 1, 0];
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    for name in FIXTURE_SHADERS {
        std::fs::write(dir.join(name), &bytes).unwrap();
    }
    dir
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
