/// RenderSystem - per-frame orchestration of the pass chain
///
/// Owns the swapchain, one command list per frame slot and the six passes.
/// A frame is: acquire, record depth -> G -> compose -> forward -> bloom ->
/// post (+ overlay), submit, present. An out-of-date or suboptimal
/// swapchain, or a pending resize, triggers a full recreate: device idle,
/// swapchain first, then every pass in order.

use std::sync::Arc;
use crate::config::{Config, MAX_FRAMES_IN_FLIGHT};
use crate::error::Result;
use crate::graphics_device::{
    AcquireResult, CommandList, DescriptorSetLayout, GraphicsDevice, PresentResult, RenderPass,
    Swapchain,
};
use crate::render::{
    BloomPass, ComposePass, DepthPass, ForwardPass, FrameScene, GPass, OverlayHook,
    PassFrameBuffer, PostPass,
};
use crate::{engine_debug, engine_info, engine_warn};

const LOG_SOURCE: &str = "lumen3d::RenderSystem";

/// What `render_frame` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Recorded, submitted and presented
    Rendered,
    /// Swapchain and passes were rebuilt (the frame may not have been presented)
    Recreated,
    /// Nothing to render into (zero-sized window)
    Skipped,
}

/// The six passes in recording order
struct PassChain {
    depth: DepthPass,
    g: GPass,
    compose: ComposePass,
    forward: Option<ForwardPass>,
    bloom: BloomPass,
    post: PostPass,
}

impl PassChain {
    fn new(device: &dyn GraphicsDevice, config: &Config, swapchain: &dyn Swapchain) -> Result<Self> {
        let (width, height) = (swapchain.width(), swapchain.height());
        let images = swapchain.image_attachments();
        let image_count = images.len();

        let depth = DepthPass::new(device, config, width, height, image_count)?;
        let shared_depth = Arc::clone(depth.depth_attachment());
        let g = GPass::new(device, config, width, height, image_count, &shared_depth)?;
        let compose = ComposePass::new(device, config, width, height, image_count, &g, &shared_depth)?;
        let forward = if config.enable_forward_pass {
            Some(ForwardPass::new(device, config, width, height, image_count, &g, &compose, &shared_depth)?)
        } else {
            None
        };
        let bloom = BloomPass::new(device, config, width, height, image_count, &compose)?;
        let post = PostPass::new(device, config, width, height, swapchain.format(), &images, &compose)?;

        Ok(Self { depth, g, compose, forward, bloom, post })
    }

    /// Tear down every bundle, last consumer first
    fn destroy(&mut self) {
        self.post.destroy();
        self.bloom.destroy();
        if let Some(forward) = &mut self.forward {
            forward.destroy();
        }
        self.compose.destroy();
        self.g.destroy();
        self.depth.destroy();
    }

    fn recreate(&mut self, device: &dyn GraphicsDevice, swapchain: &dyn Swapchain) -> Result<()> {
        let (width, height) = (swapchain.width(), swapchain.height());
        let images = swapchain.image_attachments();
        let image_count = images.len();

        self.depth.recreate_framebuffer(device, width, height, image_count)?;
        let shared_depth = Arc::clone(self.depth.depth_attachment());
        self.g.recreate_framebuffer(device, width, height, image_count, &shared_depth)?;
        self.compose
            .recreate_framebuffer(device, width, height, image_count, &self.g, &shared_depth)?;
        if let Some(forward) = &mut self.forward {
            forward.recreate_framebuffer(device, width, height, image_count, &self.compose, &shared_depth)?;
        }
        self.bloom.recreate_framebuffer(device, width, height, image_count, &self.compose)?;
        self.post.recreate_framebuffer(device, width, height, &images, &self.compose)
    }

    fn record(
        &self,
        cmd: &mut dyn CommandList,
        image_index: u32,
        scene: &FrameScene,
        overlay: Option<&mut dyn OverlayHook>,
    ) -> Result<()> {
        self.depth.record(cmd, image_index, scene)?;
        self.g.record(cmd, image_index, scene)?;
        self.compose.record(cmd, image_index, scene)?;
        if let Some(forward) = &self.forward {
            forward.record(cmd, image_index, scene)?;
        }
        self.bloom.record(cmd, image_index)?;
        self.post.record(cmd, image_index, overlay)
    }

    fn is_destroyed(&self) -> bool {
        self.post.is_destroyed()
            && self.bloom.is_destroyed()
            && self.forward.as_ref().map_or(true, |f| f.is_destroyed())
            && self.compose.is_destroyed()
            && self.g.is_destroyed()
            && self.depth.is_destroyed()
    }
}

/// Frame orchestrator
///
/// Field order is drop order: passes release their framebuffers and
/// attachments before the swapchain and the device go away.
pub struct RenderSystem {
    passes: PassChain,
    command_lists: Vec<Box<dyn CommandList>>,
    swapchain: Box<dyn Swapchain>,
    device: Arc<dyn GraphicsDevice>,
    resized: bool,
    extent: (u32, u32),
}

impl RenderSystem {
    /// Create the swapchain, one command list per frame slot and every pass
    ///
    /// # Errors
    ///
    /// Missing or malformed shaders and any device failure are fatal
    /// initialization errors.
    pub fn new(device: Arc<dyn GraphicsDevice>, config: &Config, width: u32, height: u32) -> Result<Self> {
        let swapchain = device.create_swapchain(width, height)?;
        engine_info!(
            LOG_SOURCE,
            "Swapchain {}x{} with {} images, {:?}",
            swapchain.width(),
            swapchain.height(),
            swapchain.image_count(),
            swapchain.format()
        );
        engine_debug!(
            LOG_SOURCE,
            "Device supports up to {} samples; pass chain renders single-sampled",
            device.msaa_samples().count()
        );

        let command_lists = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| device.create_command_list())
            .collect::<Result<Vec<_>>>()?;
        let passes = PassChain::new(device.as_ref(), config, swapchain.as_ref())?;

        Ok(Self {
            passes,
            command_lists,
            swapchain,
            device,
            resized: false,
            extent: (width, height),
        })
    }

    /// Render one frame
    ///
    /// # Panics
    ///
    /// More than `MAX_LIGHTS` lights in `scene`.
    pub fn render_frame(&mut self, scene: &FrameScene, overlay: Option<&mut dyn OverlayHook>) -> Result<FrameStatus> {
        if self.extent.0 == 0 || self.extent.1 == 0 {
            return Ok(FrameStatus::Skipped);
        }

        let image_index = match self.swapchain.acquire_next_image()? {
            AcquireResult::Image(index) => index,
            AcquireResult::OutOfDate => {
                engine_debug!(LOG_SOURCE, "Swapchain out of date on acquire");
                self.recreate_all()?;
                return Ok(FrameStatus::Recreated);
            }
        };

        let slot = self.swapchain.current_frame_slot();
        let cmd = &mut self.command_lists[slot];
        cmd.begin()?;
        let recorded = self
            .passes
            .record(&mut **cmd, image_index, scene, overlay)
            .and_then(|()| cmd.end());
        if let Err(e) = recorded {
            engine_warn!(LOG_SOURCE, "Discarding partly recorded frame for image {}", image_index);
            cmd.reset()?;
            return Err(e);
        }
        self.device
            .submit_with_swapchain(&[&**cmd], self.swapchain.as_ref(), image_index)?;

        let present = self.swapchain.present(image_index)?;
        if present != PresentResult::Presented || self.resized {
            engine_debug!(LOG_SOURCE, "Recreating after present ({:?}, resized: {})", present, self.resized);
            self.recreate_all()?;
            return Ok(FrameStatus::Recreated);
        }
        Ok(FrameStatus::Rendered)
    }

    /// Flag a window resize; the next frame rebuilds at this extent
    pub fn set_resized(&mut self, width: u32, height: u32) {
        self.extent = (width, height);
        self.resized = true;
    }

    pub fn is_resize_pending(&self) -> bool {
        self.resized
    }

    /// Idle the device, recreate the swapchain, then rebuild every pass
    ///
    /// The resize flag is cleared only once everything succeeded.
    pub fn recreate_all(&mut self) -> Result<()> {
        let (width, height) = self.extent;
        if width == 0 || height == 0 {
            engine_warn!(LOG_SOURCE, "Recreate skipped for zero-sized extent");
            return Ok(());
        }

        self.device.wait_idle()?;
        self.passes.destroy();
        self.swapchain.recreate(width, height)?;
        self.passes.recreate(self.device.as_ref(), self.swapchain.as_ref())?;
        self.resized = false;

        engine_info!(
            LOG_SOURCE,
            "Recreated at {}x{} with {} images",
            self.swapchain.width(),
            self.swapchain.height(),
            self.swapchain.image_count()
        );
        Ok(())
    }

    /// Wait for the GPU and release every pass bundle
    pub fn shutdown(&mut self) -> Result<()> {
        self.device.wait_idle()?;
        self.passes.destroy();
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.passes.is_destroyed()
    }

    /// Render pass the overlay records into
    pub fn overlay_render_pass(&self) -> &Arc<dyn RenderPass> {
        self.passes.post.render_pass()
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    pub fn width(&self) -> u32 {
        self.swapchain.width()
    }

    pub fn height(&self) -> u32 {
        self.swapchain.height()
    }

    /// Layout for model material sets (binding 0: albedo sampler)
    pub fn material_set_layout(&self) -> &Arc<dyn DescriptorSetLayout> {
        self.passes.g.material_set_layout()
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn depth_pass(&self) -> &DepthPass {
        &self.passes.depth
    }

    pub fn g_pass(&self) -> &GPass {
        &self.passes.g
    }

    pub fn compose_pass(&self) -> &ComposePass {
        &self.passes.compose
    }

    pub fn forward_pass(&self) -> Option<&ForwardPass> {
        self.passes.forward.as_ref()
    }

    pub fn bloom_pass(&self) -> &BloomPass {
        &self.passes.bloom
    }

    pub fn post_pass(&self) -> &PostPass {
        &self.passes.post
    }
}

impl Drop for RenderSystem {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            engine_warn!(LOG_SOURCE, "wait_idle failed during drop: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "render_system_tests.rs"]
mod tests;
