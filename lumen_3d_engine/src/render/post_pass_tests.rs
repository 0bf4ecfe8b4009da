use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::mock_graphics_device::{ptr_id, MockGraphicsDevice, RecordedCommand};
use crate::graphics_device::{
    Attachment, ClearValue, CommandList, DescriptorResource, GraphicsDevice, SamplerKind,
};
use crate::render::test_support::{recording, test_config};
use crate::render::{ComposePass, DepthPass, GPass, OverlayHook, PassFrameBuffer, PostPass};

struct Chain {
    compose: ComposePass,
    post: PostPass,
    _depth: DepthPass,
    _g: GPass,
}

fn chain(device: &MockGraphicsDevice) -> Chain {
    let config = test_config();
    let swapchain = device.create_swapchain(800, 600).unwrap();
    let images = swapchain.image_attachments();
    let depth = DepthPass::new(device, &config, 800, 600, images.len()).unwrap();
    let d = depth.depth_attachment();
    let g = GPass::new(device, &config, 800, 600, images.len(), d).unwrap();
    let compose = ComposePass::new(device, &config, 800, 600, images.len(), &g, d).unwrap();
    let post = PostPass::new(device, &config, 800, 600, swapchain.format(), &images, &compose).unwrap();
    Chain { compose, post, _depth: depth, _g: g }
}

fn sampled(resource: Option<DescriptorResource>) -> (Arc<dyn Attachment>, SamplerKind) {
    match resource {
        Some(DescriptorResource::SampledImage(attachment, kind)) => (attachment, kind),
        _ => panic!("expected a sampled image"),
    }
}

struct CountingOverlay {
    images: Vec<u32>,
}

impl OverlayHook for CountingOverlay {
    fn record(&mut self, cmd: &mut dyn CommandList, image_index: u32) -> Result<()> {
        self.images.push(image_index);
        cmd.draw(6, 0)
    }
}

#[test]
fn test_one_framebuffer_per_swapchain_image() {
    let device = MockGraphicsDevice::with_swapchain_images(4);
    let c = chain(&device);

    assert_eq!(c.post.image_count(), 4);
    assert_eq!(c.post.bundle().owned_attachment_count(), 0);
    assert_eq!(c.post.bundle().width(), 800);
}

#[test]
fn test_sets_sample_compose_targets() {
    let device = MockGraphicsDevice::new();
    let c = chain(&device);

    for image in 0..3 {
        let (base, kind) = sampled(device.bound_resource(c.post.base_set(image), 0));
        assert!(Arc::ptr_eq(&base, c.compose.color()));
        assert_eq!(kind, SamplerKind::LinearClamp);
        let (bloom, _) = sampled(device.bound_resource(c.post.bloom_set(image), 0));
        assert!(Arc::ptr_eq(&bloom, c.compose.bloom()));
    }
}

#[test]
fn test_record_draws_twice_then_overlay() {
    let device = MockGraphicsDevice::new();
    let c = chain(&device);
    let mut overlay = CountingOverlay { images: Vec::new() };

    let mut cmd = recording(&device);
    c.post.record(cmd.as_mut(), 1, Some(&mut overlay)).unwrap();
    cmd.end().unwrap();

    let commands = device.last_frame_commands();
    assert!(matches!(
        &commands[1],
        RecordedCommand::BeginRenderPass { render_pass, clear_values, .. }
            if *render_pass == ptr_id(c.post.render_pass())
                && clear_values == &vec![ClearValue::Color([0.0, 0.0, 0.0, 1.0])]
    ));
    let draws: Vec<u32> = commands
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::Draw { vertex_count } => Some(*vertex_count),
            _ => None,
        })
        .collect();
    assert_eq!(draws, vec![3, 3, 6]);
    assert_eq!(commands[commands.len() - 3], RecordedCommand::Draw { vertex_count: 6 });
    assert_eq!(commands[commands.len() - 2], RecordedCommand::EndRenderPass);
    assert_eq!(overlay.images, vec![1]);
}

#[test]
fn test_destroy_releases_framebuffers() {
    let device = MockGraphicsDevice::new();
    let mut c = chain(&device);
    c.post.destroy();
    assert!(c.post.is_destroyed());
    assert_eq!(c.post.image_count(), 0);
}
