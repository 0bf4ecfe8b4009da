use std::sync::Arc;
use crate::graphics_device::mock_graphics_device::{ptr_id, MockGraphicsDevice, RecordedCommand};
use crate::graphics_device::{Attachment, ClearValue, TextureFormat};
use crate::render::test_support::{cube_model, material, recording, test_config};
use crate::render::{DepthPass, FrameScene, GPass, PassFrameBuffer, Shading};

fn passes(device: &MockGraphicsDevice, width: u32, height: u32, images: usize) -> (DepthPass, GPass) {
    let config = test_config();
    let depth = DepthPass::new(device, &config, width, height, images).unwrap();
    let g = GPass::new(device, &config, width, height, images, depth.depth_attachment()).unwrap();
    (depth, g)
}

#[test]
fn test_targets_have_gbuffer_formats() {
    let device = MockGraphicsDevice::new();
    let (_depth, g) = passes(&device, 800, 600, 3);

    assert_eq!(g.normal().format(), TextureFormat::R16G16B16A16_SFLOAT);
    assert_eq!(g.position().format(), TextureFormat::R16G16B16A16_SFLOAT);
    assert_eq!(g.albedo().format(), TextureFormat::R8G8B8A8_UNORM);
    assert_eq!(g.bundle().owned_attachment_count(), 3);
    assert_eq!(g.bundle().framebuffer_count(), 3);
}

#[test]
fn test_recreate_follows_new_depth_and_extent() {
    let device = MockGraphicsDevice::new();
    let (mut depth, mut g) = passes(&device, 800, 600, 3);
    let pipeline = Arc::clone(g.pipeline());
    let layout = Arc::clone(g.material_set_layout());

    g.destroy();
    depth.destroy();
    depth.recreate_framebuffer(&device, 400, 300, 4).unwrap();
    g.recreate_framebuffer(&device, 400, 300, 4, depth.depth_attachment()).unwrap();

    assert_eq!(g.bundle().width(), 400);
    assert_eq!(g.bundle().height(), 300);
    assert_eq!(g.bundle().framebuffer_count(), 4);
    assert_eq!(g.normal().width(), 400);
    assert!(Arc::ptr_eq(g.pipeline(), &pipeline));
    assert!(Arc::ptr_eq(g.material_set_layout(), &layout));
}

#[test]
fn test_draws_only_deferred_models_with_material() {
    let device = MockGraphicsDevice::new();
    let (_depth, g) = passes(&device, 320, 240, 2);
    let mat = material(&device, g.material_set_layout());
    let models = vec![
        cube_model(&device, Shading::Deferred, Some(Arc::clone(&mat))),
        cube_model(&device, Shading::Deferred, None),
        cube_model(&device, Shading::Unlit, Some(Arc::clone(&mat))),
    ];
    let scene = FrameScene { models: &models, ..Default::default() };

    let mut cmd = recording(&device);
    g.record(cmd.as_mut(), 1, &scene).unwrap();
    cmd.end().unwrap();

    let commands = device.last_frame_commands();
    let draws = commands
        .iter()
        .filter(|c| matches!(c, RecordedCommand::DrawIndexed { .. }))
        .count();
    assert_eq!(draws, 1);
    assert!(commands.contains(&RecordedCommand::BindDescriptorSets {
        first_set: 0,
        sets: vec![ptr_id(&mat)],
    }));
    assert!(matches!(
        &commands[1],
        RecordedCommand::BeginRenderPass { clear_values, .. }
            if clear_values.len() == 4 && clear_values[3] == ClearValue::DepthStencil { depth: 0.0, stencil: 0 }
    ));
}

#[test]
#[should_panic(expected = "used after destroy")]
fn test_targets_unavailable_after_destroy() {
    let device = MockGraphicsDevice::new();
    let (_depth, mut g) = passes(&device, 64, 64, 2);
    g.destroy();
    let _ = g.albedo();
}
