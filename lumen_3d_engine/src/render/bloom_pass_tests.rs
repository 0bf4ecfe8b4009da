use std::sync::Arc;
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, RecordedCommand};
use crate::graphics_device::{Attachment, DescriptorResource, ImageLayout, PipelineBindPoint};
use crate::render::test_support::{recording, test_config};
use crate::render::{BloomPass, BloomPush, ComposePass, DepthPass, GPass, PassFrameBuffer};

struct Chain {
    depth: DepthPass,
    g: GPass,
    compose: ComposePass,
    bloom: BloomPass,
}

fn chain(device: &MockGraphicsDevice, width: u32, height: u32, images: usize) -> Chain {
    let config = test_config();
    let depth = DepthPass::new(device, &config, width, height, images).unwrap();
    let d = depth.depth_attachment();
    let g = GPass::new(device, &config, width, height, images, d).unwrap();
    let compose = ComposePass::new(device, &config, width, height, images, &g, d).unwrap();
    let bloom = BloomPass::new(device, &config, width, height, images, &compose).unwrap();
    Chain { depth, g, compose, bloom }
}

fn storage(resource: Option<DescriptorResource>) -> Arc<dyn Attachment> {
    match resource {
        Some(DescriptorResource::StorageImage(attachment)) => attachment,
        _ => panic!("expected a storage image"),
    }
}

#[test]
fn test_temp_image_moved_to_general_on_creation() {
    let device = MockGraphicsDevice::new();
    let c = chain(&device, 800, 600, 3);

    assert_eq!(
        device.stats.lock().unwrap().transitions,
        vec![(ImageLayout::Undefined, ImageLayout::General)]
    );
    assert_eq!(c.bloom.temp().width(), 800);
    assert_eq!(c.bloom.image_count(), 3);
}

#[test]
fn test_dispatch_size_rounds_up() {
    let device = MockGraphicsDevice::new();
    assert_eq!(chain(&device, 800, 600, 2).bloom.dispatch_size(), (50, 38, 1));
    assert_eq!(chain(&device, 801, 17, 2).bloom.dispatch_size(), (51, 2, 1));
}

#[test]
fn test_phase_sets_swap_source_and_destination() {
    let device = MockGraphicsDevice::new();
    let c = chain(&device, 256, 256, 3);

    for image in 0..3 {
        let h = c.bloom.horizontal_set(image);
        assert!(Arc::ptr_eq(&storage(device.bound_resource(h, 0)), c.compose.bloom()));
        assert!(Arc::ptr_eq(&storage(device.bound_resource(h, 1)), c.bloom.temp()));
        let v = c.bloom.vertical_set(image);
        assert!(Arc::ptr_eq(&storage(device.bound_resource(v, 0)), c.bloom.temp()));
        assert!(Arc::ptr_eq(&storage(device.bound_resource(v, 1)), c.compose.bloom()));
    }
}

#[test]
fn test_recreate_rebinds_new_images_and_keeps_pipeline() {
    let device = MockGraphicsDevice::new();
    let mut c = chain(&device, 256, 256, 3);
    let pipeline = Arc::clone(c.bloom.pipeline());
    let old_temp = Arc::clone(c.bloom.temp());

    c.bloom.destroy();
    assert!(c.bloom.is_destroyed());
    c.compose.destroy();
    c.g.destroy();
    c.depth.destroy();
    c.depth.recreate_framebuffer(&device, 512, 128, 2).unwrap();
    let d = c.depth.depth_attachment();
    c.g.recreate_framebuffer(&device, 512, 128, 2, d).unwrap();
    c.compose.recreate_framebuffer(&device, 512, 128, 2, &c.g, d).unwrap();
    c.bloom.recreate_framebuffer(&device, 512, 128, 2, &c.compose).unwrap();

    assert!(Arc::ptr_eq(c.bloom.pipeline(), &pipeline));
    assert!(!Arc::ptr_eq(c.bloom.temp(), &old_temp));
    assert_eq!(c.bloom.image_count(), 2);
    assert_eq!(c.bloom.dispatch_size(), (32, 8, 1));
    assert_eq!(device.stats.lock().unwrap().transitions.len(), 2);
    let h = c.bloom.horizontal_set(1);
    assert!(Arc::ptr_eq(&storage(device.bound_resource(h, 0)), c.compose.bloom()));
}

#[test]
fn test_record_is_only_barriers_and_two_dispatches() {
    let device = MockGraphicsDevice::new();
    let c = chain(&device, 800, 600, 3);

    let mut cmd = recording(&device);
    c.bloom.record(cmd.as_mut(), 2).unwrap();
    cmd.end().unwrap();

    let commands = device.last_frame_commands();
    let body = &commands[1..commands.len() - 1];
    assert!(body.iter().all(|c| matches!(
        c,
        RecordedCommand::ImageBarrier { .. }
            | RecordedCommand::BindPipeline { bind_point: PipelineBindPoint::Compute, .. }
            | RecordedCommand::BindDescriptorSets { .. }
            | RecordedCommand::PushConstants { .. }
            | RecordedCommand::Dispatch(..)
    )));

    let dispatches: Vec<_> = body.iter().filter(|c| matches!(c, RecordedCommand::Dispatch(..))).collect();
    assert_eq!(dispatches, vec![&RecordedCommand::Dispatch(50, 38, 1); 2]);

    let pushes: Vec<_> = body
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::PushConstants { data, .. } => Some(data.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(pushes, vec![
        bytemuck::bytes_of(&BloomPush::HORIZONTAL).to_vec(),
        bytemuck::bytes_of(&BloomPush::VERTICAL).to_vec(),
    ]);

    let barriers = body.iter().filter(|c| matches!(c, RecordedCommand::ImageBarrier { .. })).count();
    assert_eq!(barriers, 5);
    assert!(matches!(
        body.last(),
        Some(RecordedCommand::ImageBarrier {
            old_layout: ImageLayout::General,
            new_layout: ImageLayout::ShaderReadOnly,
            ..
        })
    ));
}

#[test]
#[should_panic(expected = "out of range")]
fn test_record_rejects_image_index_past_count() {
    let device = MockGraphicsDevice::new();
    let c = chain(&device, 64, 64, 2);
    let mut cmd = recording(&device);
    let _ = c.bloom.record(cmd.as_mut(), 2);
}
