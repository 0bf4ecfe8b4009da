/// Unit tests for the mock backend's validation rules

use std::sync::Arc;
use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    GraphicsDevice, Swapchain, AttachmentDesc, AttachmentUsage, TextureFormat, SampleCount,
    RenderPassDesc, AttachmentOps, LoadOp, StoreOp, ImageLayout, FramebufferDesc,
    DescriptorBinding, DescriptorType, DescriptorWrite, DescriptorResource, ShaderStage,
    BufferUsage, AcquireResult, PresentResult, CommandList, Buffer, Attachment,
};

fn color_desc(width: u32, height: u32) -> AttachmentDesc {
    AttachmentDesc {
        format: TextureFormat::R16G16B16A16_SFLOAT,
        usage: AttachmentUsage::COLOR,
        samples: SampleCount::S1,
        width,
        height,
    }
}

fn color_pass_desc() -> RenderPassDesc {
    RenderPassDesc {
        color_attachments: vec![AttachmentOps {
            format: TextureFormat::R16G16B16A16_SFLOAT,
            samples: SampleCount::S1,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::ShaderReadOnly,
        }],
        depth_attachment: None,
        dependencies: Vec::new(),
    }
}

#[test]
fn test_attachment_usage_is_validated() {
    let device = MockGraphicsDevice::new();
    let mut desc = color_desc(8, 8);
    desc.usage = AttachmentUsage::COLOR | AttachmentUsage::DEPTH_STENCIL;
    assert!(device.create_attachment(&desc).is_err());
    assert_eq!(device.stats.lock().unwrap().attachments_created, 0);
}

#[test]
fn test_framebuffer_extent_must_match_attachments() {
    let device = MockGraphicsDevice::new();
    let render_pass = device.create_render_pass(&color_pass_desc()).unwrap();
    let attachment = device.create_attachment(&color_desc(64, 32)).unwrap();

    let ok = device.create_framebuffer(&FramebufferDesc {
        render_pass: &render_pass,
        attachments: vec![Arc::clone(&attachment)],
        width: 64,
        height: 32,
    });
    assert!(ok.is_ok());

    let mismatched = device.create_framebuffer(&FramebufferDesc {
        render_pass: &render_pass,
        attachments: vec![attachment],
        width: 65,
        height: 32,
    });
    assert!(mismatched.is_err());
}

#[test]
fn test_framebuffer_attachment_count_must_match_render_pass() {
    let device = MockGraphicsDevice::new();
    let render_pass = device.create_render_pass(&color_pass_desc()).unwrap();
    let result = device.create_framebuffer(&FramebufferDesc {
        render_pass: &render_pass,
        attachments: Vec::new(),
        width: 4,
        height: 4,
    });
    assert!(result.is_err());
}

#[test]
fn test_descriptor_writes_are_type_checked_and_recorded() {
    let device = MockGraphicsDevice::new();
    let layout = device
        .create_descriptor_set_layout(&[DescriptorBinding {
            binding: 0,
            descriptor_type: DescriptorType::StorageImage,
            stages: vec![ShaderStage::Compute],
        }])
        .unwrap();
    let sets = device.allocate_descriptor_sets(&layout, 2).unwrap();
    assert_eq!(sets.len(), 2);

    let mut desc = color_desc(4, 4);
    desc.usage |= AttachmentUsage::STORAGE;
    let image = device.create_attachment(&desc).unwrap();

    device
        .update_descriptor_set(&sets[0], &[DescriptorWrite {
            binding: 0,
            resource: DescriptorResource::StorageImage(Arc::clone(&image)),
        }])
        .unwrap();

    match device.bound_resource(&sets[0], 0) {
        Some(DescriptorResource::StorageImage(bound)) => assert!(Arc::ptr_eq(&bound, &image)),
        _ => panic!("storage image not recorded"),
    }
    assert!(device.bound_resource(&sets[1], 0).is_none());

    let buffer = device.create_host_buffer(16, BufferUsage::Uniform).unwrap();
    let wrong_type = device.update_descriptor_set(&sets[1], &[DescriptorWrite {
        binding: 0,
        resource: DescriptorResource::UniformBuffer(buffer),
    }]);
    assert!(wrong_type.is_err());
}

#[test]
fn test_host_buffer_update_bounds() {
    let device = MockGraphicsDevice::new();
    let buffer = device.create_host_buffer(8, BufferUsage::Uniform).unwrap();
    assert!(buffer.update(4, &[1, 2, 3, 4]).is_ok());
    assert!(buffer.update(6, &[1, 2, 3]).is_err());
    assert_eq!(device.host_buffers.lock().unwrap()[0].contents(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
    assert!(buffer.mapped_ptr().is_some());
}

#[test]
fn test_device_buffer_is_not_host_visible() {
    let device = MockGraphicsDevice::new();
    let buffer = device.create_device_buffer(&[1, 2, 3, 4], BufferUsage::Vertex).unwrap();
    assert_eq!(buffer.size(), 4);
    assert!(buffer.mapped_ptr().is_none());
    assert!(buffer.update(0, &[0]).is_err());
}

#[test]
fn test_texture_upload_ends_shader_readable() {
    let device = MockGraphicsDevice::new();
    let texture = device
        .create_texture(TextureFormat::R8G8B8A8_SRGB, 2, 1, &[255; 8])
        .unwrap();
    assert_eq!(texture.width(), 2);
    assert_eq!(
        device.stats.lock().unwrap().transitions.last(),
        Some(&(ImageLayout::TransferDst, ImageLayout::ShaderReadOnly))
    );
    assert!(device.create_texture(TextureFormat::R8G8B8A8_SRGB, 2, 1, &[255; 4]).is_err());
}

#[test]
fn test_unsupported_transition_is_rejected() {
    let device = MockGraphicsDevice::new();
    let image = device.create_attachment(&color_desc(4, 4)).unwrap();
    assert!(device
        .transition_image_layout(&image, ImageLayout::Undefined, ImageLayout::General, 1, 1)
        .is_ok());
    assert!(device
        .transition_image_layout(&image, ImageLayout::PresentSrc, ImageLayout::General, 1, 1)
        .is_err());
    assert_eq!(
        device.stats.lock().unwrap().transitions,
        vec![(ImageLayout::Undefined, ImageLayout::General)]
    );
}

#[test]
fn test_command_list_rejects_draw_outside_render_pass() {
    let device = MockGraphicsDevice::new();
    let mut cmd = device.create_command_list().unwrap();
    assert!(cmd.draw(3, 0).is_err());
    cmd.begin().unwrap();
    assert!(cmd.draw(3, 0).is_err());
    assert!(cmd.dispatch(1, 1, 1).is_ok());
    cmd.end().unwrap();
    assert_eq!(
        device.last_frame_commands(),
        vec![
            RecordedCommand::Begin,
            RecordedCommand::Dispatch(1, 1, 1),
            RecordedCommand::End,
        ]
    );
}

#[test]
fn test_mock_swapchain_script() {
    let device = MockGraphicsDevice::with_swapchain_images(3);
    let mut swapchain = device.create_swapchain(800, 600).unwrap();
    let state = device.swapchain_state().unwrap();
    state.lock().unwrap().acquire_out_of_date = true;
    state.lock().unwrap().present_results.push_back(PresentResult::Suboptimal);

    assert_eq!(swapchain.acquire_next_image().unwrap(), AcquireResult::OutOfDate);
    assert_eq!(swapchain.acquire_next_image().unwrap(), AcquireResult::Image(0));
    assert_eq!(swapchain.present(0).unwrap(), PresentResult::Suboptimal);
    assert_eq!(swapchain.current_frame_slot(), 1);

    state.lock().unwrap().next_image_count = Some(4);
    swapchain.recreate(1024, 768).unwrap();
    assert_eq!(swapchain.image_count(), 4);
    assert_eq!(swapchain.width(), 1024);
    assert!(swapchain.image_attachments().iter().all(|a| a.height() == 768));
}
