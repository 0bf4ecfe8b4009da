use std::sync::Arc;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{shader_fixture_dir, MockGraphicsDevice};
use crate::graphics_device::{DescriptorBinding, DescriptorType, GraphicsDevice, ShaderStage};
use crate::render::pass_support::*;

fn temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let dir = shader_fixture_dir();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_read_spirv_fixture() {
    let dir = shader_fixture_dir();
    let words = read_spirv(&dir.join("depth.vert.spv")).unwrap();
    assert_eq!(words[0], SPIRV_MAGIC);
    assert_eq!(words.len(), 5);
}

#[test]
fn test_read_spirv_missing_file() {
    let dir = shader_fixture_dir();
    let result = read_spirv(&dir.join("does_not_exist.spv"));
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_read_spirv_rejects_truncated_file() {
    let path = temp_file("truncated.spv", &[0x03, 0x02, 0x23, 0x07, 0x00]);
    assert!(matches!(read_spirv(&path), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_read_spirv_rejects_empty_file() {
    let path = temp_file("empty.spv", &[]);
    assert!(read_spirv(&path).is_err());
}

#[test]
fn test_read_spirv_rejects_bad_magic() {
    let path = temp_file("text.spv", b"void main() {}\n\n");
    assert!(matches!(read_spirv(&path), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_load_shader_creates_module() {
    let device = MockGraphicsDevice::new();
    let dir = shader_fixture_dir();
    let shader = load_shader(&device, &dir, "bloom.comp.spv", ShaderStage::Compute).unwrap();
    assert_eq!(shader.stage(), ShaderStage::Compute);
    assert_eq!(device.stats.lock().unwrap().shaders_created, 1);
}

#[test]
fn test_flipped_viewport() {
    let viewport = flipped_viewport(800, 600);
    assert_eq!(viewport.y, 600.0);
    assert_eq!(viewport.height, -600.0);
    assert_eq!(viewport.width, 800.0);
    assert_eq!(full_scissor(800, 600).width, 800);
}

#[test]
fn test_group_count_rounds_up() {
    assert_eq!(group_count(800, 16), 50);
    assert_eq!(group_count(601, 16), 38);
    assert_eq!(group_count(1, 16), 1);
}

#[test]
fn test_fit_descriptor_sets_grows_and_shrinks() {
    let device = MockGraphicsDevice::new();
    let layout = device
        .create_descriptor_set_layout(&[DescriptorBinding {
            binding: 0,
            descriptor_type: DescriptorType::UniformBuffer,
            stages: vec![ShaderStage::Fragment],
        }])
        .unwrap();

    let mut sets = Vec::new();
    fit_descriptor_sets(&device, &layout, &mut sets, 3).unwrap();
    assert_eq!(sets.len(), 3);
    let first = Arc::clone(&sets[0]);

    fit_descriptor_sets(&device, &layout, &mut sets, 2).unwrap();
    assert_eq!(sets.len(), 2);
    assert!(Arc::ptr_eq(&sets[0], &first));

    fit_descriptor_sets(&device, &layout, &mut sets, 4).unwrap();
    assert_eq!(sets.len(), 4);
    assert_eq!(device.stats.lock().unwrap().descriptor_sets_allocated, 5);
}
