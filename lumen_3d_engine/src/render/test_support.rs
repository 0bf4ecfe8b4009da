/// Fixtures shared by the pass and orchestrator tests

use std::sync::Arc;
use glam::{Mat4, Vec3};
use crate::config::Config;
use crate::graphics_device::mock_graphics_device::{shader_fixture_dir, MockGraphicsDevice};
use crate::graphics_device::{CommandList, DescriptorSet, DescriptorSetLayout, GraphicsDevice};
use crate::render::{LightComponent, Mesh, RenderModel, Shading};

/// Default config pointing at a fresh shader fixture directory
pub fn test_config() -> Config {
    Config {
        shader_dir: shader_fixture_dir(),
        ..Config::default()
    }
}

pub fn cube_model(
    device: &MockGraphicsDevice,
    shading: Shading,
    material: Option<Arc<dyn DescriptorSet>>,
) -> RenderModel {
    RenderModel {
        mesh: Arc::new(Mesh::unit_cube(device).unwrap()),
        material,
        transform: Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)),
        scale: Vec3::ONE,
        shading,
    }
}

pub fn material(device: &MockGraphicsDevice, layout: &Arc<dyn DescriptorSetLayout>) -> Arc<dyn DescriptorSet> {
    device.allocate_descriptor_sets(layout, 1).unwrap().remove(0)
}

pub fn white_light(x: f32) -> LightComponent {
    LightComponent {
        position: Vec3::new(x, 1.0, -4.0),
        color: Vec3::ONE,
    }
}

/// Command list already inside `begin`
pub fn recording(device: &MockGraphicsDevice) -> Box<dyn CommandList> {
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    cmd
}
