use std::mem::size_of;
use glam::Vec3;
use crate::config::{LightFalloff, MAX_LIGHTS};
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::render::{LightBuffers, LightComponent, LightData};

fn lights(count: usize) -> Vec<LightComponent> {
    (0..count)
        .map(|i| LightComponent {
            position: Vec3::new(i as f32, 2.0, -3.0),
            color: Vec3::new(1.0, 0.5, 0.25),
        })
        .collect()
}

#[test]
fn test_light_data_is_std140_sized() {
    assert_eq!(size_of::<LightData>(), MAX_LIGHTS * 32 + 16);
}

#[test]
fn test_light_data_packs_count_and_falloff() {
    let falloff = LightFalloff { constant: 1.0, linear: 0.5, quadratic: 0.25 };
    let data = LightData::new(&lights(3), falloff);
    assert_eq!(data.count, 3);
    assert_eq!(data.lights[2].position, [2.0, 2.0, -3.0, 1.0]);
    assert_eq!(data.lights[1].color, [1.0, 0.5, 0.25, 1.0]);
    assert_eq!(data.lights[3].position, [0.0; 4]);
    assert_eq!(data.quadratic, 0.25);
}

#[test]
fn test_max_lights_fits() {
    let data = LightData::new(&lights(MAX_LIGHTS), LightFalloff::default());
    assert_eq!(data.count as usize, MAX_LIGHTS);
}

#[test]
#[should_panic(expected = "exceed the light buffer capacity")]
fn test_one_light_over_capacity_panics() {
    LightData::new(&lights(MAX_LIGHTS + 1), LightFalloff::default());
}

#[test]
fn test_write_reaches_the_image_buffer() {
    let device = MockGraphicsDevice::new();
    let buffers = LightBuffers::new(&device, 3).unwrap();
    buffers.write(1, &lights(MAX_LIGHTS), LightFalloff::default()).unwrap();

    let written = device.host_buffers.lock().unwrap()[1].contents();
    let data: LightData = bytemuck::pod_read_unaligned(&written);
    assert_eq!(data.count as usize, MAX_LIGHTS);

    let untouched = device.host_buffers.lock().unwrap()[0].contents();
    assert!(untouched.iter().all(|b| *b == 0));
}

#[test]
#[should_panic(expected = "exceed the light buffer capacity")]
fn test_write_over_capacity_panics() {
    let device = MockGraphicsDevice::new();
    let buffers = LightBuffers::new(&device, 2).unwrap();
    let _ = buffers.write(0, &lights(MAX_LIGHTS + 1), LightFalloff::default());
}

#[test]
fn test_resize_tracks_image_count() {
    let device = MockGraphicsDevice::new();
    let mut buffers = LightBuffers::new(&device, 3).unwrap();
    let first = std::sync::Arc::clone(buffers.buffer(0));

    buffers.resize(&device, 2).unwrap();
    assert_eq!(buffers.len(), 2);
    buffers.resize(&device, 4).unwrap();
    assert_eq!(buffers.len(), 4);
    assert!(std::sync::Arc::ptr_eq(buffers.buffer(0), &first));
    assert_eq!(device.stats.lock().unwrap().buffers_created, 5);
}
