/// Light uniform data and its per-image host buffers

use std::mem::size_of;
use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::config::{LightFalloff, MAX_LIGHTS};
use crate::error::Result;
use crate::graphics_device::{Buffer, BufferUsage, GraphicsDevice};
use crate::render::LightComponent;

/// One light as laid out in the std140 uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    /// xyz position, w unused
    pub position: [f32; 4],
    /// rgb intensity, w unused
    pub color: [f32; 4],
}

/// Uniform block read by the compose and forward shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightData {
    pub lights: [LightRecord; MAX_LIGHTS],
    pub count: u32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl LightData {
    /// Pack the frame's lights
    ///
    /// # Panics
    ///
    /// More than `MAX_LIGHTS` lights is a caller contract violation.
    pub fn new(lights: &[LightComponent], falloff: LightFalloff) -> Self {
        assert!(
            lights.len() <= MAX_LIGHTS,
            "{} lights exceed the light buffer capacity of {}",
            lights.len(),
            MAX_LIGHTS
        );

        let mut data = LightData::zeroed();
        for (record, light) in data.lights.iter_mut().zip(lights) {
            record.position = light.position.extend(1.0).to_array();
            record.color = light.color.extend(1.0).to_array();
        }
        data.count = lights.len() as u32;
        data.constant = falloff.constant;
        data.linear = falloff.linear;
        data.quadratic = falloff.quadratic;
        data
    }
}

/// One persistently mapped light buffer per swapchain image
pub struct LightBuffers {
    buffers: Vec<Arc<dyn Buffer>>,
}

impl LightBuffers {
    pub fn new(device: &dyn GraphicsDevice, image_count: usize) -> Result<Self> {
        let mut buffers = Self { buffers: Vec::new() };
        buffers.resize(device, image_count)?;
        Ok(buffers)
    }

    /// Match the swapchain image count, keeping existing buffers
    pub fn resize(&mut self, device: &dyn GraphicsDevice, image_count: usize) -> Result<()> {
        self.buffers.truncate(image_count);
        while self.buffers.len() < image_count {
            self.buffers.push(device.create_host_buffer(size_of::<LightData>() as u64, BufferUsage::Uniform)?);
        }
        Ok(())
    }

    /// Copy this frame's lights into the image's buffer
    pub fn write(&self, image_index: u32, lights: &[LightComponent], falloff: LightFalloff) -> Result<()> {
        let data = LightData::new(lights, falloff);
        self.buffer(image_index).update(0, bytemuck::bytes_of(&data))
    }

    pub fn buffer(&self, image_index: u32) -> &Arc<dyn Buffer> {
        assert!(
            (image_index as usize) < self.buffers.len(),
            "image index {} out of range ({} light buffers)",
            image_index,
            self.buffers.len()
        );
        &self.buffers[image_index as usize]
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
#[path = "light_data_tests.rs"]
mod tests;
