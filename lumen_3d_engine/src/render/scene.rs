/// Frame inputs consumed from the entity, camera and overlay collaborators
///
/// The renderer only reads these; entity lifecycle stays with the caller.

use std::mem::size_of;
use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferUsage, CommandList, DescriptorSet, GraphicsDevice, VertexAttribute,
    VertexFormat, VertexLayout,
};

/// Interleaved vertex used by every mesh pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: size_of::<Vertex>() as u32,
            attributes: vec![
                VertexAttribute { location: 0, format: VertexFormat::R32G32B32_SFLOAT, offset: 0 },
                VertexAttribute { location: 1, format: VertexFormat::R32G32B32_SFLOAT, offset: 12 },
                VertexAttribute { location: 2, format: VertexFormat::R32G32_SFLOAT, offset: 24 },
            ],
        }
    }
}

/// GPU-resident indexed geometry
pub struct Mesh {
    pub vertex_buffer: Arc<dyn Buffer>,
    pub index_buffer: Arc<dyn Buffer>,
    pub index_count: u32,
}

impl Mesh {
    /// Upload vertices and 32-bit indices to device-local buffers
    pub fn new(device: &dyn GraphicsDevice, vertices: &[Vertex], indices: &[u32]) -> Result<Self> {
        let vertex_buffer = device.create_device_buffer(bytemuck::cast_slice(vertices), BufferUsage::Vertex)?;
        let index_buffer = device.create_device_buffer(bytemuck::cast_slice(indices), BufferUsage::Index)?;
        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        })
    }

    /// Cube spanning [-1, 1] on every axis (used for light volumes)
    pub fn unit_cube(device: &dyn GraphicsDevice) -> Result<Self> {
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
            ([0.0, -1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        for (normal, u, v) in faces {
            let n = Vec3::from(normal);
            let u = Vec3::from(u);
            let v = Vec3::from(v);
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                vertices.push(Vertex {
                    position: (n + u * su + v * sv).to_array(),
                    normal,
                    uv: [(su + 1.0) * 0.5, (sv + 1.0) * 0.5],
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(device, &vertices, &indices)
    }
}

/// How a model is shaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    /// Written to the G-buffer and lit in the compose pass
    Deferred,
    /// Drawn directly in the compose pass without lighting
    Unlit,
    /// Lit and alpha-blended in the forward pass
    Transparent,
}

/// Model component: what to draw and where
#[derive(Clone)]
pub struct RenderModel {
    pub mesh: Arc<Mesh>,
    /// Material set (binding 0: albedo sampler) allocated from
    /// `RenderSystem::material_set_layout`. Passes that sample a material
    /// skip models without one.
    pub material: Option<Arc<dyn DescriptorSet>>,
    pub transform: Mat4,
    pub scale: Vec3,
    pub shading: Shading,
}

impl RenderModel {
    pub fn model_matrix(&self) -> Mat4 {
        self.transform * Mat4::from_scale(self.scale)
    }
}

/// Point light component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightComponent {
    pub position: Vec3,
    /// Linear RGB intensity
    pub color: Vec3,
}

/// Camera state for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    pub view_proj: Mat4,
    pub position: Vec3,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

/// Everything the pass chain reads for one frame
#[derive(Clone, Copy, Default)]
pub struct FrameScene<'a> {
    pub camera: CameraData,
    pub models: &'a [RenderModel],
    pub lights: &'a [LightComponent],
    /// Draw the sky background where no geometry was written
    pub sky: bool,
}

/// Immediate-mode overlay recorded inside the post pass
///
/// Initialise against `RenderSystem::overlay_render_pass()` and
/// `RenderSystem::image_count()`; reinitialise after the image count changes.
pub trait OverlayHook {
    fn record(&mut self, cmd: &mut dyn CommandList, image_index: u32) -> Result<()>;
}
