/// Helpers shared by the passes: SPIR-V loading, dynamic state, descriptor set sizing

use std::path::Path;
use std::sync::Arc;
use crate::error::{Error, Result};
use crate::engine_error;
use crate::graphics_device::{
    CommandList, DescriptorSet, DescriptorSetLayout, GraphicsDevice, IndexType, Pipeline, Rect2D,
    Shader, ShaderDesc, ShaderStage, Viewport,
};
use crate::render::{CameraData, Mesh, ModelPush, RenderModel};

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Read a SPIR-V binary into words
///
/// A missing file, a length that is not a multiple of four or a bad magic
/// word is an initialization failure.
pub fn read_spirv(path: &Path) -> Result<Vec<u32>> {
    let bytes = std::fs::read(path).map_err(|e| {
        engine_error!("lumen3d::shader", "Cannot read shader '{}': {}", path.display(), e);
        Error::InitializationFailed(format!("cannot read shader '{}': {}", path.display(), e))
    })?;

    if bytes.is_empty() || bytes.len() % 4 != 0 {
        engine_error!("lumen3d::shader", "Shader '{}' has invalid length {}", path.display(), bytes.len());
        return Err(Error::InitializationFailed(format!(
            "shader '{}' has invalid length {}",
            path.display(),
            bytes.len()
        )));
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if words[0] != SPIRV_MAGIC {
        engine_error!("lumen3d::shader", "Shader '{}' is not SPIR-V (magic {:#010x})", path.display(), words[0]);
        return Err(Error::InitializationFailed(format!(
            "shader '{}' is not SPIR-V",
            path.display()
        )));
    }

    Ok(words)
}

/// Load `<dir>/<name>` and create a shader module with entry point `main`
pub fn load_shader(
    device: &dyn GraphicsDevice,
    dir: &Path,
    name: &str,
    stage: ShaderStage,
) -> Result<Arc<dyn Shader>> {
    let code = read_spirv(&dir.join(name))?;
    device.create_shader(&ShaderDesc {
        stage,
        code: &code,
        entry_point: "main",
    })
}

/// Full-extent viewport with Y flipped through a negative height
pub fn flipped_viewport(width: u32, height: u32) -> Viewport {
    Viewport {
        x: 0.0,
        y: height as f32,
        width: width as f32,
        height: -(height as f32),
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

pub fn full_scissor(width: u32, height: u32) -> Rect2D {
    Rect2D { x: 0, y: 0, width, height }
}

/// Workgroups needed to cover `extent` pixels with groups of `group_size`
pub fn group_count(extent: u32, group_size: u32) -> u32 {
    extent.div_ceil(group_size)
}

/// Grow or shrink a per-image set list to `image_count`
///
/// Existing sets are kept (and must be rewritten by the caller); surplus
/// sets are released, missing ones allocated from `layout`.
pub fn fit_descriptor_sets(
    device: &dyn GraphicsDevice,
    layout: &Arc<dyn DescriptorSetLayout>,
    sets: &mut Vec<Arc<dyn DescriptorSet>>,
    image_count: usize,
) -> Result<()> {
    if sets.len() > image_count {
        sets.truncate(image_count);
    } else if sets.len() < image_count {
        let missing = image_count - sets.len();
        sets.extend(device.allocate_descriptor_sets(layout, missing)?);
    }
    Ok(())
}

/// Push the model transforms and draw its mesh
pub fn draw_model(
    cmd: &mut dyn CommandList,
    pipeline: &Arc<dyn Pipeline>,
    camera: &CameraData,
    model: &RenderModel,
) -> Result<()> {
    let model_matrix = model.model_matrix();
    let push = ModelPush {
        mvp: camera.view_proj * model_matrix,
        model: model_matrix,
    };
    cmd.push_constants(pipeline, &[ShaderStage::Vertex], 0, bytemuck::bytes_of(&push))?;
    draw_mesh(cmd, &model.mesh)
}

pub fn draw_mesh(cmd: &mut dyn CommandList, mesh: &Mesh) -> Result<()> {
    cmd.bind_vertex_buffer(&mesh.vertex_buffer, 0)?;
    cmd.bind_index_buffer(&mesh.index_buffer, 0, IndexType::U32)?;
    cmd.draw_indexed(mesh.index_count, 0, 0)
}

#[cfg(test)]
#[path = "pass_support_tests.rs"]
mod tests;
