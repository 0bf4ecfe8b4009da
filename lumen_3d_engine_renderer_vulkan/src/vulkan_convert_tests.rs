//! Unit tests for Vulkan conversion functions
//!
//! Pure mappings, no GPU required.

use ash::vk;
use lumen_3d_engine::lumen3d::device::{
    Access, AttachmentUsage, BlendMode, ClearValue, CompareOp, ImageLayout, PipelineStage,
    SampleCount, ShaderStage, TextureFormat,
};
use super::*;

// ============================================================================
// FORMAT CONVERSION TESTS
// ============================================================================

#[test]
fn test_texture_format_to_vk_depth_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::D32_FLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(texture_format_to_vk(TextureFormat::D16_UNORM), vk::Format::D16_UNORM);
    assert_eq!(
        texture_format_to_vk(TextureFormat::D24_UNORM_S8_UINT),
        vk::Format::D24_UNORM_S8_UINT
    );
}

#[test]
fn test_texture_format_to_vk_gbuffer_formats() {
    assert_eq!(
        texture_format_to_vk(TextureFormat::R16G16B16A16_SFLOAT),
        vk::Format::R16G16B16A16_SFLOAT
    );
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn test_surface_formats_map_back() {
    for format in [
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM,
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM,
    ] {
        assert_eq!(vk_to_texture_format(texture_format_to_vk(format)), Some(format));
    }
}

#[test]
fn test_unknown_surface_format_has_no_engine_equivalent() {
    assert_eq!(vk_to_texture_format(vk::Format::A2B10G10R10_UNORM_PACK32), None);
}

// ============================================================================
// LAYOUT / SYNC CONVERSION TESTS
// ============================================================================

#[test]
fn test_image_layouts_used_by_the_pass_chain() {
    assert_eq!(image_layout_to_vk(ImageLayout::General), vk::ImageLayout::GENERAL);
    assert_eq!(
        image_layout_to_vk(ImageLayout::ShaderReadOnly),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    );
    assert_eq!(image_layout_to_vk(ImageLayout::PresentSrc), vk::ImageLayout::PRESENT_SRC_KHR);
    assert_eq!(
        image_layout_to_vk(ImageLayout::DepthStencilReadOnly),
        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
    );
}

#[test]
fn test_stage_and_access_bits_pass_through() {
    let stage = PipelineStage::COMPUTE_SHADER | PipelineStage::FRAGMENT_SHADER;
    assert_eq!(
        pipeline_stage_to_vk(stage),
        vk::PipelineStageFlags::COMPUTE_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER
    );

    let access = Access::SHADER_WRITE | Access::DEPTH_STENCIL_ATTACHMENT_WRITE;
    assert_eq!(
        access_to_vk(access),
        vk::AccessFlags::SHADER_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
    );
    assert_eq!(access_to_vk(Access::MEMORY_READ), vk::AccessFlags::MEMORY_READ);
    assert_eq!(
        pipeline_stage_to_vk(PipelineStage::BOTTOM_OF_PIPE),
        vk::PipelineStageFlags::BOTTOM_OF_PIPE
    );
}

// ============================================================================
// PIPELINE STATE CONVERSION TESTS
// ============================================================================

#[test]
fn test_reversed_z_compare_ops() {
    assert_eq!(compare_op_to_vk(CompareOp::Greater), vk::CompareOp::GREATER);
    assert_eq!(compare_op_to_vk(CompareOp::GreaterOrEqual), vk::CompareOp::GREATER_OR_EQUAL);
}

#[test]
fn test_additive_blend_is_one_one() {
    let state = blend_state_to_vk(BlendMode::Additive);
    assert_eq!(state.blend_enable, vk::TRUE);
    assert_eq!(state.src_color_blend_factor, vk::BlendFactor::ONE);
    assert_eq!(state.dst_color_blend_factor, vk::BlendFactor::ONE);
    assert_eq!(state.color_write_mask, vk::ColorComponentFlags::RGBA);
}

#[test]
fn test_alpha_blend_uses_source_alpha() {
    let state = blend_state_to_vk(BlendMode::Alpha);
    assert_eq!(state.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
    assert_eq!(state.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
}

#[test]
fn test_opaque_blend_disabled() {
    assert_eq!(blend_state_to_vk(BlendMode::Opaque).blend_enable, vk::FALSE);
}

#[test]
fn test_shader_stages_combine() {
    assert_eq!(
        shader_stages_to_vk(&[ShaderStage::Vertex, ShaderStage::Fragment]),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(shader_stages_to_vk(&[]), vk::ShaderStageFlags::empty());
}

#[test]
fn test_sample_counts() {
    assert_eq!(sample_count_to_vk(SampleCount::S1), vk::SampleCountFlags::TYPE_1);
    assert_eq!(sample_count_to_vk(SampleCount::S8), vk::SampleCountFlags::TYPE_8);
    assert_eq!(sample_count_to_vk(SampleCount::S64), vk::SampleCountFlags::TYPE_64);
}

// ============================================================================
// ATTACHMENT USAGE TESTS
// ============================================================================

#[test]
fn test_attachment_usage_always_sampled() {
    let color = attachment_usage_to_vk(AttachmentUsage::COLOR);
    assert_eq!(color, vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT);

    let depth = attachment_usage_to_vk(AttachmentUsage::DEPTH_STENCIL);
    assert_eq!(
        depth,
        vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
    );
}

#[test]
fn test_bloom_usage_is_color_and_storage() {
    let flags = attachment_usage_to_vk(AttachmentUsage::COLOR | AttachmentUsage::STORAGE);
    assert!(flags.contains(vk::ImageUsageFlags::STORAGE));
    assert!(flags.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
    assert!(flags.contains(vk::ImageUsageFlags::SAMPLED));
}

#[test]
fn test_clear_values() {
    let color = clear_value_to_vk(&ClearValue::Color([0.0, 0.18, 0.2, 1.0]));
    assert_eq!(unsafe { color.color.float32 }, [0.0, 0.18, 0.2, 1.0]);

    let depth = clear_value_to_vk(&ClearValue::DepthStencil { depth: 0.0, stencil: 0 });
    assert_eq!(unsafe { depth.depth_stencil.depth }, 0.0);
}
