/// Pipeline - Vulkan implementation of the Pipeline trait

use ash::vk;
use std::sync::Arc;
use lumen_3d_engine::lumen3d::device::{
    DescriptorSetLayout, Pipeline as PipelineTrait, PipelineBindPoint,
};

/// Vulkan pipeline implementation (graphics or compute)
pub struct Pipeline {
    /// Vulkan pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout (used for descriptor set binding and push constants)
    pub(crate) pipeline_layout: vk::PipelineLayout,
    pub(crate) bind_point: PipelineBindPoint,
    /// Set layouts referenced by `pipeline_layout`
    _set_layouts: Vec<Arc<dyn DescriptorSetLayout>>,
    /// Vulkan device (for cleanup)
    device: ash::Device,
}

impl Pipeline {
    pub(crate) fn new(
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        bind_point: PipelineBindPoint,
        set_layouts: Vec<Arc<dyn DescriptorSetLayout>>,
        device: ash::Device,
    ) -> Self {
        Self { pipeline, pipeline_layout, bind_point, _set_layouts: set_layouts, device }
    }

    pub(crate) fn vk_bind_point(&self) -> vk::PipelineBindPoint {
        match self.bind_point {
            PipelineBindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
            PipelineBindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
        }
    }

    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(pipeline: &dyn PipelineTrait) -> &Self {
        unsafe { &*(pipeline as *const dyn PipelineTrait as *const Self) }
    }
}

impl PipelineTrait for Pipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
    }
}
