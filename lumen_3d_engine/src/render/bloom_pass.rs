/// Bloom - separable two-phase compute blur over the compose bloom target
///
/// Horizontal phase reads `bloom` and writes `temp`; vertical phase reads
/// `temp` and writes back into `bloom`. Both images stay in `GENERAL` while
/// the blur runs. The final barrier hands `bloom` to the post pass in
/// `SHADER_READ_ONLY`.

use std::mem::size_of;
use std::sync::Arc;
use crate::config::{Config, BLOOM_WORKGROUP_SIZE};
use crate::error::Result;
use crate::graphics_device::{
    Access, Attachment, AttachmentDesc, AttachmentUsage, CommandList, ComputePipelineDesc,
    DescriptorBinding, DescriptorResource, DescriptorSet, DescriptorSetLayout, DescriptorType,
    DescriptorWrite, GraphicsDevice, ImageBarrier, ImageLayout, Pipeline, PipelineStage,
    PushConstantRange, SampleCount, ShaderStage, TextureFormat,
};
use crate::render::{
    fit_descriptor_sets, group_count, load_shader, BloomPush, ComposePass, PassFrameBuffer,
};

pub struct BloomPass {
    set_layout: Arc<dyn DescriptorSetLayout>,
    pipeline: Arc<dyn Pipeline>,
    /// bloom -> temp
    horizontal_sets: Vec<Arc<dyn DescriptorSet>>,
    /// temp -> bloom
    vertical_sets: Vec<Arc<dyn DescriptorSet>>,
    temp: Option<Arc<dyn Attachment>>,
    bloom: Option<Arc<dyn Attachment>>,
    width: u32,
    height: u32,
}

impl BloomPass {
    pub const TEMP_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;

    pub fn new(
        device: &dyn GraphicsDevice,
        config: &Config,
        width: u32,
        height: u32,
        image_count: usize,
        compose: &ComposePass,
    ) -> Result<Self> {
        let storage = |binding| DescriptorBinding {
            binding,
            descriptor_type: DescriptorType::StorageImage,
            stages: vec![ShaderStage::Compute],
        };
        let set_layout = device.create_descriptor_set_layout(&[storage(0), storage(1)])?;

        let shader = load_shader(device, &config.shader_dir, "bloom.comp.spv", ShaderStage::Compute)?;
        let pipeline = device.create_compute_pipeline(&ComputePipelineDesc {
            shader,
            descriptor_set_layouts: vec![Arc::clone(&set_layout)],
            push_constants: vec![PushConstantRange {
                stages: vec![ShaderStage::Compute],
                offset: 0,
                size: size_of::<BloomPush>() as u32,
            }],
        })?;

        let mut pass = Self {
            set_layout,
            pipeline,
            horizontal_sets: Vec::new(),
            vertical_sets: Vec::new(),
            temp: None,
            bloom: None,
            width: 0,
            height: 0,
        };
        pass.recreate_framebuffer(device, width, height, image_count, compose)?;
        Ok(pass)
    }

    /// Recreate the temp image in `GENERAL` and rewrite both set lists
    pub fn recreate_framebuffer(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
        image_count: usize,
        compose: &ComposePass,
    ) -> Result<()> {
        self.destroy();

        let temp = device.create_attachment(&AttachmentDesc {
            format: Self::TEMP_FORMAT,
            usage: AttachmentUsage::STORAGE,
            samples: SampleCount::S1,
            width,
            height,
        })?;
        device.transition_image_layout(&temp, ImageLayout::Undefined, ImageLayout::General, 1, 1)?;
        let bloom = Arc::clone(compose.bloom());

        fit_descriptor_sets(device, &self.set_layout, &mut self.horizontal_sets, image_count)?;
        fit_descriptor_sets(device, &self.set_layout, &mut self.vertical_sets, image_count)?;
        let phases = [
            (&self.horizontal_sets, &bloom, &temp),
            (&self.vertical_sets, &temp, &bloom),
        ];
        for (sets, source, destination) in phases {
            for set in sets {
                device.update_descriptor_set(set, &[
                    DescriptorWrite { binding: 0, resource: DescriptorResource::StorageImage(Arc::clone(source)) },
                    DescriptorWrite { binding: 1, resource: DescriptorResource::StorageImage(Arc::clone(destination)) },
                ])?;
            }
        }

        self.temp = Some(temp);
        self.bloom = Some(bloom);
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn image_count(&self) -> usize {
        self.horizontal_sets.len()
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn temp(&self) -> &Arc<dyn Attachment> {
        match &self.temp {
            Some(temp) => temp,
            None => panic!("bloom pass used after destroy"),
        }
    }

    pub fn horizontal_set(&self, image_index: u32) -> &Arc<dyn DescriptorSet> {
        &self.horizontal_sets[image_index as usize]
    }

    pub fn vertical_set(&self, image_index: u32) -> &Arc<dyn DescriptorSet> {
        &self.vertical_sets[image_index as usize]
    }

    /// Workgroups per dispatch: `ceil(w/16) x ceil(h/16) x 1`
    pub fn dispatch_size(&self) -> (u32, u32, u32) {
        (
            group_count(self.width, BLOOM_WORKGROUP_SIZE),
            group_count(self.height, BLOOM_WORKGROUP_SIZE),
            1,
        )
    }

    /// Record both blur phases and the hand-off barrier
    pub fn record(&self, cmd: &mut dyn CommandList, image_index: u32) -> Result<()> {
        assert!(
            (image_index as usize) < self.image_count(),
            "image index {} out of range ({} bloom sets)",
            image_index,
            self.image_count()
        );
        let (Some(bloom), Some(temp)) = (&self.bloom, &self.temp) else {
            panic!("bloom pass used after destroy");
        };
        let (x, y, z) = self.dispatch_size();

        cmd.image_barrier(&ImageBarrier::general(
            bloom,
            PipelineStage::COLOR_ATTACHMENT_OUTPUT,
            Access::COLOR_ATTACHMENT_WRITE,
            PipelineStage::COMPUTE_SHADER,
            Access::SHADER_READ,
        ))?;
        cmd.image_barrier(&ImageBarrier::general(
            temp,
            PipelineStage::COMPUTE_SHADER,
            Access::SHADER_READ,
            PipelineStage::COMPUTE_SHADER,
            Access::SHADER_WRITE,
        ))?;

        cmd.bind_pipeline(&self.pipeline)?;
        cmd.bind_descriptor_sets(&self.pipeline, 0, &[self.horizontal_set(image_index)])?;
        cmd.push_constants(&self.pipeline, &[ShaderStage::Compute], 0, bytemuck::bytes_of(&BloomPush::HORIZONTAL))?;
        cmd.dispatch(x, y, z)?;

        cmd.image_barrier(&ImageBarrier::general(
            temp,
            PipelineStage::COMPUTE_SHADER,
            Access::SHADER_WRITE,
            PipelineStage::COMPUTE_SHADER,
            Access::SHADER_READ,
        ))?;
        cmd.image_barrier(&ImageBarrier::general(
            bloom,
            PipelineStage::COMPUTE_SHADER,
            Access::SHADER_READ,
            PipelineStage::COMPUTE_SHADER,
            Access::SHADER_WRITE,
        ))?;

        cmd.bind_descriptor_sets(&self.pipeline, 0, &[self.vertical_set(image_index)])?;
        cmd.push_constants(&self.pipeline, &[ShaderStage::Compute], 0, bytemuck::bytes_of(&BloomPush::VERTICAL))?;
        cmd.dispatch(x, y, z)?;

        cmd.image_barrier(&ImageBarrier::transition(bloom, ImageLayout::General, ImageLayout::ShaderReadOnly)?)
    }
}

impl PassFrameBuffer for BloomPass {
    fn destroy(&mut self) {
        self.bloom = None;
        self.temp = None;
        self.width = 0;
        self.height = 0;
    }

    fn is_destroyed(&self) -> bool {
        self.temp.is_none()
    }
}

#[cfg(test)]
#[path = "bloom_pass_tests.rs"]
mod tests;
