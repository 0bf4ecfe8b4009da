/// Descriptor set layout and descriptor set - Vulkan implementations

use ash::vk;
use lumen_3d_engine::lumen3d::device::{
    DescriptorSet as DescriptorSetTrait, DescriptorSetLayout as DescriptorSetLayoutTrait,
    DescriptorType,
};

/// Vulkan descriptor set layout
///
/// Remembers the type of each binding so writes can be checked against it.
pub struct DescriptorSetLayout {
    pub(crate) layout: vk::DescriptorSetLayout,
    pub(crate) bindings: Vec<(u32, DescriptorType)>,
    device: ash::Device,
}

impl DescriptorSetLayout {
    pub(crate) fn new(
        layout: vk::DescriptorSetLayout,
        bindings: Vec<(u32, DescriptorType)>,
        device: ash::Device,
    ) -> Self {
        Self { layout, bindings, device }
    }

    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(layout: &dyn DescriptorSetLayoutTrait) -> &Self {
        unsafe { &*(layout as *const dyn DescriptorSetLayoutTrait as *const Self) }
    }
}

impl DescriptorSetLayoutTrait for DescriptorSetLayout {}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Vulkan descriptor set
///
/// Returned to its pool when dropped (pools are created with
/// FREE_DESCRIPTOR_SET). Must not outlive the device.
pub struct DescriptorSet {
    pub(crate) descriptor_set: vk::DescriptorSet,
    pool: vk::DescriptorPool,
    /// Binding types copied from the layout
    pub(crate) bindings: Vec<(u32, DescriptorType)>,
    device: ash::Device,
}

impl DescriptorSet {
    pub(crate) fn new(
        descriptor_set: vk::DescriptorSet,
        pool: vk::DescriptorPool,
        bindings: Vec<(u32, DescriptorType)>,
        device: ash::Device,
    ) -> Self {
        Self { descriptor_set, pool, bindings, device }
    }

    /// Declared type of a binding, None when the layout has no such binding
    pub(crate) fn binding_type(&self, binding: u32) -> Option<DescriptorType> {
        self.bindings
            .iter()
            .find(|(b, _)| *b == binding)
            .map(|(_, ty)| *ty)
    }

    /// Downcast from the engine trait object
    pub(crate) fn from_dyn(set: &dyn DescriptorSetTrait) -> &Self {
        unsafe { &*(set as *const dyn DescriptorSetTrait as *const Self) }
    }
}

impl DescriptorSetTrait for DescriptorSet {}

impl Drop for DescriptorSet {
    fn drop(&mut self) {
        unsafe {
            self.device
                .free_descriptor_sets(self.pool, &[self.descriptor_set])
                .ok();
        }
    }
}
