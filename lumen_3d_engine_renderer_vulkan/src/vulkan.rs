/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait

use lumen_3d_engine::lumen3d::{GraphicsDevice, Result, Error, Config, DESCRIPTOR_POOL_MAX_SETS};
use lumen_3d_engine::lumen3d::device::{
    Attachment as AttachmentTrait, AttachmentDesc, AttachmentUsage, ImageAspect, TextureFormat,
    aspect_for_usage, validate_texture_data,
    Buffer as BufferTrait, BufferUsage,
    Shader as ShaderTrait, ShaderDesc,
    RenderPass as RenderPassTrait, RenderPassDesc, DependencyDirection,
    Framebuffer as FramebufferTrait, FramebufferDesc,
    DescriptorSetLayout as DescriptorSetLayoutTrait, DescriptorSet as DescriptorSetTrait,
    DescriptorBinding, DescriptorWrite, DescriptorResource, DescriptorType,
    Pipeline as PipelineTrait, GraphicsPipelineDesc, ComputePipelineDesc, PipelineBindPoint,
    CommandList as CommandListTrait, Swapchain as SwapchainTrait,
    ImageLayout, LayoutTransition, SampleCount, transition_masks,
};
use ash::vk;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, PoisonError};
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc, AllocationCreateDesc, AllocationScheme};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use lumen_3d_engine::{engine_trace, engine_debug, engine_info, engine_warn, engine_error, engine_bail, engine_err};

use crate::debug;
use crate::vulkan_attachment::Attachment;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::{GpuContext, LOG_SOURCE};
use crate::vulkan_convert::{
    aspect_to_vk, attachment_usage_to_vk, blend_state_to_vk, buffer_usage_to_vk,
    compare_op_to_vk, cull_mode_to_vk, descriptor_type_to_vk, image_layout_to_vk,
    load_op_to_vk, sample_count_to_vk, shader_stage_to_vk, shader_stages_to_vk,
    store_op_to_vk, texture_format_to_vk, vertex_format_to_vk, pipeline_stage_to_vk,
    access_to_vk,
};
use crate::vulkan_descriptor_set::{DescriptorSet, DescriptorSetLayout};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_physical_device::{max_usable_sample_count, pick_physical_device};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader::Shader;
use crate::vulkan_swapchain::Swapchain;

const VALIDATION_LAYER: &std::ffi::CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan device implementation
///
/// Central object for creating resources and submitting commands. Owns the
/// window surface; swapchains borrow it.
pub struct VulkanGraphicsDevice {
    /// Vulkan entry (keeps the loader alive)
    _entry: ash::Entry,
    /// Vulkan instance
    instance: ash::Instance,
    /// Physical device
    physical_device: vk::PhysicalDevice,
    /// Logical device reference (also stored in GpuContext)
    device: ash::Device,

    /// Graphics + compute queue
    graphics_queue: vk::Queue,
    graphics_queue_family: u32,
    /// Present queue (may be same as graphics)
    present_queue: vk::Queue,

    /// Window surface
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    /// Validation messenger, present only when validation is active
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,

    /// GPU memory allocator reference (stored in GpuContext)
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Descriptor pools (grows dynamically when exhausted)
    descriptor_pools: Mutex<Vec<vk::DescriptorPool>>,
    /// Internal sampler cache (creates VkSampler on first use, behind Mutex for &self access)
    sampler_cache: Mutex<SamplerCache>,

    msaa_samples: SampleCount,

    /// Shared GPU context for attachments and buffers
    gpu_context: Arc<GpuContext>,
}

impl VulkanGraphicsDevice {
    /// Create a descriptor pool with fixed capacity.
    /// Called during init and when the current pool is exhausted.
    fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 2 * DESCRIPTOR_POOL_MAX_SETS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_IMAGE,
                descriptor_count: DESCRIPTOR_POOL_MAX_SETS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: DESCRIPTOR_POOL_MAX_SETS,
            },
        ];
        // Sets are returned to their pool when dropped
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(DESCRIPTOR_POOL_MAX_SETS);

        unsafe {
            device.create_descriptor_pool(&info, None)
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to create descriptor pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
                })
        }
    }

    /// Create a new Vulkan device for a window
    ///
    /// # Arguments
    ///
    /// * `window` - Window for surface creation
    /// * `config` - Renderer configuration
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &Config,
    ) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Invalid application name: {}", e);
                    Error::InitializationFailed(format!("Invalid application name: {}", e))
                })?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Lumen3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            // Get required extensions
            let display_handle = window.display_handle()
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to get display handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            let enable_validation = Self::validation_available(&entry, config);
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if enable_validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            let debug_messenger = if enable_validation {
                Some(Self::create_debug_messenger(&entry, &instance, config)?)
            } else {
                None
            };

            // Create Surface (kept for the device's whole lifetime)
            let window_handle = window.window_handle()
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to get window handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get window handle: {}", e))
                })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!(LOG_SOURCE, "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, queue_families) =
                pick_physical_device(&instance, &surface_loader, surface)?;
            let properties = instance.get_physical_device_properties(physical_device);
            let msaa_samples = max_usable_sample_count(&properties.limits);

            // Create Logical Device
            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(queue_families.graphics)
                    .queue_priorities(&queue_priorities),
            ];
            if queue_families.present != queue_families.graphics {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(queue_families.present)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(queue_families.graphics, 0);
            let present_queue = device.get_device_queue(queue_families.present, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!(LOG_SOURCE, "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let descriptor_pool = Self::create_descriptor_pool(&device)?;

            // Upload command pool (TRANSIENT + RESET for reusable one-shot submissions)
            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_families.graphics)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = device.create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e))
                })?;

            let allocator_arc = Arc::new(Mutex::new(allocator));
            let gpu_context = Arc::new(GpuContext::new(
                device.clone(),
                Arc::clone(&allocator_arc),
                graphics_queue,
                queue_families.graphics,
                upload_command_pool,
            ));

            let sampler_cache = SamplerCache::new(device.clone(), properties.limits.max_sampler_anisotropy);

            engine_info!(LOG_SOURCE, "Vulkan device ready (graphics family {}, present family {}, up to {} samples)",
                queue_families.graphics, queue_families.present, msaa_samples.count());

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                graphics_queue,
                graphics_queue_family: queue_families.graphics,
                present_queue,
                surface,
                surface_loader,
                debug_messenger,
                allocator: ManuallyDrop::new(allocator_arc),
                descriptor_pools: Mutex::new(vec![descriptor_pool]),
                sampler_cache: Mutex::new(sampler_cache),
                msaa_samples,
                gpu_context,
            })
        }
    }

    /// Validation needs the config flag, the `vulkan-validation` feature and
    /// an installed Khronos validation layer
    fn validation_available(entry: &ash::Entry, config: &Config) -> bool {
        if !config.enable_validation {
            return false;
        }
        if !cfg!(feature = "vulkan-validation") {
            engine_warn!(LOG_SOURCE, "Validation requested but the vulkan-validation feature is disabled");
            return false;
        }

        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let found = layers
            .iter()
            .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER));
        if !found {
            engine_warn!(LOG_SOURCE, "Validation requested but {:?} is not installed", VALIDATION_LAYER);
        }
        found
    }

    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &Config,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        debug::init_debug_config(debug::Config {
            severity: config.debug_severity,
            enable_stats: config.enable_validation_stats,
        });

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(debug::severity_flags(config.debug_severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            )
            .pfn_user_callback(Some(debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| {
                engine_error!(LOG_SOURCE, "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?;

        engine_debug!(LOG_SOURCE, "Validation layers enabled ({:?})", config.debug_severity);
        Ok((debug_utils, messenger))
    }

    /// Create a buffer and bind freshly allocated memory to it
    fn allocate_buffer(
        &self,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<Buffer> {
        if size == 0 {
            engine_error!(LOG_SOURCE, "Cannot create a zero-sized {} buffer", name);
            return Err(Error::InvalidResource(format!("zero-sized {} buffer", name)));
        }

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create buffer of size {} bytes: {:?}", size, e))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);

            let allocated = self.gpu_context.lock_allocator().and_then(|mut allocator| {
                allocator.allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_e| {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(LOG_SOURCE, "Out of GPU memory for {} buffer (required: {:.2} MB)", name, size_mb);
                    Error::OutOfMemory
                })
            });
            let allocation = match allocated {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            // From here on, Buffer's Drop releases both the handle and the memory
            let wrapped = Buffer::new(Arc::clone(&self.gpu_context), buffer, allocation, size);

            let memory = wrapped.allocation.as_ref().map(|a| (a.memory(), a.offset()));
            if let Some((memory, offset)) = memory {
                self.device.bind_buffer_memory(buffer, memory, offset)
                    .map_err(|e| engine_err!(LOG_SOURCE, "Failed to bind buffer memory: {:?}", e))?;
            }

            Ok(wrapped)
        }
    }

    /// Create a 2D image with dedicated memory and a single-mip view
    fn allocate_image(
        &self,
        desc: &AttachmentDesc,
        aspect: ImageAspect,
        usage: vk::ImageUsageFlags,
        name: &str,
    ) -> Result<Attachment> {
        unsafe {
            let format = texture_format_to_vk(desc.format);

            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(sample_count_to_vk(desc.samples))
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = self.device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create {} image: {:?}", name, e))?;

            let requirements = self.device.get_image_memory_requirements(image);

            let allocated = self.gpu_context.lock_allocator().and_then(|mut allocator| {
                allocator.allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_e| {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(LOG_SOURCE, "Out of GPU memory for {} (size: {}x{}, {:?}, {:.2} MB)",
                        name, desc.width, desc.height, desc.format, size_mb);
                    Error::OutOfMemory
                })
            });
            let allocation = match allocated {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            let bound = self.device.bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to bind {} memory: {:?}", name, e))
                .and_then(|()| {
                    // Stencil is never part of the view so depth can be sampled
                    let view_create_info = vk::ImageViewCreateInfo::default()
                        .image(image)
                        .view_type(vk::ImageViewType::TYPE_2D)
                        .format(format)
                        .components(vk::ComponentMapping {
                            r: vk::ComponentSwizzle::IDENTITY,
                            g: vk::ComponentSwizzle::IDENTITY,
                            b: vk::ComponentSwizzle::IDENTITY,
                            a: vk::ComponentSwizzle::IDENTITY,
                        })
                        .subresource_range(vk::ImageSubresourceRange {
                            aspect_mask: aspect_to_vk(aspect),
                            base_mip_level: 0,
                            level_count: 1,
                            base_array_layer: 0,
                            layer_count: 1,
                        });

                    self.device.create_image_view(&view_create_info, None)
                        .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create {} view: {:?}", name, e))
                });

            let view = match bound {
                Ok(view) => view,
                Err(e) => {
                    if let Ok(mut allocator) = self.gpu_context.lock_allocator() {
                        allocator.free(allocation).ok();
                    }
                    self.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            Ok(Attachment::new_owned(
                Arc::clone(&self.gpu_context),
                image,
                view,
                allocation,
                aspect,
                desc.format,
                desc.usage,
                desc.samples,
                desc.width,
                desc.height,
            ))
        }
    }

    /// Grab descriptor sets from the newest pool, adding a pool when it runs dry
    fn allocate_raw_sets(
        &self,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<(vk::DescriptorPool, Vec<vk::DescriptorSet>)> {
        let mut pools = self.descriptor_pools.lock()
            .map_err(|_| engine_err!(LOG_SOURCE, "Descriptor pool lock poisoned"))?;
        let current_pool = *pools.last()
            .ok_or_else(|| engine_err!(LOG_SOURCE, "No descriptor pool available"))?;

        unsafe {
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(current_pool)
                .set_layouts(layouts);

            match self.device.allocate_descriptor_sets(&allocate_info) {
                Ok(sets) => Ok((current_pool, sets)),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                    let new_pool = Self::create_descriptor_pool(&self.device)?;
                    pools.push(new_pool);
                    engine_info!(LOG_SOURCE,
                        "Descriptor pool exhausted, created new pool (total: {})",
                        pools.len()
                    );
                    let retry_info = vk::DescriptorSetAllocateInfo::default()
                        .descriptor_pool(new_pool)
                        .set_layouts(layouts);
                    let sets = self.device.allocate_descriptor_sets(&retry_info)
                        .map_err(|e| engine_err!(LOG_SOURCE,
                            "Failed to allocate descriptor sets after pool growth: {:?}", e))?;
                    Ok((new_pool, sets))
                }
                Err(e) => Err(engine_err!(LOG_SOURCE, "Failed to allocate descriptor sets: {:?}", e)),
            }
        }
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[Arc<dyn DescriptorSetLayoutTrait>],
        push_constants: &[lumen_3d_engine::lumen3d::device::PushConstantRange],
    ) -> Result<vk::PipelineLayout> {
        let vk_set_layouts: Vec<vk::DescriptorSetLayout> = set_layouts
            .iter()
            .map(|layout| DescriptorSetLayout::from_dyn(layout.as_ref()).layout)
            .collect();

        let push_constant_ranges: Vec<vk::PushConstantRange> = push_constants
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: shader_stages_to_vk(&range.stages),
                offset: range.offset,
                size: range.size,
            })
            .collect();

        let layout_create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&vk_set_layouts)
            .push_constant_ranges(&push_constant_ranges);

        unsafe {
            self.device.create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create pipeline layout: {:?}", e))
        }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_attachment(&self, desc: &AttachmentDesc) -> Result<Arc<dyn AttachmentTrait>> {
        let aspect = aspect_for_usage(desc.usage, desc.format).map_err(|e| {
            engine_error!(LOG_SOURCE, "create_attachment: {}", e);
            e
        })?;

        let attachment = self.allocate_image(desc, aspect, attachment_usage_to_vk(desc.usage), "attachment")?;
        engine_trace!(LOG_SOURCE, "Attachment {}x{} {:?} {:?}", desc.width, desc.height, desc.format, desc.usage);
        Ok(Arc::new(attachment))
    }

    fn create_texture(
        &self,
        format: TextureFormat,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Arc<dyn AttachmentTrait>> {
        validate_texture_data(format, width, height, pixels.len()).map_err(|e| {
            engine_error!(LOG_SOURCE, "create_texture: {}", e);
            e
        })?;

        let staging = self.allocate_buffer(
            pixels.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "texture staging",
        )?;
        staging.update(0, pixels)?;

        let desc = AttachmentDesc {
            format,
            usage: AttachmentUsage::COLOR,
            samples: SampleCount::S1,
            width,
            height,
        };
        let texture = self.allocate_image(
            &desc,
            ImageAspect::Color,
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            "texture",
        )?;

        let to_transfer = transition_masks(ImageLayout::Undefined, ImageLayout::TransferDst)?;
        let to_shader = transition_masks(ImageLayout::TransferDst, ImageLayout::ShaderReadOnly)?;
        let subresource_range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        let barrier = |old, new, masks: &LayoutTransition| {
            vk::ImageMemoryBarrier::default()
                .old_layout(image_layout_to_vk(old))
                .new_layout(image_layout_to_vk(new))
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(texture.image)
                .subresource_range(subresource_range)
                .src_access_mask(access_to_vk(masks.src_access))
                .dst_access_mask(access_to_vk(masks.dst_access))
        };

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D { width, height, depth: 1 });

        self.gpu_context.submit_one_shot(|command_buffer| unsafe {
            self.device.cmd_pipeline_barrier(
                command_buffer,
                pipeline_stage_to_vk(to_transfer.src_stage),
                pipeline_stage_to_vk(to_transfer.dst_stage),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier(ImageLayout::Undefined, ImageLayout::TransferDst, &to_transfer)],
            );
            self.device.cmd_copy_buffer_to_image(
                command_buffer,
                staging.buffer,
                texture.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
            self.device.cmd_pipeline_barrier(
                command_buffer,
                pipeline_stage_to_vk(to_shader.src_stage),
                pipeline_stage_to_vk(to_shader.dst_stage),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier(ImageLayout::TransferDst, ImageLayout::ShaderReadOnly, &to_shader)],
            );
        })?;

        engine_trace!(LOG_SOURCE, "Texture {}x{} {:?} uploaded ({} bytes)", width, height, format, pixels.len());
        Ok(Arc::new(texture))
    }

    fn create_host_buffer(&self, size: u64, usage: BufferUsage) -> Result<Arc<dyn BufferTrait>> {
        let buffer = self.allocate_buffer(size, buffer_usage_to_vk(usage), MemoryLocation::CpuToGpu, "host")?;
        Ok(Arc::new(buffer))
    }

    fn create_device_buffer(&self, data: &[u8], usage: BufferUsage) -> Result<Arc<dyn BufferTrait>> {
        let size = data.len() as u64;

        let staging = self.allocate_buffer(
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "staging",
        )?;
        staging.update(0, data)?;

        let buffer = self.allocate_buffer(
            size,
            buffer_usage_to_vk(usage) | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
            "device",
        )?;

        let region = vk::BufferCopy { src_offset: 0, dst_offset: 0, size };
        self.gpu_context.submit_one_shot(|command_buffer| unsafe {
            self.device.cmd_copy_buffer(command_buffer, staging.buffer, buffer.buffer, &[region]);
        })?;

        Ok(Arc::new(buffer))
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<Arc<dyn ShaderTrait>> {
        if desc.code.is_empty() {
            engine_error!(LOG_SOURCE, "Empty SPIR-V for {:?} shader", desc.stage);
            return Err(Error::InvalidResource(format!("empty SPIR-V for {:?} shader", desc.stage)));
        }

        let entry_point = CString::new(desc.entry_point).map_err(|e| {
            engine_error!(LOG_SOURCE, "Invalid shader entry point {:?}: {}", desc.entry_point, e);
            Error::InvalidResource(format!("invalid shader entry point {:?}", desc.entry_point))
        })?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(desc.code);
        let module = unsafe {
            self.device.create_shader_module(&create_info, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create shader module: {:?}", e))?
        };

        Ok(Arc::new(Shader {
            module,
            stage: desc.stage,
            entry_point,
            device: self.device.clone(),
        }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPassTrait>> {
        let mut attachments = Vec::with_capacity(desc.color_attachments.len() + 1);
        let mut color_attachment_refs = Vec::with_capacity(desc.color_attachments.len());

        let describe = |ops: &lumen_3d_engine::lumen3d::device::AttachmentOps| {
            vk::AttachmentDescription::default()
                .format(texture_format_to_vk(ops.format))
                .samples(sample_count_to_vk(ops.samples))
                .load_op(load_op_to_vk(ops.load_op))
                .store_op(store_op_to_vk(ops.store_op))
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(image_layout_to_vk(ops.initial_layout))
                .final_layout(image_layout_to_vk(ops.final_layout))
        };

        for (i, color_attachment) in desc.color_attachments.iter().enumerate() {
            attachments.push(describe(color_attachment));
            color_attachment_refs.push(vk::AttachmentReference::default()
                .attachment(i as u32)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
        }

        let depth_attachment_ref = desc.depth_attachment.as_ref().map(|depth_attachment| {
            let depth_index = attachments.len() as u32;
            attachments.push(describe(depth_attachment));
            vk::AttachmentReference::default()
                .attachment(depth_index)
                .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        });

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachment_refs);

        if let Some(ref depth_ref) = depth_attachment_ref {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        let dependencies: Vec<vk::SubpassDependency> = desc.dependencies
            .iter()
            .map(|dependency| {
                let (src_subpass, dst_subpass) = match dependency.direction {
                    DependencyDirection::Incoming => (vk::SUBPASS_EXTERNAL, 0),
                    DependencyDirection::Outgoing => (0, vk::SUBPASS_EXTERNAL),
                };
                vk::SubpassDependency::default()
                    .src_subpass(src_subpass)
                    .dst_subpass(dst_subpass)
                    .src_stage_mask(pipeline_stage_to_vk(dependency.src_stage))
                    .dst_stage_mask(pipeline_stage_to_vk(dependency.dst_stage))
                    .src_access_mask(access_to_vk(dependency.src_access))
                    .dst_access_mask(access_to_vk(dependency.dst_access))
            })
            .collect();

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);

        let render_pass = unsafe {
            self.device.create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create render pass: {:?}", e))?
        };

        Ok(Arc::new(RenderPass {
            render_pass,
            color_attachment_count: desc.color_attachments.len(),
            has_depth: desc.depth_attachment.is_some(),
            device: self.device.clone(),
        }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn FramebufferTrait>> {
        let vk_render_pass = RenderPass::from_dyn(desc.render_pass.as_ref());

        let expected = vk_render_pass.color_attachment_count + usize::from(vk_render_pass.has_depth);
        if desc.attachments.len() != expected {
            engine_bail!(LOG_SOURCE,
                "create_framebuffer: {} attachments given, render pass expects {}",
                desc.attachments.len(), expected);
        }

        let views: Vec<vk::ImageView> = desc.attachments
            .iter()
            .map(|attachment| Attachment::from_dyn(attachment.as_ref()).view)
            .collect();

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe {
            self.device.create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create framebuffer: {:?}", e))?
        };

        Ok(Arc::new(Framebuffer::new(
            framebuffer,
            desc.width,
            desc.height,
            desc.attachments.clone(),
            self.device.clone(),
        )))
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<Arc<dyn DescriptorSetLayoutTrait>> {
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|binding| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding.binding)
                    .descriptor_type(descriptor_type_to_vk(binding.descriptor_type))
                    .descriptor_count(1)
                    .stage_flags(shader_stages_to_vk(&binding.stages))
            })
            .collect();

        let layout_create = vk::DescriptorSetLayoutCreateInfo::default()
            .bindings(&vk_bindings);

        let layout = unsafe {
            self.device.create_descriptor_set_layout(&layout_create, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create descriptor set layout: {:?}", e))?
        };

        Ok(Arc::new(DescriptorSetLayout::new(
            layout,
            bindings.iter().map(|b| (b.binding, b.descriptor_type)).collect(),
            self.device.clone(),
        )))
    }

    fn allocate_descriptor_sets(
        &self,
        layout: &Arc<dyn DescriptorSetLayoutTrait>,
        count: usize,
    ) -> Result<Vec<Arc<dyn DescriptorSetTrait>>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let vk_layout = DescriptorSetLayout::from_dyn(layout.as_ref());
        let layouts = vec![vk_layout.layout; count];
        let (pool, sets) = self.allocate_raw_sets(&layouts)?;

        Ok(sets
            .into_iter()
            .map(|set| {
                Arc::new(DescriptorSet::new(
                    set,
                    pool,
                    vk_layout.bindings.clone(),
                    self.device.clone(),
                )) as Arc<dyn DescriptorSetTrait>
            })
            .collect())
    }

    fn update_descriptor_set(
        &self,
        set: &Arc<dyn DescriptorSetTrait>,
        writes: &[DescriptorWrite],
    ) -> Result<()> {
        let vk_set = DescriptorSet::from_dyn(set.as_ref());

        // Infos first: the write structs point into these vectors
        let mut buffer_infos: Vec<vk::DescriptorBufferInfo> = Vec::with_capacity(writes.len());
        let mut image_infos: Vec<vk::DescriptorImageInfo> = Vec::with_capacity(writes.len());

        for write in writes {
            let expected = match &write.resource {
                DescriptorResource::SampledImage(..) => DescriptorType::CombinedImageSampler,
                DescriptorResource::StorageImage(_) => DescriptorType::StorageImage,
                DescriptorResource::UniformBuffer(_) => DescriptorType::UniformBuffer,
            };
            if vk_set.binding_type(write.binding) != Some(expected) {
                engine_error!(LOG_SOURCE, "Descriptor write to binding {} does not match layout ({:?} expected {:?})",
                    write.binding, vk_set.binding_type(write.binding), expected);
                return Err(Error::InvalidResource(format!(
                    "descriptor binding {} is not a {:?}", write.binding, expected
                )));
            }

            match &write.resource {
                DescriptorResource::SampledImage(attachment, sampler_kind) => {
                    let sampler = self.sampler_cache.lock()
                        .map_err(|_| engine_err!(LOG_SOURCE, "Sampler cache lock poisoned"))?
                        .get(*sampler_kind)?;
                    image_infos.push(vk::DescriptorImageInfo::default()
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                        .image_view(Attachment::from_dyn(attachment.as_ref()).view)
                        .sampler(sampler));
                }
                DescriptorResource::StorageImage(attachment) => {
                    image_infos.push(vk::DescriptorImageInfo::default()
                        .image_layout(vk::ImageLayout::GENERAL)
                        .image_view(Attachment::from_dyn(attachment.as_ref()).view));
                }
                DescriptorResource::UniformBuffer(buffer) => {
                    buffer_infos.push(vk::DescriptorBufferInfo::default()
                        .buffer(Buffer::from_dyn(buffer.as_ref()).buffer)
                        .offset(0)
                        .range(vk::WHOLE_SIZE));
                }
            }
        }

        let mut buffer_idx = 0usize;
        let mut image_idx = 0usize;
        let vk_writes: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .map(|write| {
                let base = vk::WriteDescriptorSet::default()
                    .dst_set(vk_set.descriptor_set)
                    .dst_binding(write.binding)
                    .dst_array_element(0);
                match &write.resource {
                    DescriptorResource::UniformBuffer(_) => {
                        let info = std::slice::from_ref(&buffer_infos[buffer_idx]);
                        buffer_idx += 1;
                        base.descriptor_type(vk::DescriptorType::UNIFORM_BUFFER).buffer_info(info)
                    }
                    DescriptorResource::SampledImage(..) => {
                        let info = std::slice::from_ref(&image_infos[image_idx]);
                        image_idx += 1;
                        base.descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER).image_info(info)
                    }
                    DescriptorResource::StorageImage(_) => {
                        let info = std::slice::from_ref(&image_infos[image_idx]);
                        image_idx += 1;
                        base.descriptor_type(vk::DescriptorType::STORAGE_IMAGE).image_info(info)
                    }
                }
            })
            .collect();

        unsafe {
            self.device.update_descriptor_sets(&vk_writes, &[]);
        }
        Ok(())
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn PipelineTrait>> {
        let vk_render_pass = RenderPass::from_dyn(desc.render_pass.as_ref());
        if desc.color_targets.len() != vk_render_pass.color_attachment_count {
            engine_bail!(LOG_SOURCE,
                "create_graphics_pipeline: {} blend states for {} color attachments",
                desc.color_targets.len(), vk_render_pass.color_attachment_count);
        }

        let vertex_shader = Shader::from_dyn(desc.vertex_shader.as_ref());
        let mut shader_stages = vec![
            vk::PipelineShaderStageCreateInfo::default()
                .stage(shader_stage_to_vk(vertex_shader.stage))
                .module(vertex_shader.module)
                .name(&vertex_shader.entry_point),
        ];
        if let Some(fragment) = &desc.fragment_shader {
            let fragment_shader = Shader::from_dyn(fragment.as_ref());
            shader_stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(fragment_shader.stage))
                    .module(fragment_shader.module)
                    .name(&fragment_shader.entry_point),
            );
        }

        // Single interleaved vertex stream at binding 0
        let (vertex_bindings, vertex_attributes) = match &desc.vertex_layout {
            Some(layout) => (
                vec![vk::VertexInputBindingDescription {
                    binding: 0,
                    stride: layout.stride,
                    input_rate: vk::VertexInputRate::VERTEX,
                }],
                layout.attributes
                    .iter()
                    .map(|attribute| vk::VertexInputAttributeDescription {
                        location: attribute.location,
                        binding: 0,
                        format: vertex_format_to_vk(attribute.format),
                        offset: attribute.offset,
                    })
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport state (dynamic)
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.cull_mode))
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth.test)
            .depth_write_enable(desc.depth.write)
            .depth_compare_op(compare_op_to_vk(desc.depth.compare))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(sample_count_to_vk(desc.samples));

        let color_blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc.color_targets
            .iter()
            .map(|&mode| blend_state_to_vk(mode))
            .collect();

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let layout = self.create_pipeline_layout(&desc.descriptor_set_layouts, &desc.push_constants)?;

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .depth_stencil_state(&depth_stencil_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(vk_render_pass.render_pass)
            .subpass(0);

        let pipelines = unsafe {
            self.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info],
                None,
            )
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { self.device.destroy_pipeline_layout(layout, None); }
                return Err(engine_err!(LOG_SOURCE, "Failed to create graphics pipeline: {:?}", e));
            }
        };

        Ok(Arc::new(Pipeline::new(
            pipeline,
            layout,
            PipelineBindPoint::Graphics,
            desc.descriptor_set_layouts.clone(),
            self.device.clone(),
        )))
    }

    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Result<Arc<dyn PipelineTrait>> {
        let shader = Shader::from_dyn(desc.shader.as_ref());
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(shader_stage_to_vk(shader.stage))
            .module(shader.module)
            .name(&shader.entry_point);

        let layout = self.create_pipeline_layout(&desc.descriptor_set_layouts, &desc.push_constants)?;

        let pipeline_create_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(layout);

        let pipelines = unsafe {
            self.device.create_compute_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info],
                None,
            )
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { self.device.destroy_pipeline_layout(layout, None); }
                return Err(engine_err!(LOG_SOURCE, "Failed to create compute pipeline: {:?}", e));
            }
        };

        Ok(Arc::new(Pipeline::new(
            pipeline,
            layout,
            PipelineBindPoint::Compute,
            desc.descriptor_set_layouts.clone(),
            self.device.clone(),
        )))
    }

    fn transition_image_layout(
        &self,
        attachment: &Arc<dyn AttachmentTrait>,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
        mip_levels: u32,
        layer_count: u32,
    ) -> Result<()> {
        let masks = transition_masks(old_layout, new_layout).map_err(|e| {
            engine_error!(LOG_SOURCE, "transition_image_layout: {}", e);
            e
        })?;
        let vk_attachment = Attachment::from_dyn(attachment.as_ref());

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(image_layout_to_vk(old_layout))
            .new_layout(image_layout_to_vk(new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(vk_attachment.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_to_vk(vk_attachment.aspect),
                base_mip_level: 0,
                level_count: mip_levels,
                base_array_layer: 0,
                layer_count,
            })
            .src_access_mask(access_to_vk(masks.src_access))
            .dst_access_mask(access_to_vk(masks.dst_access));

        self.gpu_context.submit_one_shot(|command_buffer| unsafe {
            self.device.cmd_pipeline_barrier(
                command_buffer,
                pipeline_stage_to_vk(masks.src_stage),
                pipeline_stage_to_vk(masks.dst_stage),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        })
    }

    fn create_swapchain(&self, width: u32, height: u32) -> Result<Box<dyn SwapchainTrait>> {
        let swapchain = Swapchain::new(
            self.device.clone(),
            &self.instance,
            self.physical_device,
            self.surface,
            self.surface_loader.clone(),
            self.present_queue,
            width,
            height,
        )?;
        Ok(Box::new(swapchain))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandListTrait>> {
        let command_list = CommandList::new(self.device.clone(), self.graphics_queue_family)?;
        Ok(Box::new(command_list))
    }

    fn submit_with_swapchain(
        &self,
        commands: &[&dyn CommandListTrait],
        swapchain: &dyn SwapchainTrait,
        image_index: u32,
    ) -> Result<()> {
        let vk_swapchain = Swapchain::from_dyn(swapchain);
        let (wait_semaphore, signal_semaphore, fence) = vk_swapchain.sync_info();

        let command_buffers: Vec<vk::CommandBuffer> = commands
            .iter()
            .map(|cmd| CommandList::from_dyn(*cmd).command_buffer())
            .collect();

        let wait_semaphores = [wait_semaphore];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [signal_semaphore];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            // The swapchain already waited on this fence during acquire
            self.device
                .reset_fences(&[fence])
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to reset in-flight fence: {:?}", e))?;

            self.device
                .queue_submit(self.graphics_queue, &[submit_info], fence)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to submit commands to GPU queue: {:?}", e))?;
        }

        engine_trace!(LOG_SOURCE, "Submitted {} command list(s) for image {} (slot {})",
            command_buffers.len(), image_index, swapchain.current_frame_slot());
        Ok(())
    }

    fn msaa_samples(&self) -> SampleCount {
        self.msaa_samples
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to wait idle: {:?}", e))
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Samplers, while the device is alive
            self.sampler_cache
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner)
                .shutdown();

            // 2. Descriptor pools (sets still alive at this point are freed with them)
            for &pool in self.descriptor_pools.get_mut().unwrap_or_else(PoisonError::into_inner).iter() {
                self.device.destroy_descriptor_pool(pool, None);
            }

            // 3. Upload command pool from GpuContext
            {
                let mut pool = self.gpu_context.upload_command_pool
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 4. Drop allocator: free VkDeviceMemory pages BEFORE destroying device.
            //    First drop our Arc, then GpuContext's ManuallyDrop Arc.
            ManuallyDrop::drop(&mut self.allocator);
            match Arc::get_mut(&mut self.gpu_context) {
                Some(ctx) => ManuallyDrop::drop(&mut ctx.allocator),
                None => engine_warn!(LOG_SOURCE, "GPU resources outlived the device; allocator leaked"),
            }

            // 5. Stop routing validation messages, then destroy the messenger
            debug::cleanup_debug_config();
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 6. Device, surface, instance
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}
