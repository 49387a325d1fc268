//! ash + vk-mem 实现的后端
//!
//! 描述符堆的映射方式：
//! - CbvSrvUav 堆是一个 descriptor set，sampled image、storage image、uniform buffer 三个 binding 共用槽位编号
//! - Sampler 堆是另一个 descriptor set
//! - RTV、DSV 以及 shader 不可见的 CbvSrvUav 堆只在 CPU 上保存 image view
//!
//! descriptor table 的起始槽位通过 push constant 传给 shader。
//! fence 是一个 timeline semaphore。swap target 是一组离屏 image，`present` 只轮换下标。

mod convert;
mod descriptors;
mod device;
mod pipeline;
mod recorder;

use std::collections::HashMap;
use std::mem::ManuallyDrop;

use ash::vk;
use slotmap::SlotMap;
use vk_mem::Alloc;

use crate::backend::GfxBackend;
use crate::basic::format::GfxFormat;
use crate::basic::state::ResourceState;
use crate::commands::command_list::GfxCommandList;
use crate::descriptors::{DescriptorHeapKind, DescriptorSlot, GfxViewDesc, GfxViewDimension};
use crate::error::{GfxError, GfxResult};
use crate::pipeline::GfxPipelineDesc;
use crate::resources::desc::{GfxBufferDesc, GfxImageDesc, GfxImageUsage, GfxMemoryLocation};
use crate::resources::handles::{GfxBufferHandle, GfxImageHandle, GfxPipelineHandle};
use descriptors::{VulkanDescriptorHeap, VulkanSlot, binding, destroy_slot};
use device::VulkanDevice;
use pipeline::VulkanPipeline;

#[derive(Debug, Clone)]
pub struct VulkanConfig {
    pub app_name: String,
    pub width: u32,
    pub height: u32,
    pub swap_target_count: usize,
    /// 打开 validation layer 以及 debug messenger；layer 未安装时只给出警告
    pub validation: bool,
    pub swap_format: GfxFormat,
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self {
            app_name: "prism".to_string(),
            width: 1280,
            height: 720,
            swap_target_count: 2,
            validation: cfg!(debug_assertions),
            swap_format: GfxFormat::Bgra8Unorm,
        }
    }
}

pub(crate) struct VulkanImage {
    name: String,
    desc: GfxImageDesc,
    image: vk::Image,
    allocation: vk_mem::Allocation,
}

pub(crate) struct VulkanBuffer {
    name: String,
    desc: GfxBufferDesc,
    buffer: vk::Buffer,
    allocation: vk_mem::Allocation,
    /// `CpuToGpu` 的 buffer 在整个生命周期内保持映射
    mapped: Option<*mut u8>,
}

struct InFlightSubmission {
    signal_value: u64,
    command_buffer: vk::CommandBuffer,
    buffers: Vec<GfxBufferHandle>,
    images: Vec<GfxImageHandle>,
}

pub struct VulkanBackend {
    config: VulkanConfig,

    device: VulkanDevice,
    /// 必须在 device 之前销毁
    allocator: ManuallyDrop<vk_mem::Allocator>,

    images: SlotMap<GfxImageHandle, VulkanImage>,
    buffers: SlotMap<GfxBufferHandle, VulkanBuffer>,
    pipelines: SlotMap<GfxPipelineHandle, VulkanPipeline>,
    heaps: HashMap<DescriptorHeapKind, VulkanDescriptorHeap>,

    swap_targets: Vec<GfxImageHandle>,
    swap_index: usize,

    command_pool: vk::CommandPool,
    timeline: vk::Semaphore,
    submitted: u64,
    in_flight: Vec<InFlightSubmission>,
}

// new & init
impl VulkanBackend {
    pub fn new(config: &VulkanConfig) -> GfxResult<Self> {
        let _span = tracy_client::span!("VulkanBackend::new");

        if config.swap_target_count == 0 {
            return Err(GfxError::DeviceInit("swap target count must be at least 1".to_string()));
        }

        let device = VulkanDevice::new(&config.app_name, config.validation)?;

        let mut vma_ci = vk_mem::AllocatorCreateInfo::new(&device.instance, &device.device, device.pdevice);
        vma_ci.vulkan_api_version = vk::API_VERSION_1_3;
        let allocator = unsafe { vk_mem::Allocator::new(vma_ci)? };

        let pool_ci = vk::CommandPoolCreateInfo::default()
            .queue_family_index(device.queue_family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);
        let command_pool = unsafe { device.device.create_command_pool(&pool_ci, None)? };

        let mut timeline_type_ci =
            vk::SemaphoreTypeCreateInfo::default().semaphore_type(vk::SemaphoreType::TIMELINE).initial_value(0);
        let timeline_ci = vk::SemaphoreCreateInfo::default().push_next(&mut timeline_type_ci);
        let timeline = unsafe { device.device.create_semaphore(&timeline_ci, None)? };
        device.set_debug_name(timeline, "frame-timeline");

        let mut backend = Self {
            config: config.clone(),
            device,
            allocator: ManuallyDrop::new(allocator),
            images: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            heaps: HashMap::new(),
            swap_targets: Vec::new(),
            swap_index: 0,
            command_pool,
            timeline,
            submitted: 0,
            in_flight: Vec::new(),
        };

        for idx in 0..config.swap_target_count {
            let desc = GfxImageDesc {
                usage: GfxImageUsage::COLOR_ATTACHMENT | GfxImageUsage::TRANSFER_SRC,
                ..GfxImageDesc::texture_2d(config.width, config.height, config.swap_format, 1)
            };
            let image = backend.create_image(&desc, &format!("swap-target-{idx}"))?;
            backend.swap_targets.push(image);
        }
        backend.init_swap_target_states()?;

        log::info!(
            "vulkan backend created: {} swap targets {}x{} {:?}, min uniform offset alignment {}",
            config.swap_target_count,
            config.width,
            config.height,
            config.swap_format,
            backend.device.limits.min_uniform_buffer_offset_alignment
        );
        Ok(backend)
    }

    /// swap target 在帧与帧之间处于 `ResourceState::Present`，创建后立即切换一次
    fn init_swap_target_states(&mut self) -> GfxResult<()> {
        let present = convert::state_access(ResourceState::Present);
        let barriers = self
            .swap_targets
            .iter()
            .map(|handle| {
                vk::ImageMemoryBarrier2::default()
                    .image(self.images[*handle].image)
                    .dst_stage_mask(present.stage)
                    .dst_access_mask(present.access)
                    .old_layout(vk::ImageLayout::UNDEFINED)
                    .new_layout(present.layout)
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .level_count(1)
                            .layer_count(1),
                    )
            })
            .collect::<Vec<_>>();

        self.one_time_exec("swap-target-init", |device, cb| unsafe {
            device.cmd_pipeline_barrier2(cb, &vk::DependencyInfo::default().image_memory_barriers(&barriers));
        })
    }
}
// getters
impl VulkanBackend {
    #[inline]
    pub fn config(&self) -> &VulkanConfig {
        &self.config
    }

    #[inline]
    pub(crate) fn heap(&self, kind: DescriptorHeapKind) -> Option<&VulkanDescriptorHeap> {
        self.heaps.get(&kind)
    }
}
// tools
impl VulkanBackend {
    fn allocate_command_buffer(&self) -> GfxResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let cb = unsafe { self.device.device.allocate_command_buffers(&alloc_info)? }[0];
        Ok(cb)
    }

    fn free_command_buffer(&self, cb: vk::CommandBuffer) {
        unsafe { self.device.device.free_command_buffers(self.command_pool, &[cb]) };
    }

    /// 录制并同步执行一段命令，不经过 timeline
    fn one_time_exec(&self, name: &str, f: impl FnOnce(&ash::Device, vk::CommandBuffer)) -> GfxResult<()> {
        let device = &self.device.device;
        let cb = self.allocate_command_buffer()?;
        self.device.set_debug_name(cb, name);

        let result = unsafe {
            device
                .begin_command_buffer(
                    cb,
                    &vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
                )
                .and_then(|_| {
                    f(device, cb);
                    device.end_command_buffer(cb)
                })
                .and_then(|_| {
                    let cb_info = vk::CommandBufferSubmitInfo::default().command_buffer(cb);
                    let submit_info =
                        vk::SubmitInfo2::default().command_buffer_infos(std::slice::from_ref(&cb_info));
                    device.queue_submit2(self.device.queue, std::slice::from_ref(&submit_info), vk::Fence::null())
                })
                .and_then(|_| device.queue_wait_idle(self.device.queue))
        };
        self.free_command_buffer(cb);
        Ok(result?)
    }

    /// 资源是否仍被尚未完成的提交引用
    fn in_flight_references(&self, buffer: Option<GfxBufferHandle>, image: Option<GfxImageHandle>) -> GfxResult<bool> {
        let completed = self.completed_value()?;
        Ok(self.in_flight.iter().filter(|s| s.signal_value > completed).any(|s| {
            buffer.is_some_and(|b| s.buffers.contains(&b)) || image.is_some_and(|i| s.images.contains(&i))
        }))
    }

    /// 释放已经完成的提交所使用的 command buffer
    fn retire_completed(&mut self) -> GfxResult<()> {
        let completed = self.completed_value()?;
        let mut to_release = Vec::new();
        self.in_flight.retain(|s| {
            if s.signal_value <= completed {
                to_release.push(s.command_buffer);
                false
            } else {
                true
            }
        });
        for cb in to_release {
            self.free_command_buffer(cb);
        }
        Ok(())
    }

    fn create_image_view(
        &self,
        image: GfxImageHandle,
        format: GfxFormat,
        dimension: GfxViewDimension,
        mip_levels: u32,
    ) -> GfxResult<vk::ImageView> {
        let target = self.images.get(image).ok_or_else(|| GfxError::InvalidHandle(format!("image {image:?}")))?;
        let (view_type, layer_count) = match dimension {
            GfxViewDimension::Texture2D => (vk::ImageViewType::TYPE_2D, 1),
            GfxViewDimension::TextureCube => (vk::ImageViewType::CUBE, 6),
        };
        if layer_count > target.desc.array_layers || mip_levels > target.desc.mip_levels {
            return Err(GfxError::InvalidState(format!("view exceeds the subresources of image '{}'", target.name)));
        }

        let view_ci = vk::ImageViewCreateInfo::default()
            .image(target.image)
            .view_type(view_type)
            .format(convert::vk_format(format))
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(convert::aspect_mask(format))
                    .level_count(mip_levels)
                    .layer_count(layer_count),
            );
        let view = unsafe { self.device.device.create_image_view(&view_ci, None)? };
        self.device.set_debug_name(view, &format!("ImageView::{}", target.name));
        Ok(view)
    }

    /// 为一个 view 创建 Vulkan 对象，并写入 shader 可见堆的 descriptor set
    fn build_slot(&self, heap: &VulkanDescriptorHeap, slot: DescriptorSlot, view: &GfxViewDesc) -> GfxResult<VulkanSlot> {
        let device = &self.device.device;
        let mut built = VulkanSlot {
            desc: view.clone(),
            image_view: vk::ImageView::null(),
            sampler: vk::Sampler::null(),
        };
        let set = heap.set();

        match view {
            GfxViewDesc::ShaderResource {
                image,
                format,
                dimension,
                mip_levels,
            } => {
                built.image_view = self.create_image_view(*image, *format, *dimension, *mip_levels)?;
                if let Some(set) = set {
                    let image_info = vk::DescriptorImageInfo::default()
                        .image_view(built.image_view)
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                    let write = vk::WriteDescriptorSet::default()
                        .dst_set(set)
                        .dst_binding(binding::SAMPLED_IMAGE)
                        .dst_array_element(slot.index())
                        .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                        .image_info(std::slice::from_ref(&image_info));
                    unsafe { device.update_descriptor_sets(std::slice::from_ref(&write), &[]) };
                }
            }
            GfxViewDesc::UnorderedAccess { image, format } => {
                built.image_view = self.create_image_view(*image, *format, GfxViewDimension::Texture2D, 1)?;
                if let Some(set) = set {
                    let image_info = vk::DescriptorImageInfo::default()
                        .image_view(built.image_view)
                        .image_layout(vk::ImageLayout::GENERAL);
                    let write = vk::WriteDescriptorSet::default()
                        .dst_set(set)
                        .dst_binding(binding::STORAGE_IMAGE)
                        .dst_array_element(slot.index())
                        .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                        .image_info(std::slice::from_ref(&image_info));
                    unsafe { device.update_descriptor_sets(std::slice::from_ref(&write), &[]) };
                }
            }
            GfxViewDesc::ConstantBuffer { buffer, offset, size } => {
                let target =
                    self.buffers.get(*buffer).ok_or_else(|| GfxError::InvalidHandle(format!("buffer {buffer:?}")))?;
                if offset + size > target.desc.size {
                    return Err(GfxError::InvalidState("constant buffer view exceeds buffer".to_string()));
                }
                if let Some(set) = set {
                    let buffer_info = vk::DescriptorBufferInfo::default().buffer(target.buffer).offset(*offset).range(*size);
                    let write = vk::WriteDescriptorSet::default()
                        .dst_set(set)
                        .dst_binding(binding::UNIFORM_BUFFER)
                        .dst_array_element(slot.index())
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(std::slice::from_ref(&buffer_info));
                    unsafe { device.update_descriptor_sets(std::slice::from_ref(&write), &[]) };
                }
            }
            GfxViewDesc::Sampler(desc) => {
                let (filter, mipmap_mode) = convert::filter(desc.filter);
                let address_mode = convert::address_mode(desc.address_mode);
                let sampler_ci = vk::SamplerCreateInfo::default()
                    .mag_filter(filter)
                    .min_filter(filter)
                    .mipmap_mode(mipmap_mode)
                    .address_mode_u(address_mode)
                    .address_mode_v(address_mode)
                    .address_mode_w(address_mode)
                    .max_lod(vk::LOD_CLAMP_NONE);
                built.sampler = unsafe { device.create_sampler(&sampler_ci, None)? };
                if let Some(set) = set {
                    let image_info = vk::DescriptorImageInfo::default().sampler(built.sampler);
                    let write = vk::WriteDescriptorSet::default()
                        .dst_set(set)
                        .dst_binding(binding::SAMPLER)
                        .dst_array_element(slot.index())
                        .descriptor_type(vk::DescriptorType::SAMPLER)
                        .image_info(std::slice::from_ref(&image_info));
                    unsafe { device.update_descriptor_sets(std::slice::from_ref(&write), &[]) };
                }
            }
            GfxViewDesc::RenderTarget { image, format } | GfxViewDesc::DepthStencil { image, format } => {
                built.image_view = self.create_image_view(*image, *format, GfxViewDimension::Texture2D, 1)?;
            }
        }
        Ok(built)
    }
}

impl GfxBackend for VulkanBackend {
    fn name(&self) -> &str {
        "vulkan"
    }

    fn create_image(&mut self, desc: &GfxImageDesc, name: &str) -> GfxResult<GfxImageHandle> {
        let _span = tracy_client::span!("VulkanBackend::create_image");

        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 || desc.array_layers == 0 {
            return Err(GfxError::ResourceCreation {
                kind: "image",
                name: name.to_string(),
                reason: format!("degenerate description {desc:?}"),
            });
        }
        if desc.cube && desc.array_layers != 6 {
            return Err(GfxError::ResourceCreation {
                kind: "image",
                name: name.to_string(),
                reason: "cube images need exactly 6 layers".to_string(),
            });
        }

        let image_ci = vk::ImageCreateInfo::default()
            .flags(if desc.cube { vk::ImageCreateFlags::CUBE_COMPATIBLE } else { vk::ImageCreateFlags::empty() })
            .image_type(vk::ImageType::TYPE_2D)
            .format(convert::vk_format(desc.format))
            .extent(vk::Extent3D {
                width: desc.width,
                height: desc.height,
                depth: 1,
            })
            .mip_levels(desc.mip_levels)
            .array_layers(desc.array_layers)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(convert::image_usage(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let alloc_ci = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            ..Default::default()
        };

        let (image, allocation) =
            unsafe { self.allocator.create_image(&image_ci, &alloc_ci) }.map_err(|e| GfxError::ResourceCreation {
                kind: "image",
                name: name.to_string(),
                reason: format!("{e}"),
            })?;
        self.device.set_debug_name(image, &format!("Image::{name}"));

        Ok(self.images.insert(VulkanImage {
            name: name.to_string(),
            desc: desc.clone(),
            image,
            allocation,
        }))
    }

    fn destroy_image(&mut self, image: GfxImageHandle) -> GfxResult<()> {
        if self.in_flight_references(None, Some(image))? {
            let name = self.images.get(image).map(|i| i.name.clone()).unwrap_or_default();
            return Err(GfxError::ResourceInFlight(name));
        }
        let mut removed =
            self.images.remove(image).ok_or_else(|| GfxError::InvalidHandle(format!("image {image:?}")))?;
        log::debug!("destroying image {}", removed.name);

        // 引用该 image 的 view 一并销毁
        for heap in self.heaps.values_mut() {
            for slot in heap.take_views_of(image) {
                destroy_slot(&self.device.device, slot);
            }
        }
        unsafe { self.allocator.destroy_image(removed.image, &mut removed.allocation) };
        Ok(())
    }

    fn create_buffer(&mut self, desc: &GfxBufferDesc, name: &str) -> GfxResult<GfxBufferHandle> {
        let _span = tracy_client::span!("VulkanBackend::create_buffer");

        let creation_err = |reason: String| GfxError::ResourceCreation {
            kind: "buffer",
            name: name.to_string(),
            reason,
        };
        if desc.size == 0 {
            return Err(creation_err("zero sized buffer".to_string()));
        }

        let buffer_ci = vk::BufferCreateInfo::default().size(desc.size).usage(convert::buffer_usage(desc.usage));
        let host_visible = desc.location == GfxMemoryLocation::CpuToGpu;
        let alloc_ci = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::Auto,
            flags: if host_visible {
                vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE
            } else {
                vk_mem::AllocationCreateFlags::empty()
            },
            ..Default::default()
        };

        let (buffer, mut allocation) =
            unsafe { self.allocator.create_buffer(&buffer_ci, &alloc_ci) }.map_err(|e| creation_err(format!("{e}")))?;

        let mapped = if host_visible {
            match unsafe { self.allocator.map_memory(&mut allocation) } {
                Ok(ptr) => Some(ptr),
                Err(e) => {
                    unsafe { self.allocator.destroy_buffer(buffer, &mut allocation) };
                    return Err(creation_err(format!("map failed: {e}")));
                }
            }
        } else {
            None
        };
        self.device.set_debug_name(buffer, &format!("Buffer::{name}"));

        Ok(self.buffers.insert(VulkanBuffer {
            name: name.to_string(),
            desc: desc.clone(),
            buffer,
            allocation,
            mapped,
        }))
    }

    fn write_buffer(&mut self, buffer: GfxBufferHandle, offset: u64, data: &[u8]) -> GfxResult<()> {
        let target = self.buffers.get(buffer).ok_or_else(|| GfxError::InvalidHandle(format!("buffer {buffer:?}")))?;
        let Some(mapped) = target.mapped else {
            return Err(GfxError::InvalidState(format!("buffer '{}' is not CPU writable", target.name)));
        };
        let end = offset + data.len() as u64;
        if end > target.desc.size {
            return Err(GfxError::InvalidState(format!(
                "write of {} bytes at {} overflows buffer '{}' ({} bytes)",
                data.len(),
                offset,
                target.name,
                target.desc.size
            )));
        }

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset as usize), data.len());
        }
        self.allocator.flush_allocation(&target.allocation, offset, data.len() as vk::DeviceSize)?;
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: GfxBufferHandle) -> GfxResult<()> {
        if self.in_flight_references(Some(buffer), None)? {
            let name = self.buffers.get(buffer).map(|b| b.name.clone()).unwrap_or_default();
            return Err(GfxError::ResourceInFlight(name));
        }
        let mut removed =
            self.buffers.remove(buffer).ok_or_else(|| GfxError::InvalidHandle(format!("buffer {buffer:?}")))?;
        log::debug!("destroying buffer {}", removed.name);
        unsafe {
            if removed.mapped.is_some() {
                self.allocator.unmap_memory(&mut removed.allocation);
            }
            self.allocator.destroy_buffer(removed.buffer, &mut removed.allocation);
        }
        Ok(())
    }

    fn create_descriptor_heap(&mut self, heap: DescriptorHeapKind, capacity: u32) -> GfxResult<()> {
        if self.heaps.contains_key(&heap) {
            return Err(GfxError::InvalidState(format!("descriptor heap {heap:?} already created")));
        }
        let created = VulkanDescriptorHeap::new(&self.device.device, heap, capacity)?;
        if let Some(set) = created.set() {
            self.device.set_debug_name(set, &format!("DescriptorSet::{heap:?}"));
        }
        self.heaps.insert(heap, created);
        Ok(())
    }

    fn write_descriptor(&mut self, heap: DescriptorHeapKind, slot: DescriptorSlot, view: &GfxViewDesc) -> GfxResult<()> {
        if !view.fits_heap(heap) {
            return Err(GfxError::InvalidState(format!("view {view:?} can not be placed in heap {heap:?}")));
        }
        let target = self
            .heaps
            .get(&heap)
            .ok_or_else(|| GfxError::InvalidState(format!("descriptor heap {heap:?} not created")))?;
        if slot.index() as usize >= target.slots.len() {
            return Err(GfxError::InvalidHandle(format!("slot {} out of range for heap {heap:?}", slot.index())));
        }

        let built = self.build_slot(target, slot, view)?;
        let replaced = self.heaps.get_mut(&heap).and_then(|h| h.replace(slot, built));
        if let Some(old) = replaced {
            destroy_slot(&self.device.device, old);
        }
        Ok(())
    }

    fn create_pipeline(&mut self, desc: &GfxPipelineDesc) -> GfxResult<GfxPipelineHandle> {
        let set_layouts = [DescriptorHeapKind::CbvSrvUav, DescriptorHeapKind::Sampler]
            .into_iter()
            .map(|kind| {
                self.heap(kind).and_then(|h| h.set_layout()).ok_or_else(|| GfxError::ResourceCreation {
                    kind: "pipeline",
                    name: desc.name.clone(),
                    reason: format!("descriptor heap {kind:?} must be created first"),
                })
            })
            .collect::<GfxResult<Vec<_>>>()?;

        let pipeline = VulkanPipeline::new(&self.device.device, desc, &set_layouts)?;
        self.device.set_debug_name(pipeline.pipeline, &format!("Pipeline::{}", desc.name));
        Ok(self.pipelines.insert(pipeline))
    }

    fn destroy_pipeline(&mut self, pipeline: GfxPipelineHandle) -> GfxResult<()> {
        // pipeline 可能还被在途的命令使用
        self.wait_for_value(self.submitted)?;
        let removed =
            self.pipelines.remove(pipeline).ok_or_else(|| GfxError::InvalidHandle(format!("pipeline {pipeline:?}")))?;
        removed.destroy(&self.device.device);
        Ok(())
    }

    fn swap_targets(&self) -> &[GfxImageHandle] {
        &self.swap_targets
    }

    fn swap_target_format(&self) -> GfxFormat {
        self.config.swap_format
    }

    fn swap_extent(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn current_swap_index(&self) -> usize {
        self.swap_index
    }

    fn present(&mut self) -> GfxResult<()> {
        log::trace!("present swap target {}", self.swap_index);
        self.swap_index = (self.swap_index + 1) % self.swap_targets.len();
        Ok(())
    }

    fn submit(&mut self, commands: &GfxCommandList, signal_value: u64) -> GfxResult<()> {
        let _span = tracy_client::span!("VulkanBackend::submit");

        if signal_value <= self.submitted {
            return Err(GfxError::Submission(format!(
                "fence value {signal_value} is not greater than the last submitted value {}",
                self.submitted
            )));
        }
        self.retire_completed()?;

        let device = &self.device.device;
        let cb = self.allocate_command_buffer()?;
        self.device.set_debug_name(cb, commands.name());

        let recorded = unsafe {
            device
                .begin_command_buffer(
                    cb,
                    &vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
                )
                .map_err(GfxError::from)
                .and_then(|_| self.record(cb, commands))
                .and_then(|_| device.end_command_buffer(cb).map_err(GfxError::from))
        };
        if let Err(e) = recorded {
            self.free_command_buffer(cb);
            return Err(e);
        }

        let cb_info = vk::CommandBufferSubmitInfo::default().command_buffer(cb);
        let signal_info = vk::SemaphoreSubmitInfo::default()
            .semaphore(self.timeline)
            .value(signal_value)
            .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS);
        let submit_info = vk::SubmitInfo2::default()
            .command_buffer_infos(std::slice::from_ref(&cb_info))
            .signal_semaphore_infos(std::slice::from_ref(&signal_info));
        if let Err(e) =
            unsafe { device.queue_submit2(self.device.queue, std::slice::from_ref(&submit_info), vk::Fence::null()) }
        {
            self.free_command_buffer(cb);
            return Err(GfxError::Submission(format!("'{}': {e}", commands.name())));
        }

        self.in_flight.push(InFlightSubmission {
            signal_value,
            command_buffer: cb,
            buffers: commands.referenced_buffers(),
            images: commands.referenced_images(),
        });
        self.submitted = signal_value;
        log::debug!("submitted '{}' ({} commands), signal {}", commands.name(), commands.len(), signal_value);
        Ok(())
    }

    fn completed_value(&self) -> GfxResult<u64> {
        Ok(unsafe { self.device.device.get_semaphore_counter_value(self.timeline)? })
    }

    fn wait_for_value(&self, value: u64) -> GfxResult<()> {
        if value > self.submitted {
            return Err(GfxError::InvalidState(format!(
                "waiting for fence value {value} but only {} was submitted",
                self.submitted
            )));
        }
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(std::slice::from_ref(&self.timeline))
            .values(std::slice::from_ref(&value));
        unsafe { self.device.device.wait_semaphores(&wait_info, u64::MAX)? };
        Ok(())
    }

    fn wait_idle(&mut self) -> GfxResult<()> {
        unsafe { self.device.device.device_wait_idle()? };
        self.retire_completed()
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        log::info!(
            "Dropping VulkanBackend: {} images, {} buffers still alive",
            self.images.len().saturating_sub(self.swap_targets.len()),
            self.buffers.len()
        );

        let device = &self.device.device;
        unsafe {
            if let Err(e) = device.device_wait_idle() {
                log::error!("device_wait_idle failed during drop: {}", e);
            }

            for cb in self.in_flight.drain(..).map(|s| s.command_buffer) {
                device.free_command_buffers(self.command_pool, &[cb]);
            }
            for (_, pipeline) in self.pipelines.drain() {
                pipeline.destroy(device);
            }
            for heap in self.heaps.values_mut() {
                heap.destroy(device);
            }
            for (_, mut image) in self.images.drain() {
                self.allocator.destroy_image(image.image, &mut image.allocation);
            }
            for (_, mut buffer) in self.buffers.drain() {
                if buffer.mapped.is_some() {
                    self.allocator.unmap_memory(&mut buffer.allocation);
                }
                self.allocator.destroy_buffer(buffer.buffer, &mut buffer.allocation);
            }

            device.destroy_command_pool(self.command_pool, None);
            device.destroy_semaphore(self.timeline, None);
            ManuallyDrop::drop(&mut self.allocator);
        }
        self.device.destroy();
    }
}
