//! CPU 模拟的后端
//!
//! 不需要 GPU，所有命令在提交时立即校验并在 CPU 上执行，完成时机由 [`HeadlessCompletion`] 决定。
//! 校验内容包括 barrier 的前置状态、copy/clear/render 时 image 的状态、描述符槽位里的 view 是否匹配。

mod timeline;
mod validate;

use std::collections::HashMap;
use std::sync::Arc;

use slotmap::SlotMap;

pub use timeline::HeadlessGpuControl;
use timeline::HeadlessTimeline;

use crate::backend::GfxBackend;
use crate::basic::format::GfxFormat;
use crate::basic::state::ResourceState;
use crate::commands::command_list::GfxCommandList;
use crate::descriptors::{DescriptorHeapKind, DescriptorSlot, GfxViewDesc};
use crate::error::{GfxError, GfxResult};
use crate::pipeline::GfxPipelineDesc;
use crate::resources::desc::{GfxBufferDesc, GfxImageDesc, GfxImageUsage, GfxMemoryLocation};
use crate::resources::handles::{GfxBufferHandle, GfxImageHandle, GfxPipelineHandle};

/// 提交的命令什么时候算 GPU 完成
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadlessCompletion {
    /// 提交后立即完成
    #[default]
    Immediate,
    /// 只有通过 [`HeadlessGpuControl`] 推进后才完成
    Manual,
}

#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub swap_target_count: usize,
    pub width: u32,
    pub height: u32,
    pub swap_format: GfxFormat,
    pub completion: HeadlessCompletion,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            swap_target_count: 2,
            width: 1280,
            height: 720,
            swap_format: GfxFormat::Bgra8Unorm,
            completion: HeadlessCompletion::Immediate,
        }
    }
}

/// 各种操作的计数，测试中用来观察副作用
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub images_created: u64,
    pub images_destroyed: u64,
    pub buffers_created: u64,
    pub buffers_destroyed: u64,
    pub pipelines_created: u64,
    pub descriptor_writes: u64,
    pub submissions: u64,
    pub presents: u64,
    pub copies: u64,
    pub clears: u64,
    pub draws: u64,
}

pub(crate) struct HeadlessImage {
    name: String,
    desc: GfxImageDesc,
    state: ResourceState,
    /// 每个 subresource 的像素数据，编号见 `GfxImageDesc::subresource_index`
    subresources: Vec<Vec<u8>>,
}

pub(crate) struct HeadlessBuffer {
    name: String,
    desc: GfxBufferDesc,
    data: Vec<u8>,
}

struct InFlightSubmission {
    signal_value: u64,
    buffers: Vec<GfxBufferHandle>,
    images: Vec<GfxImageHandle>,
}

pub struct HeadlessBackend {
    config: HeadlessConfig,

    images: SlotMap<GfxImageHandle, HeadlessImage>,
    buffers: SlotMap<GfxBufferHandle, HeadlessBuffer>,
    pipelines: SlotMap<GfxPipelineHandle, String>,
    heaps: HashMap<DescriptorHeapKind, Vec<Option<GfxViewDesc>>>,

    swap_targets: Vec<GfxImageHandle>,
    swap_index: usize,

    timeline: Arc<HeadlessTimeline>,
    in_flight: Vec<InFlightSubmission>,

    stats: HeadlessStats,
}

// new & init
impl HeadlessBackend {
    pub fn new(config: HeadlessConfig) -> GfxResult<Self> {
        if config.swap_target_count == 0 {
            return Err(GfxError::DeviceInit("swap target count must be at least 1".to_string()));
        }

        let mut backend = Self {
            config,
            images: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            heaps: HashMap::new(),
            swap_targets: Vec::new(),
            swap_index: 0,
            timeline: Arc::new(HeadlessTimeline::default()),
            in_flight: Vec::new(),
            stats: HeadlessStats::default(),
        };

        for idx in 0..backend.config.swap_target_count {
            let desc = GfxImageDesc {
                usage: GfxImageUsage::COLOR_ATTACHMENT | GfxImageUsage::TRANSFER_SRC,
                ..GfxImageDesc::texture_2d(backend.config.width, backend.config.height, backend.config.swap_format, 1)
            };
            let image = backend.create_image(&desc, &format!("swap-target-{idx}"))?;
            // 呈现引擎持有的 image 在帧之间都处于 Present 状态
            backend.images[image].state = ResourceState::Present;
            backend.swap_targets.push(image);
        }

        log::info!(
            "headless backend created: {} swap targets {}x{}, completion {:?}",
            backend.config.swap_target_count,
            backend.config.width,
            backend.config.height,
            backend.config.completion
        );
        Ok(backend)
    }
}
// getters
impl HeadlessBackend {
    #[inline]
    pub fn stats(&self) -> &HeadlessStats {
        &self.stats
    }

    /// 用于在其他线程推进 fence
    #[inline]
    pub fn control(&self) -> HeadlessGpuControl {
        HeadlessGpuControl {
            timeline: self.timeline.clone(),
        }
    }

    #[inline]
    pub fn completion(&self) -> HeadlessCompletion {
        self.config.completion
    }

    pub fn image_state(&self, image: GfxImageHandle) -> Option<ResourceState> {
        self.images.get(image).map(|i| i.state)
    }

    pub fn image_desc(&self, image: GfxImageHandle) -> Option<&GfxImageDesc> {
        self.images.get(image).map(|i| &i.desc)
    }

    pub fn image_name(&self, image: GfxImageHandle) -> Option<&str> {
        self.images.get(image).map(|i| i.name.as_str())
    }

    /// 读回 image 的一个 subresource
    pub fn read_image(&self, image: GfxImageHandle, mip: u32, layer: u32) -> Option<&[u8]> {
        let image = self.images.get(image)?;
        if mip >= image.desc.mip_levels || layer >= image.desc.array_layers {
            return None;
        }
        image.subresources.get(image.desc.subresource_index(mip, layer)).map(|d| d.as_slice())
    }

    pub fn buffer_data(&self, buffer: GfxBufferHandle) -> Option<&[u8]> {
        self.buffers.get(buffer).map(|b| b.data.as_slice())
    }

    pub fn descriptor(&self, heap: DescriptorHeapKind, slot: DescriptorSlot) -> Option<&GfxViewDesc> {
        self.heaps.get(&heap)?.get(slot.index() as usize)?.as_ref()
    }

    #[inline]
    pub fn live_image_count(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn contains_buffer(&self, buffer: GfxBufferHandle) -> bool {
        self.buffers.contains_key(buffer)
    }
}
// tools
impl HeadlessBackend {
    /// 资源是否仍被尚未完成的提交引用
    fn in_flight_references(&self, buffer: Option<GfxBufferHandle>, image: Option<GfxImageHandle>) -> bool {
        let completed = self.timeline.completed();
        self.in_flight.iter().filter(|s| s.signal_value > completed).any(|s| {
            buffer.is_some_and(|b| s.buffers.contains(&b)) || image.is_some_and(|i| s.images.contains(&i))
        })
    }

    fn retire_completed(&mut self) {
        let completed = self.timeline.completed();
        self.in_flight.retain(|s| s.signal_value > completed);
    }
}

impl GfxBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_image(&mut self, desc: &GfxImageDesc, name: &str) -> GfxResult<GfxImageHandle> {
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

        let subresources = (0..desc.array_layers)
            .flat_map(|_| (0..desc.mip_levels).map(|mip| vec![0u8; desc.subresource_size(mip) as usize]))
            .collect();
        self.stats.images_created += 1;
        Ok(self.images.insert(HeadlessImage {
            name: name.to_string(),
            desc: desc.clone(),
            state: ResourceState::Undefined,
            subresources,
        }))
    }

    fn destroy_image(&mut self, image: GfxImageHandle) -> GfxResult<()> {
        if self.in_flight_references(None, Some(image)) {
            let name = self.images.get(image).map(|i| i.name.clone()).unwrap_or_default();
            return Err(GfxError::ResourceInFlight(name));
        }
        self.images.remove(image).ok_or_else(|| GfxError::InvalidHandle(format!("image {image:?}")))?;
        self.stats.images_destroyed += 1;
        Ok(())
    }

    fn create_buffer(&mut self, desc: &GfxBufferDesc, name: &str) -> GfxResult<GfxBufferHandle> {
        if desc.size == 0 {
            return Err(GfxError::ResourceCreation {
                kind: "buffer",
                name: name.to_string(),
                reason: "zero sized buffer".to_string(),
            });
        }
        self.stats.buffers_created += 1;
        Ok(self.buffers.insert(HeadlessBuffer {
            name: name.to_string(),
            desc: desc.clone(),
            data: vec![0u8; desc.size as usize],
        }))
    }

    fn write_buffer(&mut self, buffer: GfxBufferHandle, offset: u64, data: &[u8]) -> GfxResult<()> {
        let buffer =
            self.buffers.get_mut(buffer).ok_or_else(|| GfxError::InvalidHandle(format!("buffer {buffer:?}")))?;
        if buffer.desc.location != GfxMemoryLocation::CpuToGpu {
            return Err(GfxError::InvalidState(format!("buffer '{}' is not CPU writable", buffer.name)));
        }
        let end = offset + data.len() as u64;
        if end > buffer.desc.size {
            return Err(GfxError::InvalidState(format!(
                "write of {} bytes at {} overflows buffer '{}' ({} bytes)",
                data.len(),
                offset,
                buffer.name,
                buffer.desc.size
            )));
        }
        buffer.data[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: GfxBufferHandle) -> GfxResult<()> {
        if self.in_flight_references(Some(buffer), None) {
            let name = self.buffers.get(buffer).map(|b| b.name.clone()).unwrap_or_default();
            return Err(GfxError::ResourceInFlight(name));
        }
        self.buffers.remove(buffer).ok_or_else(|| GfxError::InvalidHandle(format!("buffer {buffer:?}")))?;
        self.stats.buffers_destroyed += 1;
        Ok(())
    }

    fn create_descriptor_heap(&mut self, heap: DescriptorHeapKind, capacity: u32) -> GfxResult<()> {
        if self.heaps.contains_key(&heap) {
            return Err(GfxError::InvalidState(format!("descriptor heap {heap:?} already created")));
        }
        self.heaps.insert(heap, vec![None; capacity as usize]);
        Ok(())
    }

    fn write_descriptor(&mut self, heap: DescriptorHeapKind, slot: DescriptorSlot, view: &GfxViewDesc) -> GfxResult<()> {
        if !view.fits_heap(heap) {
            return Err(GfxError::InvalidState(format!("view {view:?} can not be placed in heap {heap:?}")));
        }
        match view {
            GfxViewDesc::ConstantBuffer { buffer, offset, size } => {
                let desc = &self
                    .buffers
                    .get(*buffer)
                    .ok_or_else(|| GfxError::InvalidHandle(format!("buffer {buffer:?}")))?
                    .desc;
                if offset + size > desc.size {
                    return Err(GfxError::InvalidState("constant buffer view exceeds buffer".to_string()));
                }
            }
            other => {
                if let Some(image) = other.image() {
                    if !self.images.contains_key(image) {
                        return Err(GfxError::InvalidHandle(format!("image {image:?}")));
                    }
                }
            }
        }

        let slots = self
            .heaps
            .get_mut(&heap)
            .ok_or_else(|| GfxError::InvalidState(format!("descriptor heap {heap:?} not created")))?;
        let entry = slots.get_mut(slot.index() as usize).ok_or_else(|| {
            GfxError::InvalidHandle(format!("slot {} out of range for heap {heap:?}", slot.index()))
        })?;
        *entry = Some(view.clone());
        self.stats.descriptor_writes += 1;
        Ok(())
    }

    fn create_pipeline(&mut self, desc: &GfxPipelineDesc) -> GfxResult<GfxPipelineHandle> {
        self.stats.pipelines_created += 1;
        Ok(self.pipelines.insert(desc.name.clone()))
    }

    fn destroy_pipeline(&mut self, pipeline: GfxPipelineHandle) -> GfxResult<()> {
        self.pipelines
            .remove(pipeline)
            .map(|_| ())
            .ok_or_else(|| GfxError::InvalidHandle(format!("pipeline {pipeline:?}")))
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
        let image = self.swap_targets[self.swap_index];
        let state = self
            .images
            .get(image)
            .map(|i| i.state)
            .ok_or_else(|| GfxError::InvalidHandle(format!("swap target {}", self.swap_index)))?;
        if state != ResourceState::Present {
            return Err(GfxError::InvalidState(format!(
                "swap target {} presented in state {state:?}",
                self.swap_index
            )));
        }
        self.swap_index = (self.swap_index + 1) % self.swap_targets.len();
        self.stats.presents += 1;
        Ok(())
    }

    fn submit(&mut self, commands: &GfxCommandList, signal_value: u64) -> GfxResult<()> {
        let _span = tracy_client::span!("HeadlessBackend::submit");

        let submitted = self.timeline.submitted();
        if signal_value <= submitted {
            return Err(GfxError::Submission(format!(
                "fence value {signal_value} is not greater than the last submitted value {submitted}"
            )));
        }

        self.validate(commands)?;
        self.execute(commands);

        self.retire_completed();
        self.in_flight.push(InFlightSubmission {
            signal_value,
            buffers: commands.referenced_buffers(),
            images: commands.referenced_images(),
        });
        self.timeline.mark_submitted(signal_value);
        self.stats.submissions += 1;
        log::debug!("submitted '{}' ({} commands), signal {}", commands.name(), commands.len(), signal_value);

        if self.config.completion == HeadlessCompletion::Immediate {
            self.timeline.complete_up_to(signal_value);
        }
        Ok(())
    }

    fn completed_value(&self) -> GfxResult<u64> {
        Ok(self.timeline.completed())
    }

    fn wait_for_value(&self, value: u64) -> GfxResult<()> {
        let submitted = self.timeline.submitted();
        if value > submitted {
            return Err(GfxError::InvalidState(format!(
                "waiting for fence value {value} but only {submitted} was submitted"
            )));
        }
        self.timeline.wait_completed(value);
        Ok(())
    }

    fn wait_idle(&mut self) -> GfxResult<()> {
        // 设备空闲意味着所有提交都已执行完
        let submitted = self.timeline.submitted();
        self.timeline.complete_up_to(submitted);
        self.retire_completed();
        Ok(())
    }
}

impl Drop for HeadlessBackend {
    fn drop(&mut self) {
        log::info!(
            "Dropping HeadlessBackend: {} images, {} buffers still alive",
            self.images.len().saturating_sub(self.swap_targets.len()),
            self.buffers.len()
        );
    }
}

#[cfg(test)]
mod tests;
