use crate::basic::format::GfxFormat;
use crate::commands::command_list::GfxCommandList;
use crate::descriptors::{DescriptorHeapKind, DescriptorSlot, GfxViewDesc};
use crate::error::GfxResult;
use crate::pipeline::GfxPipelineDesc;
use crate::resources::desc::{GfxBufferDesc, GfxImageDesc};
use crate::resources::handles::{GfxBufferHandle, GfxImageHandle, GfxPipelineHandle};

/// 图形设备的边界
///
/// 上层（资源注册表、帧节奏控制）只通过这个 trait 访问设备。
/// trait 是 object safe 的，上层组件接收 `&mut dyn GfxBackend`。
///
/// fence 是一个单调递增的 timeline：每次 `submit` 时传入新的 signal 值，
/// GPU 执行完该命令流后 `completed_value` 会达到这个值。
pub trait GfxBackend {
    /// 后端名字，用于日志
    fn name(&self) -> &str;

    // resources
    fn create_image(&mut self, desc: &GfxImageDesc, name: &str) -> GfxResult<GfxImageHandle>;
    fn destroy_image(&mut self, image: GfxImageHandle) -> GfxResult<()>;
    fn create_buffer(&mut self, desc: &GfxBufferDesc, name: &str) -> GfxResult<GfxBufferHandle>;
    /// 只对 `GfxMemoryLocation::CpuToGpu` 的 buffer 有效
    fn write_buffer(&mut self, buffer: GfxBufferHandle, offset: u64, data: &[u8]) -> GfxResult<()>;
    fn destroy_buffer(&mut self, buffer: GfxBufferHandle) -> GfxResult<()>;

    // descriptors
    /// 为一种描述符堆分配存储，每种只能调用一次
    fn create_descriptor_heap(&mut self, heap: DescriptorHeapKind, capacity: u32) -> GfxResult<()>;
    fn write_descriptor(&mut self, heap: DescriptorHeapKind, slot: DescriptorSlot, view: &GfxViewDesc) -> GfxResult<()>;

    // pipelines
    fn create_pipeline(&mut self, desc: &GfxPipelineDesc) -> GfxResult<GfxPipelineHandle>;
    fn destroy_pipeline(&mut self, pipeline: GfxPipelineHandle) -> GfxResult<()>;

    // presentation
    /// 呈现用的 image，数量固定；每个 image 在帧与帧之间处于 `ResourceState::Present`
    fn swap_targets(&self) -> &[GfxImageHandle];
    fn swap_target_format(&self) -> GfxFormat;
    fn swap_extent(&self) -> (u32, u32);
    /// 当前可以渲染的 swap target 下标，`present` 之后才会变化
    fn current_swap_index(&self) -> usize;
    fn present(&mut self) -> GfxResult<()>;

    // submission & sync
    /// 提交命令流，并在其后 signal fence 到 `signal_value`
    fn submit(&mut self, commands: &GfxCommandList, signal_value: u64) -> GfxResult<()>;
    /// GPU 已经完成的 fence 值
    fn completed_value(&self) -> GfxResult<u64>;
    /// 阻塞等待 fence 达到 `value`，没有超时
    fn wait_for_value(&self, value: u64) -> GfxResult<()>;
    fn wait_idle(&mut self) -> GfxResult<()>;
}
