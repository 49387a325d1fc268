use prism_gfx::headless::{HeadlessBackend, HeadlessConfig};
use prism_gfx::pipeline::GfxPipelineDesc;
use prism_gfx::resources::handles::GfxPipelineHandle;

use super::*;

fn upload<'a>(
    backend: &'a mut HeadlessBackend,
    commands: &'a mut GfxCommandList,
    staging: &'a mut StagingTracker,
) -> GpuUpload<'a> {
    GpuUpload {
        backend,
        commands,
        staging,
        submission: 1,
    }
}

fn small_config() -> RenderConfig {
    RenderConfig {
        fallback_texture_size: 16,
        ..Default::default()
    }
}

#[test]
fn test_fallback_is_first_resource() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    let mut commands = GfxCommandList::new("test");
    let mut staging = StagingTracker::default();

    let mut gpu = upload(&mut backend, &mut commands, &mut staging);
    let mut registry = ResourceRegistry::new(&mut gpu, &small_config()).unwrap();
    drop(gpu);

    let fallback = registry.lookup(ResourceId::FALLBACK);
    assert_eq!(fallback.kind(), ResourceKind::Texture);
    assert_eq!(fallback.state(), ResourceState::ShaderRead);
    assert_eq!(registry.gpu_view(ResourceId::FALLBACK).slot, DescriptorSlot(0));
    assert_eq!(registry.heaps().allocator(DescriptorHeapKind::CbvSrvUav).used(), 1);
    assert_eq!(staging.pending_count(), 1);
    // barrier, copy, barrier
    assert_eq!(commands.len(), 3);

    registry.destroy(&mut backend).unwrap();
}

#[test]
fn test_initial_data_must_match_subresources() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    let mut commands = GfxCommandList::new("test");
    let mut staging = StagingTracker::default();

    let mut gpu = upload(&mut backend, &mut commands, &mut staging);
    let mut registry = ResourceRegistry::new(&mut gpu, &small_config()).unwrap();

    let desc = GfxImageDesc::texture_2d(4, 4, GfxFormat::Rgba8Unorm, 2);
    let only_base = [ImageData::solid(4, 4, [1, 2, 3, 4])];
    assert!(registry.create_texture(&mut gpu, &desc, Some(&only_base[..]), "short").is_err());

    let wrong_size = [ImageData::solid(4, 4, [0; 4]), ImageData::solid(1, 1, [0; 4])];
    assert!(registry.create_texture(&mut gpu, &desc, Some(&wrong_size[..]), "wrong").is_err());
    drop(gpu);

    // 失败的创建不占用槽位
    assert_eq!(registry.resource_count(), 1);
    assert_eq!(registry.heaps().allocator(DescriptorHeapKind::CbvSrvUav).used(), 1);

    registry.destroy(&mut backend).unwrap();
}

#[test]
fn test_transition_skips_same_state() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    let mut commands = GfxCommandList::new("test");
    let mut staging = StagingTracker::default();

    let mut gpu = upload(&mut backend, &mut commands, &mut staging);
    let mut registry = ResourceRegistry::new(&mut gpu, &small_config()).unwrap();
    drop(gpu);

    let mut list = GfxCommandList::new("frame");
    registry.transition(&mut list, ResourceId::FALLBACK, Visibility::ShaderVisible, ResourceState::ShaderRead);
    assert!(list.is_empty());

    registry.transition(&mut list, ResourceId::FALLBACK, Visibility::ShaderVisible, ResourceState::CopySrc);
    assert_eq!(list.len(), 1);
    assert_eq!(registry.lookup(ResourceId::FALLBACK).state(), ResourceState::CopySrc);

    registry.destroy(&mut backend).unwrap();
}

#[test]
fn test_constant_buffer_is_aligned() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    let mut commands = GfxCommandList::new("test");
    let mut staging = StagingTracker::default();

    let mut gpu = upload(&mut backend, &mut commands, &mut staging);
    let mut registry = ResourceRegistry::new(&mut gpu, &small_config()).unwrap();
    drop(gpu);

    let id = registry.create_constant_buffer(&mut backend, 72, "object").unwrap();
    let record = registry.lookup(id);
    assert_eq!(record.buffer_size(), 256);
    assert_eq!(record.kind(), ResourceKind::ConstantBuffer);
    assert!(matches!(record.view(), Some(GfxViewDesc::ConstantBuffer { size: 256, .. })));

    registry.destroy(&mut backend).unwrap();
    assert_eq!(backend.live_buffer_count(), 1, "only the untracked staging buffer is left");
}

#[test]
#[should_panic(expected = "was never registered")]
fn test_lookup_of_unknown_id_panics() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    let mut commands = GfxCommandList::new("test");
    let mut staging = StagingTracker::default();

    let mut gpu = upload(&mut backend, &mut commands, &mut staging);
    let registry = ResourceRegistry::new(&mut gpu, &small_config()).unwrap();
    assert!(registry.try_lookup(ResourceId::new(7)).is_none());
    registry.lookup(ResourceId::new(7));
}

/// 可以让部分调用失败的后端
struct FaultyBackend {
    inner: HeadlessBackend,
    fail_buffer_writes: bool,
    fail_descriptor_writes: bool,
}

impl FaultyBackend {
    fn new() -> Self {
        Self {
            inner: HeadlessBackend::new(HeadlessConfig::default()).unwrap(),
            fail_buffer_writes: false,
            fail_descriptor_writes: false,
        }
    }
}

impl GfxBackend for FaultyBackend {
    fn name(&self) -> &str {
        "faulty"
    }
    fn create_image(&mut self, desc: &GfxImageDesc, name: &str) -> GfxResult<GfxImageHandle> {
        self.inner.create_image(desc, name)
    }
    fn destroy_image(&mut self, image: GfxImageHandle) -> GfxResult<()> {
        self.inner.destroy_image(image)
    }
    fn create_buffer(&mut self, desc: &GfxBufferDesc, name: &str) -> GfxResult<GfxBufferHandle> {
        self.inner.create_buffer(desc, name)
    }
    fn write_buffer(&mut self, buffer: GfxBufferHandle, offset: u64, data: &[u8]) -> GfxResult<()> {
        if self.fail_buffer_writes {
            return Err(GfxError::InvalidState("buffer write rejected".to_string()));
        }
        self.inner.write_buffer(buffer, offset, data)
    }
    fn destroy_buffer(&mut self, buffer: GfxBufferHandle) -> GfxResult<()> {
        self.inner.destroy_buffer(buffer)
    }
    fn create_descriptor_heap(&mut self, heap: DescriptorHeapKind, capacity: u32) -> GfxResult<()> {
        self.inner.create_descriptor_heap(heap, capacity)
    }
    fn write_descriptor(&mut self, heap: DescriptorHeapKind, slot: DescriptorSlot, view: &GfxViewDesc) -> GfxResult<()> {
        if self.fail_descriptor_writes {
            return Err(GfxError::InvalidState("descriptor write rejected".to_string()));
        }
        self.inner.write_descriptor(heap, slot, view)
    }
    fn create_pipeline(&mut self, desc: &GfxPipelineDesc) -> GfxResult<GfxPipelineHandle> {
        self.inner.create_pipeline(desc)
    }
    fn destroy_pipeline(&mut self, pipeline: GfxPipelineHandle) -> GfxResult<()> {
        self.inner.destroy_pipeline(pipeline)
    }
    fn swap_targets(&self) -> &[GfxImageHandle] {
        self.inner.swap_targets()
    }
    fn swap_target_format(&self) -> GfxFormat {
        self.inner.swap_target_format()
    }
    fn swap_extent(&self) -> (u32, u32) {
        self.inner.swap_extent()
    }
    fn current_swap_index(&self) -> usize {
        self.inner.current_swap_index()
    }
    fn present(&mut self) -> GfxResult<()> {
        self.inner.present()
    }
    fn submit(&mut self, commands: &GfxCommandList, signal_value: u64) -> GfxResult<()> {
        self.inner.submit(commands, signal_value)
    }
    fn completed_value(&self) -> GfxResult<u64> {
        self.inner.completed_value()
    }
    fn wait_for_value(&self, value: u64) -> GfxResult<()> {
        self.inner.wait_for_value(value)
    }
    fn wait_idle(&mut self) -> GfxResult<()> {
        self.inner.wait_idle()
    }
}

fn faulty_upload<'a>(
    backend: &'a mut FaultyBackend,
    commands: &'a mut GfxCommandList,
    staging: &'a mut StagingTracker,
) -> GpuUpload<'a> {
    GpuUpload {
        backend,
        commands,
        staging,
        submission: 1,
    }
}

#[test]
fn test_failed_upload_releases_image_and_staging() {
    let mut backend = FaultyBackend::new();
    let mut commands = GfxCommandList::new("test");
    let mut staging = StagingTracker::default();

    let mut gpu = faulty_upload(&mut backend, &mut commands, &mut staging);
    let mut registry = ResourceRegistry::new(&mut gpu, &small_config()).unwrap();
    drop(gpu);
    let images = backend.inner.live_image_count();
    let buffers = backend.inner.live_buffer_count();
    let recorded = commands.len();

    backend.fail_buffer_writes = true;
    let desc = GfxImageDesc::texture_2d(4, 4, GfxFormat::Rgba8Unorm, 1);
    let data = [ImageData::solid(4, 4, [1, 2, 3, 4])];
    let mut gpu = faulty_upload(&mut backend, &mut commands, &mut staging);
    assert!(registry.create_texture(&mut gpu, &desc, Some(&data[..]), "broken").is_err());
    assert!(registry.create_vertex_buffer(&mut gpu, &[0u8; 44], "broken-vertices").is_err());
    drop(gpu);

    assert_eq!(backend.inner.live_image_count(), images);
    assert_eq!(backend.inner.live_buffer_count(), buffers);
    assert_eq!(commands.len(), recorded, "nothing recorded for the failed upload");
    assert_eq!(staging.pending_count(), 1);
    assert_eq!(registry.resource_count(), 1);

    backend.fail_buffer_writes = false;
    registry.destroy(&mut backend).unwrap();
}

#[test]
fn test_failed_descriptor_write_releases_images() {
    let mut backend = FaultyBackend::new();
    let mut commands = GfxCommandList::new("test");
    let mut staging = StagingTracker::default();

    let mut gpu = faulty_upload(&mut backend, &mut commands, &mut staging);
    let mut registry = ResourceRegistry::new(&mut gpu, &small_config()).unwrap();
    drop(gpu);
    let images = backend.inner.live_image_count();
    let buffers = backend.inner.live_buffer_count();

    backend.fail_descriptor_writes = true;
    let mut gpu = faulty_upload(&mut backend, &mut commands, &mut staging);
    assert!(registry.create_dual_visibility_uav(&mut gpu, 4, 4, GfxFormat::Rgba8Unorm, "broken-uav").is_err());
    assert!(registry.create_depth_target(&mut gpu, 4, 4, "broken-depth").is_err());
    drop(gpu);
    assert!(registry.create_constant_buffer(&mut backend, 64, "broken-constants").is_err());

    assert_eq!(backend.inner.live_image_count(), images);
    assert_eq!(backend.inner.live_buffer_count(), buffers);
    assert_eq!(registry.resource_count(), 1);

    backend.fail_descriptor_writes = false;
    registry.destroy(&mut backend).unwrap();
}
