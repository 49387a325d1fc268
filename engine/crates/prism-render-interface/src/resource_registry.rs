use std::collections::HashMap;
use std::path::{Path, PathBuf};

use prism_asset::checkerboard::checkerboard;
use prism_asset::cubemap::decode_cubemap;
use prism_asset::mips::{ColorSpace, generate_mip_chain};
use prism_asset::ImageData;
use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::state::ResourceState;
use prism_gfx::commands::barrier::GfxImageBarrier;
use prism_gfx::commands::command_list::{GfxBufferImageCopy, GfxCommandList};
use prism_gfx::descriptors::{
    DescriptorHeapKind, DescriptorSlot, GfxSamplerDesc, GfxViewDesc, GfxViewDimension,
};
use prism_gfx::resources::desc::{GfxBufferDesc, GfxImageDesc};
use prism_gfx::resources::handles::{GfxBufferHandle, GfxImageHandle};
use prism_gfx::{GfxBackend, GfxError, GfxResult};

use crate::binding_table::{BindingTable, BindingTables};
use crate::config::RenderConfig;
use crate::descriptor_heap::DescriptorHeaps;
use crate::error::{LoadError, LoadResult};
use crate::handles::{BindingTableId, ResourceId};
use crate::staging::StagingTracker;

/// 常量 buffer 的对齐要求
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// 选择 shader 可见或不可见的那一份 view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    ShaderVisible,
    ShaderInvisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Texture,
    Cubemap,
    /// 两份底层 image，分别放在可见与不可见的堆中
    DualVisibilityUav,
    VertexBuffer,
    ConstantBuffer,
    /// 呈现用的 image，由后端拥有
    SwapTarget,
    DepthTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuResource {
    Image(GfxImageHandle),
    Buffer(GfxBufferHandle),
}

/// 描述符堆中的一个位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorRef {
    pub heap: DescriptorHeapKind,
    pub slot: DescriptorSlot,
}

/// 注册表中的一条资源记录，只有注册表可以修改
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    id: ResourceId,
    name: String,
    kind: ResourceKind,

    primary: GpuResource,
    primary_state: ResourceState,
    /// 双可见性 UAV 的第二份 image
    shader_invisible: Option<GfxImageHandle>,
    shader_invisible_state: ResourceState,

    visible_view: Option<DescriptorRef>,
    invisible_view: Option<DescriptorRef>,
    /// 可见 view 的描述（格式、维度、mip 数）
    view: Option<GfxViewDesc>,
    image_desc: Option<GfxImageDesc>,
    buffer_size: u64,

    /// 是否由注册表负责销毁
    owned: bool,
}

// getters
impl ResourceRecord {
    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[inline]
    pub fn primary(&self) -> GpuResource {
        self.primary
    }

    #[inline]
    pub fn image(&self) -> Option<GfxImageHandle> {
        match self.primary {
            GpuResource::Image(image) => Some(image),
            GpuResource::Buffer(_) => None,
        }
    }

    #[inline]
    pub fn buffer(&self) -> Option<GfxBufferHandle> {
        match self.primary {
            GpuResource::Buffer(buffer) => Some(buffer),
            GpuResource::Image(_) => None,
        }
    }

    #[inline]
    pub fn shader_invisible_image(&self) -> Option<GfxImageHandle> {
        self.shader_invisible
    }

    #[inline]
    pub fn state(&self) -> ResourceState {
        self.primary_state
    }

    #[inline]
    pub fn view(&self) -> Option<&GfxViewDesc> {
        self.view.as_ref()
    }

    #[inline]
    pub fn view_ref(&self, visibility: Visibility) -> Option<DescriptorRef> {
        match visibility {
            Visibility::ShaderVisible => self.visible_view,
            Visibility::ShaderInvisible => self.invisible_view,
        }
    }

    #[inline]
    pub fn image_desc(&self) -> Option<&GfxImageDesc> {
        self.image_desc.as_ref()
    }

    #[inline]
    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }
}

/// 向当前打开的命令流中录制上传所需的全部上下文
pub struct GpuUpload<'a> {
    pub backend: &'a mut dyn GfxBackend,
    pub commands: &'a mut GfxCommandList,
    pub staging: &'a mut StagingTracker,
    /// 当前命令流提交时会 signal 的 fence 值
    pub submission: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLoadOptions {
    pub color_space: ColorSpace,
    pub generate_mips: bool,
}

impl TextureLoadOptions {
    /// albedo 之类的颜色贴图
    pub const COLOR: Self = Self {
        color_space: ColorSpace::Srgb,
        generate_mips: true,
    };
    /// 法线、粗糙度之类的数据贴图
    pub const DATA: Self = Self {
        color_space: ColorSpace::Linear,
        generate_mips: true,
    };
    /// 查找表之类，不需要 mip
    pub const LINEAR_NO_MIPS: Self = Self {
        color_space: ColorSpace::Linear,
        generate_mips: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubemapLoadOptions {
    pub color_space: ColorSpace,
    /// 每个面需要读取的 mip 文件数
    pub mip_count: u32,
}

impl Default for CubemapLoadOptions {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Srgb,
            mip_count: 1,
        }
    }
}

#[inline]
fn format_for(color_space: ColorSpace) -> GfxFormat {
    match color_space {
        ColorSpace::Srgb => GfxFormat::Rgba8Srgb,
        ColorSpace::Linear => GfxFormat::Rgba8Unorm,
    }
}

/// GPU 资源注册表
///
/// 唯一持有底层 image/buffer 句柄并写入描述符槽位的组件。
/// 资源只增不减，`ResourceId` 即 `records` 的下标；销毁时按创建的逆序释放。
///
/// 只能在单个线程上使用；解码可以放到其他线程，但创建资源与分配槽位都必须回到这里。
pub struct ResourceRegistry {
    heaps: DescriptorHeaps,
    records: Vec<ResourceRecord>,

    texture_cache: HashMap<PathBuf, ResourceId>,
    cubemap_cache: HashMap<String, ResourceId>,

    binding_tables: BindingTables,

    destroyed: bool,
}

// new & init
impl ResourceRegistry {
    /// 创建各个描述符堆，并注册 `ResourceId(0)` 的棋盘格 fallback 纹理
    pub fn new(gpu: &mut GpuUpload, config: &RenderConfig) -> GfxResult<Self> {
        let _span = tracy_client::span!("ResourceRegistry::new");

        for heap in DescriptorHeapKind::ALL {
            gpu.backend.create_descriptor_heap(heap, config.heaps.capacity(heap))?;
        }

        let mut registry = Self {
            heaps: DescriptorHeaps::new(&config.heaps),
            records: Vec::new(),
            texture_cache: HashMap::new(),
            cubemap_cache: HashMap::new(),
            binding_tables: BindingTables::default(),
            destroyed: false,
        };

        let size = config.fallback_texture_size.max(8);
        let fallback = checkerboard(size, size);
        let desc = GfxImageDesc::texture_2d(size, size, GfxFormat::Rgba8Unorm, 1);
        let id = match registry.create_texture(gpu, &desc, Some(std::slice::from_ref(&fallback)), "fallback-checkerboard") {
            Ok(id) => id,
            Err(e) => {
                // 还没有任何记录
                registry.destroyed = true;
                return Err(e);
            }
        };
        debug_assert_eq!(id, ResourceId::FALLBACK);

        log::info!("ResourceRegistry created, fallback texture {size}x{size}");
        Ok(registry)
    }
}
// destroy
impl ResourceRegistry {
    /// 按创建的逆序销毁所有资源
    ///
    /// 调用前 GPU 必须已经空闲。
    pub fn destroy(&mut self, backend: &mut dyn GfxBackend) -> GfxResult<()> {
        let _span = tracy_client::span!("ResourceRegistry::destroy");

        let mut first_error = None;
        for record in self.records.drain(..).rev() {
            if !record.owned {
                continue;
            }
            let mut result = match record.primary {
                GpuResource::Image(image) => backend.destroy_image(image),
                GpuResource::Buffer(buffer) => backend.destroy_buffer(buffer),
            };
            if let Some(image) = record.shader_invisible {
                result = result.and(backend.destroy_image(image));
            }
            if let Err(e) = result {
                log::error!("failed to destroy {} '{}': {e}", record.id, record.name);
                first_error.get_or_insert(e);
            }
        }
        self.texture_cache.clear();
        self.cubemap_cache.clear();
        self.destroyed = true;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        log::info!("Dropping ResourceRegistry");
        if !std::thread::panicking() {
            debug_assert!(self.destroyed, "ResourceRegistry dropped without destroy()");
        }
    }
}
// getters
impl ResourceRegistry {
    /// 查找资源记录
    ///
    /// # Panics
    /// `id` 从未注册过。通过 `create_*` 得到的 id 不会发生这种情况。
    pub fn lookup(&self, id: ResourceId) -> &ResourceRecord {
        self.records
            .get(id.index() as usize)
            .unwrap_or_else(|| panic!("{id} was never registered ({} resources)", self.records.len()))
    }

    #[inline]
    pub fn try_lookup(&self, id: ResourceId) -> Option<&ResourceRecord> {
        self.records.get(id.index() as usize)
    }

    /// 绑定给 shader 使用的 view
    ///
    /// # Panics
    /// 资源没有 shader 可见的 view（例如顶点 buffer）。
    pub fn gpu_view(&self, id: ResourceId) -> DescriptorRef {
        let record = self.lookup(id);
        record.visible_view.unwrap_or_else(|| panic!("{id} '{}' has no shader visible view", record.name))
    }

    /// CPU 侧访问使用的 view：有不可见的那一份时返回它，否则返回可见的 view
    pub fn cpu_view(&self, id: ResourceId) -> DescriptorRef {
        let record = self.lookup(id);
        record
            .invisible_view
            .or(record.visible_view)
            .unwrap_or_else(|| panic!("{id} '{}' has no descriptor", record.name))
    }

    #[inline]
    pub fn resource_count(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn heaps(&self) -> &DescriptorHeaps {
        &self.heaps
    }

    pub fn cached_texture(&self, path: &Path) -> Option<ResourceId> {
        self.texture_cache.get(path).copied()
    }

    pub fn cached_cubemap(&self, pattern: &str) -> Option<ResourceId> {
        self.cubemap_cache.get(pattern).copied()
    }

    /// # Panics
    /// `id` 不是由本注册表创建的。
    pub fn binding_table(&self, id: BindingTableId) -> &BindingTable {
        self.binding_tables.get(id)
    }

    pub fn binding_table_by_name(&self, name: &str) -> Option<BindingTableId> {
        self.binding_tables.find(name)
    }
}
// create
impl ResourceRegistry {
    fn push_record(&mut self, mut record: ResourceRecord) -> ResourceId {
        let id = ResourceId::new(self.records.len() as u32);
        record.id = id;
        log::debug!("registered {id} '{}' ({:?})", record.name, record.kind);
        self.records.push(record);
        id
    }

    fn reserve_view(&mut self, heap: DescriptorHeapKind) -> GfxResult<DescriptorRef> {
        let slot = self.heaps.reserve(heap, 1)?;
        Ok(DescriptorRef { heap, slot })
    }

    fn blank_record(name: &str, kind: ResourceKind, primary: GpuResource) -> ResourceRecord {
        ResourceRecord {
            id: ResourceId::FALLBACK,
            name: name.to_string(),
            kind,
            primary,
            primary_state: ResourceState::Undefined,
            shader_invisible: None,
            shader_invisible_state: ResourceState::Undefined,
            visible_view: None,
            invisible_view: None,
            view: None,
            image_desc: None,
            buffer_size: 0,
            owned: true,
        }
    }

    /// 创建一张可采样的纹理
    ///
    /// `initial` 按 subresource 顺序（先 layer 后 mip）排列，数量必须等于
    /// `desc.subresource_count()`。提供数据时会写入 staging buffer、录制拷贝
    /// 与 copy-dest -> shader-read 的切换；不提供数据时直接切换到 shader-read。
    pub fn create_texture(
        &mut self,
        gpu: &mut GpuUpload,
        desc: &GfxImageDesc,
        initial: Option<&[ImageData]>,
        name: &str,
    ) -> GfxResult<ResourceId> {
        let _span = tracy_client::span!("ResourceRegistry::create_texture");

        if let Some(images) = initial {
            Self::check_initial_data(desc, images, name)?;
        }

        let view_ref = self.reserve_view(DescriptorHeapKind::CbvSrvUav)?;
        let image = gpu.backend.create_image(desc, name)?;
        let view = GfxViewDesc::ShaderResource {
            image,
            format: desc.format,
            dimension: if desc.cube { GfxViewDimension::TextureCube } else { GfxViewDimension::Texture2D },
            mip_levels: desc.mip_levels,
        };
        let staging = match Self::prepare_texture(gpu.backend, desc, view_ref, &view, initial, name) {
            Ok(staging) => staging,
            Err(e) => {
                Self::discard(gpu.backend, &[GpuResource::Image(image)]);
                return Err(e);
            }
        };

        match (initial, staging) {
            (Some(images), Some((staging, total))) => {
                gpu.staging.track(staging, total, gpu.submission);
                gpu.commands.image_barrier(
                    GfxImageBarrier::new(image).state_transfer(ResourceState::Undefined, ResourceState::CopyDest),
                );
                let mut offset = 0u64;
                for layer in 0..desc.array_layers {
                    for mip in 0..desc.mip_levels {
                        let data = &images[desc.subresource_index(mip, layer)];
                        gpu.commands.copy_buffer_to_image(
                            staging,
                            image,
                            GfxBufferImageCopy {
                                buffer_offset: offset,
                                mip_level: mip,
                                array_layer: layer,
                                width: data.width(),
                                height: data.height(),
                            },
                        );
                        offset += data.pixels().len() as u64;
                    }
                }
                gpu.commands.image_barrier(
                    GfxImageBarrier::new(image).state_transfer(ResourceState::CopyDest, ResourceState::ShaderRead),
                );
            }
            _ => {
                gpu.commands.image_barrier(
                    GfxImageBarrier::new(image).state_transfer(ResourceState::Undefined, ResourceState::ShaderRead),
                );
            }
        }

        let kind = if desc.cube { ResourceKind::Cubemap } else { ResourceKind::Texture };
        let mut record = Self::blank_record(name, kind, GpuResource::Image(image));
        record.primary_state = ResourceState::ShaderRead;
        record.visible_view = Some(view_ref);
        record.view = Some(view);
        record.image_desc = Some(desc.clone());
        Ok(self.push_record(record))
    }

    /// 写入描述符，并把初始数据按 subresource 顺序写进一个新的 staging buffer
    ///
    /// 失败时 staging buffer 已经释放，image 由调用方释放。
    fn prepare_texture(
        backend: &mut dyn GfxBackend,
        desc: &GfxImageDesc,
        view_ref: DescriptorRef,
        view: &GfxViewDesc,
        initial: Option<&[ImageData]>,
        name: &str,
    ) -> GfxResult<Option<(GfxBufferHandle, u64)>> {
        backend.write_descriptor(view_ref.heap, view_ref.slot, view)?;
        let Some(images) = initial else {
            return Ok(None);
        };

        let total: u64 = images.iter().map(|i| i.pixels().len() as u64).sum();
        let staging = backend.create_buffer(&GfxBufferDesc::staging(total), &format!("{name} (staging)"))?;
        let mut offset = 0u64;
        for layer in 0..desc.array_layers {
            for mip in 0..desc.mip_levels {
                let data = &images[desc.subresource_index(mip, layer)];
                if let Err(e) = backend.write_buffer(staging, offset, data.pixels()) {
                    Self::discard(backend, &[GpuResource::Buffer(staging)]);
                    return Err(e);
                }
                offset += data.pixels().len() as u64;
            }
        }
        Ok(Some((staging, total)))
    }

    /// 创建中途失败时释放已经创建的底层资源，释放本身的错误只记录日志
    fn discard(backend: &mut dyn GfxBackend, resources: &[GpuResource]) {
        for resource in resources {
            let result = match *resource {
                GpuResource::Image(image) => backend.destroy_image(image),
                GpuResource::Buffer(buffer) => backend.destroy_buffer(buffer),
            };
            if let Err(e) = result {
                log::error!("failed to release {resource:?} of a failed creation: {e}");
            }
        }
    }

    fn check_initial_data(desc: &GfxImageDesc, images: &[ImageData], name: &str) -> GfxResult<()> {
        if desc.format.bytes_per_pixel() != 4 {
            return Err(GfxError::InvalidState(format!("'{name}': initial data needs a 4 byte format")));
        }
        if images.len() != desc.subresource_count() as usize {
            return Err(GfxError::InvalidState(format!(
                "'{name}': {} images supplied for {} subresources",
                images.len(),
                desc.subresource_count()
            )));
        }
        for layer in 0..desc.array_layers {
            for mip in 0..desc.mip_levels {
                let data = &images[desc.subresource_index(mip, layer)];
                if data.dimensions() != desc.mip_extent(mip) {
                    return Err(GfxError::InvalidState(format!(
                        "'{name}': layer {layer} mip {mip} is {:?}, expected {:?}",
                        data.dimensions(),
                        desc.mip_extent(mip)
                    )));
                }
            }
        }
        Ok(())
    }

    /// 创建一个逻辑上的读写表面，底层是两份 image
    ///
    /// 一份的 UAV 放在 shader 可见堆中供绘制使用，另一份放在 shader 不可见堆中供 CPU 侧清除。
    pub fn create_dual_visibility_uav(
        &mut self,
        gpu: &mut GpuUpload,
        width: u32,
        height: u32,
        format: GfxFormat,
        name: &str,
    ) -> GfxResult<ResourceId> {
        let _span = tracy_client::span!("ResourceRegistry::create_dual_visibility_uav");

        let visible_ref = self.reserve_view(DescriptorHeapKind::CbvSrvUav)?;
        let invisible_ref = self.reserve_view(DescriptorHeapKind::CbvSrvUavShaderInvisible)?;

        let desc = GfxImageDesc::storage_2d(width, height, format);
        let visible = gpu.backend.create_image(&desc, name)?;
        let invisible = match gpu.backend.create_image(&desc, &format!("{name} (shader invisible)")) {
            Ok(image) => image,
            Err(e) => {
                Self::discard(gpu.backend, &[GpuResource::Image(visible)]);
                return Err(e);
            }
        };

        let visible_view = GfxViewDesc::UnorderedAccess { image: visible, format };
        let written = gpu.backend.write_descriptor(visible_ref.heap, visible_ref.slot, &visible_view).and_then(|()| {
            gpu.backend.write_descriptor(
                invisible_ref.heap,
                invisible_ref.slot,
                &GfxViewDesc::UnorderedAccess { image: invisible, format },
            )
        });
        if let Err(e) = written {
            Self::discard(gpu.backend, &[GpuResource::Image(visible), GpuResource::Image(invisible)]);
            return Err(e);
        }

        for image in [visible, invisible] {
            gpu.commands.image_barrier(
                GfxImageBarrier::new(image).state_transfer(ResourceState::Undefined, ResourceState::UnorderedAccess),
            );
        }

        let mut record = Self::blank_record(name, ResourceKind::DualVisibilityUav, GpuResource::Image(visible));
        record.primary_state = ResourceState::UnorderedAccess;
        record.shader_invisible = Some(invisible);
        record.shader_invisible_state = ResourceState::UnorderedAccess;
        record.visible_view = Some(visible_ref);
        record.invisible_view = Some(invisible_ref);
        record.view = Some(visible_view);
        record.image_desc = Some(desc);
        Ok(self.push_record(record))
    }

    /// GPU only 的顶点 buffer，数据经由 staging buffer 拷贝
    pub fn create_vertex_buffer(&mut self, gpu: &mut GpuUpload, data: &[u8], name: &str) -> GfxResult<ResourceId> {
        let size = data.len() as u64;
        let buffer = gpu.backend.create_buffer(&GfxBufferDesc::vertex(size), name)?;

        let staging = match gpu.backend.create_buffer(&GfxBufferDesc::staging(size), &format!("{name} (staging)")) {
            Ok(staging) => staging,
            Err(e) => {
                Self::discard(gpu.backend, &[GpuResource::Buffer(buffer)]);
                return Err(e);
            }
        };
        if let Err(e) = gpu.backend.write_buffer(staging, 0, data) {
            Self::discard(gpu.backend, &[GpuResource::Buffer(staging), GpuResource::Buffer(buffer)]);
            return Err(e);
        }
        gpu.staging.track(staging, size, gpu.submission);
        gpu.commands.copy_buffer(staging, buffer, 0, 0, size);

        let mut record = Self::blank_record(name, ResourceKind::VertexBuffer, GpuResource::Buffer(buffer));
        record.buffer_size = size;
        Ok(self.push_record(record))
    }

    /// CPU 可写的常量 buffer，大小向上对齐到 256 字节，带一个 CBV 槽位
    pub fn create_constant_buffer(&mut self, backend: &mut dyn GfxBackend, size: u64, name: &str) -> GfxResult<ResourceId> {
        let aligned = size.max(1).div_ceil(CONSTANT_BUFFER_ALIGNMENT) * CONSTANT_BUFFER_ALIGNMENT;
        let view_ref = self.reserve_view(DescriptorHeapKind::CbvSrvUav)?;
        let buffer = backend.create_buffer(&GfxBufferDesc::uniform(aligned), name)?;
        let view = GfxViewDesc::ConstantBuffer {
            buffer,
            offset: 0,
            size: aligned,
        };
        if let Err(e) = backend.write_descriptor(view_ref.heap, view_ref.slot, &view) {
            Self::discard(backend, &[GpuResource::Buffer(buffer)]);
            return Err(e);
        }

        let mut record = Self::blank_record(name, ResourceKind::ConstantBuffer, GpuResource::Buffer(buffer));
        record.visible_view = Some(view_ref);
        record.view = Some(view);
        record.buffer_size = aligned;
        Ok(self.push_record(record))
    }

    /// 为后端的每个 swap target 分配 RTV 槽位
    ///
    /// swap target 的状态切换由 `FramePacer` 负责，注册表不会销毁它们。
    pub fn register_swap_targets(&mut self, backend: &mut dyn GfxBackend) -> GfxResult<Vec<ResourceId>> {
        let format = backend.swap_target_format();
        let (width, height) = backend.swap_extent();
        let targets = backend.swap_targets().to_vec();

        let mut ids = Vec::with_capacity(targets.len());
        for (idx, image) in targets.into_iter().enumerate() {
            let view_ref = self.reserve_view(DescriptorHeapKind::RenderTarget)?;
            let view = GfxViewDesc::RenderTarget { image, format };
            backend.write_descriptor(view_ref.heap, view_ref.slot, &view)?;

            let mut record = Self::blank_record(&format!("swap-target-{idx}"), ResourceKind::SwapTarget, GpuResource::Image(image));
            record.primary_state = ResourceState::Present;
            record.visible_view = Some(view_ref);
            record.view = Some(view);
            record.image_desc = Some(GfxImageDesc::texture_2d(width, height, format, 1));
            record.owned = false;
            ids.push(self.push_record(record));
        }
        Ok(ids)
    }

    /// 深度缓冲，带一个 DSV 槽位
    pub fn create_depth_target(&mut self, gpu: &mut GpuUpload, width: u32, height: u32, name: &str) -> GfxResult<ResourceId> {
        let view_ref = self.reserve_view(DescriptorHeapKind::DepthStencil)?;
        let desc = GfxImageDesc::depth_2d(width, height, GfxFormat::D32Float);
        let image = gpu.backend.create_image(&desc, name)?;
        let view = GfxViewDesc::DepthStencil {
            image,
            format: desc.format,
        };
        if let Err(e) = gpu.backend.write_descriptor(view_ref.heap, view_ref.slot, &view) {
            Self::discard(gpu.backend, &[GpuResource::Image(image)]);
            return Err(e);
        }
        gpu.commands
            .image_barrier(GfxImageBarrier::new(image).state_transfer(ResourceState::Undefined, ResourceState::DepthWrite));

        let mut record = Self::blank_record(name, ResourceKind::DepthTarget, GpuResource::Image(image));
        record.primary_state = ResourceState::DepthWrite;
        record.visible_view = Some(view_ref);
        record.view = Some(view);
        record.image_desc = Some(desc);
        Ok(self.push_record(record))
    }
}
// load
impl ResourceRegistry {
    /// 按路径加载纹理，同一路径只会创建一次
    ///
    /// 缓存的 key 只有路径，第一次加载时的选项生效。
    pub fn load_texture(&mut self, gpu: &mut GpuUpload, path: &Path, options: TextureLoadOptions) -> LoadResult<ResourceId> {
        let _span = tracy_client::span!("ResourceRegistry::load_texture");

        if let Some(id) = self.cached_texture(path) {
            log::debug!("texture cache hit: {} -> {id}", path.display());
            return Ok(id);
        }

        let image = ImageData::decode_file(path).inspect_err(|e| log::warn!("{e}"))?;
        let mips = if options.generate_mips {
            generate_mip_chain(&image, options.color_space)
        } else {
            vec![image]
        };
        let (width, height) = mips[0].dimensions();
        let desc = GfxImageDesc::texture_2d(width, height, format_for(options.color_space), mips.len() as u32);

        let id = self.create_texture(gpu, &desc, Some(mips.as_slice()), &path.to_string_lossy())?;
        self.texture_cache.insert(path.to_path_buf(), id);
        log::info!("loaded texture {} -> {id} ({width}x{height}, {} mips)", path.display(), mips.len());
        Ok(id)
    }

    /// 加载失败（文件缺失、解码失败）时返回 fallback 纹理；致命错误仍然向上传播
    pub fn load_texture_or_fallback(
        &mut self,
        gpu: &mut GpuUpload,
        path: &Path,
        options: TextureLoadOptions,
    ) -> GfxResult<ResourceId> {
        match self.load_texture(gpu, path, options) {
            Ok(id) => Ok(id),
            Err(LoadError::Asset(e)) => {
                log::warn!("using fallback texture for {}: {e}", path.display());
                Ok(ResourceId::FALLBACK)
            }
            Err(LoadError::Fatal(e)) => Err(e),
        }
    }

    /// 按路径模板加载 cubemap（模板中的 `{face}`、`{mip}` 会被替换），同一模板只会创建一次
    ///
    /// 任何一个面失败时不会创建资源，也不会占用槽位。
    pub fn load_cubemap(&mut self, gpu: &mut GpuUpload, pattern: &str, options: CubemapLoadOptions) -> LoadResult<ResourceId> {
        let _span = tracy_client::span!("ResourceRegistry::load_cubemap");

        if let Some(id) = self.cached_cubemap(pattern) {
            log::debug!("cubemap cache hit: {pattern} -> {id}");
            return Ok(id);
        }

        let cube = decode_cubemap(pattern, options.mip_count).inspect_err(|e| log::warn!("{e}"))?;
        let (width, height) = cube.dimensions();
        let desc = GfxImageDesc::cubemap(width, height, format_for(options.color_space), cube.mip_count());

        let id = self.create_texture(gpu, &desc, Some(cube.images()), pattern)?;
        self.cubemap_cache.insert(pattern.to_string(), id);
        log::info!("loaded cubemap {pattern} -> {id} ({width}x{height}, {} mips)", cube.mip_count());
        Ok(id)
    }
}
// tables
impl ResourceRegistry {
    /// 为一组资源分配一段连续的 shader 可见槽位，并按顺序写入它们的 view
    pub fn create_binding_table(
        &mut self,
        backend: &mut dyn GfxBackend,
        name: &str,
        resources: &[ResourceId],
    ) -> GfxResult<BindingTableId> {
        if self.binding_tables.find(name).is_some() {
            return Err(GfxError::InvalidState(format!("binding table '{name}' already exists")));
        }
        let views = resources
            .iter()
            .map(|id| {
                let record = self.lookup(*id);
                record
                    .view
                    .clone()
                    .filter(|v| v.fits_heap(DescriptorHeapKind::CbvSrvUav))
                    .ok_or_else(|| GfxError::InvalidState(format!("{id} '{}' can not be placed in a table", record.name)))
            })
            .collect::<GfxResult<Vec<_>>>()?;

        let heap = DescriptorHeapKind::CbvSrvUav;
        let first = self.heaps.reserve(heap, resources.len() as u32)?;
        for (i, view) in views.iter().enumerate() {
            backend.write_descriptor(heap, first.offset(i as u32), view)?;
        }

        let id = self.binding_tables.insert(BindingTable::new(name, heap, first, resources.to_vec()));
        log::debug!("binding table '{name}' at slot {} ({} entries)", first.index(), resources.len());
        Ok(id)
    }

    /// 在 sampler 堆中分配一段连续槽位
    pub fn create_sampler_table(
        &mut self,
        backend: &mut dyn GfxBackend,
        name: &str,
        samplers: &[GfxSamplerDesc],
    ) -> GfxResult<BindingTableId> {
        if self.binding_tables.find(name).is_some() {
            return Err(GfxError::InvalidState(format!("binding table '{name}' already exists")));
        }
        let heap = DescriptorHeapKind::Sampler;
        let first = self.heaps.reserve(heap, samplers.len() as u32)?;
        for (i, sampler) in samplers.iter().enumerate() {
            backend.write_descriptor(heap, first.offset(i as u32), &GfxViewDesc::Sampler(*sampler))?;
        }
        Ok(self.binding_tables.insert(BindingTable::new(name, heap, first, Vec::new())))
    }
}
// record
impl ResourceRegistry {
    /// 把资源切换到 `after`，状态相同时不录制任何命令
    pub fn transition(
        &mut self,
        commands: &mut GfxCommandList,
        id: ResourceId,
        visibility: Visibility,
        after: ResourceState,
    ) {
        let index = id.index() as usize;
        let name = self.lookup(id).name.clone();
        let record = &mut self.records[index];
        let (image, state) = match (visibility, record.primary, record.shader_invisible) {
            (Visibility::ShaderVisible, GpuResource::Image(image), _) => (image, &mut record.primary_state),
            (Visibility::ShaderInvisible, _, Some(image)) => (image, &mut record.shader_invisible_state),
            _ => panic!("{id} '{name}' has no {visibility:?} image"),
        };
        if *state != after {
            commands.image_barrier(GfxImageBarrier::new(image).state_transfer(*state, after));
            *state = after;
        }
    }

    /// 清除双可见性 UAV 的一份 image
    ///
    /// 不可见的那一份通过不可见堆中的 view 清除，可见的那一份通过可见堆中的 view 清除。
    pub fn record_uav_clear(
        &mut self,
        commands: &mut GfxCommandList,
        id: ResourceId,
        visibility: Visibility,
        color: [f32; 4],
    ) -> GfxResult<()> {
        self.transition(commands, id, visibility, ResourceState::UnorderedAccess);
        let record = self.lookup(id);
        let view_ref = record
            .view_ref(visibility)
            .ok_or_else(|| GfxError::InvalidState(format!("{id} '{}' has no {visibility:?} view", record.name)))?;
        let image = match visibility {
            Visibility::ShaderVisible => record.image(),
            Visibility::ShaderInvisible => record.shader_invisible,
        }
        .ok_or_else(|| GfxError::InvalidState(format!("{id} '{}' is not an image", record.name)))?;
        commands.clear_unordered_access(image, view_ref.heap, view_ref.slot, color);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
