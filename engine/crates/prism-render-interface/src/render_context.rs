use std::path::Path;

use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::state::ResourceState;
use prism_gfx::commands::command_list::GfxCommandList;
use prism_gfx::descriptors::GfxSamplerDesc;
use prism_gfx::resources::desc::GfxImageDesc;
use prism_gfx::resources::handles::GfxImageHandle;
use prism_gfx::{GfxBackend, GfxResult};
use prism_asset::ImageData;

use crate::config::RenderConfig;
use crate::constant_buffer::ConstantBuffer;
use crate::error::LoadResult;
use crate::frame_pacer::{FrameCompletion, FramePacer};
use crate::handles::{BindingTableId, ResourceId};
use crate::resource_registry::{
    CubemapLoadOptions, DescriptorRef, GpuUpload, ResourceRegistry, TextureLoadOptions, Visibility,
};
use crate::staging::StagingTracker;

/// 当前帧渲染的 swap target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTarget {
    pub resource: ResourceId,
    pub image: GfxImageHandle,
    pub rtv: DescriptorRef,
    pub extent: (u32, u32),
}

/// 后端与渲染接口各组件的组合
///
/// 创建时打开名为 `startup-upload` 的上传命令流，并注册 fallback 纹理与 swap target。
/// 销毁时先等待 GPU 空闲，再释放 staging buffer，最后按逆序销毁注册表中的资源。
pub struct RenderContext<B: GfxBackend> {
    registry: ResourceRegistry,
    staging: StagingTracker,
    pacer: FramePacer,
    swap_targets: Vec<ResourceId>,
    config: RenderConfig,

    backend: B,
}

// new & init
impl<B: GfxBackend> RenderContext<B> {
    pub fn new(mut backend: B, config: RenderConfig) -> GfxResult<Self> {
        let _span = tracy_client::span!("RenderContext::new");

        let mut pacer = FramePacer::new(&backend)?;
        pacer.begin_recording("startup-upload")?;
        let submission = pacer.pending_fence_value();

        let mut staging = StagingTracker::default();
        let registry = {
            let mut gpu = GpuUpload {
                backend: &mut backend,
                commands: pacer.commands_mut()?,
                staging: &mut staging,
                submission,
            };
            ResourceRegistry::new(&mut gpu, &config)?
        };

        let mut ctx = Self {
            registry,
            staging,
            pacer,
            swap_targets: Vec::new(),
            config,
            backend,
        };
        ctx.swap_targets = ctx.registry.register_swap_targets(&mut ctx.backend)?;

        log::info!(
            "RenderContext created on '{}' backend, {} swap targets",
            ctx.backend.name(),
            ctx.swap_targets.len()
        );
        Ok(ctx)
    }
}
// getters
impl<B: GfxBackend> RenderContext<B> {
    #[inline]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    #[inline]
    pub fn staging(&self) -> &StagingTracker {
        &self.staging
    }

    #[inline]
    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[inline]
    pub fn swap_targets(&self) -> &[ResourceId] {
        &self.swap_targets
    }

    /// 正在录制的命令流
    #[inline]
    pub fn commands(&mut self) -> GfxResult<&mut GfxCommandList> {
        self.pacer.commands_mut()
    }

    /// 拆分出注册表与当前命令流的上传上下文，命令流必须处于录制状态
    pub fn upload(&mut self) -> GfxResult<(&mut ResourceRegistry, GpuUpload<'_>)> {
        let submission = self.pacer.pending_fence_value();
        let gpu = GpuUpload {
            backend: &mut self.backend,
            commands: self.pacer.commands_mut()?,
            staging: &mut self.staging,
            submission,
        };
        Ok((&mut self.registry, gpu))
    }

    /// 录制绘制命令时同时需要注册表与命令流
    pub fn draw_parts(&mut self) -> GfxResult<(&ResourceRegistry, &mut GfxCommandList)> {
        Ok((&self.registry, self.pacer.commands_mut()?))
    }
}
// frame
impl<B: GfxBackend> RenderContext<B> {
    /// 打开一段只用于上传的命令流
    pub fn begin_upload(&mut self, name: &str) -> GfxResult<()> {
        self.pacer.begin_recording(name)
    }

    pub fn begin_frame(&mut self) -> GfxResult<FrameTarget> {
        let image = self.pacer.begin_frame(&self.backend)?;
        let resource = self.swap_targets[self.pacer.swap_index()];
        Ok(FrameTarget {
            resource,
            image,
            rtv: self.registry.gpu_view(resource),
            extent: self.backend.swap_extent(),
        })
    }

    /// 提交当前命令流，返回 signal 的 fence 值
    #[inline]
    pub fn submit(&mut self) -> GfxResult<u64> {
        self.pacer.submit(&mut self.backend)
    }

    /// 等待最后一次提交完成，并释放已经完成的 staging buffer
    pub fn wait(&mut self) -> GfxResult<FrameCompletion> {
        let completion = self.pacer.wait(&self.backend)?;
        self.staging.release_completed(&mut self.backend, &completion)?;
        Ok(completion)
    }

    /// 非阻塞版本的 [`Self::wait`]
    pub fn poll(&mut self) -> GfxResult<Option<FrameCompletion>> {
        let Some(completion) = self.pacer.try_wait(&self.backend)? else {
            return Ok(None);
        };
        self.staging.release_completed(&mut self.backend, &completion)?;
        Ok(Some(completion))
    }

    /// 提交并等待当前命令流，上传流与渲染帧都适用
    pub fn end_frame(&mut self) -> GfxResult<FrameCompletion> {
        self.submit()?;
        self.wait()
    }
}
// resources
impl<B: GfxBackend> RenderContext<B> {
    pub fn create_texture(&mut self, desc: &GfxImageDesc, initial: Option<&[ImageData]>, name: &str) -> GfxResult<ResourceId> {
        let (registry, mut gpu) = self.upload()?;
        registry.create_texture(&mut gpu, desc, initial, name)
    }

    pub fn load_texture(&mut self, path: impl AsRef<Path>, options: TextureLoadOptions) -> LoadResult<ResourceId> {
        let (registry, mut gpu) = self.upload()?;
        registry.load_texture(&mut gpu, path.as_ref(), options)
    }

    pub fn load_texture_or_fallback(&mut self, path: impl AsRef<Path>, options: TextureLoadOptions) -> GfxResult<ResourceId> {
        let (registry, mut gpu) = self.upload()?;
        registry.load_texture_or_fallback(&mut gpu, path.as_ref(), options)
    }

    pub fn load_cubemap(&mut self, pattern: &str, options: CubemapLoadOptions) -> LoadResult<ResourceId> {
        let (registry, mut gpu) = self.upload()?;
        registry.load_cubemap(&mut gpu, pattern, options)
    }

    pub fn create_dual_visibility_uav(&mut self, width: u32, height: u32, format: GfxFormat, name: &str) -> GfxResult<ResourceId> {
        let (registry, mut gpu) = self.upload()?;
        registry.create_dual_visibility_uav(&mut gpu, width, height, format, name)
    }

    pub fn create_vertex_buffer(&mut self, data: &[u8], name: &str) -> GfxResult<ResourceId> {
        let (registry, mut gpu) = self.upload()?;
        registry.create_vertex_buffer(&mut gpu, data, name)
    }

    pub fn create_depth_target(&mut self, width: u32, height: u32, name: &str) -> GfxResult<ResourceId> {
        let (registry, mut gpu) = self.upload()?;
        registry.create_depth_target(&mut gpu, width, height, name)
    }

    pub fn create_constant_buffer<T: bytemuck::Pod>(&mut self, name: &str, value: T) -> GfxResult<ConstantBuffer<T>> {
        ConstantBuffer::new(&mut self.registry, &mut self.backend, name, value)
    }

    pub fn write_constant_buffer<T: bytemuck::Pod>(&mut self, cb: &mut ConstantBuffer<T>, value: T) -> GfxResult<()> {
        cb.write(&mut self.backend, value)
    }

    pub fn create_binding_table(&mut self, name: &str, resources: &[ResourceId]) -> GfxResult<BindingTableId> {
        self.registry.create_binding_table(&mut self.backend, name, resources)
    }

    pub fn create_sampler_table(&mut self, name: &str, samplers: &[GfxSamplerDesc]) -> GfxResult<BindingTableId> {
        self.registry.create_sampler_table(&mut self.backend, name, samplers)
    }

    pub fn transition(&mut self, id: ResourceId, visibility: Visibility, after: ResourceState) -> GfxResult<()> {
        let commands = self.pacer.commands_mut()?;
        self.registry.transition(commands, id, visibility, after);
        Ok(())
    }

    pub fn record_uav_clear(&mut self, id: ResourceId, visibility: Visibility, color: [f32; 4]) -> GfxResult<()> {
        let commands = self.pacer.commands_mut()?;
        self.registry.record_uav_clear(commands, id, visibility, color)
    }
}
impl<B: GfxBackend> Drop for RenderContext<B> {
    fn drop(&mut self) {
        let _span = tracy_client::span!("RenderContext::drop");
        log::info!("Dropping RenderContext");

        if let Err(e) = self.backend.wait_idle() {
            log::error!("wait idle failed during shutdown: {e}");
        }
        if let Err(e) = self.staging.release_all_after_idle(&mut self.backend) {
            log::error!("failed to release staging buffers: {e}");
        }
        if let Err(e) = self.registry.destroy(&mut self.backend) {
            log::error!("failed to destroy resources: {e}");
        }
    }
}
