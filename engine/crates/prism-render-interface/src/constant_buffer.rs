use prism_gfx::resources::handles::GfxBufferHandle;
use prism_gfx::{GfxBackend, GfxError, GfxResult};

use crate::handles::ResourceId;
use crate::resource_registry::{DescriptorRef, ResourceRegistry};

/// 类型化的常量 buffer
///
/// 底层 buffer 由注册表持有，这里只保存 id 与 CPU 侧的副本。
#[derive(Debug)]
pub struct ConstantBuffer<T: bytemuck::Pod> {
    resource: ResourceId,
    buffer: GfxBufferHandle,
    view: DescriptorRef,
    value: T,
}

// new & init
impl<T: bytemuck::Pod> ConstantBuffer<T> {
    pub fn new(registry: &mut ResourceRegistry, backend: &mut dyn GfxBackend, name: &str, value: T) -> GfxResult<Self> {
        let resource = registry.create_constant_buffer(backend, size_of::<T>() as u64, name)?;
        let record = registry.lookup(resource);
        let buffer = record
            .buffer()
            .ok_or_else(|| GfxError::InvalidState(format!("{resource} '{name}' is not a buffer")))?;
        let view = registry.gpu_view(resource);

        let mut cb = Self {
            resource,
            buffer,
            view,
            value,
        };
        cb.write(backend, value)?;
        Ok(cb)
    }
}
// getters
impl<T: bytemuck::Pod> ConstantBuffer<T> {
    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    #[inline]
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    #[inline]
    pub fn buffer(&self) -> GfxBufferHandle {
        self.buffer
    }

    #[inline]
    pub fn view(&self) -> DescriptorRef {
        self.view
    }
}
// tools
impl<T: bytemuck::Pod> ConstantBuffer<T> {
    /// 更新 CPU 副本并写入 buffer
    ///
    /// buffer 没有多份拷贝，调用方需要保证上一帧对它的读取已经完成。
    pub fn write(&mut self, backend: &mut dyn GfxBackend, value: T) -> GfxResult<()> {
        self.value = value;
        backend.write_buffer(self.buffer, 0, bytemuck::bytes_of(&self.value))
    }
}
