use crate::commands::barrier::GfxImageBarrier;
use crate::descriptors::{DescriptorHeapKind, DescriptorSlot};
use crate::resources::handles::{GfxBufferHandle, GfxImageHandle, GfxPipelineHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfxBufferImageCopy {
    pub buffer_offset: u64,
    pub mip_level: u32,
    pub array_layer: u32,
    pub width: u32,
    pub height: u32,
}

/// 渲染目标中的一个附件：image 以及它在 RTV/DSV 堆里的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfxAttachment {
    pub image: GfxImageHandle,
    pub view: DescriptorSlot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GfxRenderingInfo {
    pub color: GfxAttachment,
    pub depth: Option<GfxAttachment>,
    pub clear_color: Option<[f32; 4]>,
    pub clear_depth: Option<f32>,
    pub extent: (u32, u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GfxCommand {
    ImageBarrier(GfxImageBarrier),
    CopyBufferToImage {
        src: GfxBufferHandle,
        dst: GfxImageHandle,
        region: GfxBufferImageCopy,
    },
    /// buffer 之间的拷贝，之后的顶点读取会等待拷贝完成
    CopyBuffer {
        src: GfxBufferHandle,
        dst: GfxBufferHandle,
        src_offset: u64,
        dst_offset: u64,
        size: u64,
    },
    /// 通过 shader 不可见堆中的 UAV view 清除 image
    ClearUnorderedAccess {
        image: GfxImageHandle,
        heap: DescriptorHeapKind,
        view: DescriptorSlot,
        color: [f32; 4],
    },
    BeginRendering(GfxRenderingInfo),
    EndRendering,
    BindPipeline(GfxPipelineHandle),
    BindDescriptorTable {
        root_index: u32,
        heap: DescriptorHeapKind,
        base: DescriptorSlot,
    },
    BindVertexBuffer {
        buffer: GfxBufferHandle,
        offset: u64,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
}

/// 一段录制好的命令流
///
/// 与后端无关，录制时不访问设备；提交时由后端翻译成真正的命令。
#[derive(Debug, Clone, Default)]
pub struct GfxCommandList {
    name: String,
    commands: Vec<GfxCommand>,
}

// new & init
impl GfxCommandList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    /// 清空已录制的命令，开始新的一段
    pub fn reset(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.commands.clear();
    }
}
// getters
impl GfxCommandList {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn commands(&self) -> &[GfxCommand] {
        &self.commands
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, GfxCommand::Draw { .. })).count()
    }

    /// 命令流中引用到的所有 buffer，用于跟踪 in-flight 资源
    pub fn referenced_buffers(&self) -> Vec<GfxBufferHandle> {
        let mut buffers = Vec::new();
        for command in &self.commands {
            let referenced = match command {
                GfxCommand::CopyBufferToImage { src, .. } => [Some(*src), None],
                GfxCommand::CopyBuffer { src, dst, .. } => [Some(*src), Some(*dst)],
                GfxCommand::BindVertexBuffer { buffer, .. } => [Some(*buffer), None],
                _ => continue,
            };
            for buffer in referenced.into_iter().flatten() {
                if !buffers.contains(&buffer) {
                    buffers.push(buffer);
                }
            }
        }
        buffers
    }

    /// 命令流中引用到的所有 image
    pub fn referenced_images(&self) -> Vec<GfxImageHandle> {
        let mut images = Vec::new();
        let mut push = |image: GfxImageHandle| {
            if !images.contains(&image) {
                images.push(image);
            }
        };
        for command in &self.commands {
            match command {
                GfxCommand::ImageBarrier(barrier) => push(barrier.image),
                GfxCommand::CopyBufferToImage { dst, .. } => push(*dst),
                GfxCommand::ClearUnorderedAccess { image, .. } => push(*image),
                GfxCommand::BeginRendering(info) => {
                    push(info.color.image);
                    if let Some(depth) = &info.depth {
                        push(depth.image);
                    }
                }
                _ => {}
            }
        }
        images
    }
}
// record
impl GfxCommandList {
    #[inline]
    pub fn push(&mut self, command: GfxCommand) {
        self.commands.push(command);
    }

    #[inline]
    pub fn image_barrier(&mut self, barrier: GfxImageBarrier) {
        self.commands.push(GfxCommand::ImageBarrier(barrier));
    }

    #[inline]
    pub fn copy_buffer_to_image(&mut self, src: GfxBufferHandle, dst: GfxImageHandle, region: GfxBufferImageCopy) {
        self.commands.push(GfxCommand::CopyBufferToImage { src, dst, region });
    }

    #[inline]
    pub fn copy_buffer(&mut self, src: GfxBufferHandle, dst: GfxBufferHandle, src_offset: u64, dst_offset: u64, size: u64) {
        self.commands.push(GfxCommand::CopyBuffer {
            src,
            dst,
            src_offset,
            dst_offset,
            size,
        });
    }

    #[inline]
    pub fn clear_unordered_access(
        &mut self,
        image: GfxImageHandle,
        heap: DescriptorHeapKind,
        view: DescriptorSlot,
        color: [f32; 4],
    ) {
        self.commands.push(GfxCommand::ClearUnorderedAccess {
            image,
            heap,
            view,
            color,
        });
    }

    #[inline]
    pub fn begin_rendering(&mut self, info: GfxRenderingInfo) {
        self.commands.push(GfxCommand::BeginRendering(info));
    }

    #[inline]
    pub fn end_rendering(&mut self) {
        self.commands.push(GfxCommand::EndRendering);
    }

    #[inline]
    pub fn bind_pipeline(&mut self, pipeline: GfxPipelineHandle) {
        self.commands.push(GfxCommand::BindPipeline(pipeline));
    }

    #[inline]
    pub fn bind_descriptor_table(&mut self, root_index: u32, heap: DescriptorHeapKind, base: DescriptorSlot) {
        self.commands.push(GfxCommand::BindDescriptorTable { root_index, heap, base });
    }

    #[inline]
    pub fn bind_vertex_buffer(&mut self, buffer: GfxBufferHandle, offset: u64) {
        self.commands.push(GfxCommand::BindVertexBuffer { buffer, offset });
    }

    #[inline]
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.commands.push(GfxCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::state::ResourceState;
    use slotmap::SlotMap;

    #[test]
    fn test_referenced_resources_are_unique() {
        let mut buffers = SlotMap::<GfxBufferHandle, ()>::with_key();
        let mut images = SlotMap::<GfxImageHandle, ()>::with_key();
        let buffer = buffers.insert(());
        let image = images.insert(());

        let region = GfxBufferImageCopy {
            buffer_offset: 0,
            mip_level: 0,
            array_layer: 0,
            width: 4,
            height: 4,
        };
        let mut list = GfxCommandList::new("upload");
        list.image_barrier(GfxImageBarrier::new(image).state_transfer(ResourceState::Undefined, ResourceState::CopyDest));
        list.copy_buffer_to_image(buffer, image, region);
        list.copy_buffer_to_image(buffer, image, GfxBufferImageCopy { mip_level: 1, ..region });

        assert_eq!(list.len(), 3);
        assert_eq!(list.referenced_buffers(), vec![buffer]);
        assert_eq!(list.referenced_images(), vec![image]);
        assert_eq!(list.draw_count(), 0);

        list.reset("frame");
        assert!(list.is_empty());
        assert_eq!(list.name(), "frame");
    }
}
