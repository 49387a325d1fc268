use std::collections::HashMap;

use crate::basic::state::ResourceState;
use crate::commands::command_list::{GfxAttachment, GfxCommand, GfxCommandList};
use crate::descriptors::{DescriptorHeapKind, GfxViewDesc};
use crate::error::{GfxError, GfxResult};
use crate::pipeline::MAX_DESCRIPTOR_TABLES;
use crate::resources::desc::GfxBufferUsage;
use crate::resources::handles::{GfxBufferHandle, GfxImageHandle, GfxPipelineHandle};

use super::HeadlessBackend;

/// 校验过程中的临时状态，不修改后端
#[derive(Default)]
struct ValidationState {
    image_states: HashMap<GfxImageHandle, ResourceState>,
    rendering: bool,
    pipeline: Option<GfxPipelineHandle>,
    vertex_buffer: Option<(GfxBufferHandle, u64)>,
}

impl HeadlessBackend {
    /// 按顺序模拟整个命令流，任何一条命令不合法都会拒绝整个提交
    pub(super) fn validate(&self, commands: &GfxCommandList) -> GfxResult<()> {
        let mut state = ValidationState::default();
        let reject = |index: usize, reason: String| GfxError::InvalidCommand {
            list: commands.name().to_string(),
            index,
            reason,
        };

        for (index, command) in commands.commands().iter().enumerate() {
            match command {
                GfxCommand::ImageBarrier(barrier) => {
                    let current = self.current_state(&state, barrier.image).ok_or_else(|| {
                        reject(index, format!("barrier on unknown image {:?}", barrier.image))
                    })?;
                    if current != barrier.before {
                        return Err(reject(
                            index,
                            format!(
                                "barrier on '{}' expects {:?} but image is in {:?}",
                                self.images[barrier.image].name, barrier.before, current
                            ),
                        ));
                    }
                    if barrier.before == barrier.after {
                        return Err(reject(index, format!("no-op barrier {:?} -> {:?}", barrier.before, barrier.after)));
                    }
                    state.image_states.insert(barrier.image, barrier.after);
                }
                GfxCommand::CopyBufferToImage { src, dst, region } => {
                    let buffer = self.buffers.get(*src).ok_or_else(|| reject(index, "copy from unknown buffer".to_string()))?;
                    let image = self.images.get(*dst).ok_or_else(|| reject(index, "copy to unknown image".to_string()))?;
                    let current = self.current_state(&state, *dst).unwrap_or(ResourceState::Undefined);
                    if current != ResourceState::CopyDest {
                        return Err(reject(index, format!("copy into '{}' while in {current:?}", image.name)));
                    }
                    if region.mip_level >= image.desc.mip_levels || region.array_layer >= image.desc.array_layers {
                        return Err(reject(index, format!("subresource out of range for '{}'", image.name)));
                    }
                    if image.desc.mip_extent(region.mip_level) != (region.width, region.height) {
                        return Err(reject(index, format!("copy extent mismatch for '{}'", image.name)));
                    }
                    let size = image.desc.subresource_size(region.mip_level);
                    if region.buffer_offset + size > buffer.desc.size {
                        return Err(reject(index, format!("copy reads past the end of '{}'", buffer.name)));
                    }
                }
                GfxCommand::CopyBuffer {
                    src,
                    dst,
                    src_offset,
                    dst_offset,
                    size,
                } => {
                    let src = self.buffers.get(*src).ok_or_else(|| reject(index, "copy from unknown buffer".to_string()))?;
                    let dst = self.buffers.get(*dst).ok_or_else(|| reject(index, "copy to unknown buffer".to_string()))?;
                    if !dst.desc.usage.contains(GfxBufferUsage::TRANSFER_DST) {
                        return Err(reject(index, format!("buffer '{}' is not a transfer destination", dst.name)));
                    }
                    if src_offset + size > src.desc.size || dst_offset + size > dst.desc.size {
                        return Err(reject(index, format!("copy '{}' -> '{}' out of range", src.name, dst.name)));
                    }
                }
                GfxCommand::ClearUnorderedAccess { image, heap, view, .. } => {
                    let current = self
                        .current_state(&state, *image)
                        .ok_or_else(|| reject(index, "clear of unknown image".to_string()))?;
                    if current != ResourceState::UnorderedAccess {
                        return Err(reject(index, format!("uav clear while image is in {current:?}")));
                    }
                    match self.descriptor(*heap, *view) {
                        Some(GfxViewDesc::UnorderedAccess { image: viewed, .. }) if viewed == image => {}
                        other => {
                            return Err(reject(index, format!("slot {view:?} in {heap:?} holds {other:?}, not a UAV of the image")));
                        }
                    }
                }
                GfxCommand::BeginRendering(info) => {
                    if state.rendering {
                        return Err(reject(index, "nested rendering".to_string()));
                    }
                    self.check_attachment(&state, &info.color, DescriptorHeapKind::RenderTarget, ResourceState::RenderTarget)
                        .map_err(|reason| reject(index, reason))?;
                    if let Some(depth) = &info.depth {
                        self.check_attachment(&state, depth, DescriptorHeapKind::DepthStencil, ResourceState::DepthWrite)
                            .map_err(|reason| reject(index, reason))?;
                    }
                    state.rendering = true;
                }
                GfxCommand::EndRendering => {
                    if !state.rendering {
                        return Err(reject(index, "end rendering without begin".to_string()));
                    }
                    state.rendering = false;
                }
                GfxCommand::BindPipeline(pipeline) => {
                    if !self.pipelines.contains_key(*pipeline) {
                        return Err(reject(index, "unknown pipeline".to_string()));
                    }
                    state.pipeline = Some(*pipeline);
                }
                GfxCommand::BindDescriptorTable { root_index, heap, base } => {
                    if *root_index >= MAX_DESCRIPTOR_TABLES {
                        return Err(reject(index, format!("root index {root_index} out of range")));
                    }
                    if !heap.is_shader_visible() {
                        return Err(reject(index, format!("{heap:?} can not be bound to shaders")));
                    }
                    let capacity = self.heaps.get(heap).map(|h| h.len()).unwrap_or(0);
                    if base.index() as usize >= capacity {
                        return Err(reject(index, format!("table base {} outside heap {heap:?}", base.index())));
                    }
                }
                GfxCommand::BindVertexBuffer { buffer, offset } => {
                    let desc = &self.buffers.get(*buffer).ok_or_else(|| reject(index, "unknown vertex buffer".to_string()))?.desc;
                    if !desc.usage.contains(GfxBufferUsage::VERTEX) {
                        return Err(reject(index, "buffer is not a vertex buffer".to_string()));
                    }
                    state.vertex_buffer = Some((*buffer, *offset));
                }
                GfxCommand::Draw { vertex_count, .. } => {
                    if !state.rendering {
                        return Err(reject(index, "draw outside of rendering".to_string()));
                    }
                    if state.pipeline.is_none() {
                        return Err(reject(index, "draw without pipeline".to_string()));
                    }
                    if *vertex_count > 0 && state.vertex_buffer.is_none() {
                        return Err(reject(index, "draw without vertex buffer".to_string()));
                    }
                }
            }
        }

        if state.rendering {
            return Err(reject(commands.len(), "command list ends inside rendering".to_string()));
        }
        Ok(())
    }

    fn current_state(&self, state: &ValidationState, image: GfxImageHandle) -> Option<ResourceState> {
        state.image_states.get(&image).copied().or_else(|| self.images.get(image).map(|i| i.state))
    }

    fn check_attachment(
        &self,
        state: &ValidationState,
        attachment: &GfxAttachment,
        heap: DescriptorHeapKind,
        expected: ResourceState,
    ) -> Result<(), String> {
        let current = self
            .current_state(state, attachment.image)
            .ok_or_else(|| format!("unknown attachment {:?}", attachment.image))?;
        if current != expected {
            return Err(format!(
                "attachment '{}' is in {current:?}, expected {expected:?}",
                self.images[attachment.image].name
            ));
        }
        let matches = match self.descriptor(heap, attachment.view) {
            Some(GfxViewDesc::RenderTarget { image, .. }) | Some(GfxViewDesc::DepthStencil { image, .. }) => {
                *image == attachment.image
            }
            _ => false,
        };
        if !matches {
            return Err(format!("slot {:?} in {heap:?} does not describe the attachment", attachment.view));
        }
        Ok(())
    }

    /// 在已经校验通过的命令流上执行副作用
    pub(super) fn execute(&mut self, commands: &GfxCommandList) {
        for command in commands.commands() {
            match command {
                GfxCommand::ImageBarrier(barrier) => {
                    if let Some(image) = self.images.get_mut(barrier.image) {
                        image.state = barrier.after;
                    }
                }
                GfxCommand::CopyBufferToImage { src, dst, region } => {
                    let (Some(buffer), Some(image)) = (self.buffers.get(*src), self.images.get_mut(*dst)) else {
                        continue;
                    };
                    let size = image.desc.subresource_size(region.mip_level) as usize;
                    let start = region.buffer_offset as usize;
                    let index = image.desc.subresource_index(region.mip_level, region.array_layer);
                    image.subresources[index].copy_from_slice(&buffer.data[start..start + size]);
                    self.stats.copies += 1;
                }
                GfxCommand::CopyBuffer {
                    src,
                    dst,
                    src_offset,
                    dst_offset,
                    size,
                } => {
                    let Some(data) = self.buffers.get(*src).map(|b| {
                        b.data[*src_offset as usize..(*src_offset + *size) as usize].to_vec()
                    }) else {
                        continue;
                    };
                    if let Some(dst) = self.buffers.get_mut(*dst) {
                        dst.data[*dst_offset as usize..(*dst_offset + *size) as usize].copy_from_slice(&data);
                        self.stats.copies += 1;
                    }
                }
                GfxCommand::ClearUnorderedAccess { image, color, .. } => {
                    if let Some(image) = self.images.get_mut(*image) {
                        let pixel = image.desc.format.encode_color(*color);
                        for data in image.subresources.iter_mut() {
                            fill_pixels(data, &pixel);
                        }
                        self.stats.clears += 1;
                    }
                }
                GfxCommand::BeginRendering(info) => {
                    if let (Some(color), Some(image)) = (info.clear_color, self.images.get_mut(info.color.image)) {
                        let pixel = image.desc.format.encode_color(color);
                        fill_pixels(&mut image.subresources[0], &pixel);
                        self.stats.clears += 1;
                    }
                    if let (Some(depth), Some(attachment)) = (info.clear_depth, info.depth.as_ref()) {
                        if let Some(image) = self.images.get_mut(attachment.image) {
                            let pixel = image.desc.format.encode_color([depth; 4]);
                            fill_pixels(&mut image.subresources[0], &pixel);
                            self.stats.clears += 1;
                        }
                    }
                }
                GfxCommand::Draw { .. } => {
                    self.stats.draws += 1;
                }
                GfxCommand::EndRendering
                | GfxCommand::BindPipeline(_)
                | GfxCommand::BindDescriptorTable { .. }
                | GfxCommand::BindVertexBuffer { .. } => {}
            }
        }
    }
}

fn fill_pixels(data: &mut [u8], pixel: &[u8]) {
    for chunk in data.chunks_exact_mut(pixel.len()) {
        chunk.copy_from_slice(pixel);
    }
}
