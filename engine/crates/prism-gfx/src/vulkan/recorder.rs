use ash::vk;

use crate::commands::command_list::{GfxAttachment, GfxCommand, GfxCommandList, GfxRenderingInfo};
use crate::descriptors::{DescriptorHeapKind, GfxViewDesc};
use crate::error::{GfxError, GfxResult};
use crate::pipeline::MAX_DESCRIPTOR_TABLES;
use crate::vulkan::VulkanBackend;
use crate::vulkan::convert::{self, state_access};

/// 录制过程中的状态
#[derive(Default)]
struct RecordState {
    pipeline_layout: Option<vk::PipelineLayout>,
}

impl VulkanBackend {
    /// 把命令流翻译成 Vulkan 命令，写入一个处于录制状态的 command buffer
    pub(super) fn record(&self, cb: vk::CommandBuffer, commands: &GfxCommandList) -> GfxResult<()> {
        let _span = tracy_client::span!("VulkanBackend::record");

        let device = &self.device.device;
        let reject = |index: usize, reason: String| GfxError::InvalidCommand {
            list: commands.name().to_string(),
            index,
            reason,
        };
        let mut state = RecordState::default();

        for (index, command) in commands.commands().iter().enumerate() {
            match command {
                GfxCommand::ImageBarrier(barrier) => {
                    let image = self
                        .images
                        .get(barrier.image)
                        .ok_or_else(|| reject(index, format!("barrier on unknown image {:?}", barrier.image)))?;
                    let src = state_access(barrier.before);
                    let dst = state_access(barrier.after);
                    let image_barrier = vk::ImageMemoryBarrier2::default()
                        .image(image.image)
                        .src_stage_mask(src.stage)
                        .src_access_mask(src.access)
                        .dst_stage_mask(dst.stage)
                        .dst_access_mask(dst.access)
                        .old_layout(src.layout)
                        .new_layout(dst.layout)
                        .subresource_range(
                            vk::ImageSubresourceRange::default()
                                .aspect_mask(convert::aspect_mask(image.desc.format))
                                .base_mip_level(0)
                                .level_count(image.desc.mip_levels)
                                .base_array_layer(0)
                                .layer_count(image.desc.array_layers),
                        );
                    unsafe {
                        device.cmd_pipeline_barrier2(
                            cb,
                            &vk::DependencyInfo::default().image_memory_barriers(std::slice::from_ref(&image_barrier)),
                        );
                    }
                }
                GfxCommand::CopyBufferToImage { src, dst, region } => {
                    let buffer =
                        self.buffers.get(*src).ok_or_else(|| reject(index, "copy from unknown buffer".to_string()))?;
                    let image =
                        self.images.get(*dst).ok_or_else(|| reject(index, "copy to unknown image".to_string()))?;
                    let buffer_image_copy = vk::BufferImageCopy2::default()
                        .buffer_offset(region.buffer_offset)
                        .buffer_row_length(0)
                        .buffer_image_height(0)
                        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                        .image_extent(vk::Extent3D {
                            width: region.width,
                            height: region.height,
                            depth: 1,
                        })
                        .image_subresource(vk::ImageSubresourceLayers {
                            aspect_mask: convert::aspect_mask(image.desc.format),
                            mip_level: region.mip_level,
                            base_array_layer: region.array_layer,
                            layer_count: 1,
                        });
                    unsafe {
                        device.cmd_copy_buffer_to_image2(
                            cb,
                            &vk::CopyBufferToImageInfo2::default()
                                .src_buffer(buffer.buffer)
                                .dst_image(image.image)
                                .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                                .regions(std::slice::from_ref(&buffer_image_copy)),
                        );
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
                    let region = vk::BufferCopy2::default().src_offset(*src_offset).dst_offset(*dst_offset).size(*size);
                    // 之后的顶点读取要等拷贝完成
                    let memory_barrier = vk::MemoryBarrier2::default()
                        .src_stage_mask(vk::PipelineStageFlags2::TRANSFER)
                        .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
                        .dst_stage_mask(vk::PipelineStageFlags2::VERTEX_ATTRIBUTE_INPUT)
                        .dst_access_mask(vk::AccessFlags2::VERTEX_ATTRIBUTE_READ);
                    unsafe {
                        device.cmd_copy_buffer2(
                            cb,
                            &vk::CopyBufferInfo2::default()
                                .src_buffer(src.buffer)
                                .dst_buffer(dst.buffer)
                                .regions(std::slice::from_ref(&region)),
                        );
                        device.cmd_pipeline_barrier2(
                            cb,
                            &vk::DependencyInfo::default().memory_barriers(std::slice::from_ref(&memory_barrier)),
                        );
                    }
                }
                GfxCommand::ClearUnorderedAccess { image, heap, view, color } => {
                    let slot = self
                        .heap(*heap)
                        .and_then(|h| h.slot(*view))
                        .ok_or_else(|| reject(index, format!("clear through empty slot {} of {heap:?}", view.index())))?;
                    if !matches!(slot.desc, GfxViewDesc::UnorderedAccess { image: viewed, .. } if viewed == *image) {
                        return Err(reject(index, format!("slot {} does not hold a UAV of the cleared image", view.index())));
                    }
                    let target = self.images.get(*image).ok_or_else(|| reject(index, "clear of unknown image".to_string()))?;
                    let range = vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .level_count(1)
                        .layer_count(1);
                    unsafe {
                        device.cmd_clear_color_image(
                            cb,
                            target.image,
                            vk::ImageLayout::GENERAL,
                            &vk::ClearColorValue { float32: *color },
                            std::slice::from_ref(&range),
                        );
                    }
                }
                GfxCommand::BeginRendering(info) => self.begin_rendering(cb, info).map_err(|reason| reject(index, reason))?,
                GfxCommand::EndRendering => unsafe { device.cmd_end_rendering(cb) },
                GfxCommand::BindPipeline(pipeline) => {
                    let pipeline = self
                        .pipelines
                        .get(*pipeline)
                        .ok_or_else(|| reject(index, format!("unknown pipeline {pipeline:?}")))?;
                    let sets = [DescriptorHeapKind::CbvSrvUav, DescriptorHeapKind::Sampler]
                        .into_iter()
                        .filter_map(|kind| self.heap(kind).and_then(|h| h.set()))
                        .collect::<Vec<_>>();
                    unsafe {
                        device.cmd_bind_pipeline(cb, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
                        device.cmd_bind_descriptor_sets(
                            cb,
                            vk::PipelineBindPoint::GRAPHICS,
                            pipeline.layout,
                            0,
                            &sets,
                            &[],
                        );
                    }
                    state.pipeline_layout = Some(pipeline.layout);
                }
                GfxCommand::BindDescriptorTable { root_index, heap, base } => {
                    let layout = state
                        .pipeline_layout
                        .ok_or_else(|| reject(index, "descriptor table bound before any pipeline".to_string()))?;
                    if *root_index >= MAX_DESCRIPTOR_TABLES {
                        return Err(reject(index, format!("root index {root_index} out of range")));
                    }
                    if !heap.is_shader_visible() {
                        return Err(reject(index, format!("heap {heap:?} is not shader visible")));
                    }
                    unsafe {
                        device.cmd_push_constants(
                            cb,
                            layout,
                            vk::ShaderStageFlags::ALL_GRAPHICS,
                            root_index * size_of::<u32>() as u32,
                            bytemuck::bytes_of(&base.index()),
                        );
                    }
                }
                GfxCommand::BindVertexBuffer { buffer, offset } => {
                    let buffer =
                        self.buffers.get(*buffer).ok_or_else(|| reject(index, "unknown vertex buffer".to_string()))?;
                    unsafe { device.cmd_bind_vertex_buffers(cb, 0, &[buffer.buffer], &[*offset]) };
                }
                GfxCommand::Draw {
                    vertex_count,
                    instance_count,
                    first_vertex,
                    first_instance,
                } => unsafe {
                    device.cmd_draw(cb, *vertex_count, *instance_count, *first_vertex, *first_instance);
                },
            }
        }
        Ok(())
    }

    fn begin_rendering(&self, cb: vk::CommandBuffer, info: &GfxRenderingInfo) -> Result<(), String> {
        let device = &self.device.device;

        let attachment_view = |heap: DescriptorHeapKind, attachment: &GfxAttachment| {
            self.heap(heap)
                .and_then(|h| h.slot(attachment.view))
                .filter(|slot| slot.desc.image() == Some(attachment.image))
                .map(|slot| slot.image_view)
                .ok_or_else(|| format!("slot {} of {heap:?} does not view the attachment", attachment.view.index()))
        };

        let color_view = attachment_view(DescriptorHeapKind::RenderTarget, &info.color)?;
        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(color_view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(if info.clear_color.is_some() { vk::AttachmentLoadOp::CLEAR } else { vk::AttachmentLoadOp::LOAD })
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: info.clear_color.unwrap_or_default(),
                },
            });

        let depth_attachment = match &info.depth {
            Some(depth) => Some(
                vk::RenderingAttachmentInfo::default()
                    .image_view(attachment_view(DescriptorHeapKind::DepthStencil, depth)?)
                    .image_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
                    .load_op(if info.clear_depth.is_some() { vk::AttachmentLoadOp::CLEAR } else { vk::AttachmentLoadOp::LOAD })
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .clear_value(vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue {
                            depth: info.clear_depth.unwrap_or(1.0),
                            stencil: 0,
                        },
                    }),
            ),
            None => None,
        };

        let (width, height) = info.extent;
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D { width, height },
        };
        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment));
        if let Some(depth_attachment) = &depth_attachment {
            rendering_info = rendering_info.depth_attachment(depth_attachment);
        }

        // 负高度的 viewport，NDC 的 y 轴朝上
        let viewport = vk::Viewport {
            x: 0.0,
            y: height as f32,
            width: width as f32,
            height: -(height as f32),
            min_depth: 0.0,
            max_depth: 1.0,
        };
        unsafe {
            device.cmd_begin_rendering(cb, &rendering_info);
            device.cmd_set_viewport(cb, 0, std::slice::from_ref(&viewport));
            device.cmd_set_scissor(cb, 0, std::slice::from_ref(&render_area));
        }
        Ok(())
    }
}
