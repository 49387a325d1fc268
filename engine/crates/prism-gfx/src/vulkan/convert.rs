//! 后端无关类型到 Vulkan 类型的映射

use ash::vk;

use crate::basic::format::GfxFormat;
use crate::basic::state::ResourceState;
use crate::descriptors::{GfxAddressMode, GfxFilter};
use crate::resources::desc::{GfxBufferUsage, GfxImageUsage};

pub(crate) fn vk_format(format: GfxFormat) -> vk::Format {
    match format {
        GfxFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        GfxFormat::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        GfxFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        GfxFormat::R32Float => vk::Format::R32_SFLOAT,
        GfxFormat::Rg32Float => vk::Format::R32G32_SFLOAT,
        GfxFormat::Rgb32Float => vk::Format::R32G32B32_SFLOAT,
        GfxFormat::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
        GfxFormat::D32Float => vk::Format::D32_SFLOAT,
    }
}

#[inline]
pub(crate) fn aspect_mask(format: GfxFormat) -> vk::ImageAspectFlags {
    if format.is_depth() { vk::ImageAspectFlags::DEPTH } else { vk::ImageAspectFlags::COLOR }
}

pub(crate) fn image_usage(usage: GfxImageUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    for (gfx, vk_flag) in [
        (GfxImageUsage::SAMPLED, vk::ImageUsageFlags::SAMPLED),
        (GfxImageUsage::STORAGE, vk::ImageUsageFlags::STORAGE),
        (GfxImageUsage::TRANSFER_SRC, vk::ImageUsageFlags::TRANSFER_SRC),
        (GfxImageUsage::TRANSFER_DST, vk::ImageUsageFlags::TRANSFER_DST),
        (GfxImageUsage::COLOR_ATTACHMENT, vk::ImageUsageFlags::COLOR_ATTACHMENT),
        (GfxImageUsage::DEPTH_ATTACHMENT, vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT),
    ] {
        if usage.contains(gfx) {
            flags |= vk_flag;
        }
    }
    flags
}

pub(crate) fn buffer_usage(usage: GfxBufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    for (gfx, vk_flag) in [
        (GfxBufferUsage::VERTEX, vk::BufferUsageFlags::VERTEX_BUFFER),
        (GfxBufferUsage::INDEX, vk::BufferUsageFlags::INDEX_BUFFER),
        (GfxBufferUsage::UNIFORM, vk::BufferUsageFlags::UNIFORM_BUFFER),
        (GfxBufferUsage::TRANSFER_SRC, vk::BufferUsageFlags::TRANSFER_SRC),
        (GfxBufferUsage::TRANSFER_DST, vk::BufferUsageFlags::TRANSFER_DST),
    ] {
        if usage.contains(gfx) {
            flags |= vk_flag;
        }
    }
    flags
}

/// 一个资源状态在 barrier 中对应的 layout、stage 和 access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StateAccess {
    pub layout: vk::ImageLayout,
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
}

pub(crate) fn state_access(state: ResourceState) -> StateAccess {
    let (layout, stage, access) = match state {
        ResourceState::Undefined => (vk::ImageLayout::UNDEFINED, vk::PipelineStageFlags2::NONE, vk::AccessFlags2::NONE),
        ResourceState::CopyDest => (
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::PipelineStageFlags2::TRANSFER,
            vk::AccessFlags2::TRANSFER_WRITE,
        ),
        ResourceState::CopySrc => (
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::PipelineStageFlags2::TRANSFER,
            vk::AccessFlags2::TRANSFER_READ,
        ),
        ResourceState::ShaderRead => (
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::PipelineStageFlags2::VERTEX_SHADER | vk::PipelineStageFlags2::FRAGMENT_SHADER,
            vk::AccessFlags2::SHADER_SAMPLED_READ,
        ),
        // clear 属于 transfer stage
        ResourceState::UnorderedAccess => (
            vk::ImageLayout::GENERAL,
            vk::PipelineStageFlags2::FRAGMENT_SHADER | vk::PipelineStageFlags2::CLEAR,
            vk::AccessFlags2::SHADER_STORAGE_READ
                | vk::AccessFlags2::SHADER_STORAGE_WRITE
                | vk::AccessFlags2::TRANSFER_WRITE,
        ),
        ResourceState::RenderTarget => (
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        ),
        ResourceState::DepthWrite => (
            vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ),
        // swap target 是离屏的 image，呈现之后等待被拷贝出去
        ResourceState::Present => (
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::PipelineStageFlags2::TRANSFER,
            vk::AccessFlags2::TRANSFER_READ,
        ),
    };
    StateAccess { layout, stage, access }
}

pub(crate) fn filter(filter: GfxFilter) -> (vk::Filter, vk::SamplerMipmapMode) {
    match filter {
        GfxFilter::Nearest => (vk::Filter::NEAREST, vk::SamplerMipmapMode::NEAREST),
        GfxFilter::Linear => (vk::Filter::LINEAR, vk::SamplerMipmapMode::LINEAR),
    }
}

pub(crate) fn address_mode(mode: GfxAddressMode) -> vk::SamplerAddressMode {
    match mode {
        GfxAddressMode::Wrap => vk::SamplerAddressMode::REPEAT,
        GfxAddressMode::Clamp => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        GfxAddressMode::Mirror => vk::SamplerAddressMode::MIRRORED_REPEAT,
    }
}
