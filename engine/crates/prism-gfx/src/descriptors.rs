use crate::basic::format::GfxFormat;
use crate::resources::handles::{GfxBufferHandle, GfxImageHandle};

/// 描述符堆的种类
///
/// 每一种都是一个固定容量的数组，容量在启动时确定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorHeapKind {
    /// CBV/SRV/UAV 共用，shader 可见，绘制时绑定
    CbvSrvUav,
    /// CBV/SRV/UAV 共用，shader 不可见，用于 CPU 侧访问（例如清除 UAV）
    CbvSrvUavShaderInvisible,
    Sampler,
    RenderTarget,
    DepthStencil,
}

impl DescriptorHeapKind {
    pub const ALL: [DescriptorHeapKind; 5] = [
        DescriptorHeapKind::CbvSrvUav,
        DescriptorHeapKind::CbvSrvUavShaderInvisible,
        DescriptorHeapKind::Sampler,
        DescriptorHeapKind::RenderTarget,
        DescriptorHeapKind::DepthStencil,
    ];

    /// 是否可以作为 descriptor table 绑定给 shader
    #[inline]
    pub fn is_shader_visible(self) -> bool {
        matches!(self, DescriptorHeapKind::CbvSrvUav | DescriptorHeapKind::Sampler)
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// 描述符堆中的一个槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorSlot(pub u32);

impl DescriptorSlot {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// 连续区段中的第 `n` 个槽位
    #[inline]
    pub fn offset(self, n: u32) -> Self {
        Self(self.0 + n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GfxViewDimension {
    Texture2D,
    TextureCube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GfxFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GfxAddressMode {
    #[default]
    Wrap,
    Clamp,
    Mirror,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GfxSamplerDesc {
    pub filter: GfxFilter,
    pub address_mode: GfxAddressMode,
}

/// 写入描述符槽位的 view
#[derive(Debug, Clone, PartialEq)]
pub enum GfxViewDesc {
    ShaderResource {
        image: GfxImageHandle,
        format: GfxFormat,
        dimension: GfxViewDimension,
        mip_levels: u32,
    },
    UnorderedAccess {
        image: GfxImageHandle,
        format: GfxFormat,
    },
    ConstantBuffer {
        buffer: GfxBufferHandle,
        offset: u64,
        size: u64,
    },
    Sampler(GfxSamplerDesc),
    RenderTarget {
        image: GfxImageHandle,
        format: GfxFormat,
    },
    DepthStencil {
        image: GfxImageHandle,
        format: GfxFormat,
    },
}

impl GfxViewDesc {
    /// view 是否可以放进指定的堆
    pub fn fits_heap(&self, heap: DescriptorHeapKind) -> bool {
        match self {
            GfxViewDesc::ShaderResource { .. }
            | GfxViewDesc::UnorderedAccess { .. }
            | GfxViewDesc::ConstantBuffer { .. } => {
                matches!(heap, DescriptorHeapKind::CbvSrvUav | DescriptorHeapKind::CbvSrvUavShaderInvisible)
            }
            GfxViewDesc::Sampler(_) => heap == DescriptorHeapKind::Sampler,
            GfxViewDesc::RenderTarget { .. } => heap == DescriptorHeapKind::RenderTarget,
            GfxViewDesc::DepthStencil { .. } => heap == DescriptorHeapKind::DepthStencil,
        }
    }

    /// view 引用的 image
    pub fn image(&self) -> Option<GfxImageHandle> {
        match self {
            GfxViewDesc::ShaderResource { image, .. }
            | GfxViewDesc::UnorderedAccess { image, .. }
            | GfxViewDesc::RenderTarget { image, .. }
            | GfxViewDesc::DepthStencil { image, .. } => Some(*image),
            _ => None,
        }
    }
}
