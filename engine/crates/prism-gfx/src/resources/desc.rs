use bitflags::bitflags;

use crate::basic::format::GfxFormat;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GfxImageUsage: u32 {
        const SAMPLED = 1;
        const STORAGE = 1 << 1;
        const TRANSFER_SRC = 1 << 2;
        const TRANSFER_DST = 1 << 3;
        const COLOR_ATTACHMENT = 1 << 4;
        const DEPTH_ATTACHMENT = 1 << 5;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GfxBufferUsage: u32 {
        const VERTEX = 1;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const TRANSFER_SRC = 1 << 3;
        const TRANSFER_DST = 1 << 4;
    }
}

/// buffer 放在哪一类内存中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GfxMemoryLocation {
    /// 只有 GPU 可访问（default heap）
    GpuOnly,
    /// CPU 可写，GPU 可读（upload heap），可以通过 `write_buffer` 写入
    CpuToGpu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfxImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: GfxFormat,
    pub mip_levels: u32,
    /// 2D 纹理为 1，cubemap 为 6
    pub array_layers: u32,
    pub cube: bool,
    pub usage: GfxImageUsage,
}

// new & init
impl GfxImageDesc {
    pub fn texture_2d(width: u32, height: u32, format: GfxFormat, mip_levels: u32) -> Self {
        Self {
            width,
            height,
            format,
            mip_levels,
            array_layers: 1,
            cube: false,
            usage: GfxImageUsage::SAMPLED | GfxImageUsage::TRANSFER_DST,
        }
    }

    pub fn cubemap(width: u32, height: u32, format: GfxFormat, mip_levels: u32) -> Self {
        Self {
            array_layers: 6,
            cube: true,
            ..Self::texture_2d(width, height, format, mip_levels)
        }
    }

    pub fn storage_2d(width: u32, height: u32, format: GfxFormat) -> Self {
        Self {
            usage: GfxImageUsage::STORAGE | GfxImageUsage::SAMPLED | GfxImageUsage::TRANSFER_DST,
            ..Self::texture_2d(width, height, format, 1)
        }
    }

    pub fn depth_2d(width: u32, height: u32, format: GfxFormat) -> Self {
        Self {
            usage: GfxImageUsage::DEPTH_ATTACHMENT,
            ..Self::texture_2d(width, height, format, 1)
        }
    }
}
// tools
impl GfxImageDesc {
    /// 第 `level` 级 mip 的尺寸，最小为 1
    #[inline]
    pub fn mip_extent(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }

    /// 一个 subresource 紧密排列时的字节数
    #[inline]
    pub fn subresource_size(&self, level: u32) -> u64 {
        let (w, h) = self.mip_extent(level);
        w as u64 * h as u64 * self.format.bytes_per_pixel() as u64
    }

    #[inline]
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.array_layers
    }

    /// subresource 的线性编号：先按 layer，再按 mip
    #[inline]
    pub fn subresource_index(&self, mip: u32, layer: u32) -> usize {
        (layer * self.mip_levels + mip) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfxBufferDesc {
    pub size: u64,
    pub usage: GfxBufferUsage,
    pub location: GfxMemoryLocation,
}

impl GfxBufferDesc {
    /// 上传用的 staging buffer
    pub fn staging(size: u64) -> Self {
        Self {
            size,
            usage: GfxBufferUsage::TRANSFER_SRC,
            location: GfxMemoryLocation::CpuToGpu,
        }
    }

    pub fn vertex(size: u64) -> Self {
        Self {
            size,
            usage: GfxBufferUsage::VERTEX | GfxBufferUsage::TRANSFER_DST,
            location: GfxMemoryLocation::GpuOnly,
        }
    }

    /// 常量 buffer 常驻在 CPU 可写的内存中
    pub fn uniform(size: u64) -> Self {
        Self {
            size,
            usage: GfxBufferUsage::UNIFORM,
            location: GfxMemoryLocation::CpuToGpu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_extent() {
        let desc = GfxImageDesc::texture_2d(256, 64, GfxFormat::Rgba8Srgb, 9);
        assert_eq!(desc.mip_extent(0), (256, 64));
        assert_eq!(desc.mip_extent(3), (32, 8));
        assert_eq!(desc.mip_extent(7), (2, 1));
        assert_eq!(desc.mip_extent(8), (1, 1));
        assert_eq!(desc.subresource_size(1), 128 * 32 * 4);
    }

    #[test]
    fn test_cubemap_subresources() {
        let desc = GfxImageDesc::cubemap(64, 64, GfxFormat::Rgba8Unorm, 5);
        assert_eq!(desc.subresource_count(), 30);
        assert_eq!(desc.subresource_index(0, 1), 5);
        assert_eq!(desc.subresource_index(4, 5), 29);
    }
}
