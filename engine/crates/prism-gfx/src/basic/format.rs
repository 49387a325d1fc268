/// 后端无关的像素/顶点格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GfxFormat {
    Rgba8Unorm,
    Rgba8Srgb,
    Bgra8Unorm,
    R32Float,
    Rg32Float,
    Rgb32Float,
    Rgba32Float,
    D32Float,
}

impl GfxFormat {
    /// 每个像素（或顶点属性）占用的字节数
    #[inline]
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            GfxFormat::Rgba8Unorm | GfxFormat::Rgba8Srgb | GfxFormat::Bgra8Unorm => 4,
            GfxFormat::R32Float | GfxFormat::D32Float => 4,
            GfxFormat::Rg32Float => 8,
            GfxFormat::Rgb32Float => 12,
            GfxFormat::Rgba32Float => 16,
        }
    }

    #[inline]
    pub fn is_srgb(self) -> bool {
        matches!(self, GfxFormat::Rgba8Srgb)
    }

    #[inline]
    pub fn is_depth(self) -> bool {
        matches!(self, GfxFormat::D32Float)
    }

    /// 把浮点颜色编码成该格式的一个像素
    ///
    /// 用于 clear 操作；sRGB 格式先做 linear -> sRGB 编码。
    pub fn encode_color(self, color: [f32; 4]) -> Vec<u8> {
        let unorm = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let srgb = |v: f32| {
            let v = v.clamp(0.0, 1.0);
            let s = if v <= 0.0031308 { v * 12.92 } else { 1.055 * v.powf(1.0 / 2.4) - 0.055 };
            unorm(s)
        };
        match self {
            GfxFormat::Rgba8Unorm => color.iter().map(|c| unorm(*c)).collect(),
            GfxFormat::Rgba8Srgb => vec![srgb(color[0]), srgb(color[1]), srgb(color[2]), unorm(color[3])],
            GfxFormat::Bgra8Unorm => vec![unorm(color[2]), unorm(color[1]), unorm(color[0]), unorm(color[3])],
            GfxFormat::R32Float | GfxFormat::D32Float => bytemuck::bytes_of(&color[0]).to_vec(),
            GfxFormat::Rg32Float => bytemuck::cast_slice(&color[..2]).to_vec(),
            GfxFormat::Rgb32Float => bytemuck::cast_slice(&color[..3]).to_vec(),
            GfxFormat::Rgba32Float => bytemuck::cast_slice(&color[..]).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_color() {
        assert_eq!(GfxFormat::Rgba8Unorm.encode_color([1.0, 0.0, 1.0, 1.0]), vec![255, 0, 255, 255]);
        assert_eq!(GfxFormat::Bgra8Unorm.encode_color([1.0, 0.0, 0.5, 1.0]), vec![128, 0, 255, 255]);
        // 0.5 linear 约等于 sRGB 188
        assert_eq!(GfxFormat::Rgba8Srgb.encode_color([0.5, 0.0, 0.0, 0.5])[0], 188);
        assert_eq!(GfxFormat::Rgba32Float.encode_color([0.0; 4]).len(), 16);
    }
}
