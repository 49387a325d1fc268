//! mip 链生成
//!
//! 每一级都是上一级的 2x2 box 下采样。sRGB 纹理必须先解码到线性空间再求平均，
//! 最后重新编码为 sRGB；直接平均编码后的字节会让 mip 偏暗。alpha 通道始终是线性的。

use std::sync::OnceLock;

use crate::image_data::ImageData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// 颜色通道是 sRGB 编码的（albedo、天空盒等）
    Srgb,
    /// 数据本身是线性的（法线、粗糙度等）
    Linear,
}

/// 完整 mip 链的级数，直到 1x1
#[inline]
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

#[inline]
pub fn srgb_to_linear(value: u8) -> f32 {
    static TABLE: OnceLock<[f32; 256]> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let mut table = [0.0; 256];
        for (i, v) in table.iter_mut().enumerate() {
            let s = i as f32 / 255.0;
            *v = if s <= 0.04045 { s / 12.92 } else { ((s + 0.055) / 1.055).powf(2.4) };
        }
        table
    });
    table[value as usize]
}

#[inline]
pub fn linear_to_srgb(value: f32) -> u8 {
    let v = value.clamp(0.0, 1.0);
    let s = if v <= 0.0031308 { v * 12.92 } else { 1.055 * v.powf(1.0 / 2.4) - 0.055 };
    (s * 255.0).round() as u8
}

/// 生成完整的 mip 链，第 0 级就是 `base` 本身
pub fn generate_mip_chain(base: &ImageData, color_space: ColorSpace) -> Vec<ImageData> {
    let _span = tracy_client::span!("generate_mip_chain");

    let count = mip_level_count(base.width(), base.height());
    let mut chain = Vec::with_capacity(count as usize);
    chain.push(base.clone());
    for _ in 1..count {
        let next = downsample(chain.last().unwrap_or(base), color_space);
        chain.push(next);
    }
    chain
}

/// 2x2 box 下采样，奇数尺寸时边缘像素重复采样
pub fn downsample(src: &ImageData, color_space: ColorSpace) -> ImageData {
    let (src_w, src_h) = src.dimensions();
    let dst_w = (src_w / 2).max(1);
    let dst_h = (src_h / 2).max(1);

    let mut pixels = Vec::with_capacity(dst_w as usize * dst_h as usize * 4);
    for y in 0..dst_h {
        let y0 = (y * 2).min(src_h - 1);
        let y1 = (y * 2 + 1).min(src_h - 1);
        for x in 0..dst_w {
            let x0 = (x * 2).min(src_w - 1);
            let x1 = (x * 2 + 1).min(src_w - 1);
            let samples = [src.pixel(x0, y0), src.pixel(x1, y0), src.pixel(x0, y1), src.pixel(x1, y1)];

            for channel in 0..4 {
                let srgb_channel = color_space == ColorSpace::Srgb && channel < 3;
                let sum: f32 = samples
                    .iter()
                    .map(|p| if srgb_channel { srgb_to_linear(p[channel]) } else { p[channel] as f32 / 255.0 })
                    .sum();
                let avg = sum / 4.0;
                pixels.push(if srgb_channel { linear_to_srgb(avg) } else { (avg * 255.0).round() as u8 });
            }
        }
    }

    ImageData::from_rgba8(dst_w, dst_h, pixels).unwrap_or_else(|_| ImageData::solid(dst_w, dst_h, [0, 0, 0, 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(256, 16), 9);
        assert_eq!(mip_level_count(300, 5), 9);
    }

    #[test]
    fn test_srgb_round_trip_is_exact() {
        for v in 0..=255u8 {
            assert_eq!(linear_to_srgb(srgb_to_linear(v)), v);
        }
    }

    #[test]
    fn test_uniform_color_survives_every_level() {
        for (w, h) in [(256, 256), (37, 19), (1, 64), (5, 5)] {
            let base = ImageData::solid(w, h, [200, 17, 90, 128]);
            let chain = generate_mip_chain(&base, ColorSpace::Srgb);
            assert_eq!(chain.len() as u32, mip_level_count(w, h));
            assert_eq!(chain.last().unwrap().dimensions(), (1, 1));
            for level in &chain {
                for px in level.pixels().chunks_exact(4) {
                    for (a, b) in px.iter().zip([200u8, 17, 90, 128]) {
                        assert!((*a as i32 - b as i32).abs() <= 1, "{px:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_srgb_average_is_in_linear_light() {
        // 黑白棋盘下采样到一个像素：线性平均为 0.5，对应 sRGB 188，而不是 128
        let base = ImageData::from_rgba8(
            2,
            2,
            vec![0, 0, 0, 255, 255, 255, 255, 255, 255, 255, 255, 255, 0, 0, 0, 255],
        )
        .unwrap();
        let srgb = downsample(&base, ColorSpace::Srgb);
        assert_eq!(srgb.pixel(0, 0), [188, 188, 188, 255]);

        let linear = downsample(&base, ColorSpace::Linear);
        assert_eq!(linear.pixel(0, 0), [128, 128, 128, 255]);
    }
}
