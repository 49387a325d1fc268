use crate::image_data::ImageData;

pub const MAGENTA: [u8; 4] = [255, 0, 255, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];

/// 加载失败时使用的棋盘格纹理
///
/// 品红/绿色交替，每个格子边长为 `width >> 3`，左上角为品红。
pub fn checkerboard(width: u32, height: u32) -> ImageData {
    if width == 0 || height == 0 {
        return ImageData::solid(1, 1, MAGENTA);
    }
    let cell = (width >> 3).max(1);
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let magenta = ((x / cell) + (y / cell)) % 2 == 0;
            pixels.extend_from_slice(if magenta { &MAGENTA } else { &GREEN });
        }
    }
    ImageData::from_rgba8(width, height, pixels).unwrap_or_else(|_| ImageData::solid(1, 1, MAGENTA))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_cells() {
        let img = checkerboard(256, 256);
        assert_eq!(img.dimensions(), (256, 256));
        assert_eq!(img.pixel(0, 0), MAGENTA);
        assert_eq!(img.pixel(31, 31), MAGENTA);
        assert_eq!(img.pixel(32, 0), GREEN);
        assert_eq!(img.pixel(0, 32), GREEN);
        assert_eq!(img.pixel(32, 32), MAGENTA);
        assert_eq!(img.pixel(255, 0), GREEN);
    }
}
