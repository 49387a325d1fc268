use std::path::Path;

use crate::error::AssetError;

/// 紧密排列的 RGBA8 像素数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

// new & init
impl ImageData {
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AssetError> {
        if width == 0 || height == 0 {
            return Err(AssetError::InvalidImage(format!("zero sized image {width}x{height}")));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(AssetError::InvalidImage(format!(
                "{width}x{height} image needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// 所有像素都是同一个颜色
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba.iter().copied().cycle().take(width as usize * height as usize * 4).collect();
        Self { width, height, pixels }
    }

    /// 解码图片文件，统一转换成 RGBA8
    pub fn decode_file(path: &Path) -> Result<Self, AssetError> {
        let _span = tracy_client::span!("ImageData::decode_file");

        if !path.exists() {
            return Err(AssetError::NotFound(path.to_path_buf()));
        }
        let img = image::open(path).map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::debug!("decoded {} ({width}x{height})", path.display());
        Self::from_rgba8(width, height, rgba.into_raw())
    }
}
// getters
impl ImageData {
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2], self.pixels[idx + 3]]
    }

    #[inline]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba8_checks_size() {
        assert!(ImageData::from_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(ImageData::from_rgba8(0, 2, vec![]).is_err());
        let img = ImageData::from_rgba8(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(img.pixel(1, 0), [5, 6, 7, 8]);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = ImageData::decode_file(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }

    #[test]
    fn test_decode_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30])).save(&path).unwrap();

        let img = ImageData::decode_file(&path).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.pixel(2, 1), [10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(ImageData::decode_file(&path), Err(AssetError::Decode { .. })));
    }
}
