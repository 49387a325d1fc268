use std::path::PathBuf;

use rayon::prelude::*;

use crate::error::AssetError;
use crate::image_data::ImageData;

/// cubemap 的六个面，顺序即 array layer 的顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    Right,
    Left,
    Up,
    Down,
    Front,
    Back,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::Right,
        CubeFace::Left,
        CubeFace::Up,
        CubeFace::Down,
        CubeFace::Front,
        CubeFace::Back,
    ];

    /// 文件名中代表该面的后缀
    #[inline]
    pub fn suffix(self) -> &'static str {
        match self {
            CubeFace::Right => "Right",
            CubeFace::Left => "Left",
            CubeFace::Up => "Up",
            CubeFace::Down => "Down",
            CubeFace::Front => "Front",
            CubeFace::Back => "Back",
        }
    }
}

/// 解码完成的 cubemap 像素
///
/// 排列顺序为先面后 mip：`faces[face * mip_count + mip]`。
#[derive(Debug)]
pub struct CubemapImages {
    faces: Vec<ImageData>,
    mip_count: u32,
}

impl CubemapImages {
    #[inline]
    pub fn mip_count(&self) -> u32 {
        self.mip_count
    }

    /// 第 0 级 mip 的尺寸
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.faces[0].dimensions()
    }

    #[inline]
    pub fn face(&self, face: usize, mip: u32) -> &ImageData {
        &self.faces[face * self.mip_count as usize + mip as usize]
    }

    /// 全部 image，顺序与 `face` 的下标一致
    #[inline]
    pub fn images(&self) -> &[ImageData] {
        &self.faces
    }

    /// 按 subresource 顺序遍历：(face, mip, image)
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &ImageData)> {
        let mips = self.mip_count;
        self.faces.iter().enumerate().map(move |(i, img)| (i as u32 / mips, i as u32 % mips, img))
    }
}

/// 把路径模板展开成某一个面的文件路径
///
/// 模板中的 `{face}` 替换为面的后缀，`{mip}` 替换为 mip 级别。
pub fn face_path(pattern: &str, face: CubeFace, mip: u32) -> PathBuf {
    PathBuf::from(pattern.replace("{face}", face.suffix()).replace("{mip}", &mip.to_string()))
}

/// 读取 cubemap 的 `6 * mip_count` 张图片
///
/// 解码在 rayon 线程池中并行进行。任何一张失败、某个面的尺寸与它所在 mip 级不符，
/// 整个加载失败，已经解码的数据全部释放。
pub fn decode_cubemap(pattern: &str, mip_count: u32) -> Result<CubemapImages, AssetError> {
    let _span = tracy_client::span!("decode_cubemap");

    let mip_count = mip_count.max(1);
    if !pattern.contains("{face}") || (mip_count > 1 && !pattern.contains("{mip}")) {
        return Err(AssetError::CubemapPattern(pattern.to_string()));
    }

    let jobs: Vec<(CubeFace, u32)> =
        CubeFace::ALL.iter().flat_map(|face| (0..mip_count).map(move |mip| (*face, mip))).collect();
    let faces = jobs
        .par_iter()
        .map(|(face, mip)| ImageData::decode_file(&face_path(pattern, *face, *mip)))
        .collect::<Result<Vec<_>, _>>()?;

    let (base_width, base_height) = faces[0].dimensions();
    if base_width != base_height {
        return Err(AssetError::InvalidImage(format!(
            "cubemap '{pattern}' faces must be square, got {base_width}x{base_height}"
        )));
    }
    for mip in 0..mip_count {
        // 第 mip 级的每个面都必须是基础尺寸右移 mip 位
        let expected_width = (base_width >> mip).max(1);
        let expected_height = (base_height >> mip).max(1);
        for (face_idx, face) in CubeFace::ALL.iter().enumerate() {
            let (width, height) = faces[face_idx * mip_count as usize + mip as usize].dimensions();
            if (width, height) != (expected_width, expected_height) {
                return Err(AssetError::CubemapFaceMismatch {
                    pattern: pattern.to_string(),
                    mip,
                    face: face.suffix(),
                    expected_width,
                    expected_height,
                    width,
                    height,
                });
            }
        }
    }

    log::info!("decoded cubemap '{pattern}' ({} images)", faces.len());
    Ok(CubemapImages { faces, mip_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_path() {
        let path = face_path("sky/ash{mip}Specular{face}.png", CubeFace::Down, 3);
        assert_eq!(path, PathBuf::from("sky/ash3SpecularDown.png"));
    }

    #[test]
    fn test_pattern_needs_placeholders() {
        assert!(matches!(decode_cubemap("sky.png", 1), Err(AssetError::CubemapPattern(_))));
        assert!(matches!(decode_cubemap("sky{face}.png", 2), Err(AssetError::CubemapPattern(_))));
    }
}
