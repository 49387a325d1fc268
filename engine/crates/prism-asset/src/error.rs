use std::path::PathBuf;

use thiserror::Error;

/// 可恢复的资源错误
///
/// 加载失败时调用方可以换成 fallback 资源继续运行。
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cubemap '{pattern}' mip {mip} face {face}: expected {expected_width}x{expected_height}, got {width}x{height}")]
    CubemapFaceMismatch {
        pattern: String,
        mip: u32,
        face: &'static str,
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("cubemap pattern '{0}' must contain a {{face}} placeholder")]
    CubemapPattern(String),

    #[error("failed to parse model {}: {reason}", .path.display())]
    ModelParse { path: PathBuf, reason: String },

    #[error("model {} has a face with {arity} vertices in mesh '{mesh}', only triangles are supported", .path.display())]
    NonTriangulatedFace { path: PathBuf, mesh: String, arity: u32 },

    #[error("invalid image data: {0}")]
    InvalidImage(String),
}
