use prism_asset::AssetError;
use prism_gfx::GfxError;
use thiserror::Error;

/// 资源加载的结果
///
/// 区分两类错误：`Asset` 可以在调用处替换为 fallback 继续运行，`Fatal` 必须向上传播。
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Fatal(#[from] GfxError),
}

impl LoadError {
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::Fatal(_))
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
