use thiserror::Error;

use crate::descriptors::DescriptorHeapKind;

/// 图形层的错误
///
/// 这里的错误都属于"致命"类别：配置错误、设备失败、调用方用法错误。
/// 资源文件缺失、解码失败之类可恢复的错误不在这里，见 `prism_asset::AssetError`。
#[derive(Error, Debug)]
pub enum GfxError {
    #[error("descriptor heap {heap:?} exhausted: requested {requested}, used {used}, capacity {capacity}")]
    DescriptorHeapExhausted {
        heap: DescriptorHeapKind,
        requested: u32,
        used: u32,
        capacity: u32,
    },

    #[error("device initialization failed: {0}")]
    DeviceInit(String),

    #[error("failed to create {kind} '{name}': {reason}")]
    ResourceCreation {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("command submission failed: {0}")]
    Submission(String),

    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("resource '{0}' is still referenced by in-flight GPU work")]
    ResourceInFlight(String),

    #[error("command list '{list}' rejected at command #{index}: {reason}")]
    InvalidCommand {
        list: String,
        index: usize,
        reason: String,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[cfg(feature = "vulkan")]
    #[error("vulkan call failed: {0}")]
    Vulkan(#[from] ash::vk::Result),
}

pub type GfxResult<T> = Result<T, GfxError>;
