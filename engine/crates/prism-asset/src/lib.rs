//! 资源文件的 CPU 侧处理
//!
//! 这里只产生 CPU 内存中的像素数据，不接触 GPU。
//! 所有错误都是可恢复的 [`AssetError`]，调用方决定是否替换为 fallback。

pub mod checkerboard;
pub mod cubemap;
pub mod error;
pub mod image_data;
pub mod mips;

pub use error::AssetError;
pub use image_data::ImageData;
