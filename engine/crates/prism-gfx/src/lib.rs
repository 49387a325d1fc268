//! 图形后端抽象层
//!
//! 上层只和这里的类型打交道：格式、资源状态、句柄、描述符堆、命令列表，以及 [`GfxBackend`] trait。
//!
//! 提供两个后端：
//! - [`headless::HeadlessBackend`]：CPU 模拟，带状态校验和创建计数，用于测试和无窗口运行
//! - `vulkan::VulkanBackend`：基于 ash + vk-mem，需要打开 `vulkan` feature

pub mod backend;
pub mod basic;
pub mod commands;
pub mod descriptors;
pub mod error;
pub mod headless;
pub mod pipeline;
pub mod resources;

#[cfg(feature = "vulkan")]
pub mod vulkan;

pub use backend::GfxBackend;
pub use error::{GfxError, GfxResult};
