//! 渲染接口层
//!
//! 资源的唯一所有者是 [`resource_registry::ResourceRegistry`]，其他组件只持有 [`handles::ResourceId`]。
//! 命令流的开启、提交与等待由 [`frame_pacer::FramePacer`] 管理；staging buffer 只有在
//! 对应的 fence 完成后才会被 [`staging::StagingTracker`] 释放。
//!
//! [`render_context::RenderContext`] 把这些组件和后端组合在一起，销毁顺序由字段顺序决定。
//!
//! 所有组件都只能在同一个线程上使用。

pub mod binding_table;
pub mod config;
pub mod constant_buffer;
pub mod descriptor_heap;
pub mod error;
pub mod frame_counter;
pub mod frame_pacer;
pub mod handles;
pub mod render_context;
pub mod resource_registry;
pub mod staging;
