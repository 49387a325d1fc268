//! Prism 工具集
//!
//! 提供日志初始化、资源路径管理、TOML 配置加载等通用工具。
//!
//! # PrismPath
//! 基于工作区根目录的统一路径管理，避免硬编码相对路径。
//!
//! # 配置
//! 所有配置文件都是 TOML，字段缺省时使用 serde default。

pub mod config;
pub mod init_log;
pub mod resource;
