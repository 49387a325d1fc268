//! 场景绑定层
//!
//! 把 CPU 侧的模型、材质和天空盒变成注册表中的资源与 binding table，并按固定的
//! root index 录制绘制命令。这里不持有任何 GPU 句柄，只保存 `ResourceId` 与 `BindingTableId`。

pub mod builtin;
pub mod constants;
pub mod draw;
pub mod handles;
pub mod material;
pub mod model;
pub mod scene;
pub mod skybox;
