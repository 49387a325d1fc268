//! 模型数据
//!
//! 只负责把网格变成 CPU 侧的三角形顶点列表（非索引），上传到 GPU 由 `prism-scene` 完成。

pub mod mesh;
pub mod obj_loader;
pub mod shapes;
pub mod vertex;
