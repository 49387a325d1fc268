use crate::basic::format::GfxFormat;

/// 每个 pipeline 最多可以绑定的 descriptor table 数量
///
/// table 的起始槽位通过 push constant 传给 shader，每个占 4 字节。
pub const MAX_DESCRIPTOR_TABLES: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfxVertexAttribute {
    pub location: u32,
    pub format: GfxFormat,
    pub offset: u32,
}

/// 图形管线的描述
#[derive(Debug, Clone)]
pub struct GfxPipelineDesc {
    pub name: String,
    pub vertex_spirv: Vec<u32>,
    pub fragment_spirv: Vec<u32>,
    pub vertex_stride: u32,
    pub vertex_attributes: Vec<GfxVertexAttribute>,
    pub color_format: GfxFormat,
    pub depth_format: Option<GfxFormat>,
    pub cull_back_faces: bool,
    pub depth_write: bool,
}
