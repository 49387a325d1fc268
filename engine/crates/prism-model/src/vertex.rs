use std::mem::offset_of;

use prism_gfx::basic::format::GfxFormat;
use prism_gfx::pipeline::GfxVertexAttribute;

/// 位置、法线、切线、uv
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: glam::Vec3,
    pub normal: glam::Vec3,
    pub tangent: glam::Vec3,
    pub uv: glam::Vec2,
}

impl Vertex {
    pub const STRIDE: u32 = size_of::<Vertex>() as u32;

    #[inline]
    pub fn new(position: glam::Vec3, uv: glam::Vec2) -> Self {
        Self {
            position,
            uv,
            ..Default::default()
        }
    }

    /// 顶点输入布局，location 依次为 0..4
    pub fn attributes() -> Vec<GfxVertexAttribute> {
        vec![
            GfxVertexAttribute {
                location: 0,
                format: GfxFormat::Rgb32Float,
                offset: offset_of!(Vertex, position) as u32,
            },
            GfxVertexAttribute {
                location: 1,
                format: GfxFormat::Rgb32Float,
                offset: offset_of!(Vertex, normal) as u32,
            },
            GfxVertexAttribute {
                location: 2,
                format: GfxFormat::Rgb32Float,
                offset: offset_of!(Vertex, tangent) as u32,
            },
            GfxVertexAttribute {
                location: 3,
                format: GfxFormat::Rg32Float,
                offset: offset_of!(Vertex, uv) as u32,
            },
        ]
    }
}
