use std::path::PathBuf;

use glam::{Vec2, Vec3};

use crate::vertex::Vertex;

/// 使用同一个材质的一组三角形
#[derive(Debug, Clone, Default)]
pub struct SubMesh {
    pub name: String,
    /// 每 3 个顶点构成一个三角形
    pub vertices: Vec<Vertex>,
    /// 漫反射贴图的路径，已经拼接好模型所在目录
    pub diffuse_texture: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub sub_meshes: Vec<SubMesh>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.sub_meshes.iter().map(|m| m.vertices.len()).sum()
    }
}

/// 每个三角形使用面法线
pub fn compute_flat_normals(vertices: &mut [Vertex]) {
    for tri in vertices.chunks_exact_mut(3) {
        let ab = tri[1].position - tri[0].position;
        let ac = tri[2].position - tri[0].position;
        let normal = ab.cross(ac).normalize_or_zero();
        for v in tri.iter_mut() {
            v.normal = normal;
        }
    }
}

/// 根据 uv 的变化方向计算每个三角形的切线
///
/// uv 退化（面积为 0）时，取一个与法线垂直的方向。
pub fn compute_tangents(vertices: &mut [Vertex]) {
    for tri in vertices.chunks_exact_mut(3) {
        let ab_pos = tri[1].position - tri[0].position;
        let ac_pos = tri[2].position - tri[0].position;
        let ab_uv: Vec2 = tri[1].uv - tri[0].uv;
        let ac_uv: Vec2 = tri[2].uv - tri[0].uv;

        let det = ab_uv.x * ac_uv.y - ac_uv.x * ab_uv.y;
        let tangent = if det.abs() > f32::EPSILON {
            let f = 1.0 / det;
            f * (ac_uv.y * ab_pos - ab_uv.y * ac_pos)
        } else {
            fallback_tangent(tri[0].normal)
        };
        for v in tri.iter_mut() {
            v.tangent = tangent;
        }
    }
}

fn fallback_tangent(normal: Vec3) -> Vec3 {
    let axis = if normal.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    (axis - normal * normal.dot(axis)).normalize_or_zero()
}

/// v = 1 - v
pub fn flip_v(vertices: &mut [Vertex]) {
    for v in vertices.iter_mut() {
        v.uv.y = 1.0 - v.uv.y;
    }
}

/// 反转整个顶点序列，同时反转了每个三角形的绕序
pub fn reverse_winding(vertices: &mut [Vertex]) {
    vertices.reverse();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle() -> Vec<Vertex> {
        vec![
            Vertex::new(Vec3::new(0.0, 0.0, 0.0), Vec2::new(0.0, 0.0)),
            Vertex::new(Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.0, 1.0)),
        ]
    }

    #[test]
    fn test_flat_normal_ccw() {
        let mut tri = triangle();
        compute_flat_normals(&mut tri);
        for v in &tri {
            assert_relative_eq!(v.normal.z, 1.0);
        }
    }

    #[test]
    fn test_tangent_follows_u() {
        let mut tri = triangle();
        compute_flat_normals(&mut tri);
        compute_tangents(&mut tri);
        assert_relative_eq!(tri[0].tangent.x, 1.0);
        assert_relative_eq!(tri[0].tangent.y, 0.0);
    }

    #[test]
    fn test_degenerate_uv_tangent_is_perpendicular() {
        let mut tri = triangle();
        for v in tri.iter_mut() {
            v.uv = Vec2::ZERO;
        }
        compute_flat_normals(&mut tri);
        compute_tangents(&mut tri);
        assert_relative_eq!(tri[0].tangent.dot(tri[0].normal), 0.0);
        assert_relative_eq!(tri[0].tangent.length(), 1.0);
    }

    #[test]
    fn test_reverse_winding_flips_normal() {
        let mut tri = triangle();
        reverse_winding(&mut tri);
        compute_flat_normals(&mut tri);
        assert_relative_eq!(tri[0].normal.z, -1.0);
    }
}
