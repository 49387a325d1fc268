use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::mesh;
use crate::vertex::Vertex;

/// 单位球，三角形列表
///
/// 中间部分为经纬网格，两极用三角扇封口；法线即归一化的位置。
pub fn uv_sphere(slices_x: u32, slices_y: u32) -> Vec<Vertex> {
    let slices_x = slices_x.max(3);
    let slices_y = slices_y.max(3);
    let point = |px: f32, py: f32| {
        let (sin_x, cos_x) = (px * 2.0 * PI).sin_cos();
        let (sin_y, cos_y) = (py * PI).sin_cos();
        Vertex::new(Vec3::new(cos_x * sin_y, cos_y, sin_x * sin_y), Vec2::new(px, py))
    };

    let mut vertices = Vec::new();
    for iy in 1..slices_y - 1 {
        let py1 = iy as f32 / slices_y as f32;
        let py2 = (iy + 1) as f32 / slices_y as f32;
        for ix in 0..slices_x {
            let px1 = ix as f32 / slices_x as f32;
            let px2 = (ix + 1) as f32 / slices_x as f32;

            let p00 = point(px1, py1);
            let p10 = point(px2, py1);
            let p01 = point(px1, py2);
            let p11 = point(px2, py2);
            vertices.extend_from_slice(&[p00, p10, p01, p01, p10, p11]);
        }
    }

    let top_y = 1.0 / slices_y as f32;
    let bottom_y = 1.0 - top_y;
    for ix in 0..slices_x {
        let px1 = ix as f32 / slices_x as f32;
        let px2 = (ix + 1) as f32 / slices_x as f32;

        let top = Vertex::new(Vec3::Y, Vec2::new(px1, 0.0));
        vertices.extend_from_slice(&[top, point(px2, top_y), point(px1, top_y)]);

        let bottom = Vertex::new(-Vec3::Y, Vec2::new(px1, 1.0));
        vertices.extend_from_slice(&[point(px1, bottom_y), point(px2, bottom_y), bottom]);
    }

    for v in vertices.iter_mut() {
        v.normal = v.position.normalize_or_zero();
    }
    mesh::compute_tangents(&mut vertices);
    vertices
}

/// 天空盒用的立方体，[-1, 1]，从内部观察时是正面
pub fn skybox_cube() -> Vec<Vertex> {
    let v = |x: f32, y: f32, z: f32, u: f32, w: f32| Vertex::new(Vec3::new(x, y, z), Vec2::new(u, w));
    let v000 = v(-1.0, -1.0, -1.0, 0.0, 0.0);
    let v100 = v(1.0, -1.0, -1.0, 1.0, 0.0);
    let v010 = v(-1.0, 1.0, -1.0, 0.0, 1.0);
    let v110 = v(1.0, 1.0, -1.0, 1.0, 1.0);
    let v001 = v(-1.0, -1.0, 1.0, 0.0, 0.0);
    let v101 = v(1.0, -1.0, 1.0, 1.0, 0.0);
    let v011 = v(-1.0, 1.0, 1.0, 0.0, 1.0);
    let v111 = v(1.0, 1.0, 1.0, 1.0, 1.0);

    let mut vertices = vec![
        // -z
        v110, v000, v100, v110, v010, v000, //
        // +z
        v111, v101, v001, v111, v001, v011, //
        // +y
        v111, v010, v110, v111, v011, v010, //
        // -y
        v101, v100, v000, v101, v000, v001, //
        // -x
        v011, v000, v010, v011, v001, v000, //
        // +x
        v111, v110, v100, v111, v100, v101,
    ];
    mesh::compute_flat_normals(&mut vertices);
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_counts() {
        let sphere = uv_sphere(20, 20);
        // (slices_y - 2) 行，每行 slices_x 个四边形，加上两个封口
        assert_eq!(sphere.len(), (18 * 20 * 6 + 20 * 6) as usize);
        for v in &sphere {
            assert!((v.position.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_skybox_faces_point_inward() {
        let cube = skybox_cube();
        assert_eq!(cube.len(), 36);
        for tri in cube.chunks_exact(3) {
            let center = (tri[0].position + tri[1].position + tri[2].position) / 3.0;
            assert!(tri[0].normal.dot(center) < 0.0, "{tri:?}");
        }
    }
}
