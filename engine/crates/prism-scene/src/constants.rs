use glam::{Mat4, Vec3, Vec4};

/// 每个物体的常量
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectConstants {
    pub model: Mat4,
}

impl ObjectConstants {
    /// 先缩放再平移
    #[inline]
    pub fn from_transform(translation: Vec3, scale: Vec3) -> Self {
        Self {
            model: Mat4::from_translation(translation) * Mat4::from_scale(scale),
        }
    }
}

/// 整个场景共享的常量
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneConstants {
    pub view_proj: Mat4,
    /// w 分量未使用
    pub camera_pos: Vec4,
}

impl SceneConstants {
    pub fn look_at(eye: Vec3, target: Vec3, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), aspect, 0.1, 100.0);
        Self {
            view_proj: proj * view,
            camera_pos: eye.extend(1.0),
        }
    }
}

impl Default for SceneConstants {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_model_matrix_scales_then_translates() {
        let c = ObjectConstants::from_transform(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(2.0));
        let p = c.model.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(p.x, 3.0);
        assert_abs_diff_eq!(p.y, 2.0);
        assert_abs_diff_eq!(p.z, 3.0);
        assert_eq!(size_of::<ObjectConstants>(), 64);
        assert_eq!(size_of::<SceneConstants>(), 80);
    }

    #[test]
    fn test_camera_target_is_in_front() {
        let c = SceneConstants::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0);
        let clip = c.view_proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert_abs_diff_eq!(ndc.x, 0.0);
        assert_abs_diff_eq!(ndc.y, 0.0);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
