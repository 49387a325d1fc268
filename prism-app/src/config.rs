use std::path::PathBuf;

use prism_gfx::basic::format::GfxFormat;
use prism_gfx::headless::{HeadlessCompletion, HeadlessConfig};
use prism_render_interface::config::RenderConfig;
use prism_scene::material::MaterialPaths;
use prism_scene::skybox::SkyboxPaths;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Headless,
    Vulkan,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// 编译好的 SPIR-V，相对路径基于工作区
    pub vertex: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelEntry {
    pub path: PathBuf,
    /// `materials` 中的名字
    pub material: Option<String>,
    pub translation: [f32; 3],
    pub scale: [f32; 3],
    pub flip_v: bool,
    pub reverse_winding: bool,
}

impl Default for ModelEntry {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            material: None,
            translation: [0.0; 3],
            scale: [1.0; 3],
            flip_v: false,
            reverse_winding: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MaterialEntry {
    pub name: String,
    pub albedo: PathBuf,
    pub normal: PathBuf,
    pub roughness: PathBuf,
    pub metalness: PathBuf,
    pub ambient_occlusion: PathBuf,
}

impl MaterialEntry {
    pub fn paths(&self, resolve: impl Fn(&PathBuf) -> PathBuf) -> MaterialPaths {
        MaterialPaths {
            albedo: resolve(&self.albedo),
            normal: resolve(&self.normal),
            roughness: resolve(&self.roughness),
            metalness: resolve(&self.metalness),
            ambient_occlusion: resolve(&self.ambient_occlusion),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkyboxEntry {
    pub base: String,
    pub diffuse: String,
    pub specular: String,
    pub specular_mips: u32,
}

impl Default for SkyboxEntry {
    fn default() -> Self {
        let paths = SkyboxPaths::default();
        Self {
            base: paths.base,
            diffuse: paths.diffuse,
            specular: paths.specular,
            specular_mips: paths.specular_mips,
        }
    }
}

/// `prism.toml`
///
/// 所有字段都有默认值，空文件或者文件不存在时使用默认配置。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub frames: u32,
    pub width: u32,
    pub height: u32,
    pub swap_target_count: usize,
    pub validation: bool,

    pub render: RenderConfig,
    pub shaders: ShaderConfig,

    /// 启动时预先加载的纹理
    pub textures: Vec<PathBuf>,
    pub materials: Vec<MaterialEntry>,
    pub models: Vec<ModelEntry>,
    pub skybox: Option<SkyboxEntry>,
    /// split-sum BRDF 查找表，线性空间、不生成 mip；未配置时绑定 fallback 纹理
    pub split_sum: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            frames: 3,
            width: 1280,
            height: 720,
            swap_target_count: 2,
            validation: false,
            render: RenderConfig::default(),
            shaders: ShaderConfig::default(),
            textures: Vec::new(),
            materials: Vec::new(),
            models: Vec::new(),
            skybox: None,
            split_sum: None,
        }
    }
}

impl AppConfig {
    pub fn headless_config(&self) -> HeadlessConfig {
        HeadlessConfig {
            swap_target_count: self.swap_target_count,
            width: self.width,
            height: self.height,
            swap_format: GfxFormat::Bgra8Unorm,
            completion: HeadlessCompletion::Immediate,
        }
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend, BackendKind::Headless);
        assert_eq!(config.frames, 3);
        assert_eq!(config.render.heaps.cbv_srv_uav, 200);
        assert!(config.skybox.is_none());
        assert!(config.split_sum.is_none());
    }

    #[test]
    fn test_parse_scene() {
        let config: AppConfig = toml::from_str(
            r#"
            backend = "vulkan"
            frames = 10

            [render.heaps]
            sampler = 4

            [[materials]]
            name = "brick"
            albedo = "textures/brick_albedo.png"

            [[models]]
            path = "models/cube.obj"
            material = "brick"
            scale = [2.0, 2.0, 2.0]

            split_sum = "assets/splitsum.png"

            [skybox]
            base = "sky/base_{face}.png"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, BackendKind::Vulkan);
        assert_eq!(config.frames, 10);
        assert_eq!(config.render.heaps.sampler, 4);
        assert_eq!(config.render.heaps.render_target, 50);
        assert_eq!(config.materials[0].name, "brick");
        assert_eq!(config.models[0].material.as_deref(), Some("brick"));
        assert_eq!(config.models[0].scale, [2.0; 3]);
        assert_eq!(config.models[0].translation, [0.0; 3]);
        assert_eq!(config.skybox.as_ref().unwrap().specular_mips, 5);
        assert_eq!(config.split_sum, Some(PathBuf::from("assets/splitsum.png")));
    }
}
