use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::Vec3;
use prism_crate_tools::resource::PrismPath;
use prism_gfx::GfxBackend;
use prism_gfx::basic::format::GfxFormat;
use prism_gfx::pipeline::GfxPipelineDesc;
use prism_gfx::resources::handles::GfxPipelineHandle;
use prism_model::obj_loader::ObjLoadOptions;
use prism_model::shapes::uv_sphere;
use prism_model::vertex::Vertex;
use prism_render_interface::error::LoadError;
use prism_render_interface::handles::ResourceId;
use prism_render_interface::render_context::RenderContext;
use prism_render_interface::resource_registry::{TextureLoadOptions, Visibility};
use prism_scene::constants::SceneConstants;
use prism_scene::draw::begin_main_pass;
use prism_scene::material::Material;
use prism_scene::model::{GpuModel, ModelLoadOptions, ModelTransform};
use prism_scene::scene::Scene;
use prism_scene::skybox::{Skybox, SkyboxPaths};

use crate::config::AppConfig;

/// 一次运行的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u32,
    pub draws: u64,
    pub fence_value: u64,
    pub resources: usize,
    pub staging_released: u64,
    /// 每帧通过 shader 不可见的 view 清除累积 UAV 的次数
    pub uav_clears: u64,
}

fn read_spirv(path: Option<&PathBuf>) -> anyhow::Result<Vec<u32>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let path = PrismPath::resolve(path);
    let bytes = std::fs::read(&path).map_err(|e| anyhow::anyhow!("failed to read shader {}: {e}", path.display()))?;
    anyhow::ensure!(bytes.len() % 4 == 0, "shader {} is not SPIR-V", path.display());
    Ok(bytes.chunks_exact(4).map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
}

/// 资源加载失败可以跳过，致命错误终止运行
fn skip_asset_error<T>(result: Result<T, LoadError>, what: &str) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(LoadError::Asset(e)) => {
            log::warn!("skipping {what}: {e}");
            Ok(None)
        }
        Err(LoadError::Fatal(e)) => Err(e.into()),
    }
}

/// 在一段上传命令流中加载配置里的全部资源
fn load_scene<B: GfxBackend>(ctx: &mut RenderContext<B>, config: &AppConfig) -> anyhow::Result<Scene> {
    let _span = tracy_client::span!("load_scene");

    let mut scene = Scene::new(ctx)?;
    let resolve = |p: &PathBuf| PrismPath::resolve(p);

    for path in &config.textures {
        ctx.load_texture_or_fallback(resolve(path), TextureLoadOptions::COLOR)?;
    }

    let mut materials = HashMap::new();
    for entry in &config.materials {
        let material = Material::load(ctx, &entry.name, &entry.paths(resolve))?;
        materials.insert(entry.name.clone(), scene.add_material(material));
    }

    for entry in &config.models {
        let options = ModelLoadOptions {
            obj: ObjLoadOptions {
                flip_v: entry.flip_v,
                reverse_winding: entry.reverse_winding,
            },
            transform: ModelTransform {
                translation: Vec3::from(entry.translation),
                scale: Vec3::from(entry.scale),
            },
        };
        let path = resolve(&entry.path);
        let loaded = GpuModel::load(ctx, scene.builtins(), &path, &options);
        let Some(model) = skip_asset_error(loaded, &format!("model {}", path.display()))? else {
            continue;
        };
        let material = match &entry.material {
            Some(name) => {
                let handle = materials.get(name).copied();
                if handle.is_none() {
                    log::warn!("model {} uses unknown material '{name}'", path.display());
                }
                handle
            }
            None => None,
        };
        scene.add_model(model, material);
    }

    if let Some(entry) = &config.skybox {
        let paths = SkyboxPaths {
            base: resolve(&PathBuf::from(&entry.base)).to_string_lossy().to_string(),
            diffuse: resolve(&PathBuf::from(&entry.diffuse)).to_string_lossy().to_string(),
            specular: resolve(&PathBuf::from(&entry.specular)).to_string_lossy().to_string(),
            specular_mips: entry.specular_mips,
        };
        let loaded = Skybox::load(ctx, scene.builtins(), "skybox", &paths);
        if let Some(skybox) = skip_asset_error(loaded, "skybox")? {
            scene.set_skybox(skybox);
        }
    }

    if scene.object_count() == 0 {
        log::info!("no models configured, adding a sphere");
        let sphere = GpuModel::from_vertices(
            ctx,
            "sphere",
            &uv_sphere(32, 16),
            ResourceId::FALLBACK,
            ModelTransform::default(),
        )?;
        scene.add_model(sphere, None);
    }

    Ok(scene)
}

fn create_pipeline<B: GfxBackend>(ctx: &mut RenderContext<B>, config: &AppConfig) -> anyhow::Result<GfxPipelineHandle> {
    let desc = GfxPipelineDesc {
        name: "forward".to_string(),
        vertex_spirv: read_spirv(config.shaders.vertex.as_ref())?,
        fragment_spirv: read_spirv(config.shaders.fragment.as_ref())?,
        vertex_stride: Vertex::STRIDE,
        vertex_attributes: Vertex::attributes(),
        color_format: ctx.backend().swap_target_format(),
        depth_format: Some(GfxFormat::D32Float),
        cull_back_faces: true,
        depth_write: true,
    };
    Ok(ctx.backend_mut().create_pipeline(&desc)?)
}

/// 加载场景并渲染 `config.frames` 帧
pub fn run<B: GfxBackend>(backend: B, config: &AppConfig) -> anyhow::Result<RunSummary> {
    let _span = tracy_client::span!("run");

    let mut ctx = RenderContext::new(backend, config.render.clone())?;
    let (width, height) = ctx.backend().swap_extent();
    let depth = ctx.create_depth_target(width, height, "depth")?;
    let mut scene = load_scene(&mut ctx, config)?;

    let split_sum = match &config.split_sum {
        Some(path) => ctx.load_texture_or_fallback(PrismPath::resolve(path), TextureLoadOptions::LINEAR_NO_MIPS)?,
        None => {
            log::info!("no split-sum table configured, binding the fallback texture");
            ResourceId::FALLBACK
        }
    };
    let accumulation = ctx.create_dual_visibility_uav(width, height, GfxFormat::Rgba8Unorm, "accumulation")?;
    scene.set_lighting(&mut ctx, split_sum, accumulation)?;
    let upload = ctx.end_frame()?;
    log::info!(
        "startup upload finished at fence {}, {} resources registered",
        upload.fence_value(),
        ctx.registry().resource_count()
    );

    let pipeline = create_pipeline(&mut ctx, config)?;
    let clear_color = ctx.config().clear_color;
    let mut summary = RunSummary::default();
    for frame in 0..config.frames {
        let angle = frame as f32 * 0.1;
        let eye = Vec3::new(angle.sin() * 4.0, 1.0, angle.cos() * 4.0);
        scene.update_camera(&mut ctx, SceneConstants::look_at(eye, Vec3::ZERO, config.aspect()))?;

        let target = ctx.begin_frame()?;
        ctx.record_uav_clear(accumulation, Visibility::ShaderInvisible, [0.0; 4])?;
        summary.uav_clears += 1;
        let (registry, commands) = ctx.draw_parts()?;
        begin_main_pass(registry, commands, &target, Some(depth), clear_color)?;
        commands.bind_pipeline(pipeline);
        let draws = scene.record(registry, commands)?;
        commands.end_rendering();
        let completion = ctx.end_frame()?;

        log::debug!("frame {frame}: {draws} draws, fence {}", completion.fence_value());
        summary.draws += draws as u64;
        summary.frames += 1;
    }

    ctx.backend_mut().destroy_pipeline(pipeline)?;
    summary.fence_value = ctx.pacer().fence_value();
    summary.resources = ctx.registry().resource_count();
    summary.staging_released = ctx.staging().released_total();
    Ok(summary)
}

/// 工作区根目录下的 `prism.toml`
pub fn default_config_path() -> PathBuf {
    PrismPath::resolve(Path::new("prism.toml"))
}
