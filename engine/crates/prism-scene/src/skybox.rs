use prism_asset::mips::ColorSpace;
use prism_gfx::GfxBackend;
use prism_model::shapes::skybox_cube;
use prism_render_interface::error::LoadResult;
use prism_render_interface::handles::{BindingTableId, ResourceId};
use prism_render_interface::render_context::RenderContext;
use prism_render_interface::resource_registry::CubemapLoadOptions;

use crate::builtin::BuiltinTextures;
use crate::model::{GpuModel, ModelTransform};

/// 天空盒三张 cubemap 的路径模板（`{face}`、`{mip}` 占位）
#[derive(Debug, Clone)]
pub struct SkyboxPaths {
    pub base: String,
    /// 漫反射辐照度
    pub diffuse: String,
    /// 预滤波的镜面反射，每一级 mip 一组文件
    pub specular: String,
    pub specular_mips: u32,
}

impl Default for SkyboxPaths {
    fn default() -> Self {
        Self {
            base: String::new(),
            diffuse: String::new(),
            specular: String::new(),
            specular_mips: 5,
        }
    }
}

/// 天空盒：base、diffuse、specular 三张 cubemap 组成一个 table，绘制时使用一个朝内的立方体
pub struct Skybox {
    base: ResourceId,
    diffuse: ResourceId,
    specular: ResourceId,
    table: BindingTableId,
    cube: GpuModel,
}

// new & init
impl Skybox {
    /// 任何一张 cubemap 加载失败时返回错误，cubemap 没有 fallback
    pub fn load<B: GfxBackend>(
        ctx: &mut RenderContext<B>,
        builtins: &BuiltinTextures,
        name: &str,
        paths: &SkyboxPaths,
    ) -> LoadResult<Self> {
        let _span = tracy_client::span!("Skybox::load");

        let single = CubemapLoadOptions {
            color_space: ColorSpace::Srgb,
            mip_count: 1,
        };
        let base = ctx.load_cubemap(&paths.base, single)?;
        let diffuse = ctx.load_cubemap(&paths.diffuse, single)?;
        let specular = ctx.load_cubemap(
            &paths.specular,
            CubemapLoadOptions {
                mip_count: paths.specular_mips,
                ..single
            },
        )?;

        let table = ctx.create_binding_table(&format!("skybox:{name}"), &[base, diffuse, specular])?;
        let cube = GpuModel::from_vertices(
            ctx,
            &format!("{name} (cube)"),
            &skybox_cube(),
            builtins.white,
            ModelTransform::default(),
        )?;

        log::info!("loaded skybox '{name}'");
        Ok(Self {
            base,
            diffuse,
            specular,
            table,
            cube,
        })
    }
}
// getters
impl Skybox {
    #[inline]
    pub fn base(&self) -> ResourceId {
        self.base
    }

    #[inline]
    pub fn diffuse(&self) -> ResourceId {
        self.diffuse
    }

    #[inline]
    pub fn specular(&self) -> ResourceId {
        self.specular
    }

    #[inline]
    pub fn table(&self) -> BindingTableId {
        self.table
    }

    #[inline]
    pub fn cube(&self) -> &GpuModel {
        &self.cube
    }
}
