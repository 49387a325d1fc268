use std::path::PathBuf;

use prism_gfx::{GfxBackend, GfxResult};
use prism_render_interface::handles::{BindingTableId, ResourceId};
use prism_render_interface::render_context::RenderContext;
use prism_render_interface::resource_registry::TextureLoadOptions;

use crate::builtin::BuiltinTextures;

/// PBR 材质的贴图，顺序即 binding table 中的顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PbrMap {
    Albedo,
    Normal,
    Roughness,
    Metalness,
    AmbientOcclusion,
}

impl PbrMap {
    pub const ALL: [PbrMap; 5] = [
        PbrMap::Albedo,
        PbrMap::Normal,
        PbrMap::Roughness,
        PbrMap::Metalness,
        PbrMap::AmbientOcclusion,
    ];

    /// 只有 albedo 是颜色数据
    #[inline]
    pub fn load_options(self) -> TextureLoadOptions {
        match self {
            PbrMap::Albedo => TextureLoadOptions::COLOR,
            _ => TextureLoadOptions::DATA,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MaterialPaths {
    pub albedo: PathBuf,
    pub normal: PathBuf,
    pub roughness: PathBuf,
    pub metalness: PathBuf,
    pub ambient_occlusion: PathBuf,
}

impl MaterialPaths {
    pub fn path(&self, map: PbrMap) -> &PathBuf {
        match map {
            PbrMap::Albedo => &self.albedo,
            PbrMap::Normal => &self.normal,
            PbrMap::Roughness => &self.roughness,
            PbrMap::Metalness => &self.metalness,
            PbrMap::AmbientOcclusion => &self.ambient_occlusion,
        }
    }
}

/// 五张 PBR 贴图组成的一个 binding table
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    textures: [ResourceId; 5],
    table: BindingTableId,
}

// new & init
impl Material {
    /// 加载失败的贴图使用 fallback 棋盘格
    pub fn load<B: GfxBackend>(ctx: &mut RenderContext<B>, name: &str, paths: &MaterialPaths) -> GfxResult<Self> {
        let _span = tracy_client::span!("Material::load");

        let mut textures = [ResourceId::FALLBACK; 5];
        for (slot, map) in textures.iter_mut().zip(PbrMap::ALL) {
            *slot = ctx.load_texture_or_fallback(paths.path(map), map.load_options())?;
        }
        Self::from_textures(ctx, name, textures)
    }

    pub fn from_textures<B: GfxBackend>(
        ctx: &mut RenderContext<B>,
        name: &str,
        textures: [ResourceId; 5],
    ) -> GfxResult<Self> {
        let table = ctx.create_binding_table(&format!("material:{name}"), &textures)?;
        Ok(Self {
            name: name.to_string(),
            textures,
            table,
        })
    }

    /// 白色 albedo、朝外的法线、粗糙度 1、金属度 0、无遮蔽
    pub fn default_material<B: GfxBackend>(ctx: &mut RenderContext<B>, builtins: &BuiltinTextures) -> GfxResult<Self> {
        Self::from_textures(
            ctx,
            "default",
            [builtins.white, builtins.flat_normal, builtins.white, builtins.black, builtins.white],
        )
    }
}
// getters
impl Material {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn texture(&self, map: PbrMap) -> ResourceId {
        self.textures[map as usize]
    }

    #[inline]
    pub fn textures(&self) -> &[ResourceId; 5] {
        &self.textures
    }

    #[inline]
    pub fn table(&self) -> BindingTableId {
        self.table
    }
}
