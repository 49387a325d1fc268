use std::path::Path;

use glam::Vec3;
use prism_gfx::{GfxBackend, GfxResult};
use prism_model::mesh::SubMesh;
use prism_model::obj_loader::{ObjLoadOptions, ObjLoader};
use prism_model::vertex::Vertex;
use prism_render_interface::constant_buffer::ConstantBuffer;
use prism_render_interface::error::LoadResult;
use prism_render_interface::handles::{BindingTableId, ResourceId};
use prism_render_interface::render_context::RenderContext;
use prism_render_interface::resource_registry::TextureLoadOptions;

use crate::builtin::BuiltinTextures;
use crate::constants::ObjectConstants;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub translation: Vec3,
    pub scale: Vec3,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelLoadOptions {
    pub obj: ObjLoadOptions,
    pub transform: ModelTransform,
}

/// 一个子物体：一段非索引的三角形顶点与它的漫反射贴图
#[derive(Debug, Clone)]
pub struct GpuSubObject {
    pub name: String,
    pub vertex_buffer: ResourceId,
    pub vertex_count: u32,
    pub diffuse: ResourceId,
    /// 只包含 `diffuse` 的 table
    pub diffuse_table: BindingTableId,
}

pub struct GpuModel {
    name: String,
    sub_objects: Vec<GpuSubObject>,
    transform: ModelTransform,
    constants: ConstantBuffer<ObjectConstants>,
    object_table: BindingTableId,
}

/// 只包含一个资源的 table，同一个资源复用同一个 table
pub(crate) fn single_resource_table<B: GfxBackend>(
    ctx: &mut RenderContext<B>,
    prefix: &str,
    id: ResourceId,
) -> GfxResult<BindingTableId> {
    let name = format!("{prefix}:{id}");
    if let Some(table) = ctx.registry().binding_table_by_name(&name) {
        return Ok(table);
    }
    ctx.create_binding_table(&name, &[id])
}

// new & init
impl GpuModel {
    /// 读取 OBJ 并上传所有子物体
    ///
    /// 没有漫反射贴图的子物体使用白色纹理；贴图加载失败时使用 fallback 棋盘格。
    pub fn load<B: GfxBackend>(
        ctx: &mut RenderContext<B>,
        builtins: &BuiltinTextures,
        path: &Path,
        options: &ModelLoadOptions,
    ) -> LoadResult<Self> {
        let _span = tracy_client::span!("GpuModel::load");

        let mesh = ObjLoader::load(path, &options.obj).inspect_err(|e| log::warn!("{e}"))?;
        let model = Self::from_sub_meshes(ctx, builtins, &mesh.name, &mesh.sub_meshes, options.transform)?;
        log::info!(
            "loaded model {} ({} sub objects, {} vertices)",
            path.display(),
            model.sub_objects.len(),
            mesh.vertex_count()
        );
        Ok(model)
    }

    pub fn from_sub_meshes<B: GfxBackend>(
        ctx: &mut RenderContext<B>,
        builtins: &BuiltinTextures,
        name: &str,
        sub_meshes: &[SubMesh],
        transform: ModelTransform,
    ) -> GfxResult<Self> {
        let mut sub_objects = Vec::with_capacity(sub_meshes.len());
        for sub in sub_meshes {
            if sub.vertices.is_empty() {
                log::warn!("skipping empty sub mesh '{}' of '{name}'", sub.name);
                continue;
            }
            let diffuse = match &sub.diffuse_texture {
                Some(path) => ctx.load_texture_or_fallback(path, TextureLoadOptions::COLOR)?,
                None => builtins.white,
            };
            sub_objects.push(Self::upload_sub_object(ctx, &format!("{name}/{}", sub.name), &sub.vertices, diffuse)?);
        }
        Self::with_sub_objects(ctx, name, sub_objects, transform)
    }

    /// 程序化几何体
    pub fn from_vertices<B: GfxBackend>(
        ctx: &mut RenderContext<B>,
        name: &str,
        vertices: &[Vertex],
        diffuse: ResourceId,
        transform: ModelTransform,
    ) -> GfxResult<Self> {
        let sub = Self::upload_sub_object(ctx, name, vertices, diffuse)?;
        Self::with_sub_objects(ctx, name, vec![sub], transform)
    }

    fn upload_sub_object<B: GfxBackend>(
        ctx: &mut RenderContext<B>,
        name: &str,
        vertices: &[Vertex],
        diffuse: ResourceId,
    ) -> GfxResult<GpuSubObject> {
        let vertex_buffer = ctx.create_vertex_buffer(bytemuck::cast_slice(vertices), name)?;
        Ok(GpuSubObject {
            name: name.to_string(),
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            diffuse,
            diffuse_table: single_resource_table(ctx, "diffuse", diffuse)?,
        })
    }

    fn with_sub_objects<B: GfxBackend>(
        ctx: &mut RenderContext<B>,
        name: &str,
        sub_objects: Vec<GpuSubObject>,
        transform: ModelTransform,
    ) -> GfxResult<Self> {
        let constants = ctx.create_constant_buffer(
            &format!("{name} (object constants)"),
            ObjectConstants::from_transform(transform.translation, transform.scale),
        )?;
        let object_table = single_resource_table(ctx, "object", constants.resource())?;
        Ok(Self {
            name: name.to_string(),
            sub_objects,
            transform,
            constants,
            object_table,
        })
    }
}
// getters
impl GpuModel {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn sub_objects(&self) -> &[GpuSubObject] {
        &self.sub_objects
    }

    #[inline]
    pub fn transform(&self) -> ModelTransform {
        self.transform
    }

    #[inline]
    pub fn constants(&self) -> &ConstantBuffer<ObjectConstants> {
        &self.constants
    }

    #[inline]
    pub fn object_table(&self) -> BindingTableId {
        self.object_table
    }

    pub fn vertex_count(&self) -> u32 {
        self.sub_objects.iter().map(|s| s.vertex_count).sum()
    }
}
// tools
impl GpuModel {
    pub fn set_transform<B: GfxBackend>(&mut self, ctx: &mut RenderContext<B>, transform: ModelTransform) -> GfxResult<()> {
        self.transform = transform;
        ctx.write_constant_buffer(
            &mut self.constants,
            ObjectConstants::from_transform(transform.translation, transform.scale),
        )
    }
}
