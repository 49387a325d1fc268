use std::path::Path;

use glam::{Vec2, Vec3};
use prism_asset::AssetError;

use crate::mesh::{self, MeshData, SubMesh};
use crate::vertex::Vertex;

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjLoadOptions {
    /// v = 1 - v
    pub flip_v: bool,
    /// 反转三角形绕序
    pub reverse_winding: bool,
}

pub struct ObjLoader {}
impl ObjLoader {
    /// 读取 OBJ 文件，每个 shape 生成一个 [`SubMesh`]
    ///
    /// 只接受三角形面；文件不提供法线时按面法线计算；切线总是重新计算。
    pub fn load(path: &Path, options: &ObjLoadOptions) -> Result<MeshData, AssetError> {
        let _span = tracy_client::span!("ObjLoader::load");

        if !path.exists() {
            return Err(AssetError::NotFound(path.to_path_buf()));
        }

        let load_options = tobj::LoadOptions {
            single_index: true,
            triangulate: false,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };
        let (models, materials) = tobj::load_obj(path, &load_options).map_err(|e| AssetError::ModelParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let materials = materials.unwrap_or_else(|e| {
            log::warn!("failed to load materials for {}: {e}", path.display());
            Vec::new()
        });
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let mut sub_meshes = Vec::with_capacity(models.len());
        for model in models {
            let mesh = &model.mesh;

            // 全部是三角形时 face_arities 为空
            if let Some(arity) = mesh.face_arities.iter().copied().find(|a| *a != 3) {
                return Err(AssetError::NonTriangulatedFace {
                    path: path.to_path_buf(),
                    mesh: model.name.clone(),
                    arity,
                });
            }
            if mesh.indices.len() % 3 != 0 {
                return Err(AssetError::ModelParse {
                    path: path.to_path_buf(),
                    reason: format!("mesh '{}' index count is not a multiple of 3", model.name),
                });
            }

            let has_normals = !mesh.normals.is_empty();
            let has_uvs = !mesh.texcoords.is_empty();
            let mut vertices = Vec::with_capacity(mesh.indices.len());
            for &index in &mesh.indices {
                let i = index as usize;
                let position = Vec3::new(mesh.positions[i * 3], mesh.positions[i * 3 + 1], mesh.positions[i * 3 + 2]);
                let normal = if has_normals {
                    Vec3::new(mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2])
                } else {
                    Vec3::ZERO
                };
                let uv = if has_uvs { Vec2::new(mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]) } else { Vec2::ZERO };
                vertices.push(Vertex {
                    normal,
                    ..Vertex::new(position, uv)
                });
            }

            if options.flip_v {
                mesh::flip_v(&mut vertices);
            }
            if !has_normals {
                mesh::compute_flat_normals(&mut vertices);
            }
            mesh::compute_tangents(&mut vertices);
            if options.reverse_winding {
                mesh::reverse_winding(&mut vertices);
            }

            let diffuse_texture = mesh
                .material_id
                .and_then(|id| materials.get(id))
                .and_then(|m| m.diffuse_texture.as_ref())
                .filter(|name| !name.is_empty())
                .map(|name| base_dir.join(name));

            sub_meshes.push(SubMesh {
                name: model.name,
                vertices,
                diffuse_texture,
            });
        }

        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        log::info!("loaded obj {} ({} sub meshes)", path.display(), sub_meshes.len());
        Ok(MeshData { name, sub_meshes })
    }
}
