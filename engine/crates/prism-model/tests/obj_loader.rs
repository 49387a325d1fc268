use approx::assert_relative_eq;
use prism_asset::AssetError;
use prism_model::obj_loader::{ObjLoadOptions, ObjLoader};

const QUAD_AS_TRIANGLES: &str = "\
mtllib quad.mtl
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl brick
f 1/1 2/2 3/3
f 1/1 3/3 4/4
";

const QUAD_MTL: &str = "\
newmtl brick
map_Kd brick.png
";

const QUAD_AS_POLYGON: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

#[test]
fn test_load_triangles() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("quad.obj"), QUAD_AS_TRIANGLES).unwrap();
    std::fs::write(dir.path().join("quad.mtl"), QUAD_MTL).unwrap();

    let mesh = ObjLoader::load(&dir.path().join("quad.obj"), &ObjLoadOptions::default()).unwrap();
    assert_eq!(mesh.name, "quad");
    assert_eq!(mesh.sub_meshes.len(), 1);
    let sub = &mesh.sub_meshes[0];
    assert_eq!(sub.vertices.len(), 6);
    assert_eq!(sub.diffuse_texture.as_deref(), Some(dir.path().join("brick.png").as_path()));
    // 没有法线时按面计算
    assert_relative_eq!(sub.vertices[0].normal.z, 1.0);
    assert_relative_eq!(sub.vertices[0].tangent.x, 1.0);
}

#[test]
fn test_flip_v() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("quad.obj"), QUAD_AS_TRIANGLES).unwrap();

    let options = ObjLoadOptions {
        flip_v: true,
        ..Default::default()
    };
    let mesh = ObjLoader::load(&dir.path().join("quad.obj"), &options).unwrap();
    // 第 3 个顶点 vt 1 1
    assert_relative_eq!(mesh.sub_meshes[0].vertices[2].uv.y, 0.0);
    assert_relative_eq!(mesh.sub_meshes[0].vertices[0].uv.y, 1.0);
}

#[test]
fn test_polygon_face_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("poly.obj"), QUAD_AS_POLYGON).unwrap();

    let err = ObjLoader::load(&dir.path().join("poly.obj"), &ObjLoadOptions::default()).unwrap_err();
    assert!(matches!(err, AssetError::NonTriangulatedFace { arity: 4, .. }));
}

#[test]
fn test_missing_file() {
    let err = ObjLoader::load(std::path::Path::new("/nope/none.obj"), &ObjLoadOptions::default()).unwrap_err();
    assert!(matches!(err, AssetError::NotFound(_)));
}
