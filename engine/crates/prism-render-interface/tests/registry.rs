use std::path::{Path, PathBuf};

use prism_asset::AssetError;
use prism_asset::checkerboard::{GREEN, MAGENTA};
use prism_asset::cubemap::{CubeFace, face_path};
use prism_gfx::basic::format::GfxFormat;
use prism_gfx::descriptors::{DescriptorHeapKind, GfxViewDesc, GfxViewDimension};
use prism_gfx::headless::{HeadlessBackend, HeadlessConfig};
use prism_gfx::resources::desc::GfxImageDesc;
use prism_gfx::{GfxBackend, GfxError};
use prism_render_interface::config::{DescriptorHeapConfig, RenderConfig};
use prism_render_interface::error::LoadError;
use prism_render_interface::handles::ResourceId;
use prism_render_interface::render_context::RenderContext;
use prism_render_interface::resource_registry::{
    CubemapLoadOptions, ResourceKind, TextureLoadOptions, Visibility,
};

fn context() -> RenderContext<HeadlessBackend> {
    RenderContext::new(HeadlessBackend::new(HeadlessConfig::default()).unwrap(), RenderConfig::default()).unwrap()
}

fn write_png(path: &Path, size: u32, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(size, size, image::Rgba(rgba)).save(path).unwrap();
}

fn write_cube_faces(dir: &Path) -> String {
    let pattern = dir.join("sky_{face}.png").to_string_lossy().to_string();
    for face in CubeFace::ALL {
        write_png(&face_path(&pattern, face, 0), 4, [10, 20, 30, 255]);
    }
    pattern
}

#[test]
fn test_fallback_exists_before_any_load() {
    let mut ctx = context();

    let record = ctx.registry().lookup(ResourceId::FALLBACK);
    assert_eq!(record.kind(), ResourceKind::Texture);
    let image = record.image().unwrap();
    let view = ctx.registry().gpu_view(ResourceId::FALLBACK);
    assert_eq!(view.heap, DescriptorHeapKind::CbvSrvUav);
    assert!(matches!(
        ctx.backend().descriptor(view.heap, view.slot),
        Some(GfxViewDesc::ShaderResource { image: i, dimension: GfxViewDimension::Texture2D, .. }) if *i == image
    ));

    ctx.end_frame().unwrap();

    let pixels = ctx.backend().read_image(image, 0, 0).unwrap();
    let at = |x: usize, y: usize| -> [u8; 4] {
        let i = (y * 256 + x) * 4;
        pixels[i..i + 4].try_into().unwrap()
    };
    assert_eq!(at(0, 0), MAGENTA);
    assert_eq!(at(32, 0), GREEN);
    assert_eq!(at(32, 32), MAGENTA);
    assert_eq!(ctx.staging().pending_count(), 0);
}

#[test]
fn test_same_path_loads_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("albedo.png");
    write_png(&path, 4, [200, 100, 50, 255]);

    let mut ctx = context();
    let images_before = ctx.backend().stats().images_created;

    let first = ctx.load_texture(&path, TextureLoadOptions::COLOR).unwrap();
    let second = ctx.load_texture(&path, TextureLoadOptions::COLOR).unwrap();
    assert_eq!(first, second);
    assert!(!first.is_fallback());
    assert_eq!(ctx.backend().stats().images_created, images_before + 1);

    let desc = ctx.registry().lookup(first).image_desc().unwrap();
    assert_eq!(desc.mip_levels, 3);
    assert_eq!(desc.format, GfxFormat::Rgba8Srgb);

    ctx.end_frame().unwrap();
    let image = ctx.registry().lookup(first).image().unwrap();
    assert_eq!(ctx.backend().read_image(image, 2, 0).unwrap(), &[200, 100, 50, 255]);
}

#[test]
fn test_missing_texture_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let missing: PathBuf = dir.path().join("missing.png");

    let mut ctx = context();
    let err = ctx.load_texture(&missing, TextureLoadOptions::DATA).unwrap_err();
    assert!(matches!(err, LoadError::Asset(AssetError::NotFound(_))));
    assert!(!err.is_fatal());

    let id = ctx.load_texture_or_fallback(&missing, TextureLoadOptions::DATA).unwrap();
    assert_eq!(id, ResourceId::FALLBACK);
}

#[test]
fn test_cubemap_with_missing_face_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = write_cube_faces(dir.path());
    let front = face_path(&pattern, CubeFace::Front, 0);
    std::fs::remove_file(&front).unwrap();

    let mut ctx = context();
    let resources = ctx.registry().resource_count();
    let slots = ctx.registry().heaps().allocator(DescriptorHeapKind::CbvSrvUav).used();
    let images = ctx.backend().stats().images_created;

    let err = ctx.load_cubemap(&pattern, CubemapLoadOptions::default()).unwrap_err();
    assert!(matches!(err, LoadError::Asset(AssetError::NotFound(p)) if p == front));
    assert_eq!(ctx.registry().resource_count(), resources);
    assert_eq!(ctx.registry().heaps().allocator(DescriptorHeapKind::CbvSrvUav).used(), slots);
    assert_eq!(ctx.backend().stats().images_created, images);
    assert!(ctx.registry().cached_cubemap(&pattern).is_none());

    write_png(&front, 4, [10, 20, 30, 255]);
    let id = ctx.load_cubemap(&pattern, CubemapLoadOptions::default()).unwrap();
    let record = ctx.registry().lookup(id);
    assert_eq!(record.kind(), ResourceKind::Cubemap);
    assert_eq!(record.image_desc().unwrap().array_layers, 6);
    assert!(matches!(record.view(), Some(GfxViewDesc::ShaderResource { dimension: GfxViewDimension::TextureCube, .. })));
}

#[test]
fn test_cubemap_with_unscaled_mips_is_an_asset_error() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = dir.path().join("sky{mip}_{face}.png").to_string_lossy().to_string();
    for face in CubeFace::ALL {
        for mip in 0..2 {
            write_png(&face_path(&pattern, face, mip), 8, [10, 20, 30, 255]);
        }
    }

    let mut ctx = context();
    let slots = ctx.registry().heaps().allocator(DescriptorHeapKind::CbvSrvUav).used();
    let options = CubemapLoadOptions {
        mip_count: 2,
        ..Default::default()
    };
    let err = ctx.load_cubemap(&pattern, options).unwrap_err();
    assert!(!err.is_fatal());
    assert!(matches!(err, LoadError::Asset(AssetError::CubemapFaceMismatch { mip: 1, .. })));
    assert_eq!(ctx.registry().heaps().allocator(DescriptorHeapKind::CbvSrvUav).used(), slots);
    assert!(ctx.registry().cached_cubemap(&pattern).is_none());
}

#[test]
fn test_binding_table_is_contiguous() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    write_png(&a, 2, [1, 1, 1, 255]);
    write_png(&b, 2, [2, 2, 2, 255]);

    let mut ctx = context();
    let a = ctx.load_texture(&a, TextureLoadOptions::DATA).unwrap();
    let cb = ctx.create_constant_buffer("scene", [0.0f32; 16]).unwrap();
    let b = ctx.load_texture(&b, TextureLoadOptions::DATA).unwrap();

    let members = [a, b, ResourceId::FALLBACK, cb.resource()];
    let table_id = ctx.create_binding_table("material", &members).unwrap();
    assert_eq!(ctx.registry().binding_table_by_name("material"), Some(table_id));

    let table = ctx.registry().binding_table(table_id);
    assert_eq!(table.heap(), DescriptorHeapKind::CbvSrvUav);
    for (n, id) in members.iter().enumerate() {
        let written = ctx.backend().descriptor(table.heap(), table.slot(n as u32)).unwrap();
        assert_eq!(Some(written), ctx.registry().lookup(*id).view());
    }
    assert!(ctx.create_binding_table("material", &members).is_err());
}

#[test]
fn test_dual_visibility_uav_clears_shadow_image() {
    let mut ctx = context();
    let id = ctx.create_dual_visibility_uav(4, 4, GfxFormat::Rgba8Unorm, "accumulation").unwrap();

    let record = ctx.registry().lookup(id);
    let visible = ctx.registry().gpu_view(id);
    let invisible = ctx.registry().cpu_view(id);
    assert_eq!(visible.heap, DescriptorHeapKind::CbvSrvUav);
    assert_eq!(invisible.heap, DescriptorHeapKind::CbvSrvUavShaderInvisible);
    assert_ne!(record.image(), record.shader_invisible_image());
    let shadow = record.shader_invisible_image().unwrap();
    let primary = record.image().unwrap();

    ctx.record_uav_clear(id, Visibility::ShaderInvisible, [1.0, 0.0, 0.0, 1.0]).unwrap();
    ctx.end_frame().unwrap();

    assert_eq!(ctx.backend().stats().clears, 1);
    assert!(ctx.backend().read_image(shadow, 0, 0).unwrap().chunks(4).all(|p| p == [255, 0, 0, 255]));
    assert!(ctx.backend().read_image(primary, 0, 0).unwrap().iter().all(|b| *b == 0));
}

#[test]
fn test_heap_exhaustion_is_reported() {
    let config = RenderConfig {
        heaps: DescriptorHeapConfig {
            cbv_srv_uav: 3,
            ..Default::default()
        },
        fallback_texture_size: 8,
        ..Default::default()
    };
    let mut ctx = RenderContext::new(HeadlessBackend::new(HeadlessConfig::default()).unwrap(), config).unwrap();

    let desc = GfxImageDesc::texture_2d(2, 2, GfxFormat::Rgba8Unorm, 1);
    ctx.create_texture(&desc, None, "one").unwrap();
    ctx.create_texture(&desc, None, "two").unwrap();
    let err = ctx.create_texture(&desc, None, "three").unwrap_err();
    assert!(matches!(
        err,
        GfxError::DescriptorHeapExhausted { heap: DescriptorHeapKind::CbvSrvUav, requested: 1, used: 3, capacity: 3 }
    ));
    assert_eq!(ctx.registry().resource_count(), 3 + ctx.swap_targets().len());
}

#[test]
fn test_swap_targets_get_render_target_views() {
    let ctx = context();
    assert_eq!(ctx.swap_targets().len(), 2);
    for (idx, id) in ctx.swap_targets().iter().enumerate() {
        let record = ctx.registry().lookup(*id);
        assert_eq!(record.kind(), ResourceKind::SwapTarget);
        assert_eq!(record.image(), Some(ctx.backend().swap_targets()[idx]));
        assert_eq!(ctx.registry().gpu_view(*id).heap, DescriptorHeapKind::RenderTarget);
    }
}
