use prism_asset::ImageData;
use prism_gfx::basic::format::GfxFormat;
use prism_gfx::resources::desc::GfxImageDesc;
use prism_gfx::{GfxBackend, GfxResult};
use prism_render_interface::handles::ResourceId;
use prism_render_interface::render_context::RenderContext;

/// 1x1 的内置纹理，用于没有指定贴图的模型和材质
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinTextures {
    pub white: ResourceId,
    pub black: ResourceId,
    /// 切线空间中朝外的法线 (0, 0, 1)
    pub flat_normal: ResourceId,
}

impl BuiltinTextures {
    /// 需要一段正在录制的命令流
    pub fn new<B: GfxBackend>(ctx: &mut RenderContext<B>) -> GfxResult<Self> {
        let _span = tracy_client::span!("BuiltinTextures::new");

        let mut solid = |name: &str, rgba: [u8; 4]| {
            let desc = GfxImageDesc::texture_2d(1, 1, GfxFormat::Rgba8Unorm, 1);
            let pixel = ImageData::solid(1, 1, rgba);
            ctx.create_texture(&desc, Some(std::slice::from_ref(&pixel)), name)
        };
        Ok(Self {
            white: solid("builtin-white", [255, 255, 255, 255])?,
            black: solid("builtin-black", [0, 0, 0, 255])?,
            flat_normal: solid("builtin-flat-normal", [128, 128, 255, 255])?,
        })
    }
}
