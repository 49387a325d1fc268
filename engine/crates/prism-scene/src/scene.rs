use prism_gfx::commands::command_list::GfxCommandList;
use prism_gfx::descriptors::{GfxAddressMode, GfxFilter, GfxSamplerDesc};
use prism_gfx::{GfxBackend, GfxResult};
use prism_render_interface::constant_buffer::ConstantBuffer;
use prism_render_interface::handles::{BindingTableId, ResourceId};
use prism_render_interface::render_context::RenderContext;
use prism_render_interface::resource_registry::ResourceRegistry;
use slotmap::SlotMap;

use crate::builtin::BuiltinTextures;
use crate::constants::SceneConstants;
use crate::draw::{FrameBindings, record_draw};
use crate::handles::{MaterialHandle, ModelHandle};
use crate::material::Material;
use crate::model::{GpuModel, single_resource_table};
use crate::skybox::Skybox;

pub struct SceneObject {
    pub model: GpuModel,
    /// 为空时使用默认材质
    pub material: Option<MaterialHandle>,
}

/// 场景中所有可绘制的东西
pub struct Scene {
    builtins: BuiltinTextures,
    scene_constants: ConstantBuffer<SceneConstants>,
    bindings: FrameBindings,
    default_material: Material,

    objects: SlotMap<ModelHandle, SceneObject>,
    materials: SlotMap<MaterialHandle, Material>,
    skybox: Option<Skybox>,
}

// new & init
impl Scene {
    /// 创建内置纹理、场景常量与 sampler table，需要一段正在录制的命令流
    pub fn new<B: GfxBackend>(ctx: &mut RenderContext<B>) -> GfxResult<Self> {
        let _span = tracy_client::span!("Scene::new");

        let builtins = BuiltinTextures::new(ctx)?;
        let scene_constants = ctx.create_constant_buffer("scene constants", SceneConstants::default())?;
        let scene_table = single_resource_table(ctx, "scene", scene_constants.resource())?;
        let samplers = ctx.create_sampler_table(
            "samplers",
            &[
                GfxSamplerDesc {
                    filter: GfxFilter::Linear,
                    address_mode: GfxAddressMode::Wrap,
                },
                GfxSamplerDesc {
                    filter: GfxFilter::Linear,
                    address_mode: GfxAddressMode::Clamp,
                },
            ],
        )?;
        let default_material = Material::default_material(ctx, &builtins)?;

        Ok(Self {
            builtins,
            scene_constants,
            bindings: FrameBindings {
                scene: scene_table,
                samplers,
                lighting: None,
            },
            default_material,
            objects: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            skybox: None,
        })
    }
}
// getters
impl Scene {
    #[inline]
    pub fn builtins(&self) -> &BuiltinTextures {
        &self.builtins
    }

    #[inline]
    pub fn bindings(&self) -> &FrameBindings {
        &self.bindings
    }

    #[inline]
    pub fn scene_constants(&self) -> &SceneConstants {
        self.scene_constants.value()
    }

    #[inline]
    pub fn default_material(&self) -> &Material {
        &self.default_material
    }

    #[inline]
    pub fn object(&self, handle: ModelHandle) -> Option<&SceneObject> {
        self.objects.get(handle)
    }

    #[inline]
    pub fn object_mut(&mut self, handle: ModelHandle) -> Option<&mut SceneObject> {
        self.objects.get_mut(handle)
    }

    #[inline]
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    #[inline]
    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    #[inline]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}
// tools
impl Scene {
    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    pub fn add_model(&mut self, model: GpuModel, material: Option<MaterialHandle>) -> ModelHandle {
        self.objects.insert(SceneObject { model, material })
    }

    pub fn set_skybox(&mut self, skybox: Skybox) {
        self.skybox = Some(skybox);
    }

    /// split-sum 查找表与累积 UAV 组成 lighting table，之后每次绘制都会绑定它
    pub fn set_lighting<B: GfxBackend>(
        &mut self,
        ctx: &mut RenderContext<B>,
        split_sum: ResourceId,
        accumulation: ResourceId,
    ) -> GfxResult<BindingTableId> {
        let table = ctx.create_binding_table("lighting", &[split_sum, accumulation])?;
        self.bindings.lighting = Some(table);
        Ok(table)
    }

    pub fn update_camera<B: GfxBackend>(&mut self, ctx: &mut RenderContext<B>, constants: SceneConstants) -> GfxResult<()> {
        ctx.write_constant_buffer(&mut self.scene_constants, constants)
    }

    /// 先画天空盒，再画所有物体，返回 draw call 的数量
    pub fn record(&self, registry: &ResourceRegistry, commands: &mut GfxCommandList) -> GfxResult<u32> {
        let _span = tracy_client::span!("Scene::record");

        let mut draws = 0;
        if let Some(skybox) = &self.skybox {
            draws += record_draw(registry, commands, &self.bindings, skybox.cube(), skybox.table())?;
        }
        for object in self.objects.values() {
            let material = object
                .material
                .and_then(|h| self.materials.get(h))
                .unwrap_or(&self.default_material);
            draws += record_draw(registry, commands, &self.bindings, &object.model, material.table())?;
        }
        Ok(draws)
    }
}
