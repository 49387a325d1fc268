use prism_gfx::commands::command_list::{GfxAttachment, GfxCommandList, GfxRenderingInfo};
use prism_gfx::{GfxError, GfxResult};
use prism_render_interface::handles::{BindingTableId, ResourceId};
use prism_render_interface::render_context::FrameTarget;
use prism_render_interface::resource_registry::ResourceRegistry;

use crate::model::GpuModel;

/// shader 中各个 descriptor table 的 root index
pub mod root_index {
    pub const SCENE_CONSTANTS: u32 = 0;
    pub const OBJECT_CONSTANTS: u32 = 1;
    pub const DIFFUSE: u32 = 2;
    pub const MATERIAL: u32 = 3;
    pub const SAMPLERS: u32 = 4;
    /// split-sum 查找表与累积 UAV
    pub const LIGHTING: u32 = 5;
}

/// 一帧内所有绘制共享的 table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBindings {
    pub scene: BindingTableId,
    pub samplers: BindingTableId,
    pub lighting: Option<BindingTableId>,
}

fn bind_table(registry: &ResourceRegistry, commands: &mut GfxCommandList, root: u32, table: BindingTableId) {
    let table = registry.binding_table(table);
    commands.bind_descriptor_table(root, table.heap(), table.first());
}

/// 开始主 pass：清除 swap target，可选地带上深度缓冲
pub fn begin_main_pass(
    registry: &ResourceRegistry,
    commands: &mut GfxCommandList,
    target: &FrameTarget,
    depth: Option<ResourceId>,
    clear_color: [f32; 4],
) -> GfxResult<()> {
    let depth = depth
        .map(|id| {
            let image = registry
                .lookup(id)
                .image()
                .ok_or_else(|| GfxError::InvalidState(format!("{id} is not a depth image")))?;
            Ok(GfxAttachment {
                image,
                view: registry.gpu_view(id).slot,
            })
        })
        .transpose()?;

    commands.begin_rendering(GfxRenderingInfo {
        color: GfxAttachment {
            image: target.image,
            view: target.rtv.slot,
        },
        clear_depth: depth.map(|_| 1.0),
        depth,
        clear_color: Some(clear_color),
        extent: target.extent,
    });
    Ok(())
}

/// 绑定共享 table、物体常量与材质，然后为每个子物体绑定漫反射贴图与顶点 buffer 并绘制
///
/// 调用前需要已经绑定 pipeline 并处于渲染 pass 中。返回 draw call 的数量。
pub fn record_draw(
    registry: &ResourceRegistry,
    commands: &mut GfxCommandList,
    frame: &FrameBindings,
    model: &GpuModel,
    material: BindingTableId,
) -> GfxResult<u32> {
    bind_table(registry, commands, root_index::SCENE_CONSTANTS, frame.scene);
    bind_table(registry, commands, root_index::SAMPLERS, frame.samplers);
    if let Some(lighting) = frame.lighting {
        bind_table(registry, commands, root_index::LIGHTING, lighting);
    }
    bind_table(registry, commands, root_index::OBJECT_CONSTANTS, model.object_table());
    bind_table(registry, commands, root_index::MATERIAL, material);

    let mut draws = 0;
    for sub in model.sub_objects() {
        let buffer = registry
            .lookup(sub.vertex_buffer)
            .buffer()
            .ok_or_else(|| GfxError::InvalidState(format!("{} '{}' is not a buffer", sub.vertex_buffer, sub.name)))?;
        bind_table(registry, commands, root_index::DIFFUSE, sub.diffuse_table);
        commands.bind_vertex_buffer(buffer, 0);
        commands.draw(sub.vertex_count, 1, 0, 0);
        draws += 1;
    }
    Ok(draws)
}
