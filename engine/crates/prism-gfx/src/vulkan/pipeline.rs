use ash::vk;

use crate::error::{GfxError, GfxResult};
use crate::pipeline::{GfxPipelineDesc, MAX_DESCRIPTOR_TABLES};
use crate::vulkan::convert;

/// push constant 中每个 descriptor table 的起始槽位
pub(crate) const TABLE_PUSH_CONSTANT_SIZE: u32 = MAX_DESCRIPTOR_TABLES * size_of::<u32>() as u32;

pub(crate) struct VulkanPipeline {
    pub name: String,
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

impl VulkanPipeline {
    /// 使用动态渲染，不需要 render pass；viewport 和 scissor 在 `BeginRendering` 时设置
    pub fn new(device: &ash::Device, desc: &GfxPipelineDesc, set_layouts: &[vk::DescriptorSetLayout]) -> GfxResult<Self> {
        let _span = tracy_client::span!("VulkanPipeline::new");

        let creation_err = |reason: String| GfxError::ResourceCreation {
            kind: "pipeline",
            name: desc.name.clone(),
            reason,
        };
        if desc.vertex_spirv.is_empty() || desc.fragment_spirv.is_empty() {
            return Err(creation_err("missing SPIR-V".to_string()));
        }

        let push_constant_range = vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::ALL_GRAPHICS)
            .offset(0)
            .size(TABLE_PUSH_CONSTANT_SIZE);
        let layout_ci = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(set_layouts)
            .push_constant_ranges(std::slice::from_ref(&push_constant_range));
        let layout = unsafe { device.create_pipeline_layout(&layout_ci, None)? };

        let vertex_module = Self::shader_module(device, &desc.vertex_spirv);
        let fragment_module = Self::shader_module(device, &desc.fragment_spirv);
        let pipeline = match (vertex_module, fragment_module) {
            (Ok(vertex), Ok(fragment)) => Self::create_pipeline(device, desc, layout, vertex, fragment),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        unsafe {
            for module in [vertex_module, fragment_module].into_iter().flatten() {
                device.destroy_shader_module(module, None);
            }
        }

        match pipeline {
            Ok(pipeline) => Ok(Self {
                name: desc.name.clone(),
                pipeline,
                layout,
            }),
            Err(e) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                Err(creation_err(format!("{e}")))
            }
        }
    }

    fn shader_module(device: &ash::Device, spirv: &[u32]) -> Result<vk::ShaderModule, vk::Result> {
        let module_ci = vk::ShaderModuleCreateInfo::default().code(spirv);
        unsafe { device.create_shader_module(&module_ci, None) }
    }

    fn create_pipeline(
        device: &ash::Device,
        desc: &GfxPipelineDesc,
        layout: vk::PipelineLayout,
        vertex: vk::ShaderModule,
        fragment: vk::ShaderModule,
    ) -> Result<vk::Pipeline, vk::Result> {
        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment)
                .name(c"main"),
        ];

        let vertex_binding = vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(desc.vertex_stride)
            .input_rate(vk::VertexInputRate::VERTEX);
        let vertex_attributes = desc
            .vertex_attributes
            .iter()
            .map(|attr| {
                vk::VertexInputAttributeDescription::default()
                    .location(attr.location)
                    .binding(0)
                    .format(convert::vk_format(attr.format))
                    .offset(attr.offset)
            })
            .collect::<Vec<_>>();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(std::slice::from_ref(&vertex_binding))
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly =
            vk::PipelineInputAssemblyStateCreateInfo::default().topology(vk::PrimitiveTopology::TRIANGLE_LIST);
        let viewport = vk::PipelineViewportStateCreateInfo::default().viewport_count(1).scissor_count(1);
        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(if desc.cull_back_faces { vk::CullModeFlags::BACK } else { vk::CullModeFlags::NONE })
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);
        let multisample =
            vk::PipelineMultisampleStateCreateInfo::default().rasterization_samples(vk::SampleCountFlags::TYPE_1);
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth_format.is_some())
            .depth_write_enable(desc.depth_format.is_some() && desc.depth_write)
            .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL);
        let color_attachment = vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA);
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(std::slice::from_ref(&color_attachment));
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let color_formats = [convert::vk_format(desc.color_format)];
        let mut rendering_ci = vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);
        if let Some(depth_format) = desc.depth_format {
            rendering_ci = rendering_ci.depth_attachment_format(convert::vk_format(depth_format));
        }

        let pipeline_ci = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic)
            .layout(layout)
            .push_next(&mut rendering_ci);

        let pipelines = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_ci), None)
                .map_err(|(_, e)| e)?
        };
        Ok(pipelines[0])
    }

    pub fn destroy(self, device: &ash::Device) {
        log::debug!("destroying pipeline {}", self.name);
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
        }
    }
}
