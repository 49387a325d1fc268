use ash::vk;

use crate::descriptors::{DescriptorHeapKind, DescriptorSlot, GfxViewDesc};
use crate::resources::handles::GfxImageHandle;

/// CbvSrvUav 堆在 descriptor set 中的 binding
///
/// 三个 binding 共用同一套槽位编号：一个槽位里写的是哪种 view，shader 就从对应的 binding 读取。
pub(crate) mod binding {
    pub const SAMPLED_IMAGE: u32 = 0;
    pub const STORAGE_IMAGE: u32 = 1;
    pub const UNIFORM_BUFFER: u32 = 2;
    /// Sampler 堆只有这一个 binding
    pub const SAMPLER: u32 = 0;
}

/// 槽位中的 view 以及为它创建的 Vulkan 对象
pub(crate) struct VulkanSlot {
    pub desc: GfxViewDesc,
    pub image_view: vk::ImageView,
    pub sampler: vk::Sampler,
}

/// shader 可见的堆对应一个 descriptor set
pub(crate) struct VulkanSetStorage {
    pub pool: vk::DescriptorPool,
    pub layout: vk::DescriptorSetLayout,
    pub set: vk::DescriptorSet,
}

/// 一种描述符堆
///
/// shader 不可见的堆（RTV、DSV、CPU 侧的 CbvSrvUav）只在 CPU 上保存 view，录制命令时直接取出 image view。
pub(crate) struct VulkanDescriptorHeap {
    pub kind: DescriptorHeapKind,
    pub slots: Vec<Option<VulkanSlot>>,
    pub storage: Option<VulkanSetStorage>,
}

// new & init
impl VulkanDescriptorHeap {
    pub fn new(device: &ash::Device, kind: DescriptorHeapKind, capacity: u32) -> Result<Self, vk::Result> {
        let storage = match kind {
            DescriptorHeapKind::CbvSrvUav => Some(Self::create_set(
                device,
                &[
                    (binding::SAMPLED_IMAGE, vk::DescriptorType::SAMPLED_IMAGE),
                    (binding::STORAGE_IMAGE, vk::DescriptorType::STORAGE_IMAGE),
                    (binding::UNIFORM_BUFFER, vk::DescriptorType::UNIFORM_BUFFER),
                ],
                capacity,
            )?),
            DescriptorHeapKind::Sampler => {
                Some(Self::create_set(device, &[(binding::SAMPLER, vk::DescriptorType::SAMPLER)], capacity)?)
            }
            _ => None,
        };

        Ok(Self {
            kind,
            slots: (0..capacity).map(|_| None).collect(),
            storage,
        })
    }

    fn create_set(
        device: &ash::Device,
        bindings: &[(u32, vk::DescriptorType)],
        capacity: u32,
    ) -> Result<VulkanSetStorage, vk::Result> {
        let layout_bindings = bindings
            .iter()
            .map(|(binding, ty)| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(*binding)
                    .descriptor_type(*ty)
                    .descriptor_count(capacity)
                    .stage_flags(vk::ShaderStageFlags::ALL_GRAPHICS)
            })
            .collect::<Vec<_>>();
        let binding_flags = vec![
            vk::DescriptorBindingFlags::PARTIALLY_BOUND | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND;
            bindings.len()
        ];

        let mut binding_flags_ci = vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&binding_flags);
        let layout_ci = vk::DescriptorSetLayoutCreateInfo::default()
            .flags(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
            .bindings(&layout_bindings)
            .push_next(&mut binding_flags_ci);
        let layout = unsafe { device.create_descriptor_set_layout(&layout_ci, None)? };

        let pool_sizes = bindings
            .iter()
            .map(|(_, ty)| vk::DescriptorPoolSize {
                ty: *ty,
                descriptor_count: capacity,
            })
            .collect::<Vec<_>>();
        let pool_ci = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND)
            .max_sets(1)
            .pool_sizes(&pool_sizes);
        let pool = unsafe { device.create_descriptor_pool(&pool_ci, None)? };

        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(std::slice::from_ref(&layout));
        let set = unsafe { device.allocate_descriptor_sets(&alloc_info)? }[0];

        Ok(VulkanSetStorage { pool, layout, set })
    }
}
// getters
impl VulkanDescriptorHeap {
    #[inline]
    pub fn slot(&self, slot: DescriptorSlot) -> Option<&VulkanSlot> {
        self.slots.get(slot.index() as usize)?.as_ref()
    }

    #[inline]
    pub fn set_layout(&self) -> Option<vk::DescriptorSetLayout> {
        self.storage.as_ref().map(|s| s.layout)
    }

    #[inline]
    pub fn set(&self) -> Option<vk::DescriptorSet> {
        self.storage.as_ref().map(|s| s.set)
    }
}
// tools
impl VulkanDescriptorHeap {
    /// 放入新的 view，返回被替换掉的旧 view
    pub fn replace(&mut self, slot: DescriptorSlot, new: VulkanSlot) -> Option<VulkanSlot> {
        self.slots.get_mut(slot.index() as usize).and_then(|entry| entry.replace(new))
    }

    /// 取出所有引用该 image 的 view
    pub fn take_views_of(&mut self, image: GfxImageHandle) -> Vec<VulkanSlot> {
        self.slots
            .iter_mut()
            .filter(|entry| entry.as_ref().is_some_and(|s| s.desc.image() == Some(image)))
            .filter_map(Option::take)
            .collect()
    }
}
// destroy
impl VulkanDescriptorHeap {
    pub fn destroy(&mut self, device: &ash::Device) {
        log::debug!("destroying descriptor heap {:?}", self.kind);
        for slot in self.slots.iter_mut().filter_map(Option::take) {
            destroy_slot(device, slot);
        }
        if let Some(storage) = self.storage.take() {
            unsafe {
                // set 随 pool 一起释放
                device.destroy_descriptor_pool(storage.pool, None);
                device.destroy_descriptor_set_layout(storage.layout, None);
            }
        }
    }
}

pub(crate) fn destroy_slot(device: &ash::Device, slot: VulkanSlot) {
    unsafe {
        if slot.image_view != vk::ImageView::null() {
            device.destroy_image_view(slot.image_view, None);
        }
        if slot.sampler != vk::Sampler::null() {
            device.destroy_sampler(slot.sampler, None);
        }
    }
}
