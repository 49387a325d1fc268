use std::ffi::{CStr, CString, c_char};

use ash::vk;

use crate::error::{GfxError, GfxResult};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// instance、物理设备、逻辑设备以及唯一的 graphics queue
///
/// 需要 Vulkan 1.3：动态渲染、synchronization2、timeline semaphore 都直接使用 core 接口。
pub(crate) struct VulkanDevice {
    _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    debug_msger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    debug_utils: Option<ash::ext::debug_utils::Device>,

    pub(crate) pdevice: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) queue: vk::Queue,
    pub(crate) queue_family: u32,

    pub(crate) limits: vk::PhysicalDeviceLimits,
}

// new & init
impl VulkanDevice {
    pub(crate) fn new(app_name: &str, validation: bool) -> GfxResult<Self> {
        let _span = tracy_client::span!("VulkanDevice::new");

        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GfxError::DeviceInit(format!("failed to load vulkan loader: {e}")))?;

        let validation = validation && Self::layer_supported(&entry, VALIDATION_LAYER)?;
        let instance = Self::create_instance(&entry, app_name, validation)?;

        let debug_msger = if validation {
            let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger = unsafe { loader.create_debug_utils_messenger(&debug_utils_messenger_ci(), None)? };
            Some((loader, messenger))
        } else {
            None
        };

        let (pdevice, queue_family) = Self::pick_physical_device(&instance)?;
        let props = unsafe { instance.get_physical_device_properties(pdevice) };
        let device_name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) };
        log::info!("physical device: {:?}, api {}.{}", device_name, vk::api_version_major(props.api_version), vk::api_version_minor(props.api_version));

        let device = Self::create_device(&instance, pdevice, queue_family)?;
        let queue = unsafe { device.get_device_queue(queue_family, 0) };
        let debug_utils = validation.then(|| ash::ext::debug_utils::Device::new(&instance, &device));

        Ok(Self {
            _entry: entry,
            instance,
            debug_msger,
            debug_utils,
            pdevice,
            device,
            queue,
            queue_family,
            limits: props.limits,
        })
    }

    fn layer_supported(entry: &ash::Entry, layer: &CStr) -> GfxResult<bool> {
        let all_layer_props = unsafe { entry.enumerate_instance_layer_properties()? };
        let supported = all_layer_props
            .iter()
            .any(|available| layer == unsafe { CStr::from_ptr(available.layer_name.as_ptr()) });
        if !supported {
            log::warn!("validation requested but layer {:?} is not installed", layer);
        }
        Ok(supported)
    }

    fn create_instance(entry: &ash::Entry, app_name: &str, validation: bool) -> GfxResult<ash::Instance> {
        let app_name = CString::new(app_name).map_err(|e| GfxError::DeviceInit(format!("invalid app name: {e}")))?;
        let app_info = vk::ApplicationInfo::default()
            .api_version(vk::API_VERSION_1_3)
            .application_name(app_name.as_ref())
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"prism")
            .engine_version(vk::make_api_version(0, 1, 0, 0));

        let mut enabled_extensions: Vec<*const c_char> = Vec::new();
        let mut enabled_layers: Vec<*const c_char> = Vec::new();
        if validation {
            enabled_extensions.push(vk::EXT_DEBUG_UTILS_NAME.as_ptr());
            enabled_layers.push(VALIDATION_LAYER.as_ptr());
        }
        log::info!("instance validation: {}", validation);

        let mut instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&enabled_extensions)
            .enabled_layer_names(&enabled_layers);

        // 让 instance 创建和销毁过程中的消息也能输出
        let mut debug_utils_messenger_ci = debug_utils_messenger_ci();
        if validation {
            instance_ci = instance_ci.push_next(&mut debug_utils_messenger_ci);
        }

        Ok(unsafe { entry.create_instance(&instance_ci, None)? })
    }

    /// 优先选择独立显卡，要求支持 1.3 以及一个 graphics queue family
    fn pick_physical_device(instance: &ash::Instance) -> GfxResult<(vk::PhysicalDevice, u32)> {
        let pdevices = unsafe { instance.enumerate_physical_devices()? };

        let mut candidates = pdevices
            .into_iter()
            .filter_map(|pdevice| {
                let props = unsafe { instance.get_physical_device_properties(pdevice) };
                if props.api_version < vk::API_VERSION_1_3 {
                    return None;
                }
                let queue_family = unsafe { instance.get_physical_device_queue_family_properties(pdevice) }
                    .iter()
                    .position(|q| q.queue_flags.contains(vk::QueueFlags::GRAPHICS))?;
                Some((pdevice, queue_family as u32, props.device_type))
            })
            .collect::<Vec<_>>();
        candidates.sort_by_key(|(_, _, ty)| if *ty == vk::PhysicalDeviceType::DISCRETE_GPU { 0 } else { 1 });

        candidates
            .first()
            .map(|(pdevice, queue_family, _)| (*pdevice, *queue_family))
            .ok_or_else(|| GfxError::DeviceInit("no physical device supports vulkan 1.3 with a graphics queue".to_string()))
    }

    fn create_device(instance: &ash::Instance, pdevice: vk::PhysicalDevice, queue_family: u32) -> GfxResult<ash::Device> {
        let queue_priorities = [1.0];
        let queue_ci = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family)
            .queue_priorities(&queue_priorities);

        let mut all_features = vk::PhysicalDeviceFeatures2::default().features(vk::PhysicalDeviceFeatures::default());
        let mut extra_features = Self::physical_device_extra_features();
        unsafe {
            extra_features.iter_mut().for_each(|f| {
                let ptr = <*mut dyn vk::ExtendsPhysicalDeviceFeatures2>::cast::<vk::BaseOutStructure>(f.as_mut());
                (*ptr).p_next = all_features.p_next as _;
                all_features.p_next = ptr as _;
            });
        }

        let device_ci = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_ci))
            .push_next(&mut all_features);

        Ok(unsafe { instance.create_device(pdevice, &device_ci, None)? })
    }

    /// 必要的 physical device features，都已经提升到 core 1.3
    fn physical_device_extra_features() -> Vec<Box<dyn vk::ExtendsPhysicalDeviceFeatures2>> {
        vec![
            Box::new(vk::PhysicalDeviceDynamicRenderingFeatures::default().dynamic_rendering(true)),
            Box::new(vk::PhysicalDeviceSynchronization2Features::default().synchronization2(true)),
            Box::new(vk::PhysicalDeviceTimelineSemaphoreFeatures::default().timeline_semaphore(true)),
            Box::new(
                vk::PhysicalDeviceDescriptorIndexingFeatures::default()
                    .descriptor_binding_partially_bound(true)
                    .runtime_descriptor_array(true)
                    .shader_sampled_image_array_non_uniform_indexing(true)
                    .descriptor_binding_sampled_image_update_after_bind(true)
                    .descriptor_binding_storage_image_update_after_bind(true)
                    .descriptor_binding_uniform_buffer_update_after_bind(true),
            ),
        ]
    }
}
// tools
impl VulkanDevice {
    /// 只在打开 validation 时生效
    pub(crate) fn set_debug_name(&self, handle: impl vk::Handle, name: &str) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let Ok(name) = CString::new(name) else {
            return;
        };
        let name_info = vk::DebugUtilsObjectNameInfoEXT::default().object_handle(handle).object_name(&name);
        if let Err(e) = unsafe { debug_utils.set_debug_utils_object_name(&name_info) } {
            log::warn!("failed to set debug name {:?}: {}", name, e);
        }
    }
}
// destroy
impl VulkanDevice {
    /// 调用前设备上的所有对象都必须已经销毁
    pub(crate) fn destroy(&mut self) {
        log::info!("destroying vulkan device");
        unsafe {
            self.device.destroy_device(None);
            if let Some((loader, messenger)) = self.debug_msger.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// debug messenger 的回调函数，把消息转到 log
unsafe extern "system" fn vk_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let callback_data = unsafe { *p_callback_data };
    let msg = if callback_data.p_message.is_null() {
        std::borrow::Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("[{:?}] {}", message_type, msg),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("[{:?}] {}", message_type, msg),
        _ => log::info!("[{:?}] {}", message_type, msg),
    };

    // 只有 layer developer 才需要返回 True
    vk::FALSE
}

fn debug_utils_messenger_ci() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR)
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vk_debug_callback))
}
