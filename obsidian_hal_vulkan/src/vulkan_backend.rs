/// VulkanBackend - the production implementation of the HAL `Backend` trait
///
/// Owns the instance, the logical device, the allocator and the graphics
/// queue. Every `Backend` call is a thin translation to the resource modules
/// (`vulkan_buffer`, `vulkan_texture`, ...), which keep no state of their own.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use obsidian_hal::obsidian::{
    AcquireResult, AttachmentPlan, Backend, DataFormat, DeviceConfig, FormatProperties, ImageDesc,
    ImageUpload, ImageViewDesc, NativeBufferDesc, PresentResult, SamplerDesc, SurfaceCapabilities,
    SwapchainDesc, SwapchainInfo,
};
use obsidian_hal::{hal_err, hal_info, hal_warn, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::Mutex;

use crate::vulkan_buffer::{self, Buffer};
use crate::vulkan_context::{vk_error, GpuContext};
use crate::vulkan_format::{format_features_from_vk, format_to_vk};
use crate::vulkan_render_pass;
use crate::vulkan_sampler::{self, AnisotropySupport};
use crate::vulkan_swapchain::{PresentContext, Swapchain};
use crate::vulkan_sync;
use crate::vulkan_texture::{self, Image};

const SOURCE: &str = "obsidian::vulkan";

/// Vulkan implementation of [`Backend`]
pub struct VulkanBackend {
    /// Vulkan entry point (kept alive for the lifetime of the instance)
    pub(crate) entry: ash::Entry,
    /// Vulkan instance
    pub(crate) instance: ash::Instance,
    /// Selected physical device
    pub(crate) physical_device: vk::PhysicalDevice,

    /// Device, allocator, queue and command pools
    ctx: GpuContext,
    /// Surface and swapchain loaders
    present: PresentContext,

    device_name: String,
    vendor: String,
    anisotropy: AnisotropySupport,

    /// Validation messenger, present only when validation is enabled
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

/// Physical device, graphics family and whether it is a discrete GPU
struct DeviceCandidate {
    physical_device: vk::PhysicalDevice,
    graphics_family: u32,
    discrete: bool,
}

impl VulkanBackend {
    /// Create a Vulkan backend able to present to `window`
    ///
    /// # Arguments
    ///
    /// * `window` - Window used to pick a queue family that can present
    /// * `config` - Device configuration (application info, validation)
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &DeviceConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                hal_err!(InitializationFailed, SOURCE, "Failed to load Vulkan library: {:?}", e)
            })?;

            let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
                hal_err!(ConfigurationError, SOURCE, "Invalid application name: {}", e)
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Obsidian")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_1);

            let display_handle = window.display_handle().map_err(|e| {
                hal_err!(InitializationFailed, SOURCE, "Failed to get display handle: {}", e)
            })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    hal_err!(InitializationFailed, SOURCE, "Failed to get required extensions: {}", e)
                })?
                .to_vec();

            let validation = config.enable_validation && validation_available(&entry);
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                hal_err!(InitializationFailed, SOURCE, "Failed to create Vulkan instance: {:?}", e)
            })?;

            // From here on a failure must destroy what was created
            let debug_messenger = if validation {
                match create_debug_messenger(&entry, &instance, config) {
                    Ok(messenger) => messenger,
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(e);
                    }
                }
            } else {
                None
            };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let candidate = match pick_physical_device(&entry, &instance, &surface_loader, window) {
                Ok(candidate) => candidate,
                Err(e) => {
                    destroy_instance(&instance, debug_messenger.as_ref());
                    return Err(e);
                }
            };

            match Self::create_device(entry.clone(), instance.clone(), surface_loader, candidate, debug_messenger.clone()) {
                Ok(backend) => Ok(backend),
                Err(e) => {
                    destroy_instance(&instance, debug_messenger.as_ref());
                    Err(e)
                }
            }
        }
    }

    unsafe fn create_device(
        entry: ash::Entry,
        instance: ash::Instance,
        surface_loader: ash::khr::surface::Instance,
        candidate: DeviceCandidate,
        debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    ) -> Result<Self> {
        let physical_device = candidate.physical_device;
        let properties = instance.get_physical_device_properties(physical_device);
        let supported_features = instance.get_physical_device_features(physical_device);
        let anisotropy = AnisotropySupport {
            enabled: supported_features.sampler_anisotropy == vk::TRUE,
            max: properties.limits.max_sampler_anisotropy,
        };

        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(candidate.graphics_family)
            .queue_priorities(&queue_priorities)];

        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

        let device_features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(anisotropy.enabled);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        let device = instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(|e| hal_err!(InitializationFailed, SOURCE, "Failed to create logical device: {:?}", e))?;

        let graphics_queue = device.get_device_queue(candidate.graphics_family, 0);

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                device.destroy_device(None);
                return Err(hal_err!(InitializationFailed, SOURCE, "Failed to create GPU allocator: {:?}", e));
            }
        };

        let pools = create_command_objects(&device, candidate.graphics_family);
        let (upload_command_pool, frame_command_pool, upload_fence) = match pools {
            Ok(pools) => pools,
            Err(e) => {
                drop(allocator);
                device.destroy_device(None);
                return Err(e);
            }
        };

        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

        let device_name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown device".to_string());
        let vendor = vendor_name(properties.vendor_id);

        hal_info!(
            SOURCE,
            "Vulkan device: {} ({}), graphics family {}, {}",
            device_name,
            vendor,
            candidate.graphics_family,
            if candidate.discrete { "discrete" } else { "integrated" }
        );

        Ok(Self {
            entry,
            instance,
            physical_device,
            ctx: GpuContext {
                device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                graphics_queue,
                graphics_queue_family: candidate.graphics_family,
                upload_command_pool,
                upload_fence,
                frame_command_pool: Mutex::new(frame_command_pool),
            },
            present: PresentContext {
                physical_device,
                surface_loader,
                swapchain_loader,
            },
            device_name,
            vendor,
            anisotropy,
            debug_messenger,
        })
    }

    /// Logical device, for recording into command buffers
    pub fn device(&self) -> &ash::Device {
        &self.ctx.device
    }

    /// Queue family of the graphics queue
    pub fn graphics_queue_family(&self) -> u32 {
        self.ctx.graphics_queue_family
    }

    // ===== FRAME COMMAND BUFFERS =====

    /// Allocate primary command buffers for frame recording
    pub fn allocate_command_buffers(&self, count: u32) -> Result<Vec<vk::CommandBuffer>> {
        let pool = self
            .ctx
            .frame_command_pool
            .lock()
            .map_err(|_| hal_err!(BackendError, SOURCE, "Frame command pool lock poisoned"))?;

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.ctx
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| vk_error("Failed to allocate frame command buffers", e))
        }
    }

    /// Free command buffers returned by [`allocate_command_buffers`](Self::allocate_command_buffers)
    ///
    /// The GPU must be done with them (their frame fence has been waited).
    pub fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) -> Result<()> {
        let pool = self
            .ctx
            .frame_command_pool
            .lock()
            .map_err(|_| hal_err!(BackendError, SOURCE, "Frame command pool lock poisoned"))?;
        unsafe {
            self.ctx.device.free_command_buffers(*pool, command_buffers);
        }
        Ok(())
    }

    /// Reset `command_buffer`, record it with `record` and end it
    pub fn record_commands<F>(&self, command_buffer: vk::CommandBuffer, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        unsafe {
            self.ctx
                .device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| vk_error("Failed to reset command buffer", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx
                .device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| vk_error("Failed to begin command buffer", e))?;

            record(&self.ctx.device, command_buffer);

            self.ctx
                .device
                .end_command_buffer(command_buffer)
                .map_err(|e| vk_error("Failed to end command buffer", e))
        }
    }
}

impl Backend for VulkanBackend {
    type Buffer = Buffer;
    type Image = Image;
    type ImageHandle = vk::Image;
    type ImageView = vk::ImageView;
    type Sampler = vk::Sampler;
    type RenderPass = vk::RenderPass;
    type Framebuffer = vk::Framebuffer;
    type Semaphore = vk::Semaphore;
    type Fence = vk::Fence;
    type Swapchain = Swapchain;
    type NativeSurface = vk::SurfaceKHR;
    type CommandBuffer = vk::CommandBuffer;

    // ===== DEVICE INFO =====

    fn device_name(&self) -> String {
        self.device_name.clone()
    }

    fn vendor(&self) -> String {
        self.vendor.clone()
    }

    // ===== BUFFERS =====

    fn create_buffer(&mut self, desc: &NativeBufferDesc) -> Result<Buffer> {
        vulkan_buffer::create_buffer(&self.ctx, desc)
    }

    fn write_buffer(&mut self, buffer: &mut Buffer, offset: u64, data: &[u8]) -> Result<()> {
        vulkan_buffer::write_buffer(buffer, offset, data)
    }

    fn copy_buffer(&mut self, src: &Buffer, dst: &Buffer, size: u64) -> Result<()> {
        vulkan_buffer::copy_buffer(&self.ctx, src, dst, size)
    }

    fn destroy_buffer(&mut self, buffer: Buffer) {
        vulkan_buffer::destroy_buffer(&self.ctx, buffer);
    }

    // ===== IMAGES =====

    fn format_properties(&self, format: DataFormat) -> FormatProperties {
        let properties = unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format_to_vk(format))
        };
        FormatProperties {
            linear_tiling: format_features_from_vk(properties.linear_tiling_features),
            optimal_tiling: format_features_from_vk(properties.optimal_tiling_features),
        }
    }

    fn create_image(&mut self, desc: &ImageDesc) -> Result<Image> {
        vulkan_texture::create_image(&self.ctx, desc)
    }

    fn image_handle(&self, image: &Image) -> vk::Image {
        image.handle()
    }

    fn upload_image(&mut self, image: &Image, staging: Option<&Buffer>, upload: &ImageUpload) -> Result<()> {
        vulkan_texture::upload_image(&self.ctx, image, staging, upload)
    }

    fn create_image_view(&mut self, image: vk::Image, desc: &ImageViewDesc) -> Result<vk::ImageView> {
        vulkan_texture::create_image_view(&self.ctx, image, desc)
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        unsafe { self.ctx.device.destroy_image_view(view, None) }
    }

    fn destroy_image(&mut self, image: Image) {
        vulkan_texture::destroy_image(&self.ctx, image);
    }

    // ===== SAMPLERS =====

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<vk::Sampler> {
        vulkan_sampler::create_sampler(&self.ctx, self.anisotropy, desc)
    }

    fn destroy_sampler(&mut self, sampler: vk::Sampler) {
        unsafe { self.ctx.device.destroy_sampler(sampler, None) }
    }

    // ===== RENDER PASSES / FRAMEBUFFERS =====

    fn create_render_pass(&mut self, attachments: &[AttachmentPlan]) -> Result<vk::RenderPass> {
        vulkan_render_pass::create_render_pass(&self.ctx, attachments)
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        unsafe { self.ctx.device.destroy_render_pass(render_pass, None) }
    }

    fn create_framebuffer(
        &mut self,
        render_pass: &vk::RenderPass,
        views: &[&vk::ImageView],
        width: u32,
        height: u32,
    ) -> Result<vk::Framebuffer> {
        vulkan_render_pass::create_framebuffer(&self.ctx, *render_pass, views, width, height)
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        unsafe { self.ctx.device.destroy_framebuffer(framebuffer, None) }
    }

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&mut self) -> Result<vk::Semaphore> {
        vulkan_sync::create_semaphore(&self.ctx)
    }

    fn destroy_semaphore(&mut self, semaphore: vk::Semaphore) {
        unsafe { self.ctx.device.destroy_semaphore(semaphore, None) }
    }

    fn create_fence(&mut self, signaled: bool) -> Result<vk::Fence> {
        vulkan_sync::create_fence(&self.ctx, signaled)
    }

    fn destroy_fence(&mut self, fence: vk::Fence) {
        unsafe { self.ctx.device.destroy_fence(fence, None) }
    }

    fn wait_fence(&mut self, fence: &vk::Fence, timeout_ns: u64) -> Result<()> {
        vulkan_sync::wait_fence(&self.ctx, *fence, timeout_ns)
    }

    fn fence_signaled(&self, fence: &vk::Fence) -> Result<bool> {
        vulkan_sync::fence_signaled(&self.ctx, *fence)
    }

    fn reset_fence(&mut self, fence: &vk::Fence) -> Result<()> {
        vulkan_sync::reset_fence(&self.ctx, *fence)
    }

    // ===== PRESENTATION =====

    fn surface_capabilities(&self, surface: &vk::SurfaceKHR) -> Result<SurfaceCapabilities> {
        self.present.surface_capabilities(&self.ctx, *surface)
    }

    fn create_swapchain(
        &mut self,
        surface: &vk::SurfaceKHR,
        desc: &SwapchainDesc,
        old: Option<&Swapchain>,
    ) -> Result<(Swapchain, SwapchainInfo<vk::Image>)> {
        self.present.create_swapchain(*surface, desc, old)
    }

    fn destroy_swapchain(&mut self, swapchain: Swapchain) {
        self.present.destroy_swapchain(swapchain);
    }

    fn destroy_native_surface(&mut self, surface: vk::SurfaceKHR) {
        self.present.destroy_surface(surface);
    }

    fn acquire_next_image(
        &mut self,
        swapchain: &Swapchain,
        signal: &vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireResult> {
        self.present.acquire_next_image(swapchain, *signal, timeout_ns)
    }

    fn submit(
        &mut self,
        command_buffers: &[vk::CommandBuffer],
        wait: &vk::Semaphore,
        signal: &vk::Semaphore,
        fence: &vk::Fence,
    ) -> Result<()> {
        vulkan_sync::submit(&self.ctx, command_buffers, *wait, *signal, *fence)
    }

    fn present(&mut self, swapchain: &Swapchain, image_index: u32, wait: &vk::Semaphore) -> Result<PresentResult> {
        self.present.present(&self.ctx, swapchain, image_index, *wait)
    }

    fn wait_idle(&mut self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| vk_error("Failed to wait idle", e))
        }
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.ctx.device.device_wait_idle().ok();

            // 1. Command pools and the upload fence
            if let Ok(pool) = self.ctx.frame_command_pool.lock() {
                self.ctx.device.destroy_command_pool(*pool, None);
            }
            self.ctx.device.destroy_command_pool(self.ctx.upload_command_pool, None);
            self.ctx.device.destroy_fence(self.ctx.upload_fence, None);

            // 2. Drop allocator: free VkDeviceMemory pages BEFORE destroying device
            ManuallyDrop::drop(&mut self.ctx.allocator);

            // 3. Destroy device, then messenger and instance
            self.ctx.device.destroy_device(None);
            destroy_instance(&self.instance, self.debug_messenger.as_ref());
        }
    }
}

// ============================================================================
// Bring-up helpers
// ============================================================================

fn validation_available(entry: &ash::Entry) -> bool {
    if !cfg!(feature = "vulkan-validation") {
        hal_warn!(SOURCE, "Validation requested but the vulkan-validation feature is disabled");
        return false;
    }
    let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
    let available = layers.iter().any(|layer| {
        layer
            .layer_name_as_c_str()
            .map(|name| name == c"VK_LAYER_KHRONOS_validation")
            .unwrap_or(false)
    });
    if !available {
        hal_warn!(SOURCE, "VK_LAYER_KHRONOS_validation is not installed, validation disabled");
    }
    available
}

#[cfg(feature = "vulkan-validation")]
unsafe fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    config: &DeviceConfig,
) -> Result<Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>> {
    use crate::debug;

    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

    debug::init_debug_config(debug::Config {
        severity: config.debug_severity,
        enable_stats: true,
    });

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(debug::severity_flags(config.debug_severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug::vulkan_debug_callback));

    let messenger = debug_utils
        .create_debug_utils_messenger(&debug_info, None)
        .map_err(|e| hal_err!(InitializationFailed, SOURCE, "Failed to create debug messenger: {:?}", e))?;

    Ok(Some((debug_utils, messenger)))
}

#[cfg(not(feature = "vulkan-validation"))]
unsafe fn create_debug_messenger(
    _entry: &ash::Entry,
    _instance: &ash::Instance,
    _config: &DeviceConfig,
) -> Result<Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>> {
    Ok(None)
}

unsafe fn destroy_instance(
    instance: &ash::Instance,
    debug_messenger: Option<&(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
) {
    if let Some((debug_utils, messenger)) = debug_messenger {
        #[cfg(feature = "vulkan-validation")]
        crate::debug::cleanup_debug_config();
        debug_utils.destroy_debug_utils_messenger(*messenger, None);
    }
    instance.destroy_instance(None);
}

/// Pick a device with a graphics family that can present to `window`,
/// preferring discrete GPUs
unsafe fn pick_physical_device<W: HasDisplayHandle + HasWindowHandle>(
    entry: &ash::Entry,
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    window: &W,
) -> Result<DeviceCandidate> {
    // Temporary surface, only for queue selection
    let surface = crate::surface::create_window_surface_raw(entry, instance, window)?;

    let result = instance
        .enumerate_physical_devices()
        .map_err(|e| hal_err!(InitializationFailed, SOURCE, "Failed to enumerate physical devices: {:?}", e))
        .map(|devices| {
            let mut candidates: Vec<DeviceCandidate> = devices
                .into_iter()
                .filter(|&device| supports_swapchain(instance, device))
                .filter_map(|device| {
                    let families = instance.get_physical_device_queue_family_properties(device);
                    let graphics_family = (0..families.len() as u32).find(|&index| {
                        families[index as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                            && surface_loader
                                .get_physical_device_surface_support(device, index, surface)
                                .unwrap_or(false)
                    })?;
                    let properties = instance.get_physical_device_properties(device);
                    Some(DeviceCandidate {
                        physical_device: device,
                        graphics_family,
                        discrete: properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU,
                    })
                })
                .collect();
            // Stable sort: discrete first, enumeration order otherwise
            candidates.sort_by_key(|candidate| !candidate.discrete);
            candidates.into_iter().next()
        });

    surface_loader.destroy_surface(surface, None);

    result?.ok_or_else(|| {
        hal_err!(
            InitializationFailed,
            SOURCE,
            "No Vulkan device with a graphics queue that can present to the window"
        )
    })
}

unsafe fn supports_swapchain(instance: &ash::Instance, device: vk::PhysicalDevice) -> bool {
    instance
        .enumerate_device_extension_properties(device)
        .map(|extensions| {
            extensions.iter().any(|extension| {
                extension
                    .extension_name_as_c_str()
                    .map(|name| name == ash::khr::swapchain::NAME)
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

unsafe fn create_command_objects(
    device: &ash::Device,
    graphics_family: u32,
) -> Result<(vk::CommandPool, vk::CommandPool, vk::Fence)> {
    let pool_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(graphics_family)
        .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    let upload_pool = device.create_command_pool(&pool_info, None).map_err(|e| {
        hal_err!(InitializationFailed, SOURCE, "Failed to create upload command pool: {:?}", e)
    })?;

    let frame_pool = match device.create_command_pool(&pool_info, None) {
        Ok(pool) => pool,
        Err(e) => {
            device.destroy_command_pool(upload_pool, None);
            return Err(hal_err!(InitializationFailed, SOURCE, "Failed to create frame command pool: {:?}", e));
        }
    };

    match device.create_fence(&vk::FenceCreateInfo::default(), None) {
        Ok(fence) => Ok((upload_pool, frame_pool, fence)),
        Err(e) => {
            device.destroy_command_pool(frame_pool, None);
            device.destroy_command_pool(upload_pool, None);
            Err(hal_err!(InitializationFailed, SOURCE, "Failed to create upload fence: {:?}", e))
        }
    }
}

/// Human-readable vendor from a PCI vendor id
pub(crate) fn vendor_name(vendor_id: u32) -> String {
    match vendor_id {
        0x1002 => "AMD".to_string(),
        0x1010 => "ImgTec".to_string(),
        0x106B => "Apple".to_string(),
        0x10DE => "NVIDIA".to_string(),
        0x13B5 => "ARM".to_string(),
        0x5143 => "Qualcomm".to_string(),
        0x8086 => "Intel".to_string(),
        other => format!("Unknown vendor 0x{:04X}", other),
    }
}
