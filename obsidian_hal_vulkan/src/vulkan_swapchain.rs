/// Swapchain - presentation surfaces, swapchains, acquire and present
///
/// The swapchain keeps no synchronization objects and no frame counter: the
/// frame state machine in the core owns those and passes the semaphores in.

use ash::vk;
use obsidian_hal::obsidian::{
    AcquireResult, DataFormat, PresentResult, SurfaceCapabilities, SwapchainDesc, SwapchainInfo,
};
use obsidian_hal::{hal_debug, hal_err, hal_info, Result};

use crate::vulkan_context::{vk_error, GpuContext};
use crate::vulkan_format::{format_to_vk, present_mode_to_vk, vk_to_format, vk_to_present_mode};

const SOURCE: &str = "obsidian::vulkan::swapchain";

/// Vulkan swapchain and the images it owns
pub struct Swapchain {
    pub(crate) swapchain: vk::SwapchainKHR,
    pub(crate) images: Vec<vk::Image>,
}

impl Swapchain {
    /// Native handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }
}

/// Loaders and physical-device data needed for presentation
pub(crate) struct PresentContext {
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
}

impl PresentContext {
    pub(crate) fn surface_capabilities(
        &self,
        ctx: &GpuContext,
        surface: vk::SurfaceKHR,
    ) -> Result<SurfaceCapabilities> {
        unsafe {
            let supported = self
                .surface_loader
                .get_physical_device_surface_support(self.physical_device, ctx.graphics_queue_family, surface)
                .map_err(|e| vk_error("Failed to query surface support", e))?;
            if !supported {
                return Err(hal_err!(
                    ConfigurationError,
                    SOURCE,
                    "Graphics queue family {} cannot present to this surface",
                    ctx.graphics_queue_family
                ));
            }

            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, surface)
                .map_err(|e| vk_error("Failed to get surface capabilities", e))?;

            let surface_formats = self
                .surface_loader
                .get_physical_device_surface_formats(self.physical_device, surface)
                .map_err(|e| vk_error("Failed to query surface formats", e))?;

            let present_modes = self
                .surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, surface)
                .map_err(|e| vk_error("Failed to query surface present modes", e))?;

            let mut formats: Vec<DataFormat> = Vec::with_capacity(surface_formats.len());
            for surface_format in &surface_formats {
                match vk_to_format(surface_format.format) {
                    Some(format) if !formats.contains(&format) => formats.push(format),
                    Some(_) => {}
                    None => hal_debug!(SOURCE, "Skipping surface format {:?}", surface_format.format),
                }
            }

            let mut modes = Vec::with_capacity(present_modes.len());
            for mode in present_modes.into_iter().filter_map(vk_to_present_mode) {
                if !modes.contains(&mode) {
                    modes.push(mode);
                }
            }

            // u32::MAX means the swapchain decides the extent
            let current_extent = if capabilities.current_extent.width == u32::MAX {
                None
            } else {
                Some((capabilities.current_extent.width, capabilities.current_extent.height))
            };

            Ok(SurfaceCapabilities {
                min_image_count: capabilities.min_image_count,
                max_image_count: capabilities.max_image_count,
                current_extent,
                min_extent: (capabilities.min_image_extent.width, capabilities.min_image_extent.height),
                max_extent: (capabilities.max_image_extent.width, capabilities.max_image_extent.height),
                formats,
                present_modes: modes,
            })
        }
    }

    pub(crate) fn create_swapchain(
        &self,
        surface: vk::SurfaceKHR,
        desc: &SwapchainDesc,
        old: Option<&Swapchain>,
    ) -> Result<(Swapchain, SwapchainInfo<vk::Image>)> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, surface)
                .map_err(|e| vk_error("Failed to get surface capabilities", e))?;

            let surface_formats = self
                .surface_loader
                .get_physical_device_surface_formats(self.physical_device, surface)
                .map_err(|e| vk_error("Failed to query surface formats", e))?;

            let vk_format = format_to_vk(desc.format);
            let surface_format = surface_formats
                .iter()
                .find(|f| f.format == vk_format)
                .ok_or_else(|| {
                    hal_err!(
                        ConfigurationError,
                        SOURCE,
                        "Surface does not support swapchain format {:?}",
                        desc.format
                    )
                })?;

            let composite_alpha = [
                vk::CompositeAlphaFlagsKHR::OPAQUE,
                vk::CompositeAlphaFlagsKHR::INHERIT,
                vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
                vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
            ]
            .into_iter()
            .find(|&mode| capabilities.supported_composite_alpha.contains(mode))
            .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE);

            let extent = vk::Extent2D {
                width: desc.width,
                height: desc.height,
            };

            let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(surface)
                .min_image_count(desc.image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(composite_alpha)
                .present_mode(present_mode_to_vk(desc.present_mode))
                .clipped(true)
                .old_swapchain(old.map_or(vk::SwapchainKHR::null(), |old| old.swapchain));

            let swapchain = self
                .swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| vk_error("Failed to create swapchain", e))?;

            let images = match self.swapchain_loader.get_swapchain_images(swapchain) {
                Ok(images) => images,
                Err(e) => {
                    self.swapchain_loader.destroy_swapchain(swapchain, None);
                    return Err(vk_error("Failed to get swapchain images", e));
                }
            };

            hal_info!(
                SOURCE,
                "Swapchain created: {}x{} {:?} {:?}, {} images",
                desc.width,
                desc.height,
                desc.format,
                desc.present_mode,
                images.len()
            );

            let info = SwapchainInfo {
                format: desc.format,
                width: desc.width,
                height: desc.height,
                present_mode: desc.present_mode,
                images: images.clone(),
            };

            Ok((Swapchain { swapchain, images }, info))
        }
    }

    pub(crate) fn destroy_swapchain(&self, swapchain: Swapchain) {
        unsafe {
            self.swapchain_loader.destroy_swapchain(swapchain.swapchain, None);
        }
    }

    pub(crate) fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        unsafe {
            self.surface_loader.destroy_surface(surface, None);
        }
    }

    pub(crate) fn acquire_next_image(
        &self,
        swapchain: &Swapchain,
        signal: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireResult> {
        unsafe {
            match self.swapchain_loader.acquire_next_image(
                swapchain.swapchain,
                timeout_ns,
                signal,
                vk::Fence::null(),
            ) {
                Ok((image_index, suboptimal)) => Ok(AcquireResult::Acquired { image_index, suboptimal }),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    hal_debug!(SOURCE, "Swapchain out of date during acquire");
                    Ok(AcquireResult::OutOfDate)
                }
                Err(e) => Err(vk_error("Failed to acquire next swapchain image", e)),
            }
        }
    }

    pub(crate) fn present(
        &self,
        ctx: &GpuContext,
        swapchain: &Swapchain,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<PresentResult> {
        let swapchains = [swapchain.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            match self.swapchain_loader.queue_present(ctx.graphics_queue, &present_info) {
                Ok(false) => Ok(PresentResult::Presented),
                Ok(true) => Ok(PresentResult::Suboptimal),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    hal_debug!(SOURCE, "Swapchain out of date during present");
                    Ok(PresentResult::OutOfDate)
                }
                Err(e) => Err(vk_error("Failed to present swapchain image", e)),
            }
        }
    }
}
