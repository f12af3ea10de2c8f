/// Sampler - VkSampler creation from a HAL sampler descriptor

use ash::vk;
use obsidian_hal::obsidian::SamplerDesc;
use obsidian_hal::{hal_debug, Result};

use crate::vulkan_context::{vk_error, GpuContext};
use crate::vulkan_format::{
    address_mode_to_vk, border_color_to_vk, compare_op_to_vk, filter_to_vk, mipmap_mode_to_vk,
};

const SOURCE: &str = "obsidian::vulkan::sampler";

/// Anisotropy limits of the physical device
#[derive(Debug, Clone, Copy)]
pub(crate) struct AnisotropySupport {
    pub(crate) enabled: bool,
    pub(crate) max: f32,
}

pub(crate) fn create_sampler(
    ctx: &GpuContext,
    anisotropy: AnisotropySupport,
    desc: &SamplerDesc,
) -> Result<vk::Sampler> {
    let mut create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter_to_vk(desc.mag_filter))
        .min_filter(filter_to_vk(desc.min_filter))
        .mipmap_mode(mipmap_mode_to_vk(desc.mipmap_mode))
        .address_mode_u(address_mode_to_vk(desc.address_mode_u))
        .address_mode_v(address_mode_to_vk(desc.address_mode_v))
        .address_mode_w(address_mode_to_vk(desc.address_mode_w))
        .mip_lod_bias(desc.mip_lod_bias)
        .min_lod(desc.min_lod)
        .max_lod(desc.max_lod)
        .border_color(border_color_to_vk(desc.border_color))
        .unnormalized_coordinates(false);

    create_info = match desc.compare_op {
        Some(op) => create_info.compare_enable(true).compare_op(compare_op_to_vk(op)),
        None => create_info.compare_enable(false).compare_op(vk::CompareOp::ALWAYS),
    };

    if desc.anisotropy_enabled && anisotropy.enabled {
        let max_anisotropy = desc.max_anisotropy.min(anisotropy.max);
        if max_anisotropy < desc.max_anisotropy {
            hal_debug!(
                SOURCE,
                "Sampler anisotropy {} clamped to device limit {}",
                desc.max_anisotropy,
                anisotropy.max
            );
        }
        create_info = create_info.anisotropy_enable(true).max_anisotropy(max_anisotropy);
    } else {
        if desc.anisotropy_enabled {
            hal_debug!(SOURCE, "Sampler anisotropy requested but not supported by the device");
        }
        create_info = create_info.anisotropy_enable(false).max_anisotropy(1.0);
    }

    unsafe {
        ctx.device
            .create_sampler(&create_info, None)
            .map_err(|e| vk_error("Failed to create sampler", e))
    }
}
