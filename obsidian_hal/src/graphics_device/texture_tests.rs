//! Unit tests for textures
//!
//! Covers path selection from usage bits, descriptor validation, tiling
//! fallback, staged uploads with mip generation and cleanup on failure.

use crate::graphics_device::backend::{
    FormatFeatureFlags, FormatProperties, ImageAspect, ImageTiling, NativeImageUsage,
};
use crate::graphics_device::mock_backend::{mock_device, MockEvent, MockOp, ObjectKind};
use crate::graphics_device::texture::*;
use crate::Error;

fn created_images(events: &[MockEvent]) -> Vec<crate::graphics_device::backend::ImageDesc> {
    events
        .iter()
        .filter_map(|e| match e {
            MockEvent::CreateImage { desc, .. } => Some(*desc),
            _ => None,
        })
        .collect()
}

// ============================================================================
// FORMATS
// ============================================================================

#[test]
fn test_data_format_bytes_per_pixel() {
    assert_eq!(DataFormat::R8_UNORM.bytes_per_pixel(), 1);
    assert_eq!(DataFormat::R8G8B8_UNORM.bytes_per_pixel(), 3);
    assert_eq!(DataFormat::B8G8R8A8_SRGB.bytes_per_pixel(), 4);
    assert_eq!(DataFormat::R16G16B16A16_SFLOAT.bytes_per_pixel(), 8);
    assert_eq!(DataFormat::R32G32B32A32_SFLOAT.bytes_per_pixel(), 16);
    assert_eq!(DataFormat::D16_UNORM.bytes_per_pixel(), 2);
    assert_eq!(DataFormat::D32_SFLOAT_S8_UINT.bytes_per_pixel(), 8);
}

#[test]
fn test_data_format_aspects() {
    assert_eq!(DataFormat::R8G8B8A8_UNORM.aspect(), ImageAspect::COLOR);
    assert_eq!(DataFormat::D32_SFLOAT.aspect(), ImageAspect::DEPTH);
    assert_eq!(
        DataFormat::D24_UNORM_S8_UINT.aspect(),
        ImageAspect::DEPTH | ImageAspect::STENCIL
    );
    assert!(DataFormat::B8G8R8A8_SRGB.is_srgb());
    assert!(!DataFormat::B8G8R8A8_UNORM.is_srgb());
    assert!(!DataFormat::D16_UNORM.has_stencil());
}

#[test]
fn test_max_mip_levels() {
    assert_eq!(max_mip_levels(1, 1, 1), 1);
    assert_eq!(max_mip_levels(256, 256, 1), 9);
    assert_eq!(max_mip_levels(300, 20, 1), 9);
    assert_eq!(max_mip_levels(4, 4, 16), 5);
}

// ============================================================================
// PATH SELECTION
// ============================================================================

#[test]
fn test_select_path() {
    assert_eq!(select_path(TextureUsage::SHADER_SAMPLING).unwrap(), TexturePath::Sampled);
    assert_eq!(
        select_path(TextureUsage::DEPTH_STENCIL_ATTACHMENT).unwrap(),
        TexturePath::DepthStencil { sampled: false }
    );
    assert_eq!(
        select_path(TextureUsage::DEPTH_STENCIL_ATTACHMENT | TextureUsage::SHADER_SAMPLING).unwrap(),
        TexturePath::DepthStencil { sampled: true }
    );
    assert_eq!(
        select_path(TextureUsage::COLOR_ATTACHMENT | TextureUsage::SHADER_SAMPLING).unwrap(),
        TexturePath::RenderTarget { sampled: true }
    );
    assert!(matches!(select_path(TextureUsage::empty()), Err(Error::ConfigurationError(_))));
}

#[test]
fn test_color_and_depth_attachment_are_exclusive() {
    let mut device = mock_device();
    let desc = TextureDesc {
        format: DataFormat::D32_SFLOAT,
        width: 64,
        height: 64,
        usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::DEPTH_STENCIL_ATTACHMENT,
        ..Default::default()
    };
    let result = device.create_texture(&desc);
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
    assert!(created_images(&device.backend.events).is_empty());
    assert_eq!(device.resource_counts().textures, 0);
}

// ============================================================================
// SAMPLED TEXTURES
// ============================================================================

#[test]
fn test_sampled_texture_with_data_is_staged() {
    let mut device = mock_device();
    let pixels = vec![0x80u8; 4 * 4 * 4];
    let id = device
        .create_texture(&TextureDesc {
            width: 4,
            height: 4,
            data: Some(&pixels),
            ..Default::default()
        })
        .unwrap();

    let images = created_images(&device.backend.events);
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].tiling, ImageTiling::Optimal);
    assert_eq!(images[0].usage, NativeImageUsage::SAMPLED | NativeImageUsage::TRANSFER_DST);

    let uploads: Vec<_> = device
        .backend
        .events
        .iter()
        .filter_map(|e| match e {
            MockEvent::UploadImage { staged, upload, .. } => Some((*staged, *upload)),
            _ => None,
        })
        .collect();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].0);
    assert!(!uploads[0].1.generate_mipmaps);

    // Staging buffer released after the upload
    assert_eq!(device.backend.live_count(ObjectKind::Buffer), 0);
    assert_eq!(device.backend.live_count(ObjectKind::Image), 1);
    assert_eq!(device.backend.live_count(ObjectKind::ImageView), 1);

    let info = device.texture_info(id).unwrap();
    assert_eq!((info.width, info.height, info.mipmaps), (4, 4, 1));
    assert!(!info.wrapped);
}

#[test]
fn test_sampled_texture_without_data_only_transitions() {
    let mut device = mock_device();
    device.create_texture(&TextureDesc { width: 8, height: 8, ..Default::default() }).unwrap();
    assert_eq!(
        device.backend.count_events(|e| matches!(e, MockEvent::UploadImage { staged: false, .. })),
        1
    );
}

#[test]
fn test_mipmaps_are_generated_from_level_zero() {
    let mut device = mock_device();
    let pixels = vec![0u8; 16 * 16 * 4];
    device
        .create_texture(&TextureDesc {
            width: 16,
            height: 16,
            mipmaps: 5,
            data: Some(&pixels),
            ..Default::default()
        })
        .unwrap();

    let images = created_images(&device.backend.events);
    assert!(images[0].usage.contains(NativeImageUsage::TRANSFER_SRC));
    assert_eq!(images[0].mip_levels, 5);
    assert_eq!(
        device.backend.count_events(|e| matches!(
            e,
            MockEvent::UploadImage { upload, .. } if upload.generate_mipmaps && upload.mip_levels == 5
        )),
        1
    );
}

#[test]
fn test_mipmaps_require_linear_blit_support() {
    let mut device = mock_device();
    device.backend.format_overrides.insert(
        DataFormat::R32G32B32A32_SFLOAT,
        FormatProperties {
            linear_tiling: FormatFeatureFlags::empty(),
            optimal_tiling: FormatFeatureFlags::SAMPLED_IMAGE
                | FormatFeatureFlags::BLIT_SRC
                | FormatFeatureFlags::BLIT_DST,
        },
    );
    let pixels = vec![0u8; 8 * 8 * 16];
    let result = device.create_texture(&TextureDesc {
        format: DataFormat::R32G32B32A32_SFLOAT,
        width: 8,
        height: 8,
        mipmaps: 4,
        data: Some(&pixels),
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
    assert!(created_images(&device.backend.events).is_empty());
}

#[test]
fn test_texture_data_size_must_match_extent() {
    let mut device = mock_device();
    let pixels = vec![0u8; 15];
    let result = device.create_texture(&TextureDesc {
        width: 2,
        height: 2,
        data: Some(&pixels),
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
}

#[test]
fn test_texture_3d_sampled() {
    let mut device = mock_device();
    let voxels = vec![1u8; 4 * 4 * 4];
    let id = device
        .create_texture(&TextureDesc {
            texture_type: TextureType::Texture3D,
            format: DataFormat::R8_UNORM,
            width: 4,
            height: 4,
            depth: 4,
            data: Some(&voxels),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(device.texture_info(id).unwrap().depth, 4);
}

#[test]
fn test_upload_failure_releases_image_and_staging() {
    let mut device = mock_device();
    device.backend.fail_nth(MockOp::UploadImage, 0);
    let pixels = vec![0u8; 4 * 4 * 4];
    let result = device.create_texture(&TextureDesc {
        width: 4,
        height: 4,
        data: Some(&pixels),
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::BackendError(_))));
    assert_eq!(device.backend.live_count(ObjectKind::Image), 0);
    assert_eq!(device.backend.live_count(ObjectKind::Buffer), 0);
}

#[test]
fn test_view_failure_releases_image() {
    let mut device = mock_device();
    device.backend.fail_nth(MockOp::CreateImageView, 0);
    let result = device.create_texture(&TextureDesc { width: 4, height: 4, ..Default::default() });
    assert!(result.is_err());
    assert_eq!(device.backend.live_count(ObjectKind::Image), 0);
    assert_eq!(device.resource_counts().textures, 0);
}

// ============================================================================
// ATTACHMENT TEXTURES
// ============================================================================

#[test]
fn test_depth_stencil_texture() {
    let mut device = mock_device();
    let id = device
        .create_texture(&TextureDesc {
            format: DataFormat::D24_UNORM_S8_UINT,
            width: 800,
            height: 600,
            usage: TextureUsage::DEPTH_STENCIL_ATTACHMENT,
            ..Default::default()
        })
        .unwrap();
    let images = created_images(&device.backend.events);
    assert_eq!(images[0].usage, NativeImageUsage::DEPTH_STENCIL_ATTACHMENT);
    assert_eq!(images[0].tiling, ImageTiling::Optimal);
    assert_eq!(device.texture_info(id).unwrap().format, DataFormat::D24_UNORM_S8_UINT);
}

#[test]
fn test_depth_stencil_falls_back_to_linear_tiling() {
    let mut device = mock_device();
    device.backend.format_overrides.insert(
        DataFormat::D32_SFLOAT,
        FormatProperties {
            linear_tiling: FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
                | FormatFeatureFlags::SAMPLED_IMAGE,
            optimal_tiling: FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        },
    );
    device
        .create_texture(&TextureDesc {
            format: DataFormat::D32_SFLOAT,
            width: 64,
            height: 64,
            usage: TextureUsage::DEPTH_STENCIL_ATTACHMENT | TextureUsage::SHADER_SAMPLING,
            ..Default::default()
        })
        .unwrap();
    let images = created_images(&device.backend.events);
    assert_eq!(images[0].tiling, ImageTiling::Linear);
    assert!(images[0].usage.contains(NativeImageUsage::SAMPLED));
}

#[test]
fn test_depth_stencil_unsupported_format() {
    let mut device = mock_device();
    device
        .backend
        .format_overrides
        .insert(DataFormat::D16_UNORM, FormatProperties::default());
    let result = device.create_texture(&TextureDesc {
        format: DataFormat::D16_UNORM,
        width: 64,
        height: 64,
        usage: TextureUsage::DEPTH_STENCIL_ATTACHMENT,
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
}

#[test]
fn test_depth_usage_needs_depth_format() {
    let mut device = mock_device();
    let result = device.create_texture(&TextureDesc {
        format: DataFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::DEPTH_STENCIL_ATTACHMENT,
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::ConfigurationError(_))));

    let result = device.create_texture(&TextureDesc {
        format: DataFormat::D32_SFLOAT,
        usage: TextureUsage::COLOR_ATTACHMENT,
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
}

#[test]
fn test_sampled_render_target() {
    let mut device = mock_device();
    device
        .create_texture(&TextureDesc {
            format: DataFormat::R16G16B16A16_SFLOAT,
            width: 1920,
            height: 1080,
            usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SHADER_SAMPLING,
            ..Default::default()
        })
        .unwrap();
    let images = created_images(&device.backend.events);
    assert_eq!(
        images[0].usage,
        NativeImageUsage::COLOR_ATTACHMENT | NativeImageUsage::SAMPLED
    );
}

#[test]
fn test_render_target_requires_optimal_color_attachment() {
    let mut device = mock_device();
    device.backend.format_overrides.insert(
        DataFormat::R8G8B8_UNORM,
        FormatProperties {
            linear_tiling: FormatFeatureFlags::COLOR_ATTACHMENT,
            optimal_tiling: FormatFeatureFlags::SAMPLED_IMAGE,
        },
    );
    let result = device.create_texture(&TextureDesc {
        format: DataFormat::R8G8B8_UNORM,
        usage: TextureUsage::COLOR_ATTACHMENT,
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
}

#[test]
fn test_multisampled_texture_cannot_be_sampled() {
    let mut device = mock_device();
    let result = device.create_texture(&TextureDesc {
        samples: SampleCount::S4,
        usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SHADER_SAMPLING,
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::ConfigurationError(_))));

    let msaa = device.create_texture(&TextureDesc {
        samples: SampleCount::S4,
        usage: TextureUsage::COLOR_ATTACHMENT,
        ..Default::default()
    });
    assert!(msaa.is_ok());
}

#[test]
fn test_attachment_texture_restrictions() {
    let mut device = mock_device();
    let with_mips = device.create_texture(&TextureDesc {
        width: 64,
        height: 64,
        mipmaps: 2,
        usage: TextureUsage::COLOR_ATTACHMENT,
        ..Default::default()
    });
    assert!(matches!(with_mips, Err(Error::ConfigurationError(_))));

    let volume = device.create_texture(&TextureDesc {
        texture_type: TextureType::Texture3D,
        depth: 4,
        usage: TextureUsage::COLOR_ATTACHMENT,
        ..Default::default()
    });
    assert!(matches!(volume, Err(Error::ConfigurationError(_))));

    let pixels = [0u8; 4];
    let with_data = device.create_texture(&TextureDesc {
        usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SHADER_SAMPLING,
        data: Some(&pixels),
        ..Default::default()
    });
    assert!(matches!(with_data, Err(Error::ConfigurationError(_))));
}

// ============================================================================
// DESCRIPTOR VALIDATION
// ============================================================================

#[test]
fn test_invalid_extents_and_mip_counts() {
    let mut device = mock_device();
    let cases = [
        TextureDesc { width: 0, ..Default::default() },
        TextureDesc { depth: 2, ..Default::default() },
        TextureDesc { mipmaps: 0, ..Default::default() },
        TextureDesc { width: 8, height: 8, mipmaps: 5, ..Default::default() },
    ];
    for desc in &cases {
        assert!(
            matches!(device.create_texture(desc), Err(Error::ConfigurationError(_))),
            "descriptor should be rejected: {:?}",
            desc
        );
    }
    assert!(created_images(&device.backend.events).is_empty());
}

// ============================================================================
// LIFETIME
// ============================================================================

#[test]
fn test_destroy_texture_releases_native_objects() {
    let mut device = mock_device();
    let id = device.create_texture(&TextureDesc::default()).unwrap();
    device.destroy_texture(id).unwrap();

    assert_eq!(device.backend.live_count(ObjectKind::Image), 0);
    assert_eq!(device.backend.live_count(ObjectKind::ImageView), 0);
    assert!(matches!(device.texture_info(id), Err(Error::LookupFailure(_))));
    assert!(matches!(device.destroy_texture(id), Err(Error::LookupFailure(_))));
}
