//! Integration tests for VulkanBackend
//!
//! These tests drive a real RenderDevice<VulkanBackend> through the public
//! API. All tests require a GPU and a display and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_backend_tests -- --ignored --test-threads=1

use ash::vk;
use obsidian_hal::obsidian::{
    AcquireOutcome, BufferUsage, DataFormat, DeviceConfig, FrameState, FramebufferAttachmentDesc,
    PresentOutcome, RenderDevice, SampleCount, SamplerDesc, TextureDesc, TextureType, TextureUsage,
};
use obsidian_hal::Error;
use obsidian_hal_vulkan::{create_render_device, create_window_surface, VulkanBackend};
use winit::event_loop::EventLoop;
use winit::window::Window;

/// Helper to create a hidden test window
#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = EventLoop::new().unwrap();
    let window_attrs = Window::default_attributes()
        .with_title("Obsidian HAL Vulkan Test")
        .with_inner_size(winit::dpi::PhysicalSize::new(800, 600))
        .with_visible(false);
    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}

fn create_test_device(window: &Window) -> RenderDevice<VulkanBackend> {
    create_render_device(window, DeviceConfig::default()).unwrap()
}

// ============================================================================
// DEVICE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_device_info() {
    let (window, _event_loop) = create_test_window();
    let device = create_test_device(&window);

    assert!(!device.device_name().is_empty());
    assert!(!device.vendor().is_empty());
    assert_eq!(device.resource_counts().surfaces, 0);
}

// ============================================================================
// BUFFER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_static_vertex_buffer() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    let vertices: [f32; 9] = [0.0, -0.5, 0.0, 0.5, 0.5, 0.0, -0.5, 0.5, 0.0];
    let id = device.create_vertex_buffer_from(BufferUsage::Static, &vertices).unwrap();

    let info = device.vertex_buffer_info(id).unwrap();
    assert_eq!(info.size, 36);
    assert_eq!(info.usage, BufferUsage::Static);

    // Static buffers are immutable
    assert!(matches!(
        device.update_vertex_buffer(id, 0, &[0u8; 4]),
        Err(Error::ResourceStateError(_))
    ));

    device.destroy_vertex_buffer(id).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_dynamic_uniform_buffer_update() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    let id = device.create_uniform_buffer(BufferUsage::Dynamic, 256, None).unwrap();
    device.update_uniform_buffer(id, 64, &[1u8; 64]).unwrap();

    // Past the end
    assert!(device.update_uniform_buffer(id, 200, &[1u8; 64]).is_err());

    device.destroy_uniform_buffer(id).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_static_index_buffer() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    let indices: [u16; 6] = [0, 1, 2, 2, 3, 0];
    let id = device.create_index_buffer_from(BufferUsage::Static, &indices).unwrap();
    assert_eq!(device.index_buffer_info(id).unwrap().size, 12);
    device.destroy_index_buffer(id).unwrap();
}

// ============================================================================
// TEXTURE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_texture_with_data_and_mipmaps() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    // 4x4 RGBA texture (64 bytes)
    let data: Vec<u8> = (0..64).collect();
    let id = device
        .create_texture(&TextureDesc {
            width: 4,
            height: 4,
            mipmaps: 3,
            data: Some(&data),
            ..Default::default()
        })
        .unwrap();

    let info = device.texture_info(id).unwrap();
    assert_eq!(info.width, 4);
    assert_eq!(info.mipmaps, 3);
    assert!(!info.wrapped);

    device.destroy_texture(id).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_3d_texture() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    let data = vec![255u8; 8 * 8 * 4 * 4];
    let id = device
        .create_texture(&TextureDesc {
            texture_type: TextureType::Texture3D,
            width: 8,
            height: 8,
            depth: 4,
            data: Some(&data),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(device.texture_info(id).unwrap().depth, 4);
    device.destroy_texture(id).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_sampler() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    let desc = SamplerDesc {
        anisotropy_enabled: true,
        max_anisotropy: 64.0,
        ..Default::default()
    };
    let id = device.create_sampler(&desc).unwrap();
    assert_eq!(device.sampler_desc(id).unwrap(), desc);
    device.destroy_sampler(id).unwrap();
}

// ============================================================================
// FRAMEBUFFER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_offscreen_framebuffer() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    let color = device
        .create_texture(&TextureDesc {
            width: 320,
            height: 240,
            usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SHADER_SAMPLING,
            ..Default::default()
        })
        .unwrap();
    let depth = device
        .create_texture(&TextureDesc {
            format: DataFormat::D32_SFLOAT,
            width: 320,
            height: 240,
            samples: SampleCount::S1,
            usage: TextureUsage::DEPTH_STENCIL_ATTACHMENT,
            ..Default::default()
        })
        .unwrap();

    let format = device
        .create_framebuffer_format(&[
            FramebufferAttachmentDesc::color(DataFormat::R8G8B8A8_UNORM),
            FramebufferAttachmentDesc::depth_stencil(DataFormat::D32_SFLOAT),
        ])
        .unwrap();
    let framebuffer = device.create_framebuffer(&[color, depth], format).unwrap();

    let native = device.native_framebuffer(framebuffer).unwrap();
    assert_eq!((native.width, native.height), (320, 240));
    assert_ne!(*native.framebuffer, vk::Framebuffer::null());

    // Attached textures outlive their framebuffer
    assert!(device.destroy_texture(color).is_err());

    device.destroy_framebuffer(framebuffer).unwrap();
    device.destroy_framebuffer_format(format).unwrap();
    device.destroy_texture(color).unwrap();
    device.destroy_texture(depth).unwrap();
}

// ============================================================================
// SURFACE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_surface_frame_cycle() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    let native = create_window_surface(device.backend(), &window).unwrap();
    let size = window.inner_size();
    let surface = device.create_surface("main", native, size.width, size.height).unwrap();

    let command_buffers = device.backend().allocate_command_buffers(1).unwrap();

    for _ in 0..3 {
        let frame = match device.acquire_next_image(surface).unwrap() {
            AcquireOutcome::Ready(frame) => frame,
            AcquireOutcome::SwapchainRecreated | AcquireOutcome::Unavailable => continue,
        };
        assert_eq!(device.surface_frame_state(surface).unwrap(), FrameState::ImageAcquired);

        let native = device.native_framebuffer(frame.framebuffer).unwrap();
        let (render_pass, framebuffer) = (*native.render_pass, *native.framebuffer);
        let extent = vk::Extent2D { width: native.width, height: native.height };

        device
            .backend()
            .record_commands(command_buffers[0], |vk_device, cmd| {
                let clear_values = [vk::ClearValue {
                    color: vk::ClearColorValue { float32: [0.1, 0.2, 0.3, 1.0] },
                }];
                let begin_info = vk::RenderPassBeginInfo::default()
                    .render_pass(render_pass)
                    .framebuffer(framebuffer)
                    .render_area(vk::Rect2D { offset: vk::Offset2D::default(), extent })
                    .clear_values(&clear_values);
                unsafe {
                    vk_device.cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);
                    vk_device.cmd_end_render_pass(cmd);
                }
            })
            .unwrap();

        device.submit(surface, &command_buffers).unwrap();
        let outcome = device.present(surface).unwrap();
        assert!(matches!(outcome, PresentOutcome::Presented | PresentOutcome::SwapchainRecreated));
        assert_eq!(device.surface_frame_state(surface).unwrap(), FrameState::Idle);
    }

    device.wait_idle().unwrap();
    device.backend().free_command_buffers(&command_buffers).unwrap();
    device.destroy_surface(surface).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_surface_resize() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    let native = create_window_surface(device.backend(), &window).unwrap();
    let size = window.inner_size();
    let surface = device.create_surface("main", native, size.width, size.height).unwrap();

    device.resize_surface(surface, 640, 480).unwrap();
    assert_eq!(device.surface_size(surface).unwrap(), (640, 480));
    assert_eq!(device.surface_frame_state(surface).unwrap(), FrameState::Idle);

    device.destroy_surface(surface).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_duplicate_surface_name() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_test_device(&window);

    let size = window.inner_size();
    let first = create_window_surface(device.backend(), &window).unwrap();
    let surface = device.create_surface("main", first, size.width, size.height).unwrap();

    // Only one swapchain per window, the second native surface is consumed
    // and destroyed by the rejected call
    let second = create_window_surface(device.backend(), &window).unwrap();
    assert!(matches!(
        device.create_surface("main", second, size.width, size.height),
        Err(Error::ConfigurationError(_))
    ));

    device.destroy_surface(surface).unwrap();
}
