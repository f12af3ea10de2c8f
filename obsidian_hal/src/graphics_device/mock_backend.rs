/// Mock backend for unit tests (no GPU required)
///
/// Every native object is a numbered handle. The mock tracks live objects
/// per kind, keeps the contents of every buffer, models fences (a submission
/// leaves its fence unsignaled until it is waited on or the device goes idle)
/// and records the calls the frame state machine depends on. Failures can be
/// injected per operation.

use rustc_hash::FxHashMap;

use crate::config::{DeviceConfig, PresentMode};
use crate::error::{Error, Result};
use crate::graphics_device::backend::{
    AcquireResult, AttachmentPlan, Backend, FormatFeatureFlags, FormatProperties, ImageDesc,
    ImageUpload, ImageViewDesc, MemoryLocation, NativeBufferDesc, PresentResult,
    SurfaceCapabilities, SwapchainDesc, SwapchainInfo,
};
use crate::graphics_device::sampler::SamplerDesc;
use crate::graphics_device::texture::DataFormat;
use crate::graphics_device::RenderDevice;

/// Native handle of any mock object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    Image,
    ImageView,
    Sampler,
    RenderPass,
    Framebuffer,
    Semaphore,
    Fence,
    Swapchain,
    Surface,
}

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    CreateBuffer,
    WriteBuffer,
    CopyBuffer,
    CreateImage,
    UploadImage,
    CreateImageView,
    CreateSampler,
    CreateRenderPass,
    CreateFramebuffer,
    CreateSemaphore,
    CreateFence,
    CreateSwapchain,
    Submit,
    Present,
}

/// Recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    CreateBuffer { buffer: MockHandle, size: u64, location: MemoryLocation },
    CopyBuffer { src: MockHandle, dst: MockHandle, size: u64 },
    DestroyBuffer(MockHandle),
    CreateImage { image: MockHandle, desc: ImageDesc },
    UploadImage { image: MockHandle, staged: bool, upload: ImageUpload },
    CreateRenderPass { attachments: Vec<AttachmentPlan> },
    CreateSwapchain { swapchain: MockHandle, desc: SwapchainDesc, retired: Option<MockHandle> },
    DestroySwapchain(MockHandle),
    WaitFence(MockHandle),
    ResetFence(MockHandle),
    Acquire { swapchain: MockHandle, image_index: u32 },
    Submit { wait: MockHandle, signal: MockHandle, fence: MockHandle, command_buffers: usize },
    Present { swapchain: MockHandle, image_index: u32, wait: MockHandle },
    WaitIdle,
}

#[derive(Debug, Clone)]
pub struct MockBuffer {
    pub location: MemoryLocation,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone)]
struct MockSwapchain {
    images: Vec<MockHandle>,
    next_image: u32,
}

pub struct MockBackend {
    next_handle: u64,
    live: FxHashMap<MockHandle, ObjectKind>,
    pub buffers: FxHashMap<MockHandle, MockBuffer>,
    /// Signaled state of every live fence
    fences: FxHashMap<MockHandle, bool>,
    swapchains: FxHashMap<MockHandle, MockSwapchain>,
    pub events: Vec<MockEvent>,
    /// Calls to destroy objects that are not alive
    pub invalid_destroys: Vec<(ObjectKind, MockHandle)>,

    // ===== INJECTION =====
    /// Countdown per operation: fails when it reaches zero
    fail_countdown: FxHashMap<MockOp, usize>,
    pub format_overrides: FxHashMap<DataFormat, FormatProperties>,
    pub capabilities: SurfaceCapabilities,
    /// Image count forced on new swapchains
    pub forced_image_count: Option<u32>,
    /// Next acquisitions report OutOfDate
    pub acquire_out_of_date: u32,
    /// Results returned by the next presentations
    pub present_results: Vec<PresentResult>,
    /// Unsignaled fences never complete: waits time out
    pub fences_hang: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            live: FxHashMap::default(),
            buffers: FxHashMap::default(),
            fences: FxHashMap::default(),
            swapchains: FxHashMap::default(),
            events: Vec::new(),
            invalid_destroys: Vec::new(),
            fail_countdown: FxHashMap::default(),
            format_overrides: FxHashMap::default(),
            capabilities: SurfaceCapabilities {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: None,
                min_extent: (1, 1),
                max_extent: (4096, 4096),
                formats: vec![DataFormat::B8G8R8A8_SRGB, DataFormat::B8G8R8A8_UNORM],
                present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
            },
            forced_image_count: None,
            acquire_out_of_date: 0,
            present_results: Vec::new(),
            fences_hang: false,
        }
    }

    /// Make the `nth` next call (0 = the very next) of `op` fail
    pub fn fail_nth(&mut self, op: MockOp, nth: usize) {
        self.fail_countdown.insert(op, nth);
    }

    /// Native surface as platform glue would hand it over
    pub fn create_native_surface(&mut self) -> MockHandle {
        self.alloc(ObjectKind::Surface)
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    pub fn is_live(&self, handle: MockHandle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn fence_is_signaled(&self, fence: MockHandle) -> bool {
        self.fences.get(&fence).copied().unwrap_or(false)
    }

    pub fn count_events(&self, pred: impl Fn(&MockEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    fn alloc(&mut self, kind: ObjectKind) -> MockHandle {
        let handle = MockHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle, kind);
        handle
    }

    fn release(&mut self, kind: ObjectKind, handle: MockHandle) {
        match self.live.remove(&handle) {
            Some(k) if k == kind => {}
            _ => self.invalid_destroys.push((kind, handle)),
        }
    }

    fn check_fail(&mut self, op: MockOp) -> Result<()> {
        if let Some(countdown) = self.fail_countdown.get_mut(&op) {
            if *countdown == 0 {
                self.fail_countdown.remove(&op);
                return Err(Error::BackendError(format!("injected {:?} failure", op)));
            }
            *countdown -= 1;
        }
        Ok(())
    }
}

/// Device over a fresh mock backend with the default configuration
pub fn mock_device() -> RenderDevice<MockBackend> {
    mock_device_with(MockBackend::new(), DeviceConfig::default())
}

pub fn mock_device_with(backend: MockBackend, config: DeviceConfig) -> RenderDevice<MockBackend> {
    RenderDevice::new(backend, config).unwrap()
}

impl Backend for MockBackend {
    type Buffer = MockHandle;
    type Image = MockHandle;
    type ImageHandle = MockHandle;
    type ImageView = MockHandle;
    type Sampler = MockHandle;
    type RenderPass = MockHandle;
    type Framebuffer = MockHandle;
    type Semaphore = MockHandle;
    type Fence = MockHandle;
    type Swapchain = MockHandle;
    type NativeSurface = MockHandle;
    type CommandBuffer = MockHandle;

    fn device_name(&self) -> String {
        "Mock Device".to_string()
    }

    fn vendor(&self) -> String {
        "Obsidian".to_string()
    }

    fn create_buffer(&mut self, desc: &NativeBufferDesc) -> Result<MockHandle> {
        self.check_fail(MockOp::CreateBuffer)?;
        if desc.size == 0 {
            return Err(Error::BackendError("buffer size must be > 0".to_string()));
        }
        let buffer = self.alloc(ObjectKind::Buffer);
        self.buffers.insert(
            buffer,
            MockBuffer { location: desc.location, contents: vec![0; desc.size as usize] },
        );
        self.events.push(MockEvent::CreateBuffer { buffer, size: desc.size, location: desc.location });
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: &mut MockHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.check_fail(MockOp::WriteBuffer)?;
        let target = self
            .buffers
            .get_mut(buffer)
            .ok_or_else(|| Error::BackendError("write to unknown buffer".to_string()))?;
        if target.location != MemoryLocation::CpuToGpu {
            return Err(Error::BackendError("device-local buffer is not mappable".to_string()));
        }
        let start = offset as usize;
        target.contents[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn copy_buffer(&mut self, src: &MockHandle, dst: &MockHandle, size: u64) -> Result<()> {
        self.check_fail(MockOp::CopyBuffer)?;
        let bytes = self.buffers[src].contents[..size as usize].to_vec();
        self.buffers
            .get_mut(dst)
            .ok_or_else(|| Error::BackendError("copy to unknown buffer".to_string()))?
            .contents[..size as usize]
            .copy_from_slice(&bytes);
        self.events.push(MockEvent::CopyBuffer { src: *src, dst: *dst, size });
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: MockHandle) {
        self.release(ObjectKind::Buffer, buffer);
        self.buffers.remove(&buffer);
        self.events.push(MockEvent::DestroyBuffer(buffer));
    }

    fn format_properties(&self, format: DataFormat) -> FormatProperties {
        if let Some(props) = self.format_overrides.get(&format) {
            return *props;
        }
        if format.is_depth() {
            FormatProperties {
                linear_tiling: FormatFeatureFlags::empty(),
                optimal_tiling: FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
                    | FormatFeatureFlags::SAMPLED_IMAGE,
            }
        } else {
            FormatProperties {
                linear_tiling: FormatFeatureFlags::SAMPLED_IMAGE,
                optimal_tiling: FormatFeatureFlags::all()
                    - FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            }
        }
    }

    fn create_image(&mut self, desc: &ImageDesc) -> Result<MockHandle> {
        self.check_fail(MockOp::CreateImage)?;
        let image = self.alloc(ObjectKind::Image);
        self.events.push(MockEvent::CreateImage { image, desc: *desc });
        Ok(image)
    }

    fn image_handle(&self, image: &MockHandle) -> MockHandle {
        *image
    }

    fn upload_image(
        &mut self,
        image: &MockHandle,
        staging: Option<&MockHandle>,
        upload: &ImageUpload,
    ) -> Result<()> {
        self.check_fail(MockOp::UploadImage)?;
        self.events.push(MockEvent::UploadImage {
            image: *image,
            staged: staging.is_some(),
            upload: *upload,
        });
        Ok(())
    }

    fn create_image_view(&mut self, _image: MockHandle, _desc: &ImageViewDesc) -> Result<MockHandle> {
        self.check_fail(MockOp::CreateImageView)?;
        Ok(self.alloc(ObjectKind::ImageView))
    }

    fn destroy_image_view(&mut self, view: MockHandle) {
        self.release(ObjectKind::ImageView, view);
    }

    fn destroy_image(&mut self, image: MockHandle) {
        self.release(ObjectKind::Image, image);
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Result<MockHandle> {
        self.check_fail(MockOp::CreateSampler)?;
        Ok(self.alloc(ObjectKind::Sampler))
    }

    fn destroy_sampler(&mut self, sampler: MockHandle) {
        self.release(ObjectKind::Sampler, sampler);
    }

    fn create_render_pass(&mut self, attachments: &[AttachmentPlan]) -> Result<MockHandle> {
        self.check_fail(MockOp::CreateRenderPass)?;
        self.events.push(MockEvent::CreateRenderPass { attachments: attachments.to_vec() });
        Ok(self.alloc(ObjectKind::RenderPass))
    }

    fn destroy_render_pass(&mut self, render_pass: MockHandle) {
        self.release(ObjectKind::RenderPass, render_pass);
    }

    fn create_framebuffer(
        &mut self,
        render_pass: &MockHandle,
        views: &[&MockHandle],
        _width: u32,
        _height: u32,
    ) -> Result<MockHandle> {
        self.check_fail(MockOp::CreateFramebuffer)?;
        if !self.is_live(*render_pass) || views.iter().any(|v| !self.is_live(**v)) {
            return Err(Error::BackendError("framebuffer references dead objects".to_string()));
        }
        Ok(self.alloc(ObjectKind::Framebuffer))
    }

    fn destroy_framebuffer(&mut self, framebuffer: MockHandle) {
        self.release(ObjectKind::Framebuffer, framebuffer);
    }

    fn create_semaphore(&mut self) -> Result<MockHandle> {
        self.check_fail(MockOp::CreateSemaphore)?;
        Ok(self.alloc(ObjectKind::Semaphore))
    }

    fn destroy_semaphore(&mut self, semaphore: MockHandle) {
        self.release(ObjectKind::Semaphore, semaphore);
    }

    fn create_fence(&mut self, signaled: bool) -> Result<MockHandle> {
        self.check_fail(MockOp::CreateFence)?;
        let fence = self.alloc(ObjectKind::Fence);
        self.fences.insert(fence, signaled);
        Ok(fence)
    }

    fn destroy_fence(&mut self, fence: MockHandle) {
        self.release(ObjectKind::Fence, fence);
        self.fences.remove(&fence);
    }

    fn wait_fence(&mut self, fence: &MockHandle, _timeout_ns: u64) -> Result<()> {
        self.events.push(MockEvent::WaitFence(*fence));
        let signaled = self
            .fences
            .get_mut(fence)
            .ok_or_else(|| Error::BackendError("wait on unknown fence".to_string()))?;
        if !*signaled && self.fences_hang {
            return Err(Error::Timeout("mock fence never signaled".to_string()));
        }
        *signaled = true;
        Ok(())
    }

    fn fence_signaled(&self, fence: &MockHandle) -> Result<bool> {
        self.fences
            .get(fence)
            .copied()
            .ok_or_else(|| Error::BackendError("query of unknown fence".to_string()))
    }

    fn reset_fence(&mut self, fence: &MockHandle) -> Result<()> {
        self.events.push(MockEvent::ResetFence(*fence));
        match self.fences.get_mut(fence) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(Error::BackendError("reset of unknown fence".to_string())),
        }
    }

    fn surface_capabilities(&self, _surface: &MockHandle) -> Result<SurfaceCapabilities> {
        Ok(self.capabilities.clone())
    }

    fn create_swapchain(
        &mut self,
        surface: &MockHandle,
        desc: &SwapchainDesc,
        old: Option<&MockHandle>,
    ) -> Result<(MockHandle, SwapchainInfo<MockHandle>)> {
        self.check_fail(MockOp::CreateSwapchain)?;
        if !self.is_live(*surface) {
            return Err(Error::BackendError("swapchain on dead surface".to_string()));
        }
        let swapchain = self.alloc(ObjectKind::Swapchain);
        let image_count = self.forced_image_count.unwrap_or(desc.image_count);
        let images: Vec<MockHandle> = (0..image_count)
            .map(|_| {
                let handle = MockHandle(self.next_handle);
                self.next_handle += 1;
                handle
            })
            .collect();
        self.swapchains
            .insert(swapchain, MockSwapchain { images: images.clone(), next_image: 0 });
        self.events.push(MockEvent::CreateSwapchain {
            swapchain,
            desc: *desc,
            retired: old.copied(),
        });
        Ok((
            swapchain,
            SwapchainInfo {
                format: desc.format,
                width: desc.width,
                height: desc.height,
                present_mode: desc.present_mode,
                images,
            },
        ))
    }

    fn destroy_swapchain(&mut self, swapchain: MockHandle) {
        self.release(ObjectKind::Swapchain, swapchain);
        self.swapchains.remove(&swapchain);
        self.events.push(MockEvent::DestroySwapchain(swapchain));
    }

    fn destroy_native_surface(&mut self, surface: MockHandle) {
        self.release(ObjectKind::Surface, surface);
    }

    fn acquire_next_image(
        &mut self,
        swapchain: &MockHandle,
        _signal: &MockHandle,
        _timeout_ns: u64,
    ) -> Result<AcquireResult> {
        if self.acquire_out_of_date > 0 {
            self.acquire_out_of_date -= 1;
            return Ok(AcquireResult::OutOfDate);
        }
        let chain = self
            .swapchains
            .get_mut(swapchain)
            .ok_or_else(|| Error::BackendError("acquire on unknown swapchain".to_string()))?;
        let image_index = chain.next_image;
        chain.next_image = (chain.next_image + 1) % chain.images.len() as u32;
        self.events.push(MockEvent::Acquire { swapchain: *swapchain, image_index });
        Ok(AcquireResult::Acquired { image_index, suboptimal: false })
    }

    fn submit(
        &mut self,
        command_buffers: &[MockHandle],
        wait: &MockHandle,
        signal: &MockHandle,
        fence: &MockHandle,
    ) -> Result<()> {
        self.check_fail(MockOp::Submit)?;
        match self.fences.get(fence) {
            Some(false) => {}
            Some(true) => return Err(Error::BackendError("submit with a signaled fence".to_string())),
            None => return Err(Error::BackendError("submit with unknown fence".to_string())),
        }
        self.events.push(MockEvent::Submit {
            wait: *wait,
            signal: *signal,
            fence: *fence,
            command_buffers: command_buffers.len(),
        });
        Ok(())
    }

    fn present(&mut self, swapchain: &MockHandle, image_index: u32, wait: &MockHandle) -> Result<PresentResult> {
        self.check_fail(MockOp::Present)?;
        self.events.push(MockEvent::Present { swapchain: *swapchain, image_index, wait: *wait });
        if self.present_results.is_empty() {
            Ok(PresentResult::Presented)
        } else {
            Ok(self.present_results.remove(0))
        }
    }

    fn wait_idle(&mut self) -> Result<()> {
        for signaled in self.fences.values_mut() {
            *signaled = true;
        }
        self.events.push(MockEvent::WaitIdle);
        Ok(())
    }
}
