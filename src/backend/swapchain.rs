// Swapchain - Window presentation
//
// Owns the chain of images the display rotates through plus one view per
// image. Recreation hands the previous chain to the platform as `old` and
// only then releases the old views and handle.

use ash::vk;
use std::sync::Arc;

use super::gpu::Gpu;
use super::resource::{ImageView, SwapchainHandle};
use crate::error::{GfxError, GfxResult};

/// Vsync-style ordering; the only mode every platform must support.
pub const PRESENT_MODE: vk::PresentModeKHR = vk::PresentModeKHR::FIFO;

/// Used when the surface reports no format preference.
pub const DEFAULT_FORMAT: vk::Format = vk::Format::B8G8R8A8_UNORM;

/// Surfaces report this as their current extent when the swapchain decides.
const UNDEFINED_EXTENT: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDimensions {
    pub width: u32,
    pub height: u32,
    pub format: vk::Format,
}

impl SwapchainDimensions {
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D { width: self.width, height: self.height }
    }
}

/// First 8-bit unorm BGRA/RGBA format in reported order, else the first
/// reported format.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> GfxResult<vk::SurfaceFormatKHR> {
    match formats {
        [] => Err(GfxError::NoSurfaceFormat),
        [only] if only.format == vk::Format::UNDEFINED => Ok(vk::SurfaceFormatKHR {
            format: DEFAULT_FORMAT,
            color_space: only.color_space,
        }),
        _ => Ok(formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f.format,
                    vk::Format::R8G8B8A8_UNORM
                        | vk::Format::B8G8R8A8_UNORM
                        | vk::Format::A8B8G8R8_UNORM_PACK32
                )
            })
            .unwrap_or(formats[0])),
    }
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, requested: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width == UNDEFINED_EXTENT {
        requested
    } else {
        caps.current_extent
    }
}

/// One more than the minimum, capped when the surface has a maximum.
pub fn desired_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

pub fn choose_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if caps.supported_transforms.contains(vk::SurfaceTransformFlagsKHR::IDENTITY) {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        caps.current_transform
    }
}

pub fn choose_composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::INHERIT,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    ]
    .into_iter()
    .find(|&mode| supported.contains(mode))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

pub struct Swapchain<G: Gpu> {
    // Views are declared first so they drop before the chain they view
    image_views: Vec<ImageView<G>>,
    handle: SwapchainHandle<G>,
    surface: vk::SurfaceKHR,
    dimensions: SwapchainDimensions,
    gpu: Arc<G>,
}

impl<G: Gpu> Swapchain<G> {
    pub fn new(gpu: Arc<G>, surface: vk::SurfaceKHR, requested: vk::Extent2D) -> GfxResult<Self> {
        let (handle, dimensions) = create_chain(&gpu, surface, requested, vk::SwapchainKHR::null())?;
        let image_views = create_views(&gpu, handle.handle(), dimensions.format)?;
        log::info!(
            "Created swapchain {}x{} {:?} with {} images",
            dimensions.width,
            dimensions.height,
            dimensions.format,
            image_views.len()
        );

        Ok(Self { image_views, handle, surface, dimensions, gpu })
    }

    /// Rebuild the chain for a new extent. The caller must have waited for
    /// the device to go idle.
    pub fn recreate(&mut self, requested: vk::Extent2D) -> GfxResult<()> {
        let (handle, dimensions) = create_chain(&self.gpu, self.surface, requested, self.handle.handle())?;

        self.image_views.clear();
        self.handle = handle;
        self.dimensions = dimensions;
        self.image_views = create_views(&self.gpu, self.handle.handle(), dimensions.format)?;

        log::info!(
            "Recreated swapchain {}x{} with {} images",
            dimensions.width,
            dimensions.height,
            self.image_views.len()
        );
        Ok(())
    }

    pub fn acquire_next_image(&self, timeout: u64, semaphore: vk::Semaphore) -> ash::prelude::VkResult<(u32, bool)> {
        self.gpu.acquire_next_image(self.handle.handle(), timeout, semaphore)
    }

    /// `Ok(true)` means the image was shown but the chain no longer matches
    /// the surface.
    pub fn present(&self, image_index: u32, wait_semaphore: vk::Semaphore) -> ash::prelude::VkResult<bool> {
        self.gpu.queue_present(self.handle.handle(), image_index, wait_semaphore)
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle.handle()
    }

    pub fn dimensions(&self) -> SwapchainDimensions {
        self.dimensions
    }

    pub fn image_count(&self) -> usize {
        self.image_views.len()
    }

    pub fn image_views(&self) -> Vec<vk::ImageView> {
        self.image_views.iter().map(|view| view.handle()).collect()
    }
}

fn create_chain<G: Gpu>(
    gpu: &Arc<G>,
    surface: vk::SurfaceKHR,
    requested: vk::Extent2D,
    old: vk::SwapchainKHR,
) -> GfxResult<(SwapchainHandle<G>, SwapchainDimensions)> {
    let caps = gpu.surface_capabilities(surface).map_err(GfxError::SwapchainCreation)?;
    let formats = gpu.surface_formats(surface).map_err(GfxError::SwapchainCreation)?;

    let surface_format = choose_surface_format(&formats)?;
    let extent = choose_extent(&caps, requested);
    let image_count = desired_image_count(&caps);

    log::debug!(
        "Swapchain request: {}x{}, {} images, {:?}",
        extent.width,
        extent.height,
        image_count,
        surface_format.format
    );

    let create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(choose_transform(&caps))
        .composite_alpha(choose_composite_alpha(caps.supported_composite_alpha))
        .present_mode(PRESENT_MODE)
        .clipped(true)
        .old_swapchain(old);

    let handle = gpu.create_swapchain(&create_info).map_err(GfxError::SwapchainCreation)?;
    let dimensions = SwapchainDimensions {
        width: extent.width,
        height: extent.height,
        format: surface_format.format,
    };
    Ok((SwapchainHandle::new(gpu.clone(), handle), dimensions))
}

fn create_views<G: Gpu>(
    gpu: &Arc<G>,
    swapchain: vk::SwapchainKHR,
    format: vk::Format,
) -> GfxResult<Vec<ImageView<G>>> {
    let images = gpu.swapchain_images(swapchain).map_err(GfxError::SwapchainCreation)?;

    images
        .into_iter()
        .map(|image| {
            let create_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::R,
                    g: vk::ComponentSwizzle::G,
                    b: vk::ComponentSwizzle::B,
                    a: vk::ComponentSwizzle::A,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: vk::REMAINING_MIP_LEVELS,
                    base_array_layer: 0,
                    layer_count: vk::REMAINING_ARRAY_LAYERS,
                });

            let view = gpu.create_image_view(&create_info).map_err(GfxError::SwapchainCreation)?;
            Ok(ImageView::new(gpu.clone(), view))
        })
        .collect()
}
