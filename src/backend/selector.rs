// Physical device selection
//
// Walks the adapters in platform order and picks the first queue family that
// can both render and present to the target surface. No ranking happens
// unless the caller asks for `PreferDiscrete`.

use ash::prelude::VkResult;
use ash::vk;
use serde::Deserialize;

use crate::error::{GfxError, GfxResult};

/// Read-only instance-level queries the selector needs.
pub trait AdapterQuery {
    fn adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn queue_families(&self, adapter: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;
    fn supports_present(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    fn device_type(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceType;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterPolicy {
    /// First adapter, in enumeration order, with a usable queue family.
    #[default]
    FirstSuitable,
    /// Every suitable adapter is considered; discrete beats integrated beats
    /// virtual beats everything else.
    PreferDiscrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSelection {
    pub adapter: vk::PhysicalDevice,
    pub queue_family: u32,
    /// Position in the platform's enumeration order
    pub ordinal: usize,
}

pub fn select_adapter(
    query: &impl AdapterQuery,
    surface: vk::SurfaceKHR,
    policy: AdapterPolicy,
) -> GfxResult<AdapterSelection> {
    let adapters = query.adapters().map_err(GfxError::AdapterEnumeration)?;
    if adapters.is_empty() {
        return Err(GfxError::NoSuitableDevice);
    }

    let mut suitable = Vec::new();
    for (ordinal, &adapter) in adapters.iter().enumerate() {
        let families = query.queue_families(adapter);
        if families.is_empty() {
            return Err(GfxError::NoSuitableQueue);
        }

        if let Some(queue_family) = graphics_present_family(query, adapter, &families, surface)? {
            let selection = AdapterSelection { adapter, queue_family, ordinal };
            if policy == AdapterPolicy::FirstSuitable {
                return Ok(selection);
            }
            suitable.push(selection);
        }
    }

    // min_by_key keeps the earliest of equal keys
    suitable
        .into_iter()
        .min_by_key(|s| type_rank(query.device_type(s.adapter)))
        .ok_or(GfxError::NoSuitableQueue)
}

fn graphics_present_family(
    query: &impl AdapterQuery,
    adapter: vk::PhysicalDevice,
    families: &[vk::QueueFamilyProperties],
    surface: vk::SurfaceKHR,
) -> GfxResult<Option<u32>> {
    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        if !family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            continue;
        }
        let presents = query
            .supports_present(adapter, index, surface)
            .map_err(GfxError::AdapterEnumeration)?;
        if presents {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn type_rank(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 0,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        _ => 3,
    }
}
