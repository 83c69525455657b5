// Capability registry - which instance/device extensions we ask for
//
// Each name carries a `required` flag. Required extensions missing from the
// platform abort creation; optional ones are dropped with a warning.

use ash::vk;
use std::collections::BTreeMap;
use std::ffi::{CStr, CString};

use crate::error::{GfxError, GfxResult};

#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    instance: BTreeMap<CString, bool>,
    device: BTreeMap<CString, bool>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The extension set the engine has always asked for.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.add_instance_extension(vk::KhrGetPhysicalDeviceProperties2Fn::name(), false);

        registry.add_device_extension(ash::extensions::khr::Swapchain::name(), true);
        registry.add_device_extension(vk::KhrDepthStencilResolveFn::name(), false);
        registry.add_device_extension(vk::KhrCreateRenderpass2Fn::name(), false);
        registry.add_device_extension(vk::KhrMaintenance2Fn::name(), false);
        registry.add_device_extension(vk::KhrMultiviewFn::name(), false);
        registry
    }

    /// Adding a name twice keeps it required if either call required it.
    pub fn add_instance_extension(&mut self, name: &CStr, required: bool) {
        *self.instance.entry(name.to_owned()).or_insert(false) |= required;
    }

    pub fn add_device_extension(&mut self, name: &CStr, required: bool) {
        *self.device.entry(name.to_owned()).or_insert(false) |= required;
    }

    pub fn is_device_extension_required(&self, name: &CStr) -> Option<bool> {
        self.device.get(name).copied()
    }

    pub fn is_instance_extension_required(&self, name: &CStr) -> Option<bool> {
        self.instance.get(name).copied()
    }

    pub fn resolve_instance(&self, available: &[vk::ExtensionProperties]) -> GfxResult<Vec<CString>> {
        resolve(&self.instance, &extension_names(available))
    }

    pub fn resolve_device(&self, available: &[vk::ExtensionProperties]) -> GfxResult<Vec<CString>> {
        resolve(&self.device, &extension_names(available))
    }
}

fn extension_names(properties: &[vk::ExtensionProperties]) -> Vec<&CStr> {
    properties
        .iter()
        // Safety: the driver fills extension_name with a NUL-terminated string
        .map(|p| unsafe { CStr::from_ptr(p.extension_name.as_ptr()) })
        .collect()
}

fn resolve(wanted: &BTreeMap<CString, bool>, available: &[&CStr]) -> GfxResult<Vec<CString>> {
    let mut enabled = Vec::with_capacity(wanted.len());
    for (name, &required) in wanted {
        if available.contains(&name.as_c_str()) {
            log::debug!("Extension enabled: {}", name.to_string_lossy());
            enabled.push(name.clone());
        } else if required {
            return Err(GfxError::MissingExtension(name.to_string_lossy().into_owned()));
        } else {
            log::warn!("Optional extension not available: {}", name.to_string_lossy());
        }
    }
    Ok(enabled)
}
