//! GPU capability detection.

use ash::vk;
use std::collections::HashSet;
use std::ffi::CStr;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Detected GPU capabilities.
#[derive(Debug, Clone)]
pub struct GpuCapabilities {
    /// GPU vendor
    pub vendor: GpuVendor,
    /// Device name
    pub device_name: String,
    /// Device type (discrete, integrated, ...)
    pub device_type: vk::PhysicalDeviceType,
    /// Vulkan API version
    pub api_version: u32,
    /// Driver version
    pub driver_version: u32,

    /// Dynamic rendering support (VK 1.3 core)
    pub supports_dynamic_rendering: bool,
    /// Synchronization2 support (VK 1.3 core)
    pub supports_synchronization2: bool,

    /// Device-local memory in MB
    pub device_local_memory_mb: u64,
    /// Largest single buffer the device will create, in bytes.
    ///
    /// The staging batcher sizes its transfer buffers against this cap.
    pub max_buffer_size: u64,
    /// Maximum 2D image dimension
    pub max_image_dimension_2d: u32,
    /// Maximum push constant size in bytes
    pub max_push_constants_size: u32,

    /// Available device extensions
    pub available_extensions: HashSet<String>,
}

impl GpuCapabilities {
    /// Query capabilities from a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = instance.get_physical_device_properties(physical_device);
        let memory_properties = instance.get_physical_device_memory_properties(physical_device);

        let extensions = instance
            .enumerate_device_extension_properties(physical_device)
            .unwrap_or_default();

        let available_extensions: HashSet<String> = extensions
            .iter()
            .filter_map(|ext| {
                CStr::from_ptr(ext.extension_name.as_ptr())
                    .to_str()
                    .ok()
                    .map(String::from)
            })
            .collect();

        let vendor = GpuVendor::from_vendor_id(properties.vendor_id);
        let device_name = CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        let device_local_memory_mb: u64 = memory_properties
            .memory_heaps
            .iter()
            .take(memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size / (1024 * 1024))
            .sum();

        // maxBufferSize comes from maintenance4 (core in 1.3)
        let mut maintenance4 = vk::PhysicalDeviceMaintenance4Properties::default();
        let mut properties2 = vk::PhysicalDeviceProperties2::default().push_next(&mut maintenance4);
        instance.get_physical_device_properties2(physical_device, &mut properties2);

        let api_version = properties.api_version;
        let has_vulkan_1_3 =
            vk::api_version_major(api_version) >= 1 && vk::api_version_minor(api_version) >= 3;

        Self {
            vendor,
            device_name,
            device_type: properties.device_type,
            api_version,
            driver_version: properties.driver_version,

            supports_dynamic_rendering: has_vulkan_1_3,
            supports_synchronization2: has_vulkan_1_3,

            device_local_memory_mb,
            max_buffer_size: if maintenance4.max_buffer_size > 0 {
                maintenance4.max_buffer_size
            } else {
                // Drivers predating maintenance4 report 0; fall back to the
                // spec-guaranteed minimum.
                1 << 30
            },
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
            max_push_constants_size: properties.limits.max_push_constants_size,

            available_extensions,
        }
    }

    /// Check if the GPU meets minimum requirements for the renderer.
    pub fn meets_requirements(&self) -> bool {
        let api_major = vk::api_version_major(self.api_version);
        let api_minor = vk::api_version_minor(self.api_version);

        if api_major < 1 || (api_major == 1 && api_minor < 3) {
            return false;
        }

        self.available_extensions
            .contains(ash::khr::swapchain::NAME.to_str().unwrap_or_default())
    }

    /// Get a human-readable summary of capabilities.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}) - Vulkan {}.{}.{} - {} MB VRAM",
            self.device_name,
            self.vendor,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.device_local_memory_mb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0x8086), GpuVendor::Intel);
        assert_eq!(GpuVendor::from_vendor_id(0xABCD), GpuVendor::Other(0xABCD));
    }
}
