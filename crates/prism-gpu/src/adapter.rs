//! GPU adapter enumeration.
//!
//! Lists every physical device visible to the instance along with its
//! capabilities and queue families. The list is populated once at startup
//! and read thereafter; `AdapterInfo` is immutable after enumeration.

use crate::capabilities::GpuCapabilities;
use crate::error::Result;
use ash::vk;

/// A queue family exposed by an adapter.
#[derive(Debug, Clone, Copy)]
pub struct QueueFamilyInfo {
    /// Index of the family on the adapter.
    pub index: u32,
    /// Number of queues the family provides.
    pub queue_count: u32,
    /// Supports graphics work.
    pub graphics: bool,
    /// Supports compute work.
    pub compute: bool,
    /// Supports transfer work.
    pub transfer: bool,
}

/// Description of one GPU adapter.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Raw physical device handle.
    pub physical_device: vk::PhysicalDevice,
    /// Detected capabilities.
    pub capabilities: GpuCapabilities,
    /// Queue families, in family-index order.
    pub queue_families: Vec<QueueFamilyInfo>,
}

impl AdapterInfo {
    /// One-line description for startup logging.
    pub fn describe(&self) -> String {
        let queues: Vec<String> = self
            .queue_families
            .iter()
            .map(|f| {
                let mut flags = String::new();
                if f.graphics {
                    flags.push('G');
                }
                if f.compute {
                    flags.push('C');
                }
                if f.transfer {
                    flags.push('T');
                }
                format!("{}x{}[{}]", f.index, f.queue_count, flags)
            })
            .collect();
        format!("{} queues: {}", self.capabilities.summary(), queues.join(" "))
    }
}

/// Enumerate all adapters visible to the instance.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn enumerate_adapters(instance: &ash::Instance) -> Result<Vec<AdapterInfo>> {
    let devices = instance.enumerate_physical_devices()?;

    let mut adapters = Vec::with_capacity(devices.len());
    for physical_device in devices {
        let capabilities = GpuCapabilities::query(instance, physical_device);

        let queue_families = instance
            .get_physical_device_queue_family_properties(physical_device)
            .iter()
            .enumerate()
            .map(|(index, family)| QueueFamilyInfo {
                index: index as u32,
                queue_count: family.queue_count,
                graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                compute: family.queue_flags.contains(vk::QueueFlags::COMPUTE),
                transfer: family.queue_flags.contains(vk::QueueFlags::TRANSFER),
            })
            .collect();

        adapters.push(AdapterInfo {
            physical_device,
            capabilities,
            queue_families,
        });
    }

    Ok(adapters)
}
