//! Registry bring-up and teardown.
//!
//! Every resource acquired during [`initialize`] is owned by a guard whose
//! `Drop` gives it back: [`NumberRegion`] releases the device-number region,
//! [`Registration`] unregisters one device node and frees its buffer. The
//! guards are collected into a [`DeviceRegistry`] as they are acquired, so a
//! failure at ordinal `i` unwinds ordinals `i-1..=0` in reverse and then the
//! region, and no partially registered registry ever reaches a caller.

use alloc::sync::Arc;

use log::{error, info};

use super::char::BufferedCharDevice;
use super::error::CdevError;
use super::manager::DeviceRegistry;
use super::namespace::DeviceNamespace;
use super::{Device, DeviceNumber};
use crate::environment::{DEVICE_COUNT, DEVICE_NAME, FIRST_MINOR};

/// Reserved device-number region, released on drop
pub struct NumberRegion {
    major: u32,
    count: usize,
    namespace: Arc<dyn DeviceNamespace>,
}

impl NumberRegion {
    fn reserve(namespace: &Arc<dyn DeviceNamespace>, count: usize) -> Result<Self, CdevError> {
        let major = namespace.alloc_region(count, DEVICE_NAME).inspect_err(|e| {
            error!(target: "mycdev", "allocate a range of char device numbers failed: {}", e)
        })?;
        info!(target: "mycdev", "device major number is: {}", major);
        Ok(Self {
            major,
            count,
            namespace: namespace.clone(),
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }
}

impl Drop for NumberRegion {
    fn drop(&mut self) {
        self.namespace.release_region(self.major, self.count);
    }
}

/// A device registered with the namespace, unregistered on drop
pub struct Registration {
    device: Arc<BufferedCharDevice>,
    namespace: Arc<dyn DeviceNamespace>,
}

impl Registration {
    fn create(
        namespace: &Arc<dyn DeviceNamespace>,
        ordinal: usize,
        number: DeviceNumber,
    ) -> Result<Self, CdevError> {
        let device = BufferedCharDevice::new(ordinal, number).inspect_err(|_| {
            error!(target: "mycdev", "allocation memory for data buffer failed")
        })?;
        let device = Arc::new(device);
        namespace
            .register(number, device.name(), device.clone())
            .inspect_err(|e| {
                error!(target: "mycdev", "unable to add char device {}: {}", ordinal, e)
            })?;
        Ok(Self {
            device,
            namespace: namespace.clone(),
        })
    }

    pub fn device(&self) -> &Arc<BufferedCharDevice> {
        &self.device
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        // Callers that still hold the device must not reach its buffer
        self.device.remove();
        self.namespace.unregister(self.device.number());
    }
}

/// Allocate, initialize and register all `DEVICE_COUNT` devices
///
/// # Errors
///
/// The first error hit while reserving the number region, allocating a
/// buffer or registering a device. Everything acquired before it has been
/// released, in reverse order, by the time the error is returned.
pub fn initialize(namespace: Arc<dyn DeviceNamespace>) -> Result<DeviceRegistry, CdevError> {
    info!(target: "mycdev", "initializing {} devices", DEVICE_COUNT);
    let region = NumberRegion::reserve(&namespace, DEVICE_COUNT)?;
    let major = region.major();
    let mut registry = DeviceRegistry::new(region, DEVICE_COUNT);

    for ordinal in 0..DEVICE_COUNT {
        let number = DeviceNumber::new(major, FIRST_MINOR + ordinal as u32);
        // On error the partial registry unwinds as it drops
        registry.push(Registration::create(&namespace, ordinal, number)?);
    }

    info!(target: "mycdev", "{} devices registered under major {}", registry.len(), major);
    Ok(registry)
}

/// Unregister and destroy every device in reverse ordinal order, then
/// release the number region
pub fn shutdown(registry: DeviceRegistry) {
    info!(target: "mycdev", "shutting down major {}", registry.major());
    drop(registry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mocknamespace::{MockNamespace, NamespaceEvent};
    use crate::device::char::buffer::alloc_fault;
    use crate::device::fops::FileOperations;
    use crate::device::namespace::DevNamespace;
    use crate::mem::UserMemory;
    use alloc::vec;

    #[test]
    fn test_initialize_registers_all_devices() {
        let ns = Arc::new(DevNamespace::new());
        let registry = initialize(ns.clone()).unwrap();

        assert_eq!(registry.len(), DEVICE_COUNT);
        assert_eq!(ns.node_names(), vec!["mycdev-0", "mycdev-1"]);
        assert_eq!(ns.region_name(registry.major()).as_deref(), Some(DEVICE_NAME));
        for (ordinal, device) in registry.iter().enumerate() {
            assert_eq!(device.ordinal(), ordinal);
            assert_eq!(device.number(), DeviceNumber::new(registry.major(), ordinal as u32));
            assert!(device.is_empty());
        }

        shutdown(registry);
        assert!(ns.node_names().is_empty());
        assert_eq!(ns.region_count(), 0);
    }

    #[test]
    fn test_shutdown_is_reverse_order() {
        let ns = Arc::new(MockNamespace::new());
        let registry = initialize(ns.clone()).unwrap();
        shutdown(registry);

        assert_eq!(
            ns.events(),
            vec![
                NamespaceEvent::AllocRegion,
                NamespaceEvent::Register(0),
                NamespaceEvent::Register(1),
                NamespaceEvent::Unregister(1),
                NamespaceEvent::Unregister(0),
                NamespaceEvent::ReleaseRegion,
            ]
        );
    }

    #[test]
    fn test_rollback_on_late_registration_failure() {
        let ns = Arc::new(MockNamespace::failing_at(1));
        let result = initialize(ns.clone());

        assert_eq!(result.err(), Some(CdevError::RegistrationFailed("injected failure")));
        assert_eq!(
            ns.events(),
            vec![
                NamespaceEvent::AllocRegion,
                NamespaceEvent::Register(0),
                NamespaceEvent::RegisterFailed(1),
                NamespaceEvent::Unregister(0),
                NamespaceEvent::ReleaseRegion,
            ]
        );
        assert!(ns.inner().node_names().is_empty());
        assert_eq!(ns.inner().region_count(), 0);
    }

    #[test]
    fn test_rollback_on_first_registration_failure() {
        let ns = Arc::new(MockNamespace::failing_at(0));
        assert!(initialize(ns.clone()).is_err());
        assert_eq!(
            ns.events(),
            vec![
                NamespaceEvent::AllocRegion,
                NamespaceEvent::RegisterFailed(0),
                NamespaceEvent::ReleaseRegion,
            ]
        );
    }

    #[test]
    fn test_rollback_on_allocation_failure() {
        let ns = Arc::new(MockNamespace::new());
        alloc_fault::fail_after(1);
        let result = initialize(ns.clone());

        assert_eq!(result.err(), Some(CdevError::AllocationFailure));
        assert_eq!(
            ns.events(),
            vec![
                NamespaceEvent::AllocRegion,
                NamespaceEvent::Register(0),
                NamespaceEvent::Unregister(0),
                NamespaceEvent::ReleaseRegion,
            ]
        );
        assert!(ns.inner().node_names().is_empty());
        assert_eq!(ns.inner().region_count(), 0);
    }

    #[test]
    fn test_first_allocation_failure_releases_region() {
        let ns = Arc::new(MockNamespace::new());
        alloc_fault::fail_after(0);
        assert_eq!(initialize(ns.clone()).err(), Some(CdevError::AllocationFailure));
        assert_eq!(
            ns.events(),
            vec![NamespaceEvent::AllocRegion, NamespaceEvent::ReleaseRegion]
        );
    }

    #[test]
    fn test_shutdown_disables_escaped_devices() {
        let ns = Arc::new(DevNamespace::new());
        let registry = initialize(ns.clone()).unwrap();

        let (fops, fops_handle) = ns.open("mycdev-0").unwrap();
        let escaped = registry.resolve(1).unwrap().clone();
        let escaped_handle = escaped.open();
        escaped.write(&escaped_handle, b"stale").unwrap();

        shutdown(registry);

        let user = UserMemory::with_contents(0x1000, b"after");
        assert_eq!(fops.write(&fops_handle, &user, 0x1000, 5), Err(CdevError::NoSuchDevice(0)));
        assert_eq!(escaped.write(&escaped_handle, b"after"), Err(CdevError::NoSuchDevice(1)));
        assert_eq!(escaped.read(&escaped_handle, 16), Err(CdevError::NoSuchDevice(1)));
        assert_eq!(escaped.control_reset(&escaped_handle), Err(CdevError::NoSuchDevice(1)));
        assert!(escaped.is_removed());
        assert!(escaped.is_empty());
    }

    #[test]
    fn test_handles_do_not_cross_registries() {
        let first = initialize(Arc::new(DevNamespace::new())).unwrap();
        let second = initialize(Arc::new(DevNamespace::new())).unwrap();

        let mut handle = first.open(0).unwrap();
        let other = second.resolve(0).unwrap();
        assert_eq!(other.write(&handle, b"x"), Err(CdevError::InvalidState));
        assert_eq!(other.read(&handle, 1), Err(CdevError::InvalidState));
        assert!(other.is_empty());

        // Closing through the wrong device leaves the handle open
        other.close(&mut handle);
        assert!(handle.is_open());
        assert_eq!(first.resolve(0).unwrap().write(&handle, b"x"), Ok(1));
    }

    #[test]
    fn test_region_failure_acquires_nothing() {
        let ns = Arc::new(MockNamespace::failing_region());
        let result = initialize(ns.clone());
        assert_eq!(result.err(), Some(CdevError::RegistrationFailed("region unavailable")));
        assert!(ns.events().is_empty());
    }

    #[test]
    fn test_rollback_frees_buffers() {
        let ns = Arc::new(MockNamespace::failing_at(1));
        let _ = initialize(ns.clone());
        // The namespace dropped its dispatch table and the registry is gone,
        // so no device from the failed attempt is reachable.
        assert!(ns.inner().lookup("mycdev-0").is_none());
    }

    #[test]
    fn test_reinitialize_after_shutdown_starts_empty() {
        let ns = Arc::new(DevNamespace::new());
        let registry = initialize(ns.clone()).unwrap();
        let handle = registry.open(0).unwrap();
        registry.resolve(0).unwrap().write(&handle, b"volatile").unwrap();
        shutdown(registry);

        let registry = initialize(ns.clone()).unwrap();
        assert!(registry.resolve(0).unwrap().is_empty());
    }
}
