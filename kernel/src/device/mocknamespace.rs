use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use super::DeviceNumber;
use super::error::CdevError;
use super::fops::FileOperations;
use super::namespace::{DevNamespace, DeviceNamespace};

/// Calls observed by [`MockNamespace`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceEvent {
    AllocRegion,
    ReleaseRegion,
    Register(u32),
    RegisterFailed(u32),
    Unregister(u32),
}

/// Mock device namespace for testing
///
/// Forwards to a [`DevNamespace`] while recording every call, and can be told
/// to refuse the region reservation or the registration of one minor number.
pub struct MockNamespace {
    inner: DevNamespace,
    fail_region: bool,
    fail_register_at: Option<u32>,
    events: Mutex<Vec<NamespaceEvent>>,
}

impl MockNamespace {
    pub fn new() -> Self {
        Self {
            inner: DevNamespace::new(),
            fail_region: false,
            fail_register_at: None,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Refuse registration of `minor`
    pub fn failing_at(minor: u32) -> Self {
        Self {
            fail_register_at: Some(minor),
            ..Self::new()
        }
    }

    /// Refuse the region reservation
    pub fn failing_region() -> Self {
        Self {
            fail_region: true,
            ..Self::new()
        }
    }

    pub fn events(&self) -> Vec<NamespaceEvent> {
        self.events.lock().clone()
    }

    pub fn inner(&self) -> &DevNamespace {
        &self.inner
    }

    fn record(&self, event: NamespaceEvent) {
        self.events.lock().push(event);
    }
}

impl DeviceNamespace for MockNamespace {
    fn alloc_region(&self, count: usize, name: &str) -> Result<u32, CdevError> {
        if self.fail_region {
            return Err(CdevError::RegistrationFailed("region unavailable"));
        }
        self.record(NamespaceEvent::AllocRegion);
        self.inner.alloc_region(count, name)
    }

    fn release_region(&self, major: u32, count: usize) {
        self.record(NamespaceEvent::ReleaseRegion);
        self.inner.release_region(major, count)
    }

    fn register(
        &self,
        number: DeviceNumber,
        node_name: &str,
        fops: Arc<dyn FileOperations>,
    ) -> Result<(), CdevError> {
        if self.fail_register_at == Some(number.minor) {
            self.record(NamespaceEvent::RegisterFailed(number.minor));
            return Err(CdevError::RegistrationFailed("injected failure"));
        }
        self.record(NamespaceEvent::Register(number.minor));
        self.inner.register(number, node_name, fops)
    }

    fn unregister(&self, number: DeviceNumber) {
        self.record(NamespaceEvent::Unregister(number.minor));
        self.inner.unregister(number)
    }
}
