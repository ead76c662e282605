//! # Device Registry Module
//!
//! This module provides the fixed-size collection of buffered character
//! devices and resolves device ordinals to instances.
//!
//! ## Overview
//!
//! The registry is responsible for:
//! - Owning exactly `DEVICE_COUNT` devices, indexed by ordinal
//! - Resolving an ordinal to its device
//! - Tearing everything down in reverse order when dropped
//!
//! The registry holds no lock of its own. Each device serializes access to
//! its own buffer, so operations on different ordinals never contend.
//!
//! ## Usage
//!
//! A registry only comes out of [`initialize`](super::lifecycle::initialize),
//! fully registered, and is passed by reference to whoever handles calls:
//!
//! ```
//! use std::sync::Arc;
//! use mycdev::device::namespace::DevNamespace;
//!
//! let registry = mycdev::initialize(Arc::new(DevNamespace::new()))?;
//! let device = registry.resolve(0)?;
//! let handle = device.open();
//! device.write(&handle, b"hello")?;
//! assert_eq!(device.read(&handle, 5)?, b"hello");
//! # Ok::<(), mycdev::CdevError>(())
//! ```

use alloc::sync::Arc;
use alloc::vec::Vec;

use log::info;

use super::char::{BufferedCharDevice, DeviceHandle};
use super::error::CdevError;
use super::lifecycle::{NumberRegion, Registration};

/// DeviceRegistry
///
/// # Fields
/// - `region`: the reserved device-number region, released last.
/// - `registrations`: one per device, in ordinal order.
pub struct DeviceRegistry {
    region: NumberRegion,
    registrations: Vec<Registration>,
}

impl DeviceRegistry {
    pub(crate) fn new(region: NumberRegion, capacity: usize) -> Self {
        Self {
            region,
            registrations: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, registration: Registration) {
        self.registrations.push(registration);
    }

    /// Device at `ordinal`
    ///
    /// # Errors
    ///
    /// `NoSuchDevice` if `ordinal` is not below the device count.
    pub fn resolve(&self, ordinal: usize) -> Result<&Arc<BufferedCharDevice>, CdevError> {
        self.registrations
            .get(ordinal)
            .map(Registration::device)
            .ok_or(CdevError::NoSuchDevice(ordinal))
    }

    /// Resolve `ordinal` and open a handle on it
    pub fn open(&self, ordinal: usize) -> Result<DeviceHandle, CdevError> {
        Ok(self.resolve(ordinal)?.open())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn major(&self) -> u32 {
        self.region.major()
    }

    /// Devices in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BufferedCharDevice>> {
        self.registrations.iter().map(Registration::device)
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        if !self.registrations.is_empty() {
            info!(target: "mycdev", "tearing down {} devices", self.registrations.len());
        }
        // Highest ordinal first; the region field is dropped afterwards
        while let Some(registration) = self.registrations.pop() {
            drop(registration);
        }
    }
}
