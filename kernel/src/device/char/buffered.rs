//! Buffered character device.
//!
//! Each device owns a [`DataBuffer`] behind its own lock. Writes append,
//! reads return a snapshot of the content without consuming it, and
//! `IOCTL_RESET_BUFFER` zeroes everything. Every read, write and control call
//! on one device is serialized by that lock; open and close only touch
//! atomic counters and never block.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use log::{debug, error, warn};
use spin::{Mutex, MutexGuard};

use super::buffer::DataBuffer;
use super::ioctl::IOCTL_RESET_BUFFER;
use crate::device::error::CdevError;
use crate::device::fops::FileOperations;
use crate::device::{Device, DeviceNumber};
use crate::environment::DEVICE_NAME;
use crate::mem::{UserAccess, UserAddr};

/// An open handle on a [`BufferedCharDevice`]
///
/// Handles are `Open` from [`BufferedCharDevice::open`] until they are passed
/// to [`BufferedCharDevice::close`]. Operations on a closed handle, or on a
/// handle opened on a different device, fail with `InvalidState`.
#[derive(Debug)]
pub struct DeviceHandle {
    device: u64,
    ordinal: usize,
    id: u64,
    open: bool,
}

impl DeviceHandle {
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// Source of per-instance tokens; a handle only matches the instance that issued it.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Character device backed by a fixed-capacity byte buffer
pub struct BufferedCharDevice {
    instance: u64,
    ordinal: usize,
    number: DeviceNumber,
    name: String,
    buffer: Mutex<DataBuffer>,
    open_handles: AtomicUsize,
    next_handle_id: AtomicU64,
    removed: AtomicBool,
}

impl BufferedCharDevice {
    /// Create a device with a zero-filled buffer
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the buffer cannot be allocated.
    pub fn new(ordinal: usize, number: DeviceNumber) -> Result<Self, CdevError> {
        let buffer = DataBuffer::try_new()?;
        Ok(Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            ordinal,
            number,
            name: format!("{}-{}", DEVICE_NAME, ordinal),
            buffer: Mutex::new(buffer),
            open_handles: AtomicUsize::new(0),
            next_handle_id: AtomicU64::new(0),
            removed: AtomicBool::new(false),
        })
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn open(&self) -> DeviceHandle {
        debug!(target: "mycdev", "{}: open", self.name);
        self.open_handles.fetch_add(1, Ordering::AcqRel);
        DeviceHandle {
            device: self.instance,
            ordinal: self.ordinal,
            id: self.next_handle_id.fetch_add(1, Ordering::Relaxed),
            open: true,
        }
    }

    /// Close `handle`. Closing twice, or closing a foreign handle, is a no-op.
    pub fn close(&self, handle: &mut DeviceHandle) {
        debug!(target: "mycdev", "{}: close", self.name);
        if handle.open && handle.device == self.instance {
            handle.open = false;
            self.open_handles.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Take the device out of service and drop its content.
    ///
    /// Called when the device is unregistered. Every later read, write or
    /// control call fails with `NoSuchDevice`, whoever still holds the device.
    pub fn remove(&self) {
        let mut buffer = self.buffer.lock();
        self.removed.store(true, Ordering::Release);
        buffer.reset();
        debug!(target: "mycdev", "{}: removed", self.name);
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    fn check_handle(&self, handle: &DeviceHandle) -> Result<(), CdevError> {
        if !handle.open || handle.device != self.instance {
            warn!(target: "mycdev", "{}: rejected handle {} (ordinal {}, open {})",
                self.name, handle.id, handle.ordinal, handle.open);
            return Err(CdevError::InvalidState);
        }
        Ok(())
    }

    fn check_present(&self) -> Result<(), CdevError> {
        if self.is_removed() {
            warn!(target: "mycdev", "{}: device removed", self.name);
            return Err(CdevError::NoSuchDevice(self.ordinal));
        }
        Ok(())
    }

    /// Lock the buffer of a device that is still in service
    fn lock_present(&self) -> Result<MutexGuard<'_, DataBuffer>, CdevError> {
        let buffer = self.buffer.lock();
        self.check_present()?;
        Ok(buffer)
    }

    /// Snapshot of the first `min(max_len, len)` bytes of content
    pub fn read(&self, handle: &DeviceHandle, max_len: usize) -> Result<Vec<u8>, CdevError> {
        debug!(target: "mycdev", "{}: read", self.name);
        self.check_handle(handle)?;
        let buffer = self.lock_present()?;
        Ok(buffer.read_prefix(max_len).to_vec())
    }

    /// Deliver up to `count` bytes of content to the caller at `dest`
    ///
    /// A transfer fault leaves the buffer unchanged and reports nothing as
    /// delivered.
    pub fn read_to(
        &self,
        handle: &DeviceHandle,
        user: &dyn UserAccess,
        dest: UserAddr,
        count: usize,
    ) -> Result<usize, CdevError> {
        debug!(target: "mycdev", "{}: read", self.name);
        self.check_handle(handle)?;
        let buffer = self.lock_present()?;
        let content = buffer.read_prefix(count);
        if let Err(fault) = user.transfer_out(dest, content) {
            error!(target: "mycdev", "{}: copy data to user failed", self.name);
            return Err(fault.into());
        }
        Ok(content.len())
    }

    /// Append `data`; fails with `OutOfCapacity` if it does not fit entirely
    pub fn write(&self, handle: &DeviceHandle, data: &[u8]) -> Result<usize, CdevError> {
        debug!(target: "mycdev", "{}: write {} bytes", self.name, data.len());
        self.check_handle(handle)?;
        let mut buffer = self.lock_present()?;
        buffer.append(data).inspect_err(|e| self.log_write_error(e))
    }

    /// Append `count` bytes taken from the caller at `src`
    ///
    /// Capacity is checked before anything is copied. If the copy faults
    /// midway, the bytes copied so far stay in the buffer and
    /// `TransferFault` is returned.
    pub fn write_from(
        &self,
        handle: &DeviceHandle,
        user: &dyn UserAccess,
        src: UserAddr,
        count: usize,
    ) -> Result<usize, CdevError> {
        debug!(target: "mycdev", "{}: write {} bytes", self.name, count);
        self.check_handle(handle)?;
        let mut buffer = self.lock_present()?;
        buffer
            .append_with(count, |slot| user.transfer_in(src, slot))
            .inspect_err(|e| self.log_write_error(e))
    }

    fn log_write_error(&self, err: &CdevError) {
        match err {
            CdevError::TransferFault { .. } => {
                error!(target: "mycdev", "{}: copy data from user failed: {}", self.name, err)
            }
            _ => warn!(target: "mycdev", "{}: write rejected: {}", self.name, err),
        }
    }

    /// Dispatch a control command
    pub fn control(&self, handle: &DeviceHandle, cmd: u32) -> Result<(), CdevError> {
        debug!(target: "mycdev", "{}: ioctl {:#x}", self.name, cmd);
        match cmd {
            IOCTL_RESET_BUFFER => self.control_reset(handle),
            _ => {
                self.check_handle(handle)?;
                self.check_present()?;
                Err(CdevError::UnsupportedOperation(cmd))
            }
        }
    }

    /// Zero the buffer and drop all content
    pub fn control_reset(&self, handle: &DeviceHandle) -> Result<(), CdevError> {
        debug!(target: "mycdev", "{}: ioctl reset", self.name);
        self.check_handle(handle)?;
        self.lock_present()?.reset();
        debug!(target: "mycdev", "{}: buffer reset", self.name);
        Ok(())
    }

    /// Current content length
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.lock().capacity()
    }

    pub fn available(&self) -> usize {
        self.buffer.lock().available()
    }

    pub fn open_count(&self) -> usize {
        self.open_handles.load(Ordering::Acquire)
    }
}

impl Device for BufferedCharDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> usize {
        self.ordinal
    }

    fn number(&self) -> DeviceNumber {
        self.number
    }
}

impl FileOperations for BufferedCharDevice {
    fn open(&self) -> DeviceHandle {
        BufferedCharDevice::open(self)
    }

    fn release(&self, handle: &mut DeviceHandle) {
        self.close(handle)
    }

    fn read(
        &self,
        handle: &DeviceHandle,
        user: &dyn UserAccess,
        buf: UserAddr,
        count: usize,
    ) -> Result<usize, CdevError> {
        self.read_to(handle, user, buf, count)
    }

    fn write(
        &self,
        handle: &DeviceHandle,
        user: &dyn UserAccess,
        buf: UserAddr,
        count: usize,
    ) -> Result<usize, CdevError> {
        self.write_from(handle, user, buf, count)
    }

    fn ioctl(&self, handle: &DeviceHandle, cmd: u32, _arg: usize) -> Result<i32, CdevError> {
        self.control(handle, cmd).map(|()| 0)
    }

    fn supported_control_commands(&self) -> Vec<(u32, &'static str)> {
        vec![(IOCTL_RESET_BUFFER, "Reset the device buffer")]
    }
}
