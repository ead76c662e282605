//! Dispatch table
//!
//! The uniform entry points the device namespace routes external calls
//! through, equivalent to a `file_operations` table. Data moves between the
//! device and the caller through a [`UserAccess`] collaborator.

use alloc::vec::Vec;

use super::char::DeviceHandle;
use super::error::CdevError;
use crate::mem::{UserAccess, UserAddr};

/// File operations of a registered character device
pub trait FileOperations: Send + Sync {
    /// Open a new handle on the device
    fn open(&self) -> DeviceHandle;

    /// Release a handle; always succeeds
    fn release(&self, handle: &mut DeviceHandle);

    /// Copy up to `count` bytes of device content to the caller at `buf`
    ///
    /// # Returns
    ///
    /// The number of bytes delivered
    fn read(
        &self,
        handle: &DeviceHandle,
        user: &dyn UserAccess,
        buf: UserAddr,
        count: usize,
    ) -> Result<usize, CdevError>;

    /// Take `count` bytes from the caller at `buf` and append them to the device
    ///
    /// # Returns
    ///
    /// The number of bytes accepted
    fn write(
        &self,
        handle: &DeviceHandle,
        user: &dyn UserAccess,
        buf: UserAddr,
        count: usize,
    ) -> Result<usize, CdevError>;

    /// Perform a control operation
    ///
    /// # Arguments
    ///
    /// * `cmd` - The control command identifier
    /// * `arg` - Command-specific argument
    ///
    /// # Default Implementation
    ///
    /// Rejects every command with `UnsupportedOperation`.
    fn ioctl(&self, handle: &DeviceHandle, cmd: u32, arg: usize) -> Result<i32, CdevError> {
        let _ = (handle, arg);
        Err(CdevError::UnsupportedOperation(cmd))
    }

    /// List of (command_id, description) for each supported control command
    fn supported_control_commands(&self) -> Vec<(u32, &'static str)> {
        Vec::new()
    }
}
