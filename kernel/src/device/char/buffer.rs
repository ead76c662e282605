//! Fixed-capacity device buffer.
//!
//! Every method assumes the caller already holds the owning device's lock.

use alloc::vec::Vec;

use crate::device::error::CdevError;
use crate::environment::MAX_BUF_SIZE;
use crate::mem::TransferFault;

/// Buffer state of one device instance
///
/// `storage` is always `MAX_BUF_SIZE` bytes long. Only `storage[..len]` is
/// meaningful content; bytes past `len` are stale until the next reset.
pub struct DataBuffer {
    storage: Vec<u8>,
    len: usize,
}

impl DataBuffer {
    /// Allocate a zero-filled buffer
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the backing memory cannot be reserved.
    pub fn try_new() -> Result<Self, CdevError> {
        #[cfg(test)]
        alloc_fault::check()?;
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(MAX_BUF_SIZE)
            .map_err(|_| CdevError::AllocationFailure)?;
        storage.resize(MAX_BUF_SIZE, 0);
        Ok(Self { storage, len: 0 })
    }

    /// Zero the whole storage and drop all content
    pub fn reset(&mut self) {
        self.storage.fill(0);
        self.len = 0;
    }

    /// Append `data` after the current content, all or nothing
    pub fn append(&mut self, data: &[u8]) -> Result<usize, CdevError> {
        self.append_with(data.len(), |slot| {
            slot.copy_from_slice(data);
            Ok(())
        })
    }

    /// Reserve `count` bytes after the current content and let `fill` write them.
    ///
    /// Capacity is checked before `fill` runs; if it does not fit, the buffer is
    /// untouched. If `fill` faults, the bytes it reported as transferred stay
    /// appended and the fault is returned.
    pub fn append_with<F>(&mut self, count: usize, fill: F) -> Result<usize, CdevError>
    where
        F: FnOnce(&mut [u8]) -> Result<(), TransferFault>,
    {
        let available = self.available();
        if count > available {
            return Err(CdevError::out_of_capacity(count, available));
        }

        let start = self.len;
        match fill(&mut self.storage[start..start + count]) {
            Ok(()) => {
                self.len += count;
                Ok(count)
            }
            Err(fault) => {
                self.len += fault.transferred.min(count);
                Err(fault.into())
            }
        }
    }

    /// The first `min(max_len, len)` bytes of content; consumes nothing
    pub fn read_prefix(&self, max_len: usize) -> &[u8] {
        &self.storage[..max_len.min(self.len)]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        MAX_BUF_SIZE
    }

    pub fn available(&self) -> usize {
        MAX_BUF_SIZE - self.len
    }
}
