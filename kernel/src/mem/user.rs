//! Caller address-space transfer
//!
//! Devices never touch caller memory directly. Bytes leave a device through
//! [`UserAccess::transfer_out`] and enter it through [`UserAccess::transfer_in`],
//! the equivalent of `copy_to_user` / `copy_from_user`.
//!
//! [`UserMemory`] is a simulated caller address space: a contiguous mapped
//! region starting at a base address. Any access that runs past the mapped
//! range copies the in-range prefix and then faults.

use alloc::vec;
use alloc::vec::Vec;
use spin::Mutex;

use crate::device::error::CdevError;

/// Virtual address in the caller's address space
pub type UserAddr = usize;

/// A transfer stopped before all bytes were moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFault {
    /// Number of bytes moved before the fault
    pub transferred: usize,
}

impl From<TransferFault> for CdevError {
    fn from(fault: TransferFault) -> Self {
        CdevError::transfer_fault(fault.transferred)
    }
}

/// Address-space transfer collaborator
pub trait UserAccess: Send + Sync {
    /// Copy `bytes` to the caller at `dest`
    fn transfer_out(&self, dest: UserAddr, bytes: &[u8]) -> Result<(), TransferFault>;

    /// Fill `dest` with bytes taken from the caller at `src`
    fn transfer_in(&self, src: UserAddr, dest: &mut [u8]) -> Result<(), TransferFault>;
}

/// Simulated caller address space
pub struct UserMemory {
    base: UserAddr,
    region: Mutex<Vec<u8>>,
}

impl UserMemory {
    /// Map `size` zeroed bytes at `base`
    pub fn new(base: UserAddr, size: usize) -> Self {
        Self {
            base,
            region: Mutex::new(vec![0; size]),
        }
    }

    /// Map a copy of `contents` at `base`
    pub fn with_contents(base: UserAddr, contents: &[u8]) -> Self {
        Self {
            base,
            region: Mutex::new(contents.to_vec()),
        }
    }

    pub fn base(&self) -> UserAddr {
        self.base
    }

    pub fn size(&self) -> usize {
        self.region.lock().len()
    }

    /// Read `len` bytes at `addr`, or `None` if any of them is unmapped
    pub fn load(&self, addr: UserAddr, len: usize) -> Option<Vec<u8>> {
        let region = self.region.lock();
        let (offset, mapped) = self.translate(region.len(), addr, len);
        if mapped < len {
            return None;
        }
        Some(region[offset..offset + len].to_vec())
    }

    /// Returns the region offset for `addr` and how many of `len` bytes are mapped.
    fn translate(&self, region_len: usize, addr: UserAddr, len: usize) -> (usize, usize) {
        if addr < self.base || addr - self.base >= region_len {
            return (0, 0);
        }
        let offset = addr - self.base;
        (offset, len.min(region_len - offset))
    }
}

impl UserAccess for UserMemory {
    fn transfer_out(&self, dest: UserAddr, bytes: &[u8]) -> Result<(), TransferFault> {
        if bytes.is_empty() {
            return Ok(());
        }
        let mut region = self.region.lock();
        let (offset, mapped) = self.translate(region.len(), dest, bytes.len());
        region[offset..offset + mapped].copy_from_slice(&bytes[..mapped]);
        if mapped < bytes.len() {
            return Err(TransferFault { transferred: mapped });
        }
        Ok(())
    }

    fn transfer_in(&self, src: UserAddr, dest: &mut [u8]) -> Result<(), TransferFault> {
        if dest.is_empty() {
            return Ok(());
        }
        let region = self.region.lock();
        let (offset, mapped) = self.translate(region.len(), src, dest.len());
        dest[..mapped].copy_from_slice(&region[offset..offset + mapped]);
        if mapped < dest.len() {
            return Err(TransferFault { transferred: mapped });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_in_mapped() {
        let mem = UserMemory::with_contents(0x1000, b"abcdef");
        let mut dest = [0u8; 4];
        assert_eq!(mem.transfer_in(0x1001, &mut dest), Ok(()));
        assert_eq!(&dest, b"bcde");
    }

    #[test]
    fn test_transfer_in_partial_fault() {
        let mem = UserMemory::with_contents(0x1000, b"abcdef");
        let mut dest = [0u8; 4];
        let result = mem.transfer_in(0x1004, &mut dest);
        assert_eq!(result, Err(TransferFault { transferred: 2 }));
        assert_eq!(&dest[..2], b"ef");
    }

    #[test]
    fn test_transfer_out_unmapped() {
        let mem = UserMemory::new(0x1000, 8);
        assert_eq!(mem.transfer_out(0x0fff, b"x"), Err(TransferFault { transferred: 0 }));
        assert_eq!(mem.transfer_out(0x2000, b"x"), Err(TransferFault { transferred: 0 }));
        // Empty transfers never fault
        assert_eq!(mem.transfer_out(0x2000, b""), Ok(()));
    }

    #[test]
    fn test_transfer_out_then_load() {
        let mem = UserMemory::new(0x1000, 8);
        assert_eq!(mem.transfer_out(0x1002, b"hey"), Ok(()));
        assert_eq!(mem.load(0x1002, 3).as_deref(), Some(&b"hey"[..]));
        assert_eq!(mem.load(0x1006, 4), None);
        assert_eq!(mem.size(), 8);
        assert_eq!(mem.base(), 0x1000);
    }

    #[test]
    fn test_fault_into_error() {
        let err: CdevError = TransferFault { transferred: 7 }.into();
        assert_eq!(err, CdevError::TransferFault { transferred: 7 });
    }
}
