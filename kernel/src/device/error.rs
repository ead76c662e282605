//! Device error definitions
//!
//! Defines the error type shared by the buffer, device, registry and
//! lifecycle layers.

/// Errors surfaced by character device operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdevError {
    /// Write would exceed the remaining buffer space; the buffer is unchanged
    OutOfCapacity {
        requested: usize,
        available: usize,
    },
    /// Copying to or from the caller's address space faulted
    TransferFault {
        transferred: usize,
    },
    /// Unrecognized control command
    UnsupportedOperation(u32),
    /// Ordinal outside of the registry
    NoSuchDevice(usize),
    /// Handle is closed or belongs to another device
    InvalidState,
    /// Buffer memory could not be allocated
    AllocationFailure,
    /// The naming collaborator refused a registration
    RegistrationFailed(&'static str),
}

const ENODEV: i32 = 19;
const ENOMEM: i32 = 12;
const EFAULT: i32 = 14;
const EBUSY: i32 = 16;
const EINVAL: i32 = 22;
const ENOSPC: i32 = 28;

impl CdevError {
    /// Create an out of capacity error
    pub fn out_of_capacity(requested: usize, available: usize) -> Self {
        Self::OutOfCapacity { requested, available }
    }

    /// Create a transfer fault error
    pub fn transfer_fault(transferred: usize) -> Self {
        Self::TransferFault { transferred }
    }

    /// Negative errno value, as returned through a syscall-style result code
    pub fn errno(&self) -> i32 {
        match self {
            CdevError::OutOfCapacity { .. } => -ENOSPC,
            CdevError::TransferFault { .. } => -EFAULT,
            CdevError::UnsupportedOperation(_) => -EINVAL,
            CdevError::NoSuchDevice(_) => -ENODEV,
            CdevError::InvalidState => -EINVAL,
            CdevError::AllocationFailure => -ENOMEM,
            CdevError::RegistrationFailed(_) => -EBUSY,
        }
    }

    /// Get a static string description of the error
    pub fn as_str(&self) -> &'static str {
        match self {
            CdevError::OutOfCapacity { .. } => "Out of buffer capacity",
            CdevError::TransferFault { .. } => "Address space transfer fault",
            CdevError::UnsupportedOperation(_) => "Operation not supported",
            CdevError::NoSuchDevice(_) => "No such device",
            CdevError::InvalidState => "Invalid handle state",
            CdevError::AllocationFailure => "Allocation failure",
            CdevError::RegistrationFailed(_) => "Device registration failed",
        }
    }
}

impl core::fmt::Display for CdevError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CdevError::OutOfCapacity { requested, available } => {
                write!(f, "Out of buffer capacity: requested {}, available {}", requested, available)
            }
            CdevError::TransferFault { transferred } => {
                write!(f, "Address space transfer fault after {} bytes", transferred)
            }
            CdevError::UnsupportedOperation(cmd) => {
                write!(f, "Unsupported control command: {:#x}", cmd)
            }
            CdevError::NoSuchDevice(ordinal) => {
                write!(f, "No such device: ordinal {}", ordinal)
            }
            CdevError::InvalidState => write!(f, "Invalid handle state"),
            CdevError::AllocationFailure => write!(f, "Allocation failure"),
            CdevError::RegistrationFailed(reason) => {
                write!(f, "Device registration failed: {}", reason)
            }
        }
    }
}
