//! Control command codes.
//!
//! Codes use the Linux `_IO` layout: `dir(2) | size(14) | type(8) | nr(8)`,
//! with no direction and no argument size.

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;

/// Encode an argument-less control command
pub const fn io(ty: u8, nr: u8) -> u32 {
    ((ty as u32) << IOC_TYPESHIFT) | ((nr as u32) << IOC_NRSHIFT)
}

/// Zero the device buffer
pub const IOCTL_RESET_BUFFER: u32 = io(b'r', 1);
