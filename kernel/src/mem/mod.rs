//! Memory module
//!
//! Caller address-space access used by the device read/write paths.

pub mod user;

pub use user::{TransferFault, UserAccess, UserAddr, UserMemory};
