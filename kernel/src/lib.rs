//! # mycdev
//!
//! A small character-device driver core: a fixed number of device instances,
//! each owning a fixed-capacity byte buffer that callers reach through
//! open/read/write/ioctl entry points.
//!
//! ## Core Features
//!
//! - Runs without standard library support (`no_std` + `alloc`)
//! - Append-on-write buffers with all-or-nothing capacity accounting
//! - Non-consuming snapshot reads
//! - A single `IOCTL_RESET_BUFFER` control command
//! - Per-device exclusive locking; distinct devices never contend
//! - Startup with full reverse-order rollback on partial failure
//!
//! ## Layout
//!
//! - [`device::char`]: the buffer state and the buffered character device
//! - [`device::manager`]: the fixed-size device registry
//! - [`device::lifecycle`]: registry bring-up and teardown
//! - [`device::namespace`]: device numbering/naming collaborator
//! - [`device::fops`]: the dispatch table external callers are routed through
//! - [`mem::user`]: caller address-space transfer collaborator
//!
//! Trace events go through the `log` facade with target `"mycdev"`; the crate
//! never installs a logger itself.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod device;
pub mod environment;
pub mod mem;


pub use device::char::{BufferedCharDevice, DataBuffer, DeviceHandle, IOCTL_RESET_BUFFER};
pub use device::error::CdevError;
pub use device::lifecycle::{initialize, shutdown};
pub use device::manager::DeviceRegistry;
