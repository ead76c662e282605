//! Character devices backed by a fixed-capacity buffer.

pub mod buffer;
pub mod buffered;
pub mod ioctl;

pub use buffer::DataBuffer;
pub use buffered::{BufferedCharDevice, DeviceHandle};
pub use ioctl::IOCTL_RESET_BUFFER;
