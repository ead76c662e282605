pub const MAX_BUF_SIZE: usize = 256; // bytes per device
pub const DEVICE_COUNT: usize = 2;
pub const DEVICE_NAME: &str = "mycdev";
pub const FIRST_MINOR: u32 = 0;
