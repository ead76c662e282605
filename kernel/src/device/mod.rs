pub mod char;
pub mod error;
pub mod fops;
pub mod lifecycle;
pub mod manager;
pub mod namespace;

#[cfg(test)]
pub mod mocknamespace;

pub trait Device {
    fn name(&self) -> &str;
    fn id(&self) -> usize;
    fn number(&self) -> DeviceNumber;
}

/// Major/minor pair identifying a device node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceNumber {
    pub major: u32,
    pub minor: u32,
}

impl DeviceNumber {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl core::fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}
