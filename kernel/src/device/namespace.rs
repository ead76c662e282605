//! # Device Namespace Module
//!
//! Device numbering and node naming.
//!
//! ## Overview
//!
//! The lifecycle manager talks to the environment's device-management layer
//! only through [`DeviceNamespace`]:
//! 1. reserve a region of minor numbers under a fresh major number
//! 2. register each device's dispatch table under a node name
//! 3. unregister the nodes and release the region on teardown
//!
//! [`DevNamespace`] is an in-memory implementation. External callers reach
//! a registered device by node name through [`DevNamespace::open`].

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::debug;
use spin::Mutex;

use super::DeviceNumber;
use super::char::DeviceHandle;
use super::error::CdevError;
use super::fops::FileOperations;

/// Device-naming collaborator
pub trait DeviceNamespace: Send + Sync {
    /// Reserve `count` minor numbers starting at 0 and return the major number
    fn alloc_region(&self, count: usize, name: &str) -> Result<u32, CdevError>;

    /// Give back a region obtained from [`DeviceNamespace::alloc_region`]
    fn release_region(&self, major: u32, count: usize);

    /// Expose `fops` as device node `node_name` with number `number`
    fn register(
        &self,
        number: DeviceNumber,
        node_name: &str,
        fops: Arc<dyn FileOperations>,
    ) -> Result<(), CdevError>;

    /// Remove the node registered under `number`
    fn unregister(&self, number: DeviceNumber);
}

/// First major number handed out by [`DevNamespace`]
pub const DYNAMIC_MAJOR_BASE: u32 = 240;

struct Region {
    name: String,
    count: usize,
}

struct Node {
    name: String,
    fops: Arc<dyn FileOperations>,
}

struct NamespaceState {
    next_major: u32,
    regions: BTreeMap<u32, Region>,
    nodes: BTreeMap<DeviceNumber, Node>,
}

/// In-memory device namespace
pub struct DevNamespace {
    state: Mutex<NamespaceState>,
}

impl DevNamespace {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NamespaceState {
                next_major: DYNAMIC_MAJOR_BASE,
                regions: BTreeMap::new(),
                nodes: BTreeMap::new(),
            }),
        }
    }

    /// Dispatch table registered under `node_name`
    pub fn lookup(&self, node_name: &str) -> Option<Arc<dyn FileOperations>> {
        let state = self.state.lock();
        state
            .nodes
            .values()
            .find(|node| node.name == node_name)
            .map(|node| node.fops.clone())
    }

    /// Open the device registered under `node_name`
    pub fn open(&self, node_name: &str) -> Option<(Arc<dyn FileOperations>, DeviceHandle)> {
        let fops = self.lookup(node_name)?;
        let handle = fops.open();
        Some((fops, handle))
    }

    /// Names of all registered nodes, ordered by device number
    pub fn node_names(&self) -> Vec<String> {
        let state = self.state.lock();
        state.nodes.values().map(|node| node.name.clone()).collect()
    }

    pub fn is_registered(&self, number: DeviceNumber) -> bool {
        self.state.lock().nodes.contains_key(&number)
    }

    /// Name under which region `major` was reserved
    pub fn region_name(&self, major: u32) -> Option<String> {
        self.state.lock().regions.get(&major).map(|r| r.name.clone())
    }

    pub fn region_count(&self) -> usize {
        self.state.lock().regions.len()
    }
}

impl Default for DevNamespace {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceNamespace for DevNamespace {
    fn alloc_region(&self, count: usize, name: &str) -> Result<u32, CdevError> {
        let mut state = self.state.lock();
        let major = state.next_major;
        state.next_major = major
            .checked_add(1)
            .ok_or(CdevError::RegistrationFailed("device numbers exhausted"))?;
        state.regions.insert(major, Region { name: name.to_string(), count });
        debug!(target: "mycdev", "reserved region {} ({} minors) for {}", major, count, name);
        Ok(major)
    }

    fn release_region(&self, major: u32, count: usize) {
        let mut state = self.state.lock();
        state.regions.remove(&major);
        debug!(target: "mycdev", "released region {} ({} minors)", major, count);
    }

    fn register(
        &self,
        number: DeviceNumber,
        node_name: &str,
        fops: Arc<dyn FileOperations>,
    ) -> Result<(), CdevError> {
        let mut state = self.state.lock();
        let region = state
            .regions
            .get(&number.major)
            .ok_or(CdevError::RegistrationFailed("major number not reserved"))?;
        if number.minor as usize >= region.count {
            return Err(CdevError::RegistrationFailed("minor outside reserved region"));
        }
        if state.nodes.contains_key(&number) {
            return Err(CdevError::RegistrationFailed("device number already registered"));
        }
        if state.nodes.values().any(|node| node.name == node_name) {
            return Err(CdevError::RegistrationFailed("node name already in use"));
        }
        state.nodes.insert(number, Node { name: node_name.to_string(), fops });
        debug!(target: "mycdev", "registered {} as {}", node_name, number);
        Ok(())
    }

    fn unregister(&self, number: DeviceNumber) {
        let mut state = self.state.lock();
        if let Some(node) = state.nodes.remove(&number) {
            debug!(target: "mycdev", "unregistered {} ({})", node.name, number);
        }
    }
}
