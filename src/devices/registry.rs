//! Name-to-factory table for MMIO device types.
//!
//! The composing code builds a registry, registers each device type it
//! knows how to construct, and hands the registry to whatever drives
//! device creation. No process-global state, no init-order dependency.

use std::collections::BTreeMap;

use crate::devices::mmio::MmioDevice;
use crate::err::MmioError;

type DeviceFactory = Box<dyn Fn() -> Result<Box<dyn MmioDevice>, MmioError>>;

#[derive(Default)]
pub struct DeviceRegistry {
    factories: BTreeMap<String, DeviceFactory>,
}

impl DeviceRegistry {
    /// Registers a factory under `name`. Duplicate names are rejected.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<(), MmioError>
    where
        F: Fn() -> Result<Box<dyn MmioDevice>, MmioError> + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(MmioError::DuplicateDevice(name.to_string()));
        }
        self.factories.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    /// Instantiates a device by type name.
    pub fn create(&self, name: &str) -> Result<Box<dyn MmioDevice>, MmioError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| MmioError::UnknownDevice(name.to_string()))?;
        factory()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
