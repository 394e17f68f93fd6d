pub mod mmio;
pub mod registry;
pub mod sockdev;

pub use mmio::*;
pub use sockdev::*;
