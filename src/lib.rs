pub mod devices;
pub mod err;
pub mod proto;
pub mod transport;

pub use devices::*;
pub use err::*;
