use thiserror::Error;

#[derive(Error, Debug)]
pub enum SockdevError {
    #[error("MMIO error: {0}")]
    Mmio(#[from] MmioError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("General error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Error, Debug, Clone)]
pub enum MmioError {
    #[error("Unmapped memory access at address 0x{0:016x}")]
    UnmappedAccess(u64),

    #[error("Invalid alignment: address 0x{addr:016x} not aligned for {size}-byte access")]
    InvalidAlignment { addr: u64, size: usize },

    #[error("Invalid access size: {size} bytes")]
    InvalidSize { size: usize },

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Unknown device type {0:?}")]
    UnknownDevice(String),

    #[error("Device type {0:?} is already registered")]
    DuplicateDevice(String),

    #[error(
        "Overlapping MMIO region: new region [0x{new_start:016x}, 0x{new_end:016x}) overlaps with existing region [0x{existing_start:016x}, 0x{existing_end:016x})"
    )]
    OverlappingRegion {
        existing_start: u64,
        existing_end: u64,
        new_start: u64,
        new_end: u64,
    },
}

// Helper constructor for the overlapping region error
impl MmioError {
    pub fn overlapping_region(existing: (u64, u64), new: (u64, u64)) -> Self {
        Self::OverlappingRegion {
            existing_start: existing.0,
            existing_end: existing.1,
            new_start: new.0,
            new_end: new.1,
        }
    }
}

/// Failures of the byte stream between the bridge and its peer.
///
/// Short reads and writes carry how far the transfer got; the bridge treats
/// anything less than the full buffer as a failed exchange, never as a
/// partial success to resume.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport is not connected")]
    NotConnected,

    #[error("Short write: {written} of {expected} bytes sent before the stream closed")]
    ShortWrite { expected: usize, written: usize },

    #[error("Short read: {read} of {expected} bytes received before the stream closed")]
    ShortRead { expected: usize, read: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
