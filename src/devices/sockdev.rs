//! MMIO-to-socket bridge device.
//!
//! Every guest access to the device's 4 KiB window becomes one protocol
//! exchange with an external peer process: reads block until the peer
//! answers, writes are fire-and-forget. The peer owns all register
//! semantics; this device has no register-specific logic.

use std::sync::Mutex;

use crate::devices::mmio::MmioDevice;
use crate::err::{MmioError, TransportError};
use crate::proto::{self, AccessSize};
use crate::transport::Transport;

/// Size of the MMIO window, fixed per device instance.
pub const SOCKDEV_WINDOW_SIZE: u64 = 0x1000;

pub struct SockDevice<T: Transport> {
    base_addr: u64,
    // Guards the whole encode -> send -> receive -> decode sequence. The
    // transport is one ordered byte stream; two interleaved exchanges
    // would corrupt both.
    transport: Mutex<T>,
}

impl<T: Transport> SockDevice<T> {
    /// Creates a bridge bound to `transport`. Fails if no peer is attached;
    /// the device must not come into existence without one.
    ///
    /// `base_addr` is informational, used only when mapping the device; 0
    /// means the composer maps it explicitly.
    pub fn new(transport: T, base_addr: u64) -> Result<Self, TransportError> {
        if !transport.is_connected() {
            return Err(TransportError::NotConnected);
        }
        Ok(Self {
            base_addr,
            transport: Mutex::new(transport),
        })
    }

    pub fn base_addr(&self) -> u64 {
        self.base_addr
    }

    /// Performs one read exchange and returns the value the peer supplied.
    ///
    /// Invalid sizes and transport failures yield 0 and a diagnostic; the
    /// device stays usable for the next access. No timeout is imposed on
    /// the response: a silent peer blocks the calling thread until the
    /// transport itself errors out.
    pub fn handle_read(&self, offset: u64, size: usize) -> u64 {
        let mut transport = self.transport.lock().unwrap_or_else(|e| e.into_inner());

        let size = match AccessSize::try_from(size) {
            Ok(size) => size,
            Err(e) => {
                log::error!("mmio-sockdev: invalid read at {offset:#x}: {e}");
                return 0;
            }
        };

        let req = proto::encode_read_request(offset as u32, size);
        if let Err(e) = transport.write_all(&req) {
            log::error!("mmio-sockdev: failed to send read request: {e}");
            // The peer never saw a full request, so no response is owed;
            // reading one would desynchronize the stream.
            return 0;
        }

        let mut buf = [0u8; 4];
        let buf = &mut buf[..size.bytes()];
        if let Err(e) = transport.read_exact(buf) {
            log::error!("mmio-sockdev: failed to read response: {e}");
            return 0;
        }

        proto::decode_response(buf, size)
    }

    /// Performs one write exchange. Fire-and-forget: once the bytes are on
    /// the wire the access is complete, the peer never responds.
    pub fn handle_write(&self, offset: u64, size: usize, value: u64) {
        let mut transport = self.transport.lock().unwrap_or_else(|e| e.into_inner());

        let size = match AccessSize::try_from(size) {
            Ok(size) => size,
            Err(e) => {
                log::error!("mmio-sockdev: invalid write at {offset:#x}: {e}");
                return;
            }
        };

        let req = proto::encode_write_request(offset as u32, size, value);
        if let Err(e) = transport.write_all(&req) {
            log::error!("mmio-sockdev: failed to send write request: {e}");
        }
    }
}

impl<T: Transport> MmioDevice for SockDevice<T> {
    // Runtime exchange failures are local to the access that hit them:
    // the guest sees 0 (reads) or a dropped write, never a bus error.
    fn read(&mut self, offset: u64, size: usize) -> Result<u64, MmioError> {
        Ok(self.handle_read(offset, size))
    }

    fn write(&mut self, offset: u64, size: usize, value: u64) -> Result<(), MmioError> {
        self.handle_write(offset, size, value);
        Ok(())
    }

    fn reset(&mut self) {
        // All register state lives in the peer.
    }

    fn get_size(&self) -> u64 {
        SOCKDEV_WINDOW_SIZE
    }

    fn min_access_size(&self) -> usize {
        1
    }

    fn max_access_size(&self) -> usize {
        4
    }
}
