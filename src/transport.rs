//! Byte-stream transports connecting the bridge to its peer process.
//!
//! The bridge only needs blocking, all-or-nothing primitives: a transfer
//! either moves the whole buffer or the exchange is abandoned. Short
//! transfers are reported with how far they got so the diagnostic says
//! whether the stream died mid-packet.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::Path;

use crate::err::TransportError;

pub trait Transport: Send {
    /// Writes the whole buffer or fails; may block indefinitely.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError>;

    /// Fills the whole buffer or fails; may block indefinitely.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;

    /// Whether a peer is attached. Checked once at device activation;
    /// a connection lost later surfaces as short I/O on the next exchange.
    fn is_connected(&self) -> bool;
}

impl Transport for Box<dyn Transport> {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).read_exact(buf)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

fn write_full(stream: &mut impl Write, buf: &[u8]) -> Result<(), TransportError> {
    let mut written = 0;
    while written < buf.len() {
        match stream.write(&buf[written..]) {
            Ok(0) => {
                return Err(TransportError::ShortWrite {
                    expected: buf.len(),
                    written,
                });
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Io(e)),
        }
    }
    stream.flush()?;
    Ok(())
}

fn read_full(stream: &mut impl Read, buf: &mut [u8]) -> Result<(), TransportError> {
    let mut read = 0;
    while read < buf.len() {
        match stream.read(&mut buf[read..]) {
            Ok(0) => {
                return Err(TransportError::ShortRead {
                    expected: buf.len(),
                    read,
                });
            }
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Io(e)),
        }
    }
    Ok(())
}

/// TCP connection to a peer. Nagle is disabled; every exchange is a
/// handful of bytes and the guest blocks on each one.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)?;
        Self::from_stream(stream)
    }

    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        write_full(&mut self.stream, buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        read_full(&mut self.stream, buf)
    }

    fn is_connected(&self) -> bool {
        self.stream.peer_addr().is_ok()
    }
}

/// Unix domain socket connection to a peer.
#[cfg(unix)]
pub struct UnixTransport {
    stream: UnixStream,
}

#[cfg(unix)]
impl UnixTransport {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let stream = UnixStream::connect(path)?;
        Ok(Self { stream })
    }

    pub fn from_stream(stream: UnixStream) -> Self {
        Self { stream }
    }
}

#[cfg(unix)]
impl Transport for UnixTransport {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        write_full(&mut self.stream, buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        read_full(&mut self.stream, buf)
    }

    fn is_connected(&self) -> bool {
        self.stream.peer_addr().is_ok()
    }
}

/// Opens a transport from a peer spec: `unix:<path>` for a Unix domain
/// socket, anything else is treated as a TCP `host:port`.
pub fn connect(spec: &str) -> Result<Box<dyn Transport>, TransportError> {
    #[cfg(unix)]
    if let Some(path) = spec.strip_prefix("unix:") {
        return Ok(Box::new(UnixTransport::connect(path)?));
    }
    Ok(Box::new(TcpTransport::connect(spec)?))
}
