//! TCP backend for boards bridged onto the network.
//!
//! The board side speaks the wide command header directly on the stream, so
//! there is no control endpoint, no bring-up and no status bytes to strip.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use super::{Connector, Error, Result, Transport, DEFAULT_TIMEOUT};

/// Where to find a networked board.
#[derive(Clone, Debug)]
pub struct TcpProbe {
    pub addr: SocketAddr,
    pub timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        TcpProbe {
            addr: SocketAddr::from(([192, 168, 1, 100], 1001)),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TcpProbe {
    /// Resolve `addr` (for example `"10.0.0.2:1001"`) and use the first result.
    pub fn new<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let addr = addr.to_socket_addrs()
                       .map_err(|_| Error::InvalidSpecifier)?
                       .next()
                       .ok_or(Error::InvalidSpecifier)?;
        Ok(TcpProbe { addr, ..Default::default() })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Display for TcpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp://{}", self.addr)
    }
}

impl Connector for TcpProbe {
    type Transport = TcpTransport;

    fn open(&self) -> Result<TcpTransport> {
        log::trace!("Connecting to {}", self);
        let stream = TcpStream::connect_timeout(&self.addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;
        log::debug!("Connected to {}", self);
        Ok(TcpTransport { stream })
    }
}

pub struct TcpTransport {
    stream: TcpStream,
}

impl Transport for TcpTransport {
    fn bulk_write(&mut self, data: &[u8]) -> Result<()> {
        log::trace!("TX: {:02X?}", data);
        self.stream.write_all(data)?;
        Ok(())
    }

    fn bulk_read(&mut self, max_length: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_length];
        let n = self.stream.read(&mut buf[..])?;
        if n == 0 && max_length > 0 {
            return Err(Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof,
                                                "connection closed by board")));
        }
        buf.truncate(n);
        log::trace!("RX: {:02X?}", buf);
        Ok(buf)
    }

    fn close(&mut self) -> Result<()> {
        log::debug!("Closing TCP connection");
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            r => Ok(r?),
        }
    }
}
