//! This is the lowest-level module. A `Connector` knows how to reach a board
//! and hands back an open `Transport`, which moves raw bytes and nothing else.
//! Two backends exist: USB bulk endpoints on an FTDI bridge (`usb`) and a
//! plain TCP stream (`tcp`). Command framing lives above this layer.

use std::io;
use std::time::Duration;
use thiserror::Error;

pub mod mock;
pub mod tcp;
pub mod usb;

pub use tcp::{TcpProbe, TcpTransport};
pub use usb::{BitMode, UsbProbe, UsbTransport};

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid specifier, use VID:PID or HOST:PORT.")]
    InvalidSpecifier,
    #[error("device not found.")]
    DeviceNotFound,
    #[error("timed out waiting for the device.")]
    Timeout,
    #[error("USB transfer error")]
    Usb(#[source] rusb::Error),
    #[error("socket transfer error")]
    Io(#[source] io::Error),
    #[error("operation not supported by this transport.")]
    Unsupported,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusb::Error> for Error {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Timeout => Error::Timeout,
            rusb::Error::NoDevice | rusb::Error::NotFound => Error::DeviceNotFound,
            err => Error::Usb(err),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout,
            io::ErrorKind::ConnectionRefused => Error::DeviceNotFound,
            _ => Error::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Upper bound on every individual transport call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// A reachable board which can be opened into a `Transport`.
pub trait Connector {
    type Transport: Transport;

    /// Open the link and run whatever bring-up the backend needs.
    ///
    /// Fails with `Error::DeviceNotFound` if nothing answers.
    fn open(&self) -> Result<Self::Transport>;
}

/// Byte-oriented channel to an open board.
///
/// Every call blocks until it completes or the transport's timeout expires.
/// Implementations are not expected to be shared between threads.
pub trait Transport {
    /// Issue a vendor control request.
    ///
    /// Only the USB backend has a control endpoint.
    fn control_write(&mut self, _request_type: u8, _request: u8, _value: u16, _index: u16,
                     _data: &[u8]) -> Result<()>
    {
        Err(Error::Unsupported)
    }

    /// Write all of `data` to the board.
    fn bulk_write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `max_length` bytes, waiting up to the transport timeout.
    fn bulk_read(&mut self, max_length: usize) -> Result<Vec<u8>>;

    /// Discard anything the board has buffered for us.
    ///
    /// Links without a receive buffer of their own have nothing to do.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the link. Dropping a transport has the same effect, minus
    /// the error report.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
