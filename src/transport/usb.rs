//! USB backend for FTDI FT232H/FT2232H bridges, using `rusb` to claim the
//! first interface and move data over its bulk endpoints.
//!
//! Opening a probe also performs the bring-up sequence: reset the bit mode,
//! select the mode the board expects (synchronous FIFO for register access,
//! MPSSE for JTAG) and program the latency timer.

use std::fmt;
use std::time::Duration;
use num_enum::IntoPrimitive;
use rusb::{Context, DeviceHandle, UsbContext};
use super::{Connector, Error, Result, Transport, DEFAULT_TIMEOUT};

/// Vendor request, host to device.
pub(crate) const VENDOR_OUT: u8 = 0x40;

/// wIndex selecting channel A of the bridge.
pub(crate) const CHANNEL_INDEX: u16 = 0x0001;

pub(crate) const PURGE_RX: u16 = 0x0001;
pub(crate) const PURGE_TX: u16 = 0x0002;

/// Every bulk IN packet starts with two modem status bytes.
pub(crate) const STATUS_LENGTH: usize = 2;

/// Size of each read while draining residual data.
const DRAIN_LENGTH: usize = 512;

#[derive(Copy, Clone, IntoPrimitive)]
#[repr(u8)]
pub(crate) enum Request {
    Reset               = 0x00,
    SetLatencyTimer     = 0x09,
    SetBitMode          = 0x0B,
}

/// Bit mode selected during bring-up, already shifted into the high byte
/// of wValue.
#[derive(Copy, Clone, Debug, Eq, PartialEq, IntoPrimitive)]
#[repr(u16)]
pub enum BitMode {
    Reset               = 0x0000,
    Mpsse               = 0x0200,
    SyncFifo            = 0x4000,
}

/// Settings used to find and bring up an FTDI bridge.
#[derive(Clone, Debug)]
pub struct UsbProbe {
    pub vid: u16,
    pub pid: u16,
    pub interface: u8,
    pub out_ep: u8,
    pub in_ep: u8,
    pub mode: BitMode,
    /// Latency timer in milliseconds.
    pub latency: u8,
    pub timeout: Duration,
}

impl UsbProbe {
    /// FT232H in synchronous FIFO mode, used for register access.
    pub fn fifo() -> Self {
        UsbProbe {
            vid: 0x0403,
            pid: 0x6014,
            interface: 0,
            out_ep: 0x02,
            in_ep: 0x81,
            mode: BitMode::SyncFifo,
            latency: 0xFF,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// FT2232H channel A in MPSSE mode, used for JTAG.
    pub fn mpsse() -> Self {
        UsbProbe {
            pid: 0x6010,
            mode: BitMode::Mpsse,
            latency: 0x01,
            ..Self::fifo()
        }
    }

    /// Replace VID and PID from a `VID:PID` hex specifier.
    pub fn with_specifier(mut self, spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.split(':').collect();
        if parts.len() != 2 {
            return Err(Error::InvalidSpecifier);
        }
        self.vid = u16::from_str_radix(parts[0], 16).or(Err(Error::InvalidSpecifier))?;
        self.pid = u16::from_str_radix(parts[1], 16).or(Err(Error::InvalidSpecifier))?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Display for UsbProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x} ({:?})", self.vid, self.pid, self.mode)
    }
}

impl Connector for UsbProbe {
    type Transport = UsbTransport;

    fn open(&self) -> Result<UsbTransport> {
        log::trace!("Opening USB device: {}", self);
        let context = Context::new()?;
        let mut handle = context
            .open_device_with_vid_pid(self.vid, self.pid)
            .ok_or(Error::DeviceNotFound)?;
        handle.claim_interface(self.interface)?;

        let mut transport = UsbTransport {
            handle,
            interface: self.interface,
            out_ep: self.out_ep,
            in_ep: self.in_ep,
            timeout: self.timeout,
        };
        transport.bring_up(self.mode, self.latency)?;
        log::debug!("Successfully opened {}", self);
        Ok(transport)
    }
}

/// Handle to an open, configured FTDI bridge.
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    interface: u8,
    out_ep: u8,
    in_ep: u8,
    timeout: Duration,
}

impl UsbTransport {
    fn bring_up(&mut self, mode: BitMode, latency: u8) -> Result<()> {
        log::debug!("Selecting {:?} mode, latency {}ms", mode, latency);
        self.control_write(VENDOR_OUT, Request::SetBitMode.into(), BitMode::Reset.into(),
                           CHANNEL_INDEX, &[])?;
        self.control_write(VENDOR_OUT, Request::SetBitMode.into(), mode.into(),
                           CHANNEL_INDEX, &[])?;
        self.control_write(VENDOR_OUT, Request::SetLatencyTimer.into(), latency.into(),
                           CHANNEL_INDEX, &[])?;
        Ok(())
    }
}

impl Transport for UsbTransport {
    fn control_write(&mut self, request_type: u8, request: u8, value: u16, index: u16, data: &[u8])
        -> Result<()>
    {
        log::trace!("CTRL: {:02X} {:02X} {:04X} {:04X}", request_type, request, value, index);
        self.handle.write_control(request_type, request, value, index, data, self.timeout)?;
        Ok(())
    }

    fn bulk_write(&mut self, data: &[u8]) -> Result<()> {
        log::trace!("TX: {:02X?}", data);
        let mut offset = 0;
        while offset < data.len() {
            offset += self.handle.write_bulk(self.out_ep, &data[offset..], self.timeout)?;
        }
        Ok(())
    }

    fn bulk_read(&mut self, max_length: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_length];
        let n = self.handle.read_bulk(self.in_ep, &mut buf[..], self.timeout)?;
        buf.truncate(n);
        log::trace!("RX: {:02X?}", buf);
        Ok(buf)
    }

    fn flush(&mut self) -> Result<()> {
        drain_and_purge(self)
    }

    fn close(&mut self) -> Result<()> {
        log::debug!("Releasing USB interface {}", self.interface);
        self.handle.release_interface(self.interface)?;
        Ok(())
    }
}

/// Discard anything left in the receive path of an FTDI bridge, then purge
/// both of its FIFOs.
///
/// Draining stops as soon as a read returns nothing but the status bytes,
/// or times out.
pub(crate) fn drain_and_purge<T: Transport + ?Sized>(transport: &mut T) -> Result<()> {
    log::debug!("Draining residual data");
    loop {
        match transport.bulk_read(DRAIN_LENGTH) {
            Ok(data) if data.len() > STATUS_LENGTH => continue,
            Ok(_) => break,
            Err(Error::Timeout) => {
                log::debug!("Drain timed out, assuming receive path is empty");
                break;
            },
            Err(e) => return Err(e),
        }
    }
    log::debug!("Purging RX and TX buffers");
    transport.control_write(VENDOR_OUT, Request::Reset.into(), PURGE_RX, CHANNEL_INDEX, &[])?;
    transport.control_write(VENDOR_OUT, Request::Reset.into(), PURGE_TX, CHANNEL_INDEX, &[])?;
    Ok(())
}
