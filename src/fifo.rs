//! Register access through the board's FIFO command path.
//!
//! Every transfer is split into chunks no larger than the framing allows.
//! Each chunk is described by one header naming the port and start address;
//! writes follow each header with the chunk's payload, while reads send all
//! their headers first and then collect the returned data.

use thiserror::Error;
use crate::framing::{self, Framing, Op};
use crate::transport::{self, Transport};

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error")]
    Transport(#[from] transport::Error),
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },
    #[error("length {length} is not a multiple of the {unit}-byte transfer unit")]
    UnalignedLength { length: usize, unit: usize },
    #[error("transfer of {length} bytes exceeds the {max}-byte limit")]
    TooLarge { length: usize, max: usize },
    #[error("operation not supported by this framing")]
    Unsupported,
    #[error("bitstream is empty")]
    EmptyBitstream,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Port whose register drives the edge outputs.
pub const EDGE_PORT: u8 = 0;

/// FIFO codec borrowing an open transport.
pub struct Fifo<'a, T: Transport> {
    transport: &'a mut T,
    framing: Framing,
}

impl<'a, T: Transport> Fifo<'a, T> {
    pub fn new(transport: &'a mut T, framing: Framing) -> Self {
        Fifo { transport, framing }
    }

    pub fn framing(&self) -> &Framing {
        &self.framing
    }

    /// Write `data` to `port` starting at `address`.
    ///
    /// With `auto_increment` each chunk lands after the previous one,
    /// otherwise every chunk targets `address`. Nothing acknowledges the
    /// write, so there is no way to tell how much of a failed write landed.
    pub fn write(&mut self, data: &[u8], port: u8, address: u64, auto_increment: bool)
        -> Result<()>
    {
        self.write_cb(data, port, address, auto_increment, |_| {})
    }

    /// Write with a progress bar drawn to the terminal.
    pub fn write_progress(&mut self, data: &[u8], port: u8, address: u64, auto_increment: bool)
        -> Result<()>
    {
        let pb = crate::progress_bar(data.len(), "Writing")?;
        self.write_cb(data, port, address, auto_increment, |n| pb.set_position(n as u64))?;
        pb.finish();
        Ok(())
    }

    /// Write, calling `cb` with the number of bytes sent after each chunk.
    pub fn write_cb<F: FnMut(usize)>(&mut self, data: &[u8], port: u8, address: u64,
                                     auto_increment: bool, mut cb: F)
        -> Result<()>
    {
        let unit = self.check_aligned(data.len())?;
        let chunk_bytes = self.framing.max_chunk * unit;
        let mut address = self.framing.wrap_address(address);
        log::debug!("Writing {} bytes to port {} at 0x{:X} in {} chunks",
                    data.len(), port, address, (data.len() + chunk_bytes - 1) / chunk_bytes);

        let mut header = Vec::with_capacity(self.framing.header_bytes);
        let mut sent = 0;
        for chunk in data.chunks(chunk_bytes) {
            let units = chunk.len() / unit;
            header.clear();
            self.framing.push_header(&mut header, Op::Write, units, port, address);
            self.transport.bulk_write(&header)?;
            self.transport.bulk_write(chunk)?;
            if auto_increment {
                address = self.framing.wrap_address(address + units as u64);
            }
            sent += chunk.len();
            cb(sent);
        }
        Ok(())
    }

    /// Fill `buffer` from `port` starting at `address`.
    ///
    /// All headers of a burst are sent before any data is read back, so the
    /// board can fetch the next chunk while the previous one is in flight.
    pub fn read(&mut self, buffer: &mut [u8], port: u8, address: u64, auto_increment: bool)
        -> Result<()>
    {
        self.read_cb(buffer, port, address, auto_increment, |_| {})
    }

    /// Read `length` bytes with a progress bar drawn to the terminal.
    pub fn read_progress(&mut self, length: usize, port: u8, address: u64, auto_increment: bool)
        -> Result<Vec<u8>>
    {
        let mut data = vec![0u8; length];
        let pb = crate::progress_bar(length, "Reading")?;
        self.read_cb(&mut data, port, address, auto_increment, |n| pb.set_position(n as u64))?;
        pb.finish();
        Ok(data)
    }

    /// Read, calling `cb` with the number of bytes received after each burst.
    pub fn read_cb<F: FnMut(usize)>(&mut self, buffer: &mut [u8], port: u8, address: u64,
                                    auto_increment: bool, mut cb: F)
        -> Result<()>
    {
        let unit = self.check_aligned(buffer.len())?;
        let expected = buffer.len();
        let chunk_bytes = self.framing.max_chunk * unit;
        let burst_bytes = self.framing.max_burst * unit;
        let mut address = self.framing.wrap_address(address);
        log::debug!("Reading {} bytes from port {} at 0x{:X}", expected, port, address);

        let mut received = 0;
        for burst in buffer.chunks_mut(burst_bytes) {
            let mut commands = Vec::new();
            let mut remaining = burst.len();
            while remaining > 0 {
                let units = remaining.min(chunk_bytes) / unit;
                self.framing.push_header(&mut commands, Op::Read, units, port, address);
                if auto_increment {
                    address = self.framing.wrap_address(address + units as u64);
                }
                remaining -= units * unit;
            }
            self.transport.bulk_write(&commands)?;

            let n = framing::receive(self.transport, self.framing.status.as_ref(),
                                     self.framing.read_burst, burst)?;
            received += n;
            if n < burst.len() {
                return Err(Error::ShortRead { expected, received });
            }
            cb(received);
        }
        Ok(())
    }

    /// Pulse the bits in `mask` on the edge register at `address`.
    ///
    /// The register is written with the masked bits low then high for a
    /// rising edge, or high then low for a falling one. Returns the value
    /// left in the register so callers can track pin state without reading
    /// it back.
    pub fn edge(&mut self, value: u32, mask: u32, positive: bool, address: u64) -> Result<u32> {
        let width = self.framing.unit_bytes.min(4);
        let unit_mask = if width >= 4 { u32::MAX } else { (1 << (8 * width)) - 1 };
        let lo = value & !mask & unit_mask;
        let hi = (value | mask) & unit_mask;
        let (first, last) = if positive { (lo, hi) } else { (hi, lo) };
        log::debug!("Edge on 0x{:X}: 0x{:X} -> 0x{:X}", address, first, last);

        let mut burst = Vec::with_capacity(2 * (self.framing.header_bytes + width));
        for level in [first, last] {
            self.framing.push_header(&mut burst, Op::Write, 1, EDGE_PORT, address);
            burst.extend_from_slice(&level.to_le_bytes()[..width]);
        }
        self.transport.bulk_write(&burst)?;
        Ok(last)
    }

    /// Hand a whole bitstream file to a board able to configure itself.
    ///
    /// An empty bitstream is rejected, as the board would be left waiting
    /// on a zero-length program command.
    pub fn program(&mut self, bitstream: &[u8]) -> Result<()> {
        if !self.framing.supports(Op::Program) {
            return Err(Error::Unsupported);
        }
        if bitstream.is_empty() {
            return Err(Error::EmptyBitstream);
        }
        let unit = self.check_aligned(bitstream.len())?;
        let max = self.framing.max_length() * unit;
        if bitstream.len() > max {
            return Err(Error::TooLarge { length: bitstream.len(), max });
        }
        log::info!("Sending {} byte bitstream to board", bitstream.len());
        let mut header = Vec::with_capacity(self.framing.header_bytes);
        self.framing.push_header(&mut header, Op::Program, bitstream.len() / unit, 0, 0);
        self.transport.bulk_write(&header)?;
        self.transport.bulk_write(bitstream)?;
        Ok(())
    }

    fn check_aligned(&self, length: usize) -> Result<usize> {
        let unit = self.framing.unit_bytes;
        if length % unit != 0 {
            Err(Error::UnalignedLength { length, unit })
        } else {
            Ok(unit)
        }
    }
}
