//! Command word layout for each backend.
//!
//! Both backends prefix every transfer with a little-endian header packing an
//! operation tag, a transfer length, a port number and an address. Only the
//! field positions and widths differ, so a `Framing` value carries them and a
//! single codec serves both.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use crate::transport::{self, Transport};

/// Reads which return no payload at all before `receive()` gives up.
const MAX_IDLE_READS: usize = 32;

#[derive(Copy, Clone, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Op {
    Read    = 0,
    Write   = 1,
    Program = 2,
}

/// A decoded command header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Command {
    pub op: Op,
    /// Transfer length in units of `Framing::unit_bytes`.
    pub units: usize,
    pub port: u8,
    pub address: u64,
}

/// Field layout and transfer limits of one backend.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Framing {
    /// Bytes of header sent before each payload.
    pub header_bytes: usize,
    /// Bytes per addressable unit; lengths and addresses count units.
    pub unit_bytes: usize,
    pub op_shift: u32,
    pub op_bits: u32,
    pub length_shift: u32,
    pub length_bits: u32,
    /// Subtracted from the unit count before it is packed.
    pub length_bias: usize,
    pub port_shift: u32,
    pub port_bits: u32,
    pub address_bits: u32,
    /// Largest number of units carried by a single header.
    pub max_chunk: usize,
    /// Largest number of units requested by one burst of read headers.
    pub max_burst: usize,
    /// Bytes requested from the transport per read call.
    pub read_burst: usize,
    /// Status bytes interleaved into received data, if any.
    pub status: Option<StatusFilter>,
}

impl Framing {
    /// 32-bit command words over an FTDI synchronous FIFO.
    pub const USB: Framing = Framing {
        header_bytes: 4,
        unit_bytes: 4,
        op_shift: 31,
        op_bits: 1,
        length_shift: 21,
        length_bits: 10,
        length_bias: 1,
        port_shift: 18,
        port_bits: 3,
        address_bits: 18,
        max_chunk: 1024,
        max_burst: 1 << 20,
        read_burst: 4096,
        status: Some(StatusFilter::FTDI),
    };

    /// 64-bit tagged headers over a TCP stream.
    pub const TCP: Framing = Framing {
        header_bytes: 8,
        unit_bytes: 1,
        op_shift: 52,
        op_bits: 12,
        length_shift: 28,
        length_bits: 24,
        length_bias: 0,
        port_shift: 24,
        port_bits: 3,
        address_bits: 24,
        max_chunk: 65536,
        max_burst: 1 << 24,
        read_burst: 65536,
        status: None,
    };

    /// Pack a header word. Fields wider than their slot are truncated.
    pub fn encode(&self, op: Op, units: usize, port: u8, address: u64) -> u64 {
        let length = units.saturating_sub(self.length_bias) as u64;
        (u64::from(u8::from(op)) & mask(self.op_bits)) << self.op_shift
            | (length & mask(self.length_bits)) << self.length_shift
            | (u64::from(port) & mask(self.port_bits)) << self.port_shift
            | (address & mask(self.address_bits))
    }

    /// Append the encoded header to `buf`.
    pub fn push_header(&self, buf: &mut Vec<u8>, op: Op, units: usize, port: u8, address: u64) {
        let word = self.encode(op, units, port, address);
        buf.extend_from_slice(&word.to_le_bytes()[..self.header_bytes]);
    }

    /// Decode the header at the start of `bytes`.
    ///
    /// Returns `None` if `bytes` is shorter than a header or carries an
    /// unknown operation tag.
    pub fn decode(&self, bytes: &[u8]) -> Option<Command> {
        let header = bytes.get(..self.header_bytes)?;
        let mut word = [0u8; 8];
        word[..self.header_bytes].copy_from_slice(header);
        let word = u64::from_le_bytes(word);

        let op = Op::try_from(((word >> self.op_shift) & mask(self.op_bits)) as u8).ok()?;
        Some(Command {
            op,
            units: ((word >> self.length_shift) & mask(self.length_bits)) as usize
                   + self.length_bias,
            port: ((word >> self.port_shift) & mask(self.port_bits)) as u8,
            address: word & mask(self.address_bits),
        })
    }

    /// Reduce `address` modulo the width of the address field.
    pub fn wrap_address(&self, address: u64) -> u64 {
        address & mask(self.address_bits)
    }

    /// Whether the operation tag fits this layout.
    pub fn supports(&self, op: Op) -> bool {
        u64::from(u8::from(op)) <= mask(self.op_bits)
    }

    /// Largest unit count the length field can describe.
    pub fn max_length(&self) -> usize {
        mask(self.length_bits) as usize + self.length_bias
    }
}

fn mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1 << bits) - 1 }
}

/// Removes the status prefix the bridge places at the start of every
/// fixed-size packet of received data.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusFilter {
    pub packet_size: usize,
    pub header_size: usize,
}

impl StatusFilter {
    /// FTDI high-speed bridges: two modem status bytes per 512-byte packet.
    pub const FTDI: StatusFilter = StatusFilter { packet_size: 512, header_size: 2 };

    pub fn strip(&self, raw: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(raw.len());
        self.strip_into(raw, &mut out);
        out
    }

    /// Append the payload of every packet in `raw` to `out`.
    ///
    /// The final packet may be short; one holding only status bytes
    /// contributes nothing.
    pub fn strip_into(&self, raw: &[u8], out: &mut Vec<u8>) {
        for packet in raw.chunks(self.packet_size) {
            if let Some(payload) = packet.get(self.header_size..) {
                out.extend_from_slice(payload);
            }
        }
    }
}

/// Fill `out` from the transport, stripping status bytes if `filter` is set.
///
/// Requests `burst` bytes at a time. Stops early when the transport times
/// out or keeps returning nothing but status bytes, and returns how many
/// bytes were actually stored so the caller can report a short read.
pub(crate) fn receive<T: Transport + ?Sized>(transport: &mut T, filter: Option<&StatusFilter>,
                                             burst: usize, out: &mut [u8])
    -> transport::Result<usize>
{
    let mut received = 0;
    let mut idle = 0;
    let mut payload = Vec::new();

    while received < out.len() {
        let request = match filter {
            Some(_) => burst,
            None => burst.min(out.len() - received),
        };
        let raw = match transport.bulk_read(request) {
            Ok(raw) => raw,
            Err(transport::Error::Timeout) => {
                log::debug!("Read timed out after {} of {} bytes", received, out.len());
                break;
            },
            Err(e) => return Err(e),
        };

        payload.clear();
        match filter {
            Some(filter) => filter.strip_into(&raw, &mut payload),
            None => payload.extend_from_slice(&raw),
        }

        if payload.is_empty() {
            idle += 1;
            if idle >= MAX_IDLE_READS {
                log::debug!("No data after {} reads, giving up", idle);
                break;
            }
            continue;
        }
        idle = 0;

        let n = payload.len().min(out.len() - received);
        if n < payload.len() {
            log::warn!("Discarding {} unexpected trailing bytes", payload.len() - n);
        }
        out[received..received + n].copy_from_slice(&payload[..n]);
        received += n;
    }

    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::Mock;

    #[test]
    fn test_status_filter() {
        let mut burst = vec![0x32, 0x60];
        burst.extend((0..510).map(|x| x as u8));
        let payload = StatusFilter::FTDI.strip(&burst);
        assert_eq!(payload.len(), 510);
        assert_eq!(payload[..3], [0, 1, 2]);

        let short = [0x32, 0x60, 1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(StatusFilter::FTDI.strip(&short), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_status_filter_multiple_packets() {
        let mut raw = Vec::new();
        for fill in [0xAAu8, 0xBB] {
            raw.extend_from_slice(&[0x32, 0x60]);
            raw.extend(std::iter::repeat(fill).take(510));
        }
        raw.extend_from_slice(&[0x32, 0x60, 0xCC]);
        let payload = StatusFilter::FTDI.strip(&raw);
        assert_eq!(payload.len(), 1021);
        assert_eq!(payload[509], 0xAA);
        assert_eq!(payload[510], 0xBB);
        assert_eq!(payload[1020], 0xCC);
        assert!(StatusFilter::FTDI.strip(&[0x32, 0x60]).is_empty());
        assert!(StatusFilter::FTDI.strip(&[0x32]).is_empty());
    }

    #[test]
    fn test_usb_encoding() {
        let f = Framing::USB;
        assert_eq!(f.encode(Op::Write, 1, 0, 0), 0x8000_0000);
        assert_eq!(f.encode(Op::Read, 1024, 0, 0), 0x7FE0_0000);
        assert_eq!(f.encode(Op::Write, 2, 3, 0x100), 0x802C_0100);
        assert_eq!(f.encode(Op::Read, 1, 0, 0x4_0001), 0x0000_0001);

        let mut buf = Vec::new();
        f.push_header(&mut buf, Op::Write, 2, 3, 0x100);
        assert_eq!(buf, vec![0x00, 0x01, 0x2C, 0x80]);
        assert_eq!(f.decode(&buf), Some(Command { op: Op::Write, units: 2, port: 3, address: 0x100 }));
        assert_eq!(f.decode(&buf[..3]), None);
    }

    #[test]
    fn test_tcp_encoding() {
        let f = Framing::TCP;
        assert_eq!(f.encode(Op::Read, 16, 1, 0x20), 0x0000_0001_0100_0020);
        assert_eq!(f.encode(Op::Write, 65536, 0, 0), 0x0010_1000_0000_0000);
        assert_eq!(f.encode(Op::Program, 3, 0, 0), 0x0020_0000_3000_0000);

        let mut buf = Vec::new();
        f.push_header(&mut buf, Op::Program, 3, 0, 0);
        assert_eq!(buf.len(), 8);
        assert_eq!(f.decode(&buf), Some(Command { op: Op::Program, units: 3, port: 0, address: 0 }));
    }

    #[test]
    fn test_limits() {
        assert_eq!(Framing::USB.max_length(), 1024);
        assert_eq!(Framing::TCP.max_length(), (1 << 24) - 1);
        assert!(Framing::USB.supports(Op::Write));
        assert!(!Framing::USB.supports(Op::Program));
        assert!(Framing::TCP.supports(Op::Program));
        assert_eq!(Framing::USB.wrap_address(0x4_0005), 5);
        assert_eq!(Framing::TCP.wrap_address(0x100_0005), 5);
    }

    #[test]
    fn test_receive_propagates_errors() {
        let mut mock = Mock::new();
        mock.queue_packet(&[1, 2]);
        mock.queue_error(transport::Error::Usb(rusb::Error::Overflow));
        let mut out = [0u8; 4];
        let result = receive(&mut mock, Some(&StatusFilter::FTDI), 512, &mut out);
        assert!(matches!(result, Err(transport::Error::Usb(rusb::Error::Overflow))));

        let mut mock = Mock::new();
        let reset = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        mock.queue_error(transport::Error::Io(reset));
        let result = receive(&mut mock, None, 512, &mut out);
        assert!(matches!(result, Err(transport::Error::Io(_))));
    }

    #[test]
    fn test_receive_stops_on_timeout() {
        let mut mock = Mock::new();
        mock.queue_packet(&[1, 2]);
        let mut out = [0u8; 4];
        assert_eq!(receive(&mut mock, Some(&StatusFilter::FTDI), 512, &mut out).unwrap(), 2);
        assert_eq!(out[..2], [1, 2]);
    }
}
