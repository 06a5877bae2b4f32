//! In-memory transports for exercising the protocol layers without hardware.
//!
//! `Mock` replays canned reads and records everything written to it.
//! `Loopback` emulates a board: it decodes command headers, stores written
//! units per port and address, and answers reads with the stored data.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use crate::framing::{Command, Framing, Op};
use super::{usb, Connector, Error, Result, Transport};

/// Modem status bytes an idle FTDI bridge reports.
pub const MODEM_STATUS: [u8; 2] = [0x32, 0x60];

/// A vendor control request seen by `Mock`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

/// Scripted stand-in for an FTDI bridge.
///
/// Reads are served from a queue in order; once it is empty every read
/// times out. Errors can be queued among the reads, and one write can be
/// made to fail.
#[derive(Debug, Default)]
pub struct Mock {
    pub writes: Vec<Vec<u8>>,
    pub controls: Vec<ControlRequest>,
    pub closed: bool,
    reads: VecDeque<Result<Vec<u8>>>,
    write_error: Option<(usize, Error)>,
}

impl Mock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_read(&mut self, data: &[u8]) {
        self.reads.push_back(Ok(data.to_vec()));
    }

    /// Return `err` from the read following those already queued.
    pub fn queue_error(&mut self, err: Error) {
        self.reads.push_back(Err(err));
    }

    /// Let `successes` more writes through, then fail the next one with `err`.
    pub fn fail_write(&mut self, successes: usize, err: Error) {
        self.write_error = Some((self.writes.len() + successes, err));
    }

    /// Queue `payload` framed as one FTDI packet.
    pub fn queue_packet(&mut self, payload: &[u8]) {
        let mut packet = MODEM_STATUS.to_vec();
        packet.extend_from_slice(payload);
        self.reads.push_back(Ok(packet));
    }

    /// Everything written so far, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.writes.concat()
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }
}

impl Transport for Mock {
    fn control_write(&mut self, request_type: u8, request: u8, value: u16, index: u16, _data: &[u8])
        -> Result<()>
    {
        self.controls.push(ControlRequest { request_type, request, value, index });
        Ok(())
    }

    fn bulk_write(&mut self, data: &[u8]) -> Result<()> {
        if let Some((at, _)) = &self.write_error {
            if *at == self.writes.len() {
                if let Some((_, err)) = self.write_error.take() {
                    return Err(err);
                }
            }
        }
        self.writes.push(data.to_vec());
        Ok(())
    }

    fn bulk_read(&mut self, max_length: usize) -> Result<Vec<u8>> {
        match self.reads.pop_front() {
            Some(Ok(mut data)) => {
                if data.len() > max_length {
                    let rest = data.split_off(max_length);
                    self.reads.push_front(Ok(rest));
                }
                Ok(data)
            },
            Some(Err(err)) => Err(err),
            None => Err(Error::Timeout),
        }
    }

    fn flush(&mut self) -> Result<()> {
        usb::drain_and_purge(self)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Connector handing out fresh `Mock`s and counting how often it was asked.
#[derive(Debug, Default)]
pub struct MockProbe {
    opens: Cell<usize>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opens(&self) -> usize {
        self.opens.get()
    }
}

impl Connector for MockProbe {
    type Transport = Mock;

    fn open(&self) -> Result<Mock> {
        self.opens.set(self.opens.get() + 1);
        Ok(Mock::new())
    }
}

/// Board emulator speaking either framing.
#[derive(Debug)]
pub struct Loopback {
    framing: Framing,
    pending: Vec<u8>,
    memory: HashMap<(u8, u64), Vec<u8>>,
    outgoing: VecDeque<u8>,
    commands: Vec<Command>,
    programmed: Option<Vec<u8>>,
}

impl Loopback {
    pub fn new(framing: Framing) -> Self {
        Loopback {
            framing,
            pending: Vec::new(),
            memory: HashMap::new(),
            outgoing: VecDeque::new(),
            commands: Vec::new(),
            programmed: None,
        }
    }

    /// Every command header decoded so far, in arrival order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Payload of the last program command, if any.
    pub fn programmed(&self) -> Option<&[u8]> {
        self.programmed.as_deref()
    }

    /// The unit stored at `port`/`address`, if it was ever written.
    pub fn peek(&self, port: u8, address: u64) -> Option<&[u8]> {
        self.memory.get(&(port, address)).map(|unit| &unit[..])
    }

    fn process(&mut self) -> Result<()> {
        let header = self.framing.header_bytes;
        let unit = self.framing.unit_bytes;
        while self.pending.len() >= header {
            let cmd = match self.framing.decode(&self.pending) {
                Some(cmd) => cmd,
                None => return Err(anyhow::anyhow!(
                    "malformed command header {:02X?}", &self.pending[..header]).into()),
            };
            let payload = match cmd.op {
                Op::Read => 0,
                Op::Write | Op::Program => cmd.units * unit,
            };
            if self.pending.len() < header + payload {
                break;
            }
            let body: Vec<u8> = self.pending.drain(..header + payload).skip(header).collect();
            self.commands.push(cmd);

            match cmd.op {
                Op::Write => {
                    for (i, word) in body.chunks(unit).enumerate() {
                        let address = self.framing.wrap_address(cmd.address + i as u64);
                        self.memory.insert((cmd.port, address), word.to_vec());
                    }
                },
                Op::Read => {
                    for i in 0..cmd.units {
                        let address = self.framing.wrap_address(cmd.address + i as u64);
                        match self.memory.get(&(cmd.port, address)) {
                            Some(word) => self.outgoing.extend(word.iter().copied()),
                            None => self.outgoing.extend(std::iter::repeat(0).take(unit)),
                        }
                    }
                },
                Op::Program => self.programmed = Some(body),
            }
        }
        Ok(())
    }
}

impl Transport for Loopback {
    fn control_write(&mut self, _request_type: u8, _request: u8, _value: u16, _index: u16,
                     _data: &[u8]) -> Result<()>
    {
        Ok(())
    }

    fn bulk_write(&mut self, data: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(data);
        self.process()
    }

    fn flush(&mut self) -> Result<()> {
        match self.framing.status {
            Some(_) => usb::drain_and_purge(self),
            None => Ok(()),
        }
    }

    fn bulk_read(&mut self, max_length: usize) -> Result<Vec<u8>> {
        match self.framing.status {
            Some(filter) => {
                // Always at least one packet, as a real bridge would send.
                let room = filter.packet_size - filter.header_size;
                let mut out = Vec::new();
                loop {
                    out.extend_from_slice(&MODEM_STATUS[..filter.header_size]);
                    let n = room.min(self.outgoing.len());
                    out.extend(self.outgoing.drain(..n));
                    if self.outgoing.is_empty() || out.len() + filter.packet_size > max_length {
                        break;
                    }
                }
                Ok(out)
            },
            None if self.outgoing.is_empty() => Err(Error::Timeout),
            None => {
                let n = max_length.min(self.outgoing.len());
                Ok(self.outgoing.drain(..n).collect())
            },
        }
    }
}

/// Connector for a fresh `Loopback`.
#[derive(Debug)]
pub struct LoopbackProbe {
    pub framing: Framing,
}

impl Connector for LoopbackProbe {
    type Transport = Loopback;

    fn open(&self) -> Result<Loopback> {
        Ok(Loopback::new(self.framing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_splits_reads() {
        let mut mock = Mock::new();
        mock.queue_read(&[1, 2, 3, 4, 5]);
        assert_eq!(mock.bulk_read(3).unwrap(), vec![1, 2, 3]);
        assert_eq!(mock.bulk_read(3).unwrap(), vec![4, 5]);
        assert!(matches!(mock.bulk_read(3), Err(Error::Timeout)));
    }

    #[test]
    fn test_mock_injected_errors() {
        let mut mock = Mock::new();
        mock.queue_read(&[1, 2]);
        mock.queue_error(Error::Usb(rusb::Error::Pipe));
        assert_eq!(mock.bulk_read(8).unwrap(), vec![1, 2]);
        assert!(matches!(mock.bulk_read(8), Err(Error::Usb(rusb::Error::Pipe))));
        assert!(matches!(mock.bulk_read(8), Err(Error::Timeout)));

        mock.fail_write(1, Error::Usb(rusb::Error::Io));
        mock.bulk_write(&[1]).unwrap();
        assert!(matches!(mock.bulk_write(&[2]), Err(Error::Usb(rusb::Error::Io))));
        mock.bulk_write(&[3]).unwrap();
        assert_eq!(mock.writes, vec![vec![1], vec![3]]);
    }

    #[test]
    fn test_loopback_waits_for_payload() {
        let mut lb = Loopback::new(Framing::USB);
        let mut header = Vec::new();
        Framing::USB.push_header(&mut header, Op::Write, 1, 2, 7);
        lb.bulk_write(&header).unwrap();
        assert!(lb.commands().is_empty());
        lb.bulk_write(&[0xEF, 0xBE, 0xAD, 0xDE]).unwrap();
        assert_eq!(lb.commands().len(), 1);
        assert_eq!(lb.peek(2, 7), Some(&[0xEF, 0xBE, 0xAD, 0xDE][..]));
    }

    #[test]
    fn test_loopback_status_packets() {
        let mut lb = Loopback::new(Framing::USB);
        assert_eq!(lb.bulk_read(512).unwrap(), MODEM_STATUS.to_vec());

        let mut header = Vec::new();
        Framing::USB.push_header(&mut header, Op::Read, 200, 0, 0);
        lb.bulk_write(&header).unwrap();
        let raw = lb.bulk_read(4096).unwrap();
        assert_eq!(raw.len(), 2 + 510 + 2 + 290);
        assert_eq!(raw[512..514], MODEM_STATUS);
    }

    #[test]
    fn test_loopback_rejects_garbage() {
        let mut lb = Loopback::new(Framing::TCP);
        assert!(lb.bulk_write(&[0xFF; 8]).is_err());
    }
}
