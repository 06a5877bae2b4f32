//! JTAG TAP control over an FTDI MPSSE engine.
//!
//! The controller tracks where the TAP state machine is and only moves it
//! along the transitions listed in `tms_path()`. Data is shifted LSB first.
//! The last bit of every `shift_bits()` call is clocked with TMS high, which
//! leaves the TAP in Exit1-DR or Exit1-IR until the next transition.

use std::{thread, time::Duration};
use num_enum::IntoPrimitive;
use thiserror::Error;
use crate::framing::{self, StatusFilter};
use crate::transport::{self, Transport};
use crate::xilinx::{Instruction, IDCODE_MASK, IR_LENGTH};

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error")]
    Transport(#[from] transport::Error),
    #[error("no TAP transition from {from:?} to {to:?}")]
    InvalidTransition { from: TapState, to: TapState },
    #[error("TAP must be in a shift state, not {0:?}")]
    NotShifting(TapState),
    #[error("TAP must be in Run-Test/Idle, not {0:?}")]
    NotIdle(TapState),
    #[error("cannot shift {0} bits at once, use 1 to 32")]
    InvalidBitCount(u32),
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },
    #[error("unexpected response from MPSSE engine: {0:02X?}")]
    InvalidResponse(Vec<u8>),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Delay after JPROGRAM while the device clears its configuration memory.
pub const SETTLE_TIME: Duration = Duration::from_millis(10);

/// Most bytes a single MPSSE byte-shift command can carry.
const MAX_SHIFT_BYTES: usize = 65536;

/// Bytes requested per read while collecting TDO data.
const READ_BURST: usize = 16384;

/// Response of the MPSSE engine to an unknown opcode.
const BAD_COMMAND_ECHO: [u8; 2] = [0xFA, 0xAB];

#[derive(Copy, Clone, Debug, IntoPrimitive)]
#[repr(u8)]
enum Mpsse {
    ClockBytesOut       = 0x19,
    ClockBitsOut        = 0x1B,
    ClockBytesIn        = 0x2C,
    ClockTms            = 0x4B,
    SetGpioLow          = 0x80,
    LoopbackOff         = 0x85,
    SetDivisor          = 0x86,
    DisableDiv5         = 0x8A,
    ClockBits           = 0x8E,
    ClockBytes          = 0x8F,
    BadCommand          = 0xAB,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TapState {
    Unknown,
    Reset,
    Idle,
    ShiftDR,
    ShiftIR,
    Exit1DR,
    Exit1IR,
}

/// TMS bits to clock, LSB first.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TmsPath {
    pub value: u8,
    pub bits: u8,
}

/// Shortest TMS sequence from `from` to `to`, or `None` if the transition
/// is not supported. A zero-length path means the TAP is already there.
pub fn tms_path(from: TapState, to: TapState) -> Option<TmsPath> {
    use TapState::*;
    let (value, bits) = match (from, to) {
        (_, Reset)                              => (0x1F, 5),
        (Unknown, Idle)                         => (0x1F, 6),
        (Reset, Idle)                           => (0x00, 1),
        (Idle, Idle)                            => (0x00, 0),
        (ShiftDR, Idle) | (ShiftIR, Idle)       => (0x03, 3),
        (Exit1DR, Idle) | (Exit1IR, Idle)       => (0x01, 2),
        (Reset, ShiftDR)                        => (0x02, 4),
        (Idle, ShiftDR)                         => (0x01, 3),
        (ShiftIR, ShiftDR)                      => (0x07, 5),
        (Exit1DR, ShiftDR) | (Exit1IR, ShiftDR) => (0x03, 4),
        (ShiftDR, ShiftDR)                      => (0x00, 0),
        (Reset, ShiftIR)                        => (0x06, 5),
        (Idle, ShiftIR)                         => (0x03, 4),
        (ShiftDR, ShiftIR)                      => (0x0F, 6),
        (Exit1DR, ShiftIR) | (Exit1IR, ShiftIR) => (0x07, 5),
        (ShiftIR, ShiftIR)                      => (0x00, 0),
        _ => return None,
    };
    Some(TmsPath { value, bits })
}

/// TAP controller behind an FTDI bridge.
///
/// The state is borrowed so it outlives the controller: a later controller
/// built on the same `TapState` resumes where this one left off.
pub struct TapController<'a, T: Transport> {
    transport: &'a mut T,
    status: Option<StatusFilter>,
    state: &'a mut TapState,
    settle: Duration,
}

impl<'a, T: Transport> TapController<'a, T> {
    /// Controller for a TAP last known to be in `state`.
    pub fn new(transport: &'a mut T, state: &'a mut TapState) -> Self {
        TapController {
            transport,
            status: Some(StatusFilter::FTDI),
            state,
            settle: SETTLE_TIME,
        }
    }

    pub fn with_status_filter(mut self, status: Option<StatusFilter>) -> Self {
        self.status = status;
        self
    }

    pub fn with_settle_time(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn state(&self) -> TapState {
        *self.state
    }

    /// Put the MPSSE engine into a known configuration.
    ///
    /// Loopback is disabled, TCK runs at the full 30MHz and the low GPIO
    /// byte drives TCK, TDI and TMS. Every step is followed by a bogus
    /// opcode whose echo proves the engine is in sync with us.
    pub fn setup(&mut self) -> Result<()> {
        log::debug!("Configuring MPSSE engine");
        let steps: [&[u8]; 3] = [
            &[u8::from(Mpsse::LoopbackOff)],
            &[u8::from(Mpsse::DisableDiv5), u8::from(Mpsse::SetDivisor), 0x00, 0x00],
            &[u8::from(Mpsse::SetGpioLow), 0x80, 0x8B],
        ];
        for step in steps {
            let mut request = step.to_vec();
            request.push(Mpsse::BadCommand.into());
            self.transport.bulk_write(&request)?;
            let echo = self.receive(BAD_COMMAND_ECHO.len())?;
            if echo != BAD_COMMAND_ECHO {
                return Err(Error::InvalidResponse(echo));
            }
        }
        Ok(())
    }

    /// Enter Test-Logic-Reset.
    pub fn reset(&mut self) -> Result<()> {
        self.goto(TapState::Reset)
    }

    /// Enter Run-Test/Idle, going through Test-Logic-Reset if the state
    /// is unknown.
    pub fn idle(&mut self) -> Result<()> {
        self.goto(TapState::Idle)
    }

    pub fn shift_dr(&mut self) -> Result<()> {
        self.goto(TapState::ShiftDR)
    }

    pub fn shift_ir(&mut self) -> Result<()> {
        self.goto(TapState::ShiftIR)
    }

    fn goto(&mut self, to: TapState) -> Result<()> {
        let from = *self.state;
        let path = tms_path(from, to).ok_or(Error::InvalidTransition { from, to })?;
        if path.bits > 0 {
            log::trace!("TAP {:?} -> {:?}", from, to);
            self.transport.bulk_write(&tms(path.value, path.bits, 0))?;
        }
        *self.state = to;
        Ok(())
    }

    /// Shift the low `bit_count` bits of `value`, exiting the shift state
    /// on the last bit.
    pub fn shift_bits(&mut self, value: u32, bit_count: u32) -> Result<()> {
        if !(1..=32).contains(&bit_count) {
            return Err(Error::InvalidBitCount(bit_count));
        }
        let exit = self.exit_state()?;

        let body = bit_count - 1;
        let bytes = (body / 8) as usize;
        let bits = body % 8;
        let mut request: Vec<u8> = Vec::with_capacity(12);
        if bytes > 0 {
            request.extend_from_slice(&[Mpsse::ClockBytesOut.into(), (bytes - 1) as u8, 0x00]);
            request.extend_from_slice(&value.to_le_bytes()[..bytes]);
        }
        if bits > 0 {
            request.extend_from_slice(&[Mpsse::ClockBitsOut.into(), (bits - 1) as u8,
                                        (value >> (8 * bytes)) as u8]);
        }
        let last = ((value >> body) & 1) as u8;
        request.extend_from_slice(&tms(0x01, 1, last));
        self.transport.bulk_write(&request)?;

        *self.state = exit;
        Ok(())
    }

    /// Shift every byte of `data`, exiting the shift state on the very
    /// last bit. Does nothing if `data` is empty.
    pub fn shift_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.shift_bytes_cb(data, |_| {})
    }

    /// As `shift_bytes()`, calling `cb` with the number of bytes sent so far.
    pub fn shift_bytes_cb<F: FnMut(usize)>(&mut self, data: &[u8], mut cb: F) -> Result<()> {
        let (last, body) = match data.split_last() {
            Some(split) => split,
            None => return Ok(()),
        };
        self.exit_state()?;

        let mut sent = 0;
        for chunk in body.chunks(MAX_SHIFT_BYTES) {
            let mut request: Vec<u8> = Vec::with_capacity(chunk.len() + 3);
            request.push(Mpsse::ClockBytesOut.into());
            request.extend_from_slice(&((chunk.len() - 1) as u16).to_le_bytes());
            request.extend_from_slice(chunk);
            self.transport.bulk_write(&request)?;
            sent += chunk.len();
            cb(sent);
        }
        self.shift_bits(u32::from(*last), 8)?;
        cb(data.len());
        Ok(())
    }

    /// Clock `length` bytes out of TDO while staying in the shift state.
    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        self.exit_state()?;
        let mut request: Vec<u8> = Vec::new();
        let mut remaining = length;
        while remaining > 0 {
            let n = remaining.min(MAX_SHIFT_BYTES);
            request.push(Mpsse::ClockBytesIn.into());
            request.extend_from_slice(&((n - 1) as u16).to_le_bytes());
            remaining -= n;
        }
        if request.is_empty() {
            return Ok(Vec::new());
        }
        self.transport.bulk_write(&request)?;
        self.receive(length)
    }

    /// Clock TCK `cycles` times with TMS low.
    pub fn idle_clocks(&mut self, cycles: u32) -> Result<()> {
        if *self.state != TapState::Idle {
            return Err(Error::NotIdle(*self.state));
        }
        let mut request: Vec<u8> = Vec::new();
        let mut bytes = (cycles / 8) as usize;
        while bytes > 0 {
            let n = bytes.min(MAX_SHIFT_BYTES);
            request.push(Mpsse::ClockBytes.into());
            request.extend_from_slice(&((n - 1) as u16).to_le_bytes());
            bytes -= n;
        }
        if cycles % 8 > 0 {
            request.extend_from_slice(&[Mpsse::ClockBits.into(), (cycles % 8 - 1) as u8]);
        }
        if !request.is_empty() {
            self.transport.bulk_write(&request)?;
        }
        Ok(())
    }

    /// Load `instruction` into the IR, leaving the TAP in Exit1-IR.
    pub fn load_instruction(&mut self, instruction: Instruction) -> Result<()> {
        log::debug!("Loading instruction {:?}", instruction);
        self.shift_ir()?;
        self.shift_bits(u8::from(instruction).into(), IR_LENGTH)
    }

    /// Read the device's silicon ID, ignoring the revision nibble.
    ///
    /// The TAP must be in a known state first, see `idle()`.
    pub fn idcode(&mut self) -> Result<u32> {
        self.load_instruction(Instruction::Idcode)?;
        self.shift_dr()?;
        let data = self.read_bytes(4)?;
        self.idle()?;
        let idcode = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        log::debug!("Read IDCODE 0x{:08X}", idcode);
        Ok(idcode & IDCODE_MASK)
    }

    /// Load a prepared bitstream into the device's configuration memory.
    ///
    /// `data` must already be trimmed to the sync word and bit-reversed,
    /// as done by `Bitstream`.
    pub fn configure(&mut self, data: &[u8]) -> Result<()> {
        self.configure_cb(data, |_| {})
    }

    /// Configure with a progress bar drawn to the terminal.
    pub fn configure_progress(&mut self, data: &[u8]) -> Result<()> {
        let pb = crate::progress_bar(data.len(), "Configuring")?;
        self.configure_cb(data, |n| pb.set_position(n as u64))?;
        pb.finish();
        Ok(())
    }

    pub fn configure_cb<F: FnMut(usize)>(&mut self, data: &[u8], cb: F) -> Result<()> {
        log::info!("Configuring device with {} bytes", data.len());
        self.load_instruction(Instruction::Jprogram)?;
        self.idle()?;
        thread::sleep(self.settle);
        self.load_instruction(Instruction::CfgIn)?;
        self.shift_dr()?;
        self.shift_bytes_cb(data, cb)?;
        self.idle()
    }

    fn exit_state(&self) -> Result<TapState> {
        match *self.state {
            TapState::ShiftDR => Ok(TapState::Exit1DR),
            TapState::ShiftIR => Ok(TapState::Exit1IR),
            state => Err(Error::NotShifting(state)),
        }
    }

    fn receive(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut data = vec![0u8; length];
        let received = framing::receive(self.transport, self.status.as_ref(), READ_BURST,
                                        &mut data)?;
        if received < length {
            return Err(Error::ShortRead { expected: length, received });
        }
        log::trace!("TDO: {:02X?}", data);
        Ok(data)
    }
}

/// MPSSE command clocking `bits` TMS bits from `value` with TDI held at `tdi`.
fn tms(value: u8, bits: u8, tdi: u8) -> [u8; 3] {
    [Mpsse::ClockTms.into(), bits - 1, (value & 0x7F) | (tdi << 7)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::Mock;

    const STATES: [TapState; 7] = [
        TapState::Unknown, TapState::Reset, TapState::Idle, TapState::ShiftDR,
        TapState::ShiftIR, TapState::Exit1DR, TapState::Exit1IR,
    ];

    fn at<'a>(mock: &'a mut Mock, state: &'a mut TapState) -> TapController<'a, Mock> {
        TapController::new(mock, state).with_settle_time(Duration::ZERO)
    }

    #[test]
    fn test_idle_from_every_state() {
        for state in STATES {
            let mut mock = Mock::new();
            let mut current = state;
            let mut tap = at(&mut mock, &mut current);
            tap.idle().unwrap();
            assert_eq!(tap.state(), TapState::Idle);
        }
    }

    #[test]
    fn test_reset_from_every_state() {
        for state in STATES {
            let mut mock = Mock::new();
            let mut current = state;
            let mut tap = at(&mut mock, &mut current);
            tap.reset().unwrap();
            assert_eq!(tap.state(), TapState::Reset);
            assert_eq!(mock.written(), vec![0x4B, 0x04, 0x1F]);
        }
    }

    #[test]
    fn test_transition_table() {
        let mut mock = Mock::new();
        let mut state = TapState::Idle;
        let mut tap = at(&mut mock, &mut state);
        tap.shift_dr().unwrap();
        tap.shift_ir().unwrap();
        assert_eq!(tap.state(), TapState::ShiftIR);
        tap.shift_ir().unwrap();
        assert_eq!(mock.writes, vec![vec![0x4B, 0x02, 0x01], vec![0x4B, 0x05, 0x0F]]);

        let mut mock = Mock::new();
        let mut state = TapState::Reset;
        let mut tap = at(&mut mock, &mut state);
        tap.shift_dr().unwrap();
        assert_eq!(tap.state(), TapState::ShiftDR);

        let mut mock = Mock::new();
        let mut state = TapState::Unknown;
        let mut tap = at(&mut mock, &mut state);
        assert!(matches!(tap.shift_dr(), Err(Error::InvalidTransition {
            from: TapState::Unknown, to: TapState::ShiftDR })));
        assert!(matches!(tap.shift_ir(), Err(Error::InvalidTransition { .. })));
        assert_eq!(tap.state(), TapState::Unknown);
        assert!(mock.writes.is_empty());
    }

    #[test]
    fn test_state_outlives_controller() {
        let mut mock = Mock::new();
        let mut state = TapState::Unknown;
        at(&mut mock, &mut state).idle().unwrap();
        assert_eq!(state, TapState::Idle);

        let mut tap = at(&mut mock, &mut state);
        tap.shift_dr().unwrap();
        tap.shift_bits(0x5, 3).unwrap();
        assert_eq!(state, TapState::Exit1DR);
        assert_eq!(mock.writes[1], vec![0x4B, 0x02, 0x01]);
    }

    #[test]
    fn test_error_keeps_state() {
        let mut mock = Mock::new();
        let mut state = TapState::Idle;
        mock.fail_write(0, transport::Error::Usb(rusb::Error::Pipe));
        let result = at(&mut mock, &mut state).shift_dr();
        assert!(matches!(result, Err(Error::Transport(transport::Error::Usb(rusb::Error::Pipe)))));
        assert_eq!(state, TapState::Idle);
    }

    #[test]
    fn test_shift_bytes_error_propagates() {
        let mut mock = Mock::new();
        let mut state = TapState::ShiftDR;
        mock.fail_write(1, transport::Error::Io(std::io::ErrorKind::BrokenPipe.into()));
        let result = at(&mut mock, &mut state).shift_bytes(&[1, 2, 3]);
        assert!(matches!(result, Err(Error::Transport(transport::Error::Io(_)))));
        assert_eq!(state, TapState::ShiftDR);
        assert_eq!(mock.writes.len(), 1);
    }

    #[test]
    fn test_idcode_read_error() {
        let mut mock = Mock::new();
        mock.queue_error(transport::Error::Usb(rusb::Error::Overflow));
        let mut state = TapState::Idle;
        let result = at(&mut mock, &mut state).idcode();
        assert!(matches!(result,
                         Err(Error::Transport(transport::Error::Usb(rusb::Error::Overflow)))));
    }

    #[test]
    fn test_tms_paths_fit_one_command() {
        for from in STATES {
            for to in STATES {
                if let Some(path) = tms_path(from, to) {
                    assert!(path.bits <= 7);
                    assert!(path.value >> path.bits == 0);
                }
            }
        }
        assert_eq!(tms_path(TapState::Idle, TapState::Unknown), None);
    }

    #[test]
    fn test_shift_bits() {
        let mut mock = Mock::new();
        let mut state = TapState::ShiftIR;
        let mut tap = at(&mut mock, &mut state);
        tap.shift_bits(0x09, 6).unwrap();
        assert_eq!(tap.state(), TapState::Exit1IR);
        assert_eq!(mock.written(), vec![0x1B, 0x04, 0x09, 0x4B, 0x00, 0x01]);

        let mut mock = Mock::new();
        let mut state = TapState::ShiftDR;
        let mut tap = at(&mut mock, &mut state);
        tap.shift_bits(0x8000_1234, 32).unwrap();
        assert_eq!(tap.state(), TapState::Exit1DR);
        assert_eq!(mock.written(), vec![
            0x19, 0x02, 0x00, 0x34, 0x12, 0x00,
            0x1B, 0x06, 0x80,
            0x4B, 0x00, 0x81,
        ]);
    }

    #[test]
    fn test_shift_bits_errors() {
        let mut mock = Mock::new();
        let mut state = TapState::ShiftDR;
        let mut tap = at(&mut mock, &mut state);
        assert!(matches!(tap.shift_bits(0, 0), Err(Error::InvalidBitCount(0))));
        assert!(matches!(tap.shift_bits(0, 33), Err(Error::InvalidBitCount(33))));
        let mut state = TapState::Idle;
        let mut tap = at(&mut mock, &mut state);
        assert!(matches!(tap.shift_bits(0, 8), Err(Error::NotShifting(TapState::Idle))));
    }

    #[test]
    fn test_shift_bytes() {
        let mut mock = Mock::new();
        let mut state = TapState::ShiftDR;
        let mut tap = at(&mut mock, &mut state);
        tap.shift_bytes(&[0x11, 0x22, 0x83]).unwrap();
        assert_eq!(tap.state(), TapState::Exit1DR);
        assert_eq!(mock.writes, vec![
            vec![0x19, 0x01, 0x00, 0x11, 0x22],
            vec![0x1B, 0x06, 0x83, 0x4B, 0x00, 0x81],
        ]);

        let mut mock = Mock::new();
        let mut state = TapState::ShiftDR;
        let mut tap = at(&mut mock, &mut state);
        tap.shift_bytes(&[]).unwrap();
        assert_eq!(tap.state(), TapState::ShiftDR);
        assert!(mock.writes.is_empty());
    }

    #[test]
    fn test_shift_bytes_chunks() {
        let mut mock = Mock::new();
        let mut state = TapState::ShiftDR;
        let mut tap = at(&mut mock, &mut state);
        let data = vec![0u8; MAX_SHIFT_BYTES + 11];
        let mut progress = Vec::new();
        tap.shift_bytes_cb(&data, |n| progress.push(n)).unwrap();
        assert_eq!(progress, vec![MAX_SHIFT_BYTES, MAX_SHIFT_BYTES + 10, MAX_SHIFT_BYTES + 11]);
        assert_eq!(mock.writes.len(), 3);
        assert_eq!(mock.writes[0][..3], [0x19, 0xFF, 0xFF]);
        assert_eq!(mock.writes[1][..3], [0x19, 0x09, 0x00]);
    }

    #[test]
    fn test_setup() {
        let mut mock = Mock::new();
        for _ in 0..3 {
            mock.queue_packet(&BAD_COMMAND_ECHO);
        }
        TapController::new(&mut mock, &mut TapState::Unknown).setup().unwrap();
        assert_eq!(mock.writes, vec![
            vec![0x85, 0xAB],
            vec![0x8A, 0x86, 0x00, 0x00, 0xAB],
            vec![0x80, 0x80, 0x8B, 0xAB],
        ]);
    }

    #[test]
    fn test_setup_bad_echo() {
        let mut mock = Mock::new();
        mock.queue_packet(&[0x00, 0x00]);
        let result = TapController::new(&mut mock, &mut TapState::Unknown).setup();
        assert!(matches!(result, Err(Error::InvalidResponse(v)) if v == vec![0x00, 0x00]));
    }

    #[test]
    fn test_idcode() {
        let mut mock = Mock::new();
        mock.queue_packet(&0xF372_7093u32.to_le_bytes());
        let mut state = TapState::Idle;
        let mut tap = at(&mut mock, &mut state);
        assert_eq!(tap.idcode().unwrap(), 0x0372_7093);
        assert_eq!(tap.state(), TapState::Idle);
        assert_eq!(mock.written(), vec![
            0x4B, 0x03, 0x03,                   // Idle -> Shift-IR
            0x1B, 0x04, 0x09, 0x4B, 0x00, 0x01, // IDCODE
            0x4B, 0x03, 0x03,                   // Exit1-IR -> Shift-DR
            0x2C, 0x03, 0x00,                   // read 4 bytes
            0x4B, 0x02, 0x03,                   // Shift-DR -> Idle
        ]);
    }

    #[test]
    fn test_idcode_short_read() {
        let mut mock = Mock::new();
        mock.queue_packet(&[0x93, 0x70]);
        let mut state = TapState::Idle;
        let mut tap = at(&mut mock, &mut state);
        assert!(matches!(tap.idcode(), Err(Error::ShortRead { expected: 4, received: 2 })));
    }

    #[test]
    fn test_idle_clocks() {
        let mut mock = Mock::new();
        let mut state = TapState::Idle;
        let mut tap = at(&mut mock, &mut state);
        tap.idle_clocks(20).unwrap();
        tap.idle_clocks(0).unwrap();
        assert_eq!(mock.writes, vec![vec![0x8F, 0x01, 0x00, 0x8E, 0x03]]);

        let mut mock = Mock::new();
        let mut state = TapState::ShiftDR;
        let mut tap = at(&mut mock, &mut state);
        assert!(matches!(tap.idle_clocks(8), Err(Error::NotIdle(TapState::ShiftDR))));
    }

    #[test]
    fn test_configure() {
        let mut mock = Mock::new();
        let mut state = TapState::Idle;
        let mut tap = at(&mut mock, &mut state);
        tap.configure(&[0x55, 0x99, 0xAA, 0x66]).unwrap();
        assert_eq!(tap.state(), TapState::Idle);
        assert_eq!(mock.written(), vec![
            0x4B, 0x03, 0x03,                   // Idle -> Shift-IR
            0x1B, 0x04, 0x0B, 0x4B, 0x00, 0x01, // JPROGRAM
            0x4B, 0x01, 0x01,                   // Exit1-IR -> Idle
            0x4B, 0x03, 0x03,                   // Idle -> Shift-IR
            0x1B, 0x04, 0x05, 0x4B, 0x00, 0x01, // CFG_IN
            0x4B, 0x03, 0x03,                   // Exit1-IR -> Shift-DR
            0x19, 0x02, 0x00, 0x55, 0x99, 0xAA, // body
            0x1B, 0x06, 0x66, 0x4B, 0x00, 0x01, // last byte
            0x4B, 0x01, 0x01,                   // Exit1-DR -> Idle
        ]);
    }
}
