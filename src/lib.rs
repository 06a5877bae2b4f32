// Copyright 2026 hubio developers
// Licensed under the Apache-2.0 and MIT licenses.

//! hubio
//!
//! Register access and JTAG configuration for FPGA boards attached through
//! an FTDI USB bridge or a TCP link.

use indicatif::{ProgressBar, ProgressStyle};

pub mod transport;
pub mod framing;
pub mod board;
pub mod fifo;
pub mod jtag;
pub mod xilinx;
pub mod bitstream;

pub use board::{Board, Session};
pub use bitstream::Bitstream;
pub use fifo::Fifo;
pub use framing::{Framing, Op, StatusFilter};
pub use jtag::{TapController, TapState};
pub use transport::{Connector, Transport, TcpProbe, UsbProbe};
pub use xilinx::{DeviceId, Instruction};

const DATA_PROGRESS_TPL: &str =
    " {msg} [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec}; {eta_precise})";
const DATA_PROGRESS_CHARS: &str = "=> ";

pub(crate) fn progress_bar(length: usize, msg: &'static str) -> anyhow::Result<ProgressBar> {
    let style = ProgressStyle::default_bar()
        .template(DATA_PROGRESS_TPL)?
        .progress_chars(DATA_PROGRESS_CHARS);
    let pb = ProgressBar::new(length as u64).with_style(style);
    pb.set_message(msg);
    Ok(pb)
}
