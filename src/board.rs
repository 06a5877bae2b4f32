//! Connection lifecycle.
//!
//! A `Board` owns the connector and, once started, the open transport. All
//! I/O goes through the `Session` returned by `Board::start()`, which borrows
//! the board mutably, so there is never more than one exchange in flight and
//! nothing can be sent before the link is up.

use crate::fifo::Fifo;
use crate::framing::Framing;
use crate::jtag::{TapController, TapState};
use crate::transport::{self, Connector, TcpProbe, Transport, UsbProbe};

pub struct Board<C: Connector> {
    connector: C,
    framing: Framing,
    transport: Option<C::Transport>,
    tap: TapState,
}

impl<C: Connector> Board<C> {
    pub fn new(connector: C, framing: Framing) -> Self {
        Board { connector, framing, transport: None, tap: TapState::Unknown }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn framing(&self) -> &Framing {
        &self.framing
    }

    pub fn is_started(&self) -> bool {
        self.transport.is_some()
    }

    /// Open the transport if it is not open already.
    ///
    /// Calling this on a started board reuses the existing link.
    pub fn start(&mut self) -> transport::Result<Session<'_, C::Transport>> {
        let transport = match self.transport.take() {
            Some(transport) => transport,
            None => {
                log::debug!("Starting board");
                let transport = self.connector.open()?;
                self.tap = TapState::Unknown;
                transport
            },
        };
        let transport = self.transport.insert(transport);
        Ok(Session { transport, tap: &mut self.tap, framing: self.framing })
    }

    /// Close the transport. Does nothing if the board is not started.
    pub fn stop(&mut self) -> transport::Result<()> {
        match self.transport.take() {
            Some(mut transport) => {
                log::debug!("Stopping board");
                self.tap = TapState::Unknown;
                transport.close()
            },
            None => Ok(()),
        }
    }
}

impl Board<UsbProbe> {
    pub fn usb(probe: UsbProbe) -> Self {
        Self::new(probe, Framing::USB)
    }
}

impl Board<TcpProbe> {
    pub fn tcp(probe: TcpProbe) -> Self {
        Self::new(probe, Framing::TCP)
    }
}

impl<C: Connector> Drop for Board<C> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Error closing transport: {}", e);
        }
    }
}

/// An open link to the board.
pub struct Session<'a, T: Transport> {
    transport: &'a mut T,
    tap: &'a mut TapState,
    framing: Framing,
}

impl<'a, T: Transport> Session<'a, T> {
    /// Register access through the FIFO command path.
    pub fn fifo(&mut self) -> Fifo<'_, T> {
        Fifo::new(self.transport, self.framing)
    }

    /// A TAP controller resuming from wherever the last one left the TAP.
    ///
    /// The state starts out unknown each time the board is started.
    pub fn jtag(&mut self) -> TapController<'_, T> {
        TapController::new(self.transport, self.tap).with_status_filter(self.framing.status)
    }

    /// Discard stale receive data and purge the bridge buffers.
    pub fn flush(&mut self) -> transport::Result<()> {
        self.transport.flush()
    }

    pub fn framing(&self) -> &Framing {
        &self.framing
    }

    pub fn transport(&mut self) -> &mut T {
        self.transport
    }
}
