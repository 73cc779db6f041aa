//! # Printer Transport Layer
//!
//! Raw-byte delivery of a framed command buffer to a printer.
//!
//! ## Available Transports
//!
//! - [`serial`]: point-to-point serial line (USB-serial adapters, RFCOMM)
//! - [`usb`]: USB printer class device, bulk OUT endpoint
//! - [`relay`]: WebSocket relay that forwards bytes to a printer elsewhere
//!
//! Every send walks the same state machine:
//!
//! ```text
//! Idle -> Connecting -> Ready -> Sending -> Done
//!             |           |         |
//!             +-----------+---------+----> Failed
//! ```
//!
//! `Connecting` is skipped when the transport is already open. There is no
//! retry; `Failed` is terminal and the error is returned to the caller.

pub mod relay;
pub mod serial;
pub mod usb;

use std::{fmt, path::PathBuf};

use log::debug;

pub use relay::RelaySocket;
pub use serial::{SerialChannel, SerialPort, DEFAULT_BAUD_RATE};
pub use usb::{DeviceLayout, UsbFilter, UsbPrinter};

use crate::{command::CommandBuffer, error::Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Serial,
    Usb,
    Relay,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Serial => "serial",
            Self::Usb => "usb",
            Self::Relay => "relay",
        })
    }
}

/// Stage of a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Connecting,
    Ready,
    Sending,
    Done,
    Failed,
}

/// A channel that accepts raw printer bytes.
pub trait Transport {
    fn kind(&self) -> TransportKind;

    /// Whether the channel is open and can be written without connecting.
    fn is_ready(&self) -> bool;

    /// Open the channel: open the port, claim the interface, or complete the
    /// socket handshake.
    fn connect(&mut self) -> Result<(), Error>;

    /// Write the whole buffer. A partial write is a failure.
    fn write(&mut self, data: &[u8]) -> Result<(), Error>;
}

/// Deliver `command` over `transport`, reporting every state to `observer`.
pub fn deliver<T, F>(transport: &mut T, command: CommandBuffer, mut observer: F) -> Result<(), Error>
where
    T: Transport + ?Sized,
    F: FnMut(SendState),
{
    observer(SendState::Idle);
    let result = connect_and_write(transport, &command, &mut observer);
    observer(if result.is_ok() {
        SendState::Done
    } else {
        SendState::Failed
    });
    result
}

fn connect_and_write<T, F>(transport: &mut T, command: &CommandBuffer, observer: &mut F) -> Result<(), Error>
where
    T: Transport + ?Sized,
    F: FnMut(SendState),
{
    if !transport.is_ready() {
        observer(SendState::Connecting);
        transport.connect()?;
    }
    observer(SendState::Ready);
    observer(SendState::Sending);
    transport.write(command.as_bytes())
}

/// Deliver `command`, logging each state transition.
pub fn send<T: Transport + ?Sized>(transport: &mut T, command: CommandBuffer) -> Result<(), Error> {
    let kind = transport.kind();
    let len = command.len();
    deliver(transport, command, |state| {
        debug!("{} send ({} bytes): {:?}", kind, len, state)
    })
}

/// An opened device, as handed over by whatever picked it.
pub enum TransportHandle {
    Serial(SerialPort),
    Usb(UsbPrinter),
    Relay(RelaySocket),
}

impl TransportHandle {
    /// Send one command buffer. The handle is consumed; a retry needs a
    /// fresh handle and a freshly framed command.
    pub fn send(mut self, command: CommandBuffer) -> Result<(), Error> {
        send(&mut self, command)
    }
}

impl Transport for TransportHandle {
    fn kind(&self) -> TransportKind {
        match self {
            Self::Serial(t) => t.kind(),
            Self::Usb(t) => t.kind(),
            Self::Relay(t) => t.kind(),
        }
    }

    fn is_ready(&self) -> bool {
        match self {
            Self::Serial(t) => t.is_ready(),
            Self::Usb(t) => t.is_ready(),
            Self::Relay(t) => t.is_ready(),
        }
    }

    fn connect(&mut self) -> Result<(), Error> {
        match self {
            Self::Serial(t) => t.connect(),
            Self::Usb(t) => t.connect(),
            Self::Relay(t) => t.connect(),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        match self {
            Self::Serial(t) => t.write(data),
            Self::Usb(t) => t.write(data),
            Self::Relay(t) => t.write(data),
        }
    }
}

/// Transport-specific connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    Serial { path: PathBuf, baud: u32 },
    Usb(UsbFilter),
    Relay { url: String },
}

impl Connection {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Serial { .. } => TransportKind::Serial,
            Self::Usb(_) => TransportKind::Usb,
            Self::Relay { .. } => TransportKind::Relay,
        }
    }

    /// Resolve the parameters into a handle. Serial ports and sockets are
    /// opened lazily on send; USB devices are looked up here.
    ///
    /// Host support is not probed here; a missing backend surfaces as
    /// [`Error::DeviceUnavailable`] when it is first used. Callers wanting
    /// an upfront answer query [`available`] once.
    pub fn open(&self) -> Result<TransportHandle, Error> {
        Ok(match self {
            Self::Serial { path, baud } => TransportHandle::Serial(SerialPort::new(path, *baud)),
            Self::Usb(filter) => TransportHandle::Usb(UsbPrinter::open(filter)?),
            Self::Relay { url } => TransportHandle::Relay(RelaySocket::new(url.clone())),
        })
    }
}

/// Which transports this host can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub serial: bool,
    pub usb: bool,
    pub relay: bool,
}

impl Capabilities {
    pub fn supports(&self, kind: TransportKind) -> bool {
        match kind {
            TransportKind::Serial => self.serial,
            TransportKind::Usb => self.usb,
            TransportKind::Relay => self.relay,
        }
    }
}

/// Probe the host once for usable transports.
pub fn available() -> Capabilities {
    Capabilities {
        serial: serial::is_supported(),
        usb: usb::is_supported(),
        relay: true,
    }
}
