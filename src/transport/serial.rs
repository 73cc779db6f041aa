//! # Serial Line Transport
//!
//! Point-to-point serial delivery: a USB-serial adapter, an RFCOMM device,
//! or any other tty the printer hangs off. The port is opened write-only and
//! switched to raw 8N1 mode at a fixed baud rate before the first write, so
//! binary raster data passes through without CR/LF translation or XON/XOFF
//! interpretation.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, info};

use super::{Transport, TransportKind};
use crate::error::{Error, TransportError};

/// Baud rate used when none is given.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// A duplex byte channel that can be opened at a given baud rate.
pub trait SerialChannel: Write + Sized {
    fn open(path: &Path, baud: u32) -> Result<Self, Error>;
}

impl SerialChannel for File {
    fn open(path: &Path, baud: u32) -> Result<Self, Error> {
        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            Error::DeviceUnavailable(format!("failed to open {}: {}", path.display(), e))
        })?;
        configure_tty_raw(&file, baud)?;
        Ok(file)
    }
}

/// Serial printer port.
pub struct SerialPort<C = File> {
    path: Option<PathBuf>,
    baud: u32,
    channel: Option<C>,
}

impl<C: SerialChannel> SerialPort<C> {
    /// A port that is opened on first send.
    pub fn new<P: AsRef<Path>>(path: P, baud: u32) -> Self {
        SerialPort {
            path: Some(path.as_ref().to_path_buf()),
            baud,
            channel: None,
        }
    }

    /// Wrap a channel the caller has already opened and configured.
    pub fn from_channel(channel: C) -> Self {
        SerialPort {
            path: None,
            baud: DEFAULT_BAUD_RATE,
            channel: Some(channel),
        }
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Give back the underlying channel so the caller can close it.
    pub fn into_inner(self) -> Option<C> {
        self.channel
    }
}

impl<C: SerialChannel> Transport for SerialPort<C> {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn is_ready(&self) -> bool {
        self.channel.is_some()
    }

    fn connect(&mut self) -> Result<(), Error> {
        if self.channel.is_some() {
            return Ok(());
        }
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| Error::DeviceUnavailable("no serial port selected".into()))?;
        info!("opening {} at {} baud", path.display(), self.baud);
        self.channel = Some(C::open(path, self.baud)?);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let channel = self.channel.as_mut().ok_or(TransportError::NotConnected)?;
        let n = channel.write(data)?;
        if n != data.len() {
            debug!(
                "write error: bytes wrote {} != bytes supplied {}",
                n,
                data.len()
            );
            return Err(TransportError::ShortWrite {
                written: n,
                expected: data.len(),
            }
            .into());
        }
        channel.flush()?;
        Ok(())
    }
}

pub(crate) fn is_supported() -> bool {
    cfg!(unix)
}

#[cfg(unix)]
fn baud_constant(baud: u32) -> Result<libc::speed_t, Error> {
    Ok(match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        other => {
            return Err(Error::InvalidInput(format!(
                "unsupported baud rate {}",
                other
            )))
        }
    })
}

#[cfg(unix)]
fn configure_tty_raw(file: &File, baud: u32) -> Result<(), Error> {
    use std::{io, mem::MaybeUninit, os::unix::io::AsRawFd};

    let speed = baud_constant(baud)?;
    let fd = file.as_raw_fd();

    let mut termios = MaybeUninit::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error().into());
    }
    let mut termios = unsafe { termios.assume_init() };

    // 0x11/0x13 occur in raster data, so flow control must be off
    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB);
    termios.c_cflag |= libc::CS8 | libc::CLOCAL;

    unsafe {
        if libc::cfsetispeed(&mut termios, speed) != 0
            || libc::cfsetospeed(&mut termios, speed) != 0
        {
            return Err(io::Error::last_os_error().into());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
            return Err(io::Error::last_os_error().into());
        }
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_file: &File, _baud: u32) -> Result<(), Error> {
    Err(Error::DeviceUnavailable(
        "serial ports are not supported on this host".into(),
    ))
}
