//! # Relay Socket Transport
//!
//! Sends the command buffer as a single binary WebSocket message to a relay
//! that forwards it to a printer. The relay protocol has no acknowledgment
//! frame: after sending we wait for the server to close the connection, and
//! if it stays silent for the idle timeout the send is taken as delivered.
//! That is a liveness bound, not a delivery guarantee.

use std::{
    io,
    net::TcpStream,
    time::{Duration, Instant},
};

use log::{debug, info};
use tungstenite::{stream::MaybeTlsStream, Message, WebSocket};

use super::{Transport, TransportKind};
use crate::error::{Error, TransportError};

/// How long to wait for the relay to close after the send.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(1500);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// WebSocket relay endpoint.
pub struct RelaySocket {
    url: String,
    idle_timeout: Duration,
    socket: Option<Socket>,
}

impl RelaySocket {
    pub fn new<S: Into<String>>(url: S) -> Self {
        RelaySocket {
            url: url.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            socket: None,
        }
    }

    pub fn idle_timeout(self, idle_timeout: Duration) -> Self {
        RelaySocket {
            idle_timeout,
            ..self
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for a close frame, a dropped connection or the idle timeout.
    fn await_completion(socket: &mut Socket, idle_timeout: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + idle_timeout;
        loop {
            match socket.read() {
                Ok(Message::Close(frame)) => {
                    debug!("relay closed the connection: {:?}", frame);
                    if let Err(err) = socket.flush() {
                        debug!("failed to answer relay close: {:?}", err);
                    }
                    return Ok(());
                }
                Ok(msg) => {
                    debug!("ignoring relay message: {:?}", msg);
                    if Instant::now() >= deadline {
                        debug!("relay idle timeout reached");
                        return Ok(());
                    }
                }
                Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                    return Ok(())
                }
                Err(tungstenite::Error::Io(err))
                    if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
                {
                    debug!("relay idle timeout reached");
                    return Ok(());
                }
                Err(tungstenite::Error::Protocol(
                    tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
                )) => return Ok(()),
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn set_read_timeout(socket: &Socket, timeout: Duration) -> Result<(), Error> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout))?,
        _ => debug!("cannot set read timeout on this stream"),
    }
    Ok(())
}

impl Transport for RelaySocket {
    fn kind(&self) -> TransportKind {
        TransportKind::Relay
    }

    fn is_ready(&self) -> bool {
        self.socket.as_ref().map_or(false, |s| s.can_write())
    }

    fn connect(&mut self) -> Result<(), Error> {
        info!("connecting to relay {}", self.url);
        let (socket, response) = tungstenite::connect(self.url.as_str())?;
        debug!("relay handshake: {}", response.status());
        set_read_timeout(&socket, self.idle_timeout)?;
        self.socket = Some(socket);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let socket = self.socket.as_mut().ok_or(TransportError::NotConnected)?;
        socket.send(Message::Binary(data.to_vec()))?;
        Self::await_completion(socket, self.idle_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let relay = RelaySocket::new("ws://127.0.0.1:9100/print");
        assert_eq!(relay.url(), "ws://127.0.0.1:9100/print");
        assert_eq!(relay.idle_timeout, DEFAULT_IDLE_TIMEOUT);
        assert!(!relay.is_ready());
    }

    #[test]
    fn write_before_connect_fails() {
        let mut relay = RelaySocket::new("ws://127.0.0.1:1");
        assert!(matches!(
            relay.write(&[1, 2, 3]),
            Err(Error::TransportFailure(TransportError::NotConnected))
        ));
    }

    #[test]
    fn malformed_url_is_a_transport_failure() {
        let mut relay = RelaySocket::new("not a url");
        assert!(matches!(relay.connect(), Err(Error::TransportFailure(_))));
    }
}
