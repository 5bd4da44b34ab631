use std::io::ErrorKind;
use std::net::{Ipv4Addr, UdpSocket};

use thiserror::Error;
use tracing::debug;

use super::packet::{read_packet, write_packet, Message, Packet};
use super::PeerId;

/// The well known port every peer binds and broadcasts on.
pub const RACE_PORT: u16 = 45227;

/// An error with the peer connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("cannot open the broadcast socket: {0}")]
    Bind(std::io::Error),
    #[error("error writing to udp socket: {0}")]
    CannotSend(std::io::Error),
    #[error("error receiving data: {0}")]
    CannotReceive(std::io::Error),
}

/// A non blocking UDP broadcast socket shared by the lobby and the race.
///
/// Broadcasts go to 255.255.255.255 on the well known port; our own
/// broadcasts come back and are filtered by the sender id every packet
/// carries.
pub struct PeerSocket {
    socket: UdpSocket,
    port: u16,
    self_id: PeerId,
}

impl PeerSocket {
    pub fn open(port: u16, self_id: PeerId) -> Result<PeerSocket, ConnectionError> {
        let socket =
            UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).map_err(ConnectionError::Bind)?;
        socket.set_broadcast(true).map_err(ConnectionError::Bind)?;
        socket.set_nonblocking(true).map_err(ConnectionError::Bind)?;
        Ok(PeerSocket {
            socket,
            port,
            self_id,
        })
    }

    pub fn self_id(&self) -> PeerId {
        self.self_id
    }

    /// Send one message to every peer on the segment.
    pub fn broadcast(&self, message: &Message) -> Result<(), ConnectionError> {
        let buf = write_packet(self.self_id, message);
        self.socket
            .send_to(&buf, (Ipv4Addr::BROADCAST, self.port))
            .map_err(ConnectionError::CannotSend)?;
        Ok(())
    }

    /// Receive the next foreign packet without blocking. Returns `None`
    /// once the socket is drained. Own and undecodable packets are
    /// silently dropped.
    pub fn poll(&mut self) -> Result<Option<Packet>, ConnectionError> {
        let mut buf = [0u8; 64];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, addr)) => match read_packet(&buf[..len]) {
                    Ok(packet) => {
                        if packet.sender == self.self_id {
                            continue;
                        }
                        return Ok(Some(packet));
                    }
                    Err(e) => {
                        debug!("dropping packet from {addr}: {e}");
                        continue;
                    }
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(ConnectionError::CannotReceive(e)),
            }
        }
    }
}
