//! Peer to peer synchronization: a lobby for discovery and readiness, and
//! an in race broadcast of authoritative per kart state over UDP.

use std::fmt::Display;

use crate::race::MAX_CARS;

mod lobby;
mod packet;
mod session;
mod socket;

pub use lobby::Lobby;
pub use lobby::LobbyPeer;
pub use lobby::HEARTBEAT_INTERVAL;
pub use lobby::PEER_TIMEOUT;
pub use packet::read_packet;
pub use packet::write_packet;
pub use packet::CarUpdate;
pub use packet::ItemPlacement;
pub use packet::Message;
pub use packet::Packet;
pub use packet::PacketError;
pub use packet::PACKET_SIZE;
pub use packet::PROTOCOL_VERSION;
pub use session::broadcast_car;
pub use session::broadcast_events;
pub use session::CAR_UPDATE_INTERVAL;
pub use socket::ConnectionError;
pub use socket::PeerSocket;
pub use socket::RACE_PORT;

/// A participant identity, also the kart slot the participant drives.
///
/// Derived from the hardware address so that it stays stable across
/// sessions, unlike anything DHCP hands out sequentially.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u8);

impl PeerId {
    /// The last byte of the hardware address, modulo the participant cap.
    pub fn from_hardware(addr: &[u8; 6]) -> PeerId {
        PeerId(addr[5] % MAX_CARS as u8)
    }

    pub fn new(id: u8) -> PeerId {
        PeerId(id % MAX_CARS as u8)
    }

    /// The kart slot this peer occupies.
    pub fn slot(self) -> usize {
        self.0 as usize
    }

    pub fn raw(self) -> u8 {
        self.0
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_is_the_last_hardware_byte_mod_cap() {
        assert_eq!(PeerId::from_hardware(&[0, 1, 2, 3, 4, 5]).slot(), 5);
        assert_eq!(PeerId::from_hardware(&[9, 9, 9, 9, 9, 11]).slot(), 3);
        assert_eq!(PeerId::new(13).slot(), 5);
    }
}
