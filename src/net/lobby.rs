use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::{debug, info};

use super::packet::{Message, Packet};
use super::socket::{ConnectionError, PeerSocket};
use super::PeerId;
use crate::race::MAX_CARS;

/// Silence after which a remote peer counts as disconnected.
pub const PEER_TIMEOUT: Duration = Duration::from_secs(3);

/// How often the lobby announces itself.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// What the lobby knows about one remote peer.
#[derive(Debug, Clone, Copy)]
pub struct LobbyPeer {
    pub id: PeerId,
    pub ready: bool,
    pub connected: bool,
    pub last_seen: Instant,
}

/// Pre race peer discovery and readiness aggregation.
///
/// Peers are kept in join order; a quiet peer is swept to disconnected
/// after [`PEER_TIMEOUT`] but stays in the table in case it returns.
pub struct Lobby {
    self_id: PeerId,
    self_ready: bool,
    peers: IndexMap<u8, LobbyPeer>,
    last_heartbeat: Instant,
}

impl Lobby {
    pub fn new(self_id: PeerId) -> Lobby {
        Lobby {
            self_id,
            self_ready: false,
            peers: IndexMap::new(),
            last_heartbeat: Instant::now(),
        }
    }

    /// Announce ourselves and forget everything known about remotes.
    pub fn join(&mut self, socket: &PeerSocket) -> Result<(), ConnectionError> {
        self.peers.clear();
        self.self_ready = false;
        info!("joining lobby as {}", self.self_id);
        socket.broadcast(&Message::LobbyJoin { ready: false })
    }

    pub fn set_ready(
        &mut self,
        ready: bool,
        socket: &PeerSocket,
    ) -> Result<(), ConnectionError> {
        self.self_ready = ready;
        socket.broadcast(&Message::Ready { ready })
    }

    pub fn self_ready(&self) -> bool {
        self.self_ready
    }

    /// Drain the socket, apply lobby traffic, heartbeat and sweep.
    pub fn update(&mut self, socket: &mut PeerSocket) -> Result<(), ConnectionError> {
        while let Some(packet) = socket.poll()? {
            self.handle(packet, Instant::now());
        }
        if self.last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
            socket.broadcast(&Message::LobbyUpdate {
                ready: self.self_ready,
            })?;
            self.last_heartbeat = Instant::now();
        }
        self.sweep(Instant::now());
        Ok(())
    }

    /// Apply one received packet. Any traffic refreshes the sender's
    /// liveness; only lobby messages carry a ready flag.
    pub fn handle(&mut self, packet: Packet, now: Instant) {
        match packet.message {
            Message::LobbyJoin { ready }
            | Message::LobbyUpdate { ready }
            | Message::Ready { ready } => self.mark(packet.sender, Some(ready), now),
            Message::Disconnect => {
                if let Some(peer) = self.peers.get_mut(&packet.sender.raw()) {
                    peer.connected = false;
                    info!("{} left the lobby", packet.sender);
                }
            }
            _ => self.mark(packet.sender, None, now),
        }
    }

    fn mark(&mut self, id: PeerId, ready: Option<bool>, now: Instant) {
        let peer = self.peers.entry(id.raw()).or_insert_with(|| {
            info!("{} joined the lobby", id);
            LobbyPeer {
                id,
                ready: false,
                connected: true,
                last_seen: now,
            }
        });
        peer.connected = true;
        peer.last_seen = now;
        if let Some(ready) = ready {
            peer.ready = ready;
        }
    }

    /// Mark every peer quiet for longer than [`PEER_TIMEOUT`] as
    /// disconnected.
    pub fn sweep(&mut self, now: Instant) {
        for peer in self.peers.values_mut() {
            if peer.connected && now.duration_since(peer.last_seen) > PEER_TIMEOUT {
                peer.connected = false;
                debug!("{} timed out", peer.id);
            }
        }
    }

    /// Connected participants, ourselves included.
    pub fn connected_count(&self) -> usize {
        1 + self.peers.values().filter(|peer| peer.connected).count()
    }

    /// The start condition: at least two connected participants and every
    /// one of them ready.
    pub fn all_ready(&self) -> bool {
        self.connected_count() >= 2
            && self.self_ready
            && self
                .peers
                .values()
                .filter(|peer| peer.connected)
                .all(|peer| peer.ready)
    }

    /// Which kart slots have a connected participant, ourselves included.
    pub fn connected_slots(&self) -> [bool; MAX_CARS] {
        let mut slots = [false; MAX_CARS];
        slots[self.self_id.slot()] = true;
        for peer in self.peers.values().filter(|peer| peer.connected) {
            slots[peer.id.slot()] = true;
        }
        slots
    }

    pub fn peers(&self) -> impl Iterator<Item = &LobbyPeer> {
        self.peers.values()
    }
}
