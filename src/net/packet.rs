//! The fixed 32 byte wire format.
//!
//! Layout: version, message type, sender id, one reserved byte, then a
//! payload tagged by the message type. All multi byte scalars are little
//! endian; fixed point and angle fields travel as their raw 32 bit
//! integers.

use thiserror::Error;

use crate::items::ItemKind;
use crate::math::{Angle, Fixed, Vec2};

use super::PeerId;

/// Every packet is exactly this long.
pub const PACKET_SIZE: usize = 32;

pub const PROTOCOL_VERSION: u8 = 1;

const MSG_LOBBY_JOIN: u8 = 1;
const MSG_LOBBY_UPDATE: u8 = 2;
const MSG_READY: u8 = 3;
const MSG_CAR_UPDATE: u8 = 4;
const MSG_ITEM_PLACEMENT: u8 = 5;
const MSG_BOX_PICKUP: u8 = 6;
const MSG_DISCONNECT: u8 = 7;

/// Why a received datagram was discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet is too short ({0} bytes)")]
    TooShort(usize),
    #[error("unsupported protocol version {0}")]
    VersionMismatch(u8),
    #[error("unknown message type {0}")]
    UnknownType(u8),
    #[error("payload field out of range")]
    Malformed,
}

/// A decoded packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub sender: PeerId,
    pub message: Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    LobbyJoin { ready: bool },
    LobbyUpdate { ready: bool },
    Ready { ready: bool },
    CarUpdate(CarUpdate),
    ItemPlacement(ItemPlacement),
    BoxPickup { index: u32 },
    Disconnect,
}

/// Authoritative state of the sender's kart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarUpdate {
    pub pos: Vec2,
    pub speed: Fixed,
    pub angle: Angle,
    pub lap: u32,
    pub item: ItemKind,
}

/// A hazard placement or projectile launch by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPlacement {
    pub kind: ItemKind,
    pub pos: Vec2,
    pub angle: Angle,
    pub speed: Fixed,
}

impl ItemPlacement {
    /// A zero speed placement lies on the track; anything else flies.
    pub fn is_hazard(&self) -> bool {
        self.speed.is_zero()
    }
}

/// Encode a message into a wire packet.
pub fn write_packet(sender: PeerId, message: &Message) -> [u8; PACKET_SIZE] {
    let mut buf = Vec::with_capacity(PACKET_SIZE);
    buf.push(PROTOCOL_VERSION);
    buf.push(message_type(message));
    buf.push(sender.raw());
    buf.push(0);
    match message {
        Message::LobbyJoin { ready } | Message::LobbyUpdate { ready } | Message::Ready { ready } => {
            buf.push(*ready as u8);
        }
        Message::CarUpdate(update) => {
            push_vec2(&mut buf, update.pos);
            push_i32(&mut buf, update.speed.raw());
            push_i32(&mut buf, update.angle.raw());
            push_u32(&mut buf, update.lap);
            push_u32(&mut buf, update.item.to_wire());
        }
        Message::ItemPlacement(placement) => {
            push_u32(&mut buf, placement.kind.to_wire());
            push_vec2(&mut buf, placement.pos);
            push_i32(&mut buf, placement.angle.raw());
            push_i32(&mut buf, placement.speed.raw());
        }
        Message::BoxPickup { index } => {
            push_u32(&mut buf, *index);
        }
        Message::Disconnect => {}
    }

    let mut packet = [0u8; PACKET_SIZE];
    packet[..buf.len()].copy_from_slice(&buf);
    packet
}

fn message_type(message: &Message) -> u8 {
    match message {
        Message::LobbyJoin { .. } => MSG_LOBBY_JOIN,
        Message::LobbyUpdate { .. } => MSG_LOBBY_UPDATE,
        Message::Ready { .. } => MSG_READY,
        Message::CarUpdate(_) => MSG_CAR_UPDATE,
        Message::ItemPlacement(_) => MSG_ITEM_PLACEMENT,
        Message::BoxPickup { .. } => MSG_BOX_PICKUP,
        Message::Disconnect => MSG_DISCONNECT,
    }
}

/// Decode a wire packet. Undersized, version mismatched and malformed
/// datagrams are rejected.
pub fn read_packet(buf: &[u8]) -> Result<Packet, PacketError> {
    if buf.len() < PACKET_SIZE {
        return Err(PacketError::TooShort(buf.len()));
    }
    if buf[0] != PROTOCOL_VERSION {
        return Err(PacketError::VersionMismatch(buf[0]));
    }
    let sender = PeerId::new(buf[2]);
    let mut payload = &buf[4..PACKET_SIZE];

    let message = match buf[1] {
        MSG_LOBBY_JOIN => Message::LobbyJoin {
            ready: read_u8(&mut payload)? > 0,
        },
        MSG_LOBBY_UPDATE => Message::LobbyUpdate {
            ready: read_u8(&mut payload)? > 0,
        },
        MSG_READY => Message::Ready {
            ready: read_u8(&mut payload)? > 0,
        },
        MSG_CAR_UPDATE => Message::CarUpdate(CarUpdate {
            pos: read_vec2(&mut payload)?,
            speed: Fixed::from_raw(read_i32(&mut payload)?),
            angle: Angle::new(read_i32(&mut payload)?),
            lap: read_u32(&mut payload)?,
            item: ItemKind::from_wire(read_u32(&mut payload)?).ok_or(PacketError::Malformed)?,
        }),
        MSG_ITEM_PLACEMENT => Message::ItemPlacement(ItemPlacement {
            kind: ItemKind::from_wire(read_u32(&mut payload)?).ok_or(PacketError::Malformed)?,
            pos: read_vec2(&mut payload)?,
            angle: Angle::new(read_i32(&mut payload)?),
            speed: Fixed::from_raw(read_i32(&mut payload)?),
        }),
        MSG_BOX_PICKUP => Message::BoxPickup {
            index: read_u32(&mut payload)?,
        },
        MSG_DISCONNECT => Message::Disconnect,
        unknown => return Err(PacketError::UnknownType(unknown)),
    };

    Ok(Packet { sender, message })
}

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend(value.to_le_bytes());
}

fn push_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend(value.to_le_bytes());
}

fn push_vec2(buf: &mut Vec<u8>, value: Vec2) {
    push_i32(buf, value.x.raw());
    push_i32(buf, value.y.raw());
}

fn read_u8(buf: &mut &[u8]) -> Result<u8, PacketError> {
    if buf.is_empty() {
        return Err(PacketError::TooShort(0));
    }
    let (value, rest) = buf.split_at(1);
    *buf = rest;
    Ok(value[0])
}

fn read_u32(buf: &mut &[u8]) -> Result<u32, PacketError> {
    if buf.len() < 4 {
        return Err(PacketError::TooShort(buf.len()));
    }
    let (value, rest) = buf.split_at(4);
    *buf = rest;
    Ok(u32::from_le_bytes(value.try_into().expect("split length is 4")))
}

fn read_i32(buf: &mut &[u8]) -> Result<i32, PacketError> {
    if buf.len() < 4 {
        return Err(PacketError::TooShort(buf.len()));
    }
    let (value, rest) = buf.split_at(4);
    *buf = rest;
    Ok(i32::from_le_bytes(value.try_into().expect("split length is 4")))
}

fn read_vec2(buf: &mut &[u8]) -> Result<Vec2, PacketError> {
    Ok(Vec2::new(
        Fixed::from_raw(read_i32(buf)?),
        Fixed::from_raw(read_i32(buf)?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(message: Message) {
        let sender = PeerId::new(3);
        let wire = write_packet(sender, &message);
        assert_eq!(wire.len(), PACKET_SIZE);
        let packet = read_packet(&wire).unwrap();
        assert_eq!(packet.sender, sender);
        assert_eq!(packet.message, message);
    }

    #[test]
    fn every_message_round_trips() {
        round_trip(Message::LobbyJoin { ready: false });
        round_trip(Message::LobbyUpdate { ready: true });
        round_trip(Message::Ready { ready: true });
        round_trip(Message::CarUpdate(CarUpdate {
            pos: Vec2::from_int(312, 764),
            speed: Fixed::from_raw(1111),
            angle: Angle::new(313),
            lap: 2,
            item: ItemKind::RedShell,
        }));
        round_trip(Message::ItemPlacement(ItemPlacement {
            kind: ItemKind::Banana,
            pos: Vec2::from_int(100, 900),
            angle: Angle::new(64),
            speed: Fixed::ZERO,
        }));
        round_trip(Message::BoxPickup { index: 7 });
        round_trip(Message::Disconnect);
    }

    #[test]
    fn header_layout_is_stable() {
        let wire = write_packet(PeerId::new(5), &Message::Disconnect);
        assert_eq!(wire[0], PROTOCOL_VERSION);
        assert_eq!(wire[1], MSG_DISCONNECT);
        assert_eq!(wire[2], 5);
        assert_eq!(wire[3], 0);
    }

    #[test]
    fn scalars_travel_little_endian() {
        let wire = write_packet(
            PeerId::new(0),
            &Message::BoxPickup { index: 0x0403_0201 },
        );
        assert_eq!(&wire[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn short_packets_are_rejected() {
        assert_eq!(read_packet(&[1, 2, 3]), Err(PacketError::TooShort(3)));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut wire = write_packet(PeerId::new(0), &Message::Disconnect);
        wire[0] = 9;
        assert_eq!(read_packet(&wire), Err(PacketError::VersionMismatch(9)));
    }

    #[test]
    fn unknown_message_types_are_rejected() {
        let mut wire = write_packet(PeerId::new(0), &Message::Disconnect);
        wire[1] = 200;
        assert_eq!(read_packet(&wire), Err(PacketError::UnknownType(200)));
    }

    #[test]
    fn malformed_item_tags_are_rejected() {
        let mut wire = write_packet(
            PeerId::new(0),
            &Message::ItemPlacement(ItemPlacement {
                kind: ItemKind::Bomb,
                pos: Vec2::ZERO,
                angle: Angle::ZERO,
                speed: Fixed::ZERO,
            }),
        );
        wire[4] = 255;
        assert_eq!(read_packet(&wire), Err(PacketError::Malformed));
    }

    #[test]
    fn hazard_placements_have_zero_speed() {
        let placement = ItemPlacement {
            kind: ItemKind::Oil,
            pos: Vec2::ZERO,
            angle: Angle::ZERO,
            speed: Fixed::ZERO,
        };
        assert!(placement.is_hazard());
        let projectile = ItemPlacement {
            speed: Fixed::from_int(6),
            ..placement
        };
        assert!(!projectile.is_hazard());
    }
}
