use super::packet::{CarUpdate, ItemPlacement, Message};
use super::socket::{ConnectionError, PeerSocket};
use crate::race::{RaceEvent, RaceState};

/// A car update goes out every this many physics ticks (15 Hz at 60 Hz
/// physics).
pub const CAR_UPDATE_INTERVAL: u64 = 4;

/// Broadcast the local kart's authoritative state every
/// [`CAR_UPDATE_INTERVAL`] physics ticks. Loss is fine; the next update
/// overwrites everything anyway.
///
/// The receive side is [`RaceState::apply_packet`], which the physics
/// tick runs at the start of its item stage.
pub fn broadcast_car(socket: &PeerSocket, state: &RaceState) -> Result<(), ConnectionError> {
    if state.tick_count % CAR_UPDATE_INTERVAL != 0 {
        return Ok(());
    }
    let kart = &state.karts[state.player_index];
    socket.broadcast(&Message::CarUpdate(CarUpdate {
        pos: kart.pos,
        speed: kart.speed,
        angle: kart.angle,
        lap: kart.lap,
        item: kart.item,
    }))
}

/// Relay freshly emitted local events that peers must mirror: item
/// placements and box pickups. Returns the new event cursor.
pub fn broadcast_events(
    socket: &PeerSocket,
    state: &RaceState,
    cursor: usize,
) -> Result<usize, ConnectionError> {
    for event in state.events.iter().skip(cursor) {
        match *event {
            RaceEvent::ItemPlaced {
                slot,
                kind,
                pos,
                angle,
                speed,
            } if slot == state.player_index => {
                socket.broadcast(&Message::ItemPlacement(ItemPlacement {
                    kind,
                    pos,
                    angle,
                    speed,
                }))?;
            }
            RaceEvent::BoxPickup { box_index, slot } if slot == state.player_index => {
                socket.broadcast(&Message::BoxPickup {
                    index: box_index as u32,
                })?;
            }
            _ => {}
        }
    }
    Ok(state.events.len())
}
