//! Turns an entity's state into a diff event.

use roomball_protocol::{Command, FIELD_MSG, FIELD_POS_X, FIELD_POS_Y, FIELD_USER_AGENT, RoomEvent};

use crate::entity::{Coordinate, EntityRef};

/// Builds the event for `entity`.
///
/// With `force_all` every field of the entity is included (ADD, DELETE,
/// snapshots); otherwise only the fields currently flagged as changed
/// (UPDATE). Positions are rounded to whole units. Reads only, the dirty
/// flags are left to the caller.
pub fn compose(entity: EntityRef<'_>, command: Command, force_all: bool) -> RoomEvent {
    let base = entity.base();
    let mut event = RoomEvent::new(base.name(), command, false);

    put_coordinate(&mut event, FIELD_POS_X, base.x(), force_all);
    put_coordinate(&mut event, FIELD_POS_Y, base.y(), force_all);

    if let EntityRef::Player(player) = entity {
        if force_all || player.message_changed() {
            event = event.with_field(FIELD_MSG, player.message());
        }
        if force_all || player.user_agent_changed() {
            event = event.with_field(FIELD_USER_AGENT, player.user_agent());
        }
    }

    event
}

/// A full-state ADD flagged as part of a snapshot burst.
pub fn compose_snapshot(entity: EntityRef<'_>) -> RoomEvent {
    RoomEvent {
        snapshot: true,
        ..compose(entity, Command::Add, true)
    }
}

fn put_coordinate(event: &mut RoomEvent, field: &str, coordinate: &Coordinate, force_all: bool) {
    if force_all || coordinate.is_changed() {
        let rounded = coordinate.value().round() as i64;
        event.fields.insert(field.to_string(), rounded.to_string());
    }
}
