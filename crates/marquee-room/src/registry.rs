//! Room registry: the single owner of every live room.

use std::collections::HashMap;

use marquee_protocol::RoomCode;
use marquee_transport::ConnectionId;
use serde_json::Value;

use crate::{Role, Room, RoomError, Seat};

/// Tracks all live rooms and which connection sits in which room.
///
/// Invariants, maintained by every mutating method:
/// - at most one room per code;
/// - at most one guest per room, never replaced;
/// - a connection holds at most one seat across all rooms;
/// - `connection_rooms` maps exactly the seated connections of `rooms`.
///
/// Not thread-safe by itself. The server keeps it inside a single task and
/// feeds it one event at a time.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Active rooms, keyed by code.
    rooms: HashMap<RoomCode, Room>,

    /// Secondary index from a seated connection to its room.
    connection_rooms: HashMap<ConnectionId, RoomCode>,
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a room under `code` with `connection` in the host seat.
    ///
    /// # Errors
    /// - [`RoomError::CodeTaken`] if a room with this code is live.
    /// - [`RoomError::AlreadyInRoom`] if `connection` is seated elsewhere.
    pub fn create(
        &mut self,
        code: RoomCode,
        host_name: String,
        rounds: Value,
        connection: ConnectionId,
    ) -> Result<&Room, RoomError> {
        if self.rooms.contains_key(&code) {
            return Err(RoomError::CodeTaken(code));
        }
        if let Some(current) = self.connection_rooms.get(&connection) {
            return Err(RoomError::AlreadyInRoom(connection, current.clone()));
        }

        tracing::info!(room_code = %code, host = %host_name, %connection, "room created");

        let host = Seat {
            connection,
            name: host_name,
        };
        self.connection_rooms.insert(connection, code.clone());
        let room: &Room = self
            .rooms
            .entry(code.clone())
            .or_insert_with(|| Room::new(code, host, rounds));
        Ok(room)
    }

    /// Moves the host seat of an existing room to `connection`.
    ///
    /// Used when the host's page reloads and comes back on a new
    /// connection. Guest seat and rounds are left alone. The previous host
    /// connection loses its seat, so its eventual disconnect does not close
    /// the room. Never creates a room.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if no room has this code.
    /// - [`RoomError::AlreadyInRoom`] if `connection` is seated in another
    ///   room, or is this room's guest.
    pub fn rejoin_host(
        &mut self,
        code: &RoomCode,
        host_name: String,
        connection: ConnectionId,
    ) -> Result<&Room, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        if let Some(current) = self.connection_rooms.get(&connection) {
            if current != code || room.role_of(connection) == Some(Role::Guest) {
                return Err(RoomError::AlreadyInRoom(connection, current.clone()));
            }
        }

        let previous = room.host().connection;
        if previous != connection {
            self.connection_rooms.remove(&previous);
        }
        self.connection_rooms.insert(connection, code.clone());

        tracing::info!(
            room_code = %code,
            host = %host_name,
            %previous,
            %connection,
            "host rejoined"
        );
        room.set_host(Seat {
            connection,
            name: host_name,
        });
        Ok(&*room)
    }

    /// Puts `connection` in the guest seat.
    ///
    /// On success the returned room carries the host's name for the
    /// joining side to display.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if no room has this code.
    /// - [`RoomError::RoomFull`] if a guest was ever seated here.
    /// - [`RoomError::AlreadyInRoom`] if `connection` already holds a seat,
    ///   this room's host seat included.
    pub fn join(
        &mut self,
        code: &RoomCode,
        guest_name: String,
        connection: ConnectionId,
    ) -> Result<&Room, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        if room.guest().is_some() {
            return Err(RoomError::RoomFull(code.clone()));
        }
        if let Some(current) = self.connection_rooms.get(&connection) {
            return Err(RoomError::AlreadyInRoom(connection, current.clone()));
        }

        tracing::info!(room_code = %code, guest = %guest_name, %connection, "guest joined");

        self.connection_rooms.insert(connection, code.clone());
        room.set_guest(Seat {
            connection,
            name: guest_name,
        });
        Ok(&*room)
    }

    /// Removes the room and frees its members' seats. Returns the room if
    /// it existed; closing an unknown code is a no-op.
    pub fn close(&mut self, code: &RoomCode) -> Option<Room> {
        let room = self.rooms.remove(code)?;
        for member in room.members() {
            if self.connection_rooms.get(&member) == Some(code) {
                self.connection_rooms.remove(&member);
            }
        }
        tracing::info!(room_code = %code, "room closed");
        Some(room)
    }

    /// The room `connection` is seated in, if any.
    pub fn find_room_by_connection(&self, connection: ConnectionId) -> Option<&RoomCode> {
        self.connection_rooms.get(&connection)
    }

    /// Seated connections of a room, host first. Empty for unknown codes.
    pub fn members(&self, code: &RoomCode) -> Vec<ConnectionId> {
        self.rooms.get(code).map(Room::members).unwrap_or_default()
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Returns the number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn code(c: &str) -> RoomCode {
        RoomCode::from(c)
    }

    /// Checks that the index and the room map agree.
    fn assert_index_consistent(reg: &RoomRegistry) {
        let mut seated = 0;
        for (c, room) in &reg.rooms {
            for member in room.members() {
                assert_eq!(reg.connection_rooms.get(&member), Some(c));
                seated += 1;
            }
        }
        assert_eq!(reg.connection_rooms.len(), seated);
    }

    fn registry_with_room() -> RoomRegistry {
        let mut reg = RoomRegistry::new();
        reg.create(code("ABCD"), "Alice".into(), json!(3), conn(1))
            .unwrap();
        reg
    }

    #[test]
    fn test_create_seats_host() {
        let reg = registry_with_room();
        let room = reg.get(&code("ABCD")).unwrap();
        assert_eq!(room.host().name, "Alice");
        assert_eq!(room.host().connection, conn(1));
        assert!(room.guest().is_none());
        assert_eq!(room.rounds(), &json!(3));
        assert_eq!(reg.find_room_by_connection(conn(1)), Some(&code("ABCD")));
        assert_index_consistent(&reg);
    }

    #[test]
    fn test_create_taken_code_never_overwrites() {
        let mut reg = registry_with_room();
        let err = reg
            .create(code("ABCD"), "Mallory".into(), json!(9), conn(2))
            .unwrap_err();
        assert_eq!(err, RoomError::CodeTaken(code("ABCD")));

        let room = reg.get(&code("ABCD")).unwrap();
        assert_eq!(room.host().name, "Alice");
        assert_eq!(room.rounds(), &json!(3));
        assert_eq!(reg.find_room_by_connection(conn(2)), None);
        assert_index_consistent(&reg);
    }

    #[test]
    fn test_create_while_seated_elsewhere_is_rejected() {
        let mut reg = registry_with_room();
        let err = reg
            .create(code("WXYZ"), "Alice".into(), json!(1), conn(1))
            .unwrap_err();
        assert_eq!(err, RoomError::AlreadyInRoom(conn(1), code("ABCD")));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_codes_are_not_normalised() {
        let mut reg = registry_with_room();
        reg.create(code("abcd"), "Carol".into(), Value::Null, conn(3))
            .unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_join_returns_host_name() {
        let mut reg = registry_with_room();
        let room = reg.join(&code("ABCD"), "Bob".into(), conn(2)).unwrap();
        assert_eq!(room.host().name, "Alice");
        assert_eq!(room.guest().map(|g| g.name.as_str()), Some("Bob"));
        assert_eq!(reg.members(&code("ABCD")), vec![conn(1), conn(2)]);
        assert_index_consistent(&reg);
    }

    #[test]
    fn test_join_unknown_code() {
        let mut reg = RoomRegistry::new();
        let err = reg.join(&code("NOPE"), "Bob".into(), conn(2)).unwrap_err();
        assert_eq!(err, RoomError::NotFound(code("NOPE")));
    }

    #[test]
    fn test_join_with_guest_already_seated_is_full() {
        let mut reg = registry_with_room();
        reg.join(&code("ABCD"), "Bob".into(), conn(2)).unwrap();

        let err = reg
            .join(&code("ABCD"), "Carol".into(), conn(3))
            .unwrap_err();
        assert_eq!(err, RoomError::RoomFull(code("ABCD")));
        assert_eq!(reg.get(&code("ABCD")).unwrap().guest().unwrap().name, "Bob");
    }

    #[test]
    fn test_host_cannot_take_own_guest_seat() {
        let mut reg = registry_with_room();
        let err = reg.join(&code("ABCD"), "Alice".into(), conn(1)).unwrap_err();
        assert_eq!(err, RoomError::AlreadyInRoom(conn(1), code("ABCD")));
        assert!(reg.get(&code("ABCD")).unwrap().guest().is_none());
    }

    #[test]
    fn test_rejoin_rebinds_host_only() {
        let mut reg = registry_with_room();
        reg.join(&code("ABCD"), "Bob".into(), conn(2)).unwrap();

        let room = reg
            .rejoin_host(&code("ABCD"), "Alice (reloaded)".into(), conn(7))
            .unwrap();
        assert_eq!(room.host().connection, conn(7));
        assert_eq!(room.host().name, "Alice (reloaded)");
        assert_eq!(room.guest().unwrap().connection, conn(2));
        assert_eq!(room.rounds(), &json!(3));

        assert_eq!(reg.find_room_by_connection(conn(1)), None);
        assert_eq!(reg.find_room_by_connection(conn(7)), Some(&code("ABCD")));
        assert_index_consistent(&reg);
    }

    #[test]
    fn test_rejoin_same_connection_updates_name() {
        let mut reg = registry_with_room();
        reg.rejoin_host(&code("ABCD"), "Alicia".into(), conn(1))
            .unwrap();
        assert_eq!(reg.get(&code("ABCD")).unwrap().host().name, "Alicia");
        assert_index_consistent(&reg);
    }

    #[test]
    fn test_rejoin_unknown_code_creates_nothing() {
        let mut reg = RoomRegistry::new();
        let err = reg
            .rejoin_host(&code("GONE"), "Alice".into(), conn(1))
            .unwrap_err();
        assert_eq!(err, RoomError::NotFound(code("GONE")));
        assert!(reg.is_empty());
        assert_eq!(reg.find_room_by_connection(conn(1)), None);
    }

    #[test]
    fn test_rejoin_by_guest_is_rejected() {
        let mut reg = registry_with_room();
        reg.join(&code("ABCD"), "Bob".into(), conn(2)).unwrap();
        let err = reg
            .rejoin_host(&code("ABCD"), "Bob".into(), conn(2))
            .unwrap_err();
        assert_eq!(err, RoomError::AlreadyInRoom(conn(2), code("ABCD")));
        assert_eq!(reg.get(&code("ABCD")).unwrap().host().connection, conn(1));
    }

    #[test]
    fn test_rejoin_from_other_room_is_rejected() {
        let mut reg = registry_with_room();
        reg.create(code("WXYZ"), "Carol".into(), Value::Null, conn(3))
            .unwrap();
        let err = reg
            .rejoin_host(&code("ABCD"), "Carol".into(), conn(3))
            .unwrap_err();
        assert_eq!(err, RoomError::AlreadyInRoom(conn(3), code("WXYZ")));
        assert_index_consistent(&reg);
    }

    #[test]
    fn test_close_frees_code_and_seats() {
        let mut reg = registry_with_room();
        reg.join(&code("ABCD"), "Bob".into(), conn(2)).unwrap();

        let closed = reg.close(&code("ABCD")).expect("room existed");
        assert_eq!(closed.code(), &code("ABCD"));
        assert!(!reg.contains(&code("ABCD")));
        assert_eq!(reg.find_room_by_connection(conn(1)), None);
        assert_eq!(reg.find_room_by_connection(conn(2)), None);
        assert_index_consistent(&reg);

        // Code and both connections are free again.
        reg.create(code("ABCD"), "Bob".into(), Value::Null, conn(2))
            .unwrap();
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut reg = registry_with_room();
        assert!(reg.close(&code("ABCD")).is_some());
        assert!(reg.close(&code("ABCD")).is_none());
        assert!(reg.close(&code("NEVER")).is_none());
    }

    #[test]
    fn test_members_of_unknown_room_is_empty() {
        let reg = RoomRegistry::new();
        assert!(reg.members(&code("NOPE")).is_empty());
    }
}
