use std::collections::{HashMap, HashSet};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Identifies one open collaboration connection.
pub type ConnectionId = Uuid;

/// Capacity of each room's broadcast channel. A receiver that falls this
/// far behind starts skipping frames (RecvError::Lagged).
const ROOM_CHANNEL_CAPACITY: usize = 100;

/// One relayed edit event, tagged with the connection that produced it so
/// receivers can suppress their own echoes.
#[derive(Debug, Clone)]
pub struct RelayFrame {
    pub sender: ConnectionId,
    /// The serialized envelope, forwarded verbatim.
    pub payload: String,
}

struct Room {
    tx: broadcast::Sender<RelayFrame>,
    members: HashSet<ConnectionId>,
}

/// Registry of per-document rooms.
///
/// Owns the only shared mutable state in the service: the map from document
/// id to the set of admitted connections. Rooms are created on first join
/// and deleted when their last member leaves. Fan-out rides a broadcast
/// channel per room, so membership mutation never tears an in-progress
/// relay; a dropped receiver is simply skipped.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to the room for `doc_id`, creating the room if
    /// absent. Returns the receiver carrying every frame relayed to the
    /// room from this point on.
    pub async fn join(&self, doc_id: &str, conn: ConnectionId) -> broadcast::Receiver<RelayFrame> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(doc_id.to_string()).or_insert_with(|| {
            let (tx, _rx) = broadcast::channel::<RelayFrame>(ROOM_CHANNEL_CAPACITY);
            Room {
                tx,
                members: HashSet::new(),
            }
        });
        room.members.insert(conn);
        room.tx.subscribe()
    }

    /// Remove a connection from its room, deleting the room when it
    /// empties. Idempotent: leaving twice, or leaving a room that no
    /// longer exists, is a no-op.
    pub async fn leave(&self, doc_id: &str, conn: ConnectionId) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(doc_id) {
            room.members.remove(&conn);
            if room.members.is_empty() {
                rooms.remove(doc_id);
            }
        }
    }

    /// Fan a frame out to every subscriber of the room. Frames sent to a
    /// room with no subscribers are dropped.
    pub async fn relay(&self, doc_id: &str, frame: RelayFrame) {
        let rooms = self.rooms.read().await;
        if let Some(room) = rooms.get(doc_id) {
            // send only errors when no receiver is subscribed
            let _ = room.tx.send(frame);
        }
    }

    /// Number of connections currently in the room for `doc_id`.
    pub async fn member_count(&self, doc_id: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(doc_id).map_or(0, |room| room.members.len())
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Total connections across all rooms.
    pub async fn connection_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.values().map(|room| room.members.len()).sum()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sender: ConnectionId, payload: &str) -> RelayFrame {
        RelayFrame {
            sender,
            payload: payload.to_string(),
        }
    }

    #[tokio::test]
    async fn join_creates_room_and_leave_deletes_it() {
        let registry = RoomRegistry::new();
        let conn = Uuid::new_v4();

        let _rx = registry.join("doc1", conn).await;
        assert_eq!(registry.room_count().await, 1);
        assert_eq!(registry.member_count("doc1").await, 1);

        registry.leave("doc1", conn).await;
        assert_eq!(registry.room_count().await, 0);
        assert_eq!(registry.member_count("doc1").await, 0);
    }

    #[tokio::test]
    async fn room_survives_until_last_member_leaves() {
        let registry = RoomRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _rx_a = registry.join("doc1", a).await;
        let _rx_b = registry.join("doc1", b).await;
        assert_eq!(registry.member_count("doc1").await, 2);

        registry.leave("doc1", a).await;
        assert_eq!(registry.room_count().await, 1);
        assert_eq!(registry.member_count("doc1").await, 1);

        registry.leave("doc1", b).await;
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn double_leave_is_a_noop() {
        let registry = RoomRegistry::new();
        let conn = Uuid::new_v4();

        let _rx = registry.join("doc1", conn).await;
        registry.leave("doc1", conn).await;
        registry.leave("doc1", conn).await;
        registry.leave("missing-doc", conn).await;
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn relay_reaches_other_members() {
        let registry = RoomRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _rx_a = registry.join("doc1", a).await;
        let mut rx_b = registry.join("doc1", b).await;

        registry.relay("doc1", frame(a, "payload")).await;

        let received = rx_b.recv().await.unwrap();
        assert_eq!(received.sender, a);
        assert_eq!(received.payload, "payload");
    }

    #[tokio::test]
    async fn relay_is_scoped_to_one_room() {
        let registry = RoomRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _rx_a = registry.join("doc1", a).await;
        let mut rx_b = registry.join("doc2", b).await;

        registry.relay("doc1", frame(a, "payload")).await;

        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn rejoin_after_room_deletion_starts_fresh() {
        let registry = RoomRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _rx_a = registry.join("doc1", a).await;
        registry.relay("doc1", frame(a, "before")).await;
        registry.leave("doc1", a).await;

        let mut rx_b = registry.join("doc1", b).await;
        assert_eq!(registry.member_count("doc1").await, 1);
        // Nothing relayed before the rejoin is delivered.
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn relay_continues_after_a_member_disconnects() {
        let registry = RoomRegistry::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();

        let _rx_first = registry.join("doc1", first).await;
        let rx_second = registry.join("doc1", second).await;
        let mut rx_third = registry.join("doc1", third).await;

        // Second member drops mid-session.
        drop(rx_second);
        registry.leave("doc1", second).await;

        registry.relay("doc1", frame(first, "after-disconnect")).await;

        let received = rx_third.recv().await.unwrap();
        assert_eq!(received.payload, "after-disconnect");
        assert_eq!(registry.member_count("doc1").await, 2);
    }
}
