//! Fan-out of server events to websocket sessions.

use std::collections::HashSet;
use std::sync::Arc;

use actix::prelude::*;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::domain::engine::UserId;
use crate::ws::protocol::ServerEvent;

/// Where rooms and the settlement coordinator push events. Delivery is
/// fire-and-forget; a closed connection just misses the event.
pub trait Notifier: Send + Sync {
    fn to_room(&self, room_id: &str, event: &ServerEvent);
    fn to_user(&self, user_id: UserId, event: &ServerEvent);
}

/// A serialized event on its way to one session.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct HubEvent(pub Arc<str>);

struct Connection {
    user_id: UserId,
    recipient: Recipient<HubEvent>,
}

#[derive(Default)]
pub struct WsHub {
    connections: DashMap<Uuid, Connection>,
    rooms: DashMap<String, HashSet<Uuid>>,
}

impl WsHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_connection(&self, user_id: UserId, conn_id: Uuid, recipient: Recipient<HubEvent>) {
        self.connections.insert(conn_id, Connection { user_id, recipient });
    }

    pub fn unregister_connection(&self, conn_id: Uuid) {
        self.connections.remove(&conn_id);
        self.rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    pub fn subscribe(&self, conn_id: Uuid, room_id: &str) {
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(conn_id);
    }

    pub fn unsubscribe(&self, conn_id: Uuid, room_id: &str) {
        let now_empty = match self.rooms.get_mut(room_id) {
            Some(mut members) => {
                members.remove(&conn_id);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.rooms.remove_if(room_id, |_, members| members.is_empty());
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn encode(event: &ServerEvent) -> Option<HubEvent> {
        match serde_json::to_string(event) {
            Ok(json) => Some(HubEvent(json.into())),
            Err(err) => {
                warn!(error = %err, event = event.name(), "failed to serialize event");
                None
            }
        }
    }
}

impl Notifier for WsHub {
    fn to_room(&self, room_id: &str, event: &ServerEvent) {
        let Some(msg) = Self::encode(event) else {
            return;
        };
        let Some(members) = self.rooms.get(room_id) else {
            return;
        };
        for conn_id in members.iter() {
            if let Some(conn) = self.connections.get(conn_id) {
                conn.recipient.do_send(msg.clone());
            }
        }
        drop(members);
        if matches!(event, ServerEvent::RoomClosed { .. }) {
            self.rooms.remove(room_id);
        }
    }

    fn to_user(&self, user_id: UserId, event: &ServerEvent) {
        let Some(msg) = Self::encode(event) else {
            return;
        };
        for conn in self.connections.iter().filter(|c| c.user_id == user_id) {
            conn.recipient.do_send(msg.clone());
        }
    }
}

/// Who an event was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Room(String),
    User(UserId),
}

/// Keeps every event in memory instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Delivery, ServerEvent)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Delivery, ServerEvent)> {
        self.sent.lock().clone()
    }

    /// Events sent privately to `user_id`.
    pub fn for_user(&self, user_id: UserId) -> Vec<ServerEvent> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| *to == Delivery::User(user_id))
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Names of the events broadcast to `room_id`, in order.
    pub fn room_event_names(&self, room_id: &str) -> Vec<&'static str> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| matches!(to, Delivery::Room(r) if r == room_id))
            .map(|(_, e)| e.name())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn to_room(&self, room_id: &str, event: &ServerEvent) {
        self.sent
            .lock()
            .push((Delivery::Room(room_id.to_string()), event.clone()));
    }

    fn to_user(&self, user_id: UserId, event: &ServerEvent) {
        self.sent.lock().push((Delivery::User(user_id), event.clone()));
    }
}
