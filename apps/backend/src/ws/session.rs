use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::jwt::verify_access_token;
use crate::domain::engine::UserId;
use crate::errors::domain::DomainError;
use crate::services::rooms::RoomRegistry;
use crate::state::app_state::AppState;
use crate::ws::hub::{HubEvent, WsHub};
use crate::ws::protocol::{AckPayload, ClientFrame, ClientRequest, ServerEvent};
use crate::AppError;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// `GET /api/ws?token=<jwt>`: authenticate, then hand the socket to a session.
pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = query.token.as_deref().ok_or(AppError::Unauthorized)?;
    let user_id = verify_access_token(token, &app_state.security)?.user_id()?;

    let session = WsSession::new(
        Uuid::new_v4(),
        user_id,
        app_state.hub.clone(),
        app_state.rooms.clone(),
    );
    ws::start(session, &req, stream).map_err(|e| AppError::bad_request(format!("websocket handshake failed: {e}")))
}

/// How a request changes which rooms this connection follows.
enum Membership {
    Stay,
    /// Follow the room from before the request runs, so its own broadcasts arrive.
    Enter { room_id: String, was_following: bool },
    Exit(String),
    /// Follow whichever room the reply names.
    Created,
}

pub struct WsSession {
    conn_id: Uuid,
    user_id: UserId,
    hub: Arc<WsHub>,
    rooms: Arc<RoomRegistry>,
    /// Rooms this connection follows.
    following: HashSet<String>,
    last_heartbeat: Instant,
}

impl WsSession {
    pub fn new(conn_id: Uuid, user_id: UserId, hub: Arc<WsHub>, rooms: Arc<RoomRegistry>) -> Self {
        Self {
            conn_id,
            user_id,
            hub,
            rooms,
            following: HashSet::new(),
            last_heartbeat: Instant::now(),
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "[WS SESSION] failed to serialize outbound message"),
        }
    }

    fn send_ack(ctx: &mut ws::WebsocketContext<Self>, ack: Option<u64>, result: &Result<Option<Value>, DomainError>) {
        let payload = match result {
            Ok(data) => AckPayload::ok(ack, data.clone()),
            Err(err) => AckPayload::err(ack, err),
        };
        Self::send_json(ctx, &ServerEvent::Ack(payload));
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(
                    conn_id = %actor.conn_id,
                    user_id = actor.user_id,
                    "[WS SESSION] heartbeat timed out"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    fn membership(&self, request: &ClientRequest) -> Membership {
        match request {
            ClientRequest::Create(_) => Membership::Created,
            ClientRequest::Join { room_id } | ClientRequest::Spectate { room_id } => Membership::Enter {
                room_id: room_id.clone(),
                was_following: self.following.contains(room_id),
            },
            ClientRequest::Leave { room_id } => Membership::Exit(room_id.clone()),
            _ => Membership::Stay,
        }
    }

    fn handle_text(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let frame: ClientFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(err) => {
                let err = DomainError::validation_other(format!("Malformed frame: {err}"));
                Self::send_ack(ctx, None, &Err(err));
                return;
            }
        };
        let ack = frame.ack;
        let request = match frame.request() {
            Ok(request) => request,
            Err(err) => {
                debug!(conn_id = %self.conn_id, verb = %frame.verb, error = %err, "[WS SESSION] rejected frame");
                Self::send_ack(ctx, ack, &Err(err));
                return;
            }
        };

        let membership = self.membership(&request);
        if let Membership::Enter { room_id, .. } = &membership {
            self.hub.subscribe(self.conn_id, room_id);
        }

        let rooms = self.rooms.clone();
        let user_id = self.user_id;
        ctx.spawn(
            dispatch(rooms, user_id, request)
                .into_actor(self)
                .map(move |result, actor, ctx| {
                    actor.settle_membership(membership, &result);
                    Self::send_ack(ctx, ack, &result);
                }),
        );
    }

    fn settle_membership(&mut self, membership: Membership, result: &Result<Option<Value>, DomainError>) {
        match (membership, result) {
            (Membership::Enter { room_id, .. }, Ok(_)) => {
                self.following.insert(room_id);
            }
            (Membership::Enter { room_id, was_following }, Err(_)) => {
                if !was_following {
                    self.hub.unsubscribe(self.conn_id, &room_id);
                }
            }
            (Membership::Exit(room_id), Ok(_)) => {
                self.hub.unsubscribe(self.conn_id, &room_id);
                self.following.remove(&room_id);
            }
            (Membership::Created, Ok(Some(view))) => {
                if let Some(room_id) = view.get("roomId").and_then(Value::as_str) {
                    self.hub.subscribe(self.conn_id, room_id);
                    self.following.insert(room_id.to_string());
                }
            }
            _ => {}
        }
    }
}

/// Run one request against the room registry; the value becomes the ack's `data`.
async fn dispatch(
    rooms: Arc<RoomRegistry>,
    user_id: UserId,
    request: ClientRequest,
) -> Result<Option<Value>, DomainError> {
    let to_data = |value: Result<Value, serde_json::Error>| value.ok();
    match request {
        ClientRequest::Create(create) => {
            let view = rooms.create(user_id, create).await?;
            Ok(to_data(serde_json::to_value(view)))
        }
        ClientRequest::Join { room_id } => {
            let view = rooms.get(&room_id)?.join(user_id, false).await?;
            Ok(to_data(serde_json::to_value(view)))
        }
        ClientRequest::Spectate { room_id } => {
            let view = rooms.get(&room_id)?.join(user_id, true).await?;
            Ok(to_data(serde_json::to_value(view)))
        }
        ClientRequest::Leave { room_id } => {
            rooms.get(&room_id)?.leave(user_id).await?;
            Ok(None)
        }
        ClientRequest::Ready { room_id, ready } => {
            let view = rooms.get(&room_id)?.set_ready(user_id, ready).await?;
            Ok(to_data(serde_json::to_value(view)))
        }
        ClientRequest::Start { room_id } => {
            let view = rooms.get(&room_id)?.start(user_id).await?;
            Ok(to_data(serde_json::to_value(view)))
        }
        ClientRequest::Chat { room_id, text } => {
            let message = rooms.get(&room_id)?.chat(user_id, text).await?;
            Ok(to_data(serde_json::to_value(message)))
        }
        ClientRequest::VotePause { room_id } => {
            let passed = rooms.get(&room_id)?.vote_pause(user_id).await?;
            Ok(Some(json!({ "passed": passed })))
        }
        ClientRequest::VoteRematch { room_id } => {
            let everyone = rooms.get(&room_id)?.vote_rematch(user_id).await?;
            Ok(Some(json!({ "rematch": everyone })))
        }
        ClientRequest::AfkAck { room_id } => {
            rooms.get(&room_id)?.afk_ack(user_id).await?;
            Ok(None)
        }
        ClientRequest::Game { room_id, action } => {
            rooms.get(&room_id)?.act(user_id, action).await?;
            Ok(None)
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            conn_id = %self.conn_id,
            user_id = self.user_id,
            "[WS SESSION] started"
        );
        let recipient = ctx.address().recipient::<HubEvent>();
        self.hub.register_connection(self.user_id, self.conn_id, recipient);
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.hub.unregister_connection(self.conn_id);
        for room_id in self.following.drain() {
            if let Ok(room) = self.rooms.get(&room_id) {
                let user_id = self.user_id;
                actix::spawn(async move { room.disconnect(user_id).await });
            }
        }
        info!(
            conn_id = %self.conn_id,
            user_id = self.user_id,
            "[WS SESSION] stopped"
        );
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                let err = DomainError::validation_other("Binary frames are not supported");
                Self::send_ack(ctx, None, &Err(err));
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(
                    conn_id = %self.conn_id,
                    user_id = self.user_id,
                    error = %err,
                    "[WS SESSION] protocol error"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

impl Handler<HubEvent> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: HubEvent, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(&*msg.0);
    }
}
