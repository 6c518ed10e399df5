//! WebSocket session actor.
//!
//! A channel upgrades without credentials and starts unauthenticated. The
//! first `{"type":"auth","token":...}` frame is resolved against the user
//! store; on success the session binds itself into the registry and becomes
//! addressable by the router. Pings are answered whether or not the session
//! is authenticated, but only authenticated sessions refresh registry
//! liveness. The health monitor, not the session, decides eviction.

use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use sqlx::PgPool;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth;
use crate::models::UserProfile;
use crate::websocket::frames::{ClientFrame, ServerFrame};
use crate::websocket::registry::{ConnectionRegistry, Outbound, CLOSE_AUTH_FAILED};

#[derive(ActixMessage)]
#[rtype(result = "()")]
struct AuthResolved(UserProfile);

#[derive(ActixMessage)]
#[rtype(result = "()")]
struct AuthRejected;

#[derive(ActixMessage)]
#[rtype(result = "()")]
struct PushFrame(String);

#[derive(ActixMessage)]
#[rtype(result = "()")]
struct CloseSession {
    code: u16,
    reason: &'static str,
}

struct Identity {
    user_id: Uuid,
    session_id: Uuid,
}

pub struct WsSession {
    registry: ConnectionRegistry,
    db: PgPool,
    jwt_secret: String,
    identity: Option<Identity>,
}

impl WsSession {
    pub fn new(registry: ConnectionRegistry, db: PgPool, jwt_secret: String) -> Self {
        Self {
            registry,
            db,
            jwt_secret,
            identity: None,
        }
    }

    /// Bind a resolved identity into the registry. Returns the push receiver
    /// for the new binding, or `None` when this session already holds one —
    /// a second auth resolution must not displace the binding it just made.
    fn bind(&mut self, profile: &UserProfile) -> Option<mpsc::UnboundedReceiver<Outbound>> {
        if self.identity.is_some() {
            return None;
        }
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
        self.registry.register(
            profile.id,
            session_id,
            profile.name.clone(),
            profile.role,
            tx,
        );
        self.identity = Some(Identity {
            user_id: profile.id,
            session_id,
        });
        Some(rx)
    }

    fn handle_client_frame(&mut self, frame: ClientFrame, ctx: &mut ws::WebsocketContext<Self>) {
        match frame {
            ClientFrame::Auth { token } => {
                if self.identity.is_some() {
                    // Already bound; a second auth frame is ignored
                    return;
                }
                let db = self.db.clone();
                let secret = self.jwt_secret.clone();
                let addr = ctx.address();
                actix::spawn(async move {
                    match auth::resolve_identity(&db, &secret, &token).await {
                        Ok(profile) => addr.do_send(AuthResolved(profile)),
                        Err(_) => addr.do_send(AuthRejected),
                    }
                });
            }
            ClientFrame::Ping => {
                if let Some(identity) = &self.identity {
                    self.registry.touch(identity.user_id);
                }
                ctx.text(ServerFrame::pong().to_json());
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("websocket session opened, awaiting auth frame");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(identity) = &self.identity {
            self.registry
                .unregister(identity.user_id, identity.session_id);
            tracing::info!(user_id = %identity.user_id, "websocket session closed");
        }
    }
}

impl Handler<AuthResolved> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: AuthResolved, ctx: &mut Self::Context) {
        let profile = msg.0;
        let Some(mut rx) = self.bind(&profile) else {
            // Duplicate resolution from a repeated auth frame
            return;
        };

        // Forward registry pushes into the actor mailbox
        let addr = ctx.address();
        actix::spawn(async move {
            while let Some(outbound) = rx.recv().await {
                match outbound {
                    Outbound::Frame(frame) => addr.do_send(PushFrame(frame)),
                    Outbound::Close { code, reason } => {
                        addr.do_send(CloseSession { code, reason })
                    }
                }
            }
        });

        tracing::info!(
            user_id = %profile.id,
            role = profile.role.as_str(),
            "websocket session authenticated"
        );
        ctx.text(ServerFrame::auth_success(profile).to_json());
    }
}

impl Handler<AuthRejected> for WsSession {
    type Result = ();

    fn handle(&mut self, _msg: AuthRejected, ctx: &mut Self::Context) {
        tracing::warn!("websocket auth failed, closing channel");
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Other(CLOSE_AUTH_FAILED),
            description: Some("authentication failed".to_string()),
        }));
        ctx.stop();
    }
}

impl Handler<PushFrame> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: PushFrame, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl Handler<CloseSession> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: CloseSession, ctx: &mut Self::Context) {
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Other(msg.code),
            description: Some(msg.reason.to_string()),
        }));
        ctx.stop();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => self.handle_client_frame(frame, ctx),
                // Unknown frames are ignored per protocol
                Err(_) => tracing::debug!("ignoring unrecognized websocket frame"),
            },
            Ok(ws::Message::Ping(payload)) => {
                if let Some(identity) = &self.identity {
                    self.registry.touch(identity.user_id);
                }
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                if let Some(identity) = &self.identity {
                    self.registry.touch(identity.user_id);
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::debug!("binary websocket frames not supported, ignoring");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(?reason, "websocket close frame received");
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(error = %e, "websocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}


/// GET /ws — upgrade and hand the stream to a session actor.
pub async fn ws_entry(
    req: HttpRequest,
    stream: web::Payload,
    registry: web::Data<ConnectionRegistry>,
    db: web::Data<PgPool>,
    config: web::Data<crate::config::Config>,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(
        registry.get_ref().clone(),
        db.get_ref().clone(),
        config.auth.jwt_secret.clone(),
    );
    ws::start(session, &req, stream)
}
