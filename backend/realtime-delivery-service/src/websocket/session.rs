use super::{ConnectionId, ConnectionRegistry, PushFrame};
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// WebSocket actor bound to one identity's live channel.
///
/// Frames published through the registry arrive on `receiver` and are written
/// to the socket as JSON text. Inbound text is ignored; the channel is
/// push-only.
pub struct PushSession {
    identity: String,
    connection_id: ConnectionId,
    registry: ConnectionRegistry,
    receiver: Option<UnboundedReceiver<PushFrame>>,
    hb: Instant,
}

impl PushSession {
    pub fn new(
        identity: String,
        connection_id: ConnectionId,
        registry: ConnectionRegistry,
        receiver: UnboundedReceiver<PushFrame>,
    ) -> Self {
        Self {
            identity,
            connection_id,
            registry,
            receiver: Some(receiver),
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(identity = %act.identity, "live channel heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for PushSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
        if let Some(rx) = self.receiver.take() {
            ctx.add_stream(UnboundedReceiverStream::new(rx));
        }
        tracing::info!(identity = %self.identity, connection_id = ?self.connection_id, "live channel opened");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let registry = self.registry.clone();
        let identity = self.identity.clone();
        let connection_id = self.connection_id;
        actix_rt::spawn(async move {
            registry.unregister(&identity, connection_id).await;
        });
        tracing::info!(identity = %self.identity, connection_id = ?self.connection_id, "live channel closed");
    }
}

/// Frames from the registry.
impl StreamHandler<PushFrame> for PushSession {
    fn handle(&mut self, frame: PushFrame, ctx: &mut Self::Context) {
        match frame.to_json() {
            Ok(text) => ctx.text(text),
            Err(e) => tracing::error!(identity = %self.identity, error = %e, "failed to encode push frame"),
        }
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // Sender dropped: a newer connection replaced this one.
        ctx.stop();
    }
}

/// Traffic from the socket.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PushSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(_)) | Ok(ws::Message::Binary(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!(identity = %self.identity, error = %e, "live channel protocol error");
                ctx.stop();
            }
        }
    }
}
