//! Discord gateway connection

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::model::{opcode, GatewayPayload, Hello, Identify, RawInteraction, Ready};
use crate::application::errors::BotError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Dispatches forwarded to the client
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(Ready),
    InteractionCreate(RawInteraction),
}

enum SessionEnd {
    Shutdown,
    Reconnect,
}

/// A single gateway connection with reconnects.
///
/// Every reconnect starts a fresh session (no resume).
pub struct Gateway {
    url: String,
    token: String,
    intents: u64,
    reconnect_delay: Duration,
    events: mpsc::UnboundedSender<GatewayEvent>,
}

impl Gateway {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        intents: u64,
        reconnect_delay: Duration,
        events: mpsc::UnboundedSender<GatewayEvent>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            intents,
            reconnect_delay,
            events,
        }
    }

    /// Run until shutdown or a fatal close code
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), BotError> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            match self.run_session(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => {
                    tracing::info!("Gateway connection closed");
                    return Ok(());
                }
                Ok(SessionEnd::Reconnect) => {
                    tracing::info!("Gateway session ended, reconnecting");
                }
                Err(e @ (BotError::Auth(_) | BotError::Gateway(_))) => return Err(e),
                Err(e) => {
                    tracing::warn!("Gateway session failed: {}", e);
                }
            }

            if self.events.is_closed() {
                return Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = shutdown.changed() => return Ok(()),
            }
        }
    }

    async fn run_session(&self, shutdown: &mut watch::Receiver<bool>) -> Result<SessionEnd, BotError> {
        tracing::debug!("Connecting to gateway {}", self.url);
        let (ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| BotError::Network(format!("Gateway connect failed: {}", e)))?;
        let (mut sink, mut stream) = ws.split();

        let hello = await_hello(&mut stream).await?;
        let period = Duration::from_millis(hello.heartbeat_interval.max(1));
        tracing::debug!("Gateway hello, heartbeat every {:?}", period);

        let identify = GatewayPayload::new(
            opcode::IDENTIFY,
            serde_json::to_value(Identify::new(self.token.as_str(), self.intents))?,
        );
        send(&mut sink, &identify).await?;

        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seq: Option<u64> = None;
        let mut acked = true;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
                _ = heartbeat.tick() => {
                    if !acked {
                        tracing::warn!("Heartbeat not acknowledged, connection is zombied");
                        return Ok(SessionEnd::Reconnect);
                    }
                    acked = false;
                    send(&mut sink, &GatewayPayload::heartbeat(seq)).await?;
                }
                frame = stream.next() => {
                    let message = match frame {
                        None => return Ok(SessionEnd::Reconnect),
                        Some(Err(e)) => return Err(BotError::Network(e.to_string())),
                        Some(Ok(message)) => message,
                    };

                    match message {
                        Message::Text(text) => {
                            let payload: GatewayPayload = serde_json::from_str(&text)?;
                            if let Some(s) = payload.s {
                                seq = Some(s);
                            }

                            match payload.op {
                                opcode::DISPATCH => self.dispatch(payload),
                                opcode::HEARTBEAT => send(&mut sink, &GatewayPayload::heartbeat(seq)).await?,
                                opcode::HEARTBEAT_ACK => acked = true,
                                opcode::RECONNECT => {
                                    tracing::info!("Gateway asked us to reconnect");
                                    return Ok(SessionEnd::Reconnect);
                                }
                                opcode::INVALID_SESSION => {
                                    tracing::warn!("Gateway invalidated the session");
                                    return Ok(SessionEnd::Reconnect);
                                }
                                other => tracing::debug!("Ignoring gateway opcode {}", other),
                            }
                        }
                        Message::Close(frame) => return close_outcome(frame),
                        _ => {}
                    }
                }
            }
        }
    }

    fn dispatch(&self, payload: GatewayPayload) {
        let Some(name) = payload.t.as_deref() else {
            return;
        };

        let parsed = match name {
            "READY" => serde_json::from_value(payload.d).map(GatewayEvent::Ready),
            "INTERACTION_CREATE" => serde_json::from_value(payload.d).map(GatewayEvent::InteractionCreate),
            other => {
                tracing::trace!("Ignoring dispatch {}", other);
                return;
            }
        };

        match parsed {
            Ok(event) => {
                if self.events.send(event).is_err() {
                    tracing::debug!("No consumer for gateway events");
                }
            }
            Err(e) => tracing::warn!("Failed to parse {} dispatch: {}", name, e),
        }
    }
}

async fn await_hello(stream: &mut WsSource) -> Result<Hello, BotError> {
    let wait = async {
        while let Some(frame) = stream.next().await {
            let message = frame.map_err(|e| BotError::Network(e.to_string()))?;
            if let Message::Text(text) = message {
                let payload: GatewayPayload = serde_json::from_str(&text)?;
                if payload.op == opcode::HELLO {
                    return Ok(serde_json::from_value::<Hello>(payload.d)?);
                }
            }
        }
        Err(BotError::Network("Gateway closed before hello".to_string()))
    };

    tokio::time::timeout(HELLO_TIMEOUT, wait)
        .await
        .map_err(|_| BotError::Network("Timed out waiting for gateway hello".to_string()))?
}

async fn send(sink: &mut WsSink, payload: &GatewayPayload) -> Result<(), BotError> {
    let text = serde_json::to_string(payload)?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| BotError::Network(e.to_string()))
}

fn close_outcome(frame: Option<CloseFrame<'static>>) -> Result<SessionEnd, BotError> {
    let Some(frame) = frame else {
        return Ok(SessionEnd::Reconnect);
    };

    let code = u16::from(frame.code);
    match code {
        4004 => Err(BotError::Auth(format!("Gateway authentication failed: {}", frame.reason))),
        4010..=4014 => Err(BotError::Gateway(format!("Gateway closed with {}: {}", code, frame.reason))),
        _ => {
            tracing::warn!("Gateway closed with {}: {}", code, frame.reason);
            Ok(SessionEnd::Reconnect)
        }
    }
}
