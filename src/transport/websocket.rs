//! WebSocket transport
//!
//! A thin adapter between websocket peers and the hub:
//! - The peer names itself with the `x-client-id` handshake header. The id
//!   is trusted (verification happens upstream) and looked up in the client
//!   directory; unknown or inactive clients are closed right away.
//! - Each connection gets a broker `Client` carrying the directory's
//!   permissions, registered with the hub, and one writer task draining its
//!   outbound queue into the socket.
//! - Text frames are subscribe/unsubscribe requests or messages to publish.
//!   Frames that do not parse get an `error` reply on the peer's own queue.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Hub;
use crate::broker::topic::scope_of;
use crate::client::{Client, Permission};
use crate::directory::ClientDirectory;
use crate::transport::message::{ControlMessage, InboundFrame, error_reply};
use crate::utils::Result;

pub const CLIENT_ID_HEADER: &str = "x-client-id";

pub async fn start_websocket_server(
    addr: &str,
    hub: Hub,
    directory: Arc<dyn ClientDirectory>,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "WebSocket server listening");
    serve(listener, hub, directory).await;
    Ok(())
}

/// Accept connections on an already bound listener until accepting fails.
pub async fn serve(listener: TcpListener, hub: Hub, directory: Arc<dyn ClientDirectory>) {
    while let Ok((stream, peer)) = listener.accept().await {
        debug!(peer = %peer, "Connection accepted");
        tokio::spawn(handle_connection(stream, hub.clone(), directory.clone()));
    }
}

async fn handle_connection(stream: TcpStream, hub: Hub, directory: Arc<dyn ClientDirectory>) {
    let mut claimed_id = None;
    let handshake = accept_hdr_async(stream, |req: &Request, resp: Response| {
        match req
            .headers()
            .get(CLIENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            Some(id) => {
                claimed_id = Some(id.to_string());
                Ok(resp)
            }
            None => {
                let mut reject = ErrorResponse::new(Some(format!("missing {CLIENT_ID_HEADER} header")));
                *reject.status_mut() = StatusCode::UNAUTHORIZED;
                Err(reject)
            }
        }
    })
    .await;

    let mut ws_stream = match handshake {
        Ok(ws) => ws,
        Err(e) => {
            warn!(error = %e, "WebSocket handshake failed");
            return;
        }
    };
    let Some(client_id) = claimed_id else {
        return;
    };

    let record = match directory.find_client(&client_id).await {
        Ok(Some(record)) if record.is_active() => record,
        Ok(_) => {
            warn!(client_id = %client_id, "Unknown or inactive client, closing");
            let _ = ws_stream.close(None).await;
            return;
        }
        Err(e) => {
            warn!(client_id = %client_id, error = %e, "Client lookup failed, closing");
            let _ = ws_stream.close(None).await;
            return;
        }
    };

    let (client, mut outbound) = Client::with_permissions(&record.id, &hub, record.permissions);
    hub.register(client.clone());
    info!(client_id = %client.id, "Client connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let writer = {
        let client_id = client.id.clone();
        tokio::spawn(async move {
            while let Some(msg) = outbound.recv().await {
                let text = match msg.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(client_id = %client_id, error = %e, "Failed to encode outbound message");
                        continue;
                    }
                };
                if let Err(e) = ws_sender.send(WsMessage::Text(text.into())).await {
                    debug!(client_id = %client_id, error = %e, "Send failed, writer stopping");
                    return;
                }
            }
            let _ = ws_sender.send(WsMessage::Close(None)).await;
            debug!(client_id = %client_id, "Writer closed");
        })
    };

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => handle_text(&client, text.as_str()),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(client_id = %client.id, error = %e, "Read failed");
                break;
            }
        }
    }

    hub.unregister(client.clone());
    // the hub closes the queue too, but the writer must end even if the
    // unregister request was dropped
    client.close();
    let _ = writer.await;
    info!(client_id = %client.id, "Client disconnected");
}

/// Apply one inbound text frame on behalf of `client`.
pub fn handle_text(client: &Client, text: &str) {
    match InboundFrame::parse(text) {
        Ok(InboundFrame::Control(ControlMessage::Subscribe { topic })) => {
            // Denials stay silent towards the peer.
            if let Err(e) = client.require(scope_of(&topic), Permission::Read) {
                debug!(client_id = %client.id, topic = %topic, error = %e, "Subscribe denied");
                return;
            }
            client.subscribe(&topic);
            debug!(client_id = %client.id, topic = %topic, "Subscribe requested");
        }
        Ok(InboundFrame::Control(ControlMessage::Unsubscribe { topic })) => {
            client.unsubscribe(&topic);
            debug!(client_id = %client.id, topic = %topic, "Unsubscribe requested");
        }
        Ok(InboundFrame::Publish(msg)) => {
            if let Err(e) = client.require(msg.scope(), Permission::Write) {
                debug!(client_id = %client.id, topic = %msg.topic, error = %e, "Publish denied");
                return;
            }
            client.broadcast(msg);
        }
        Err(e) => {
            debug!(
                client_id = %client.id,
                error = %e,
                frame = %text.chars().take(100).collect::<String>(),
                "Invalid frame"
            );
            if let Err(e) = client.send(error_reply(&e.to_string())) {
                warn!(client_id = %client.id, error = %e, "Failed to queue error reply");
            }
        }
    }
}
