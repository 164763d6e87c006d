use std::time::Duration;

use axum::{
    body::Bytes,
    extract::ws::{Message, WebSocket},
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at, timeout},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ErrorNotice, JoinOutcome, ServerMessage, SessionCreated},
    error::RelayError,
    services::{disconnect, relay, session_service},
    state::{Connection, Outbound, OutboundQueues, SharedState},
};

const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle the full lifecycle of one client WebSocket: role binding, relaying and teardown.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (sender, mut receiver) = socket.split();
    let config = state.config();
    let (outbound, queues) = Outbound::channel(
        Uuid::new_v4(),
        config.relay_buffer(),
        config.input_delivery(),
    );
    let mut connection = Connection::new(outbound);
    let connection_id = connection.id();
    info!(%connection_id, "client connected");

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(write_loop(sender, queues, config.heartbeat_interval()));

    read_loop(&state, &mut connection, &mut receiver).await;

    let cascade = disconnect::handle_channel_closed(&state, &mut connection);
    info!(%connection_id, ?cascade, "client disconnected");

    finalize(writer_task, connection).await;
}

async fn read_loop(
    state: &SharedState,
    connection: &mut Connection,
    receiver: &mut SplitStream<WebSocket>,
) {
    let idle_limit = state.config().heartbeat_timeout();
    let connection_id = connection.id();

    loop {
        let message = match timeout(idle_limit, receiver.next()).await {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(_) => {
                warn!(%connection_id, role = %connection.role(), "no traffic within heartbeat timeout");
                break;
            }
        };

        match message {
            Ok(Message::Text(text)) => {
                debug!(%connection_id, payload = %text, "received client message");
                handle_text(state, connection, text.as_str());
            }
            Ok(Message::Ping(payload)) => {
                let _ = connection.outbound().send_frame(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection_id, "client closed");
                let _ = connection.outbound().send_frame(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {
                debug!(%connection_id, "ignoring binary frame");
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }
}

/// Dispatch one text frame according to the connection's role.
fn handle_text(state: &SharedState, connection: &mut Connection, text: &str) {
    let connection_id = connection.id();
    let message = match ClientMessage::from_json_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(%connection_id, error = %err, "failed to parse or validate client message");
            notify(connection, ServerMessage::Error(ErrorNotice::invalid_request(err.to_string())));
            return;
        }
    };

    match message {
        ClientMessage::RequestHost => match session_service::request_host(state, connection) {
            Ok(code) => notify(connection, ServerMessage::SessionCreated(SessionCreated { code })),
            Err(err) => {
                warn!(%connection_id, error = %err, "host request refused");
                notify(connection, ServerMessage::Error(ErrorNotice::invalid_request(err.to_string())));
            }
        },
        ClientMessage::RequestController(code) => {
            if let Err(err) = session_service::request_controller(state, connection, &code) {
                info!(%connection_id, error = %err, "controller join refused");
                notify(connection, ServerMessage::ControllerJoined(JoinOutcome::rejected(&err)));
            }
        }
        ClientMessage::Input(input) => {
            if let Err(err) = relay::relay_input(state, connection, input) {
                debug!(%connection_id, error = %err, "input not relayed");
            }
        }
        ClientMessage::ResetGame => match relay::relay_reset(state, connection) {
            Ok(()) => info!(%connection_id, "reset forwarded to host"),
            Err(err @ RelayError::UnauthorizedCommand { .. }) => {
                debug!(%connection_id, error = %err, "ignoring reset");
            }
            Err(err) => debug!(%connection_id, error = %err, "reset not relayed"),
        },
        ClientMessage::Unknown => {
            warn!(%connection_id, "unknown client event");
            notify(connection, ServerMessage::Error(ErrorNotice::invalid_request("unknown event")));
        }
    }
}

fn notify(connection: &Connection, message: ServerMessage) {
    if connection.outbound().send(&message).is_err() {
        debug!(connection_id = %connection.id(), "writer closed; reply dropped");
    }
}

/// Drain both queues into the socket, control first, pinging on every heartbeat tick.
async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut queues: OutboundQueues,
    heartbeat: Duration,
) {
    let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frame = tokio::select! {
            biased;
            control = queues.control.recv() => match control {
                Some(frame) => frame,
                None => break,
            },
            Some(frame) = queues.relay.recv() => frame,
            _ = ticker.tick() => Message::Ping(Bytes::new()),
        };

        let closing = matches!(frame, Message::Close(_));
        if sender.send(frame).await.is_err() || closing {
            break;
        }
    }

    let _ = sender.close().await;
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, connection: Connection) {
    let _ = connection.outbound().send_frame(Message::Close(None));
    drop(connection);

    let abort = writer_task.abort_handle();
    if timeout(WRITER_SHUTDOWN_TIMEOUT, writer_task).await.is_err() {
        warn!("writer task did not stop in time; aborting");
        abort.abort();
    }
}
