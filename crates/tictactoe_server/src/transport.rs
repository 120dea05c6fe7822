//! HTTP and WebSocket surface.

use crate::broadcast::{Broadcaster, CHAT_TOPIC, GAME_TOPIC};
use crate::config::ServerConfig;
use crate::connections::ConnectionRegistry;
use crate::error::ServerError;
use crate::matchmaking::SessionManager;
use crate::router::{ConnectionEvent, MessageRouter};
use axum::Router;
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::Request;
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::sync::broadcast::error::RecvError;
use tower::ServiceBuilder;
use tracing::{debug, info, instrument, warn};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    router: MessageRouter,
    connections: ConnectionRegistry,
    broadcaster: Broadcaster,
    default_name: String,
}

impl AppState {
    /// Builds fresh state from configuration.
    pub fn new(config: &ServerConfig) -> Self {
        let broadcaster = Broadcaster::new(*config.broadcast_capacity());
        Self {
            router: MessageRouter::new(SessionManager::new(), broadcaster.clone()),
            connections: ConnectionRegistry::new(*config.send_queue_capacity()),
            broadcaster,
            default_name: config.default_name().clone(),
        }
    }

    /// The game router.
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Open game connections.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }
}

/// Builds the axum application.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/hello", get(hello))
        .route("/hello/{name}", get(hello_name))
        .route("/game", get(anonymous_game_socket))
        .route("/game/{name}", get(game_socket))
        .route("/chat/{name}", get(chat_socket))
        .route("/status", get(status_socket))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}

/// Handle to a running server.
#[derive(Debug)]
pub struct ServerHandle {
    /// Address actually bound.
    pub local_addr: SocketAddr,
    /// State shared with the handlers.
    pub state: AppState,
    task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Stops accepting connections.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Binds and serves in the background.
#[instrument(skip(config), fields(bind = %config.bind_address()))]
pub async fn start(config: &ServerConfig) -> Result<ServerHandle, ServerError> {
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    let local_addr = listener.local_addr()?;
    let state = AppState::new(config);
    let app = build_app(state.clone());

    info!(%local_addr, "Server ready");
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "Server exited with error");
        }
    });

    Ok(ServerHandle {
        local_addr,
        state,
        task,
    })
}

/// Binds and serves until the process is stopped.
#[instrument(skip(config), fields(bind = %config.bind_address()))]
pub async fn serve(config: &ServerConfig) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(local_addr = %listener.local_addr()?, "Server ready");
    info!("Game at /game/{{name}}, chat at /chat/{{name}}, status at /status");
    axum::serve(listener, build_app(AppState::new(config))).await?;
    Ok(())
}

async fn root() -> &'static str {
    "It works!"
}

async fn hello() -> &'static str {
    "Hello, world!"
}

async fn hello_name(Path(name): Path<String>) -> String {
    format!("Hello, {}!", name)
}

async fn game_socket(
    ws: WebSocketUpgrade,
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_game_socket(socket, name, state))
}

async fn anonymous_game_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let name = state.default_name.clone();
    ws.on_upgrade(move |socket| handle_game_socket(socket, name, state))
}

/// Runs one game connection: a writer task drains the outbound queue while
/// this task feeds inbound frames to the router in arrival order.
#[instrument(skip(socket, state))]
async fn handle_game_socket(socket: WebSocket, name: String, state: AppState) {
    let (connection, mut rx) = state.connections.register();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let router = &state.router;
    state
        .connections
        .deliver(router.handle(connection, ConnectionEvent::Open { name }));

    while let Some(frame) = ws_rx.next().await {
        let payload = match frame {
            Ok(Message::Text(text)) => text.as_str().as_bytes().to_vec(),
            Ok(Message::Binary(bytes)) => bytes.to_vec(),
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Err(e) => {
                debug!(%connection, error = %e, "Connection error, closing");
                break;
            }
        };
        state
            .connections
            .deliver(router.handle(connection, ConnectionEvent::Payload(payload)));
    }

    state
        .connections
        .deliver(router.handle(connection, ConnectionEvent::Close));
    state.connections.unregister(&connection);
    writer.abort();
}

async fn chat_socket(
    ws: WebSocketUpgrade,
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_chat_socket(socket, name, state.broadcaster))
}

/// Relays chat lines between everyone on the chat topic.
#[instrument(skip(socket, broadcaster))]
async fn handle_chat_socket(socket: WebSocket, name: String, broadcaster: Broadcaster) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut lines = broadcaster.subscribe(CHAT_TOPIC);

    let joined = format!("**{}** has joined the chat", name);
    info!("{}", joined);
    broadcaster.publish(CHAT_TOPIC, joined);

    let writer = tokio::spawn(async move {
        loop {
            match lines.recv().await {
                Ok(line) => {
                    if ws_tx.send(Message::Text(line.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Chat subscriber lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(frame)) = ws_rx.next().await {
        match frame {
            Message::Text(text) => {
                let line = format!("**{}** {}", name, text.as_str());
                info!("{}", line);
                broadcaster.publish(CHAT_TOPIC, line);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    let left = format!("**{}** has left the chat", name);
    info!("{}", left);
    broadcaster.publish(CHAT_TOPIC, left);
    writer.abort();
}

async fn status_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_status_socket(socket, state.broadcaster))
}

/// Streams game status lines until the client goes away.
async fn handle_status_socket(socket: WebSocket, broadcaster: Broadcaster) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut lines = broadcaster.subscribe(GAME_TOPIC);
    debug!("Status subscriber connected");

    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Ok(line) => {
                    if ws_tx.send(Message::Text(line.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Status subscriber lagging"),
                Err(RecvError::Closed) => break,
            },
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("Status subscriber disconnected");
}
