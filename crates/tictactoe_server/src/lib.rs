//! Tic-tac-toe matchmaking and game server.
//!
//! Players connect over WebSocket, are paired into two-seat sessions, and
//! exchange moves as JSON messages.
//!
//! # Architecture
//!
//! - **Session**: one game between two seats, with turn and move validation
//! - **SessionManager**: the shared registry of players and sessions
//! - **MessageRouter**: maps connection events onto sessions and yields replies
//! - **Transport**: axum WebSocket endpoints feeding the router
//! - **Broadcaster**: per-game status lines and the chat relay
//!
//! # Example
//!
//! ```no_run
//! use tictactoe_server::ServerConfig;
//!
//! # async fn example() -> Result<(), tictactoe_server::ServerError> {
//! let config = ServerConfig::default().with_port(8080);
//! tictactoe_server::serve(&config).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod broadcast;
mod config;
mod connections;
mod error;
mod matchmaking;
mod protocol;
mod router;
mod session;
mod transport;

// Crate-level exports - Configuration and errors
pub use config::ServerConfig;
pub use error::{ConfigError, DecodeError, ServerError};

// Crate-level exports - Sessions and matchmaking
pub use matchmaking::{Departure, Joined, PlayedMove, SessionManager};
pub use session::{
    ConnectionId, JoinResult, MoveRejection, MoveResult, Player, Session, SessionId, SessionPhase,
};

// Crate-level exports - Wire protocol
pub use protocol::{ClientGameMessage, GameMove, GameState, Mark, ServerGameMessage, WireBoard};

// Crate-level exports - Routing and delivery
pub use broadcast::{Broadcaster, CHAT_TOPIC, GAME_TOPIC};
pub use connections::ConnectionRegistry;
pub use router::{ConnectionEvent, MessageRouter, Outbound};

// Crate-level exports - HTTP and WebSocket surface
pub use transport::{AppState, ServerHandle, build_app, serve, start};
