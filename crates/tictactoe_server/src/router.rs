//! Translates connection events into session operations and notifications.
//!
//! The router never touches a socket. Each handler takes the acting
//! connection plus the event and returns the messages to send, in order,
//! addressed to the acting player and/or the opponent. The transport decides
//! how to deliver them.

use crate::broadcast::{Broadcaster, GAME_TOPIC};
use crate::matchmaking::{Departure, Joined, PlayedMove, SessionManager};
use crate::protocol::{ClientGameMessage, GameMove, ServerGameMessage};
use crate::session::{ConnectionId, JoinResult, MoveResult, Player, Session};
use tictactoe_board::Outcome;
use tracing::{debug, info, instrument, warn};

/// A message addressed to one connection.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct Outbound {
    /// Receiving connection.
    pub recipient: ConnectionId,
    /// Message to send.
    pub message: ServerGameMessage,
}

/// Lifecycle and traffic of one game connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Connection established under a display name.
    Open {
        /// Display name.
        name: String,
    },
    /// A text or binary frame arrived.
    Payload(Vec<u8>),
    /// Connection ended, cleanly or not.
    Close,
}

/// Routes game connection events.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    sessions: SessionManager,
    broadcaster: Broadcaster,
}

impl MessageRouter {
    /// Creates a router over shared sessions and status broadcasting.
    pub fn new(sessions: SessionManager, broadcaster: Broadcaster) -> Self {
        Self {
            sessions,
            broadcaster,
        }
    }

    /// The session registry this router drives.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Dispatches one event.
    pub fn handle(&self, connection: ConnectionId, event: ConnectionEvent) -> Vec<Outbound> {
        match event {
            ConnectionEvent::Open { name } => self.on_open(connection, name),
            ConnectionEvent::Payload(bytes) => self.on_payload(connection, &bytes),
            ConnectionEvent::Close => self.on_close(connection),
        }
    }

    /// Registers the player and joins a game.
    #[instrument(skip(self))]
    pub fn on_open(&self, connection: ConnectionId, name: String) -> Vec<Outbound> {
        info!("Game connection opened");
        let player = Player::new(connection, name);
        self.sessions.register_player(player.clone());
        self.join(connection, &player)
    }

    /// Leaves any game, tells the opponent, and forgets the player.
    #[instrument(skip(self))]
    pub fn on_close(&self, connection: ConnectionId) -> Vec<Outbound> {
        let Some(player) = self.sessions.player(&connection) else {
            debug!("Close for unknown connection");
            return Vec::new();
        };
        let out = self.leave(connection, &player, false);
        self.sessions.unregister_player(&connection);
        info!(name = %player.name(), "Game connection closed");
        out
    }

    /// Decodes a frame and routes the message. Garbage is logged and dropped.
    #[instrument(skip(self, payload), fields(len = payload.len()))]
    pub fn on_payload(&self, connection: ConnectionId, payload: &[u8]) -> Vec<Outbound> {
        match ClientGameMessage::decode(payload) {
            Ok(message) => self.on_message(connection, message),
            Err(e) => {
                warn!(
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "Error decoding game message"
                );
                Vec::new()
            }
        }
    }

    /// Routes a decoded message.
    #[instrument(skip(self))]
    pub fn on_message(&self, connection: ConnectionId, message: ClientGameMessage) -> Vec<Outbound> {
        let Some(player) = self.sessions.player(&connection) else {
            warn!("Message from unregistered connection ignored");
            return Vec::new();
        };
        match message {
            ClientGameMessage::Move { game_move } => self.play(connection, &player, game_move),
            ClientGameMessage::JoinGame {} => self.join(connection, &player),
            ClientGameMessage::LeaveGame {} => self.leave(connection, &player, true),
        }
    }

    fn join(&self, connection: ConnectionId, player: &Player) -> Vec<Outbound> {
        let Some(Joined { session, result }) = self.sessions.join(&connection) else {
            return Vec::new();
        };
        self.status(format!("**{}** has joined a game", player.name()));

        match result {
            JoinResult::BecameActive => {
                let x = session.player_x();
                info!(
                    session_id = %session.id(),
                    x = %x.name(),
                    o = %player.name(),
                    "Game started"
                );
                debug!(board = %session.board(), "Game board");
                vec![
                    Outbound::new(connection, ServerGameMessage::OpponentsTurn {}),
                    Outbound::new(*x.connection_id(), ServerGameMessage::YourTurn {}),
                ]
            }
            JoinResult::BecameWaiting | JoinResult::Unchanged => {
                info!(session_id = %session.id(), "Waiting on second player");
                vec![Outbound::new(connection, ServerGameMessage::WaitingForPlayer {})]
            }
        }
    }

    fn leave(&self, connection: ConnectionId, player: &Player, notify_leaver: bool) -> Vec<Outbound> {
        self.status(format!("**{}** has left a game", player.name()));

        let Some(Departure { session, outcome }) = self.sessions.leave(&connection) else {
            return Vec::new();
        };
        self.announce_outcome(&session, outcome, player);

        let mut out = Vec::new();
        if notify_leaver {
            out.push(Outbound::new(connection, ServerGameMessage::you_left(outcome)));
        }
        if let Some(opponent) = session.opponent_of(&connection) {
            out.push(Outbound::new(
                *opponent.connection_id(),
                ServerGameMessage::opponent_left(outcome),
            ));
        }
        out
    }

    fn play(&self, connection: ConnectionId, player: &Player, game_move: GameMove) -> Vec<Outbound> {
        let GameMove { row, col, player: declared } = game_move;
        let Some(PlayedMove { session, result }) =
            self.sessions.make_move(&connection, row, col, declared)
        else {
            debug!("Move from player without a session");
            return vec![Outbound::new(connection, ServerGameMessage::MoveRejected {})];
        };

        let (board, outcome) = match result {
            MoveResult::Accepted { board, outcome } => (board, outcome),
            MoveResult::Rejected(reason) => {
                debug!(%reason, "Replying moveRejected");
                return vec![Outbound::new(connection, ServerGameMessage::MoveRejected {})];
            }
        };
        self.announce_outcome(&session, outcome, player);

        let mut out = vec![Outbound::new(
            connection,
            ServerGameMessage::move_accepted(&board, outcome),
        )];
        let opponent = session.opponent_of(&connection).map(|p| *p.connection_id());
        if let Some(opponent) = opponent {
            out.push(Outbound::new(
                opponent,
                ServerGameMessage::opponent_moved(&board, outcome),
            ));
        }
        if !outcome.is_terminal() {
            out.push(Outbound::new(connection, ServerGameMessage::OpponentsTurn {}));
            if let Some(opponent) = opponent {
                out.push(Outbound::new(opponent, ServerGameMessage::YourTurn {}));
            }
        }
        out
    }

    /// Publishes the result line once a game is decided. `actor` is the
    /// player whose move or departure decided it.
    fn announce_outcome(&self, session: &Session, outcome: Outcome, actor: &Player) {
        if !outcome.is_terminal() {
            return;
        }
        let line = match outcome.winner() {
            Some(side) => match session.player(side) {
                Some(winner) => format!("**{}** wins!", winner.name()),
                None => return,
            },
            None => format!("**{}**'s game ends in a draw", actor.name()),
        };
        self.status(line);
    }

    fn status(&self, line: String) {
        info!(status = %line, "Game status");
        self.broadcaster.publish(GAME_TOPIC, line);
    }
}
