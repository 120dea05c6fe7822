//! A single two-player game session.

use derive_getters::Getters;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tictactoe_board::{Board, Outcome, Side};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Identifies one open connection for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A connected participant.
///
/// Two players are the same player iff they share a connection.
#[derive(Debug, Clone, Getters, derive_new::new)]
pub struct Player {
    /// Connection this player arrived on.
    connection_id: ConnectionId,
    /// Display name from the connection path.
    name: String,
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.connection_id == other.connection_id
    }
}

impl Eq for Player {}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionPhase {
    /// Only X is seated.
    Waiting,
    /// Both seats filled, moves proceed.
    Active,
    /// Win or draw reached, or someone left.
    Finished,
}

/// Result of offering a player to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    /// The session was created around this player and waits for an opponent.
    BecameWaiting,
    /// The player took the O seat.
    BecameActive,
    /// The session could not take this player.
    Unchanged,
}

/// Why a move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MoveRejection {
    /// Mover is not seated in this session.
    #[display("player is not in this session")]
    NotInSession,
    /// No opponent yet.
    #[display("session is waiting for a second player")]
    AwaitingOpponent,
    /// The game is already decided.
    #[display("game is over ({_0})")]
    GameOver(Outcome),
    /// The message claimed a side the player does not hold.
    #[display("declared side {declared} but plays {actual}")]
    SideMismatch {
        /// Side named in the message.
        declared: Side,
        /// Side the player actually holds.
        actual: Side,
    },
    /// It is the other side's turn.
    #[display("not {_0}'s turn")]
    OutOfTurn(Side),
    /// Out of range or already occupied.
    #[display("cell ({row}, {col}) is not playable")]
    IllegalPlacement {
        /// Requested row.
        row: i64,
        /// Requested column.
        col: i64,
    },
}

/// Result of a move attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    /// Move applied; carries the board after the move.
    Accepted {
        /// Board after the move.
        board: Board,
        /// Outcome after the move.
        outcome: Outcome,
    },
    /// Move refused; the board is unchanged.
    Rejected(MoveRejection),
}

/// Two players bound to one board.
#[derive(Debug, Clone, Getters)]
pub struct Session {
    /// Session ID.
    id: SessionId,
    /// Player X, always present.
    player_x: Player,
    /// Player O, absent while waiting.
    player_o: Option<Player>,
    /// Board state.
    board: Board,
    /// Side allowed to move next.
    turn: Side,
}

impl Session {
    /// Creates a waiting session with `player_x` in the X seat.
    #[instrument(skip(player_x), fields(player = %player_x.name))]
    pub fn new(player_x: Player) -> Self {
        let id = SessionId::new();
        info!(session_id = %id, "Creating new game session");
        Self {
            id,
            player_x,
            player_o: None,
            board: Board::new(),
            turn: Side::X,
        }
    }

    /// True while the O seat is empty.
    pub fn needs_player(&self) -> bool {
        self.player_o.is_none()
    }

    /// Seated players, X first.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        std::iter::once(&self.player_x).chain(self.player_o.as_ref())
    }

    /// True if the connection holds a seat here.
    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.players().any(|p| p.connection_id == *connection_id)
    }

    /// Side held by the connection, if seated.
    #[instrument(level = "trace", skip(self))]
    pub fn side_of(&self, connection_id: &ConnectionId) -> Option<Side> {
        if self.player_x.connection_id == *connection_id {
            Some(Side::X)
        } else if self.player_o.as_ref().map(|p| p.connection_id) == Some(*connection_id) {
            Some(Side::O)
        } else {
            None
        }
    }

    /// Player seated on `side`.
    pub fn player(&self, side: Side) -> Option<&Player> {
        match side {
            Side::X => Some(&self.player_x),
            Side::O => self.player_o.as_ref(),
        }
    }

    /// The other seated player, if the connection is seated and has one.
    #[instrument(level = "trace", skip(self))]
    pub fn opponent_of(&self, connection_id: &ConnectionId) -> Option<&Player> {
        self.side_of(connection_id)
            .and_then(|side| self.player(side.opponent()))
    }

    /// Current outcome of the board.
    pub fn outcome(&self) -> Outcome {
        self.board.outcome()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        if self.outcome().is_terminal() {
            SessionPhase::Finished
        } else if self.needs_player() {
            SessionPhase::Waiting
        } else {
            SessionPhase::Active
        }
    }

    /// Seats `player` as O if the session is waiting for someone else.
    #[instrument(skip(self, player), fields(session_id = %self.id, player = %player.name))]
    pub fn join(&mut self, player: Player) -> JoinResult {
        if self.phase() != SessionPhase::Waiting || player == self.player_x {
            debug!(phase = %self.phase(), "Session cannot take player");
            return JoinResult::Unchanged;
        }
        info!(connection_id = %player.connection_id, side = "O", "Registering player as O");
        self.player_o = Some(player);
        JoinResult::BecameActive
    }

    /// Checks if it's the given connection's turn.
    pub fn is_players_turn(&self, connection_id: &ConnectionId) -> bool {
        self.side_of(connection_id) == Some(self.turn)
    }

    /// Attempts a move for the seated connection.
    ///
    /// The mover's side comes from the seat it holds; `declared` is the side
    /// the client claims and must agree. Nothing changes unless the move is
    /// accepted, in which case the turn passes to the other side.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn make_move(
        &mut self,
        connection_id: &ConnectionId,
        row: i64,
        col: i64,
        declared: Side,
    ) -> MoveResult {
        match self.place(connection_id, row, col, declared) {
            Ok(side) => {
                self.turn = side.opponent();
                let outcome = self.board.outcome();
                info!(%side, row, col, %outcome, "Move accepted");
                debug!(board = %self.board, "Board after move");
                MoveResult::Accepted {
                    board: self.board.clone(),
                    outcome,
                }
            }
            Err(rejection) => {
                warn!(%rejection, row, col, "Move rejected");
                MoveResult::Rejected(rejection)
            }
        }
    }

    /// Validates and, on success, places the mark. Returns the mover's side.
    fn place(
        &mut self,
        connection_id: &ConnectionId,
        row: i64,
        col: i64,
        declared: Side,
    ) -> Result<Side, MoveRejection> {
        let side = self
            .side_of(connection_id)
            .ok_or(MoveRejection::NotInSession)?;

        match self.phase() {
            SessionPhase::Waiting => return Err(MoveRejection::AwaitingOpponent),
            SessionPhase::Finished => return Err(MoveRejection::GameOver(self.outcome())),
            SessionPhase::Active => {}
        }

        if declared != side {
            return Err(MoveRejection::SideMismatch {
                declared,
                actual: side,
            });
        }

        if !self.is_players_turn(connection_id) {
            return Err(MoveRejection::OutOfTurn(side));
        }

        let placement = MoveRejection::IllegalPlacement { row, col };
        let r = usize::try_from(row).map_err(|_| placement)?;
        let c = usize::try_from(col).map_err(|_| placement)?;
        if !self.board.apply_move(r, c, side) {
            return Err(placement);
        }

        Ok(side)
    }

    /// Walks the connection out of the game.
    ///
    /// Returns `None` when the connection holds no seat. Otherwise the
    /// leaver forfeits an undecided game; a decided game keeps its outcome.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn leave(&mut self, connection_id: &ConnectionId) -> Option<Outcome> {
        let side = self.side_of(connection_id)?;
        let outcome = self.board.leave(side);
        info!(%side, %outcome, "Player left session");
        debug!(board = %self.board, "Board at departure");
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> Player {
        Player::new(ConnectionId::new(), name.to_string())
    }

    fn active() -> (Session, Player, Player) {
        let x = player("alice");
        let o = player("bob");
        let mut session = Session::new(x.clone());
        assert_eq!(session.join(o.clone()), JoinResult::BecameActive);
        (session, x, o)
    }

    #[test]
    fn test_new_session_waits_for_o() {
        let x = player("alice");
        let session = Session::new(x.clone());
        assert_eq!(session.phase(), SessionPhase::Waiting);
        assert!(session.needs_player());
        assert_eq!(session.side_of(x.connection_id()), Some(Side::X));
        assert_eq!(*session.turn(), Side::X);
    }

    #[test]
    fn test_join_rejects_same_player_and_third_player() {
        let x = player("alice");
        let mut session = Session::new(x.clone());
        assert_eq!(session.join(x.clone()), JoinResult::Unchanged);

        assert_eq!(session.join(player("bob")), JoinResult::BecameActive);
        assert_eq!(session.join(player("carol")), JoinResult::Unchanged);
        assert_eq!(session.players().count(), 2);
    }

    #[test]
    fn test_turns_alternate_from_x() {
        let (mut session, x, o) = active();

        let early = session.make_move(o.connection_id(), 0, 0, Side::O);
        assert_eq!(early, MoveResult::Rejected(MoveRejection::OutOfTurn(Side::O)));
        assert_eq!(session.board().occupied(), 0);

        assert!(matches!(
            session.make_move(x.connection_id(), 0, 0, Side::X),
            MoveResult::Accepted { .. }
        ));
        assert_eq!(*session.turn(), Side::O);
        assert!(session.is_players_turn(o.connection_id()));

        let again = session.make_move(x.connection_id(), 1, 1, Side::X);
        assert_eq!(again, MoveResult::Rejected(MoveRejection::OutOfTurn(Side::X)));
        assert_eq!(*session.turn(), Side::O);
    }

    #[test]
    fn test_declared_side_must_match_seat() {
        let (mut session, x, _) = active();
        let result = session.make_move(x.connection_id(), 0, 0, Side::O);
        assert_eq!(
            result,
            MoveResult::Rejected(MoveRejection::SideMismatch {
                declared: Side::O,
                actual: Side::X,
            })
        );
    }

    #[test]
    fn test_negative_and_large_coordinates_rejected() {
        let (mut session, x, _) = active();
        for (row, col) in [(-1, 0), (0, -1), (3, 0), (0, 7)] {
            assert_eq!(
                session.make_move(x.connection_id(), row, col, Side::X),
                MoveResult::Rejected(MoveRejection::IllegalPlacement { row, col })
            );
        }
        assert_eq!(*session.turn(), Side::X);
    }

    #[test]
    fn test_waiting_session_rejects_moves() {
        let x = player("alice");
        let mut session = Session::new(x.clone());
        assert_eq!(
            session.make_move(x.connection_id(), 0, 0, Side::X),
            MoveResult::Rejected(MoveRejection::AwaitingOpponent)
        );
    }

    #[test]
    fn test_stranger_rejected() {
        let (mut session, _, _) = active();
        let stranger = player("mallory");
        assert_eq!(
            session.make_move(stranger.connection_id(), 0, 0, Side::X),
            MoveResult::Rejected(MoveRejection::NotInSession)
        );
        assert!(!session.contains(stranger.connection_id()));
        assert_eq!(session.leave(stranger.connection_id()), None);
    }

    #[test]
    fn test_leave_forfeits_then_stays_put() {
        let (mut session, x, o) = active();
        session.make_move(x.connection_id(), 1, 1, Side::X);

        assert_eq!(session.leave(x.connection_id()), Some(Outcome::Win(Side::O)));
        assert_eq!(session.phase(), SessionPhase::Finished);
        assert_eq!(session.leave(o.connection_id()), Some(Outcome::Win(Side::O)));
        assert_eq!(session.board().occupied(), 1);
    }

    #[test]
    fn test_finished_session_rejects_moves() {
        let (mut session, x, o) = active();
        session.leave(o.connection_id());
        assert_eq!(
            session.make_move(x.connection_id(), 0, 0, Side::X),
            MoveResult::Rejected(MoveRejection::GameOver(Outcome::Win(Side::X)))
        );
    }

    #[test]
    fn test_opponent_lookup() {
        let (session, x, o) = active();
        assert_eq!(session.opponent_of(x.connection_id()), Some(&o));
        assert_eq!(session.opponent_of(o.connection_id()), Some(&x));
        assert_eq!(session.opponent_of(&ConnectionId::new()), None);
    }
}
