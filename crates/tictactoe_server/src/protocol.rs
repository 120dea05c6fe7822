//! JSON wire messages.
//!
//! Every message is a single-key object naming the case. Cases without a
//! payload carry `{}`; positional payloads are keyed `_0`, `_1`. This is the
//! shape the mobile clients produce and expect.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use tictactoe_board::{Board, Cell, Outcome, SIZE, Side};

/// Cell as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    /// Empty cell.
    None,
    /// Taken by X.
    X,
    /// Taken by O.
    O,
}

impl From<Cell> for Mark {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => Mark::None,
            Cell::Occupied(Side::X) => Mark::X,
            Cell::Occupied(Side::O) => Mark::O,
        }
    }
}

/// Row-major 3x3 grid of marks.
pub type WireBoard = [[Mark; SIZE]; SIZE];

/// Converts a board into its wire grid.
pub fn wire_board(board: &Board) -> WireBoard {
    let cells = *board.cells();
    cells.map(|row| row.map(Mark::from))
}

/// Game state as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameState {
    /// Game continues.
    Ongoing {},
    /// Full board, no winner.
    Draw {},
    /// A side won.
    Win {
        /// Winning side.
        #[serde(rename = "_0")]
        side: Side,
    },
}

impl From<Outcome> for GameState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ongoing => GameState::Ongoing {},
            Outcome::Draw => GameState::Draw {},
            Outcome::Win(side) => GameState::Win { side },
        }
    }
}

/// Move request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMove {
    /// Target row, 0-based.
    pub row: i64,
    /// Target column, 0-based.
    pub col: i64,
    /// Side the client believes it plays.
    pub player: Side,
}

/// Client to server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientGameMessage {
    /// Place a mark.
    Move {
        /// The move.
        #[serde(rename = "_0")]
        game_move: GameMove,
    },
    /// Find or open a session.
    JoinGame {},
    /// Leave the current session, keeping the connection.
    LeaveGame {},
}

impl ClientGameMessage {
    /// Decodes a text or binary frame.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotUtf8)?;
        Ok(serde_json::from_str(text)?)
    }
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerGameMessage {
    /// Seated alone, waiting for an opponent.
    WaitingForPlayer {},
    /// Recipient moves next.
    YourTurn {},
    /// Opponent moves next.
    OpponentsTurn {},
    /// Recipient's move was applied.
    MoveAccepted {
        /// Board after the move.
        #[serde(rename = "_0")]
        board: WireBoard,
        /// State after the move.
        #[serde(rename = "_1")]
        state: GameState,
    },
    /// Recipient's move was refused.
    MoveRejected {},
    /// Opponent's move was applied.
    OpponentMoved {
        /// Board after the move.
        #[serde(rename = "_0")]
        board: WireBoard,
        /// State after the move.
        #[serde(rename = "_1")]
        state: GameState,
    },
    /// Recipient left the session.
    YouLeft {
        /// Final state.
        #[serde(rename = "_0")]
        state: GameState,
    },
    /// Opponent left the session.
    OpponentLeft {
        /// Final state.
        #[serde(rename = "_0")]
        state: GameState,
    },
}

impl ServerGameMessage {
    /// `moveAccepted` for a board and outcome.
    pub fn move_accepted(board: &Board, outcome: Outcome) -> Self {
        Self::MoveAccepted {
            board: wire_board(board),
            state: outcome.into(),
        }
    }

    /// `opponentMoved` for a board and outcome.
    pub fn opponent_moved(board: &Board, outcome: Outcome) -> Self {
        Self::OpponentMoved {
            board: wire_board(board),
            state: outcome.into(),
        }
    }

    /// `youLeft` for an outcome.
    pub fn you_left(outcome: Outcome) -> Self {
        Self::YouLeft {
            state: outcome.into(),
        }
    }

    /// `opponentLeft` for an outcome.
    pub fn opponent_left(outcome: Outcome) -> Self {
        Self::OpponentLeft {
            state: outcome.into(),
        }
    }

    /// Encodes as JSON text.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_move() {
        let msg =
            ClientGameMessage::decode(br#"{"move":{"_0":{"row":2,"col":1,"player":"o"}}}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientGameMessage::Move {
                game_move: GameMove {
                    row: 2,
                    col: 1,
                    player: Side::O,
                },
            }
        );
    }

    #[test]
    fn test_decode_unit_cases() {
        assert_eq!(
            ClientGameMessage::decode(br#"{"joinGame":{}}"#).unwrap(),
            ClientGameMessage::JoinGame {}
        );
        assert_eq!(
            ClientGameMessage::decode(br#"{"leaveGame":{}}"#).unwrap(),
            ClientGameMessage::LeaveGame {}
        );
    }

    #[test]
    fn test_negative_coordinates_decode() {
        let msg =
            ClientGameMessage::decode(br#"{"move":{"_0":{"row":-1,"col":0,"player":"x"}}}"#);
        assert!(msg.is_ok());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            ClientGameMessage::decode(b"hello"),
            Err(DecodeError::Malformed { .. })
        ));
        assert!(matches!(
            ClientGameMessage::decode(br#"{"dance":{}}"#),
            Err(DecodeError::Malformed { .. })
        ));
        assert!(matches!(
            ClientGameMessage::decode(&[0xff, 0xfe]),
            Err(DecodeError::NotUtf8)
        ));
    }

    #[test]
    fn test_encode_move_accepted() {
        let mut board = Board::new();
        board.apply_move(0, 0, Side::X);
        let msg = ServerGameMessage::move_accepted(&board, Outcome::Ongoing);

        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"moveAccepted": {
                "_0": [["x", "none", "none"], ["none", "none", "none"], ["none", "none", "none"]],
                "_1": {"ongoing": {}}
            }})
        );
    }

    #[test]
    fn test_encode_states() {
        let left = ServerGameMessage::opponent_left(Outcome::Win(Side::O));
        assert_eq!(left.encode().unwrap(), r#"{"opponentLeft":{"_0":{"win":{"_0":"o"}}}}"#);

        let you = ServerGameMessage::you_left(Outcome::Draw);
        assert_eq!(you.encode().unwrap(), r#"{"youLeft":{"_0":{"draw":{}}}}"#);

        let waiting = ServerGameMessage::WaitingForPlayer {};
        assert_eq!(waiting.encode().unwrap(), r#"{"waitingForPlayer":{}}"#);
    }
}
