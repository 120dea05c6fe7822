//! Matchmaking registry shared by every connection.

use crate::session::{ConnectionId, JoinResult, MoveResult, Player, Session, SessionPhase};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tictactoe_board::{Outcome, Side};
use tracing::{debug, info, instrument, warn};

/// Player seated in a session after `join`.
#[derive(Debug, Clone)]
pub struct Joined {
    /// Snapshot of the session after seating.
    pub session: Session,
    /// Whether the player opened a new session or filled one.
    pub result: JoinResult,
}

/// A departed player's final view of the session.
#[derive(Debug, Clone)]
pub struct Departure {
    /// Snapshot of the session at the moment it was removed.
    pub session: Session,
    /// Outcome reported to both participants.
    pub outcome: Outcome,
}

/// A move attempt that reached a session.
#[derive(Debug, Clone)]
pub struct PlayedMove {
    /// Snapshot of the session after the attempt.
    pub session: Session,
    /// What the session made of the move.
    pub result: MoveResult,
}

#[derive(Debug, Default)]
struct Registry {
    /// One entry per open connection.
    players: HashMap<ConnectionId, Player>,
    /// Live sessions in registration order.
    sessions: Vec<Session>,
}

impl Registry {
    fn position_of(&self, connection_id: &ConnectionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.contains(connection_id))
    }
}

/// Manages players and sessions.
///
/// Every read and mutation goes through one lock, so seating, moves and
/// departures never interleave.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    registry: Arc<Mutex<Registry>>,
}

impl SessionManager {
    /// Creates an empty session manager.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session manager");
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a player for a newly opened connection.
    #[instrument(skip(self, player), fields(connection_id = %player.connection_id(), name = %player.name()))]
    pub fn register_player(&self, player: Player) {
        let mut registry = self.lock();
        if registry
            .players
            .insert(*player.connection_id(), player)
            .is_some()
        {
            warn!("Connection registered twice, replacing player");
        }
    }

    /// Forgets a closed connection and drops any session it still occupies.
    #[instrument(skip(self))]
    pub fn unregister_player(&self, connection_id: &ConnectionId) -> Option<Player> {
        let mut registry = self.lock();
        let before = registry.sessions.len();
        registry.sessions.retain(|s| !s.contains(connection_id));
        if registry.sessions.len() != before {
            warn!("Dropped session still held by unregistered player");
        }
        registry.players.remove(connection_id)
    }

    /// Looks up the player for a connection.
    pub fn player(&self, connection_id: &ConnectionId) -> Option<Player> {
        self.lock().players.get(connection_id).cloned()
    }

    /// Seats a registered player.
    ///
    /// Fills the first waiting session, in registration order, that someone
    /// else opened; otherwise opens a new one. A player still seated in a
    /// finished session has that session retired first. Returns `None` for
    /// unknown connections and for players already seated in a live game.
    #[instrument(skip(self))]
    pub fn join(&self, connection_id: &ConnectionId) -> Option<Joined> {
        let mut registry = self.lock();

        let Some(player) = registry.players.get(connection_id).cloned() else {
            warn!("Join from unregistered connection ignored");
            return None;
        };

        if let Some(index) = registry.position_of(connection_id) {
            let phase = registry.sessions[index].phase();
            if phase != SessionPhase::Finished {
                warn!(
                    session_id = %registry.sessions[index].id(),
                    %phase,
                    "Player already seated, join ignored"
                );
                return None;
            }
            let retired = registry.sessions.remove(index);
            info!(session_id = %retired.id(), "Retired finished session");
        }

        for session in registry.sessions.iter_mut() {
            if session.needs_player() && session.player_x() != &player {
                let result = session.join(player.clone());
                if result == JoinResult::BecameActive {
                    info!(session_id = %session.id(), "Player matched into waiting session");
                    return Some(Joined {
                        session: session.clone(),
                        result,
                    });
                }
            }
        }

        let session = Session::new(player);
        info!(
            session_id = %session.id(),
            sessions = registry.sessions.len() + 1,
            "Player waiting in new session"
        );
        registry.sessions.push(session.clone());
        Some(Joined {
            session,
            result: JoinResult::BecameWaiting,
        })
    }

    /// Removes the connection's session and reports the final outcome.
    ///
    /// Returns `None` when the connection holds no seat.
    #[instrument(skip(self))]
    pub fn leave(&self, connection_id: &ConnectionId) -> Option<Departure> {
        let mut registry = self.lock();
        let Some(index) = registry.position_of(connection_id) else {
            debug!("Leave with no session, nothing to do");
            return None;
        };

        let mut session = registry.sessions.remove(index);
        let outcome = session.leave(connection_id)?;
        info!(
            session_id = %session.id(),
            %outcome,
            remaining = registry.sessions.len(),
            "Session removed"
        );
        Some(Departure { session, outcome })
    }

    /// Snapshot of the session the connection is seated in.
    pub fn session_for(&self, connection_id: &ConnectionId) -> Option<Session> {
        let registry = self.lock();
        registry
            .position_of(connection_id)
            .map(|index| registry.sessions[index].clone())
    }

    /// Finds the connection's session and plays the move in one step.
    ///
    /// Returns `None` when the connection holds no seat.
    #[instrument(skip(self))]
    pub fn make_move(
        &self,
        connection_id: &ConnectionId,
        row: i64,
        col: i64,
        declared: Side,
    ) -> Option<PlayedMove> {
        let mut registry = self.lock();
        let Some(index) = registry.position_of(connection_id) else {
            debug!("Move with no session");
            return None;
        };

        let session = &mut registry.sessions[index];
        let result = session.make_move(connection_id, row, col, declared);
        Some(PlayedMove {
            session: session.clone(),
            result,
        })
    }

    /// Snapshot of all live sessions in registration order.
    pub fn sessions(&self) -> Vec<Session> {
        self.lock().sessions.clone()
    }

    /// Number of registered players.
    pub fn player_count(&self) -> usize {
        self.lock().players.len()
    }
}
