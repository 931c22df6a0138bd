//! Game state machine.
//!
//! ```text
//! Loading ──> Running <──> Paused
//!    ^           │           │
//!    │           v           │
//!    └──────  GameOver <─────┘
//! ```
//!
//! Only `Loading` may follow `GameOver`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CommandError, CommandResult};

/// High-level phase of the game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// Assets and pools are being prepared.
    #[default]
    Loading,
    /// Systems run every frame.
    Running,
    /// Pausable systems are skipped.
    Paused,
    /// The round ended.
    GameOver,
}

impl GameState {
    /// Whether the state machine allows moving from `self` to `to`.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        !matches!(self, Self::GameOver) || matches!(to, Self::Loading | Self::GameOver)
    }
}

/// Owns the current [`GameState`].
#[derive(Clone, Debug, Default)]
pub struct GameStateManager {
    current: GameState,
}

impl GameStateManager {
    /// Starts in `Loading`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> GameState {
        self.current
    }

    /// Moves to `to`.
    ///
    /// Returns the previous state when the state changed, `None` when `to`
    /// equals the current state.
    ///
    /// # Errors
    ///
    /// [`CommandError::IllegalStateTransition`] if the move is forbidden.
    pub fn transition(&mut self, to: GameState) -> CommandResult<Option<GameState>> {
        let from = self.current;
        if from == to {
            return Ok(None);
        }
        if !from.can_transition_to(to) {
            return Err(CommandError::IllegalStateTransition { from, to });
        }
        self.current = to;
        info!(?from, ?to, "game state changed");
        Ok(Some(from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut state = GameStateManager::new();
        assert_eq!(state.current(), GameState::Loading);
        assert_eq!(state.transition(GameState::Running), Ok(Some(GameState::Loading)));
        assert_eq!(state.transition(GameState::Running), Ok(None));
        assert_eq!(state.transition(GameState::Paused), Ok(Some(GameState::Running)));
        assert_eq!(state.transition(GameState::GameOver), Ok(Some(GameState::Paused)));
    }

    #[test]
    fn test_game_over_only_reloads() {
        let mut state = GameStateManager::new();
        state.transition(GameState::GameOver).unwrap();
        assert_eq!(
            state.transition(GameState::Running),
            Err(CommandError::IllegalStateTransition {
                from: GameState::GameOver,
                to: GameState::Running,
            })
        );
        assert_eq!(state.current(), GameState::GameOver);
        assert!(state.transition(GameState::Loading).is_ok());
    }
}
