//! Fault taxonomy for match execution.
//!
//! Every failure in a match falls into one of two buckets: a
//! [`PlayerFault`] is attributable to exactly one player and carries the
//! [`Classification`] that player ends with; a [`SystemicFault`] is not
//! attributable to any player and aborts the match. The recorder is the
//! sole surface where faults become user-visible — they end up as a
//! classification plus observations inside the movie, never on a separate
//! error channel.

use thiserror::Error;

use crate::movie::models::Classification;

/// A failure attributable to exactly one player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerFault {
    /// Id of the player at fault.
    pub player: String,
    /// Outcome code the player ends with.
    pub classification: Classification,
    /// Human-readable observation, if any. Becomes the observations text
    /// of every affected player status.
    pub message: Option<String>,
}

impl PlayerFault {
    /// Fault without an observation text.
    pub fn new(player: impl Into<String>, classification: Classification) -> Self {
        PlayerFault {
            player: player.into(),
            classification,
            message: None,
        }
    }

    /// Fault carrying an observation text.
    pub fn with_message(
        player: impl Into<String>,
        classification: Classification,
        message: impl Into<String>,
    ) -> Self {
        PlayerFault {
            player: player.into(),
            classification,
            message: Some(message.into()),
        }
    }
}

impl std::fmt::Display for PlayerFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player {} failed with {}", self.player, self.classification)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PlayerFault {}

/// A failure not attributable to any one player.
///
/// Aborts the match; every tracked player is marked
/// [`Classification::RequiresReevaluation`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SystemicFault {
    /// What went wrong. Becomes the shared observations text.
    pub message: String,
}

impl SystemicFault {
    /// Fault with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        SystemicFault {
            message: message.into(),
        }
    }
}

/// Failed coercion of a [`Command`](crate::messaging::Command) argument.
///
/// Always a programming fault in the calling game logic, never a player
/// fault; converts into [`MatchError::Systemic`] so it cannot be silently
/// swallowed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The argument index is past the end of the argument list.
    #[error("argument {index} of command {name} is not defined")]
    MissingArgument {
        /// Command name.
        name: String,
        /// Requested argument index.
        index: usize,
    },
    /// The argument exists but does not convert to the requested type.
    #[error("argument {index} of command {name} is not {expected}")]
    InvalidArgument {
        /// Command name.
        name: String,
        /// Requested argument index.
        index: usize,
        /// Requested target type.
        expected: &'static str,
    },
}

/// Either kind of match fault, as propagated through the state machine.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MatchError {
    /// Failure attributable to one player.
    #[error(transparent)]
    Player(#[from] PlayerFault),
    /// Failure not attributable to any player.
    #[error(transparent)]
    Systemic(#[from] SystemicFault),
}

impl From<ProtocolError> for SystemicFault {
    fn from(error: ProtocolError) -> Self {
        SystemicFault::new(error.to_string())
    }
}

impl From<ProtocolError> for MatchError {
    fn from(error: ProtocolError) -> Self {
        MatchError::Systemic(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_fault_display_includes_message_when_present() {
        let bare = PlayerFault::new("p1", Classification::TimeLimitExceeded);
        assert_eq!(bare.to_string(), "player p1 failed with TimeLimitExceeded");

        let detailed =
            PlayerFault::with_message("p2", Classification::RuntimeError, "broken pipe");
        assert_eq!(
            detailed.to_string(),
            "player p2 failed with RuntimeError: broken pipe"
        );
    }

    #[test]
    fn coercion_faults_become_systemic() {
        let error = ProtocolError::MissingArgument {
            name: "move".to_owned(),
            index: 5,
        };
        let as_match: MatchError = error.into();
        match as_match {
            MatchError::Systemic(fault) => {
                assert_eq!(fault.message, "argument 5 of command move is not defined");
            }
            MatchError::Player(_) => panic!("coercion faults are never player faults"),
        }
    }
}
