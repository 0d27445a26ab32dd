//! The contract a game implements to be driven by the orchestrator.
//!
//! A [`GameState`] owns the authoritative state of one match and walks a
//! fixed lifecycle: `prepare` once, then per round `state_update_for` /
//! `execute` for each player followed by `end_round`, until `is_running`
//! turns false, then `finalize` exactly once. The orchestrator is generic
//! over this trait and never depends on a concrete game type; concrete
//! games are resolved at startup through a [`GameRegistry`].

use std::collections::BTreeMap;

use crate::errors::{MatchError, SystemicFault};
use crate::messaging::{PlayerAction, StateUpdate};
use crate::movie::MovieBuilder;

/// Authoritative state and rules of one game, driven through a fixed
/// lifecycle by the orchestrator.
pub trait GameState: std::fmt::Debug {
    /// Seed the movie header and internal game data before any round runs.
    ///
    /// `players` maps player ids to display names. A systemic fault aborts
    /// the whole match; a player fault aborts that player only, and the
    /// match continues if the game tolerates a partial roster.
    fn prepare(
        &mut self,
        movie: &mut MovieBuilder,
        title: &str,
        players: &BTreeMap<String, String>,
    ) -> Result<(), MatchError>;

    /// Apply one player's action to the state for the current round.
    ///
    /// A player fault raised here is attributable only to `player`.
    fn execute(
        &mut self,
        movie: &mut MovieBuilder,
        player: &str,
        action: &PlayerAction,
    ) -> Result<(), MatchError>;

    /// The update to send to `player` reflecting the current state.
    ///
    /// Pure: no side effects on the state or the movie.
    fn state_update_for(&self, player: &str) -> Result<StateUpdate, SystemicFault>;

    /// Called once after every player of the round was processed;
    /// typically appends a frame.
    fn end_round(&mut self, movie: &mut MovieBuilder) -> Result<(), MatchError>;

    /// Whether the round loop should keep going.
    fn is_running(&self) -> bool;

    /// Write any closing frame/summary. Invoked exactly once, after
    /// [`GameState::is_running`] first returns false.
    fn finalize(&mut self, movie: &mut MovieBuilder) -> Result<(), SystemicFault>;

    /// Fewest players this game can run with.
    fn min_players(&self) -> usize {
        1
    }

    /// Most players this game can run with.
    fn max_players(&self) -> usize {
        usize::MAX
    }
}

/// Factory producing a fresh game state per match.
pub type GameStateFactory = Box<dyn Fn() -> Box<dyn GameState> + Send + Sync>;

/// Maps game identifiers to game-state factories, resolved at startup.
///
/// The registry is the only place concrete game types are named; past it,
/// everything speaks [`GameState`].
#[derive(Default)]
pub struct GameRegistry {
    factories: BTreeMap<String, GameStateFactory>,
}

impl GameRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        GameRegistry::default()
    }

    /// Register `factory` under `id`, replacing any previous entry.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn GameState> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
    }

    /// Construct a fresh state for the game registered under `id`.
    ///
    /// # Errors
    ///
    /// An unknown id is a [`SystemicFault`]: the match cannot even start
    /// and no player is to blame.
    pub fn create(&self, id: &str) -> Result<Box<dyn GameState>, SystemicFault> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| SystemicFault::new(format!("no game registered under id '{id}'")))?;
        Ok(factory())
    }

    /// Registered game identifiers, in stable order.
    pub fn games(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
