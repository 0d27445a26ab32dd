//! Core orchestration of one match.
//!
//! [`GameManager`] drives a [`GameState`] through its lifecycle against a
//! roster of player processes: it wraps the processes in
//! [`PlayerChannels`], runs preparation, exchanges protocol messages with
//! each player every round under the configured deadline, and records
//! every observed outcome in its [`MovieBuilder`].
//!
//! One manager runs one match, single-threaded. Within a round, players
//! are processed in stable id order and no two players' exchanges
//! interleave. Channels are closed on every exit path; the child processes
//! themselves stay with the caller, which decides whether to terminate
//! them.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::Child;

use tracing::{info, instrument, trace, warn};

use crate::channel::PlayerChannels;
use crate::compression::Compression;
use crate::configuration::Configuration;
use crate::errors::{MatchError, PlayerFault, SystemicFault};
use crate::game_interface::GameState;
use crate::logger::init_logger;
use crate::movie::models::{Movie, PlayerStatus};
use crate::movie::MovieBuilder;

/// One player process and the display name it competes under.
#[derive(Debug)]
pub struct PlayerProcess {
    /// Display name recorded in the movie header.
    pub name: String,
    /// The running player program, spawned with piped stdin/stdout.
    pub child: Child,
}

impl PlayerProcess {
    /// Pair `child` with `name`.
    pub fn new(name: impl Into<String>, child: Child) -> Self {
        PlayerProcess {
            name: name.into(),
            child,
        }
    }
}

/// Orchestrates one match and owns its recorded movie.
pub struct GameManager {
    config: Configuration,
    movie: MovieBuilder,
}

impl GameManager {
    /// Create a manager with the given configuration.
    pub fn new(config: Configuration) -> Self {
        if config.log {
            init_logger();
        }
        GameManager {
            config,
            movie: MovieBuilder::new(),
        }
    }

    /// Run one match of `state` over `players`.
    ///
    /// Every outcome — success, per-player fault or systemic fault — ends
    /// up in the movie; this method itself never fails. Channels are
    /// released before returning, on every path.
    #[instrument(skip_all, fields(players = players.len()))]
    pub fn manage(&mut self, state: &mut dyn GameState, players: &mut BTreeMap<String, PlayerProcess>) {
        let roster: BTreeMap<String, String> = players
            .iter()
            .map(|(id, p)| (id.clone(), p.name.clone()))
            .collect();

        let streams = players
            .iter_mut()
            .map(|(id, p)| (id.as_str(), &mut p.child));
        let result = match PlayerChannels::new(streams) {
            Ok(mut channels) => {
                let result = self.run(state, &mut channels, &roster);
                channels.close();
                result
            }
            Err(fault) => Err(fault.into()),
        };

        if let Err(error) = result {
            warn!(%error, "match aborted");
            // faults must name every rostered player, even when the game
            // never got to register them
            for (id, name) in &roster {
                if !self.movie.has_player(id) {
                    self.movie.add_player(id, name);
                }
            }
            self.movie.failed_evaluation(&error);
        }
        self.movie.flush_frame();
    }

    fn run(
        &mut self,
        state: &mut dyn GameState,
        channels: &mut PlayerChannels,
        roster: &BTreeMap<String, String>,
    ) -> Result<(), MatchError> {
        let (min, max) = (state.min_players(), state.max_players());
        if roster.len() < min || roster.len() > max {
            let wanted = if max == usize::MAX {
                format!("at least {min}")
            } else {
                format!("{min} to {max}")
            };
            return Err(SystemicFault::new(format!(
                "this game takes {wanted} players, got {}",
                roster.len()
            ))
            .into());
        }

        let mut active: Vec<String> = roster.keys().cloned().collect();
        let mut dropped: Vec<PlayerFault> = Vec::new();

        info!(title = %self.config.title, "preparing match");
        match state.prepare(&mut self.movie, &self.config.title, roster) {
            Ok(()) => {}
            Err(MatchError::Player(fault)) => self.fail_player(&mut active, &mut dropped, fault),
            Err(systemic) => return Err(systemic),
        }

        while state.is_running() && !active.is_empty() {
            for player in active.clone() {
                // a fault handled earlier in this round may have removed it
                if !active.contains(&player) {
                    continue;
                }
                match self.play_turn(state, channels, &player) {
                    Ok(()) => {}
                    Err(MatchError::Player(fault)) => {
                        self.fail_player(&mut active, &mut dropped, fault);
                    }
                    Err(systemic) => return Err(systemic),
                }
            }
            state.end_round(&mut self.movie)?;
        }

        info!("finalizing match");
        state.finalize(&mut self.movie)?;

        // a dropped player keeps its fault as the outcome of record; the
        // game's finalize only speaks for the players that finished
        for fault in &dropped {
            self.movie.set_classification(&fault.player, fault.classification);
            self.movie.set_points(&fault.player, 0);
            if let Some(message) = &fault.message {
                self.movie.set_observations(&fault.player, message.clone());
            }
        }
        Ok(())
    }

    fn play_turn(
        &mut self,
        state: &mut dyn GameState,
        channels: &mut PlayerChannels,
        player: &str,
    ) -> Result<(), MatchError> {
        trace!(player, "playing turn");
        let update = state.state_update_for(player)?;
        channels.send(player, Some(&update))?;
        let action = channels.receive_deadline(player, self.config.action_timeout)?;
        state.execute(&mut self.movie, player, &action)
    }

    /// Record a player fault and drop the player from the active set; the
    /// match goes on for the others, with their confidence downgraded by
    /// the recorder.
    fn fail_player(
        &mut self,
        active: &mut Vec<String>,
        dropped: &mut Vec<PlayerFault>,
        fault: PlayerFault,
    ) {
        warn!(player = %fault.player, classification = %fault.classification, "player fault");
        active.retain(|id| id != &fault.player);
        self.movie.failed_evaluation(&MatchError::Player(fault.clone()));
        dropped.push(fault);
    }

    /// The recorded movie so far.
    pub fn movie(&self) -> &Movie {
        self.movie.movie()
    }

    /// Evaluation status of `player` in the latest frame that has one.
    pub fn player_status(&self, player: &str) -> Option<&PlayerStatus> {
        self.movie.player_status(player)
    }

    /// The movie as a JSON string, compressed with the configured mode.
    pub fn movie_string(&self) -> Result<String, SystemicFault> {
        self.movie.serialize(self.config.compression)
    }

    /// The movie as a JSON string, compressed with `compression`.
    pub fn movie_string_with(&self, compression: Compression) -> Result<String, SystemicFault> {
        self.movie.serialize(compression)
    }

    /// Write the uncompressed movie document to `writer`.
    pub fn export_movie(&self, writer: &mut impl Write) -> Result<(), SystemicFault> {
        self.movie.write_to(writer)
    }
}
