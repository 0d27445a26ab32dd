//! Toy games used by the integration tests.

use std::collections::BTreeMap;

use serde_json::json;

use arena_builder::errors::{MatchError, PlayerFault, SystemicFault};
use arena_builder::game_interface::GameState;
use arena_builder::messaging::{PlayerAction, StateUpdate};
use arena_builder::movie::models::{Classification, FrameItem};
use arena_builder::movie::MovieBuilder;

/// Players race along a line: each round everyone answers `step` with how
/// far to move (capped at 3). After the configured number of rounds, the
/// farthest player(s) are `Accepted`, the rest `WrongAnswer`.
#[derive(Debug)]
pub struct RaceGame {
    rounds: u32,
    played: u32,
    positions: BTreeMap<String, i64>,
}

impl RaceGame {
    pub fn new(rounds: u32) -> Self {
        RaceGame {
            rounds,
            played: 0,
            positions: BTreeMap::new(),
        }
    }
}

impl GameState for RaceGame {
    fn prepare(
        &mut self,
        movie: &mut MovieBuilder,
        title: &str,
        players: &BTreeMap<String, String>,
    ) -> Result<(), MatchError> {
        movie.set_title(title);
        movie.set_background("images/track.png");
        movie.set_width(640);
        movie.set_height(120);
        movie.set_fps(4);
        movie.add_sprite("runner", "images/runner.png");
        for (id, name) in players {
            movie.add_player(id, name);
            self.positions.insert(id.clone(), 0);
        }
        movie.add_frame();
        Ok(())
    }

    fn execute(
        &mut self,
        movie: &mut MovieBuilder,
        player: &str,
        action: &PlayerAction,
    ) -> Result<(), MatchError> {
        let Some(command) = &action.command else {
            return Err(PlayerFault::with_message(
                player,
                Classification::RuntimeError,
                "action carried no command",
            )
            .into());
        };
        if command.name != "step" {
            return Err(PlayerFault::with_message(
                player,
                Classification::WrongAnswer,
                format!("unknown command '{}'", command.name),
            )
            .into());
        }
        let Ok(step) = command.as_int(0) else {
            return Err(PlayerFault::with_message(
                player,
                Classification::WrongAnswer,
                "step was not a number",
            )
            .into());
        };

        let position = self.positions.entry(player.to_owned()).or_insert(0);
        *position += step.clamp(0, 3);

        movie.add_item(FrameItem::new("runner", *position as i32 * 10, 60));
        movie.set_points(player, *position as i32);
        for message in &action.messages {
            movie.add_message(player, message.clone());
        }
        Ok(())
    }

    fn state_update_for(&self, player: &str) -> Result<StateUpdate, SystemicFault> {
        let position = self.positions.get(player).copied().unwrap_or(0);
        Ok(StateUpdate::new(
            "round",
            json!({ "round": self.played + 1, "position": position }),
        ))
    }

    fn end_round(&mut self, movie: &mut MovieBuilder) -> Result<(), MatchError> {
        self.played += 1;
        movie.add_frame();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.played < self.rounds
    }

    fn finalize(&mut self, movie: &mut MovieBuilder) -> Result<(), SystemicFault> {
        let best = self.positions.values().copied().max().unwrap_or(0);
        for (player, position) in &self.positions {
            let classification = if *position == best {
                Classification::Accepted
            } else {
                Classification::WrongAnswer
            };
            movie.set_classification(player, classification);
            movie.set_points(player, *position as i32);
            movie.set_observations(player, format!("finished at {position}"));
        }
        Ok(())
    }

    fn min_players(&self) -> usize {
        2
    }
}

/// A game whose preparation always fails with a systemic fault.
#[derive(Debug)]
pub struct BrokenGame;

impl GameState for BrokenGame {
    fn prepare(
        &mut self,
        _movie: &mut MovieBuilder,
        _title: &str,
        _players: &BTreeMap<String, String>,
    ) -> Result<(), MatchError> {
        Err(SystemicFault::new("game assets are missing").into())
    }

    fn execute(
        &mut self,
        _movie: &mut MovieBuilder,
        _player: &str,
        _action: &PlayerAction,
    ) -> Result<(), MatchError> {
        Ok(())
    }

    fn state_update_for(&self, _player: &str) -> Result<StateUpdate, SystemicFault> {
        Ok(StateUpdate::empty())
    }

    fn end_round(&mut self, _movie: &mut MovieBuilder) -> Result<(), MatchError> {
        Ok(())
    }

    fn is_running(&self) -> bool {
        true
    }

    fn finalize(&mut self, _movie: &mut MovieBuilder) -> Result<(), SystemicFault> {
        Ok(())
    }
}
