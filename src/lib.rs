//! # Arena Builder
//!
//! A Rust framework for running turn-based matches between automated,
//! mutually untrusted player programs, recording each match as a
//! replayable, compressible movie with per-player outcome classifications.
//!
//! It provides:
//! - A per-player line-oriented JSON protocol with deadline-bounded reads
//!   (`channel`, `messaging`)
//! - Match orchestration over a pluggable game lifecycle
//!   ([`GameManager`](crate::manager::GameManager) and the
//!   [`GameState`](crate::game_interface::GameState) trait)
//! - A movie recorder with a bounded undo stack and failure propagation
//!   ([`MovieBuilder`](crate::movie::MovieBuilder))
//! - Two string compression codecs for shrinking serialized movies
//!   ([`compression`])
//! - Launch adapters turning player sources into running processes
//!   ([`launcher`]) and a static preview server ([`preview`])
//!
//! Each player runs as a separate OS process and talks to the orchestrator
//! over its piped stdin/stdout, one JSON document per line. A player that
//! breaks the protocol or misses its per-turn deadline is classified and
//! dropped; the match carries on for the others, with every fault recorded
//! in the movie for a downstream judge.
//!
//! # Usage Example
//!
//! ```no_run
//! # use arena_builder::errors::{MatchError, SystemicFault};
//! # use arena_builder::messaging::{PlayerAction, StateUpdate};
//! # use arena_builder::movie::MovieBuilder;
//! # #[derive(Debug)]
//! # struct YourGame;
//! # impl arena_builder::game_interface::GameState for YourGame {
//! #     fn prepare(&mut self, _m: &mut MovieBuilder, _t: &str, _p: &BTreeMap<String, String>) -> Result<(), MatchError> { Ok(()) }
//! #     fn execute(&mut self, _m: &mut MovieBuilder, _p: &str, _a: &PlayerAction) -> Result<(), MatchError> { Ok(()) }
//! #     fn state_update_for(&self, _p: &str) -> Result<StateUpdate, SystemicFault> { Ok(StateUpdate::empty()) }
//! #     fn end_round(&mut self, _m: &mut MovieBuilder) -> Result<(), MatchError> { Ok(()) }
//! #     fn is_running(&self) -> bool { false }
//! #     fn finalize(&mut self, _m: &mut MovieBuilder) -> Result<(), SystemicFault> { Ok(()) }
//! # }
//! use std::collections::BTreeMap;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! use arena_builder::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     // Resolve game and languages registered at startup
//!     let mut games = GameRegistry::new();
//!     games.register("your-game", || Box::new(YourGame));
//!
//!     let languages = LanguageRegistry::builtin();
//!     let python = languages.get("python")?;
//!
//!     // Launch one process per player
//!     let mut players = BTreeMap::new();
//!     for (id, source) in [("p1", "players/alice.py"), ("p2", "players/bob.py")] {
//!         let child = python.launch("match-42", Path::new(source))?;
//!         players.insert(id.to_owned(), PlayerProcess::new(id, child));
//!     }
//!
//!     // Run the match and collect the movie
//!     let config = Configuration::new()
//!         .with_title("your game, round one")
//!         .with_action_timeout(Duration::from_millis(500))
//!         .with_compression(Compression::Lzw);
//!     let mut state = games.create("your-game")?;
//!     let mut manager = GameManager::new(config);
//!     manager.manage(state.as_mut(), &mut players);
//!
//!     println!("{}", manager.movie_string()?);
//!
//!     // The orchestrator never kills players; that decision stays here
//!     for player in players.values_mut() {
//!         let _ = player.child.kill();
//!         let _ = player.child.wait();
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Player Requirements
//!
//! - Read one state update per turn from stdin: a JSON document
//!   `{"type": ..., "payload": ...}` on a single line
//! - Answer on stdout with one line:
//!   `{"command": {"name": ..., "args": [...]}, "messages": [...]}`
//! - Flush stdout after every answer and answer within the configured
//!   per-turn deadline
#![warn(missing_docs)]

pub use anyhow;
pub mod channel;
pub mod compression;
pub mod configuration;
pub mod errors;
pub mod game_interface;
pub mod launcher;
mod logger;
pub mod manager;
pub mod messaging;
pub mod movie;
pub mod preview;

/// Commonly used types and traits for quick access.
///
/// ```rust
/// use arena_builder::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compression::Compression;
    pub use crate::configuration::Configuration;
    pub use crate::game_interface::{GameRegistry, GameState};
    pub use crate::launcher::{Language, LanguageRegistry};
    pub use crate::manager::{GameManager, PlayerProcess};
    pub use crate::messaging::{Command, PlayerAction, StateUpdate};
    pub use crate::movie::models::Classification;
    pub use crate::movie::MovieBuilder;
}
