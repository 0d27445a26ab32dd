//! The movie recorder.
//!
//! [`MovieBuilder`] accumulates the visual/state timeline of one match and
//! every player's outcome metadata. It owns the movie and its undo stack;
//! the orchestrator and the game only go through the operations here,
//! never through the movie fields directly.
//!
//! Frames are append-only once committed: mutations always target the one
//! "current" frame, and [`MovieBuilder::add_frame`] commits it into the
//! frame list before starting the next. Faults are recorded with
//! [`MovieBuilder::failed_evaluation`], which is the only surface where
//! failures become user-visible — there is no separate error channel.

use std::collections::{BTreeMap, VecDeque};
use std::io::Write;

use tracing::trace;

use crate::compression::Compression;
use crate::errors::{MatchError, SystemicFault};

use super::models::{
    Classification, FrameItem, Movie, MovieFrame, PlayerStatus, SpriteAnchor,
};

/// Bound of the undo stack. Pushing one more evicts the oldest snapshot.
const FRAME_STACK_CAPACITY: usize = 15;

/// A partial deep copy of the current frame, as captured by `save_frame`.
///
/// Items are always captured; status and messages only when the
/// corresponding flag was set, and a `None` field is left untouched by the
/// restore.
#[derive(Clone, Debug)]
struct FrameSnapshot {
    items: Vec<FrameItem>,
    status: Option<BTreeMap<String, PlayerStatus>>,
    messages: Option<BTreeMap<String, String>>,
}

/// Builds the replayable movie of one match.
#[derive(Debug, Default)]
pub struct MovieBuilder {
    movie: Movie,
    current: Option<MovieFrame>,
    saved: VecDeque<FrameSnapshot>,
}

impl MovieBuilder {
    /// Empty builder with a default header and no frames.
    pub fn new() -> Self {
        MovieBuilder::default()
    }

    /// Set the movie title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.movie.header.title = title.into();
    }

    /// Set the background asset URL.
    pub fn set_background(&mut self, url: impl Into<String>) {
        self.movie.header.background = url.into();
    }

    /// Set the stage width in pixels.
    pub fn set_width(&mut self, width: i32) {
        self.movie.header.width = width;
    }

    /// Set the stage height in pixels.
    pub fn set_height(&mut self, height: i32) {
        self.movie.header.height = height;
    }

    /// Set the playback speed in frames per second.
    pub fn set_fps(&mut self, fps: u32) {
        self.movie.header.fps = fps;
    }

    /// Set the anchor point item coordinates are relative to.
    pub fn set_sprite_anchor(&mut self, anchor: SpriteAnchor) {
        self.movie.header.anchor_point = anchor;
    }

    /// Register a sprite asset under `name`.
    pub fn add_sprite(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.movie.header.sprites.insert(name.into(), url.into());
    }

    /// Register a player and its display name.
    pub fn add_player(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.movie.header.players.insert(id.into(), name.into());
    }

    /// Whether `id` is already registered in the header.
    pub fn has_player(&self, id: &str) -> bool {
        self.movie.header.players.contains_key(id)
    }

    /// Commit the current frame (if any) and start a new one.
    pub fn add_frame(&mut self) {
        if let Some(frame) = self.current.take() {
            self.movie.frames.push(frame);
        }
        self.current = Some(MovieFrame::default());
    }

    /// Append a visual placement to the current frame.
    pub fn add_item(&mut self, item: FrameItem) {
        self.current_frame().items.push(item);
    }

    /// Append a display message for `player` in the current frame.
    pub fn add_message(&mut self, player: &str, message: impl Into<String>) {
        self.current_frame()
            .messages
            .insert(player.to_owned(), message.into());
    }

    /// Set the points of `player` in the current frame.
    pub fn set_points(&mut self, player: &str, points: i32) {
        self.current_frame().status_mut(player).points = points;
    }

    /// Set the classification of `player` in the current frame.
    pub fn set_classification(&mut self, player: &str, classification: Classification) {
        self.current_frame().status_mut(player).classification = Some(classification);
    }

    /// Set the observations of `player` in the current frame.
    pub fn set_observations(&mut self, player: &str, observations: impl Into<String>) {
        self.current_frame().status_mut(player).observations = Some(observations.into());
    }

    /// Mark `player` as having lost with `WrongAnswer`, zero points and
    /// `message` as observations.
    pub fn wrong_answer(&mut self, player: &str, message: impl Into<String>) {
        let status = self.current_frame().status_mut(player);
        status.classification = Some(Classification::WrongAnswer);
        status.observations = Some(message.into());
        status.points = 0;
    }

    /// Push a full deep copy of the current frame onto the undo stack.
    pub fn save_frame(&mut self) {
        self.save_frame_with(true, true);
    }

    /// Push a deep copy of the current frame onto the undo stack, capturing
    /// status and messages only when the corresponding flag is set.
    ///
    /// The stack holds at most 15 snapshots; pushing another evicts the
    /// oldest, it is not an error.
    pub fn save_frame_with(&mut self, status: bool, messages: bool) {
        let frame = self.current_frame();
        let snapshot = FrameSnapshot {
            items: frame.items.clone(),
            status: status.then(|| frame.status.clone()),
            messages: messages.then(|| frame.messages.clone()),
        };

        self.saved.push_back(snapshot);
        if self.saved.len() > FRAME_STACK_CAPACITY {
            self.saved.pop_front();
        }
    }

    /// Pop the most recent snapshot and overwrite the current frame with it.
    ///
    /// Items are overwritten unconditionally; status and messages only if
    /// the snapshot captured them. A no-op when the stack is empty.
    pub fn restore_frame(&mut self) {
        let Some(snapshot) = self.saved.pop_back() else {
            return;
        };

        let frame = self.current_frame();
        frame.items = snapshot.items;
        if let Some(status) = snapshot.status {
            frame.status = status;
        }
        if let Some(messages) = snapshot.messages {
            frame.messages = messages;
        }
    }

    /// Record a failed evaluation.
    ///
    /// A systemic fault marks every registered player
    /// `RequiresReevaluation` with the fault message as observations. A
    /// player fault sets the culprit's classification, observations and
    /// zero points from the fault, and marks every other registered player
    /// `RequiresReevaluation` with the same observations — an unreliable
    /// result must be distinguishable from a clean loss for the players
    /// that did nothing wrong.
    pub fn failed_evaluation(&mut self, error: &MatchError) {
        trace!(%error, "recording failed evaluation");
        match error {
            MatchError::Systemic(fault) => {
                let players: Vec<String> = self.movie.header.players.keys().cloned().collect();
                let frame = self.current_frame();
                for player in players {
                    let status = frame.status_mut(&player);
                    status.classification = Some(Classification::RequiresReevaluation);
                    status.observations = Some(fault.message.clone());
                }
            }
            MatchError::Player(fault) => {
                let players: Vec<String> = self.movie.header.players.keys().cloned().collect();
                let frame = self.current_frame();

                let culprit = frame.status_mut(&fault.player);
                culprit.classification = Some(fault.classification);
                culprit.observations = fault.message.clone();
                culprit.points = 0;

                for player in players {
                    if player == fault.player {
                        continue;
                    }
                    let status = frame.status_mut(&player);
                    status.classification = Some(Classification::RequiresReevaluation);
                    status.observations = fault.message.clone();
                }
            }
        }
    }

    /// Commit the current frame if it recorded anything.
    ///
    /// Called by the orchestrator at the end of a match so the last
    /// frame's statuses are visible in the serialized movie.
    pub fn flush_frame(&mut self) {
        if let Some(frame) = self.current.take() {
            if !frame.is_empty() {
                self.movie.frames.push(frame);
            }
        }
    }

    /// The accumulated movie. Contains the current frame only once it was
    /// committed via [`MovieBuilder::add_frame`] or
    /// [`MovieBuilder::flush_frame`].
    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    /// Latest known status of `player`: its entry in the current frame if
    /// touched there, otherwise in the last committed frame.
    pub fn player_status(&self, player: &str) -> Option<&PlayerStatus> {
        if let Some(status) = self.current.as_ref().and_then(|f| f.status.get(player)) {
            return Some(status);
        }
        self.movie.frames.last().and_then(|f| f.status.get(player))
    }

    /// Serialize the movie, running the chosen codec over the JSON text.
    pub fn serialize(&self, compression: Compression) -> Result<String, SystemicFault> {
        let json = serde_json::to_string(&self.movie)
            .map_err(|e| SystemicFault::new(format!("error serializing movie: {e}")))?;
        Ok(compression.compress(&json))
    }

    /// Write the uncompressed movie document to `writer`.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), SystemicFault> {
        serde_json::to_writer(writer, &self.movie)
            .map_err(|e| SystemicFault::new(format!("error writing movie: {e}")))
    }

    fn current_frame(&mut self) -> &mut MovieFrame {
        self.current.get_or_insert_with(MovieFrame::default)
    }
}
