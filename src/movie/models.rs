//! Value types of the recorded movie document.
//!
//! A [`Movie`] is the replayable record of one match: a [`MovieHeader`]
//! fixed during preparation plus an ordered list of [`MovieFrame`]s. All
//! types serialize to the snake_case JSON document consumed by replay
//! clients; optional visual fields are omitted when unset so a replay
//! client can tell "not specified" from "zero".

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of outcome codes a player can end a match with.
///
/// `RequiresReevaluation` is a sentinel meaning "undetermined due to a
/// fault unrelated to this player"; it is advisory metadata for an
/// external judge, never a trigger for an automatic re-run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Clean, accepted result.
    Accepted,
    /// Output shape acceptable, presentation off.
    PresentationError,
    /// Played, but lost or produced a wrong result.
    WrongAnswer,
    /// The evaluation was skipped entirely.
    EvaluationSkipped,
    /// Player wrote more output than allowed.
    OutputLimitExceeded,
    /// Player exceeded its memory allowance.
    MemoryLimitExceeded,
    /// Player exceeded a per-turn deadline.
    TimeLimitExceeded,
    /// Player invoked a function it must not.
    InvalidFunction,
    /// Player process terminated with a non-zero exit value.
    InvalidExitValue,
    /// Player crashed or broke the protocol.
    RuntimeError,
    /// Player program failed to compile.
    CompileTimeError,
    /// The submission itself was not valid.
    InvalidSubmission,
    /// Player program is larger than allowed.
    ProgramSizeExceeded,
    /// Undetermined; a fault unrelated to this player occurred.
    RequiresReevaluation,
    /// Evaluation still in progress.
    Evaluating,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Point of a sprite to which item coordinates are relative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpriteAnchor {
    /// Coordinates address the sprite center (the default).
    #[default]
    Center,
    /// Top edge midpoint.
    Top,
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Bottom edge midpoint.
    Bottom,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
    /// Left edge midpoint.
    Left,
    /// Right edge midpoint.
    Right,
}

/// Evaluation status of one player in one frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// Points accumulated so far. Defaults to zero.
    pub points: i32,
    /// Outcome code, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Free-form notes shown to the player and the judge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        PlayerStatus {
            points: 0,
            classification: None,
            observations: None,
        }
    }
}

/// Rectangular clip of a sprite sheet to draw instead of the full sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewWindow {
    /// Horizontal coordinate of the upper-left corner of the window.
    pub start_x: i32,
    /// Vertical coordinate of the upper-left corner of the window.
    pub start_y: i32,
    /// Window width.
    pub width: i32,
    /// Window height.
    pub height: i32,
}

/// One visual placement inside a frame.
///
/// Optional fields stay `None` unless the game sets them; `None` never
/// serializes as a numeric default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameItem {
    /// Name of the sprite to draw, as registered in the header.
    pub sprite: String,
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
    /// Rotation in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,
    /// Scale factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Sprite-sheet clip to draw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_window: Option<ViewWindow>,
}

impl FrameItem {
    /// Place `sprite` at `(x, y)` with no rotation, scaling or clipping.
    pub fn new(sprite: impl Into<String>, x: i32, y: i32) -> Self {
        FrameItem {
            sprite: sprite.into(),
            x,
            y,
            rotate: None,
            scale: None,
            view_window: None,
        }
    }

    /// Rotate the sprite by `degrees`.
    #[must_use]
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    /// Scale the sprite by `factor`.
    #[must_use]
    pub fn with_scale(mut self, factor: f64) -> Self {
        self.scale = Some(factor);
        self
    }

    /// Draw only the given clip of the sprite sheet.
    #[must_use]
    pub fn with_view_window(mut self, window: ViewWindow) -> Self {
        self.view_window = Some(window);
        self
    }
}

/// One discrete visual/state snapshot within a movie.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieFrame {
    /// Visual placements, in draw order.
    #[serde(default)]
    pub items: Vec<FrameItem>,
    /// Per-player evaluation status. Entries appear lazily on first touch.
    #[serde(default)]
    pub status: BTreeMap<String, PlayerStatus>,
    /// In-movie annotations per player (not debug logs).
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

impl MovieFrame {
    /// Status of `player` in this frame, created with defaults on first access.
    pub fn status_mut(&mut self, player: &str) -> &mut PlayerStatus {
        self.status.entry(player.to_owned()).or_default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty() && self.status.is_empty() && self.messages.is_empty()
    }
}

/// Fixed per-match metadata, set up during preparation.
///
/// Immutable once play begins, except the sprite and player maps which are
/// append-only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieHeader {
    /// Match title shown by replay clients.
    pub title: String,
    /// URL or relative asset path of the background.
    pub background: String,
    /// Stage width in pixels.
    pub width: i32,
    /// Stage height in pixels.
    pub height: i32,
    /// Sprite name to asset URL.
    #[serde(default)]
    pub sprites: BTreeMap<String, String>,
    /// Player id to display name.
    #[serde(default)]
    pub players: BTreeMap<String, String>,
    /// Anchor point item coordinates are relative to.
    #[serde(default)]
    pub anchor_point: SpriteAnchor,
    /// Playback speed in frames per second.
    pub fps: u32,
}

/// The recorded timeline of a match: header plus ordered frames.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// Per-match metadata.
    pub header: MovieHeader,
    /// Committed frames, in chronological order.
    #[serde(default)]
    pub frames: Vec<MovieFrame>,
}
