//! Per-player duplex channels over child-process pipes.
//!
//! [`PlayerChannels`] wraps the piped stdin/stdout of every player process
//! in a line-oriented JSON channel: one [`StateUpdate`] out per line, one
//! [`PlayerAction`] back per line. Reads can be bounded by a deadline; a
//! deadline miss cancels only the wait, never the underlying stream, so
//! terminating the player stays the caller's decision.
//!
//! Each player gets a dedicated reader thread feeding an mpsc channel.
//! Reads are issued sequentially per player, so one slot per player is all
//! the concurrency this layer ever needs; results are consumed back on the
//! orchestrator thread before any recorder call.

use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{instrument, trace, warn};

use crate::errors::{MatchError, PlayerFault, SystemicFault};
use crate::messaging::{PlayerAction, StateUpdate};
use crate::movie::models::Classification;

struct PlayerChannel {
    writer: Option<BufWriter<ChildStdin>>,
    lines: Option<Receiver<io::Result<String>>>,
    reader: Option<JoinHandle<()>>,
    // lines produced by reads whose deadline already expired; the next
    // receive must discard them instead of delivering them as a reply
    stale: usize,
}

/// The set of per-player duplex channels of one match.
///
/// Owns exactly the stream resources of each player (taken from the child
/// handles at construction) and releases them exactly once via
/// [`PlayerChannels::close`]. The child processes themselves stay with the
/// caller.
pub struct PlayerChannels {
    channels: BTreeMap<String, PlayerChannel>,
}

impl PlayerChannels {
    /// Build one channel per player from the children's piped stdio.
    ///
    /// # Errors
    ///
    /// A child spawned without piped stdin/stdout is a programming fault in
    /// the launch step and surfaces as a [`SystemicFault`].
    #[instrument(skip_all)]
    pub fn new<'a>(
        players: impl IntoIterator<Item = (&'a str, &'a mut Child)>,
    ) -> Result<Self, SystemicFault> {
        let mut channels = BTreeMap::new();

        for (id, child) in players {
            let stdin = child.stdin.take().ok_or_else(|| {
                SystemicFault::new(format!("player {id} was spawned without piped stdin"))
            })?;
            let stdout = child.stdout.take().ok_or_else(|| {
                SystemicFault::new(format!("player {id} was spawned without piped stdout"))
            })?;

            let (tx, rx) = mpsc::channel();
            let reader = std::thread::Builder::new()
                .name(format!("player-reader-{id}"))
                .spawn(move || {
                    let mut reader = BufReader::new(stdout);
                    loop {
                        let mut line = String::new();
                        match reader.read_line(&mut line) {
                            Ok(0) => {
                                let _ = tx.send(Err(io::Error::new(
                                    io::ErrorKind::UnexpectedEof,
                                    "player stream closed",
                                )));
                                break;
                            }
                            Ok(_) => {
                                if tx.send(Ok(line)).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                let _ = tx.send(Err(e));
                                break;
                            }
                        }
                    }
                })
                .map_err(|e| {
                    SystemicFault::new(format!("could not spawn reader for player {id}: {e}"))
                })?;

            channels.insert(
                id.to_owned(),
                PlayerChannel {
                    writer: Some(BufWriter::new(stdin)),
                    lines: Some(rx),
                    reader: Some(reader),
                    stale: 0,
                },
            );
        }

        Ok(PlayerChannels { channels })
    }

    /// Serialize `update` as one line to `player` and flush.
    ///
    /// An absent update is substituted with the explicit-null
    /// [`StateUpdate::empty`]. A write failure (e.g. broken pipe) is a
    /// [`PlayerFault`] with `RuntimeError` — never a systemic fault.
    #[instrument(skip(self, update))]
    pub fn send(&mut self, player: &str, update: Option<&StateUpdate>) -> Result<(), MatchError> {
        let empty = StateUpdate::empty();
        let update = update.unwrap_or(&empty);
        let json = serde_json::to_string(update)
            .map_err(|e| SystemicFault::new(format!("error serializing state update: {e}")))?;

        let channel = self.channel_mut(player)?;
        let broken = || {
            PlayerFault::with_message(
                player,
                Classification::RuntimeError,
                "the state update could not be delivered; the player stream closed early",
            )
        };

        let Some(writer) = channel.writer.as_mut() else {
            return Err(broken().into());
        };
        trace!(%json, "sending state update");
        writeln!(writer, "{json}").map_err(|e| {
            warn!(player, error = %e, "write to player failed");
            broken()
        })?;
        writer.flush().map_err(|e| {
            warn!(player, error = %e, "flush to player failed");
            broken()
        })?;
        Ok(())
    }

    /// Block until `player` produces one line and parse it as a
    /// [`PlayerAction`].
    ///
    /// A closed stream, a malformed line, or a payload without a command
    /// all raise the protocol parse fault: a [`PlayerFault`] with
    /// `RuntimeError`.
    pub fn receive(&mut self, player: &str) -> Result<PlayerAction, MatchError> {
        let channel = self.channel_mut(player)?;
        let line = loop {
            let Some(lines) = channel.lines.as_ref() else {
                return Err(parse_fault(player).into());
            };
            match lines.recv() {
                Ok(Ok(line)) => {
                    if channel.stale > 0 {
                        channel.stale -= 1;
                        trace!(player, "discarding stale line");
                        continue;
                    }
                    break line;
                }
                Ok(Err(_)) | Err(_) => return Err(parse_fault(player).into()),
            }
        };
        parse_action(player, &line)
    }

    /// Like [`PlayerChannels::receive`], but give up after `timeout`.
    ///
    /// A deadline miss abandons only the pending read — the stream stays
    /// open and whatever the player eventually writes is discarded by the
    /// next receive — and raises a [`PlayerFault`] with
    /// `TimeLimitExceeded`.
    #[instrument(skip(self))]
    pub fn receive_deadline(
        &mut self,
        player: &str,
        timeout: Duration,
    ) -> Result<PlayerAction, MatchError> {
        let channel = self.channel_mut(player)?;
        let deadline = Instant::now() + timeout;

        let line = loop {
            let Some(lines) = channel.lines.as_ref() else {
                return Err(parse_fault(player).into());
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            match lines.recv_timeout(remaining) {
                Ok(Ok(line)) => {
                    if channel.stale > 0 {
                        channel.stale -= 1;
                        trace!(player, "discarding stale line");
                        continue;
                    }
                    break line;
                }
                Ok(Err(_)) | Err(RecvTimeoutError::Disconnected) => {
                    return Err(parse_fault(player).into());
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(player, ?timeout, "deadline exceeded waiting for action");
                    channel.stale += 1;
                    return Err(
                        PlayerFault::new(player, Classification::TimeLimitExceeded).into()
                    );
                }
            }
        };
        parse_action(player, &line)
    }

    /// Release every player's stream resources.
    ///
    /// Runs on every exit path of a match and never fails, even when some
    /// underlying streams are already broken. Reader threads parked on a
    /// dead pipe are detached, not joined; they exit when their stream
    /// does.
    pub fn close(&mut self) {
        for (player, channel) in self.channels.iter_mut() {
            if let Some(mut writer) = channel.writer.take() {
                // best effort: the pipe may already be gone
                if let Err(e) = writer.flush() {
                    trace!(%player, error = %e, "flush on close failed");
                }
            }
            drop(channel.lines.take());
            drop(channel.reader.take());
        }
    }

    fn channel_mut(&mut self, player: &str) -> Result<&mut PlayerChannel, SystemicFault> {
        self.channels
            .get_mut(player)
            .ok_or_else(|| SystemicFault::new(format!("no channel for player {player}")))
    }
}

impl Drop for PlayerChannels {
    fn drop(&mut self) {
        self.close();
    }
}

fn parse_fault(player: &str) -> PlayerFault {
    PlayerFault::with_message(
        player,
        Classification::RuntimeError,
        "action could not be parsed",
    )
}

fn parse_action(player: &str, line: &str) -> Result<PlayerAction, MatchError> {
    let action: PlayerAction =
        serde_json::from_str(line.trim()).map_err(|_| parse_fault(player))?;
    if action.command.is_none() {
        return Err(parse_fault(player).into());
    }
    trace!(player, ?action, "received action");
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    fn spawn_sh(script: &str) -> BTreeMap<String, Child> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("sh is available");
        let mut players = BTreeMap::new();
        players.insert("p1".to_owned(), child);
        players
    }

    fn open(players: &mut BTreeMap<String, Child>) -> PlayerChannels {
        PlayerChannels::new(players.iter_mut().map(|(id, c)| (id.as_str(), c))).unwrap()
    }

    fn reap(players: &mut BTreeMap<String, Child>) {
        for child in players.values_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    const ECHO_PLAYER: &str =
        r#"while read -r line; do echo '{"command":{"name":"pong","args":[]}}'; done"#;

    #[test]
    fn send_then_receive_round_trips_one_exchange() {
        let mut players = spawn_sh(ECHO_PLAYER);
        let mut channels = open(&mut players);

        channels
            .send("p1", Some(&StateUpdate::new("ping", serde_json::json!(1))))
            .unwrap();
        let action = channels.receive("p1").unwrap();
        assert_eq!(action.command.unwrap().name, "pong");

        channels.close();
        reap(&mut players);
    }

    #[test]
    fn absent_update_is_sent_as_explicit_nulls() {
        // the player echoes the received line back inside a command arg
        let script = r#"read -r line; printf '{"command":{"name":"echo","args":["%s"]}}\n' "$(printf %s "$line" | sed 's/"/\\"/g')""#;
        let mut players = spawn_sh(script);
        let mut channels = open(&mut players);

        channels.send("p1", None).unwrap();
        let action = channels.receive("p1").unwrap();
        let echoed = action.command.unwrap().as_str(0).unwrap();
        assert_eq!(echoed, r#"{"type":null,"payload":null}"#);

        channels.close();
        reap(&mut players);
    }

    #[test]
    fn unparseable_line_is_a_runtime_error_fault() {
        let mut players = spawn_sh(r#"read -r line; echo 'not json'"#);
        let mut channels = open(&mut players);

        channels.send("p1", None).unwrap();
        match channels.receive("p1") {
            Err(MatchError::Player(fault)) => {
                assert_eq!(fault.player, "p1");
                assert_eq!(fault.classification, Classification::RuntimeError);
                assert_eq!(fault.message.as_deref(), Some("action could not be parsed"));
            }
            other => panic!("expected a parse fault, got {other:?}"),
        }

        channels.close();
        reap(&mut players);
    }

    #[test]
    fn missing_command_is_a_parse_fault() {
        let mut players = spawn_sh(r#"read -r line; echo '{"messages":["hi"]}'"#);
        let mut channels = open(&mut players);

        channels.send("p1", None).unwrap();
        assert!(matches!(
            channels.receive("p1"),
            Err(MatchError::Player(fault))
                if fault.classification == Classification::RuntimeError
        ));

        channels.close();
        reap(&mut players);
    }

    #[test]
    fn silent_player_times_out_within_a_bounded_overrun() {
        let mut players = spawn_sh("sleep 30");
        let mut channels = open(&mut players);

        let started = Instant::now();
        let result = channels.receive_deadline("p1", Duration::from_millis(50));
        let elapsed = started.elapsed();

        match result {
            Err(MatchError::Player(fault)) => {
                assert_eq!(fault.classification, Classification::TimeLimitExceeded);
                assert_eq!(fault.player, "p1");
            }
            other => panic!("expected a deadline fault, got {other:?}"),
        }
        assert!(
            elapsed < Duration::from_millis(500),
            "deadline overran: {elapsed:?}"
        );

        channels.close();
        reap(&mut players);
    }

    #[test]
    fn late_line_after_a_deadline_miss_is_discarded() {
        // first reply arrives late, second is prompt and distinguishable
        let script = r#"read -r line; sleep 1; echo '{"command":{"name":"late","args":[]}}'; read -r line; echo '{"command":{"name":"prompt","args":[]}}'"#;
        let mut players = spawn_sh(script);
        let mut channels = open(&mut players);

        channels.send("p1", None).unwrap();
        assert!(channels
            .receive_deadline("p1", Duration::from_millis(50))
            .is_err());

        // the late "late" reply must not satisfy the next read
        channels.send("p1", None).unwrap();
        let action = channels
            .receive_deadline("p1", Duration::from_secs(5))
            .unwrap();
        assert_eq!(action.command.unwrap().name, "prompt");

        channels.close();
        reap(&mut players);
    }

    #[test]
    fn close_tolerates_dead_players_and_is_idempotent() {
        let mut players = spawn_sh("exit 0");
        let mut channels = open(&mut players);
        for child in players.values_mut() {
            let _ = child.wait();
        }

        channels.close();
        channels.close();
    }
}
