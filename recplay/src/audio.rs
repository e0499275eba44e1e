//! Audio output and capture, delegated to external player and recorder programs.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use log::{debug, info, warn};
use time::Duration;
use crate::config::AudioCommands;

/// How many seconds before the end of a recording the warning clicks start.
pub const RECORD_WARNING_SECONDS: i64 = 5;

/// Something that can play and record clips.
///
/// Every operation is best-effort: failures are logged by the implementation and never
/// reported back.
pub trait AudioSink: Debug {
    /// Starts playing `clip` without waiting for it to finish.
    fn play(&mut self, clip: &Path);

    /// Plays `clip` and waits until it has finished.
    fn play_to_end(&mut self, clip: &Path);

    /// Records into `target` for `duration`, blocking until the time is up.
    fn record(&mut self, target: &Path, duration: std::time::Duration);
}

/// How a recording of a given length is spent: silent at first, then one click per
/// second to warn that the time is almost up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RecordSchedule {
    pub lead: Duration,
    pub clicks: u32,
}

impl RecordSchedule {
    pub fn for_duration(duration: Duration) -> Self {
        let warning = Duration::seconds(RECORD_WARNING_SECONDS);
        if duration > warning {
            RecordSchedule {
                lead: duration - warning,
                clicks: RECORD_WARNING_SECONDS as u32,
            }
        } else {
            RecordSchedule {
                lead: duration,
                clicks: 0,
            }
        }
    }
}

/// [AudioSink] spawning `aplay`/`arecord` style programs.
#[derive(Debug)]
pub struct ProcessAudio {
    commands: AudioCommands,
    /// Played instead of clips that do not exist.
    missing_file: Option<PathBuf>,
    /// Played during the last seconds of a recording.
    click: Option<PathBuf>,
    players: Vec<Child>,
}

impl ProcessAudio {
    pub fn new(
        commands: AudioCommands,
        missing_file: Option<PathBuf>,
        click: Option<PathBuf>,
    ) -> Self {
        ProcessAudio {
            commands,
            missing_file,
            click,
            players: Vec::new(),
        }
    }

    /// Waits for players that have already exited.
    fn reap(&mut self) {
        self.players.retain_mut(|child| match child.try_wait() {
            Ok(Some(_)) => false,
            Ok(None) => true,
            Err(err) => {
                warn!("Failed to poll player {}: {}", child.id(), err);
                false
            }
        });
    }

    /// Gets the clip that will actually be played for `clip`.
    fn resolve_clip(&self, clip: &Path) -> Option<PathBuf> {
        if clip.exists() {
            return Some(clip.to_path_buf());
        }
        match &self.missing_file {
            Some(fallback) if fallback.exists() => {
                warn!("{} not found, playing {} instead.", clip.display(), fallback.display());
                Some(fallback.clone())
            }
            _ => {
                warn!("{} not found.", clip.display());
                None
            }
        }
    }

    fn spawn_player(&mut self, clip: &Path) -> Option<Child> {
        self.reap();
        let clip = self.resolve_clip(clip)?;
        let spawned = Command::new(&self.commands.player)
            .arg(&clip)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                debug!("Playing {} (pid {}).", clip.display(), child.id());
                Some(child)
            }
            Err(err) => {
                warn!("Failed to start {}: {}", self.commands.player, err);
                None
            }
        }
    }
}

impl AudioSink for ProcessAudio {
    fn play(&mut self, clip: &Path) {
        if let Some(child) = self.spawn_player(clip) {
            self.players.push(child);
        }
    }

    fn play_to_end(&mut self, clip: &Path) {
        if let Some(mut child) = self.spawn_player(clip) {
            if let Err(err) = child.wait() {
                warn!("Failed to wait for player {}: {}", child.id(), err);
            }
        }
    }

    fn record(&mut self, target: &Path, duration: std::time::Duration) {
        let Ok(total) = Duration::try_from(duration) else {
            warn!("Record time {:?} is out of range.", duration);
            return;
        };
        let schedule = RecordSchedule::for_duration(total);

        let spawned = Command::new(&self.commands.recorder)
            .arg("-D")
            .arg(&self.commands.record_device)
            .arg("-d")
            .arg(total.whole_seconds().to_string())
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut recorder = match spawned {
            Ok(child) => child,
            Err(err) => {
                warn!("Failed to start {}: {}", self.commands.recorder, err);
                return;
            }
        };
        info!("Recording {} for {} s.", target.display(), total.whole_seconds());

        thread::sleep(schedule.lead.try_into().unwrap_or_default());

        let mut remaining = Duration::seconds(schedule.clicks as i64);
        for _ in 0..schedule.clicks {
            debug!("{} s of recording left.", remaining.whole_seconds());
            if let Some(click) = self.click.clone() {
                self.play(&click);
            }
            thread::sleep(std::time::Duration::from_secs(1));
            remaining -= Duration::SECOND;
        }

        match recorder.wait() {
            Ok(status) if !status.success() => warn!("{} exited with {}.", self.commands.recorder, status),
            Ok(_) => debug!("Recording of {} finished.", target.display()),
            Err(err) => warn!("Failed to wait for {}: {}", self.commands.recorder, err),
        }
    }
}
