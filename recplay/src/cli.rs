//! Command-line overrides for the JSON config.

use std::path::PathBuf;
use clap::Parser;
use crate::config::{CallMode, Config, InputSource, CONFIG_FILE_VAR};
use crate::storage::StorageTarget;

/// Keypad driven recorder and player.
///
/// Settings given here override the ones from the config file.
#[derive(Debug, Parser, Clone, Default)]
#[command(about, version)]
pub struct Args {
    /// Path to the JSON config file
    #[arg(long, env = CONFIG_FILE_VAR)]
    pub config: Option<PathBuf>,

    /// Call flow to run
    #[arg(long, value_enum)]
    pub mode: Option<CallMode>,

    /// Max length of a record filename
    #[arg(short = 'l', long)]
    pub filename_len: Option<usize>,

    /// Max record time in seconds
    #[arg(short = 'L', long)]
    pub record_seconds: Option<u32>,

    /// Every filename must be of the max length
    #[arg(short = 's', long)]
    pub must_be_max: bool,

    /// Read keys from a keyboard on stdin instead of the keypad
    #[arg(short = 'b', long)]
    pub keyboard: bool,

    /// Store recordings on the removable device
    #[arg(short = 'd', long)]
    pub removable: bool,

    /// Play key
    #[arg(short = 'P', long)]
    pub play_key: Option<char>,

    /// Record key
    #[arg(short = 'R', long)]
    pub record_key: Option<char>,

    /// Clip played after start
    #[arg(short = 'H', long)]
    pub hello_cue: Option<PathBuf>,

    /// Clip played after each dialed digit
    #[arg(short = 'C', long)]
    pub got_a_key_cue: Option<PathBuf>,

    /// Clip played before playing a recording
    #[arg(short = 'E', long)]
    pub start_play_cue: Option<PathBuf>,

    /// Clip played before recording
    #[arg(short = 'F', long)]
    pub start_record_cue: Option<PathBuf>,

    /// Clip played when the filename reached its max length
    #[arg(short = 'M', long)]
    pub reached_max_cue: Option<PathBuf>,

    /// Clip played when the filename is too short to play or record
    #[arg(short = 'N', long)]
    pub too_short_cue: Option<PathBuf>,

    /// Clip played instead of a clip that does not exist
    #[arg(short = 'O', long)]
    pub missing_file_cue: Option<PathBuf>,

    /// Clip played each second when the record time is almost up
    #[arg(short = 'K', long)]
    pub click_cue: Option<PathBuf>,
}

impl Args {
    /// Applies the given overrides to `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(filename_len) = self.filename_len {
            config.filename_len = filename_len;
        }
        if let Some(record_seconds) = self.record_seconds {
            config.max_record_seconds = record_seconds;
        }
        if self.must_be_max {
            config.must_be_max_filename_len = true;
        }
        if self.keyboard {
            config.input = InputSource::Keyboard;
        }
        if self.removable {
            config.storage.target = StorageTarget::Removable;
        }
        if let Some(key) = self.play_key {
            config.keys.play = key;
        }
        if let Some(key) = self.record_key {
            config.keys.record = key;
        }

        let cues = &mut config.cues;
        for (cue, value) in [
            (&mut cues.hello, &self.hello_cue),
            (&mut cues.got_a_key, &self.got_a_key_cue),
            (&mut cues.start_play, &self.start_play_cue),
            (&mut cues.start_record, &self.start_record_cue),
            (&mut cues.reached_max, &self.reached_max_cue),
            (&mut cues.too_short, &self.too_short_cue),
            (&mut cues.missing_file, &self.missing_file_cue),
            (&mut cues.click, &self.click_cue),
        ] {
            if value.is_some() {
                *cue = value.clone();
            }
        }
    }
}
